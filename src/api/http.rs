// REST implementation of ChatApi over reqwest

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{ApiError, ChatApi, TokenMinter};
use crate::models::{Contact, Message, MessageDraft};
use crate::session::Preferences;
use crate::transport::MessageEnvelope;

#[derive(Deserialize)]
struct ContactsBody {
    contacts: Vec<Contact>,
}

#[derive(Deserialize)]
struct ContactBody {
    contact: Contact,
}

#[derive(Deserialize)]
struct MessagesBody {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Message,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct HttpChatApi {
    client: Client,
    base_url: String,
    user_id: String,
    minter: TokenMinter,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>, minter: TokenMinter) -> Self {
        HttpChatApi {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            minter,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Attach a fresh bearer token, send, and decode a JSON body.
    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let token = self.minter.mint(&self.user_id)?;
        let request_id = Uuid::new_v4().to_string();
        let response = builder
            .bearer_auth(token)
            .header("X-Request-Id", &request_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            warn!("Request {} rejected with {}: {}", request_id, status, message);
            return Err(ApiError::Rejected { status: status.as_u16(), message });
        }

        debug!("Request {} succeeded with {}", request_id, status);
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        let body: ContactsBody = self.call(self.request(Method::GET, "/api/user/contacts")).await?;
        Ok(body.contacts)
    }

    async fn messages(&self, contact_id: &str) -> Result<Vec<Message>, ApiError> {
        let path = format!("/api/user/messages/{}", contact_id);
        let body: MessagesBody = self.call(self.request(Method::GET, &path)).await?;
        Ok(body.messages)
    }

    async fn create_contact(&self, email: &str) -> Result<Contact, ApiError> {
        let builder = self.request(Method::POST, "/api/user/contact").json(&json!({ "email": email }));
        let body: ContactBody = self.call(builder).await?;
        Ok(body.contact)
    }

    async fn create_message(&self, receiver_id: &str, draft: &MessageDraft) -> Result<MessageEnvelope, ApiError> {
        let builder = self.request(Method::POST, "/api/user/message").json(&json!({
            "text": draft.text,
            "image": draft.image.clone().unwrap_or_default(),
            "receiver": receiver_id,
        }));
        self.call(builder).await
    }

    async fn edit_message(&self, message_id: &str, text: &str) -> Result<Message, ApiError> {
        let path = format!("/api/user/message/{}", message_id);
        let builder = self.request(Method::PUT, &path).json(&json!({ "text": text }));
        let body: MessageBody = self.call(builder).await?;
        Ok(body.message)
    }

    async fn delete_message(&self, message_id: &str) -> Result<Message, ApiError> {
        let path = format!("/api/user/message/{}", message_id);
        let body: MessageBody = self.call(self.request(Method::DELETE, &path)).await?;
        Ok(body.message)
    }

    async fn react(&self, message_id: &str, reaction: &str) -> Result<Message, ApiError> {
        let builder = self
            .request(Method::POST, "/api/user/reaction")
            .json(&json!({ "messageId": message_id, "reaction": reaction }));
        let body: MessageBody = self.call(builder).await?;
        Ok(body.message)
    }

    async fn read_messages(&self, messages: &[Message]) -> Result<Vec<Message>, ApiError> {
        let builder = self
            .request(Method::POST, "/api/user/read-messages")
            .json(&json!({ "messages": messages }));
        let body: MessagesBody = self.call(builder).await?;
        Ok(body.messages)
    }

    async fn update_profile(&self, prefs: &Preferences) -> Result<(), ApiError> {
        let builder = self.request(Method::PUT, "/api/user/profile").json(prefs);
        let _: serde_json::Value = self.call(builder).await?;
        Ok(())
    }
}
