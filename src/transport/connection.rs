// Hub connection management
// One websocket per session; reconnects forever with jittered exponential backoff.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::{decode_event, encode_intent, OutboundIntent, TransportEvent};

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub url: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl HubConfig {
    pub fn new(url: impl Into<String>) -> Self {
        HubConfig {
            url: url.into(),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Why a connected session ended.
enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Spawn the connection task. It runs until either channel is closed by the runtime.
pub fn spawn_hub_connection(
    config: HubConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    intents: mpsc::UnboundedReceiver<OutboundIntent>,
) -> JoinHandle<()> {
    tokio::spawn(run_hub_connection(config, events, intents))
}

async fn run_hub_connection(
    config: HubConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut intents: mpsc::UnboundedReceiver<OutboundIntent>,
) {
    let mut backoff = config.initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        info!("Connecting to hub at {} (attempt {})", config.url, attempt);

        match connect_async(config.url.as_str()).await {
            Ok((mut ws, _)) => {
                attempt = 0;
                backoff = config.initial_backoff;

                // No offline queue: whatever piled up while disconnected is stale
                let stale = drain(&mut intents);
                if stale > 0 {
                    debug!("Dropped {} intents produced while disconnected", stale);
                }

                if events.send(TransportEvent::Connected).is_err() {
                    let _ = ws.close(None).await;
                    return;
                }
                info!("Connected to hub");

                let end = loop {
                    tokio::select! {
                        frame = ws.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                if let Some(event) = decode_event(text.as_str()) {
                                    if events.send(TransportEvent::Inbound(event)).is_err() {
                                        break SessionEnd::Shutdown;
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("Hub closed the connection");
                                break SessionEnd::Dropped;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("Hub connection error: {}", e);
                                break SessionEnd::Dropped;
                            }
                        },
                        intent = intents.recv() => match intent {
                            Some(intent) => match encode_intent(&intent) {
                                Ok(frame) => {
                                    if let Err(e) = ws.send(WsMessage::Text(frame.into())).await {
                                        error!("Failed to send {} to hub: {}", intent.name(), e);
                                        break SessionEnd::Dropped;
                                    }
                                    debug!("Sent {} to hub", intent.name());
                                }
                                Err(e) => error!("Failed to encode {}: {}", intent.name(), e),
                            },
                            None => break SessionEnd::Shutdown,
                        },
                    }
                };

                match end {
                    SessionEnd::Shutdown => {
                        info!("Closing hub connection");
                        let _ = ws.close(None).await;
                        return;
                    }
                    SessionEnd::Dropped => {
                        if events.send(TransportEvent::Disconnected).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to connect to hub on attempt {}: {}", attempt, e);
            }
        }

        if events.is_closed() {
            return;
        }
        let delay = with_jitter(backoff);
        info!("Reconnecting to hub in {:?}", delay);
        tokio::time::sleep(delay).await;
        backoff = next_backoff(backoff, config.max_backoff);
    }
}

fn drain(intents: &mut mpsc::UnboundedReceiver<OutboundIntent>) -> usize {
    let mut dropped = 0;
    while intents.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

fn with_jitter(delay: Duration) -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
    delay + Duration::from_millis(jitter_ms)
}
