// Client-side state reconciliation for a realtime one-to-one chat
pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod session;
pub mod state;
pub mod transport;

pub use client::{ChatClient, Command, ViewSnapshot};
pub use engine::{ChatEngine, Effect, NoticeLevel};
pub use models::*;
pub use session::{Preferences, SessionContext};
