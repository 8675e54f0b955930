//! WhatsApp session: pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Linking is done with a phone-number pairing code.
//! Credentials are persisted to `{auth_dir}/whatsapp.db` by the library's
//! SQLite store on every change.

mod bot;
mod events;
mod send;


use async_trait::async_trait;
use edison_core::{error::EdisonError, traits::Session};
use send::{parse_jid, retry_send};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::info;
use whatsapp_rust::client::Client;

/// File name of the session database inside the credential directory.
pub const SESSION_DB: &str = "whatsapp.db";

/// Written into the credential directory once a session has linked.
pub const PAIRED_MARKER: &str = ".paired";

/// Builds [`WhatsAppSession`]s. Implements `SessionFactory`.
pub struct WhatsAppConnector {
    pub(super) device_name: String,
}

impl WhatsAppConnector {
    /// Create a connector. `device_name` is what the phone lists under Linked Devices.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
        }
    }

    /// Get the session database path, creating the directory if needed.
    pub(super) fn session_db_path(auth_dir: &Path) -> Result<PathBuf, EdisonError> {
        edison_core::credentials::ensure_dir(auth_dir)?;
        Ok(auth_dir.join(SESSION_DB))
    }
}

/// A running WhatsApp client.
pub struct WhatsAppSession {
    client: Arc<Client>,
    /// Background task driving the connection. Taken on logout.
    runner: Mutex<Option<AbortHandle>>,
    registered: bool,
}

#[async_trait]
impl Session for WhatsAppSession {
    fn is_registered(&self) -> bool {
        self.registered
    }

    async fn send_text(&self, jid: &str, text: &str) -> Result<(), EdisonError> {
        let jid = parse_jid(jid)?;
        let msg = waproto::whatsapp::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
        retry_send(&self.client, &jid, msg).await?;
        Ok(())
    }

    /// Close the transport and stop the runner. The keepalive loop exits once
    /// the client is no longer running, and the library does not redial after
    /// an intentional disconnect.
    async fn logout(&self) -> Result<(), EdisonError> {
        let Some(runner) = self.runner.lock().await.take() else {
            return Ok(());
        };
        self.client.disconnect().await;
        runner.abort();
        info!("WhatsApp session stopped");
        Ok(())
    }
}
