use crate::{error::EdisonError, message::IncomingMessage};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why the protocol connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The linked device was removed from the phone (or the server revoked
    /// the session). Stored credentials are no longer valid.
    LoggedOut,
    /// Any other close: network drop, stream error, server restart.
    Other(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Events emitted asynchronously by a running protocol session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Transport is dialing / handshaking with stored credentials.
    Connecting,
    /// The library issued a phone-number pairing code.
    PairingCode(String),
    /// The library issued a QR payload. Pairing here is code-based, so this is only logged.
    QrIssued,
    /// Session is fully open.
    Open,
    /// Session closed.
    Close(CloseReason),
    /// Inbound chat message.
    Message(IncomingMessage),
    /// Someone reacted to a message.
    Reaction { from: String },
}

/// Parameters for starting a session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Phone number (digits only, with country code) to pair against.
    pub phone: String,
    /// Directory the library persists credential material into.
    pub auth_dir: PathBuf,
}

/// A live connection to the messaging protocol client.
///
/// Owned exclusively by the lifecycle controller; at most one exists at a time.
#[async_trait]
pub trait Session: Send + Sync {
    /// Whether the credentials this session started from were already registered
    /// (no pairing code will be needed).
    fn is_registered(&self) -> bool;

    /// Send a plain text message to a JID.
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), EdisonError>;

    /// Release the session: stop the background connection and drop the client.
    async fn logout(&self) -> Result<(), EdisonError>;
}

/// Builds sessions. The lifecycle controller owns one of these and calls it on
/// every pairing request and every scheduled reconnect.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Start a new session. Library events must be forwarded into `events`
    /// in the order they are observed.
    async fn connect(
        &self,
        request: SessionRequest,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Session>, EdisonError>;
}
