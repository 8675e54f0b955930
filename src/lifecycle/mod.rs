//! Lifecycle controller: owns the single WhatsApp session and drives
//! `ConnectionState` from pairing requests and library events.
//!
//! All check-then-act sequences run while holding the session slot mutex.
//! Each started session gets a new generation; its event pump and any
//! reconnect timer carry that generation and go quiet once it is superseded.

mod events;
mod pairing;

#[cfg(test)]
pub(crate) mod fake;

pub use pairing::{validate_phone, PairOutcome};

use crate::audit::{AuditRecord, AuditSink};
use chrono::{DateTime, Utc};
use edison_core::{
    activity::ActivityLog,
    config::SessionConfig,
    credentials,
    error::EdisonError,
    message::normalize_jid,
    state::{ConnectionState, Phase},
    traits::{Session, SessionFactory, SessionRequest},
};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Most chats kept for `/chats`.
pub const MAX_CHATS: usize = 50;

/// Buffered library events per session before the library's callback waits.
const EVENT_BUFFER: usize = 64;

/// Timing and storage knobs.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub auth_dir: PathBuf,
    pub pair_timeout: Duration,
    pub reconnect_delay: Duration,
    pub activity_capacity: usize,
}

impl From<&SessionConfig> for LifecycleOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            auth_dir: config.auth_dir(),
            pair_timeout: config.pair_timeout(),
            reconnect_delay: config.reconnect_delay(),
            activity_capacity: config.activity_capacity,
        }
    }
}

/// A chat seen in inbound traffic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub name: Option<String>,
    pub is_group: bool,
    pub last_message_at: DateTime<Utc>,
}

/// The live session and everything tied to its generation.
#[derive(Default)]
struct SessionSlot {
    session: Option<Arc<dyn Session>>,
    /// Phone number of the current (or last attempted) session; reused by reconnects.
    phone: Option<String>,
    generation: u64,
    pump: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

/// Session lifecycle controller. Shared by `Arc` with every HTTP handler.
pub struct Lifecycle {
    factory: Arc<dyn SessionFactory>,
    slot: Mutex<SessionSlot>,
    state: watch::Sender<ConnectionState>,
    activity: Arc<ActivityLog>,
    chats: std::sync::Mutex<VecDeque<ChatSummary>>,
    audit: Option<AuditSink>,
    options: LifecycleOptions,
    uptime: Instant,
}

impl Lifecycle {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        options: LifecycleOptions,
        audit: Option<AuditSink>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::new());
        Self {
            factory,
            slot: Mutex::new(SessionSlot::default()),
            state,
            activity: Arc::new(ActivityLog::new(options.activity_capacity)),
            chats: std::sync::Mutex::new(VecDeque::new()),
            audit,
            options,
            uptime: Instant::now(),
        }
    }

    /// Current connection state.
    pub fn snapshot(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Watch every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    pub fn uptime(&self) -> Duration {
        self.uptime.elapsed()
    }

    /// Log out of the session (if any), purge credentials, and reset to
    /// `Disconnected`. Safe to call in any phase, including with no session.
    pub async fn disconnect(&self) {
        info!("Disconnect request received");
        self.activity.push("Disconnect request received");

        let mut slot = self.slot.lock().await;
        self.release(&mut slot, true).await;
        slot.phone = None;
        // Anything still in flight for the old session is now stale.
        slot.generation += 1;
        self.purge_credentials();
        self.state.send_modify(ConnectionState::reset);
        drop(slot);

        info!("Bot disconnected");
        self.activity.push("Bot disconnected successfully");
    }

    /// Send `text` to `to` (a JID or a bare phone number). Returns the JID used.
    ///
    /// Rejected with [`EdisonError::Conflict`] unless connected; nothing is sent then.
    pub async fn send_message(&self, to: &str, text: &str) -> Result<String, EdisonError> {
        let session = self.connected_session().await?;
        let jid = normalize_jid(to);

        match session.send_text(&jid, text).await {
            Ok(()) => {
                info!("Message sent to {jid}");
                self.activity
                    .push(format!("Message sent to {to}: {}...", preview(text)));
                Ok(jid)
            }
            Err(e) => {
                error!("Failed to send message to {jid}: {e}");
                self.activity.push(format!("Failed to send message: {e}"));
                Err(e)
            }
        }
    }

    /// Chats seen since start, newest first. Rejected unless connected.
    pub async fn chats(&self) -> Result<Vec<ChatSummary>, EdisonError> {
        self.connected_session().await?;
        Ok(self.lock_chats().iter().cloned().collect())
    }

    /// Release the session on process shutdown. Credentials are kept.
    pub async fn shutdown(&self) {
        info!("Shutting down session");
        self.activity.push("Server shutting down...");
        let mut slot = self.slot.lock().await;
        self.release(&mut slot, true).await;
    }

    /// Start a fresh session for `phone` into `slot`. The caller has already
    /// released whatever the slot held.
    async fn start_session(
        self: &Arc<Self>,
        slot: &mut SessionSlot,
        phone: &str,
    ) -> Result<(), EdisonError> {
        info!("Starting bot for {phone}");
        self.activity.push(format!("Starting bot for {phone}..."));

        slot.generation += 1;
        slot.phone = Some(phone.to_string());
        let generation = slot.generation;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let request = SessionRequest {
            phone: phone.to_string(),
            auth_dir: self.options.auth_dir.clone(),
        };

        let session = match self.factory.connect(request, tx).await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to start bot: {e}");
                self.activity.push(format!("Failed to start bot: {e}"));
                self.state.send_modify(ConnectionState::fail);
                return Err(e);
            }
        };

        if session.is_registered() {
            self.activity.push("Using existing credentials");
            self.state.send_modify(|s| {
                s.begin_connecting();
            });
        } else {
            self.state.send_modify(ConnectionState::begin_pairing);
        }

        slot.session = Some(session);
        let this = Arc::clone(self);
        slot.pump = Some(tokio::spawn(async move {
            this.pump(generation, rx).await;
        }));
        Ok(())
    }

    /// Cancel any pending reconnect and log out of the current session
    /// (best-effort). The pump is aborted only when `abort_pump` is set; the
    /// pump itself passes `false` so it can finish the event it is handling.
    async fn release(&self, slot: &mut SessionSlot, abort_pump: bool) {
        if let Some(timer) = slot.reconnect.take() {
            timer.abort();
            debug!("pending reconnect cancelled");
        }
        if let Some(pump) = slot.pump.take() {
            if abort_pump {
                pump.abort();
            }
        }
        if let Some(session) = slot.session.take() {
            if let Err(e) = session.logout().await {
                debug!("ignoring logout error on stale session: {e}");
            }
        }
    }

    async fn connected_session(&self) -> Result<Arc<dyn Session>, EdisonError> {
        let slot = self.slot.lock().await;
        match (&slot.session, self.phase()) {
            (Some(session), Phase::Connected) => Ok(Arc::clone(session)),
            _ => Err(EdisonError::Conflict("Bot is not connected".to_string())),
        }
    }

    fn purge_credentials(&self) {
        match credentials::purge(&self.options.auth_dir) {
            Ok(0) => {}
            Ok(n) => {
                info!("Purged {n} credential file(s)");
                self.activity.push("Session files cleared");
            }
            Err(e) => {
                warn!("Failed to clear session files: {e}");
                self.activity.push(format!("Failed to clear session files: {e}"));
            }
        }
    }

    fn lock_chats(&self) -> std::sync::MutexGuard<'_, VecDeque<ChatSummary>> {
        self.chats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forward a record to the audit sink in the background, if one is configured.
    fn forward_audit(&self, record: AuditRecord) {
        let Some(sink) = self.audit.clone() else {
            return;
        };
        let activity = Arc::clone(&self.activity);
        tokio::spawn(async move {
            if let Err(e) = sink.forward(&record).await {
                warn!("{e}");
                activity.push(format!("Audit forward failed: {e}"));
            }
        });
    }
}

/// First 50 characters of `text`.
fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
