//! Event pump: applies library events to the connection state in arrival order.

use super::{preview, ChatSummary, Lifecycle, MAX_CHATS};
use crate::audit::AuditRecord;
use crate::commands::{self, Command, CommandContext};
use edison_core::{
    message::{normalize_jid, IncomingMessage},
    state::ConnectionState,
    traits::{CloseReason, SessionEvent},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

impl Lifecycle {
    /// Drain one session's events until the channel closes or the session is
    /// superseded.
    pub(super) async fn pump(self: Arc<Self>, generation: u64, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            if !self.apply_event(generation, event).await {
                break;
            }
        }
        debug!("event pump for generation {generation} stopped");
    }

    /// Apply one event. Returns `false` when the pump should stop.
    async fn apply_event(self: &Arc<Self>, generation: u64, event: SessionEvent) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            debug!("dropping event from stale session generation {generation}");
            return false;
        }

        match event {
            SessionEvent::Connecting => {
                if self.state.send_if_modified(ConnectionState::begin_connecting) {
                    info!("Connecting to WhatsApp...");
                    self.activity.push("Connecting to WhatsApp...");
                }
            }
            SessionEvent::PairingCode(code) => {
                let issued = self
                    .state
                    .send_if_modified(|s| s.issue_pairing_code(code.clone()));
                if issued {
                    info!("Pairing code issued");
                    self.activity.push(format!("Pairing code generated: {code}"));
                }
            }
            SessionEvent::QrIssued => {
                self.activity.push("QR code received");
            }
            SessionEvent::Open => {
                let phone = slot.phone.clone().unwrap_or_default();
                self.state.send_modify(|s| s.open(phone.clone()));
                info!("Connected to WhatsApp as {phone}");
                self.activity
                    .push(format!("✅ Connected to WhatsApp as {phone}"));

                let session = slot.session.clone();
                drop(slot);

                if let Some(session) = session {
                    let welcome = format!(
                        "🤖 Edison Bot is now active!\n\nConnected as: {phone}\nTime: {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                    );
                    match session.send_text(&normalize_jid(&phone), &welcome).await {
                        Ok(()) => self.activity.push("Welcome message sent"),
                        Err(e) => warn!("Could not send welcome message: {e}"),
                    }
                }
                self.forward_audit(
                    AuditRecord::new("Bot connected", "info", self.phase()).with_phone(phone),
                );
            }
            SessionEvent::Close(reason) => {
                info!("Connection closed: {reason}");
                self.activity
                    .push(format!("Connection closed. Reason: {reason}"));
                self.state.send_modify(|s| {
                    s.close(&reason);
                });

                match reason {
                    CloseReason::LoggedOut => {
                        self.activity.push("Logged out from WhatsApp");
                        self.release(&mut slot, false).await;
                        slot.phone = None;
                        slot.generation += 1;
                        self.purge_credentials();
                        return false;
                    }
                    CloseReason::Other(_) => {
                        self.activity.push(format!(
                            "Attempting to reconnect in {}s...",
                            self.options.reconnect_delay.as_secs()
                        ));
                        self.schedule_reconnect(&mut slot);
                    }
                }
            }
            SessionEvent::Message(msg) => {
                drop(slot);
                self.handle_incoming(msg).await;
            }
            SessionEvent::Reaction { from } => {
                self.activity.push(format!("Reaction from {from}"));
            }
        }
        true
    }

    async fn handle_incoming(self: &Arc<Self>, msg: IncomingMessage) {
        if msg.from_me {
            return;
        }

        let name = msg.display_name().to_string();
        info!("Message from {name}: {}...", preview(&msg.text));
        self.activity
            .push(format!("Message from {name}: {}...", preview(&msg.text)));
        self.record_chat(&msg);

        if let Some(cmd) = Command::parse(&msg.text) {
            self.run_command(&cmd, &msg).await;
        }

        self.forward_audit(
            AuditRecord::new(msg.text.clone(), "message", self.phase())
                .with_phone(name)
                .with_metadata(serde_json::Value::String(msg.chat.clone())),
        );
    }

    async fn run_command(&self, cmd: &Command, msg: &IncomingMessage) {
        info!("Command received: {} from {}", cmd.name(), msg.display_name());
        self.activity
            .push(format!("Command: {} from {}", cmd.name(), msg.display_name()));

        let state = self.snapshot();
        let ctx = CommandContext {
            phase: state.phase(),
            remote_identity: state.remote_identity(),
            uptime: self.uptime(),
            memory_bytes: crate::process::resident_memory_bytes(),
        };
        let reply = commands::handle(cmd, &ctx);

        let session = self.slot.lock().await.session.clone();
        let Some(session) = session else {
            warn!("No session to reply to {} on", msg.chat);
            return;
        };
        if let Err(e) = session.send_text(&msg.chat, &reply).await {
            warn!("Command reply to {} failed: {e}", msg.chat);
            self.activity.push(format!("Command reply failed: {e}"));
        }
    }

    fn record_chat(&self, msg: &IncomingMessage) {
        let mut chats = self.lock_chats();
        chats.retain(|c| c.id != msg.chat);
        chats.push_front(ChatSummary {
            id: msg.chat.clone(),
            name: msg.sender_name.clone(),
            is_group: msg.is_group,
            last_message_at: msg.timestamp,
        });
        chats.truncate(MAX_CHATS);
    }
}
