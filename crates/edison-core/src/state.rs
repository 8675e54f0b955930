//! Connection lifecycle state.
//!
//! `ConnectionState` is a plain value; the lifecycle controller owns the only
//! live instance and is the only writer. Every phase change goes through
//! [`ConnectionState::enter`], which enforces the field invariants:
//!
//! - `remote_identity` is set iff `phase == Connected`
//! - `pairing_code` is cleared the moment `phase` leaves `Pairing`
//! - `last_transition_at` moves on every phase change

use crate::traits::CloseReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of the single external session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Disconnected,
    Pairing,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Pairing => "pairing",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    phase: Phase,
    remote_identity: Option<String>,
    pairing_code: Option<String>,
    last_transition_at: DateTime<Utc>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Disconnected,
            remote_identity: None,
            pairing_code: None,
            last_transition_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remote_identity(&self) -> Option<&str> {
        self.remote_identity.as_deref()
    }

    pub fn pairing_code(&self) -> Option<&str> {
        self.pairing_code.as_deref()
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.last_transition_at
    }

    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.last_transition_at = Utc::now();
        if phase != Phase::Pairing {
            self.pairing_code = None;
        }
        if phase != Phase::Connected {
            self.remote_identity = None;
        }
    }

    /// A fresh session without registered credentials is waiting for a code.
    /// Any code from an earlier session is dropped.
    pub fn begin_pairing(&mut self) {
        self.enter(Phase::Pairing);
        self.pairing_code = None;
    }

    /// Transport is dialing. Ignored once connected; returns whether it applied.
    pub fn begin_connecting(&mut self) -> bool {
        if self.phase == Phase::Connected {
            return false;
        }
        self.enter(Phase::Connecting);
        true
    }

    /// Record a pairing code issued by the library. Ignored once connected.
    pub fn issue_pairing_code(&mut self, code: impl Into<String>) -> bool {
        if self.phase == Phase::Connected {
            return false;
        }
        self.enter(Phase::Pairing);
        self.pairing_code = Some(code.into());
        true
    }

    /// Session opened for `identity`.
    pub fn open(&mut self, identity: impl Into<String>) {
        self.enter(Phase::Connected);
        self.remote_identity = Some(identity.into());
    }

    /// Apply a close event. Returns the resulting phase.
    pub fn close(&mut self, reason: &CloseReason) -> Phase {
        match reason {
            CloseReason::LoggedOut => self.enter(Phase::Disconnected),
            CloseReason::Other(_) => self.enter(Phase::Reconnecting),
        }
        self.phase
    }

    /// Back to the initial phase (explicit disconnect, logout).
    pub fn reset(&mut self) {
        self.enter(Phase::Disconnected);
    }

    /// Session could not be started.
    pub fn fail(&mut self) {
        self.enter(Phase::Error);
    }
}
