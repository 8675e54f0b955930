//! In-memory session factory for lifecycle and HTTP tests.

use async_trait::async_trait;
use edison_core::{
    error::EdisonError,
    traits::{CloseReason, Session, SessionEvent, SessionFactory, SessionRequest},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What the next `connect` does.
#[derive(Debug, Clone)]
pub(crate) enum Behaviour {
    /// Unregistered session that immediately issues this pairing code.
    IssueCode(String),
    /// Registered session that connects straight away.
    ConnectDirectly,
    /// Unregistered session that never emits anything.
    Silent,
    /// `connect` itself fails.
    Fail,
}

#[derive(Default)]
pub(crate) struct Recorded {
    pub connects: Vec<SessionRequest>,
    pub sent: Vec<(String, String)>,
    pub logouts: usize,
    /// Event senders, one per connect, oldest first.
    pub senders: Vec<mpsc::Sender<SessionEvent>>,
}

pub(crate) struct FakeFactory {
    behaviour: Mutex<Behaviour>,
    fail_sends: Arc<AtomicUsize>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl FakeFactory {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Mutex::new(behaviour),
            fail_sends: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        })
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Make the next `n` sends fail.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_sends.store(n, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.recorded.lock().unwrap().connects.len()
    }

    pub fn logout_count(&self) -> usize {
        self.recorded.lock().unwrap().logouts
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.recorded.lock().unwrap().sent.clone()
    }

    /// Emit an event on the session started by connect number `index`.
    pub async fn emit_on(&self, index: usize, event: SessionEvent) {
        let tx = self.recorded.lock().unwrap().senders[index].clone();
        let _ = tx.send(event).await;
    }

    /// Emit an event on the most recent session.
    pub async fn emit(&self, event: SessionEvent) {
        let tx = self.recorded.lock().unwrap().senders.last().unwrap().clone();
        let _ = tx.send(event).await;
    }

    pub async fn close(&self, reason: CloseReason) {
        self.emit(SessionEvent::Close(reason)).await;
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn connect(
        &self,
        request: SessionRequest,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Session>, EdisonError> {
        let behaviour = self.behaviour.lock().unwrap().clone();
        {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.connects.push(request);
            recorded.senders.push(events.clone());
        }

        let registered = match behaviour {
            Behaviour::Fail => return Err(EdisonError::Session("socket refused".to_string())),
            Behaviour::IssueCode(code) => {
                let _ = events.try_send(SessionEvent::PairingCode(code));
                false
            }
            Behaviour::ConnectDirectly => {
                let _ = events.try_send(SessionEvent::Connecting);
                let _ = events.try_send(SessionEvent::Open);
                true
            }
            Behaviour::Silent => false,
        };

        Ok(Arc::new(FakeSession {
            registered,
            fail_sends: Arc::clone(&self.fail_sends),
            recorded: Arc::clone(&self.recorded),
        }))
    }
}

struct FakeSession {
    registered: bool,
    fail_sends: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl Session for FakeSession {
    fn is_registered(&self) -> bool {
        self.registered
    }

    async fn send_text(&self, jid: &str, text: &str) -> Result<(), EdisonError> {
        let failing = self
            .fail_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(EdisonError::Session("send failed".to_string()));
        }
        self.recorded
            .lock()
            .unwrap()
            .sent
            .push((jid.to_string(), text.to_string()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), EdisonError> {
        self.recorded.lock().unwrap().logouts += 1;
        Ok(())
    }
}
