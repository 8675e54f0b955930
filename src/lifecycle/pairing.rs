//! Pairing requests and scheduled reconnects.

use super::Lifecycle;
use edison_core::{error::EdisonError, state::Phase};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a pairing request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// The library issued a code to enter on the phone.
    CodeIssued { code: String },
    /// Stored credentials were still valid; no code was needed.
    ConnectedDirectly { phone: String },
    /// A session is already open. Nothing was changed.
    AlreadyConnected { phone: Option<String> },
}

/// Digits only, 10 to 15 of them (country code included, no `+`).
pub fn validate_phone(phone: &str) -> Result<(), EdisonError> {
    let valid = (10..=15).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(EdisonError::Validation(
            "Invalid phone number format. Use 10-15 digits without + or spaces.".to_string(),
        ))
    }
}

impl Lifecycle {
    /// Start a session for `phone` and wait (bounded) for either a pairing code
    /// or a direct connection.
    ///
    /// On timeout the caller gets [`EdisonError::Timeout`] while the session
    /// keeps running in the background; a code may still arrive later and show
    /// up in `/status`.
    pub async fn request_pairing(self: &Arc<Self>, phone: &str) -> Result<PairOutcome, EdisonError> {
        validate_phone(phone)?;

        info!("Pairing request for: {phone}");
        self.activity.push(format!("Pairing request for: {phone}"));

        let mut rx = self.subscribe();
        {
            let mut slot = self.slot.lock().await;
            let current = self.state.borrow().clone();
            if current.is_connected() {
                return Ok(PairOutcome::AlreadyConnected {
                    phone: current.remote_identity().map(str::to_string),
                });
            }
            self.release(&mut slot, true).await;
            self.start_session(&mut slot, phone).await?;
        }

        let waited = tokio::time::timeout(
            self.options.pair_timeout,
            rx.wait_for(|s| s.pairing_code().is_some() || s.is_connected()),
        )
        .await
        .map(|r| r.map(|s| s.clone()));

        match waited {
            Ok(Ok(state)) => match state.pairing_code() {
                Some(code) if !state.is_connected() => {
                    info!("Pairing code generated for {phone}");
                    self.activity
                        .push(format!("Pairing code generated for {phone}: {code}"));
                    Ok(PairOutcome::CodeIssued {
                        code: code.to_string(),
                    })
                }
                _ => {
                    info!("Connected to {phone} without pairing");
                    self.activity
                        .push(format!("Connected to {phone} without pairing"));
                    Ok(PairOutcome::ConnectedDirectly {
                        phone: phone.to_string(),
                    })
                }
            },
            _ => {
                warn!("No pairing code for {phone} within {:?}", self.options.pair_timeout);
                self.activity
                    .push(format!("Failed to generate pairing code for {phone}"));
                Err(EdisonError::Timeout("waiting for pairing code".to_string()))
            }
        }
    }

    /// Re-run the connect sequence for `generation` after the configured delay.
    /// Called with the slot held, from the event pump.
    pub(super) fn schedule_reconnect(self: &Arc<Self>, slot: &mut super::SessionSlot) {
        let Some(phone) = slot.phone.clone() else {
            debug!("no phone on record, not reconnecting");
            return;
        };
        if let Some(previous) = slot.reconnect.take() {
            previous.abort();
        }
        let generation = slot.generation;
        let delay = self.options.reconnect_delay;
        let this = Arc::clone(self);
        slot.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.reconnect(generation, phone).await;
        }));
    }

    // Boxed: start_session spawns the pump, which schedules this, which calls
    // start_session again. A concrete future type breaks that cycle.
    fn reconnect(
        self: Arc<Self>,
        generation: u64,
        phone: String,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut slot = self.slot.lock().await;
            if slot.generation != generation || self.phase() != Phase::Reconnecting {
                debug!("reconnect for generation {generation} superseded");
                return;
            }
            // This task is the timer; detach it so release() does not abort us.
            drop(slot.reconnect.take());
            info!("Reconnecting to WhatsApp as {phone}");
            self.release(&mut slot, true).await;
            if let Err(e) = self.start_session(&mut slot, &phone).await {
                warn!("Reconnect failed: {e}");
            }
        })
    }
}
