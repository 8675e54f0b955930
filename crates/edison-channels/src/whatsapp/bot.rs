//! Bot lifecycle: building and running the WhatsApp bot.

use super::events::translate_event;
use super::{WhatsAppConnector, WhatsAppSession, PAIRED_MARKER};
use async_trait::async_trait;
use edison_core::{
    credentials,
    error::EdisonError,
    traits::{Session, SessionEvent, SessionFactory, SessionRequest},
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::pair_code::PairCodeOptions;
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

#[async_trait]
impl SessionFactory for WhatsAppConnector {
    /// Build a WhatsApp bot with the event forwarder and run it in the background.
    ///
    /// Without a completed link (no marker file) the bot is configured for the
    /// pair-code flow against `request.phone`; the code arrives later as a
    /// `SessionEvent::PairingCode`. The marker is written on the first
    /// `Connected` event and purged together with the rest of the directory.
    async fn connect(
        &self,
        request: SessionRequest,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<dyn Session>, EdisonError> {
        let marker = request.auth_dir.join(PAIRED_MARKER);
        let registered = marker.exists();
        if !registered && credentials::has_credentials(&request.auth_dir) {
            // Leftovers from an attempt that never linked. The library will not
            // issue a fresh pairing code against half-written keys.
            info!(
                "deleting stale WhatsApp session at {}",
                request.auth_dir.display()
            );
            credentials::purge(&request.auth_dir)?;
        }
        let db_path = Self::session_db_path(&request.auth_dir)?;

        info!(
            "WhatsApp bot building (session: {}, registered: {registered})...",
            db_path.display()
        );

        let backend = Arc::new(
            SqliteStore::new(&db_path.to_string_lossy())
                .await
                .map_err(|e| EdisonError::Session(format!("whatsapp store init failed: {e}")))?,
        );

        let tx_events = events.clone();
        let mut builder = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, _client| {
                let tx = tx_events.clone();
                let marker = marker.clone();
                async move {
                    if matches!(event, Event::Connected(_)) {
                        if let Err(e) = std::fs::write(&marker, b"") {
                            warn!("failed to write {}: {e}", marker.display());
                        }
                    }
                    let Some(translated) = translate_event(event) else {
                        return;
                    };
                    if tx.send(translated).await.is_err() {
                        debug!("whatsapp event receiver dropped");
                    }
                }
            });

        if !registered {
            info!("WhatsApp pair-code flow enabled for {}", request.phone);
            builder = builder.with_pair_code(PairCodeOptions {
                phone_number: request.phone.clone(),
                ..Default::default()
            });
        }

        let mut bot = builder
            .build()
            .await
            .map_err(|e| EdisonError::Session(format!("whatsapp bot build failed: {e}")))?;

        let client = bot.client();

        // Run bot in background.
        let handle = bot
            .run()
            .await
            .map_err(|e| EdisonError::Session(format!("whatsapp bot run failed: {e}")))?;

        if registered {
            let _ = events.send(SessionEvent::Connecting).await;
        }

        info!("WhatsApp bot started");
        Ok(Arc::new(WhatsAppSession {
            client,
            runner: Mutex::new(Some(handle.abort_handle())),
            registered,
        }))
    }
}
