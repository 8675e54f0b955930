//! Translation of library events into `SessionEvent`s.

use edison_core::message::IncomingMessage;
use edison_core::traits::{CloseReason, SessionEvent};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wacore::types::events::Event;

/// Map a library event onto the lifecycle's vocabulary. Events the lifecycle
/// does not care about map to `None`.
pub(super) fn translate_event(event: Event) -> Option<SessionEvent> {
    match event {
        Event::PairingCode { code, .. } => {
            info!("WhatsApp pairing code issued");
            Some(SessionEvent::PairingCode(code))
        }
        Event::PairingQrCode { .. } => Some(SessionEvent::QrIssued),
        Event::PairSuccess(_) => {
            info!("WhatsApp pairing successful!");
            None
        }
        Event::Connected(_) => Some(SessionEvent::Open),
        Event::Disconnected(_) => {
            warn!("WhatsApp disconnected");
            Some(SessionEvent::Close(CloseReason::Other(
                "connection lost".to_string(),
            )))
        }
        Event::LoggedOut(_) => {
            warn!("WhatsApp logged out: session invalidated");
            Some(SessionEvent::Close(CloseReason::LoggedOut))
        }
        Event::StreamError(e) => {
            warn!("WhatsApp stream error: {e:?}");
            None
        }
        Event::Message(msg, info) => translate_message(*msg, info),
        _ => None,
    }
}

/// Unwrap an incoming message into a reaction or a text message.
fn translate_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
) -> Option<SessionEvent> {
    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        info.source.is_group, info.source.is_from_me, info.source.sender.user, info.source.chat.user,
    );

    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(&msg);

    if inner.reaction_message.is_some() {
        return Some(SessionEvent::Reaction {
            from: info.source.sender.to_string(),
        });
    }

    let text = extract_text(
        inner.conversation.as_deref(),
        inner
            .extended_text_message
            .as_ref()
            .and_then(|e| e.text.as_deref()),
        inner
            .image_message
            .as_ref()
            .and_then(|i| i.caption.as_deref()),
    );
    if text.is_empty() {
        return None;
    }

    let sender_name = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    Some(SessionEvent::Message(IncomingMessage {
        id: Uuid::new_v4(),
        sender_id: info.source.sender.user.clone(),
        sender_name,
        text,
        timestamp: chrono::Utc::now(),
        chat: info.source.chat.to_string(),
        from_me: info.source.is_from_me,
        is_group: info.source.is_group,
    }))
}

/// First non-empty of: plain conversation, extended text, image caption.
pub(super) fn extract_text(
    conversation: Option<&str>,
    extended: Option<&str>,
    caption: Option<&str>,
) -> String {
    [conversation, extended, caption]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}
