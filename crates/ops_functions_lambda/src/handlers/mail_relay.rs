use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adapters::mail_sender::MailSender;
use crate::adapters::mail_store::{FetchError, MailStore};
use crate::runtime::contract::RelayConfig;
use crate::runtime::message::{
    rewrite_for_relay, MailMessage, OutboundEnvelope, ParseError, RelayAddressing,
};
use crate::runtime::storage_paths::{console_object_url, message_object_key};

/// How the send attempt ended. A failed send is a handler-level outcome,
/// not an invocation failure: the caller logs it and the invocation
/// completes, leaving redelivery to the triggering platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { message_id: String },
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::Sent { message_id } => format!("Email sent! Message ID: {message_id}"),
            Self::Failed { error } => error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayResponse {
    pub inbound_message_id: String,
    pub object_key: String,
    pub dispatch: DispatchOutcome,
}

/// Fatal relay failures. Both propagate to the platform unhandled; the
/// receipt rule's own redelivery applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    Retrieval(FetchError),
    Parse(ParseError),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrieval(error) => write!(f, "failed to retrieve message: {error}"),
            Self::Parse(error) => write!(f, "failed to parse message: {error}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<FetchError> for RelayError {
    fn from(error: FetchError) -> Self {
        Self::Retrieval(error)
    }
}

impl From<ParseError> for RelayError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

/// Relays one inbound message: fetch from storage, rewrite the addressing
/// headers, resubmit through the mail sender. Strictly linear, no retries.
pub fn handle_mail_event(
    message_id: &str,
    config: &RelayConfig,
    store: &impl MailStore,
    sender: &impl MailSender,
) -> Result<RelayResponse, RelayError> {
    let object_key = message_object_key(config.prefix.as_deref(), message_id);
    let object_url = console_object_url(&config.bucket, &object_key, &config.region);

    log_relay_info(
        "message_received",
        json!({
            "message_id": message_id,
            "object_key": object_key.clone(),
        }),
    );

    let raw = store.fetch_object(&object_key)?;
    let original = MailMessage::parse(&raw)?;

    let addressing = RelayAddressing {
        authorized_sender: &config.mail_from,
        new_recipient: &config.mail_recipient,
        source_object_url: &object_url,
    };
    let rewritten = rewrite_for_relay(&original, &addressing);

    log_relay_info(
        "message_rewritten",
        json!({
            "message_id": message_id,
            "original_sender": original.first_header("From").unwrap_or(""),
            "original_recipient": original.first_header("To").unwrap_or(""),
            "authorized_sender": config.mail_from.clone(),
            "new_recipient": config.mail_recipient.clone(),
        }),
    );

    let envelope = OutboundEnvelope {
        source: config.mail_from.clone(),
        destinations: vec![config.mail_recipient.clone()],
        raw_message: rewritten.to_bytes(),
    };

    let dispatch = match sender.send_raw(&envelope) {
        Ok(outbound_id) => {
            log_relay_info(
                "dispatch_succeeded",
                json!({
                    "message_id": message_id,
                    "outbound_message_id": outbound_id.clone(),
                }),
            );
            DispatchOutcome::Sent {
                message_id: outbound_id,
            }
        }
        Err(error) => {
            log_relay_error(
                "dispatch_failed",
                json!({
                    "message_id": message_id,
                    "error": error.clone(),
                }),
            );
            DispatchOutcome::Failed { error }
        }
    };

    Ok(RelayResponse {
        inbound_message_id: message_id.to_string(),
        object_key,
        dispatch,
    })
}

fn log_relay_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "mail_relay_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_relay_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "mail_relay_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
