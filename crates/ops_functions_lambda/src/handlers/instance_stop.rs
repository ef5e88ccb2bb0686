use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adapters::instance_control::InstanceControl;
use crate::adapters::notification::Notifier;
use crate::runtime::contract::StopConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopResponse {
    pub status: String,
    pub instances_stopped: Vec<String>,
    pub publish_message_id: String,
}

/// Any collaborator failure here is fatal: it propagates to the platform
/// and surfaces through the trigger's error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopError {
    pub message: String,
}

impl std::fmt::Display for StopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StopError {}

/// Stops the configured instances and announces the action on the
/// notification topic. Strictly linear: stop, build the message, publish.
pub fn handle_stop_event(
    config: &StopConfig,
    control: &impl InstanceControl,
    notifier: &impl Notifier,
) -> Result<StopResponse, StopError> {
    control
        .stop_instances(&config.instance_ids)
        .map_err(|error| StopError {
            message: format!("failed to stop instances: {error}"),
        })?;

    let message = format!("stopped your instance(s): {:?}", config.instance_ids);
    log_stop_info(
        "instances_stopped",
        json!({
            "instance_ids": config.instance_ids.clone(),
            "message": message.clone(),
        }),
    );

    let publish_message_id =
        notifier
            .publish(&config.topic_arn, &message)
            .map_err(|error| StopError {
                message: format!("failed to publish stop notification: {error}"),
            })?;

    log_stop_info(
        "notification_published",
        json!({
            "topic_arn": config.topic_arn.clone(),
            "publish_message_id": publish_message_id.clone(),
        }),
    );

    Ok(StopResponse {
        status: "ok".to_string(),
        instances_stopped: config.instance_ids.clone(),
        publish_message_id,
    })
}

fn log_stop_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "instance_stop_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
