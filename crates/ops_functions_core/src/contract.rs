use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Resolved configuration for the mail relay handler.
///
/// Sourced from the `Region`, `MailS3Bucket`, `MailS3Prefix`, `MailFrom`,
/// and `MailRecipient` environment keys, validated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    pub region: String,
    pub bucket: String,
    pub prefix: Option<String>,
    pub mail_from: String,
    pub mail_recipient: String,
}

/// Resolved configuration for the instance stop handler.
///
/// Sourced from the `Region`, `StopInstanceIds` (comma-separated), and
/// `StopTopicArn` environment keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopConfig {
    pub region: String,
    pub instance_ids: Vec<String>,
    pub topic_arn: String,
}

pub fn normalize_relay_config(config: RelayConfig) -> Result<RelayConfig, ValidationError> {
    let region = required(&config.region, "Region")?;
    let bucket = required(&config.bucket, "MailS3Bucket")?;
    let mail_from = required(&config.mail_from, "MailFrom")?;
    let mail_recipient = required(&config.mail_recipient, "MailRecipient")?;

    let prefix = config
        .prefix
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(RelayConfig {
        region,
        bucket,
        prefix,
        mail_from,
        mail_recipient,
    })
}

pub fn normalize_stop_config(config: StopConfig) -> Result<StopConfig, ValidationError> {
    let region = required(&config.region, "Region")?;
    let topic_arn = required(&config.topic_arn, "StopTopicArn")?;

    let mut instance_ids = Vec::with_capacity(config.instance_ids.len());
    for raw in &config.instance_ids {
        let id = raw.trim();
        if id.is_empty() {
            return Err(ValidationError::new(
                "StopInstanceIds entries must be non-empty",
            ));
        }
        if !instance_ids.iter().any(|existing| existing == id) {
            instance_ids.push(id.to_string());
        }
    }

    if instance_ids.is_empty() {
        return Err(ValidationError::new(
            "StopInstanceIds must list at least one instance",
        ));
    }

    Ok(StopConfig {
        region,
        instance_ids,
        topic_arn,
    })
}

fn required(value: &str, key: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(format!("{key} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
