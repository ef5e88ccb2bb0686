use aws_config::Region;
use aws_lambda_events::event::ses::SimpleEmailEvent;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_ses::primitives::Blob;
use aws_sdk_ses::types::RawMessage;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use ops_functions_lambda::adapters::mail_sender::MailSender;
use ops_functions_lambda::adapters::mail_store::{FetchError, FetchErrorKind, MailStore};
use ops_functions_lambda::handlers::mail_relay::{handle_mail_event, RelayResponse};
use ops_functions_lambda::runtime::contract::{normalize_relay_config, RelayConfig};
use ops_functions_lambda::runtime::message::OutboundEnvelope;

struct S3MailStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl MailStore for S3MailStore {
    fn fetch_object(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(&object_key)
                    .send()
                    .await
                    .map_err(|error| {
                        FetchError::new(
                            classify_get_object_error(error.as_service_error()),
                            format!("failed to read object '{object_key}' from s3: {error}"),
                        )
                    })?;

                output
                    .body
                    .collect()
                    .await
                    .map(|data| data.to_vec())
                    .map_err(|error| {
                        FetchError::new(
                            FetchErrorKind::Other,
                            format!("failed to stream object '{object_key}' body: {error}"),
                        )
                    })
            })
        })
    }
}

/// Maps the storage service error onto the fetch error kinds the handler
/// distinguishes. Access failures carry no modeled variant, so they are
/// identified by the error code in the response metadata.
fn classify_get_object_error(service_error: Option<&GetObjectError>) -> FetchErrorKind {
    match service_error {
        Some(error) if error.is_no_such_key() => FetchErrorKind::NotFound,
        Some(error) if error.meta().code() == Some("AccessDenied") => FetchErrorKind::AccessDenied,
        _ => FetchErrorKind::Other,
    }
}

struct SesMailSender {
    ses_client: aws_sdk_ses::Client,
}

impl MailSender for SesMailSender {
    fn send_raw(&self, envelope: &OutboundEnvelope) -> Result<String, String> {
        let source = envelope.source.clone();
        let destinations = envelope.destinations.clone();
        let raw_bytes = envelope.raw_message.clone();
        let client = self.ses_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let raw_message = RawMessage::builder()
                    .data(Blob::new(raw_bytes))
                    .build()
                    .map_err(|error| format!("failed to build raw message: {error}"))?;

                client
                    .send_raw_email()
                    .source(source)
                    .set_destinations(Some(destinations))
                    .raw_message(raw_message)
                    .send()
                    .await
                    .map(|output| output.message_id().to_string())
                    .map_err(|error| {
                        error
                            .as_service_error()
                            .and_then(|service_error| {
                                service_error.meta().message().map(str::to_string)
                            })
                            .unwrap_or_else(|| format!("failed to send raw email: {error}"))
                    })
            })
        })
    }
}

fn relay_config_from_env() -> Result<RelayConfig, Error> {
    let config = RelayConfig {
        region: std::env::var("Region").map_err(|_| Error::from("Region must be configured"))?,
        bucket: std::env::var("MailS3Bucket")
            .map_err(|_| Error::from("MailS3Bucket must be configured"))?,
        prefix: std::env::var("MailS3Prefix").ok(),
        mail_from: std::env::var("MailFrom")
            .map_err(|_| Error::from("MailFrom must be configured"))?,
        mail_recipient: std::env::var("MailRecipient")
            .map_err(|_| Error::from("MailRecipient must be configured"))?,
    };

    normalize_relay_config(config).map_err(|error| Error::from(error.message().to_string()))
}

async fn handle_request(event: LambdaEvent<SimpleEmailEvent>) -> Result<RelayResponse, Error> {
    let record = event
        .payload
        .records
        .into_iter()
        .next()
        .ok_or_else(|| Error::from("event contains no mail records"))?;
    let message_id = record
        .ses
        .mail
        .message_id
        .ok_or_else(|| Error::from("event record is missing a message id"))?;

    let config = relay_config_from_env()?;

    let shared_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let mail_store = S3MailStore {
        bucket: config.bucket.clone(),
        s3_client: aws_sdk_s3::Client::new(&shared_config),
    };
    let ses_config = aws_sdk_ses::config::Builder::from(&shared_config)
        .region(Region::new(config.region.clone()))
        .build();
    let mail_sender = SesMailSender {
        ses_client: aws_sdk_ses::Client::from_conf(ses_config),
    };

    handle_mail_event(&message_id, &config, &mail_store, &mail_sender)
        .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}

#[cfg(test)]
mod tests {
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::NoSuchKey;

    use super::*;

    #[test]
    fn classifies_missing_key_as_not_found() {
        let error = GetObjectError::NoSuchKey(NoSuchKey::builder().build());
        assert_eq!(
            classify_get_object_error(Some(&error)),
            FetchErrorKind::NotFound
        );
    }

    #[test]
    fn classifies_access_denied_by_error_code() {
        let error = GetObjectError::generic(
            ErrorMetadata::builder()
                .code("AccessDenied")
                .message("Access Denied")
                .build(),
        );
        assert_eq!(
            classify_get_object_error(Some(&error)),
            FetchErrorKind::AccessDenied
        );
    }

    #[test]
    fn classifies_other_service_errors_as_other() {
        let error = GetObjectError::generic(ErrorMetadata::builder().code("SlowDown").build());
        assert_eq!(classify_get_object_error(Some(&error)), FetchErrorKind::Other);
    }

    #[test]
    fn classifies_non_service_failures_as_other() {
        assert_eq!(classify_get_object_error(None), FetchErrorKind::Other);
    }
}
