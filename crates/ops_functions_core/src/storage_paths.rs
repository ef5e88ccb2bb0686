/// Builds the S3 object key for an inbound message.
///
/// The mail-receiving rule writes each message under the configured prefix
/// using its message ID as the file name; with no prefix the ID is the key.
pub fn message_object_key(prefix: Option<&str>, message_id: &str) -> String {
    match prefix
        .map(|value| value.trim_matches('/'))
        .filter(|value| !value.is_empty())
    {
        Some(trimmed) => format!("{trimmed}/{message_id}"),
        None => message_id.to_string(),
    }
}

/// Console URL of a stored message, recorded in the relayed message as
/// provenance for operators chasing an original.
pub fn console_object_url(bucket: &str, object_key: &str, region: &str) -> String {
    format!("http://s3.console.aws.amazon.com/s3/object/{bucket}/{object_key}?region={region}")
}
