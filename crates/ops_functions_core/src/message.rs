//! Raw-mail message model and the relay rewrite.
//!
//! A message is an ordered header list plus opaque body bytes. The body is
//! never inspected: MIME structure and attachments pass through untouched,
//! and serialization emits the body bytes verbatim. Only the header section
//! is re-emitted in canonical `Name: value\r\n` form.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    headers: Vec<HeaderField>,
    body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// Addressing inputs for [`rewrite_for_relay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAddressing<'a> {
    /// Sender identity verified with the outbound mail service.
    pub authorized_sender: &'a str,
    /// The single static forwarding destination.
    pub new_recipient: &'a str,
    /// Console URL of the stored original, recorded as provenance.
    pub source_object_url: &'a str,
}

/// What the mail-sending collaborator consumes: source identity, destination
/// addresses, and the fully serialized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub source: String,
    pub destinations: Vec<String>,
    pub raw_message: Vec<u8>,
}

impl MailMessage {
    /// Parses raw message bytes into headers and body.
    ///
    /// The header section ends at the first blank line (CRLF or bare LF
    /// conventions both accepted); a message without one parses as headers
    /// with an empty body. Continuation lines are unfolded with a single
    /// space. Fails on non-UTF-8 header bytes or a header line without a
    /// colon.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let (header_bytes, body) = split_header_section(raw);

        let header_text = std::str::from_utf8(header_bytes)
            .map_err(|_| ParseError::new("message header section is not valid UTF-8"))?;

        let mut headers: Vec<HeaderField> = Vec::new();
        for line in header_text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some(previous) = headers.last_mut() else {
                    return Err(ParseError::new(
                        "continuation line appears before any header",
                    ));
                };
                previous.value.push(' ');
                previous.value.push_str(line.trim_start());
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::new(format!(
                    "header line is missing a ':' separator: {line}"
                )));
            };

            headers.push(HeaderField {
                name: name.trim_end().to_string(),
                value: value.trim_start().to_string(),
            });
        }

        Ok(Self {
            headers,
            body: body.to_vec(),
        })
    }

    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// First value for the named header, case-insensitive.
    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Serializes headers and body back to raw message bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.body.len() + 256);
        for field in &self.headers {
            raw.extend_from_slice(field.name.as_bytes());
            raw.extend_from_slice(b": ");
            raw.extend_from_slice(field.value.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(&self.body);
        raw
    }

    /// Replaces the first header with this name in place, preserving its
    /// position; appends when absent.
    fn set_first_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|field| field.name.eq_ignore_ascii_case(name))
        {
            Some(field) => field.value = value.to_string(),
            None => self.push_header(name, value),
        }
    }

    fn push_header(&mut self, name: &str, value: &str) {
        self.headers.push(HeaderField {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
}

/// Produces the relayed form of a message as a new value.
///
/// Captures the original `From`/`To` into provenance headers, overwrites the
/// addressing headers with the authorized identity and fixed destination,
/// and prefixes the subject with `FW (<original sender>): `. Deliberately
/// not idempotent: running it on its own output prefixes the subject again.
/// Provenance headers are appended without collision checks, so an inbound
/// message already carrying one ends up with a duplicate.
pub fn rewrite_for_relay(original: &MailMessage, addressing: &RelayAddressing<'_>) -> MailMessage {
    let original_sender = original.first_header("From").unwrap_or("").to_string();
    let original_recipient = original.first_header("To").unwrap_or("").to_string();
    let original_subject = original.first_header("Subject").unwrap_or("").to_string();

    let mut rewritten = original.clone();
    rewritten.set_first_header("From", addressing.authorized_sender);
    rewritten.set_first_header("To", addressing.new_recipient);
    // Any other return path is rejected by the outbound mail service.
    rewritten.set_first_header(
        "Return-Path",
        &format!("<{}>", addressing.authorized_sender),
    );
    rewritten.set_first_header(
        "Subject",
        &format!("FW ({original_sender}): {original_subject}"),
    );
    rewritten.push_header("X-AWS-S3-Bucket", addressing.source_object_url);
    rewritten.push_header("X-AWS-SES-From", &original_sender);
    rewritten.push_header("X-AWS-SES-To", &original_recipient);
    rewritten
}

fn split_header_section(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut index = 0;
    while index < raw.len() {
        if raw[index..].starts_with(b"\r\n\r\n") {
            return (&raw[..index], &raw[index + 4..]);
        }
        if raw[index..].starts_with(b"\n\n") {
            return (&raw[..index], &raw[index + 2..]);
        }
        index += 1;
    }
    (raw, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"From: alice@x.com\r\nTo: old@y.com\r\nSubject: Hello\r\n\r\nBody line.\r\n";

    fn addressing() -> RelayAddressing<'static> {
        RelayAddressing {
            authorized_sender: "relay@z.com",
            new_recipient: "new@w.com",
            source_object_url: "http://s3.console.aws.amazon.com/s3/object/bucket/m1?region=eu-west-1",
        }
    }

    #[test]
    fn parses_headers_and_body() {
        let message = MailMessage::parse(SAMPLE).expect("message should parse");

        assert_eq!(message.first_header("From"), Some("alice@x.com"));
        assert_eq!(message.first_header("subject"), Some("Hello"));
        assert_eq!(message.body(), b"Body line.\r\n");
    }

    #[test]
    fn parses_lf_only_messages() {
        let message = MailMessage::parse(b"From: a@x.com\nSubject: Hi\n\npayload")
            .expect("message should parse");

        assert_eq!(message.first_header("Subject"), Some("Hi"));
        assert_eq!(message.body(), b"payload");
    }

    #[test]
    fn unfolds_continuation_lines() {
        let message = MailMessage::parse(
            b"Subject: a very\r\n long subject\r\nFrom: a@x.com\r\n\r\n",
        )
        .expect("message should parse");

        assert_eq!(message.first_header("Subject"), Some("a very long subject"));
    }

    #[test]
    fn message_without_separator_has_empty_body() {
        let message =
            MailMessage::parse(b"From: a@x.com\r\nSubject: Hi\r\n").expect("message should parse");

        assert_eq!(message.first_header("From"), Some("a@x.com"));
        assert!(message.body().is_empty());
    }

    #[test]
    fn rejects_header_line_without_colon() {
        let error = MailMessage::parse(b"From a@x.com\r\n\r\n").expect_err("parse should fail");
        assert!(error.message().contains("missing a ':' separator"));
    }

    #[test]
    fn rejects_non_utf8_header_section() {
        let error = MailMessage::parse(b"From: \xff\xfe\r\n\r\n").expect_err("parse should fail");
        assert!(error.message().contains("not valid UTF-8"));
    }

    #[test]
    fn rejects_leading_continuation_line() {
        let error = MailMessage::parse(b" folded\r\n\r\n").expect_err("parse should fail");
        assert!(error.message().contains("before any header"));
    }

    #[test]
    fn rewrite_overwrites_addressing_and_prefixes_subject() {
        let original = MailMessage::parse(SAMPLE).expect("message should parse");
        let rewritten = rewrite_for_relay(&original, &addressing());

        assert_eq!(rewritten.first_header("From"), Some("relay@z.com"));
        assert_eq!(rewritten.first_header("To"), Some("new@w.com"));
        assert_eq!(rewritten.first_header("Return-Path"), Some("<relay@z.com>"));
        assert_eq!(
            rewritten.first_header("Subject"),
            Some("FW (alice@x.com): Hello")
        );
        assert_eq!(rewritten.first_header("X-AWS-SES-From"), Some("alice@x.com"));
        assert_eq!(rewritten.first_header("X-AWS-SES-To"), Some("old@y.com"));
        assert_eq!(
            rewritten.first_header("X-AWS-S3-Bucket"),
            Some("http://s3.console.aws.amazon.com/s3/object/bucket/m1?region=eu-west-1")
        );
    }

    #[test]
    fn rewrite_preserves_overwritten_header_positions() {
        let original = MailMessage::parse(SAMPLE).expect("message should parse");
        let rewritten = rewrite_for_relay(&original, &addressing());

        assert_eq!(rewritten.headers()[0].name, "From");
        assert_eq!(rewritten.headers()[1].name, "To");
        assert_eq!(rewritten.headers()[2].name, "Subject");
    }

    #[test]
    fn rewrite_appends_return_path_when_absent() {
        let original = MailMessage::parse(SAMPLE).expect("message should parse");
        assert_eq!(original.first_header("Return-Path"), None);

        let rewritten = rewrite_for_relay(&original, &addressing());
        assert_eq!(rewritten.first_header("Return-Path"), Some("<relay@z.com>"));
    }

    #[test]
    fn rewrite_is_not_idempotent() {
        let original = MailMessage::parse(SAMPLE).expect("message should parse");
        let once = rewrite_for_relay(&original, &addressing());
        let twice = rewrite_for_relay(&once, &addressing());

        assert_eq!(
            twice.first_header("Subject"),
            Some("FW (relay@z.com): FW (alice@x.com): Hello")
        );
    }

    #[test]
    fn rewrite_leaves_body_bytes_identical() {
        let raw = b"From: a@x.com\r\nTo: b@y.com\r\nSubject: S\r\nContent-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: application/octet-stream\r\n\r\n\x00\x01\x02\xff binary attachment \xfe\r\n--b1--\r\n";
        let original = MailMessage::parse(raw).expect("message should parse");
        let rewritten = rewrite_for_relay(&original, &addressing());

        assert_eq!(rewritten.body(), original.body());

        let reparsed =
            MailMessage::parse(&rewritten.to_bytes()).expect("serialized form should parse");
        assert_eq!(reparsed.body(), original.body());
    }

    #[test]
    fn rewrite_duplicates_colliding_provenance_headers() {
        let raw = b"From: a@x.com\r\nX-AWS-SES-From: earlier@hop.com\r\n\r\n";
        let original = MailMessage::parse(raw).expect("message should parse");
        let rewritten = rewrite_for_relay(&original, &addressing());

        let values: Vec<&str> = rewritten
            .headers()
            .iter()
            .filter(|field| field.name == "X-AWS-SES-From")
            .map(|field| field.value.as_str())
            .collect();
        assert_eq!(values, vec!["earlier@hop.com", "a@x.com"]);
    }

    #[test]
    fn serialization_round_trips_rewritten_headers() {
        let original = MailMessage::parse(SAMPLE).expect("message should parse");
        let rewritten = rewrite_for_relay(&original, &addressing());

        let reparsed =
            MailMessage::parse(&rewritten.to_bytes()).expect("serialized form should parse");
        assert_eq!(reparsed, rewritten);
    }
}
