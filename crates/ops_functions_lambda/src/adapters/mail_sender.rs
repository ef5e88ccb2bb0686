use crate::runtime::message::OutboundEnvelope;

pub trait MailSender {
    /// Submits a raw message. Returns the collaborator's message ID on
    /// success, its human-readable error message on failure.
    fn send_raw(&self, envelope: &OutboundEnvelope) -> Result<String, String>;
}
