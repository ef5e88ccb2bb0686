pub trait Notifier {
    /// Publishes a plain-text message, returning the publish message ID.
    fn publish(&self, topic_arn: &str, message: &str) -> Result<String, String>;
}
