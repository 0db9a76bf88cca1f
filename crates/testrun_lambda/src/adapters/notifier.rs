pub trait Notifier {
    fn create_topic(&self, name: &str) -> Result<String, String>;

    fn subscribe_email(&self, topic_arn: &str, email: &str) -> Result<(), String>;

    fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<(), String>;
}
