use crate::adapters::notifier::Notifier;

pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
}

impl SnsNotifier {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }

    fn block_on<F, T>(&self, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

impl Notifier for SnsNotifier {
    fn create_topic(&self, name: &str) -> Result<String, String> {
        let client = self.client.clone();
        let name = name.to_string();

        self.block_on(async move {
            let output = client
                .create_topic()
                .name(name)
                .send()
                .await
                .map_err(|error| format!("failed to create topic: {error}"))?;

            output
                .topic_arn()
                .map(str::to_string)
                .ok_or_else(|| "topic creation returned no arn".to_string())
        })
    }

    fn subscribe_email(&self, topic_arn: &str, email: &str) -> Result<(), String> {
        let client = self.client.clone();
        let topic_arn = topic_arn.to_string();
        let email = email.to_string();

        self.block_on(async move {
            client
                .subscribe()
                .topic_arn(topic_arn)
                .protocol("email")
                .endpoint(email)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to subscribe email endpoint: {error}"))
        })
    }

    fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<(), String> {
        let client = self.client.clone();
        let topic_arn = topic_arn.to_string();
        let subject = subject.to_string();
        let message = message.to_string();

        self.block_on(async move {
            client
                .publish()
                .topic_arn(topic_arn)
                .subject(subject)
                .message(message)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to publish notification: {error}"))
        })
    }
}
