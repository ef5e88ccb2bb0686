use aws_config::Region;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use ops_functions_lambda::adapters::instance_control::InstanceControl;
use ops_functions_lambda::adapters::notification::Notifier;
use ops_functions_lambda::handlers::instance_stop::{handle_stop_event, StopResponse};
use ops_functions_lambda::runtime::contract::{normalize_stop_config, StopConfig};

struct Ec2InstanceControl {
    ec2_client: aws_sdk_ec2::Client,
}

impl InstanceControl for Ec2InstanceControl {
    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), String> {
        let ids = instance_ids.to_vec();
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .stop_instances()
                    .set_instance_ids(Some(ids))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("ec2 stop-instances call failed: {error}"))
            })
        })
    }
}

struct SnsNotifier {
    sns_client: aws_sdk_sns::Client,
}

impl Notifier for SnsNotifier {
    fn publish(&self, topic_arn: &str, message: &str) -> Result<String, String> {
        let topic_arn = topic_arn.to_string();
        let message = message.to_string();
        let client = self.sns_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .publish()
                    .topic_arn(topic_arn)
                    .message(message)
                    .send()
                    .await
                    .map(|output| output.message_id().unwrap_or_default().to_string())
                    .map_err(|error| format!("sns publish call failed: {error}"))
            })
        })
    }
}

fn stop_config_from_env() -> Result<StopConfig, Error> {
    let instance_ids = std::env::var("StopInstanceIds")
        .map_err(|_| Error::from("StopInstanceIds must be configured"))?
        .split(',')
        .map(str::to_string)
        .collect();

    let config = StopConfig {
        region: std::env::var("Region").map_err(|_| Error::from("Region must be configured"))?,
        instance_ids,
        topic_arn: std::env::var("StopTopicArn")
            .map_err(|_| Error::from("StopTopicArn must be configured"))?,
    };

    normalize_stop_config(config).map_err(|error| Error::from(error.message().to_string()))
}

// The schedule event carries nothing this handler reads.
async fn handle_request(_event: LambdaEvent<serde_json::Value>) -> Result<StopResponse, Error> {
    let config = stop_config_from_env()?;

    let shared_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let region = Region::new(config.region.clone());
    let ec2_config = aws_sdk_ec2::config::Builder::from(&shared_config)
        .region(region.clone())
        .build();
    let instance_control = Ec2InstanceControl {
        ec2_client: aws_sdk_ec2::Client::from_conf(ec2_config),
    };
    let sns_config = aws_sdk_sns::config::Builder::from(&shared_config)
        .region(region)
        .build();
    let notifier = SnsNotifier {
        sns_client: aws_sdk_sns::Client::from_conf(sns_config),
    };

    handle_stop_event(&config, &instance_control, &notifier)
        .map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
