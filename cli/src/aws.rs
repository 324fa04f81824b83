mod amplify;
mod s3;

pub use self::amplify::AmplifyDeployer;
pub use self::s3::S3Staging;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Shared SDK configuration for every client, resolved from the default
/// credential chain.
pub async fn load_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}
