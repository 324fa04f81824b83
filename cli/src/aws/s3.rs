use crate::capabilities::{ArtifactStager, BucketLifecycle, RemoteResult};
use crate::error::RemoteError;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Region in which buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Temporary staging bucket in S3.
pub struct S3Staging {
    client: Client,
    region: String,
}

impl S3Staging {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

/// Policy letting Amplify read the staged bundle.
pub fn amplify_read_policy(bucket: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "AmplifyAccess",
            "Effect": "Allow",
            "Principal": { "Service": "amplify.amazonaws.com" },
            "Action": ["s3:GetObject", "s3:ListBucket"],
            "Resource": [
                format!("arn:aws:s3:::{}", bucket),
                format!("arn:aws:s3:::{}/*", bucket),
            ],
        }],
    })
}

fn remote<E>(operation: &'static str) -> impl FnOnce(E) -> RemoteError
where
    E: std::error::Error,
{
    move |err| RemoteError::new(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl BucketLifecycle for S3Staging {
    async fn create_bucket(&self, bucket: &str) -> RemoteResult<()> {
        info!(%bucket, region = %self.region, "creating temporary S3 bucket");
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request.send().await.map_err(remote("CreateBucket"))?;

        debug!(%bucket, "adding bucket policy");
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(amplify_read_policy(bucket).to_string())
            .send()
            .await
            .map_err(remote("PutBucketPolicy"))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str, key: &str) -> RemoteResult<()> {
        info!(%bucket, "cleaning up temporary bucket");
        // the bucket must be empty before it can go, but try it even if the
        // object is already gone
        let object = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(remote("DeleteObject"));
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(remote("DeleteBucket"))?;
        object.map(|_| ())
    }
}

#[async_trait]
impl ArtifactStager for S3Staging {
    async fn stage(&self, bucket: &str, key: &str, bundle: Bytes) -> RemoteResult<String> {
        let size = bundle.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bundle))
            .send()
            .await
            .map_err(remote("PutObject"))?;
        info!(%bucket, %key, size, "bundle uploaded");
        Ok(format!("s3://{}/{}", bucket, key))
    }
}
