use crate::error::QueryFailure;
use crate::events::StatusReport;
use crate::types::JobHandle;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability to ask the remote system where a job currently stands.
///
/// Implementations must not mutate the job. A handle without a job id should be
/// answered with a pending report rather than an error, since activation of a
/// run can lag behind its creation.
#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport, QueryFailure>;
}

#[async_trait]
impl<T: StatusQuery + ?Sized> StatusQuery for Arc<T> {
    async fn query_status(&self, handle: &JobHandle) -> Result<StatusReport, QueryFailure> {
        (**self).query_status(handle).await
    }
}
