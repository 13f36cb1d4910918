//! Message created worker.

use std::sync::Arc;

use apalis::prelude::*;
use clubhouse_core::{MessageCreated, MessageFanoutService};
use tracing::{error, info, warn};

use crate::jobs::MessageCreatedJob;

/// Context for the message created worker.
#[derive(Clone)]
pub struct FanoutContext {
    /// The pipeline run for each job.
    pub fanout: MessageFanoutService,
}

impl FanoutContext {
    /// Create a new fan-out context.
    #[must_use]
    pub const fn new(fanout: MessageFanoutService) -> Self {
        Self { fanout }
    }
}

/// Worker function run once per delivered "message created" job.
///
/// A malformed payload or a non-retryable failure aborts the job. Any other
/// failure is returned as `Failed` so the retry policy redelivers it.
///
/// # Errors
/// Returns an error if the fan-out fails.
pub async fn message_created_worker(
    job: MessageCreatedJob,
    ctx: Data<FanoutContext>,
) -> Result<(), Error> {
    let event = match MessageCreated::try_from(job) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "Rejecting malformed message created job");
            return Err(Error::Abort(Arc::new(Box::new(e))));
        }
    };

    match ctx.fanout.process(&event).await {
        Ok(report) => {
            info!(
                message_id = %event.message_id,
                outcome = ?report.outcome,
                "Message created job processed"
            );
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            warn!(
                message_id = %e.message_id,
                stage = %e.stage,
                error_code = e.source.error_code(),
                error = %e.source,
                "Fan-out failed, job will be redelivered"
            );
            Err(Error::Failed(Arc::new(Box::new(e))))
        }
        Err(e) => {
            error!(
                message_id = %e.message_id,
                stage = %e.stage,
                error_code = e.source.error_code(),
                error = %e.source,
                "Fan-out failed permanently"
            );
            Err(Error::Abort(Arc::new(Box::new(e))))
        }
    }
}
