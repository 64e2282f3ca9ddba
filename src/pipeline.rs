//! The shared task pipeline: validate, authenticate, enumerate, operate on
//! each item, aggregate.
//!
//! Each task supplies a [`FileOperation`]; [`run`] drives it. Items are
//! processed one at a time in enumeration order. What happens when an item
//! fails is decided by the operation's [`FailurePolicy`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credential::resolve_credentials;
use crate::error::{DriveError, Result};
use crate::session::{DriveEndpoints, DriveSession};

/// What to do when a single item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the invocation; remaining items are never attempted.
    FailFast,
    /// Record the error message and continue with the next item.
    Accumulate,
}

impl FailurePolicy {
    /// Map a "throw error on failure" option onto a policy.
    pub fn from_throw_on_failure(throw: bool) -> Self {
        if throw {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Accumulate
        }
    }
}

/// One kind of per-item Drive operation.
#[async_trait]
pub trait FileOperation: Sync {
    /// Something to operate on: a remote file or a local path.
    type Item: Send + Sync;
    /// Record produced for each item that succeeded.
    type Output: Send;

    /// Verb used in failure messages, e.g. `uploading`.
    const ACTION: &'static str;

    /// Check task-specific input. Runs before credentials are resolved.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn policy(&self) -> FailurePolicy {
        FailurePolicy::FailFast
    }

    /// Items found without contacting Drive. When this returns `Some`, it runs
    /// before credentials are resolved and [`enumerate`](Self::enumerate) is
    /// skipped.
    fn enumerate_local(&self) -> Option<Result<Vec<Self::Item>>> {
        None
    }

    /// Ask Drive for the items to operate on.
    async fn enumerate(&self, _session: &DriveSession) -> Result<Vec<Self::Item>> {
        Ok(Vec::new())
    }

    /// Name reported for an item in logs and failure messages.
    fn item_name(item: &Self::Item) -> String;

    /// Perform the operation on a single item. Exactly one attempt is made.
    async fn apply(&self, session: &DriveSession, item: &Self::Item) -> Result<Self::Output>;
}

/// Aggregated per-item results of one invocation.
#[derive(Debug)]
pub struct Outcome<T> {
    /// Successful items, in processing order.
    pub succeeded: Vec<T>,
    /// Messages of failed items, recorded only under [`FailurePolicy::Accumulate`].
    pub errors: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run `op` with the given service account key.
///
/// Task input is checked first, then local enumeration, then the key.
/// The session is dropped on every return path, including errors.
pub async fn run<O: FileOperation>(
    op: &O,
    service_account_key: &str,
    endpoints: &DriveEndpoints,
    cancel: &CancellationToken,
) -> Result<Outcome<O::Output>> {
    op.validate()?;
    let local_items = op.enumerate_local().transpose()?;

    let credentials = resolve_credentials(service_account_key).await?;
    let session = DriveSession::open(credentials, endpoints.clone(), cancel.clone())?;

    let items = match local_items {
        Some(items) => items,
        None => op.enumerate(&session).await?,
    };
    info!(action = O::ACTION, count = items.len(), "Processing items");

    let mut outcome = Outcome {
        succeeded: Vec::with_capacity(items.len()),
        errors: Vec::new(),
    };

    for item in &items {
        if session.is_cancelled() {
            warn!(
                action = O::ACTION,
                completed = outcome.succeeded.len(),
                "Cancelled before all items were processed"
            );
            return Err(DriveError::Cancelled);
        }

        let name = O::item_name(item);
        match op.apply(&session, item).await {
            Ok(output) => {
                debug!(action = O::ACTION, item = %name, "Item succeeded");
                outcome.succeeded.push(output);
            }
            Err(DriveError::Cancelled) => return Err(DriveError::Cancelled),
            Err(source) => {
                let err = DriveError::ItemFailed {
                    action: O::ACTION,
                    name,
                    source: Box::new(source),
                };
                match op.policy() {
                    FailurePolicy::FailFast => return Err(err),
                    FailurePolicy::Accumulate => {
                        warn!(error = %err, "Item failed, continuing");
                        outcome.errors.push(err.to_string());
                    }
                }
            }
        }
    }

    info!(
        action = O::ACTION,
        succeeded = outcome.succeeded.len(),
        failed = outcome.errors.len(),
        "Finished"
    );

    Ok(outcome)
}
