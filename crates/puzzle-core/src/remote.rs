//! Async driver for remote fetches.
//!
//! The reconciler stays sans-I/O; this module runs the blocking
//! `RemoteStore::fetch` off the control thread and hands back a
//! token-stamped completion for the caller to feed into
//! `CloudReconciler::complete_fetch`. Completion is only ever applied
//! inside that transition, never mid-flight.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cloud::RequestToken;
use crate::store::{RemoteSave, RemoteStore};

/// Delivered once per fetch, unless the fetch was cancelled first.
#[derive(Debug)]
pub struct FetchCompletion {
    pub token: RequestToken,
    pub result: Result<Option<RemoteSave>>,
}

/// Spawn a fetch against `remote`. The completion arrives on the returned
/// receiver; cancelling `cancel` drops the send half instead. A
/// completion that races past cancellation is still harmless: the
/// reconciler's token guard rejects it once the caller has abandoned the
/// request.
pub fn spawn_fetch<R>(
    remote: Arc<R>,
    token: RequestToken,
    cancel: CancellationToken,
) -> (JoinHandle<()>, oneshot::Receiver<FetchCompletion>)
where
    R: RemoteStore + 'static,
{
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let work = tokio::task::spawn_blocking(move || remote.fetch());
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            joined = work => match joined {
                Ok(result) => result,
                Err(err) => Err(anyhow!("fetch task failed: {err}")),
            },
        };
        let _ = tx.send(FetchCompletion { token, result });
    });
    (handle, rx)
}
