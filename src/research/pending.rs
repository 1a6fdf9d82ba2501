// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Handle for a research call running in the background

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ResearchError, Result};

/// A spawned research call
///
/// Poll with [`is_finished`](Self::is_finished), abort with
/// [`cancel`](Self::cancel) or collect the outcome with
/// [`wait`](Self::wait). Dropping the handle does not stop the call.
pub struct PendingResearch<T> {
    handle: JoinHandle<Result<T>>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> PendingResearch<T> {
    /// Spawn `fut`; it must observe `cancel`
    pub fn spawn<F>(cancel: CancellationToken, fut: F) -> Self
    where
        F: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
            cancel,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request cancellation; the call finishes with `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for the outcome
    pub async fn wait(self) -> Result<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ResearchError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}
