//! Adapter-side log subscription handle

use tokio::sync::mpsc;

use crate::domain::error::ChainError;

type Release = Box<dyn FnOnce() + Send + 'static>;

/// A live log filter installed by a [`ChainClient`](super::ChainClient)
///
/// Logs flow through the sink passed to `subscribe_logs`; this handle carries
/// the error channel and the release hook. Release runs at most once, either
/// on [`unsubscribe`](Self::unsubscribe) or on drop.
pub struct AdapterSubscription {
    errors: mpsc::UnboundedReceiver<ChainError>,
    release: Option<Release>,
}

impl AdapterSubscription {
    pub fn new(
        errors: mpsc::UnboundedReceiver<ChainError>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            errors,
            release: Some(Box::new(release)),
        }
    }

    /// Uninstall the filter; later calls do nothing
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Wait for the next transport error
    ///
    /// A closed error channel means the adapter side is gone and is reported
    /// as a subscription error as well.
    pub async fn next_error(&mut self) -> ChainError {
        match self.errors.recv().await {
            Some(err) => err,
            None => ChainError::Subscription("adapter error channel closed".to_string()),
        }
    }

    /// An error that is already queued, without waiting
    pub fn try_error(&mut self) -> Option<ChainError> {
        self.errors.try_recv().ok()
    }
}

impl Drop for AdapterSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for AdapterSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSubscription")
            .field("released", &self.is_released())
            .finish()
    }
}
