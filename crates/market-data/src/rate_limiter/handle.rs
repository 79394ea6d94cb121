use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::errors::MarketDataError;

/// The limiter itself failed to deliver a result.
///
/// Never produced for an operation that merely returned an error; that error
/// is part of the operation's own output.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum RateLimiterError {
    #[error("Rate limiter stopped before the operation completed")]
    Closed,
}

impl From<RateLimiterError> for MarketDataError {
    fn from(_: RateLimiterError) -> Self {
        MarketDataError::QueueUnavailable
    }
}

/// Completion handle for a submitted operation.
///
/// Await it to get the operation's output. Dropping it does not cancel the
/// operation; it still runs in its turn and its output is discarded.
#[must_use = "the operation runs regardless, but its output is only observable through the handle"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub(super) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, RateLimiterError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map_err(|_| RateLimiterError::Closed)
    }
}
