/// A failure reported by a [`CounterStore`] implementation.
///
/// The allocator treats every `StoreError` as non-retryable and propagates it
/// unchanged: an unreachable store or an aborted transaction is not a race to
/// be won with backoff. Drivers wrap their native error in one of these,
/// keeping the original as the source for operator diagnostics.
///
/// [`CounterStore`]: crate::CounterStore
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn core::error::Error + Send + Sync>>,
}

impl StoreError {
    /// A store error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A store error wrapping the driver's native failure.
    pub fn with_source(
        message: impl Into<String>,
        source: impl core::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
