//! Fetcher trait and error types.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::model::{RequestSpec, ResponseEnvelope};

/// Boxed error used for opaque transport and decoder failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Lazy, finite sequence produced by a [`Fetcher`]. Not restartable.
pub type EnvelopeStream = BoxStream<'static, Result<ResponseEnvelope, ReasonError>>;

/// Errors that can occur while fetching or decoding a reasoning response.
#[derive(Error, Debug)]
pub enum ReasonError {
    #[error("Transport error: {0}")]
    Transport(BoxError),

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("No stream: response with status {status} has no body")]
    NoStream { status: u16 },

    #[error("Decode error: {0}")]
    Decode(BoxError),
}

impl From<reqwest::Error> for ReasonError {
    fn from(err: reqwest::Error) -> Self {
        ReasonError::Transport(Box::new(err))
    }
}

/// Issues a reasoning request and exposes its response as envelopes.
///
/// A buffered response (JSON or HTML) yields exactly one
/// [`ResponseEnvelope::NotStream`] and ends. Any other response yields zero or
/// more [`ResponseEnvelope::Fragment`]s and ends without a terminal item.
///
/// # Example
/// ```rust,ignore
/// struct Canned;
///
/// #[async_trait]
/// impl Fetcher for Canned {
///     async fn open(&self, _spec: RequestSpec) -> Result<EnvelopeStream, ReasonError> {
///         let items = vec![Ok(ResponseEnvelope::Fragment { text: "hi".into() })];
///         Ok(futures::stream::iter(items).boxed())
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request and return the envelope sequence.
    ///
    /// Errors returned here happen before any value is produced. Errors
    /// surfacing later arrive as items of the stream.
    async fn open(&self, spec: RequestSpec) -> Result<EnvelopeStream, ReasonError>;
}
