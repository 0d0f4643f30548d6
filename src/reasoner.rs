//! Reasoning orchestrator.
//!
//! A [`Reasoner`] drives one [`Fetcher`] request per invocation, feeds every
//! streamed fragment to a fresh [`StreamDecoder`], and publishes the merged
//! result together with the `is_loading` / `is_streaming` lifecycle flags:
//!
//! ```text
//! Idle (false, false)
//!   -> Loading (true, false)       invocation starts, snapshot reset to {}
//!   -> Streaming (false, true)     first value pulled from the fetcher
//!   -> Idle (false, false)         after on_finish or on_error
//! ```
//!
//! Every invocation reports exactly one outcome: `on_finish` when the
//! sequence is exhausted, `on_error` when anything fails along the way.
//!
//! State is published through a `tokio::sync::watch` channel. When
//! invocations overlap, only the most recent one may write to it; older
//! invocations run to completion and still fire their own callback, but
//! their snapshots and flag changes are dropped.

use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, trace};

use crate::client::{Fetcher, ReasonError};
use crate::decoder::{factory, DecoderFactory, StreamDecoder};
use crate::fetch::HttpFetcher;
use crate::model::{ReasonOverrides, ReasonState, RequestSpec, ResponseEnvelope};
use crate::options::TransportOptions;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Orchestrates reasoning requests against one fixed endpoint.
///
/// # Example
/// ```no_run
/// use reason_stream::{BoxError, Reasoner};
/// use serde_json::{json, Value};
///
/// # async fn run() -> Result<(), reason_stream::ReasonError> {
/// let reasoner = Reasoner::new("http://localhost:8080/reason", || {
///     let mut text = String::new();
///     move |chunk: &str| -> Result<Value, BoxError> {
///         text.push_str(chunk);
///         Ok(json!({ "text": text.clone() }))
///     }
/// })?;
///
/// reasoner.on_finish(|| println!("done"));
/// reasoner.on_error(|| eprintln!("failed"));
///
/// reasoner.reason().await;
/// println!("{}", reasoner.data());
/// # Ok(())
/// # }
/// ```
pub struct Reasoner<F = HttpFetcher> {
    url: String,
    fetcher: F,
    new_decoder: DecoderFactory,
    state: watch::Sender<ReasonState>,
    on_finish: Mutex<Option<Callback>>,
    on_error: Mutex<Option<Callback>>,
}

impl Reasoner<HttpFetcher> {
    /// Create a reasoner for `url` with default transport options.
    ///
    /// `new_decoder` is called once per invocation.
    pub fn new<D, M>(url: impl Into<String>, new_decoder: M) -> Result<Self, ReasonError>
    where
        D: StreamDecoder + 'static,
        M: Fn() -> D + Send + Sync + 'static,
    {
        Self::with_transport(url, TransportOptions::default(), new_decoder)
    }

    /// Create a reasoner for `url` with explicit transport options.
    pub fn with_transport<D, M>(
        url: impl Into<String>,
        options: TransportOptions,
        new_decoder: M,
    ) -> Result<Self, ReasonError>
    where
        D: StreamDecoder + 'static,
        M: Fn() -> D + Send + Sync + 'static,
    {
        let fetcher = HttpFetcher::new(options)?;
        Ok(Reasoner::with_fetcher(url, fetcher, new_decoder))
    }
}

impl<F: Fetcher> Reasoner<F> {
    /// Create a reasoner that issues its requests through `fetcher`.
    pub fn with_fetcher<D, M>(url: impl Into<String>, fetcher: F, new_decoder: M) -> Self
    where
        D: StreamDecoder + 'static,
        M: Fn() -> D + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ReasonState::default());
        Self {
            url: url.into(),
            fetcher,
            new_decoder: factory(new_decoder),
            state,
            on_finish: Mutex::new(None),
            on_error: Mutex::new(None),
        }
    }

    /// Endpoint every invocation is sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register the callback fired when an invocation completes. Replaces any
    /// previous registration.
    pub fn on_finish(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.on_finish.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(f));
    }

    /// Register the callback fired when an invocation fails. Replaces any
    /// previous registration.
    pub fn on_error(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.on_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(f));
    }

    /// Current snapshot.
    pub fn data(&self) -> Value {
        self.state.borrow().data.clone()
    }

    /// Whether the request is sent but nothing has been received yet.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Whether values are being pulled from the response.
    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming
    }

    /// Snapshot and flags, read together.
    pub fn state(&self) -> ReasonState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every snapshot publication and flag change.
    pub fn subscribe(&self) -> watch::Receiver<ReasonState> {
        self.state.subscribe()
    }

    /// Run one invocation with the default request.
    pub async fn reason(&self) {
        self.reason_with(ReasonOverrides::default()).await
    }

    /// Run one invocation. Set fields of `overrides` replace the defaults
    /// (empty body, no headers, `POST`).
    ///
    /// Nothing is returned; the outcome is reported through the state and
    /// the registered callbacks. The flags return to Idle when this future
    /// completes, is dropped early, or unwinds from a panicking callback.
    pub async fn reason_with(&self, overrides: ReasonOverrides) {
        let generation = self.begin();
        let _settle = Settle {
            state: &self.state,
            generation,
        };

        match self.run(generation, overrides).await {
            Ok(()) => fire(&self.on_finish),
            Err(err) => {
                error!(error = %err, url = %self.url, "reasoning request failed");
                fire(&self.on_error);
            }
        }
    }

    /// Claim the state for a new invocation: Loading with an empty snapshot.
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.is_loading = true;
            state.is_streaming = false;
            state.data = Value::Object(Default::default());
            generation = state.generation;
        });
        generation
    }

    async fn run(&self, generation: u64, overrides: ReasonOverrides) -> Result<(), ReasonError> {
        let mut decoder = (self.new_decoder)();
        let spec = RequestSpec::from_overrides(self.url.clone(), overrides);

        let mut envelopes = self.fetcher.open(spec).await?;
        let mut next = envelopes.next().await.transpose()?;

        self.publish(generation, |state| {
            state.is_loading = false;
            state.is_streaming = true;
        });

        let mut terminal = None;
        while let Some(envelope) = next {
            match envelope {
                ResponseEnvelope::Fragment { text } => {
                    trace!(len = text.len(), "decoding fragment");
                    let merged = decoder.decode(&text).map_err(ReasonError::Decode)?;
                    self.publish(generation, |state| state.data = merged);
                }
                ResponseEnvelope::NotStream { payload } => terminal = Some(payload),
            }
            next = envelopes.next().await.transpose()?;
        }

        if let Some(payload) = terminal {
            let data = payload.into_value();
            self.publish(generation, |state| state.data = data);
        }

        Ok(())
    }

    fn publish(&self, generation: u64, update: impl FnOnce(&mut ReasonState)) {
        publish(&self.state, generation, update);
    }
}

/// Resets the flags of one invocation to Idle when dropped.
struct Settle<'a> {
    state: &'a watch::Sender<ReasonState>,
    generation: u64,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        publish(self.state, self.generation, |state| {
            state.is_loading = false;
            state.is_streaming = false;
        });
    }
}

/// Apply `update` if `generation` still owns the state.
fn publish(
    state: &watch::Sender<ReasonState>,
    generation: u64,
    update: impl FnOnce(&mut ReasonState),
) {
    let applied = state.send_if_modified(|state| {
        if state.generation != generation {
            return false;
        }
        update(state);
        true
    });

    if !applied {
        debug!(generation, "dropping update from superseded invocation");
    }
}

fn fire(slot: &Mutex<Option<Callback>>) {
    let callback = slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    if let Some(callback) = callback {
        callback();
    }
}
