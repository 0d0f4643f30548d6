//! # reason-stream - progressive reasoning responses over HTTP
//!
//! A small client library that issues one HTTP request to an endpoint whose
//! response shape is not known in advance, and turns the answer into a
//! continuously updated result object.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Content-type driven branching: JSON and HTML bodies are buffered, any
//!   other body is consumed as a progressive stream of text fragments
//! - Pluggable fragment decoder, fresh per invocation
//! - Snapshot and lifecycle flags published on a `tokio::sync::watch` channel
//! - Exactly one terminal callback per invocation (`on_finish` or `on_error`)
//!
//! ## Architecture
//!
//! - **`Fetcher`** (`client`): sends the request and yields
//!   [`ResponseEnvelope`]s. [`HttpFetcher`] is the `reqwest` implementation.
//! - **`Reasoner`** (`reasoner`): drives a fetcher, decodes fragments,
//!   publishes snapshots and settles the lifecycle flags.
//!
//! ## Example
//! ```no_run
//! use reason_stream::{BoxError, Reasoner};
//! use reason_stream::model::ReasonOverrides;
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reasoner = Reasoner::new("http://localhost:8080/reason", || {
//!         let mut text = String::new();
//!         move |chunk: &str| -> Result<Value, BoxError> {
//!             text.push_str(chunk);
//!             Ok(json!({ "text": text.clone() }))
//!         }
//!     })?;
//!
//!     reasoner.on_finish(|| println!("finished"));
//!
//!     let overrides = ReasonOverrides::new().with_field("prompt", "Why is the sky blue?");
//!     reasoner.reason_with(overrides).await;
//!
//!     println!("{}", reasoner.data());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod decoder;
pub mod fetch;
pub mod http;
pub mod model;
pub mod options;
pub mod reasoner;
pub mod stream;

// Re-exports for convenience
pub use client::{BoxError, EnvelopeStream, Fetcher, ReasonError};
pub use decoder::StreamDecoder;
pub use fetch::{fetch_reason, HttpFetcher};
pub use model::{Method, Payload, ReasonOverrides, ReasonState, RequestSpec, ResponseEnvelope};
pub use reasoner::Reasoner;
