//! Fragment decoder seam.
//!
//! Turning raw text fragments into a merged partial object is the job of an
//! external decoder with its own framing rules. The orchestrator only needs
//! `decode(chunk) -> object` and builds a fresh decoder for every invocation.

use serde_json::Value;
use std::sync::Arc;

use crate::client::BoxError;

/// Stateful decoder fed with text fragments in arrival order.
///
/// Each call returns the complete merged object so far, which replaces the
/// published snapshot as a whole.
///
/// Closures of the shape `FnMut(&str) -> Result<Value, BoxError>` implement
/// this trait.
pub trait StreamDecoder: Send {
    fn decode(&mut self, chunk: &str) -> Result<Value, BoxError>;
}

impl<F> StreamDecoder for F
where
    F: FnMut(&str) -> Result<Value, BoxError> + Send,
{
    fn decode(&mut self, chunk: &str) -> Result<Value, BoxError> {
        self(chunk)
    }
}

/// Builds one decoder per invocation.
pub(crate) type DecoderFactory = Arc<dyn Fn() -> Box<dyn StreamDecoder> + Send + Sync>;

pub(crate) fn factory<D, F>(make: F) -> DecoderFactory
where
    D: StreamDecoder + 'static,
    F: Fn() -> D + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn StreamDecoder>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_decoder_keeps_state() {
        let mut seen = String::new();
        let mut decoder = move |chunk: &str| -> Result<Value, BoxError> {
            seen.push_str(chunk);
            Ok(json!({ "text": seen.clone() }))
        };

        decoder.decode("ab").unwrap();
        let merged = decoder.decode("cd").unwrap();
        assert_eq!(merged, json!({"text": "abcd"}));
    }

    #[test]
    fn test_factory_builds_independent_decoders() {
        let make = factory(|| {
            let mut count = 0u32;
            move |_: &str| -> Result<Value, BoxError> {
                count += 1;
                Ok(json!(count))
            }
        });

        let mut first = make();
        first.decode("x").unwrap();
        first.decode("x").unwrap();

        let mut second = make();
        assert_eq!(second.decode("x").unwrap(), json!(1));
    }
}
