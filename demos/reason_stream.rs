//! Stream a reasoning response and print every snapshot as it is published.
//!
//! Run with:
//! ```bash
//! export REASON_URL="http://localhost:8080/reason"
//! RUST_LOG=reason_stream=debug cargo run --example reason_stream
//! ```

use reason_stream::model::ReasonOverrides;
use reason_stream::options::TransportOptions;
use reason_stream::{BoxError, Reasoner};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("REASON_URL").expect("REASON_URL environment variable must be set");

    // Accumulate raw fragments; a real decoder would parse its framing here
    let reasoner = Reasoner::with_transport(
        url,
        TransportOptions::new().with_timeout(std::time::Duration::from_secs(120)),
        || {
            let mut text = String::new();
            move |chunk: &str| -> Result<Value, BoxError> {
                text.push_str(chunk);
                Ok(json!({ "text": text.clone() }))
            }
        },
    )?;

    reasoner.on_finish(|| println!("\n=== Finished ==="));
    reasoner.on_error(|| eprintln!("\n=== Failed ==="));

    let mut updates = reasoner.subscribe();

    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            println!(
                "[loading={} streaming={}] {}",
                state.is_loading, state.is_streaming, state.data
            );
        }
    });

    let overrides = ReasonOverrides::new().with_field("prompt", "Explain why the sky is blue.");
    reasoner.reason_with(overrides).await;

    // Dropping the reasoner closes the channel and ends the watcher
    drop(reasoner);
    watcher.await?;

    Ok(())
}
