//! Issue one request with the bare fetcher and print every envelope.
//!
//! Run with:
//! ```bash
//! export REASON_URL="http://localhost:8080/reason"
//! cargo run --example buffered_json
//! ```

use futures::StreamExt;
use reason_stream::model::{Method, ReasonOverrides, RequestSpec, ResponseEnvelope};
use reason_stream::fetch_reason;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("REASON_URL").expect("REASON_URL environment variable must be set");

    let spec = RequestSpec::from_overrides(
        url,
        ReasonOverrides::new().with_method(Method::Get),
    );

    let mut envelopes = fetch_reason(spec).await?;
    while let Some(envelope) = envelopes.next().await {
        match envelope? {
            ResponseEnvelope::Fragment { text } => {
                print!("{}", text);

                use std::io::Write;
                std::io::stdout().flush()?;
            }
            ResponseEnvelope::NotStream { payload } => {
                println!("=== Buffered response ===");
                println!("{}", payload.into_value());
            }
        }
    }

    Ok(())
}
