//! JSON-lines front end for the booking API.
//!
//! Each stdin line is `{"method":"GET","query":{...}}` or
//! `{"method":"POST","body":{...}}`; each response is written as one line of
//! `{"status":...,"body":...}` to stdout. Logs go to stderr, filtered by
//! `BOOKING_LOG`.

use std::io::{BufRead, Write};
use std::sync::Arc;

use booking_lifecycle::api::{ApiResponse, BookingApi, GetQuery};
use booking_lifecycle::config::{EngineConfig, LOG_ENV_VAR};
use booking_lifecycle::service::BookingService;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "UPPERCASE")]
enum Request {
    Get {
        #[serde(default)]
        query: GetQuery,
    },
    Post {
        body: Value,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn handle_line(api: &BookingApi, line: &str) -> ApiResponse {
    match serde_json::from_str::<Request>(line) {
        Ok(Request::Get { query }) => api.handle_get(&query),
        Ok(Request::Post { body }) => api.handle_post(&body.to_string()),
        Err(err) => ApiResponse {
            status: 400,
            body: json!({ "error": "malformed_request", "message": err.to_string() }),
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = EngineConfig::from_env()?;
    tracing::info!(currency = %config.currency, "booking api starting");
    let api = BookingApi::new(Arc::new(BookingService::in_memory(config)));

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&api, &line);
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
