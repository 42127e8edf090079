//! Example 1: Retry, time limit and logging
//!
//! This example demonstrates a full pipeline against a local server that
//! answers 503 three times before succeeding:
//! - The retry policy resends on 503 with capped exponential backoff
//! - The time-limit policy bounds the total time of all attempts
//! - The logging policy logs one entry/exit pair per attempt
//!
//! Run with: cargo run --bin retry-demo

use std::time::Duration;

use request_policy::{
    Context, LoggingFactory, Pipeline, Request, RetryFactory, RetryOptions, TimeLimitFactory,
    TimeLimitOptions, response,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = request_policy_examples::spawn_demo_server(3).await?;

    let pipeline = Pipeline::builder()
        .with_policy(RetryFactory::try_new(
            RetryOptions::new()
                .max_attempts(5)
                .base_delay(Duration::from_millis(200))
                .max_delay(Duration::from_secs(2)),
        )?)
        .with_policy(TimeLimitFactory::try_new(
            TimeLimitOptions::new(Duration::from_secs(10)).try_timeout(Duration::from_secs(2)),
        )?)
        .with_policy(LoggingFactory::default())
        .build()?;

    println!("=== Example 1: Retry, time limit and logging ===");
    println!("Server listening on http://{addr}");
    println!();

    let ctx = Context::none().with_timeout(Duration::from_secs(30));
    let request = Request::get(format!("http://{addr}/flaky").parse()?);
    let response = pipeline.send_request(&ctx, request).await?;

    let status = response.status();
    let body = response::collect(response).await?;
    println!("Final status: {status}");
    println!("Body: {}", String::from_utf8_lossy(&body));

    Ok(())
}
