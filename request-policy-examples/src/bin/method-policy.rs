//! Example 2: Method policies
//!
//! This example demonstrates the method marker:
//! - The pipeline sets a default `user-agent` on every call
//! - One call supplies its own factory, which runs at the marker position
//! - A pipeline without a marker rejects a method factory
//!
//! Run with: cargo run --bin method-policy

use request_policy::{
    Context, HeaderFactory, LoggingFactory, Pipeline, PipelineError, Request, response,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = request_policy_examples::spawn_demo_server(0).await?;
    let uri: http::Uri = format!("http://{addr}/headers").parse()?;

    let pipeline = Pipeline::builder()
        .with_policy(HeaderFactory::try_new("user-agent", "request-policy-demo/0.1")?)
        .with_method_marker()
        .with_policy(LoggingFactory::default())
        .build()?;

    println!("=== Example 2: Method policies ===");
    println!("Server listening on http://{addr}");
    println!();

    let ctx = Context::none();

    let response = pipeline
        .send_request(&ctx, Request::get(uri.clone()))
        .await?;
    println!("Without a method policy:");
    println!("{}", String::from_utf8_lossy(&response::collect(response).await?));
    println!();

    let method = HeaderFactory::try_new("x-ms-version", "2017-04-17")?;
    let response = pipeline
        .send(&ctx, Request::get(uri.clone()), Some(&method))
        .await?;
    println!("With a method policy:");
    println!("{}", String::from_utf8_lossy(&response::collect(response).await?));
    println!();

    let unmarked = Pipeline::builder()
        .with_policy(LoggingFactory::default())
        .build()?;
    match unmarked.send(&ctx, Request::get(uri), Some(&method)).await {
        Err(err @ PipelineError::Config(_)) => println!("Pipeline without a marker: {err}"),
        Err(err) => anyhow::bail!("expected a configuration error, got {err}"),
        Ok(response) => anyhow::bail!("expected a configuration error, got {}", response.status()),
    }

    Ok(())
}
