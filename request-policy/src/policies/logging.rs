//! Per-attempt request logging.
//!
//! Each pass through the policy logs one entry line and one exit line:
//!
//! ```text
//! -> 5f3a91c2 GET https://example.com/items
//! <- 5f3a91c2 41.2ms GET https://example.com/items 200 OK
//! ```
//!
//! The identifier is derived from the wall-clock start time and pairs the two
//! lines. Placed below a retry policy, every physical attempt gets its own pair.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::policy::{BoxFuture, Next, Policy, PolicyFactory};
use crate::{Context, PipelineError, Request, Response};

/// A sink for log lines.
///
/// Closures `Fn(&str)` are loggers too.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Emits log lines as `tracing` events at INFO level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "request_policy::logging", "{message}");
    }
}

/// Creates a logging policy per send.
#[derive(Clone)]
pub struct LoggingFactory {
    logger: Arc<dyn Logger>,
}

impl LoggingFactory {
    pub fn new<L>(logger: L) -> Self
    where
        L: Logger + 'static,
    {
        Self {
            logger: Arc::new(logger),
        }
    }

    /// Share an existing logger.
    pub fn from_arc(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Default for LoggingFactory {
    fn default() -> Self {
        Self::new(TracingLogger)
    }
}

impl std::fmt::Debug for LoggingFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingFactory").finish_non_exhaustive()
    }
}

impl PolicyFactory for LoggingFactory {
    fn create(&self, next: Next) -> Box<dyn Policy> {
        Box::new(LoggingPolicy {
            next,
            logger: self.logger.clone(),
        })
    }
}

struct LoggingPolicy {
    next: Next,
    logger: Arc<dyn Logger>,
}

/// Short hex id from the low 32 bits of the wall-clock time in microseconds.
fn attempt_id(now: SystemTime) -> String {
    let micros = now
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_micros())
        .unwrap_or_default();
    format!("{:08x}", micros as u32)
}

impl Policy for LoggingPolicy {
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        Box::pin(async move {
            let start = Instant::now();
            let id = attempt_id(SystemTime::now());
            let target = format!("{} {}", request.method(), request.uri());
            self.logger.log(&format!("-> {id} {target}"));

            let outcome = self.next.send(ctx, request).await;

            let elapsed = start.elapsed();
            let result = match &outcome {
                Ok(response) => response.status().to_string(),
                Err(err) => format!("error: {err}"),
            };
            self.logger
                .log(&format!("<- {id} {elapsed:?} {target} {result}"));
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use http::{StatusCode, Uri};

    use super::*;
    use crate::config::RetryOptions;
    use crate::policies::RetryFactory;
    use crate::transport::{TransportBody, sender_fn};
    use crate::{Pipeline, response};

    #[derive(Clone, Default)]
    struct Recorder {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Logger for Recorder {
        fn log(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    fn request() -> Request {
        Request::get(Uri::from_static("http://localhost/items"))
    }

    #[test]
    fn test_attempt_id_is_short_hex() {
        let id = attempt_id(UNIX_EPOCH + Duration::from_micros(0x1_2345_6789));
        assert_eq!(id, "23456789");
        assert_eq!(attempt_id(UNIX_EPOCH).len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_and_exit_lines() {
        let recorder = Recorder::default();
        let pipeline = Pipeline::builder()
            .with_policy(LoggingFactory::new(recorder.clone()))
            .with_sender(sender_fn(|_request: http::Request<TransportBody>| async {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok(response::empty(StatusCode::CREATED))
            }))
            .build()
            .unwrap();

        pipeline
            .send_request(&Context::none(), request())
            .await
            .unwrap();

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(lines.len(), 2);

        let entry: Vec<_> = lines[0].split(' ').collect();
        assert_eq!(entry[0], "->");
        assert_eq!(&entry[2..], ["GET", "http://localhost/items"]);

        let exit = &lines[1];
        assert!(exit.starts_with(&format!("<- {} 25ms GET http://localhost/items", entry[1])));
        assert!(exit.ends_with("201 Created"));
    }

    #[tokio::test]
    async fn test_error_outcome_logged() {
        let recorder = Recorder::default();
        let pipeline = Pipeline::builder()
            .with_policy(LoggingFactory::new(recorder.clone()))
            .with_sender(sender_fn(|_request: http::Request<TransportBody>| async {
                Err(PipelineError::transport("connection reset"))
            }))
            .build()
            .unwrap();

        assert!(
            pipeline
                .send_request(&Context::none(), request())
                .await
                .is_err()
        );

        let lines = recorder.lines.lock().unwrap();
        assert!(lines[1].ends_with("error: transport error: connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_pair_per_attempt_inside_retry() {
        let recorder = Recorder::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let pipeline = Pipeline::builder()
            .with_policy(RetryFactory::new(
                RetryOptions::new()
                    .max_attempts(4)
                    .base_delay(Duration::from_millis(10)),
            ))
            .with_policy(LoggingFactory::new(recorder.clone()))
            .with_sender(sender_fn(move |_request: http::Request<TransportBody>| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    let status = if n < 2 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    };
                    Ok(response::empty(status))
                }
            }))
            .build()
            .unwrap();

        let response = pipeline
            .send_request(&Context::none(), request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(lines.len(), 6);
        for pair in lines.chunks(2) {
            assert!(pair[0].starts_with("-> "));
            assert!(pair[1].starts_with("<- "));
            assert_eq!(pair[0].split(' ').nth(1), pair[1].split(' ').nth(1));
        }
        assert!(lines[1].ends_with("503 Service Unavailable"));
        assert!(lines[5].ends_with("200 OK"));
    }

    #[tokio::test]
    async fn test_closure_logger() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let factory = LoggingFactory::new(move |_line: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let pipeline = Pipeline::builder()
            .with_policy(factory)
            .with_sender(sender_fn(|_request: http::Request<TransportBody>| async {
                Ok(response::empty(StatusCode::OK))
            }))
            .build()
            .unwrap();
        pipeline
            .send_request(&Context::none(), request())
            .await
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
