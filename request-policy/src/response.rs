//! Response types returned through the chain.
//!
//! The pipeline never parses a response body. Whichever policy decides a
//! response is final hands it up the chain, and the caller owns the streaming
//! [`ResponseBody`]. Responses discarded in favour of a retry are dropped,
//! which releases the underlying connection.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::PipelineError;

/// Boxed streaming response body.
pub type ResponseBody = UnsyncBoxBody<Bytes, PipelineError>;

/// The outcome of one attempt that reached the peer.
pub type Response = http::Response<ResponseBody>;

/// Build a response with an in-memory body.
///
/// Intended for fake senders and policies that synthesize responses.
pub fn full(status: StatusCode, data: impl Into<Bytes>) -> Response {
    let body = Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response
}

/// Build a response with no body.
pub fn empty(status: StatusCode) -> Response {
    let body = Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    response
}

/// Read the whole response body into memory.
pub async fn collect(response: Response) -> Result<Bytes, PipelineError> {
    Ok(response.into_body().collect().await?.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_response() {
        let response = full(StatusCode::CREATED, "created");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(collect(response).await.unwrap(), Bytes::from("created"));
    }

    #[tokio::test]
    async fn test_empty_response() {
        let response = empty(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(collect(response).await.unwrap().is_empty());
    }
}
