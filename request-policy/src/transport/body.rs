//! Wire body handed to a [`Sender`](super::Sender) for one attempt.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::PipelineError;
use crate::request::BodyStream;

pin_project! {
    /// The body of a single physical attempt.
    ///
    /// Produced from a [`RequestBody`](crate::RequestBody) by the terminal link
    /// of the chain; each attempt gets its own value positioned at the start.
    #[project = TransportBodyProj]
    #[derive(Default)]
    pub enum TransportBody {
        #[default]
        Empty,
        Full {
            data: Option<Bytes>,
        },
        Streaming {
            #[pin]
            stream: BodyStream,
        },
    }
}

impl TransportBody {
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    pub fn full(data: Bytes) -> Self {
        TransportBody::Full { data: Some(data) }
    }

    pub fn from_stream(stream: BodyStream) -> Self {
        TransportBody::Streaming { stream }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = PipelineError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            TransportBodyProj::Empty => Poll::Ready(None),
            TransportBodyProj::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            TransportBodyProj::Streaming { stream } => stream
                .poll_next(cx)
                .map(|chunk| chunk.map(|result| result.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full { data } => data.is_none(),
            TransportBody::Streaming { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            TransportBody::Empty => SizeHint::with_exact(0),
            TransportBody::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            TransportBody::Streaming { .. } => SizeHint::default(),
        }
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full { data } => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
            TransportBody::Streaming { .. } => write!(f, "TransportBody::Streaming"),
        }
    }
}
