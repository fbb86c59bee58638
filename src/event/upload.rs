use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::envelope::HandlerFuture;

/// What the client told us about an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

/// Streamed upload body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Delegate receiving a file upload.
#[derive(Clone)]
pub struct UploadHandler(
    Arc<dyn Fn(FileMetadata, ByteStream, CancellationToken) -> HandlerFuture + Send + Sync>,
);

impl UploadHandler {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(FileMetadata, ByteStream, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        UploadHandler(Arc::new(
            move |meta: FileMetadata, stream: ByteStream, cancel: CancellationToken| {
                Box::pin(handler(meta, stream, cancel)) as HandlerFuture
            },
        ))
    }

    pub(crate) fn call(
        &self,
        meta: FileMetadata,
        stream: ByteStream,
        cancel: CancellationToken,
    ) -> HandlerFuture {
        (self.0)(meta, stream, cancel)
    }
}

impl fmt::Debug for UploadHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UploadHandler")
    }
}

/// Next chunk of the stream, or `None` at the end.
pub async fn next_chunk(stream: &mut ByteStream) -> Option<Result<Bytes, io::Error>> {
    std::future::poll_fn(|cx| stream.as_mut().poll_next(cx)).await
}

/// Collect the whole stream, giving up when `cancel` fires.
pub async fn read_to_end(
    stream: &mut ByteStream,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("upload cancelled"),
            chunk = next_chunk(stream) => match chunk {
                Some(chunk) => buf.extend_from_slice(&chunk?),
                None => return Ok(buf),
            },
        }
    }
}

/// In-memory stream over ready chunks.
pub fn stream_from_chunks<I>(chunks: I) -> ByteStream
where
    I: IntoIterator,
    I::Item: Into<Bytes>,
{
    Box::pin(Chunks(chunks.into_iter().map(Into::into).collect()))
}

struct Chunks(VecDeque<Bytes>);

impl Stream for Chunks {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.0.pop_front().map(Ok))
    }
}
