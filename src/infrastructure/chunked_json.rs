// Chunked JSON streaming utilities
use crate::infrastructure::frame_broadcast::StreamMessage;
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Create a chunked streaming response of length-prefixed JSON messages
pub async fn chunked_json_stream<S>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = StreamMessage> + Send + 'static,
{
    let byte_stream = stream.then(move |msg| async move { serialize_chunk(msg, compress).await });

    let body = Body::from_stream(byte_stream);

    // Chunks are compressed one by one, so no Content-Encoding header: the
    // HTTP body itself is not a brotli stream.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson-chunked")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single message to a chunk: 4-byte big-endian length, then the
/// (optionally brotli-compressed) JSON payload
pub async fn serialize_chunk(msg: StreamMessage, compress: bool) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(&msg).map_err(std::io::Error::other)?;

    let payload = if compress {
        let mut encoder = BrotliEncoder::new(std::io::Cursor::new(json));
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await?;
        compressed
    } else {
        json
    };

    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(payload.len() as u32);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}

/// The snapshot, then live messages until the broadcast closes or `shutdown`
/// flips to true. Lagging subscribers skip what they missed.
pub fn frame_stream(
    snapshot: Vec<StreamMessage>,
    rx: broadcast::Receiver<StreamMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = StreamMessage> + Send + 'static {
    async_stream::stream! {
        for msg in snapshot {
            yield msg;
        }

        let mut live = BroadcastStream::new(rx);
        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            let next = tokio::select! {
                item = live.next() => item,
                _ = shutdown.changed() => None,
            };

            match next {
                Some(Ok(msg)) => yield msg,
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "frame stream subscriber lagging");
                }
                None => break,
            }
        }
        tracing::debug!("frame stream closed");
    }
}

pub async fn stream_from_broadcast(
    snapshot: Vec<StreamMessage>,
    rx: broadcast::Receiver<StreamMessage>,
    shutdown: watch::Receiver<bool>,
    compress: bool,
) -> impl IntoResponse {
    match chunked_json_stream(frame_stream(snapshot, rx, shutdown), compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertState;

    #[tokio::test]
    async fn test_chunk_is_length_prefixed_json() {
        let chunk = serialize_chunk(StreamMessage::Alerts(AlertState::default()), false)
            .await
            .unwrap();
        let length = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        assert_eq!(length, chunk.len() - 4);

        let json: serde_json::Value = serde_json::from_slice(&chunk[4..]).unwrap();
        assert_eq!(json["type"], "alerts");
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        let (tx, rx) = broadcast::channel(8);
        let (stop, shutdown) = watch::channel(false);
        let snapshot = vec![StreamMessage::Alerts(AlertState::default())];
        let mut stream = Box::pin(frame_stream(snapshot, rx, shutdown));

        assert!(stream.next().await.is_some());
        tx.send(StreamMessage::Alerts(AlertState::default())).unwrap();
        assert!(stream.next().await.is_some());

        stop.send(true).unwrap();
        let end = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next()).await;
        assert!(matches!(end, Ok(None)));
        drop(tx);
    }

    #[tokio::test]
    async fn test_subscriber_after_shutdown_gets_snapshot_only() {
        let (_tx, rx) = broadcast::channel::<StreamMessage>(8);
        let (_stop, shutdown) = watch::channel(true);
        let snapshot = vec![StreamMessage::Alerts(AlertState::default())];
        let messages: Vec<StreamMessage> = frame_stream(snapshot, rx, shutdown).collect().await;
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_compressed_chunk_length() {
        let chunk = serialize_chunk(StreamMessage::Alerts(AlertState::default()), true)
            .await
            .unwrap();
        let length = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        assert_eq!(length, chunk.len() - 4);

        let mut decoder =
            async_compression::tokio::bufread::BrotliDecoder::new(std::io::Cursor::new(chunk[4..].to_vec()));
        let mut json = Vec::new();
        decoder.read_to_end(&mut json).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(json["type"], "alerts");
    }
}
