use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;
use crate::tools::{ToolCall, ToolDefinition, ToolResponse};

/// Frames larger than this close the connection.
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Shutdown,
    Status,
    ListTools,
    Call(ToolCall),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    ShutdownAck,
    Status(StatusResponse),
    Tools(ToolsResponse),
    Call(ToolResponse),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub embedding_model: String,
    pub collection: String,
    /// Absent when the collection is missing or the store is unreachable.
    pub total_songs: Option<u64>,
    pub idle_secs: u64,
    pub requests_served: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            message: message.into(),
        })
    }
}

pub fn encode_message(msg: &impl Serialize) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    let len = (json.len() as u32).to_be_bytes();
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len);
    buf.extend_from_slice(&json);
    Ok(buf)
}

pub fn decode_length(buf: &[u8; 4]) -> usize {
    u32::from_be_bytes(*buf) as usize
}

/// Read one frame body. `Ok(None)` means the peer closed the stream between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, ServerError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ServerError::SocketError(e.to_string())),
    }

    let len = decode_length(&len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ServerError::ProtocolError(format!(
            "frame of {} bytes exceeds limit of {}",
            len, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| ServerError::SocketError(e.to_string()))?;
    Ok(Some(body))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &impl Serialize,
) -> Result<(), ServerError> {
    let encoded = encode_message(msg).map_err(|e| ServerError::ProtocolError(e.to_string()))?;
    writer
        .write_all(&encoded)
        .await
        .map_err(|e| ServerError::SocketError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_prefix() {
        let encoded = encode_message(&Request::Ping).unwrap();
        let body = br#"{"type":"ping"}"#;
        assert_eq!(decode_length(&[encoded[0], encoded[1], encoded[2], encoded[3]]), body.len());
        assert_eq!(&encoded[4..], body);
    }

    #[test]
    fn test_call_request_shape() {
        let request = Request::Call(ToolCall::new("search_songs", json!({"query": "rain"})));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"type": "call", "name": "search_songs", "arguments": {"query": "rain"}})
        );

        let parsed: Request =
            serde_json::from_str(r#"{"type":"call","name":"get_collection_stats"}"#).unwrap();
        assert!(matches!(parsed, Request::Call(call) if call.arguments.is_null()));
    }

    #[tokio::test]
    async fn test_frame_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, &Request::ListTools).await.unwrap();
        drop(a);

        let body = read_frame(&mut b).await.unwrap().unwrap();
        let request: Request = serde_json::from_slice(&body).unwrap();
        assert!(matches!(request, Request::ListTools));
        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_be_bytes())
            .await
            .unwrap();

        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, ServerError::ProtocolError(_)));
    }
}
