use std::path::{Path, PathBuf};

use tokio::net::UnixStream;

use crate::error::ServerError;
use crate::models::Config;
use crate::server::protocol::{
    Request, Response, StatusResponse, ToolsResponse, read_frame, write_frame,
};
use crate::tools::{ToolCall, ToolResponse};

/// Client for a running tool server.
pub struct ToolClient {
    socket_path: PathBuf,
}

impl ToolClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.socket_path())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_running(&self) -> bool {
        self.socket_path.exists()
            && std::os::unix::net::UnixStream::connect(&self.socket_path).is_ok()
    }

    async fn connect(&self) -> Result<UnixStream, ServerError> {
        if !self.socket_path.exists() {
            return Err(ServerError::NotRunning);
        }
        UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| ServerError::ConnectionFailed(e.to_string()))
    }

    async fn send_request(&self, request: Request) -> Result<Response, ServerError> {
        let mut stream = self.connect().await?;
        write_frame(&mut stream, &request).await?;

        let body = read_frame(&mut stream).await?.ok_or_else(|| {
            ServerError::ProtocolError("server closed the connection".to_string())
        })?;
        serde_json::from_slice(&body).map_err(|e| ServerError::ProtocolError(e.to_string()))
    }

    fn unexpected(response: Response) -> ServerError {
        match response {
            Response::Error(e) => ServerError::ProtocolError(e.message),
            _ => ServerError::ProtocolError("unexpected response".to_string()),
        }
    }

    pub async fn ping(&self) -> Result<(), ServerError> {
        match self.send_request(Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }

    pub async fn status(&self) -> Result<StatusResponse, ServerError> {
        match self.send_request(Request::Status).await? {
            Response::Status(s) => Ok(s),
            other => Err(Self::unexpected(other)),
        }
    }

    pub async fn list_tools(&self) -> Result<ToolsResponse, ServerError> {
        match self.send_request(Request::ListTools).await? {
            Response::Tools(t) => Ok(t),
            other => Err(Self::unexpected(other)),
        }
    }

    pub async fn call(&self, call: ToolCall) -> Result<ToolResponse, ServerError> {
        match self.send_request(Request::Call(call)).await? {
            Response::Call(r) => Ok(r),
            other => Err(Self::unexpected(other)),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ServerError> {
        match self.send_request(Request::Shutdown).await? {
            Response::ShutdownAck => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }
}
