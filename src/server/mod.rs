pub mod protocol;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::server::protocol::{
    Request, Response, StatusResponse, ToolsResponse, read_frame, write_frame,
};
use crate::tools::{AGENT_INSTRUCTIONS, SongTools, tool_definitions};

/// Serves the song tools over a Unix socket, one connection at a time.
pub struct ToolServer {
    tools: SongTools,
    socket_path: PathBuf,
    embedding_model: String,
    idle_timeout: Duration,
    last_request: RwLock<Instant>,
    requests_served: AtomicU64,
    shutdown: Notify,
}

impl ToolServer {
    pub fn new(
        tools: SongTools,
        socket_path: impl Into<PathBuf>,
        embedding_model: impl Into<String>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            tools,
            socket_path: socket_path.into(),
            embedding_model: embedding_model.into(),
            idle_timeout,
            last_request: RwLock::new(Instant::now()),
            requests_served: AtomicU64::new(0),
            shutdown: Notify::new(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until shutdown is requested, the idle timeout
    /// passes, or Ctrl-C arrives. The socket file is removed on exit.
    pub async fn run(&self) -> Result<(), ServerError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(
            socket = %self.socket_path.display(),
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "tool server listening"
        );

        let check_interval = Duration::from_secs(10).min(self.idle_timeout);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            *self.last_request.write().await = Instant::now();
                            if self.handle_connection(stream).await {
                                info!("shutdown requested");
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "accept error"),
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(check_interval) => {
                    let last = *self.last_request.read().await;
                    if last.elapsed() > self.idle_timeout {
                        info!("idle timeout reached, shutting down");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    /// Ask a running [`ToolServer::run`] loop to stop.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// Serve requests on one connection. Returns true when a shutdown was acknowledged.
    async fn handle_connection(&self, mut stream: UnixStream) -> bool {
        loop {
            let body = match read_frame(&mut stream).await {
                Ok(Some(body)) => body,
                Ok(None) => return false,
                Err(e) => {
                    debug!(error = %e, "closing connection");
                    return false;
                }
            };

            let response = match serde_json::from_slice::<Request>(&body) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => Response::error(format!("invalid request: {}", e)),
            };
            self.requests_served.fetch_add(1, Ordering::Relaxed);

            if let Err(e) = write_frame(&mut stream, &response).await {
                debug!(error = %e, "failed to write response");
                return false;
            }

            if matches!(response, Response::ShutdownAck) {
                return true;
            }
        }
    }

    async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Shutdown => Response::ShutdownAck,

            Request::Status => {
                let last = *self.last_request.read().await;
                let total_songs = match self.tools.store().collection_info().await {
                    Ok(info) => info.map(|i| i.points_count),
                    Err(e) => {
                        warn!(error = %e, "status: vector store unavailable");
                        None
                    }
                };
                Response::Status(StatusResponse {
                    running: true,
                    embedding_model: self.embedding_model.clone(),
                    collection: self.tools.store().collection().to_string(),
                    total_songs,
                    idle_secs: last.elapsed().as_secs(),
                    requests_served: self.requests_served.load(Ordering::Relaxed),
                })
            }

            Request::ListTools => Response::Tools(ToolsResponse {
                tools: tool_definitions(),
                instructions: AGENT_INSTRUCTIONS.to_string(),
            }),

            Request::Call(call) => {
                debug!(tool = %call.name, "tool call");
                Response::Call(self.tools.dispatch(call).await)
            }
        }
    }

    fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
        info!("tool server stopped");
    }
}

/// Run a server until it stops, sharing it so callers can hold a handle.
pub async fn run_server(server: Arc<ToolServer>) -> Result<(), ServerError> {
    server.run().await
}
