//! Backend process bridge over stdin/stdout.
//!
//! Requests go out as one JSON object per line:
//! `{"id": 7, "command": "get_camera", "args": {}}`.
//! Replies and events come back the same way:
//! `{"id": 7, "ok": "usb:001,004"}`, `{"id": 7, "err": {"status": "NotFound", ...}}`,
//! `{"event": "upload-progress", "payload": {...}}`.

use super::{CommandName, ExternalService, IpcResponse, IpcStatus};
use crate::error::GatewayError;
use crate::events::{EventBus, NativeUploadEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

const BACKEND_CLOSED: &str = "backend closed before replying";

type Reply = Result<Value, IpcResponse>;
/// In-flight calls by id; `None` once the backend's output has closed.
type Pending = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<Reply>>>>>;

#[derive(Serialize)]
struct OutboundRequest<'a> {
    id: u64,
    command: &'a str,
    args: &'a Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InboundLine {
    Ok { id: u64, ok: Value },
    Err { id: u64, err: IpcResponse },
    Event { event: String, #[serde(default)] payload: Value },
}

pub struct StdioService {
    writer: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: Pending,
    next_id: AtomicU64,
    _child: Option<Child>,
}

impl StdioService {
    /// Spawns the backend and starts forwarding its output.
    /// Must be called from within a tokio runtime.
    pub fn spawn(program: &Path, args: &[String], bus: EventBus) -> Result<Self, GatewayError> {
        info!(program = %program.display(), "Starting backend process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GatewayError::transport(503, "backend stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GatewayError::transport(503, "backend stdout unavailable"))?;

        let mut service = Self::from_streams(stdin, stdout, bus);
        service._child = Some(child);
        Ok(service)
    }

    /// Bridge over arbitrary streams; used by `spawn` and by tests.
    pub fn from_streams<W, R>(writer: W, reader: R, bus: EventBus) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        tokio::spawn(read_loop(reader, Arc::clone(&pending), bus));
        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            _child: None,
        }
    }

    async fn send_line(&self, line: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(pending) = pending.as_mut() {
                pending.remove(&id);
            }
        }
    }

    /// True once the backend's output has closed; every later call fails.
    pub fn is_closed(&self) -> bool {
        self.pending.lock().map_or(true, |pending| pending.is_none())
    }
}

#[async_trait]
impl ExternalService for StdioService {
    async fn call(&self, command: CommandName, args: Value) -> Result<Value, IpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match self.pending.lock() {
            Ok(mut pending) => match pending.as_mut() {
                Some(pending) => {
                    pending.insert(id, tx);
                }
                None => {
                    debug!(%command, "Backend already exited");
                    return Err(IpcResponse::new(IpcStatus::Unavailable, BACKEND_CLOSED));
                }
            },
            Err(_) => {
                return Err(IpcResponse::new(
                    IpcStatus::InternalError,
                    "bridge state poisoned",
                ))
            }
        }

        let line = serde_json::to_vec(&OutboundRequest {
            id,
            command: command.as_str(),
            args: &args,
        })
        .map_err(|e| {
            self.forget(id);
            IpcResponse::new(IpcStatus::InvalidArgument, e.to_string())
        })?;

        if let Err(e) = self.send_line(&line).await {
            self.forget(id);
            error!(%command, "Failed to write to backend: {}", e);
            return Err(IpcResponse::new(IpcStatus::Unavailable, e.to_string()));
        }

        rx.await
            .unwrap_or_else(|_| Err(IpcResponse::new(IpcStatus::Unavailable, BACKEND_CLOSED)))
    }
}

async fn read_loop<R>(reader: R, pending: Pending, bus: EventBus)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => dispatch(&line, &pending, &bus),
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read from backend: {}", e);
                break;
            }
        }
    }

    info!("Backend output closed");
    // Dropping the senders fails every outstanding call with Unavailable,
    // and `None` turns away calls made from now on.
    if let Ok(mut pending) = pending.lock() {
        pending.take();
    }
}

fn dispatch(line: &str, pending: &Pending, bus: &EventBus) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let inbound: InboundLine = match serde_json::from_str(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("Ignoring unparseable backend line ({}): {}", e, line);
            return;
        }
    };

    match inbound {
        InboundLine::Ok { id, ok } => complete(pending, id, Ok(ok)),
        InboundLine::Err { id, err } => complete(pending, id, Err(err)),
        InboundLine::Event { event, payload } if event == NativeUploadEvent::CHANNEL => {
            match serde_json::from_value::<NativeUploadEvent>(payload) {
                Ok(native) => {
                    if let Some(device) = native.device_id() {
                        info!(device, "Camera found");
                    }
                    if let Some(event) = native.into_upload_event() {
                        bus.emit(event);
                    }
                }
                Err(e) => warn!("Malformed native upload event: {}", e),
            }
        }
        InboundLine::Event { event, payload } => {
            if let Err(e) = bus.emit_wire(&event, payload) {
                warn!("Dropping backend event: {}", e);
            }
        }
    }
}

fn complete(pending: &Pending, id: u64, reply: Reply) {
    let sender = pending
        .lock()
        .ok()
        .and_then(|mut p| p.as_mut().and_then(|p| p.remove(&id)));
    match sender {
        Some(sender) => {
            let _ = sender.send(reply);
        }
        None => debug!(id, "Reply for unknown request"),
    }
}
