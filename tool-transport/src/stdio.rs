//! Newline-delimited JSON session.
//!
//! Each input line is one frame:
//!
//! ```json
//! {"op": "call", "id": 1, "tool": "echo", "arguments": {"msg": "hi"}, "client_id": "cli"}
//! {"op": "list", "id": 2}
//! ```
//!
//! and each output line is one reply, correlated by `id`:
//!
//! ```json
//! {"id": 1, "envelope": {"data": "hi", "error": null, "status": true}}
//! {"id": 2, "tools": [...]}
//! ```
//!
//! Calls run concurrently on the server's scheduler, so replies may arrive out
//! of order. A line that is not a valid frame gets a failure envelope whose
//! `id` echoes the frame's `id` when one can be read and is `null` otherwise;
//! this includes lines that are not valid UTF-8. Blank lines are ignored.
//!
//! At end of input the session waits for in-flight calls to reply before
//! returning. A call still queued when the scheduler shuts down is answered
//! with a `server is shutting down` failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tool_kernel::{InvocationRequest, ResponseEnvelope, ToolServer};
use tool_primitives::ToolDescriptor;
use tracing::{debug, info, warn};

use crate::{Result, TransportError};

const REPLY_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Frame {
    Call {
        #[serde(default)]
        id: Value,
        tool: String,
        #[serde(default = "empty_arguments")]
        arguments: Value,
        #[serde(default)]
        client_id: Option<String>,
    },
    List {
        #[serde(default)]
        id: Value,
    },
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
    Call {
        id: Value,
        envelope: ResponseEnvelope,
    },
    List {
        id: Value,
        tools: Vec<ToolDescriptor>,
    },
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Call frames accepted.
    pub calls: u64,
    /// List frames answered.
    pub lists: u64,
    /// Lines that were not valid frames.
    pub malformed: u64,
}

/// Serves one session over the process's stdin and stdout.
///
/// # Errors
///
/// See [`serve`].
pub async fn serve_stdio(server: ToolServer) -> Result<SessionSummary> {
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serves one session until `reader` reaches end of input.
///
/// # Errors
///
/// Returns [`TransportError::Io`] when reading a line or writing a reply
/// fails, and [`TransportError::WriterGone`] if the writer task aborts.
pub async fn serve<R, W>(server: ToolServer, reader: R, writer: W) -> Result<SessionSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Reply>(REPLY_BUFFER);
    let writer_task = tokio::spawn(write_replies(writer, rx));

    let mut summary = SessionSummary::default();
    let mut reader = reader;
    let mut line = Vec::new();
    let read_result = loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(err) => break Err(err),
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<Frame>(&line) {
            Ok(Frame::Call {
                id,
                tool,
                arguments,
                client_id,
            }) => {
                summary.calls += 1;
                let request = InvocationRequest {
                    tool,
                    arguments,
                    client_id,
                };
                dispatch(&server, &tx, id, request).await;
            }
            Ok(Frame::List { id }) => {
                summary.lists += 1;
                let tools = server.descriptors();
                if tx.send(Reply::List { id, tools }).await.is_err() {
                    break Ok(());
                }
            }
            Err(err) => {
                summary.malformed += 1;
                warn!(error = %err, "malformed frame");
                let reply = Reply::Call {
                    id: recover_id(&line),
                    envelope: ResponseEnvelope::failure(format!("malformed frame: {err}")),
                };
                if tx.send(reply).await.is_err() {
                    break Ok(());
                }
            }
        }
    };

    debug!("input closed; draining in-flight calls");
    drop(tx);
    let write_result = writer_task.await.map_err(|_| TransportError::WriterGone)?;
    read_result?;
    write_result?;

    info!(
        calls = summary.calls,
        lists = summary.lists,
        malformed = summary.malformed,
        "stdio session finished"
    );
    Ok(summary)
}

async fn dispatch(
    server: &ToolServer,
    tx: &mpsc::Sender<Reply>,
    id: Value,
    request: InvocationRequest,
) {
    let dispatcher = server.dispatcher().clone();
    let reply_tx = tx.clone();
    let call_id = id.clone();
    let scheduled = server.scheduler().spawn(async move {
        let envelope = dispatcher.invoke(request).await;
        let _ = reply_tx.send(Reply::Call { id: call_id, envelope }).await;
    });

    let handle = match scheduled {
        Ok(handle) => handle,
        Err(_) => {
            let _ = tx.send(shutting_down(id)).await;
            return;
        }
    };

    // A call still waiting for a permit when the scheduler closes never runs;
    // it must still be answered.
    let fallback_tx = tx.clone();
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                let _ = fallback_tx.send(shutting_down(id)).await;
            }
            Err(err) => {
                warn!(error = %err, "invocation task aborted");
                let envelope = ResponseEnvelope::failure("invocation task aborted");
                let _ = fallback_tx.send(Reply::Call { id, envelope }).await;
            }
        }
    });
}

fn shutting_down(id: Value) -> Reply {
    Reply::Call {
        id,
        envelope: ResponseEnvelope::failure("server is shutting down"),
    }
}

fn recover_id(line: &[u8]) -> Value {
    serde_json::from_slice::<Value>(line)
        .ok()
        .and_then(|mut value| value.get_mut("id").map(Value::take))
        .unwrap_or(Value::Null)
}

async fn write_replies<W>(mut writer: W, mut rx: mpsc::Receiver<Reply>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let mut payload = serde_json::to_vec(&reply)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_frames() {
        let frame: Frame =
            serde_json::from_value(json!({"op": "call", "id": 7, "tool": "echo"})).unwrap();
        assert!(matches!(
            frame,
            Frame::Call { ref id, ref arguments, client_id: None, .. }
                if *id == json!(7) && *arguments == json!({})
        ));

        let frame: Frame = serde_json::from_value(json!({"op": "list"})).unwrap();
        assert!(matches!(frame, Frame::List { id: Value::Null }));

        assert!(serde_json::from_value::<Frame>(json!({"op": "call", "id": 1})).is_err());
        assert!(serde_json::from_value::<Frame>(json!({"op": "dance"})).is_err());
    }

    #[test]
    fn recovers_id_from_invalid_frames() {
        assert_eq!(recover_id(br#"{"op":"dance","id":"a-1"}"#), json!("a-1"));
        assert_eq!(recover_id(b"not json"), Value::Null);
        assert_eq!(recover_id(b"[1,2]"), Value::Null);
        assert_eq!(recover_id(b"\xff\xfe garbage"), Value::Null);
    }

    #[test]
    fn reply_shapes() {
        let reply = Reply::Call {
            id: json!(1),
            envelope: ResponseEnvelope::failure("unknown tool `nope`"),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"id": 1, "envelope": {"data": null, "error": "unknown tool `nope`", "status": false}})
        );

        let reply = Reply::List {
            id: json!(2),
            tools: Vec::new(),
        };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"id": 2, "tools": []}));
    }
}
