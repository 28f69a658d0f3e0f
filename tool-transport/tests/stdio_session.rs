use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tool_kernel::{Dispatcher, SchedulerConfig, TaskScheduler, ToolServer};
use tool_primitives::{FieldKind, InputSchema, ToolName};
use tool_registry::{Arguments, ToolError, ToolRegistry};
use tool_transport::stdio::{SessionSummary, serve};

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolName::new("echo").unwrap(),
        |args: Arguments| async move { Ok::<_, ToolError>(json!(args.require_str("msg")?)) },
        "Echo the msg argument",
        InputSchema::builder()
            .required("msg", FieldKind::String, "Message to echo")
            .unwrap()
            .build(),
    );
    registry.register(
        ToolName::new("slow").unwrap(),
        |_args: Arguments| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, ToolError>(json!("done"))
        },
        "Finishes after a short delay",
        InputSchema::empty(),
    );
    registry
}

fn server() -> ToolServer {
    ToolServer::from_registry(registry())
}

async fn read_replies<R: AsyncRead + Unpin>(output: R) -> Vec<Value> {
    let mut replies = Vec::new();
    let mut lines = BufReader::new(output).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        replies.push(serde_json::from_str(&line).unwrap());
    }
    replies
}

async fn run_session_bytes(input: &[u8]) -> (SessionSummary, Vec<Value>) {
    let (mut client_in, server_in) = tokio::io::duplex(4096);
    let (server_out, client_out) = tokio::io::duplex(4096);

    client_in.write_all(input).await.unwrap();
    client_in.shutdown().await.unwrap();
    drop(client_in);

    let session = tokio::spawn(serve(server(), BufReader::new(server_in), server_out));
    let replies = read_replies(client_out).await;
    let summary = session.await.unwrap().unwrap();
    (summary, replies)
}

async fn run_session(input: &str) -> (SessionSummary, Vec<Value>) {
    run_session_bytes(input.as_bytes()).await
}

fn by_id(replies: &[Value]) -> HashMap<String, Value> {
    replies
        .iter()
        .map(|reply| (reply["id"].to_string(), reply.clone()))
        .collect()
}

#[tokio::test]
async fn answers_calls_and_lists() {
    let input = concat!(
        r#"{"op":"call","id":1,"tool":"echo","arguments":{"msg":"hi","extra":1}}"#,
        "\n",
        r#"{"op":"list","id":2}"#,
        "\n",
        r#"{"op":"call","id":3,"tool":"nope","arguments":{}}"#,
        "\n",
    );
    let (summary, replies) = run_session(input).await;

    assert_eq!(
        summary,
        SessionSummary {
            calls: 2,
            lists: 1,
            malformed: 0
        }
    );
    let replies = by_id(&replies);
    assert_eq!(
        replies["1"]["envelope"],
        json!({"data": "hi", "error": null, "status": true})
    );
    let tools = replies["2"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "echo");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["msg"]));
    assert_eq!(replies["3"]["envelope"]["status"], false);
    assert!(
        replies["3"]["envelope"]["error"]
            .as_str()
            .unwrap()
            .contains("nope")
    );
}

#[tokio::test]
async fn malformed_and_blank_lines() {
    let input = "not json\n\n   \n{\"op\":\"call\",\"id\":9}\n[1]\n";
    let (summary, replies) = run_session(input).await;

    assert_eq!(summary.malformed, 3);
    assert_eq!(summary.calls, 0);
    assert_eq!(replies.len(), 3);
    for reply in &replies {
        assert_eq!(reply["envelope"]["status"], false);
        assert!(reply["envelope"]["data"].is_null());
    }
    let ids: Vec<_> = replies.iter().map(|reply| reply["id"].clone()).collect();
    assert!(ids.contains(&json!(9)));
    assert_eq!(ids.iter().filter(|id| id.is_null()).count(), 2);
}

#[tokio::test]
async fn non_mapping_arguments_get_failure_envelope() {
    let input = "{\"op\":\"call\",\"id\":\"x\",\"tool\":\"echo\",\"arguments\":[\"hi\"]}\n";
    let (_, replies) = run_session(input).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], "x");
    let envelope = &replies[0]["envelope"];
    assert_eq!(envelope["status"], false);
    assert!(envelope["error"].as_str().unwrap().contains("echo"));
}

#[tokio::test]
async fn end_of_input_drains_in_flight_calls() {
    let input = concat!(
        r#"{"op":"call","id":1,"tool":"slow"}"#,
        "\n",
        r#"{"op":"call","id":2,"tool":"echo","arguments":{"msg":"fast"}}"#,
        "\n",
    );
    let (summary, replies) = run_session(input).await;

    assert_eq!(summary.calls, 2);
    assert_eq!(replies.len(), 2);
    let replies = by_id(&replies);
    assert_eq!(replies["1"]["envelope"]["data"], "done");
    assert_eq!(replies["2"]["envelope"]["data"], "fast");
}

#[tokio::test]
async fn invalid_utf8_line_is_malformed_not_fatal() {
    let mut input = Vec::new();
    input.extend_from_slice(br#"{"op":"call","id":1,"tool":"echo","arguments":{"msg":"ping"}}"#);
    input.push(b'\n');
    input.extend_from_slice(b"\xff\xfe garbage\n");
    input.extend_from_slice(br#"{"op":"call","id":2,"tool":"echo","arguments":{"msg":"pong"}}"#);
    input.push(b'\n');

    let (summary, replies) = run_session_bytes(&input).await;

    assert_eq!(
        summary,
        SessionSummary {
            calls: 2,
            lists: 0,
            malformed: 1
        }
    );
    assert_eq!(replies.len(), 3);
    let replies = by_id(&replies);
    assert_eq!(replies["1"]["envelope"]["data"], "ping");
    assert_eq!(replies["2"]["envelope"]["data"], "pong");
    let rejected = &replies["null"]["envelope"];
    assert_eq!(rejected["status"], false);
    assert!(rejected["error"].as_str().unwrap().starts_with("malformed frame"));
}

#[tokio::test]
async fn queued_call_is_answered_when_server_shuts_down() {
    let scheduler = TaskScheduler::new(SchedulerConfig::new(NonZeroUsize::new(1).unwrap()));
    let server = ToolServer::new(Dispatcher::new(Arc::new(registry())), scheduler);

    let (mut client_in, server_in) = tokio::io::duplex(4096);
    let (server_out, client_out) = tokio::io::duplex(4096);
    let session = tokio::spawn(serve(server.clone(), BufReader::new(server_in), server_out));

    let input = concat!(
        r#"{"op":"call","id":1,"tool":"slow"}"#,
        "\n",
        r#"{"op":"call","id":2,"tool":"slow"}"#,
        "\n",
    );
    client_in.write_all(input.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    server.shutdown();
    client_in.shutdown().await.unwrap();
    drop(client_in);

    let replies = read_replies(client_out).await;
    let summary = session.await.unwrap().unwrap();

    assert_eq!(summary.calls, 2);
    assert_eq!(replies.len(), 2);
    let replies = by_id(&replies);
    assert_eq!(replies["1"]["envelope"]["data"], "done");
    assert_eq!(
        replies["2"]["envelope"],
        json!({"data": null, "error": "server is shutting down", "status": false})
    );
}

#[tokio::test]
async fn calls_after_shutdown_are_refused() {
    let server = server();
    server.shutdown();

    let (mut client_in, server_in) = tokio::io::duplex(4096);
    let (server_out, client_out) = tokio::io::duplex(4096);
    client_in
        .write_all(b"{\"op\":\"call\",\"id\":5,\"tool\":\"echo\",\"arguments\":{\"msg\":\"hi\"}}\n")
        .await
        .unwrap();
    client_in.shutdown().await.unwrap();
    drop(client_in);

    let session = tokio::spawn(serve(server, BufReader::new(server_in), server_out));
    let replies = read_replies(client_out).await;
    session.await.unwrap().unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], 5);
    assert_eq!(replies[0]["envelope"]["error"], "server is shutting down");
}
