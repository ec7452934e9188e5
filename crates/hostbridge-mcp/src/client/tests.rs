use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rstest::rstest;
use tiny_http::{Header, Response, Server};

use super::*;

type Recorded = Arc<Mutex<Vec<(String, String, String)>>>;

/// Single-threaded stand-in for the bridge that answers every request with
/// a fixed status and body.
struct FakeBridge {
    server: Arc<Server>,
    addr: SocketAddr,
    requests: Recorded,
    worker: Option<JoinHandle<()>>,
}

impl FakeBridge {
    fn start(status: u16, body: &'static str) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake bridge"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let requests: Recorded = Arc::default();
        let worker = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                while let Ok(mut request) = server.recv() {
                    let mut received = String::new();
                    request
                        .as_reader()
                        .read_to_string(&mut received)
                        .expect("read body");
                    requests.lock().expect("lock").push((
                        request.method().to_string(),
                        request.url().to_owned(),
                        received,
                    ));
                    let header = Header::from_bytes("Content-Type", "application/json")
                        .expect("header");
                    let response = Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header);
                    request.respond(response).expect("respond");
                }
            })
        };
        Self {
            server,
            addr,
            requests,
            worker: Some(worker),
        }
    }

    fn client(&self) -> HttpBridgeClient {
        HttpBridgeClient::new(format!("http://{}", self.addr), Duration::from_secs(5))
            .expect("build client")
    }

    fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().expect("lock").clone()
    }
}

impl Drop for FakeBridge {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind a free port");
    listener.local_addr().expect("free port address").port()
}

#[test]
fn lists_tools_with_optional_descriptions() {
    let bridge = FakeBridge::start(
        200,
        r#"{"tools":[{"name":"echo","description":"Echo"},{"name":"bare"}],"count":2}"#,
    );
    let tools = bridge.client().list_tools().expect("list tools");
    assert_eq!(
        tools,
        vec![
            RemoteTool {
                name: "echo".to_owned(),
                description: Some("Echo".to_owned()),
            },
            RemoteTool {
                name: "bare".to_owned(),
                description: None,
            },
        ]
    );
    let requests = bridge.requests();
    assert_eq!(requests[0].0, "GET");
    assert_eq!(requests[0].1, "/tools");
}

#[test]
fn posts_tool_envelope() {
    let bridge = FakeBridge::start(200, r#"{"success":true,"result":"hi"}"#);
    let reply = bridge
        .client()
        .call_tool("echo", json!({"message": "hi"}))
        .expect("call tool");
    assert_eq!(reply, json!({"success": true, "result": "hi"}));

    let requests = bridge.requests();
    assert_eq!(requests[0].0, "POST");
    assert_eq!(requests[0].1, "/tool");
    let sent: Value = serde_json::from_str(&requests[0].2).expect("json body");
    assert_eq!(sent, json!({"tool": "echo", "arguments": {"message": "hi"}}));
}

#[rstest]
#[case::timeout(504, r#"{"error":"Execution timeout"}"#)]
#[case::bad_request(400, r#"{"error":"Missing 'tool' field"}"#)]
fn non_success_status_is_an_error(#[case] status: u16, #[case] body: &'static str) {
    let bridge = FakeBridge::start(status, body);
    let error = bridge
        .client()
        .call_tool("echo", json!({}))
        .expect_err("status error");
    assert!(matches!(error, ClientError::Status { status: got, .. } if got == status));
    assert_eq!(error.to_string(), format!("Bridge returned {status}: {body}"));
}

#[test]
fn undecodable_body_is_a_decode_error() {
    let bridge = FakeBridge::start(200, "not json");
    let error = bridge.client().status().expect_err("decode error");
    assert!(matches!(error, ClientError::Decode { .. }));
}

#[test]
fn refused_connection_is_unreachable() {
    let client = HttpBridgeClient::new(
        format!("http://127.0.0.1:{}", closed_port()),
        Duration::from_secs(2),
    )
    .expect("build client");
    let error = client.list_tools().expect_err("unreachable");
    assert!(matches!(error, ClientError::Unreachable { .. }));
}

#[test]
fn base_url_comes_from_configuration() {
    let config = Config {
        bridge_host: "localhost".to_owned(),
        port: 9100,
        ..Config::default()
    };
    let client = HttpBridgeClient::from_config(&config).expect("build client");
    assert_eq!(client.base_url(), "http://localhost:9100");
    assert_eq!(client.url("/status"), "http://localhost:9100/status");
}

#[test]
fn oversized_request_timeout_saturates() {
    let config = Config {
        request_timeout_secs: u64::MAX,
        ..Config::default()
    };
    let client = HttpBridgeClient::from_config(&config).expect("build client");
    assert_eq!(client.base_url(), config.bridge_url());
}
