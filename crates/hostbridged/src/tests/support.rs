//! Shared harness for the daemon and server behaviour suites.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ortho_config::OrthoError;

use hostbridge_config::{Config, OrthoConfig};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::bridge::Bridge;
use crate::codec::{self, Map, Value};
use crate::handoff::host_channel;
use crate::health::HealthReporter;
use crate::host::{HostMode, HostSnapshot, HostStatus};
use crate::process::ShutdownError;
use crate::process::ShutdownSignal;
use crate::registry::{HandlerError, ToolRegistry};

/// Loader returning defaults with an ephemeral port.
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config {
                port: 0,
                tick_interval_ms: 2,
                ..Config::default()
            },
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        let mut loader = Self::new();
        loader.config.enabled = false;
        loader
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing an invalid port flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hostbridged"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

/// Shutdown signal that installs nothing; tests set the flag themselves.
pub struct ManualShutdown;

impl ShutdownSignal for ManualShutdown {
    fn install(&self, _flag: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        Ok(())
    }
}

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    BridgeStarting(u16),
    BridgeStarted(u16),
    BridgeFailed(String),
    BridgeStopped,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn bridge_starting(&self, port: u16) {
        self.record(HealthEvent::BridgeStarting(port));
    }

    fn bridge_started(&self, port: u16) {
        self.record(HealthEvent::BridgeStarted(port));
    }

    fn bridge_failed(&self, error: &str) {
        self.record(HealthEvent::BridgeFailed(error.to_owned()));
    }

    fn bridge_stopped(&self) {
        self.record(HealthEvent::BridgeStopped);
    }
}

/// Fixed status used by the server suite.
pub struct FixedStatus;

impl HostStatus for FixedStatus {
    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            host: "TestHost".to_owned(),
            version: "0.0.1".to_owned(),
            project: "fixture".to_owned(),
            mode: HostMode::Edit,
        }
    }
}

/// Status source that panics, for exercising the 500 path.
pub struct PanickingStatus;

impl HostStatus for PanickingStatus {
    fn snapshot(&self) -> HostSnapshot {
        panic!("status source exploded");
    }
}

/// How long the `slow` tool blocks the host thread.
pub const SLOW_TOOL_DELAY: Duration = Duration::from_millis(600);

/// Registry over a `Vec<String>` journal with echo, fail and slow tools.
pub fn test_registry() -> ToolRegistry<Vec<String>> {
    let mut registry = ToolRegistry::new();
    registry.register("echo", "Echo the message", |journal: &mut Vec<String>, args: &Map| {
        let message = args
            .get_str("message")
            .ok_or_else(|| HandlerError::missing_argument("message"))?;
        journal.push(message.to_owned());
        Ok(Value::from(message))
    });
    registry.register("fail", "Always fails", |_: &mut Vec<String>, args: &Map| {
        let reason = args.get_str("reason").unwrap_or("boom");
        Err(HandlerError::new(reason))
    });
    registry.register("slow", "Blocks the host thread", |_: &mut Vec<String>, _| {
        thread::sleep(SLOW_TOOL_DELAY);
        Ok(Value::from("done"))
    });
    registry
}

/// A bridge over [`test_registry`] with its host loop on a background thread.
pub struct TestBridge {
    pub bridge: Bridge<Vec<String>>,
    pub reporter: Arc<RecordingHealthReporter>,
    shutdown: Arc<AtomicBool>,
    host_thread: Option<JoinHandle<Vec<String>>>,
}

impl TestBridge {
    pub fn new(timeout: Duration) -> Self {
        Self::with_registry(test_registry(), timeout)
    }

    pub fn with_registry(registry: ToolRegistry<Vec<String>>, timeout: Duration) -> Self {
        Self::with_parts(registry, Arc::new(FixedStatus), timeout)
    }

    pub fn with_status(status: Arc<dyn HostStatus>) -> Self {
        Self::with_parts(test_registry(), status, Duration::from_secs(2))
    }

    fn with_parts(
        registry: ToolRegistry<Vec<String>>,
        status: Arc<dyn HostStatus>,
        timeout: Duration,
    ) -> Self {
        let (dispatcher, mut host_loop) = host_channel(Vec::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let host_thread = thread::spawn(move || {
            host_loop.run_until(&flag, Duration::from_millis(2));
            host_loop.into_host()
        });
        let reporter = Arc::new(RecordingHealthReporter::default());
        let bridge = Bridge::new(
            Arc::new(registry),
            dispatcher,
            status,
            timeout,
            reporter.clone(),
        );
        Self {
            bridge,
            reporter,
            shutdown,
            host_thread: Some(host_thread),
        }
    }

    /// Starts on an ephemeral port and returns the primary address.
    pub fn start(&self) -> SocketAddr {
        self.bridge.start(0);
        let port = self.bridge.port().expect("bridge bound a port");
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    /// Stops everything and returns the journal of handled echoes.
    pub fn finish(mut self) -> Vec<String> {
        self.bridge.stop();
        self.shutdown.store(true, Ordering::SeqCst);
        self.host_thread
            .take()
            .map(|handle| handle.join().expect("host thread panicked"))
            .unwrap_or_default()
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.bridge.stop();
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.host_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Minimal parsed HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Map {
        codec::decode_map(&self.body)
    }
}

/// Sends one request over a fresh connection and reads the full response.
pub fn send(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).expect("connect to bridge");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set read timeout");
    let body = body.unwrap_or_default();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(request.as_bytes())
        .expect("write request");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).expect("read response");
    parse_response(&String::from_utf8(raw).expect("utf-8 response"))
}

/// Posts a tool invocation to `/tool`.
pub fn call_tool(addr: SocketAddr, body: &str) -> HttpResponse {
    send(addr, "POST", "/tool", Some(body))
}

fn parse_response(raw: &str) -> HttpResponse {
    let (head, body) = raw.split_once("\r\n\r\n").expect("header terminator");
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect();
    HttpResponse {
        status,
        headers,
        body: body.to_owned(),
    }
}
