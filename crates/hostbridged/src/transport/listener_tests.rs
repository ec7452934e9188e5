//! Tests for the HTTP listener.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use super::listener::{HttpListener, PRIMARY_LOOPBACK};
use super::{CountingHandler, ListenerError, RequestHandler};

#[derive(Clone)]
struct CountingFixture {
    count: Arc<AtomicUsize>,
    handler: Arc<CountingHandler>,
}

#[fixture]
fn counting_fixture() -> CountingFixture {
    let (count, handler) = CountingHandler::new();
    CountingFixture { count, handler }
}

#[fixture]
fn ephemeral_addr() -> SocketAddr {
    SocketAddr::new(PRIMARY_LOOPBACK, 0)
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Sends a bare GET and returns the response status line.
fn send_get(addr: SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect client");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set read timeout");
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .expect("write request");
    let mut status_line = String::new();
    BufReader::new(stream)
        .read_line(&mut status_line)
        .expect("read status line");
    status_line
}

#[rstest]
fn http_listener_dispatches_each_request(
    ephemeral_addr: SocketAddr,
    counting_fixture: CountingFixture,
) {
    let listener = HttpListener::bind(ephemeral_addr).expect("bind listener");
    let addr = listener.local_addr();
    let CountingFixture { count, handler } = counting_fixture;
    let handler: Arc<dyn RequestHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    assert!(send_get(addr).starts_with("HTTP/1.1 204"));
    assert!(send_get(addr).starts_with("HTTP/1.1 204"));

    assert!(wait_for_count(&count, 2), "expected two requests");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn shutdown_releases_the_port(ephemeral_addr: SocketAddr, counting_fixture: CountingFixture) {
    let listener = HttpListener::bind(ephemeral_addr).expect("bind listener");
    let addr = listener.local_addr();
    let handle = listener
        .start(counting_fixture.handler)
        .expect("start listener");

    handle.shutdown();
    handle.join().expect("join listener");

    // The server closes its socket on a background thread after the last
    // handle is dropped, so allow a short grace period.
    let deadline = Instant::now() + Duration::from_secs(2);
    let rebound = loop {
        match HttpListener::bind(addr) {
            Ok(listener) => break listener,
            Err(error) if Instant::now() >= deadline => panic!("port not released: {error}"),
            Err(_) => std::thread::sleep(Duration::from_millis(20)),
        }
    };
    assert_eq!(rebound.local_addr(), addr);
}

#[rstest]
fn binding_an_occupied_port_fails(ephemeral_addr: SocketAddr) {
    let first = HttpListener::bind(ephemeral_addr).expect("bind first listener");
    let error = match HttpListener::bind(first.local_addr()) {
        Ok(_) => panic!("second bind should fail"),
        Err(error) => error,
    };
    assert!(matches!(error, ListenerError::Bind { addr, .. } if addr == first.local_addr()));
}
