//! Listener implementation for loopback HTTP endpoints.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tiny_http::Server;
use tracing::{debug, info, warn};

use super::{LISTENER_TARGET, ListenerError, RequestHandler};

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Primary loopback address; always bound.
pub(crate) const PRIMARY_LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// HTTP server bound to one socket address.
pub(crate) struct HttpListener {
    server: Arc<Server>,
    addr: SocketAddr,
}

impl HttpListener {
    pub(crate) fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let server = Server::http(addr).map_err(|source| ListenerError::Bind { addr, source })?;
        let bound = server
            .server_addr()
            .to_ip()
            .ok_or(ListenerError::UnknownAddress { addr })?;
        Ok(Self {
            server: Arc::new(server),
            addr: bound,
        })
    }

    /// Address actually bound, with the ephemeral port resolved.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let server = Arc::clone(&self.server);
        let addr = self.addr;
        let handle = thread::Builder::new()
            .name(format!("hostbridge-accept-{addr}"))
            .spawn(move || run_accept_loop(&server, addr, &shutdown_flag, &handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            server: self.server,
            addr,
            handle: Some(handle),
        })
    }
}

/// Handle to a background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    server: Arc<Server>,
    addr: SocketAddr,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.server.unblock();
    }

    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_accept_loop(
    server: &Server,
    addr: SocketAddr,
    shutdown: &AtomicBool,
    handler: &Arc<dyn RequestHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        %addr,
        "http listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(request)) => {
                last_error = None;
                let handler = Arc::clone(handler);
                let spawned = thread::Builder::new()
                    .name("hostbridge-request".to_owned())
                    .spawn(move || handler.handle(request));
                if let Err(error) = spawned {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "failed to spawn request thread"
                    );
                }
            }
            Ok(None) => {}
            Err(_) if shutdown.load(Ordering::SeqCst) => break,
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        %addr,
                        "http accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    debug!(
        target: LISTENER_TARGET,
        %addr,
        "http listener stopped"
    );
}

/// Additional loopback addresses that `localhost` resolves to, excluding the
/// primary IPv4 address. Resolution failures yield an empty list.
pub(crate) fn secondary_loopback_addrs(port: u16) -> Vec<SocketAddr> {
    let resolved = match ("localhost", port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(error) => {
            debug!(
                target: LISTENER_TARGET,
                error = %error,
                "could not resolve localhost"
            );
            return Vec::new();
        }
    };
    let mut addrs: Vec<SocketAddr> = Vec::new();
    for addr in resolved {
        if addr.ip().is_loopback() && addr.ip() != PRIMARY_LOOPBACK && !addrs.contains(&addr) {
            addrs.push(addr);
        }
    }
    addrs
}
