//! Lifecycle of the loopback request server.
//!
//! [`Bridge`] owns the listeners and the mutable [`BridgePhase`] behind one
//! mutex, so concurrent `start` and `stop` calls serialise and repeated calls
//! are no-ops. Start failures never escape: they are recorded as
//! [`Bridge::last_error`] and reported through the [`HealthReporter`].

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use strum::Display;
use tracing::{info, warn};

use crate::dispatch::{BridgeRequestHandler, BridgeRouter};
use crate::handoff::Dispatcher;
use crate::health::HealthReporter;
use crate::host::HostStatus;
use crate::registry::ToolRegistry;
use crate::transport::{
    HttpListener, ListenerError, ListenerHandle, PRIMARY_LOOPBACK, RequestHandler,
    secondary_loopback_addrs,
};

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Lifecycle phase of the request server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BridgePhase {
    /// No listener is bound.
    #[default]
    Stopped,
    /// Listeners are being bound.
    Starting,
    /// Listeners are accepting requests.
    Running,
    /// Listeners are being shut down.
    Stopping,
}

#[derive(Default)]
struct BridgeState {
    phase: BridgePhase,
    port: Option<u16>,
    last_error: Option<String>,
    listeners: Vec<ListenerHandle>,
}

/// Loopback command bridge serving the tool protocol.
pub struct Bridge<H> {
    registry: Arc<ToolRegistry<H>>,
    dispatcher: Dispatcher<H>,
    status: Arc<dyn HostStatus>,
    timeout: Duration,
    reporter: Arc<dyn HealthReporter>,
    state: Mutex<BridgeState>,
}

impl<H: 'static> Bridge<H> {
    /// Creates a stopped bridge.
    pub fn new(
        registry: Arc<ToolRegistry<H>>,
        dispatcher: Dispatcher<H>,
        status: Arc<dyn HostStatus>,
        timeout: Duration,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            status,
            timeout,
            reporter,
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// Starts serving on `port`. Does nothing if already running.
    ///
    /// `127.0.0.1` must bind for the start to succeed. Other loopback
    /// addresses that `localhost` resolves to are bound on the same port when
    /// possible. On failure the bridge stays stopped and the reason is kept in
    /// [`Bridge::last_error`].
    pub fn start(&self, port: u16) {
        let mut state = self.lock();
        if state.phase == BridgePhase::Running {
            return;
        }
        state.phase = BridgePhase::Starting;
        self.reporter.bridge_starting(port);

        match self.bind_all(port) {
            Ok((bound, listeners)) => {
                state.listeners = listeners;
                state.port = Some(bound);
                state.last_error = None;
                state.phase = BridgePhase::Running;
                self.reporter.bridge_started(bound);
            }
            Err(error) => {
                let message = error.to_string();
                warn!(target: BRIDGE_TARGET, %error, port, "bridge failed to start");
                self.reporter.bridge_failed(&message);
                state.last_error = Some(message);
                state.port = None;
                state.phase = BridgePhase::Stopped;
            }
        }
    }

    fn bind_all(&self, port: u16) -> Result<(u16, Vec<ListenerHandle>), ListenerError> {
        let primary = HttpListener::bind(SocketAddr::new(PRIMARY_LOOPBACK, port))?;
        let bound = primary.local_addr().port();
        let router = BridgeRouter::new(
            Arc::clone(&self.registry),
            self.dispatcher.clone(),
            Arc::clone(&self.status),
            bound,
            self.timeout,
        );
        let handler: Arc<dyn RequestHandler> = Arc::new(BridgeRequestHandler::new(router));

        let mut listeners = vec![primary.start(Arc::clone(&handler))?];
        for addr in secondary_loopback_addrs(bound) {
            match HttpListener::bind(addr).and_then(|listener| listener.start(Arc::clone(&handler)))
            {
                Ok(listener) => listeners.push(listener),
                Err(error) => {
                    warn!(target: BRIDGE_TARGET, %error, %addr, "skipping loopback address");
                }
            }
        }
        info!(
            target: BRIDGE_TARGET,
            port = bound,
            listeners = listeners.len(),
            "bridge listening"
        );
        Ok((bound, listeners))
    }

    /// Stops serving and joins the accept threads. Does nothing if stopped.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.phase != BridgePhase::Running {
            return;
        }
        state.phase = BridgePhase::Stopping;
        let listeners = std::mem::take(&mut state.listeners);
        for listener in &listeners {
            listener.shutdown();
        }
        for listener in listeners {
            let addr = listener.addr();
            if let Err(error) = listener.join() {
                warn!(target: BRIDGE_TARGET, %error, %addr, "listener did not stop cleanly");
            }
        }
        state.port = None;
        state.phase = BridgePhase::Stopped;
        self.reporter.bridge_stopped();
    }
}

impl<H> Bridge<H> {
    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the request server is accepting requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().phase == BridgePhase::Running
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> BridgePhase {
        self.lock().phase
    }

    /// Port actually bound while running.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.lock().port
    }

    /// Loopback addresses currently served.
    #[must_use]
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.lock().listeners.iter().map(ListenerHandle::addr).collect()
    }

    /// Reason the most recent start failed, cleared by a successful start.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }
}

impl<H> Drop for Bridge<H> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for listener in state.listeners.drain(..) {
            let addr = listener.addr();
            listener.shutdown();
            if let Err(error) = listener.join() {
                warn!(target: BRIDGE_TARGET, %error, %addr, "listener did not stop cleanly");
            }
        }
    }
}
