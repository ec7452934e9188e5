//! Job queue connecting worker threads to the host loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

use crate::codec::{Map, Value};
use crate::registry::{HandlerError, Tool};

use super::{HANDOFF_TARGET, HandoffError};

/// Unit of work executed on the host thread.
pub type Job<H> = Box<dyn FnOnce(&mut H) + Send>;

/// Creates the producer and consumer halves of the host queue.
///
/// The returned [`HostLoop`] takes ownership of `host`; from then on the host
/// state is only reachable through jobs run by that loop.
#[must_use]
pub fn host_channel<H>(host: H) -> (Dispatcher<H>, HostLoop<H>) {
    let (sender, receiver) = mpsc::channel();
    (Dispatcher { sender }, HostLoop { receiver, host })
}

/// Cloneable handle used by worker threads to submit jobs.
pub struct Dispatcher<H> {
    sender: Sender<Job<H>>,
}

impl<H> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<H: 'static> Dispatcher<H> {
    /// Enqueues a job without waiting for it to run.
    pub fn submit(&self, job: Job<H>) -> Result<(), HandoffError> {
        self.sender
            .send(job)
            .map_err(|_| HandoffError::HostUnavailable)
    }

    /// Runs `tool` on the host thread and waits up to `timeout` for its result.
    ///
    /// The job is always queued, never run inline. When the deadline passes
    /// the job stays queued and its eventual result is dropped.
    pub fn invoke(
        &self,
        tool: Tool<H>,
        parameters: Map,
        timeout: Duration,
    ) -> Result<Value, HandoffError> {
        let name = tool.name().to_owned();
        let (result_sender, result_receiver) = mpsc::sync_channel(1);
        let job: Job<H> = Box::new(move |host: &mut H| {
            let outcome = call_guarded(&tool, host, &parameters);
            if result_sender.send(outcome).is_err() {
                debug!(
                    target: HANDOFF_TARGET,
                    tool = tool.name(),
                    "caller stopped waiting; discarding result"
                );
            }
        });
        self.submit(job)?;

        match result_receiver.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(HandoffError::Handler(error)),
            Err(RecvTimeoutError::Timeout) => Err(HandoffError::Timeout {
                tool: name,
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(HandoffError::HostUnavailable),
        }
    }
}

fn call_guarded<H>(tool: &Tool<H>, host: &mut H, parameters: &Map) -> Result<Value, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(|| tool.call(host, parameters))).unwrap_or_else(
        |payload| {
            Err(HandlerError::new(format!(
                "Tool '{}' panicked: {}",
                tool.name(),
                panic_message(payload.as_ref())
            )))
        },
    )
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Single consumer that owns the host state and runs queued jobs.
pub struct HostLoop<H> {
    receiver: Receiver<Job<H>>,
    host: H,
}

impl<H> HostLoop<H> {
    /// Runs every job that is queued at the time of the call, in FIFO order.
    ///
    /// Jobs submitted while the pump is running wait for the next call.
    /// Returns the number of jobs run.
    pub fn pump(&mut self) -> usize {
        let ready: Vec<Job<H>> = self.receiver.try_iter().collect();
        let count = ready.len();
        for job in ready {
            self.run_job(job);
        }
        count
    }

    /// Blocks on the queue, pumping between ticks, until `shutdown` is set.
    pub fn run_until(&mut self, shutdown: &AtomicBool, tick: Duration) {
        while !shutdown.load(Ordering::SeqCst) {
            match self.receiver.recv_timeout(tick) {
                Ok(job) => {
                    self.run_job(job);
                    self.pump();
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Every dispatcher is gone; keep ticking until asked to stop.
                Err(RecvTimeoutError::Disconnected) => thread::sleep(tick),
            }
        }
    }

    fn run_job(&mut self, job: Job<H>) {
        let host = &mut self.host;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || job(host))) {
            error!(
                target: HANDOFF_TARGET,
                panic = panic_message(payload.as_ref()),
                "host job panicked"
            );
        }
    }

    /// Borrows the host state.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrows the host state.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Consumes the loop and returns the host state.
    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use rstest::rstest;

    use super::*;
    use crate::registry::ToolRegistry;

    fn registry() -> ToolRegistry<Vec<String>> {
        let mut registry = ToolRegistry::new();
        registry.register("record", "", |host: &mut Vec<String>, parameters: &Map| {
            let entry = parameters.get_str("entry").unwrap_or("none").to_owned();
            host.push(entry.clone());
            Ok(Value::from(entry))
        });
        registry.register("fail", "", |_: &mut Vec<String>, _| {
            Err(HandlerError::new("boom"))
        });
        registry.register("explode", "", |_: &mut Vec<String>, _| -> Result<Value, HandlerError> {
            panic!("kaboom")
        });
        registry
    }

    fn tool(name: &str) -> Tool<Vec<String>> {
        registry().resolve(name).expect("tool registered")
    }

    fn spawn_loop(
        host_loop: HostLoop<Vec<String>>,
    ) -> (Arc<AtomicBool>, thread::JoinHandle<HostLoop<Vec<String>>>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            let mut host_loop = host_loop;
            host_loop.run_until(&flag, Duration::from_millis(5));
            host_loop
        });
        (shutdown, handle)
    }

    #[test]
    fn invoke_returns_handler_value_from_host_thread() {
        let (dispatcher, host_loop) = host_channel(Vec::new());
        let (shutdown, handle) = spawn_loop(host_loop);

        let parameters = Map::new().with("entry", "first");
        let value = dispatcher
            .invoke(tool("record"), parameters, Duration::from_secs(5))
            .expect("invoke succeeds");
        assert_eq!(value, Value::from("first"));

        shutdown.store(true, Ordering::SeqCst);
        let host_loop = handle.join().expect("join host loop");
        assert_eq!(host_loop.host(), &vec!["first".to_owned()]);
    }

    #[rstest]
    #[case::handler_error("fail", "boom")]
    #[case::panic("explode", "Tool 'explode' panicked: kaboom")]
    fn invoke_reports_handler_failures(#[case] name: &str, #[case] message: &str) {
        let (dispatcher, host_loop) = host_channel(Vec::new());
        let (shutdown, handle) = spawn_loop(host_loop);

        let error = dispatcher
            .invoke(tool(name), Map::new(), Duration::from_secs(5))
            .expect_err("handler fails");
        match error {
            HandoffError::Handler(error) => assert_eq!(error.message(), message),
            other => panic!("unexpected error: {other:?}"),
        }

        shutdown.store(true, Ordering::SeqCst);
        handle.join().expect("join host loop");
    }

    #[test]
    fn invoke_times_out_and_late_result_is_discarded() {
        let (dispatcher, mut host_loop) = host_channel(Vec::new());
        let started = Instant::now();

        let error = dispatcher
            .invoke(tool("record"), Map::new(), Duration::from_millis(50))
            .expect_err("nobody pumps the queue");
        assert!(matches!(error, HandoffError::Timeout { ref tool, .. } if tool == "record"));
        assert!(started.elapsed() < Duration::from_secs(2));

        assert_eq!(host_loop.pump(), 1, "abandoned job still runs");
        assert_eq!(host_loop.host().len(), 1);
    }

    #[test]
    fn invoke_fails_fast_when_host_loop_is_gone() {
        let (dispatcher, host_loop) = host_channel(Vec::<String>::new());
        drop(host_loop);

        let error = dispatcher
            .invoke(tool("record"), Map::new(), Duration::from_secs(5))
            .expect_err("host gone");
        assert!(matches!(error, HandoffError::HostUnavailable));
    }

    #[test]
    fn pump_runs_jobs_in_fifo_order() {
        let (dispatcher, mut host_loop) = host_channel(Vec::new());
        for entry in ["a", "b", "c"] {
            dispatcher
                .submit(Box::new(move |host: &mut Vec<String>| host.push(entry.to_owned())))
                .expect("submit job");
        }

        assert_eq!(host_loop.pump(), 3);
        assert_eq!(host_loop.into_host(), ["a", "b", "c"]);
    }

    #[test]
    fn jobs_enqueued_during_a_pump_wait_for_the_next_one() {
        let (dispatcher, mut host_loop) = host_channel(Vec::new());
        let inner = dispatcher.clone();
        dispatcher
            .submit(Box::new(move |host: &mut Vec<String>| {
                host.push("outer".to_owned());
                inner
                    .submit(Box::new(|host: &mut Vec<String>| host.push("inner".to_owned())))
                    .expect("submit nested job");
            }))
            .expect("submit job");

        assert_eq!(host_loop.pump(), 1);
        assert_eq!(host_loop.host(), &vec!["outer".to_owned()]);
        assert_eq!(host_loop.pump(), 1);
        assert_eq!(host_loop.host().len(), 2);
    }

    #[test]
    fn panicking_job_does_not_stop_the_pump() {
        let (dispatcher, mut host_loop) = host_channel(Vec::new());
        dispatcher
            .submit(Box::new(|host: &mut Vec<String>| {
                if host.is_empty() {
                    panic!("job failed");
                }
            }))
            .expect("submit job");
        dispatcher
            .submit(Box::new(|host: &mut Vec<String>| host.push("after".to_owned())))
            .expect("submit job");

        assert_eq!(host_loop.pump(), 2);
        assert_eq!(host_loop.host(), &vec!["after".to_owned()]);
    }
}
