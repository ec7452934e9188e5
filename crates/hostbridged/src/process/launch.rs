//! Supervises daemon launch sequencing and runtime orchestration.

use std::env;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::scene;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::PROCESS_TARGET;

/// Project name used when the working directory has no usable name.
const FALLBACK_PROJECT: &str = "hostbridge";

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
///
/// Blocks the calling thread, which becomes the host thread, until a
/// termination signal arrives.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
    };
    run_daemon_with(plan, &Arc::new(AtomicBool::new(false)))
}

/// Runs the daemon with injected collaborators until `stop` is set.
pub(crate) fn run_daemon_with<L, S>(
    plan: LaunchPlan<L, S>,
    stop: &Arc<AtomicBool>,
) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
    } = plan;

    let config = loader.load()?;
    let project = project_name()?;
    info!(
        target: PROCESS_TARGET,
        %project,
        "starting daemon runtime"
    );

    let static_loader = StaticConfigLoader::new(config);
    let mut daemon = bootstrap_with(&static_loader, reporter, scene::host_parts(project))?;
    shutdown.install(stop)?;

    daemon.start_bridge();
    if let Some(error) = daemon.bridge().last_error() {
        warn!(
            target: PROCESS_TARGET,
            %error,
            "continuing without request server"
        );
    }

    daemon.run_host_loop(stop);
    daemon.shutdown();
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

fn project_name() -> Result<String, LaunchError> {
    let root = env::current_dir().map_err(|source| LaunchError::ProjectRoot { source })?;
    Ok(root
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_PROJECT)
        .to_owned())
}
