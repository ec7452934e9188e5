//! Host-side status reported by `/status`.
//!
//! `/status` is answered from worker threads, so the host publishes a
//! thread-safe [`HostStatus`] view instead of routing through the host loop.

use strum::{Display, EnumString};

/// Execution mode of the host application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HostMode {
    /// Authoring mode; the simulation is not running.
    #[default]
    Edit,
    /// The simulation is running.
    Play,
    /// The simulation is running but paused.
    Paused,
}

/// Point-in-time description of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSnapshot {
    /// Host application name.
    pub host: String,
    /// Host application version.
    pub version: String,
    /// Open project name.
    pub project: String,
    /// Current execution mode.
    pub mode: HostMode,
}

/// Thread-safe source of [`HostSnapshot`]s.
#[cfg_attr(test, mockall::automock)]
pub trait HostStatus: Send + Sync {
    /// Captures the current host description.
    fn snapshot(&self) -> HostSnapshot;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(HostMode::Edit, "edit")]
    #[case(HostMode::Play, "play")]
    #[case(HostMode::Paused, "paused")]
    fn modes_render_in_snake_case(#[case] mode: HostMode, #[case] text: &str) {
        assert_eq!(mode.to_string(), text);
        assert_eq!(HostMode::from_str(text).expect("parse mode"), mode);
    }
}
