//! Simulated scene host.
//!
//! A small in-memory stand-in for a 3D editor: an object tree, a play/edit
//! mode and a log console. Its tools give the daemon something real to serve
//! and drive the end-to-end tests.

mod console;
mod tools;
mod world;

use std::sync::Arc;

use crate::bootstrap::HostParts;
use crate::registry::ToolRegistry;

pub use self::console::{CONSOLE_CAPACITY, Console, LogEntry, LogKind};
pub use self::tools::register_tools;
pub use self::world::{
    KNOWN_COMPONENTS, ObjectId, Primitive, Scene, SceneError, SceneObject, SceneStatus,
    SceneWorld, SharedMode, Vec3, known_component,
};

const SCENE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scene");

/// Name of the scene the daemon opens at startup.
pub const DEFAULT_SCENE: &str = "SampleScene";

/// Builds the scene host with every scene tool registered.
#[must_use]
pub fn host_parts(project: impl Into<String>) -> HostParts<SceneWorld> {
    let world = SceneWorld::new(project, Scene::with_defaults(DEFAULT_SCENE));
    let status = Arc::new(world.status());
    let mut registry = ToolRegistry::new();
    register_tools(&mut registry);
    HostParts {
        host: world,
        registry,
        status,
    }
}
