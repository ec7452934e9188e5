//! In-memory scene graph and host state of the simulated host.
//!
//! Objects live in an arena indexed by [`ObjectId`]. Destroyed slots stay
//! empty so ids never alias. Name lookups walk the tree depth-first from the
//! roots, which is also the order `gameobject.find` reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use thiserror::Error;

use crate::codec::{Map, Value};
use crate::host::{HostMode, HostSnapshot, HostStatus};

use super::console::Console;

/// Component every object carries and that cannot be added or removed.
pub const TRANSFORM: &str = "Transform";

/// Component types the simulated host knows how to attach.
pub const KNOWN_COMPONENTS: &[&str] = &[
    "Animator",
    "AudioListener",
    "AudioSource",
    "BoxCollider",
    "Camera",
    "CapsuleCollider",
    "CharacterController",
    "Light",
    "MeshCollider",
    "MeshFilter",
    "MeshRenderer",
    "ParticleSystem",
    "Rigidbody",
    "SphereCollider",
    TRANSFORM,
];

/// Canonical spelling of a known component type, matched case-insensitively.
#[must_use]
pub fn known_component(name: &str) -> Option<&'static str> {
    KNOWN_COMPONENTS
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(name.trim()))
}

/// Position, Euler rotation in degrees, or scale of an object.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    /// X axis.
    pub x: f64,
    /// Y axis.
    pub y: f64,
    /// Z axis.
    pub z: f64,
}

impl Vec3 {
    /// Origin and the default rotation.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Default scale.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Vector from its three axes.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Reads `x`, `y` and `z` from `map`, keeping `self` for missing axes.
    #[must_use]
    pub fn merged(self, map: &Map) -> Self {
        Self {
            x: map.get_f64("x").unwrap_or(self.x),
            y: map.get_f64("y").unwrap_or(self.y),
            z: map.get_f64("z").unwrap_or(self.z),
        }
    }
}

impl From<Vec3> for Value {
    fn from(vector: Vec3) -> Self {
        Value::from(
            Map::new()
                .with("x", vector.x)
                .with("y", vector.y)
                .with("z", vector.z),
        )
    }
}

/// Built-in mesh shapes `gameobject.create` can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Primitive {
    /// Unit cube with a box collider.
    Cube,
    /// Sphere with a sphere collider.
    Sphere,
    /// Capsule with a capsule collider.
    Capsule,
    /// Cylinder with a capsule collider.
    Cylinder,
    /// Flat ten-unit plane.
    Plane,
    /// Flat one-unit quad.
    Quad,
}

impl Primitive {
    /// Parses a primitive name, falling back to a cube for unknown names.
    #[must_use]
    pub fn parse_or_cube(name: &str) -> Self {
        name.trim().parse().unwrap_or(Self::Cube)
    }

    fn collider(self) -> &'static str {
        match self {
            Self::Cube => "BoxCollider",
            Self::Sphere => "SphereCollider",
            Self::Capsule | Self::Cylinder => "CapsuleCollider",
            Self::Plane | Self::Quad => "MeshCollider",
        }
    }

    /// Components attached to a fresh primitive, after the transform.
    #[must_use]
    pub fn components(self) -> [&'static str; 3] {
        ["MeshFilter", "MeshRenderer", self.collider()]
    }
}

/// Stable handle to an object in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// One object in the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Display name; not required to be unique.
    pub name: String,
    /// Tag, `Untagged` by default.
    pub tag: String,
    /// Layer name, `Default` by default.
    pub layer: String,
    /// Whether the object is active in the hierarchy.
    pub active: bool,
    /// Local position.
    pub position: Vec3,
    /// Local Euler rotation in degrees.
    pub rotation: Vec3,
    /// Local scale.
    pub scale: Vec3,
    /// Attached component type names, [`TRANSFORM`] first.
    pub components: Vec<String>,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

impl SceneObject {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: "Untagged".to_owned(),
            layer: "Default".to_owned(),
            active: true,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            components: vec![TRANSFORM.to_owned()],
            parent: None,
            children: Vec::new(),
        }
    }

    /// Parent object, `None` for roots.
    #[must_use]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Direct children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Whether a component of that type is attached, ignoring case.
    #[must_use]
    pub fn has_component(&self, component: &str) -> bool {
        self.components
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(component))
    }
}

/// Structural errors from scene edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The object was destroyed or never existed.
    #[error("object no longer exists")]
    Missing,
    /// Reparenting would create a cycle.
    #[error("cannot parent '{child}' under itself or one of its descendants")]
    Cycle {
        /// Name of the object being moved.
        child: String,
    },
}

/// Tree of scene objects.
#[derive(Debug)]
pub struct Scene {
    name: String,
    path: String,
    slots: Vec<Option<SceneObject>>,
    roots: Vec<ObjectId>,
}

impl Scene {
    /// Empty scene saved under `Assets/Scenes/<name>.scene`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let scene_name = name.into();
        Self {
            path: format!("Assets/Scenes/{scene_name}.scene"),
            name: scene_name,
            slots: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// An empty scene holding the usual camera and light.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let mut scene = Self::new(name);
        let camera = scene.spawn("Main Camera", None);
        if let Some(object) = scene.get_mut(camera) {
            object.tag = "MainCamera".to_owned();
            object.position = Vec3::new(0.0, 1.0, -10.0);
            object
                .components
                .extend(["Camera", "AudioListener"].map(str::to_owned));
        }
        let light = scene.spawn("Directional Light", None);
        if let Some(object) = scene.get_mut(light) {
            object.position = Vec3::new(0.0, 3.0, 0.0);
            object.rotation = Vec3::new(50.0, -30.0, 0.0);
            object.components.push("Light".to_owned());
        }
        scene
    }

    /// Scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asset path of the scene.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Root objects in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The live object behind `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to the live object behind `id`.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Adds an empty object under `parent`, or at the root when `None`.
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.slots.len());
        let mut object = SceneObject::new(name);
        let live_parent = parent.filter(|candidate| self.get(*candidate).is_some());
        object.parent = live_parent;
        self.slots.push(Some(object));
        self.attach(id, live_parent);
        id
    }

    /// Every live object in depth-first order from the roots.
    #[must_use]
    pub fn walk(&self) -> Vec<ObjectId> {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<ObjectId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(object) = self.get(id) {
                order.push(id);
                stack.extend(object.children.iter().rev().copied());
            }
        }
        order
    }

    /// First object named `name` in depth-first order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.walk()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|object| object.name == name))
    }

    /// Removes `id` and its whole subtree.
    pub fn destroy(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let parent = self.get(id).ok_or(SceneError::Missing)?.parent;
        self.detach(id, parent);
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(object) = self.slots.get_mut(next.0).and_then(Option::take) {
                pending.extend(object.children);
            }
        }
        Ok(())
    }

    /// Moves `child` under `parent`, or to the root when `None`.
    pub fn set_parent(
        &mut self,
        child: ObjectId,
        parent: Option<ObjectId>,
    ) -> Result<(), SceneError> {
        let current = self.get(child).ok_or(SceneError::Missing)?;
        if let Some(target) = parent {
            if self.get(target).is_none() {
                return Err(SceneError::Missing);
            }
            if self.is_descendant_or_self(target, child) {
                return Err(SceneError::Cycle {
                    child: current.name.clone(),
                });
            }
        }
        let previous = current.parent;
        self.detach(child, previous);
        if let Some(object) = self.get_mut(child) {
            object.parent = parent;
        }
        self.attach(child, parent);
        Ok(())
    }

    fn is_descendant_or_self(&self, candidate: ObjectId, ancestor: ObjectId) -> bool {
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.get(id).and_then(SceneObject::parent);
        }
        false
    }

    fn attach(&mut self, id: ObjectId, parent: Option<ObjectId>) {
        if let Some(object) = parent.and_then(|parent_id| self.get_mut(parent_id)) {
            object.children.push(id);
        } else {
            self.roots.push(id);
        }
    }

    fn detach(&mut self, id: ObjectId, parent: Option<ObjectId>) {
        if let Some(object) = parent.and_then(|parent_id| self.get_mut(parent_id)) {
            object.children.retain(|sibling| *sibling != id);
        } else {
            self.roots.retain(|sibling| *sibling != id);
        }
    }

    /// Encodes an object, descending `depth` levels into its children.
    #[must_use]
    pub fn object_value(&self, id: ObjectId, depth: usize) -> Value {
        let Some(object) = self.get(id) else {
            return Value::Null;
        };
        let components: Vec<Value> = object
            .components
            .iter()
            .map(|component| Value::from(component.as_str()))
            .collect();
        let mut data = Map::new()
            .with("name", object.name.as_str())
            .with("tag", object.tag.as_str())
            .with("layer", object.layer.as_str())
            .with("active", object.active)
            .with("position", object.position)
            .with("rotation", object.rotation)
            .with("scale", object.scale)
            .with("components", components);
        if depth > 0 && !object.children.is_empty() {
            let children: Vec<Value> = object
                .children
                .iter()
                .map(|child| self.object_value(*child, depth - 1))
                .collect();
            data.insert("children", children);
        }
        Value::from(data)
    }

    /// Indented text tree with `▶`/`▷` markers for active/inactive objects.
    #[must_use]
    pub fn hierarchy_text(&self, max_depth: usize) -> String {
        let mut text = String::new();
        for root in &self.roots {
            self.append_hierarchy(&mut text, *root, 0, max_depth);
        }
        text
    }

    fn append_hierarchy(&self, text: &mut String, id: ObjectId, indent: usize, max_depth: usize) {
        let Some(object) = self.get(id) else {
            return;
        };
        text.push_str(&" ".repeat(indent * 2));
        text.push_str(if object.active { "▶ " } else { "▷ " });
        text.push_str(&object.name);
        let components: Vec<&str> = object
            .components
            .iter()
            .map(String::as_str)
            .filter(|component| *component != TRANSFORM)
            .collect();
        if !components.is_empty() {
            text.push_str(" [");
            text.push_str(&components.join(", "));
            text.push(']');
        }
        text.push('\n');
        if indent < max_depth {
            for child in &object.children {
                self.append_hierarchy(text, *child, indent + 1, max_depth);
            }
        }
    }
}

/// Execution mode shared between the host thread and status readers.
#[derive(Debug, Clone, Default)]
pub struct SharedMode(Arc<AtomicU8>);

impl SharedMode {
    /// Current mode.
    #[must_use]
    pub fn get(&self) -> HostMode {
        match self.0.load(Ordering::SeqCst) {
            1 => HostMode::Play,
            2 => HostMode::Paused,
            _ => HostMode::Edit,
        }
    }

    /// Replaces the mode.
    pub fn set(&self, mode: HostMode) {
        let raw = match mode {
            HostMode::Edit => 0,
            HostMode::Play => 1,
            HostMode::Paused => 2,
        };
        self.0.store(raw, Ordering::SeqCst);
    }
}

/// Host state owned by the host loop.
#[derive(Debug)]
pub struct SceneWorld {
    /// The open scene.
    pub scene: Scene,
    /// Captured log lines.
    pub console: Console,
    project: String,
    mode: SharedMode,
    started: Instant,
}

impl SceneWorld {
    /// Host in edit mode with `scene` open.
    #[must_use]
    pub fn new(project: impl Into<String>, scene: Scene) -> Self {
        Self {
            scene,
            console: Console::default(),
            project: project.into(),
            mode: SharedMode::default(),
            started: Instant::now(),
        }
    }

    /// Project name reported by `/status`.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Current execution mode.
    #[must_use]
    pub fn mode(&self) -> HostMode {
        self.mode.get()
    }

    /// Switches the execution mode.
    pub fn set_mode(&mut self, mode: HostMode) {
        self.mode.set(mode);
    }

    /// Seconds since the host started.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Thread-safe status view reading the same mode cell.
    #[must_use]
    pub fn status(&self) -> SceneStatus {
        SceneStatus {
            project: self.project.clone(),
            mode: self.mode.clone(),
        }
    }
}

/// [`HostStatus`] for a [`SceneWorld`], safe to read from worker threads.
#[derive(Debug, Clone)]
pub struct SceneStatus {
    project: String,
    mode: SharedMode,
}

impl HostStatus for SceneStatus {
    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            host: "hostbridged".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            project: self.project.clone(),
            mode: self.mode.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn scene() -> Scene {
        let mut scene = Scene::new("Test");
        let player = scene.spawn("Player", None);
        let body = scene.spawn("Body", Some(player));
        scene.spawn("Hat", Some(body));
        scene.spawn("Enemy", None);
        scene
    }

    fn names(scene: &Scene) -> Vec<String> {
        scene
            .walk()
            .into_iter()
            .filter_map(|id| scene.get(id).map(|object| object.name.clone()))
            .collect()
    }

    #[rstest]
    fn walks_depth_first(scene: Scene) {
        assert_eq!(names(&scene), ["Player", "Body", "Hat", "Enemy"]);
    }

    #[rstest]
    fn destroy_removes_subtree(mut scene: Scene) {
        let body = scene.find_by_name("Body").expect("body exists");
        scene.destroy(body).expect("destroy body");
        assert_eq!(names(&scene), ["Player", "Enemy"]);
        assert_eq!(scene.len(), 2);
        assert!(scene.find_by_name("Hat").is_none());
    }

    #[rstest]
    fn reparenting_moves_objects(mut scene: Scene) {
        let hat = scene.find_by_name("Hat").expect("hat exists");
        let enemy = scene.find_by_name("Enemy").expect("enemy exists");
        scene.set_parent(hat, Some(enemy)).expect("reparent hat");
        assert_eq!(names(&scene), ["Player", "Body", "Enemy", "Hat"]);

        scene.set_parent(hat, None).expect("move hat to root");
        assert_eq!(scene.roots().len(), 3);
        assert_eq!(scene.get(hat).and_then(SceneObject::parent), None);
    }

    #[rstest]
    fn reparenting_under_a_descendant_is_rejected(mut scene: Scene) {
        let player = scene.find_by_name("Player").expect("player exists");
        let hat = scene.find_by_name("Hat").expect("hat exists");
        let error = scene.set_parent(player, Some(hat)).expect_err("cycle");
        assert!(matches!(error, SceneError::Cycle { .. }));
        let error = scene.set_parent(player, Some(player)).expect_err("self");
        assert!(matches!(error, SceneError::Cycle { .. }));
    }

    #[rstest]
    fn hierarchy_marks_inactive_objects_and_components(mut scene: Scene) {
        let body = scene.find_by_name("Body").expect("body exists");
        if let Some(object) = scene.get_mut(body) {
            object.active = false;
            object.components.push("MeshRenderer".to_owned());
        }
        assert_eq!(
            scene.hierarchy_text(1),
            "▶ Player\n  ▷ Body [MeshRenderer]\n▶ Enemy\n"
        );
    }

    #[rstest]
    #[case("cube", Primitive::Cube)]
    #[case("Sphere", Primitive::Sphere)]
    #[case("QUAD", Primitive::Quad)]
    #[case("teapot", Primitive::Cube)]
    fn primitive_names_fall_back_to_cube(#[case] name: &str, #[case] expected: Primitive) {
        assert_eq!(Primitive::parse_or_cube(name), expected);
    }

    #[test]
    fn status_tracks_world_mode() {
        let mut world = SceneWorld::new("demo", Scene::new("Main"));
        let status = world.status();
        assert_eq!(status.snapshot().mode, HostMode::Edit);
        world.set_mode(HostMode::Paused);
        assert_eq!(status.snapshot().mode, HostMode::Paused);
        assert_eq!(status.snapshot().project, "demo");
    }
}
