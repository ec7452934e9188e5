//! Tool handlers exposing the simulated scene.

use std::str::FromStr;

use tracing::info;

use crate::codec::{Map, Value};
use crate::host::HostMode;
use crate::registry::{HandlerError, ToolRegistry};

use super::SCENE_TARGET;
use super::console::LogKind;
use super::world::{
    KNOWN_COMPONENTS, ObjectId, Primitive, SceneError, SceneObject, SceneWorld, TRANSFORM, Vec3,
    known_component,
};

/// Upper bound on objects returned by `gameobject.find`.
const MAX_FIND_RESULTS: usize = 100;

type ToolResult = Result<Value, HandlerError>;

/// Registers every scene tool on `registry`.
pub fn register_tools(registry: &mut ToolRegistry<SceneWorld>) {
    registry.register("scene.list", "List all scenes in build settings", scene_list);
    registry.register("scene.getActive", "Get active scene info", scene_get_active);
    registry.register("scene.getData", "Get scene hierarchy data", scene_get_data);
    registry.register(
        "gameobject.find",
        "Find GameObjects by name, tag, or component type",
        gameobject_find,
    );
    registry.register(
        "gameobject.create",
        "Create a new GameObject or primitive",
        gameobject_create,
    );
    registry.register("gameobject.destroy", "Destroy a GameObject", gameobject_destroy);
    registry.register(
        "gameobject.getData",
        "Get detailed GameObject data",
        gameobject_get_data,
    );
    registry.register(
        "gameobject.setActive",
        "Enable/disable a GameObject",
        gameobject_set_active,
    );
    registry.register(
        "gameobject.setParent",
        "Change GameObject parent",
        gameobject_set_parent,
    );
    registry.register("transform.setPosition", "Set position", |world, args| {
        update_transform(world, args, "position", |object| &mut object.position)
    });
    registry.register(
        "transform.setRotation",
        "Set rotation (Euler angles)",
        |world, args| update_transform(world, args, "rotation", |object| &mut object.rotation),
    );
    registry.register("transform.setScale", "Set local scale", |world, args| {
        update_transform(world, args, "scale", |object| &mut object.scale)
    });
    registry.register("component.add", "Add component to GameObject", component_add);
    registry.register(
        "component.remove",
        "Remove component from GameObject",
        component_remove,
    );
    registry.register("component.get", "Get component data/fields", component_get);
    registry.register("component.set", "Set component field value", component_set);
    registry.register(
        "component.list",
        "List available component types",
        component_list,
    );
    registry.register(
        "app.getState",
        "Get application state (mode, platform, time)",
        app_get_state,
    );
    registry.register("app.play", "Enter play mode", app_play);
    registry.register("app.pause", "Toggle pause", app_pause);
    registry.register("app.stop", "Exit play mode", app_stop);
    registry.register("debug.log", "Write to the host console", debug_log);
    registry.register("debug.hierarchy", "Get text hierarchy view", debug_hierarchy);
    registry.register(
        "console.getLogs",
        "Get console logs with optional type filter",
        console_get_logs,
    );
    registry.register("console.clear", "Clear captured logs", console_clear);
}

fn optional_str<'a>(args: &'a Map, key: &str) -> Option<&'a str> {
    args.get_str(key).filter(|text| !text.is_empty())
}

fn required_str<'a>(args: &'a Map, key: &str) -> Result<&'a str, HandlerError> {
    optional_str(args, key).ok_or_else(|| HandlerError::missing_argument(key))
}

fn count_arg(args: &Map, key: &str, default: usize) -> usize {
    args.get_i64(key)
        .map_or(default, |value| usize::try_from(value).unwrap_or(0))
}

fn find_object(world: &SceneWorld, name: &str) -> Result<ObjectId, HandlerError> {
    world
        .scene
        .find_by_name(name)
        .ok_or_else(|| HandlerError::not_found("GameObject", name))
}

fn object_mut<'a>(
    world: &'a mut SceneWorld,
    id: ObjectId,
    name: &str,
) -> Result<&'a mut SceneObject, HandlerError> {
    world
        .scene
        .get_mut(id)
        .ok_or_else(|| HandlerError::not_found("GameObject", name))
}

fn scene_error(error: SceneError, name: &str) -> HandlerError {
    match error {
        SceneError::Missing => HandlerError::not_found("GameObject", name),
        SceneError::Cycle { .. } => HandlerError::invalid(error),
    }
}

fn succeeded() -> Map {
    Map::new().with("success", true)
}

fn scene_list(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    let scene = &world.scene;
    let entry = Map::new()
        .with("index", 0)
        .with("path", scene.path())
        .with("name", scene.name());
    Ok(Value::from(vec![Value::from(entry)]))
}

fn scene_get_active(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    let scene = &world.scene;
    Ok(Value::from(
        Map::new()
            .with("name", scene.name())
            .with("path", scene.path())
            .with("buildIndex", 0)
            .with("isLoaded", true)
            .with("rootCount", scene.roots().len()),
    ))
}

fn scene_get_data(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let depth = count_arg(args, "depth", 2);
    let scene = &world.scene;
    let roots: Vec<Value> = scene
        .roots()
        .iter()
        .map(|root| scene.object_value(*root, depth))
        .collect();
    Ok(Value::from(
        Map::new()
            .with("name", scene.name())
            .with("rootObjects", roots),
    ))
}

fn gameobject_find(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let scene = &world.scene;
    let matches: Vec<ObjectId> = if let Some(name) = optional_str(args, "name") {
        scene.find_by_name(name).into_iter().collect()
    } else if let Some(tag) = optional_str(args, "tag") {
        scene
            .walk()
            .into_iter()
            .filter(|id| scene.get(*id).is_some_and(|object| object.tag == tag))
            .collect()
    } else if let Some(kind) = optional_str(args, "type") {
        match known_component(kind) {
            Some(component) => scene
                .walk()
                .into_iter()
                .filter(|id| {
                    scene
                        .get(*id)
                        .is_some_and(|object| object.has_component(component))
                })
                .collect(),
            None => Vec::new(),
        }
    } else {
        scene.walk()
    };

    let depth = count_arg(args, "depth", 1);
    Ok(Value::from(
        matches
            .into_iter()
            .take(MAX_FIND_RESULTS)
            .map(|id| scene.object_value(id, depth))
            .collect::<Vec<_>>(),
    ))
}

fn gameobject_create(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let name = optional_str(args, "name").unwrap_or("New GameObject");
    let id = world.scene.spawn(name, None);
    let object = object_mut(world, id, name)?;
    if let Some(primitive) = optional_str(args, "primitive") {
        object.components.extend(
            Primitive::parse_or_cube(primitive)
                .components()
                .map(str::to_owned),
        );
    }
    if args.contains_key("position") {
        object.position = args
            .get_map("position")
            .map_or(Vec3::ZERO, |position| Vec3::ZERO.merged(position));
    }
    Ok(world.scene.object_value(id, 1))
}

fn gameobject_destroy(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let name = required_str(args, "name")?;
    let id = find_object(world, name)?;
    world
        .scene
        .destroy(id)
        .map_err(|error| scene_error(error, name))?;
    Ok(Value::from(succeeded().with("destroyed", name)))
}

fn gameobject_get_data(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let name = required_str(args, "name")?;
    let id = find_object(world, name)?;
    Ok(world.scene.object_value(id, count_arg(args, "depth", 3)))
}

fn gameobject_set_active(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let name = required_str(args, "name")?;
    let active = args.get_bool("active").unwrap_or(true);
    let id = find_object(world, name)?;
    object_mut(world, id, name)?.active = active;
    Ok(Value::from(
        succeeded().with("name", name).with("active", active),
    ))
}

fn gameobject_set_parent(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let child_name = required_str(args, "child")?;
    let child = find_object(world, child_name)?;
    let parent = match optional_str(args, "parent") {
        Some(parent_name) => Some(find_object(world, parent_name)?),
        None => None,
    };
    world
        .scene
        .set_parent(child, parent)
        .map_err(|error| scene_error(error, child_name))?;
    Ok(Value::from(succeeded()))
}

fn update_transform(
    world: &mut SceneWorld,
    args: &Map,
    key: &str,
    field: fn(&mut SceneObject) -> &mut Vec3,
) -> ToolResult {
    let name = required_str(args, "name")?;
    let id = find_object(world, name)?;
    let vector = field(object_mut(world, id, name)?);
    *vector = vector.merged(args);
    let updated = *vector;
    Ok(Value::from(succeeded().with(key, updated)))
}

fn component_target<'a>(
    world: &'a mut SceneWorld,
    args: &'a Map,
) -> Result<(&'a mut SceneObject, &'a str, &'static str), HandlerError> {
    let object_name = required_str(args, "gameObject")?;
    let type_name = required_str(args, "type")?;
    let id = find_object(world, object_name)?;
    let component =
        known_component(type_name).ok_or_else(|| HandlerError::not_found("Type", type_name))?;
    let object = object_mut(world, id, object_name)?;
    Ok((object, object_name, component))
}

fn component_add(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let (object, object_name, component) = component_target(world, args)?;
    if component == TRANSFORM {
        return Err(HandlerError::new(format!(
            "GameObject '{object_name}' already has a {TRANSFORM}"
        )));
    }
    object.components.push(component.to_owned());
    Ok(Value::from(succeeded().with("component", component)))
}

fn component_remove(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let (object, object_name, component) = component_target(world, args)?;
    if component == TRANSFORM {
        return Err(HandlerError::new(format!("{TRANSFORM} cannot be removed")));
    }
    let position = object
        .components
        .iter()
        .position(|candidate| candidate == component)
        .ok_or_else(|| {
            HandlerError::new(format!(
                "Component '{component}' not found on '{object_name}'"
            ))
        })?;
    object.components.remove(position);
    Ok(Value::from(succeeded()))
}

fn attached_component<'a>(
    world: &'a mut SceneWorld,
    args: &'a Map,
) -> Result<(&'a mut SceneObject, &'a str, &'static str), HandlerError> {
    let (object, object_name, component) = component_target(world, args)?;
    if !object.has_component(component) {
        return Err(HandlerError::new(format!(
            "Component '{component}' not found on '{object_name}'"
        )));
    }
    Ok((object, object_name, component))
}

fn component_get(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let (object, object_name, component) = attached_component(world, args)?;
    let mut data = Map::new()
        .with("type", component)
        .with("gameObject", object_name)
        .with("tag", object.tag.as_str())
        .with("layer", object.layer.as_str())
        .with("active", object.active);
    if component == TRANSFORM {
        data.insert("position", object.position);
        data.insert("rotation", object.rotation);
        data.insert("scale", object.scale);
    }
    Ok(Value::from(data))
}

fn component_set(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let field = required_str(args, "field")?;
    let value = args
        .get("value")
        .ok_or_else(|| HandlerError::missing_argument("value"))?;
    let (object, _, component) = attached_component(world, args)?;
    let invalid = || HandlerError::new(format!("Invalid value for '{field}'"));
    let updated = match field {
        "tag" => {
            object.tag = value.as_str().ok_or_else(invalid)?.to_owned();
            Value::from(object.tag.as_str())
        }
        "layer" => {
            object.layer = value.as_str().ok_or_else(invalid)?.to_owned();
            Value::from(object.layer.as_str())
        }
        "active" => {
            object.active = value.as_bool().ok_or_else(invalid)?;
            Value::from(object.active)
        }
        "position" | "rotation" | "scale" if component == TRANSFORM => {
            let axes = value.as_map().ok_or_else(invalid)?;
            let vector = match field {
                "position" => &mut object.position,
                "rotation" => &mut object.rotation,
                _ => &mut object.scale,
            };
            *vector = vector.merged(axes);
            Value::from(*vector)
        }
        _ => {
            return Err(HandlerError::new(format!(
                "Field/Property '{field}' not found or not writable"
            )));
        }
    };
    Ok(Value::from(
        succeeded().with("field", field).with("value", updated),
    ))
}

fn component_list(_world: &mut SceneWorld, args: &Map) -> ToolResult {
    let needle = args.get_str("prefix").unwrap_or_default().to_lowercase();
    Ok(Value::from(
        KNOWN_COMPONENTS
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .map(|name| Value::from(*name))
            .collect::<Vec<_>>(),
    ))
}

fn app_get_state(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    let mode = world.mode();
    Ok(Value::from(
        Map::new()
            .with("isPlaying", mode != HostMode::Edit)
            .with("isPaused", mode == HostMode::Paused)
            .with("platform", std::env::consts::OS)
            .with("version", env!("CARGO_PKG_VERSION"))
            .with("productName", world.project())
            .with("time", world.elapsed_secs()),
    ))
}

fn app_play(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    world.set_mode(HostMode::Play);
    info!(target: SCENE_TARGET, "entered play mode");
    Ok(Value::from(succeeded()))
}

fn app_pause(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    let next = match world.mode() {
        HostMode::Edit => return Err(HandlerError::new("Can only pause in play mode")),
        HostMode::Play => HostMode::Paused,
        HostMode::Paused => HostMode::Play,
    };
    world.set_mode(next);
    Ok(Value::from(
        succeeded().with("isPaused", next == HostMode::Paused),
    ))
}

fn app_stop(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    world.set_mode(HostMode::Edit);
    info!(target: SCENE_TARGET, "exited play mode");
    Ok(Value::from(succeeded()))
}

fn debug_log(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let message = args.get_str("message").unwrap_or_default();
    let kind = match args.get_str("level").map(str::to_ascii_lowercase).as_deref() {
        Some("warning") => LogKind::Warning,
        Some("error") => LogKind::Error,
        _ => LogKind::Log,
    };
    let time = world.elapsed_secs();
    world.console.push(kind, message, time);
    info!(target: SCENE_TARGET, %kind, text = message, "console message");
    Ok(Value::from(succeeded()))
}

fn debug_hierarchy(world: &mut SceneWorld, args: &Map) -> ToolResult {
    Ok(Value::from(
        world.scene.hierarchy_text(count_arg(args, "depth", 3)),
    ))
}

fn console_get_logs(world: &mut SceneWorld, args: &Map) -> ToolResult {
    let count = count_arg(args, "count", 100);
    let kind = optional_str(args, "type").and_then(|kind| LogKind::from_str(kind).ok());
    Ok(world.console.recent_value(count, kind))
}

fn console_clear(world: &mut SceneWorld, _args: &Map) -> ToolResult {
    world.console.clear();
    Ok(Value::from(succeeded()))
}
