//! Well-known event names and argument keys

/// A component was attached to an entity
pub const COMPONENT_ADDED: &str = "new-component-added";
/// A component was detached from an entity
pub const COMPONENT_REMOVED: &str = "component-removed";

/// An entity is about to be registered
pub const ENTITY_ADDING: &str = "adding-entity";
/// An entity was registered
pub const ENTITY_ADDED: &str = "added-entity";
/// An entity was activated
pub const ENTITY_ACTIVATE: &str = "activate-entity";
/// An entity's scene object was attached to the rendered scene
pub const ENTITY_ON_SCENE: &str = "entity-on-scene";
/// An entity is about to be removed
pub const ENTITY_REMOVING: &str = "removing-entity";
/// An entity was removed
pub const ENTITY_REMOVED: &str = "removed-entity";

/// A system is about to be registered
pub const SYSTEM_ADDING: &str = "system-adding";
/// A system was registered and started
pub const SYSTEM_ADDED: &str = "system-added";
/// A system is about to be removed
pub const SYSTEM_REMOVING: &str = "system-removing";
/// A system was removed
pub const SYSTEM_REMOVED: &str = "system-removed";

/// The engine finished initialisation
pub const ENGINE_INITED: &str = "engine-inited";
/// The engine frame loop started
pub const ENGINE_STARTED: &str = "engine-started";
/// One frame was processed
pub const ENGINE_UPDATE: &str = "engine-update";

/// Pointer click on an entity (global relay)
pub const ENTITY_CLICK: &str = "entity-click";
/// Pointer down on an entity (global relay)
pub const ENTITY_POINTER_DOWN: &str = "entity-pointerdown";
/// Pointer up on an entity (global relay)
pub const ENTITY_POINTER_UP: &str = "entity-pointerup";
/// Pointer move over an entity (global relay)
pub const ENTITY_POINTER_MOVE: &str = "entity-pointermove";
/// Pointer sample processed by the viewport, hit or miss
pub const VIEWPORT_POINTER: &str = "viewport-pointer";

/// Local entity event: click
pub const CLICK: &str = "click";
/// Local entity event: pointer down
pub const POINTER_DOWN: &str = "pointerdown";
/// Local entity event: pointer up
pub const POINTER_UP: &str = "pointerup";
/// Local entity event: pointer move
pub const POINTER_MOVE: &str = "pointermove";

/// Local lifecycle event: init
pub const INIT: &str = "init";
/// Local lifecycle event: start
pub const START: &str = "start";
/// Local lifecycle event: update
pub const UPDATE: &str = "update";
/// Local lifecycle event: pause
pub const PAUSE: &str = "pause";
/// Local lifecycle event: resume
pub const RESUME: &str = "resume";
/// Local lifecycle event: destroy
pub const DESTROY: &str = "destroy";

/// Argument key: entity id
pub const ARG_ENTITY_ID: &str = "entityId";
/// Argument key: component id
pub const ARG_COMPONENT_ID: &str = "componentId";
/// Argument key: component type
pub const ARG_COMPONENT_TYPE: &str = "componentType";
/// Argument key: system id
pub const ARG_SYSTEM_ID: &str = "systemId";
/// Argument key: system type
pub const ARG_SYSTEM_TYPE: &str = "systemType";
/// Argument key: frame delta in seconds
pub const ARG_DELTA: &str = "delta";
/// Argument key: cumulative loop time in seconds
pub const ARG_ELAPSED: &str = "elapsed";
/// Argument key: pointer sample
pub const ARG_POINTER: &str = "pointer";
