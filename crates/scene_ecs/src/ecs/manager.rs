//! Registry of entities and systems

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::components::{MeshComponent, MeshParams};
use super::{
    ComponentType, EcsError, Entity, EntityId, EntityRef, EntityRegistry, LifecycleFlags, Query,
    System, SystemHandle, SystemId, SystemKind, SystemType,
};
use crate::events::{listener, names, Event, EventArg, EventBus, Listener, PointerKind};
use crate::scene::{create_light, create_primitive_mesh, ModelLoader, SceneHandle};

/// Owner of every registered entity and system
///
/// Entities and systems draw their ids from one counter; the first issued id
/// is 1. Iteration follows registration order everywhere.
pub struct Manager {
    bus: Rc<EventBus>,
    entities: EntityRegistry,
    systems: RefCell<IndexMap<SystemType, SystemHandle>>,
    next_id: Cell<u64>,
    lifecycle: Cell<LifecycleFlags>,
    loader: RefCell<Option<Rc<dyn ModelLoader>>>,
    relays: RefCell<Vec<(&'static str, Listener)>>,
}

impl Manager {
    /// Create an empty manager broadcasting on `bus`
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            entities: EntityRegistry::new(),
            systems: RefCell::new(IndexMap::new()),
            next_id: Cell::new(0),
            lifecycle: Cell::new(LifecycleFlags::empty()),
            loader: RefCell::new(None),
            relays: RefCell::new(Vec::new()),
        }
    }

    /// Global event bus
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Shared entity registry
    pub fn registry(&self) -> &EntityRegistry {
        &self.entities
    }

    fn issue_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn broadcast_entity(&self, name: &str, id: EntityId) {
        self.bus
            .emit(&Event::new(name).with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id)));
    }

    fn broadcast_system(&self, name: &str, system_type: SystemType, id: Option<SystemId>) {
        let mut event =
            Event::new(name).with_arg(names::ARG_SYSTEM_TYPE, EventArg::SystemType(system_type));
        if let Some(id) = id {
            event = event.with_arg(names::ARG_SYSTEM_ID, EventArg::SystemId(id));
        }
        self.bus.emit(&event);
    }

    // systems

    /// Register a system, then run its `init()` and `start()`
    ///
    /// A second system of the same type is rejected.
    pub fn add_system<S: System>(&self, system: S) -> Result<SystemHandle, EcsError> {
        self.add_system_boxed(Box::new(system))
    }

    /// Register an already boxed system
    pub fn add_system_boxed(&self, system: Box<dyn System>) -> Result<SystemHandle, EcsError> {
        let system_type = system.system_type();
        if self.systems.borrow().contains_key(&system_type) {
            log::warn!("System '{}' already registered", system_type);
            return Err(EcsError::DuplicateSystem(system_type));
        }

        self.broadcast_system(names::SYSTEM_ADDING, system_type, None);

        let id = SystemId::new(self.issue_id());
        let handle = SystemHandle::new(id, system);
        self.systems.borrow_mut().insert(system_type, handle.clone());
        handle.init(self);
        handle.start(self);

        log::debug!("System '{}' registered with id {}", system_type, id);
        self.broadcast_system(names::SYSTEM_ADDED, system_type, Some(id));
        Ok(handle)
    }

    /// Get a system by type
    pub fn get_system(&self, system_type: SystemType) -> Option<SystemHandle> {
        self.systems.borrow().get(&system_type).cloned()
    }

    /// Get a system by its kind
    pub fn system<S: SystemKind>(&self) -> Option<SystemHandle> {
        self.get_system(S::TYPE)
    }

    /// Run `f` against a registered system of kind `S`
    ///
    /// Returns `None` when no such system is registered or it is already
    /// borrowed further up the stack.
    pub fn with_system<S, R, F>(&self, f: F) -> Option<R>
    where
        S: SystemKind,
        F: FnOnce(&mut S) -> R,
    {
        let handle = self.system::<S>()?;
        let mut system = handle.try_downcast_mut::<S>()?;
        Some(f(&mut system))
    }

    /// Registered systems in registration order
    pub fn systems(&self) -> Vec<SystemHandle> {
        self.systems.borrow().values().cloned().collect()
    }

    /// Unregister a system and run its `destroy()`
    pub fn remove_system(&self, system_type: SystemType) -> bool {
        let Some(handle) = self.get_system(system_type) else {
            return false;
        };

        self.broadcast_system(names::SYSTEM_REMOVING, system_type, Some(handle.id()));
        self.systems.borrow_mut().shift_remove(&system_type);
        handle.destroy(self);
        self.broadcast_system(names::SYSTEM_REMOVED, system_type, Some(handle.id()));
        true
    }

    // entities

    /// Create and register an entity around a scene object
    ///
    /// Without a scene object the entity gets an empty group node. The
    /// entity is initialised but not started.
    pub fn create_entity(&self, scene_object: Option<SceneHandle>) -> EntityRef {
        let entity = Rc::new(Entity::new(Rc::clone(&self.bus), scene_object));
        self.add_entity(entity)
    }

    /// Register an entity built on this manager's bus
    ///
    /// Registering an entity twice returns it unchanged.
    pub fn add_entity(&self, entity: EntityRef) -> EntityRef {
        if let Some(id) = entity.id() {
            if self.entities.contains(id) {
                log::warn!("Entity {} already registered", id);
                return entity;
            }
        }

        let id = EntityId::new(self.issue_id());
        entity.set_id(Some(id));
        self.broadcast_entity(names::ENTITY_ADDING, id);

        entity.init();
        self.entities.insert(Rc::clone(&entity));

        log::debug!("Entity {} added", id);
        self.broadcast_entity(names::ENTITY_ADDED, id);
        entity
    }

    /// Build the scene object described by `params`, then register an
    /// entity carrying a [`MeshComponent`]
    ///
    /// Models go through the installed [`ModelLoader`]; the entity does not
    /// exist until the load resolves.
    pub async fn create_entity_with_params(&self, params: MeshParams) -> Result<EntityRef, EcsError> {
        let scene_object = match &params {
            MeshParams::Light(light) => create_light(light),
            MeshParams::Primitive(primitive) => create_primitive_mesh(primitive),
            MeshParams::Model(model) => {
                let loader = self.loader.borrow().clone().ok_or(EcsError::LoaderMissing)?;
                let loaded = loader.load_model(&model.url).await.map_err(|e| {
                    log::error!("Failed to load model '{}': {}", model.url, e);
                    e
                })?;
                loaded.scene.set_animations(loaded.animations);
                loaded.scene
            }
        };

        let entity = self.create_entity(Some(scene_object));
        entity.add_component(MeshComponent::new(params));
        Ok(entity)
    }

    /// Install the loader used for model params
    pub fn set_loader(&self, loader: Rc<dyn ModelLoader>) {
        *self.loader.borrow_mut() = Some(loader);
    }

    /// Whether a model loader is installed
    pub fn has_loader(&self) -> bool {
        self.loader.borrow().is_some()
    }

    /// Activate a registered entity and start it
    ///
    /// References to entities that are no longer registered are ignored.
    pub fn activate_entity(&self, entity: &Entity) -> bool {
        let Some(entity) = entity.id().and_then(|id| self.entities.get(id)) else {
            log::debug!("Ignoring activation of unregistered entity");
            return false;
        };
        let Some(id) = entity.id() else {
            return false;
        };

        self.broadcast_entity(names::ENTITY_ACTIVATE, id);
        entity.set_active(true);
        entity.start();
        true
    }

    /// Destroy and unregister an entity
    pub fn remove_entity(&self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(id) else {
            return false;
        };

        self.broadcast_entity(names::ENTITY_REMOVING, id);
        entity.destroy();
        self.entities.remove(id);
        entity.set_id(None);

        log::debug!("Entity {} removed", id);
        self.broadcast_entity(names::ENTITY_REMOVED, id);
        true
    }

    /// Look up an entity
    pub fn get_entity_by_id(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.get(id)
    }

    /// Registered entities in registration order
    pub fn entities(&self) -> Vec<EntityRef> {
        self.entities.snapshot()
    }

    /// Number of registered entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entities matching a predicate
    pub fn filter_entities<P>(&self, mut predicate: P) -> Vec<EntityRef>
    where
        P: FnMut(&Entity) -> bool,
    {
        self.entities
            .snapshot()
            .into_iter()
            .filter(|entity| predicate(&**entity))
            .collect()
    }

    /// Entities holding every listed component type
    ///
    /// Uses the same predicate as [`Query::execute`].
    pub fn get_entities_by_component_type(&self, component_types: &[ComponentType]) -> Vec<EntityRef> {
        self.entities.matching(component_types)
    }

    /// Scene objects of interactive entities, the hit-test candidates
    pub fn scene_objects(&self) -> Vec<SceneHandle> {
        self.filter_entities(Entity::is_interactive)
            .iter()
            .map(|entity| entity.scene_object())
            .collect()
    }

    /// Create a cached query over this manager's entities
    pub fn query<I>(&self, component_types: I) -> Query
    where
        I: IntoIterator<Item = ComponentType>,
    {
        Query::with_filter(self.entities.clone(), Rc::clone(&self.bus), component_types)
    }

    // lifecycle

    /// Whether `init()` has run
    pub fn is_inited(&self) -> bool {
        self.lifecycle.get().contains(LifecycleFlags::INITED)
    }

    /// Whether `start()` has run
    pub fn is_started(&self) -> bool {
        self.lifecycle.get().contains(LifecycleFlags::STARTED)
    }

    fn enter(&self, flag: LifecycleFlags) -> bool {
        let mut lifecycle = self.lifecycle.get();
        let entered = lifecycle.enter(flag);
        self.lifecycle.set(lifecycle);
        entered
    }

    /// Install pointer relays and initialise systems, then entities
    pub fn init(&self) {
        if !self.enter(LifecycleFlags::INITED) {
            return;
        }
        self.install_pointer_relays();
        for system in self.systems() {
            system.init(self);
        }
        for entity in self.entities() {
            entity.init();
        }
    }

    /// Start systems, then entities
    pub fn start(&self) {
        if !self.enter(LifecycleFlags::STARTED) {
            return;
        }
        for system in self.systems() {
            system.start(self);
        }
        for entity in self.entities() {
            entity.start();
        }
    }

    /// Update systems that asked for per-frame calls, in registration order
    pub fn update(&self, delta: f32) {
        for system in self.systems() {
            system.update(self, delta);
        }
    }

    /// Pause systems, then entities
    pub fn pause(&self) {
        for system in self.systems() {
            system.pause(self);
        }
        for entity in self.entities() {
            entity.pause();
        }
    }

    /// Resume systems, then entities
    pub fn resume(&self) {
        for system in self.systems() {
            system.resume(self);
        }
        for entity in self.entities() {
            entity.resume();
        }
    }

    // re-emit `entity-<pointer>` on the target entity as `<pointer>`
    fn install_pointer_relays(&self) {
        let mut relays = self.relays.borrow_mut();
        for kind in PointerKind::ALL {
            let registry = self.entities.downgrade();
            let relay = listener(move |event: &Event| {
                let Some(entity) = event.entity_id().and_then(|id| registry.get(id)) else {
                    return;
                };
                let mut local = Event::new(kind.name());
                if let Some(id) = entity.id() {
                    local = local.with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id));
                }
                if let Some(pointer) = event.pointer() {
                    local = local.with_arg(names::ARG_POINTER, EventArg::Pointer(pointer));
                }
                entity.emit(&local);
            });
            self.bus.on(kind.relay_name(), &relay);
            relays.push((kind.relay_name(), relay));
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        for (name, relay) in self.relays.get_mut().drain(..) {
            self.bus.off(name, &relay);
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("entities", &self.entities)
            .field("systems", &self.systems.borrow().keys().collect::<Vec<_>>())
            .field("lifecycle", &self.lifecycle.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, ComponentKind};
    use crate::events::PointerEvent;
    use std::cell::RefCell;

    struct Mesh;
    impl Component for Mesh {
        fn component_type(&self) -> ComponentType {
            Self::TYPE
        }
    }
    impl ComponentKind for Mesh {
        const TYPE: ComponentType = ComponentType::new("Mesh");
    }

    struct Light;
    impl Component for Light {
        fn component_type(&self) -> ComponentType {
            Self::TYPE
        }
    }
    impl ComponentKind for Light {
        const TYPE: ComponentType = ComponentType::new("Light");
    }

    fn record(bus: &EventBus, name: &str) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(name, &listener(move |event: &Event| sink.borrow_mut().push(event.clone())));
        seen
    }

    fn manager() -> Manager {
        Manager::new(Rc::new(EventBus::new()))
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let manager = manager();
        let a = manager.create_entity(None);
        let b = manager.create_entity(None);
        assert_eq!(a.id(), Some(EntityId::new(1)));
        assert_eq!(b.id(), Some(EntityId::new(2)));
        assert!(a.is_inited());
        assert!(!a.is_started());
    }

    #[test]
    fn test_entity_events_carry_ids() {
        let manager = manager();
        let adding = record(manager.bus(), names::ENTITY_ADDING);
        let added = record(manager.bus(), names::ENTITY_ADDED);

        let entity = manager.create_entity(None);

        assert_eq!(adding.borrow().len(), 1);
        assert_eq!(added.borrow()[0].entity_id(), entity.id());
    }

    #[test]
    fn test_add_entity_twice_is_ignored() {
        let manager = manager();
        let entity = manager.create_entity(None);
        let again = manager.add_entity(Rc::clone(&entity));
        assert!(Rc::ptr_eq(&entity, &again));
        assert_eq!(manager.entity_count(), 1);
    }

    #[test]
    fn test_remove_entity_emits_removing_then_removed() {
        let manager = manager();
        let entity = manager.create_entity(None);
        let id = entity.id().unwrap();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in [names::ENTITY_REMOVING, names::ENTITY_REMOVED] {
            let order = Rc::clone(&order);
            manager.bus().on(
                name,
                &listener(move |event: &Event| order.borrow_mut().push(event.name().to_string())),
            );
        }

        assert!(manager.remove_entity(id));
        assert!(!manager.remove_entity(id));

        assert_eq!(*order.borrow(), vec![names::ENTITY_REMOVING, names::ENTITY_REMOVED]);
        assert!(entity.is_destroyed());
        assert_eq!(entity.id(), None);
        assert!(manager.get_entity_by_id(id).is_none());
    }

    #[test]
    fn test_activate_ignores_stale_reference() {
        let manager = manager();
        let entity = manager.create_entity(None);
        let activated = record(manager.bus(), names::ENTITY_ACTIVATE);

        assert!(manager.activate_entity(&entity));
        assert!(entity.is_active());
        assert!(entity.is_started());

        let id = entity.id().unwrap();
        manager.remove_entity(id);
        assert!(!manager.activate_entity(&entity));
        assert_eq!(activated.borrow().len(), 1);
    }

    #[test]
    fn test_component_filter_uses_and_policy() {
        let manager = manager();
        let both = manager.create_entity(None);
        both.add_component(Mesh);
        both.add_component(Light);
        manager.create_entity(None).add_component(Mesh);

        let found = manager.get_entities_by_component_type(&[Mesh::TYPE, Light::TYPE]);
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &both));
        assert_eq!(manager.get_entities_by_component_type(&[ComponentType::ANY]).len(), 2);
        assert!(manager.get_entities_by_component_type(&[]).is_empty());
    }

    #[test]
    fn test_scene_objects_skip_non_interactive() {
        let manager = manager();
        let visible = manager.create_entity(None);
        let hidden = manager.create_entity(None);
        hidden.set_interactive(false);

        let objects = manager.scene_objects();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].ptr_eq(&visible.scene_object()));
    }

    #[test]
    fn test_pointer_relay_reaches_entity() {
        let manager = manager();
        manager.init();
        let entity = manager.create_entity(None);
        let clicks = record(entity.events(), names::CLICK);

        let pointer = PointerEvent::new(PointerKind::Click, 1.0, 2.0, 0.0);
        manager.bus().emit(
            &Event::new(names::ENTITY_CLICK)
                .with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(entity.id().unwrap()))
                .with_arg(names::ARG_POINTER, EventArg::Pointer(pointer)),
        );

        assert_eq!(clicks.borrow().len(), 1);
        assert_eq!(clicks.borrow()[0].pointer(), Some(pointer));
    }

    #[test]
    fn test_init_installs_relays_once() {
        let manager = manager();
        manager.init();
        manager.init();
        assert_eq!(manager.bus().listener_count(names::ENTITY_CLICK), 1);
    }

    #[test]
    fn test_model_params_without_loader() {
        let manager = manager();
        let params = MeshParams::Model(crate::ecs::components::ModelParams::new("robot.ron"));
        let result = pollster::block_on(manager.create_entity_with_params(params));
        assert!(matches!(result, Err(EcsError::LoaderMissing)));
        assert_eq!(manager.entity_count(), 0);
    }
}
