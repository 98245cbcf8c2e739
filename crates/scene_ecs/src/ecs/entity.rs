//! Entity implementation

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use super::{Component, ComponentHandle, ComponentId, ComponentKind, ComponentType, LifecycleFlags};
use crate::events::{names, Event, EventArg, EventBus, Listener};
use crate::scene::SceneHandle;

/// Entity identifier, issued by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw identifier
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared reference to a registered entity
pub type EntityRef = Rc<Entity>;

bitflags! {
    /// Scene-facing state toggled by the manager and the viewport
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityFlags: u8 {
        /// Activated through the manager
        const ACTIVE = 1 << 0;
        /// Scene object attached to the rendered scene
        const ON_SCENE = 1 << 1;
        /// Takes part in hit-testing
        const INTERACTIVE = 1 << 2;
    }
}

/// A node in the simulated world
///
/// Owns its components and one scene-graph handle. All operations take
/// `&self` so listeners reached during a broadcast can still query the entity.
pub struct Entity {
    id: Cell<Option<EntityId>>,
    lifecycle: Cell<LifecycleFlags>,
    flags: Cell<EntityFlags>,
    components: RefCell<IndexMap<ComponentType, ComponentHandle>>,
    scene_object: RefCell<SceneHandle>,
    events: EventBus,
    bus: Rc<EventBus>,
}

impl Entity {
    /// Create an unregistered entity around a scene object
    ///
    /// Without a scene object the entity gets an empty group node.
    pub fn new(bus: Rc<EventBus>, scene_object: Option<SceneHandle>) -> Self {
        Self {
            id: Cell::new(None),
            lifecycle: Cell::new(LifecycleFlags::empty()),
            flags: Cell::new(EntityFlags::INTERACTIVE),
            components: RefCell::new(IndexMap::new()),
            scene_object: RefCell::new(scene_object.unwrap_or_else(SceneHandle::group)),
            events: EventBus::new(),
            bus,
        }
    }

    /// Identifier, `None` while not registered
    pub fn id(&self) -> Option<EntityId> {
        self.id.get()
    }

    /// Whether the entity is registered with a manager
    pub fn is_registered(&self) -> bool {
        self.id.get().is_some()
    }

    pub(crate) fn set_id(&self, id: Option<EntityId>) {
        self.id.set(id);
        for component in self.components.borrow().values() {
            component.set_entity_id(id);
        }
    }

    // lifecycle flags

    /// Whether `init()` has run
    pub fn is_inited(&self) -> bool {
        self.lifecycle.get().contains(LifecycleFlags::INITED)
    }

    /// Whether `start()` has run
    pub fn is_started(&self) -> bool {
        self.lifecycle.get().contains(LifecycleFlags::STARTED)
    }

    /// Whether `destroy()` has run
    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.get().contains(LifecycleFlags::DESTROYED)
    }

    fn mark(&self, flag: LifecycleFlags) {
        let mut lifecycle = self.lifecycle.get();
        lifecycle.insert(flag);
        self.lifecycle.set(lifecycle);
    }

    // scene-facing flags

    /// Whether the entity was activated
    pub fn is_active(&self) -> bool {
        self.flags.get().contains(EntityFlags::ACTIVE)
    }

    /// Set the active flag
    pub fn set_active(&self, active: bool) {
        self.set_flag(EntityFlags::ACTIVE, active);
    }

    /// Whether the scene object is attached to the rendered scene
    pub fn is_on_scene(&self) -> bool {
        self.flags.get().contains(EntityFlags::ON_SCENE)
    }

    /// Set the on-scene flag
    pub fn set_on_scene(&self, on_scene: bool) {
        self.set_flag(EntityFlags::ON_SCENE, on_scene);
    }

    /// Whether the entity takes part in hit-testing
    pub fn is_interactive(&self) -> bool {
        self.flags.get().contains(EntityFlags::INTERACTIVE)
    }

    /// Set the interactive flag
    pub fn set_interactive(&self, interactive: bool) {
        self.set_flag(EntityFlags::INTERACTIVE, interactive);
    }

    fn set_flag(&self, flag: EntityFlags, value: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, value);
        self.flags.set(flags);
    }

    // scene object

    /// Scene-graph handle of this entity
    pub fn scene_object(&self) -> SceneHandle {
        self.scene_object.borrow().clone()
    }

    /// Replace the scene-graph handle
    pub fn set_scene_object(&self, scene_object: SceneHandle) {
        *self.scene_object.borrow_mut() = scene_object;
    }

    // components

    /// Attach a component, replacing any component of the same type
    pub fn add_component<C: Component>(&self, component: C) -> ComponentHandle {
        self.add_component_handle(ComponentHandle::new(component))
    }

    /// Attach an already wrapped component
    pub fn add_component_handle(&self, component: ComponentHandle) -> ComponentHandle {
        let component_type = component.component_type();
        let displaced = {
            let mut components = self.components.borrow_mut();
            let component_id = ComponentId::new(components.len());
            component.attach(component_id, self.id());
            components.insert(component_type, component.clone())
        };
        if let Some(displaced) = displaced {
            log::debug!(
                "Entity {:?}: component '{}' replaced",
                self.id(),
                component_type
            );
            self.unbind_behavior(&displaced);
        }

        component.init();

        let binding = component.borrow().behavior().map(|(name, l)| (name.to_string(), l));
        if let Some((event_name, listener)) = binding {
            self.events.on(&event_name, &listener);
        }

        self.broadcast(&self.component_event(names::COMPONENT_ADDED, &component));

        component
    }

    /// Get a component by type
    pub fn get_component(&self, component_type: ComponentType) -> Option<ComponentHandle> {
        self.components.borrow().get(&component_type).cloned()
    }

    /// Get a component by its kind
    pub fn component<C: ComponentKind>(&self) -> Option<ComponentHandle> {
        self.get_component(C::TYPE)
    }

    /// Detach and destroy a component
    ///
    /// Returns `false` without side effects when no component of that type
    /// is attached.
    pub fn remove_component(&self, component_type: ComponentType) -> bool {
        let removed = self.components.borrow_mut().shift_remove(&component_type);
        let Some(component) = removed else {
            return false;
        };

        self.broadcast(&self.component_event(names::COMPONENT_REMOVED, &component));
        self.unbind_behavior(&component);
        component.destroy();
        true
    }

    /// Whether a component of that type is attached
    pub fn has_component_type(&self, component_type: ComponentType) -> bool {
        self.components.borrow().contains_key(&component_type)
    }

    /// Attached component types in insertion order
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.components.borrow().keys().copied().collect()
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.borrow().len()
    }

    /// Components matching a predicate, in insertion order
    pub fn filter_components<P>(&self, mut predicate: P) -> Vec<ComponentHandle>
    where
        P: FnMut(&ComponentHandle) -> bool,
    {
        self.components_snapshot()
            .into_iter()
            .filter(|component| predicate(component))
            .collect()
    }

    fn components_snapshot(&self) -> Vec<ComponentHandle> {
        self.components.borrow().values().cloned().collect()
    }

    fn component_event(&self, name: &str, component: &ComponentHandle) -> Event {
        let mut event = Event::new(name)
            .with_arg(names::ARG_COMPONENT_ID, EventArg::ComponentId(component.id()))
            .with_arg(
                names::ARG_COMPONENT_TYPE,
                EventArg::ComponentType(component.component_type()),
            );
        if let Some(id) = self.id() {
            event = event.with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id));
        }
        event
    }

    fn unbind_behavior(&self, component: &ComponentHandle) {
        let binding = component.borrow().behavior().map(|(name, l)| (name.to_string(), l));
        if let Some((event_name, listener)) = binding {
            self.events.off(&event_name, &listener);
        }
    }

    // lifecycle

    /// Initialise every component once, then emit the local `init` event
    pub fn init(&self) {
        if self.is_inited() {
            return;
        }
        for component in self.components_snapshot() {
            component.init();
        }
        self.emit(&Event::new(names::INIT));
        self.mark(LifecycleFlags::INITED);
    }

    /// Start every component once, then emit the local `start` event
    pub fn start(&self) {
        if self.is_started() {
            return;
        }
        self.mark(LifecycleFlags::STARTED);
        for component in self.components_snapshot() {
            component.start();
        }
        self.emit(&Event::new(names::START));
    }

    /// Forward a frame update to every component
    pub fn update(&self, delta: f32) {
        for component in self.components_snapshot() {
            component.update(delta);
        }
        self.emit(
            &Event::new(names::UPDATE).with_arg(names::ARG_DELTA, EventArg::Seconds(delta)),
        );
    }

    /// Pause every component
    pub fn pause(&self) {
        for component in self.components_snapshot() {
            component.pause();
        }
        self.emit(&Event::new(names::PAUSE));
    }

    /// Resume every component
    pub fn resume(&self) {
        for component in self.components_snapshot() {
            component.resume();
        }
        self.emit(&Event::new(names::RESUME));
    }

    /// Destroy every component and drop local listeners
    ///
    /// Only the first call has any effect.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.mark(LifecycleFlags::DESTROYED);
        let components: Vec<ComponentHandle> =
            self.components.borrow_mut().drain(..).map(|(_, c)| c).collect();
        for component in components {
            component.destroy();
        }
        self.emit(&Event::new(names::DESTROY));
        self.events.clear();
    }

    // local events

    /// Subscribe to a local entity event
    pub fn on(&self, name: &str, listener: &Listener) {
        self.events.on(name, listener);
    }

    /// Unsubscribe from a local entity event
    pub fn off(&self, name: &str, listener: &Listener) {
        self.events.off(name, listener);
    }

    /// Subscribe to a local entity event for a single delivery
    pub fn once<F>(&self, name: &str, callback: F) -> Listener
    where
        F: Fn(&Event) + 'static,
    {
        self.events.once(name, callback)
    }

    /// Emit a local entity event
    pub fn emit(&self, event: &Event) -> usize {
        self.events.emit(event)
    }

    /// Local emitter of this entity
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // global events

    /// Broadcast on the global bus
    pub fn broadcast(&self, event: &Event) -> usize {
        self.bus.emit(event)
    }

    /// Subscribe on the global bus
    pub fn subscribe(&self, name: &str, listener: &Listener) {
        self.bus.on(name, listener);
    }

    /// Unsubscribe from the global bus
    pub fn unsubscribe(&self, name: &str, listener: &Listener) {
        self.bus.off(name, listener);
    }

    /// Global bus this entity broadcasts on
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id())
            .field("lifecycle", &self.lifecycle.get())
            .field("flags", &self.flags.get())
            .field("components", &self.component_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::listener;

    #[derive(Default)]
    struct Counter {
        inits: u32,
        starts: u32,
        destroys: u32,
    }

    impl Component for Counter {
        fn component_type(&self) -> ComponentType {
            Self::TYPE
        }
        fn init(&mut self) {
            self.inits += 1;
        }
        fn start(&mut self) {
            self.starts += 1;
        }
        fn destroy(&mut self) {
            self.destroys += 1;
        }
    }

    impl ComponentKind for Counter {
        const TYPE: ComponentType = ComponentType::new("Counter");
    }

    struct Tag(&'static str);

    impl Component for Tag {
        fn component_type(&self) -> ComponentType {
            ComponentType::new("Tag")
        }
    }

    fn record(bus: &EventBus, name: &str) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback = listener(move |event: &Event| sink.borrow_mut().push(event.clone()));
        bus.on(name, &callback);
        seen
    }

    fn new_entity() -> (Rc<EventBus>, Entity) {
        let bus = Rc::new(EventBus::new());
        let entity = Entity::new(Rc::clone(&bus), None);
        entity.set_id(Some(EntityId::new(1)));
        (bus, entity)
    }

    #[test]
    fn test_add_component_assigns_ids_and_broadcasts() {
        let (bus, entity) = new_entity();
        let added = record(&bus, names::COMPONENT_ADDED);

        let first = entity.add_component(Counter::default());
        let second = entity.add_component(Tag("a"));

        assert_eq!(first.id(), ComponentId::new(0));
        assert_eq!(second.id(), ComponentId::new(1));
        assert_eq!(first.entity_id(), Some(EntityId::new(1)));
        assert!(first.is_inited());

        let added = added.borrow();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].component_type(), Some(Counter::TYPE));
        assert_eq!(added[0].entity_id(), Some(EntityId::new(1)));
        assert_eq!(added[1].component_id(), Some(ComponentId::new(1)));
    }

    #[test]
    fn test_second_component_of_same_type_replaces_first() {
        let (_bus, entity) = new_entity();
        let _a = entity.add_component(Tag("a"));
        let b = entity.add_component(Tag("b"));

        let current = entity.get_component(ComponentType::new("Tag"));
        assert!(current.is_some_and(|c| c.ptr_eq(&b)));
        assert_eq!(entity.component_count(), 1);
        assert_eq!(
            entity
                .get_component(ComponentType::new("Tag"))
                .and_then(|c| c.downcast_ref::<Tag>().map(|t| t.0)),
            Some("b")
        );
    }

    #[test]
    fn test_remove_missing_component_has_no_side_effects() {
        let (bus, entity) = new_entity();
        let removed = record(&bus, names::COMPONENT_REMOVED);

        assert!(!entity.remove_component(Counter::TYPE));
        assert!(removed.borrow().is_empty());
    }

    #[test]
    fn test_remove_component_destroys_and_broadcasts() {
        let (bus, entity) = new_entity();
        let removed = record(&bus, names::COMPONENT_REMOVED);
        let handle = entity.add_component(Counter::default());

        assert!(entity.remove_component(Counter::TYPE));
        assert!(!entity.has_component_type(Counter::TYPE));
        assert_eq!(handle.downcast_ref::<Counter>().map(|c| c.destroys), Some(1));
        assert_eq!(removed.borrow().len(), 1);
        assert_eq!(removed.borrow()[0].component_type(), Some(Counter::TYPE));
    }

    #[test]
    fn test_init_and_start_are_idempotent() {
        let (_bus, entity) = new_entity();
        let inits = record(entity.events(), names::INIT);
        let starts = record(entity.events(), names::START);
        let handle = entity.add_component(Counter::default());

        entity.init();
        entity.init();
        entity.start();
        entity.start();

        assert_eq!(inits.borrow().len(), 1);
        assert_eq!(starts.borrow().len(), 1);
        let counter = handle.downcast_ref::<Counter>();
        assert_eq!(counter.as_ref().map(|c| c.inits), Some(1));
        assert_eq!(counter.as_ref().map(|c| c.starts), Some(1));
    }

    #[test]
    fn test_destroy_runs_once() {
        let (_bus, entity) = new_entity();
        let destroys = record(entity.events(), names::DESTROY);
        let handle = entity.add_component(Counter::default());

        entity.destroy();
        entity.destroy();

        assert!(entity.is_destroyed());
        assert_eq!(entity.component_count(), 0);
        assert_eq!(destroys.borrow().len(), 1);
        assert_eq!(handle.downcast_ref::<Counter>().map(|c| c.destroys), Some(1));
    }

    #[test]
    fn test_component_types_and_filter() {
        let (_bus, entity) = new_entity();
        entity.add_component(Counter::default());
        entity.add_component(Tag("x"));

        assert_eq!(
            entity.component_types(),
            vec![Counter::TYPE, ComponentType::new("Tag")]
        );
        let tags = entity.filter_components(|c| c.component_type().name() == "Tag");
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_unregistered_entity_components_pick_up_id() {
        let bus = Rc::new(EventBus::new());
        let entity = Entity::new(bus, None);
        let handle = entity.add_component(Tag("early"));
        assert_eq!(handle.entity_id(), None);

        entity.set_id(Some(EntityId::new(9)));
        assert_eq!(handle.entity_id(), Some(EntityId::new(9)));
    }

    #[test]
    fn test_flags_default() {
        let (_bus, entity) = new_entity();
        assert!(entity.is_interactive());
        assert!(!entity.is_active());
        assert!(!entity.is_on_scene());

        entity.set_on_scene(true);
        assert!(entity.is_on_scene());
    }
}
