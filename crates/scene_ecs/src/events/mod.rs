//! Event system shared by the whole runtime
//!
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Registration system (only notify interested listeners)
//! - Synchronous delivery, snapshot of listeners taken before dispatch
//! - A panicking listener never stops delivery to the remaining ones
//!
//! The same [`EventBus`] type backs the global bus handed to every entity,
//! system and query, and the local emitter each entity carries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::ecs::{ComponentId, ComponentType, EntityId, SystemId, SystemType};

pub mod names;

/// Callback invoked when an event is emitted.
///
/// Identity is the `Rc` allocation: registering a clone of the same listener
/// twice for one event name is a no-op.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Wrap a closure into a [`Listener`]
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&Event) + 'static,
{
    Rc::new(callback)
}

/// Kind of pointer interaction forwarded from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Press and release on the same target
    Click,
    /// Pointer button pressed
    PointerDown,
    /// Pointer button released
    PointerUp,
    /// Pointer moved
    PointerMove,
}

impl PointerKind {
    /// All pointer kinds relayed to entities
    pub const ALL: [PointerKind; 4] = [
        PointerKind::Click,
        PointerKind::PointerDown,
        PointerKind::PointerUp,
        PointerKind::PointerMove,
    ];

    /// Local event name emitted on the target entity
    pub fn name(self) -> &'static str {
        match self {
            PointerKind::Click => names::CLICK,
            PointerKind::PointerDown => names::POINTER_DOWN,
            PointerKind::PointerUp => names::POINTER_UP,
            PointerKind::PointerMove => names::POINTER_MOVE,
        }
    }

    /// Global event name broadcast when the pointer hits an entity
    pub fn relay_name(self) -> &'static str {
        match self {
            PointerKind::Click => names::ENTITY_CLICK,
            PointerKind::PointerDown => names::ENTITY_POINTER_DOWN,
            PointerKind::PointerUp => names::ENTITY_POINTER_UP,
            PointerKind::PointerMove => names::ENTITY_POINTER_MOVE,
        }
    }
}

/// Pointer sample in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Interaction kind
    pub kind: PointerKind,
    /// Horizontal position in pixels
    pub x: f32,
    /// Vertical position in pixels
    pub y: f32,
    /// Host timestamp in milliseconds
    pub timestamp_ms: f64,
}

impl PointerEvent {
    /// Create a pointer sample
    pub fn new(kind: PointerKind, x: f32, y: f32, timestamp_ms: f64) -> Self {
        Self { kind, x, y, timestamp_ms }
    }
}

/// Variant for type-safe event arguments
/// Uses key-value pairs to avoid order dependency problems
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Entity identifier
    EntityId(EntityId),
    /// Component identifier, unique within its entity
    ComponentId(ComponentId),
    /// Component kind tag
    ComponentType(ComponentType),
    /// System identifier
    SystemId(SystemId),
    /// System kind tag
    SystemType(SystemType),
    /// Duration in seconds
    Seconds(f32),
    /// Pointer sample
    Pointer(PointerEvent),
    /// Free-form text
    Text(String),
    /// Free-form number
    Number(f64),
    /// Free-form flag
    Flag(bool),
}

/// Event with a name and key-value arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create a new event with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: HashMap::new(),
        }
    }

    /// Add an argument to the event (builder pattern)
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get the `entityId` argument if present
    pub fn entity_id(&self) -> Option<EntityId> {
        match self.get_arg(names::ARG_ENTITY_ID) {
            Some(EventArg::EntityId(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get the `componentId` argument if present
    pub fn component_id(&self) -> Option<ComponentId> {
        match self.get_arg(names::ARG_COMPONENT_ID) {
            Some(EventArg::ComponentId(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get the `componentType` argument if present
    pub fn component_type(&self) -> Option<ComponentType> {
        match self.get_arg(names::ARG_COMPONENT_TYPE) {
            Some(EventArg::ComponentType(ty)) => Some(*ty),
            _ => None,
        }
    }

    /// Get the `systemId` argument if present
    pub fn system_id(&self) -> Option<SystemId> {
        match self.get_arg(names::ARG_SYSTEM_ID) {
            Some(EventArg::SystemId(id)) => Some(*id),
            _ => None,
        }
    }

    /// Get the `systemType` argument if present
    pub fn system_type(&self) -> Option<SystemType> {
        match self.get_arg(names::ARG_SYSTEM_TYPE) {
            Some(EventArg::SystemType(ty)) => Some(*ty),
            _ => None,
        }
    }

    /// Frame delta in seconds
    pub fn delta(&self) -> Option<f32> {
        match self.get_arg(names::ARG_DELTA) {
            Some(EventArg::Seconds(s)) => Some(*s),
            _ => None,
        }
    }

    /// Cumulative loop time in seconds
    pub fn elapsed(&self) -> Option<f32> {
        match self.get_arg(names::ARG_ELAPSED) {
            Some(EventArg::Seconds(s)) => Some(*s),
            _ => None,
        }
    }

    /// Pointer sample carried by relay events
    pub fn pointer(&self) -> Option<PointerEvent> {
        match self.get_arg(names::ARG_POINTER) {
            Some(EventArg::Pointer(p)) => Some(*p),
            _ => None,
        }
    }
}

#[derive(Clone)]
struct Registration {
    listener: Listener,
    once: bool,
}

/// Publish/subscribe hub with synchronous delivery
///
/// All methods take `&self`; registrations live behind a `RefCell` that is
/// never borrowed while a listener runs.
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<String, Vec<Registration>>>,
}

impl EventBus {
    /// Create a new empty event bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event name
    pub fn on(&self, name: &str, listener: &Listener) {
        self.register(name, listener, false);
    }

    /// Register a closure for a single delivery and return its handle
    ///
    /// The returned listener can be passed to [`EventBus::off`] to cancel it
    /// before it fires.
    pub fn once<F>(&self, name: &str, callback: F) -> Listener
    where
        F: Fn(&Event) + 'static,
    {
        let listener = listener(callback);
        self.register(name, &listener, true);
        listener
    }

    fn register(&self, name: &str, listener: &Listener, once: bool) {
        let mut handlers = self.handlers.borrow_mut();
        let registrations = handlers.entry(name.to_string()).or_default();
        if registrations
            .iter()
            .any(|r| Rc::ptr_eq(&r.listener, listener))
        {
            return;
        }
        registrations.push(Registration {
            listener: Rc::clone(listener),
            once,
        });
    }

    /// Remove a listener; unknown pairs are ignored
    pub fn off(&self, name: &str, listener: &Listener) {
        let mut handlers = self.handlers.borrow_mut();
        if let Some(registrations) = handlers.get_mut(name) {
            registrations.retain(|r| !Rc::ptr_eq(&r.listener, listener));
            if registrations.is_empty() {
                handlers.remove(name);
            }
        }
    }

    /// Deliver an event to every listener registered under its name
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &Event) -> usize {
        let snapshot = match self.handlers.borrow().get(event.name()) {
            Some(registrations) => registrations.clone(),
            None => return 0,
        };

        for registration in snapshot.iter().filter(|r| r.once) {
            self.off(event.name(), &registration.listener);
        }

        for registration in &snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (registration.listener)(event);
            }));
            if let Err(payload) = outcome {
                log::error!(
                    "Listener for '{}' panicked: {}",
                    event.name(),
                    panic_message(payload.as_ref())
                );
            }
        }

        snapshot.len()
    }

    /// Number of listeners registered under a name
    pub fn listener_count(&self, name: &str) -> usize {
        self.handlers.borrow().get(name).map_or(0, Vec::len)
    }

    /// Names with at least one listener
    pub fn event_names(&self) -> Vec<String> {
        self.handlers.borrow().keys().cloned().collect()
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.borrow();
        let mut map = f.debug_map();
        for (name, registrations) in handlers.iter() {
            map.entry(name, &registrations.len());
        }
        map.finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Listener) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let listener = listener(move |_| seen.set(seen.get() + 1));
        (count, listener)
    }

    #[test]
    fn test_same_listener_registered_once() {
        let bus = EventBus::new();
        let (count, callback) = counter();

        bus.on("X", &callback);
        bus.on("X", &callback);
        bus.emit(&Event::new("X"));

        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count("X"), 1);
    }

    #[test]
    fn test_off_removes_listener_and_empty_entry() {
        let bus = EventBus::new();
        let (count, callback) = counter();

        bus.on("X", &callback);
        bus.off("X", &callback);
        bus.off("X", &callback);
        bus.off("never-registered", &callback);

        assert_eq!(bus.emit(&Event::new("X")), 0);
        assert_eq!(count.get(), 0);
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        bus.once("ready", move |_| seen.set(seen.get() + 1));

        bus.emit(&Event::new("ready"));
        bus.emit(&Event::new("ready"));

        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count("ready"), 0);
    }

    #[test]
    fn test_once_can_be_cancelled() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        let handle = bus.once("ready", move |_| seen.set(seen.get() + 1));

        bus.off("ready", &handle);
        bus.emit(&Event::new("ready"));

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let bus = EventBus::new();
        let (count, callback) = counter();
        let faulty = listener(|_| panic!("listener failure"));

        bus.on("X", &faulty);
        bus.on("X", &callback);

        assert_eq!(bus.emit(&Event::new("X")), 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_may_mutate_bus_during_emit() {
        let bus = Rc::new(EventBus::new());
        let (count, callback) = counter();

        let inner_bus = Rc::clone(&bus);
        let inner_callback = Rc::clone(&callback);
        let registrar = listener(move |_| {
            inner_bus.on("X", &inner_callback);
            inner_bus.emit(&Event::new("Y"));
        });

        bus.on("X", &registrar);
        bus.emit(&Event::new("X"));
        // Newly registered listener only sees the next emission
        assert_eq!(count.get(), 0);

        bus.emit(&Event::new("X"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_typed_argument_getters() {
        let event = Event::new(names::COMPONENT_ADDED)
            .with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(EntityId::new(4)))
            .with_arg(names::ARG_COMPONENT_ID, EventArg::ComponentId(ComponentId::new(0)))
            .with_arg(
                names::ARG_COMPONENT_TYPE,
                EventArg::ComponentType(ComponentType::new("Mesh")),
            );

        assert_eq!(event.name(), names::COMPONENT_ADDED);
        assert_eq!(event.entity_id(), Some(EntityId::new(4)));
        assert_eq!(event.component_id(), Some(ComponentId::new(0)));
        assert_eq!(event.component_type(), Some(ComponentType::new("Mesh")));
        assert_eq!(event.delta(), None);
    }

    #[test]
    fn test_pointer_relay_names() {
        assert_eq!(PointerKind::Click.relay_name(), "entity-click");
        assert_eq!(PointerKind::PointerMove.name(), "pointermove");
    }
}
