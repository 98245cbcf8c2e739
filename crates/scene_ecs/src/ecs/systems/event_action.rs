//! Event-driven actions
//!
//! Entities carrying an [`ActionComponent`] get one action instance per
//! listed entry, bound to the entry's local event. Instances are built by
//! named factories so no state is shared between entities.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::ecs::components::{ActionComponent, ActionData};
use crate::ecs::{
    ComponentKind, Entity, EntityId, EntityRef, Manager, Query, System, SystemKind, SystemType,
    WeakRegistry,
};
use crate::events::{listener, names, Event, EventBus, Listener};
use crate::foundation::math::{Quat, Vec3};

/// Behavior run when an entity emits the bound event
pub trait Action {
    /// Run against the entity that emitted the event
    fn execute(&mut self, entity: &Entity);

    /// Release resources held outside the entity
    fn teardown(&mut self) {}
}

/// Builds a fresh action for one entity
pub type ActionFactory = Rc<dyn Fn(&EntityRef, &ActionData) -> Box<dyn Action>>;

/// Named action factories
#[derive(Clone, Default)]
pub struct ActionRegistry {
    factories: IndexMap<String, ActionFactory>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `rotateObject` and `toggleVisibility`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RotateObject::NAME, |entity, data| {
            Box::new(RotateObject::new(entity, data))
        });
        registry.register(ToggleVisibility::NAME, |_, _| Box::new(ToggleVisibility));
        registry
    }

    /// Register a factory, replacing any factory of the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&EntityRef, &ActionData) -> Box<dyn Action> + 'static,
    {
        self.factories.insert(name.into(), Rc::new(factory));
    }

    /// Look up a factory
    pub fn get(&self, name: &str) -> Option<ActionFactory> {
        self.factories.get(name).cloned()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Toggles a per-update rotation of the entity's scene object
///
/// Parameters `rotX`, `rotY`, `rotZ` give radians per engine update.
pub struct RotateObject {
    step: Quat,
    bus: Weak<EventBus>,
    rotating: Rc<Cell<bool>>,
    ticker: Option<Listener>,
}

impl RotateObject {
    /// Registered name
    pub const NAME: &'static str = "rotateObject";

    /// Build the action for `entity`
    pub fn new(entity: &EntityRef, data: &ActionData) -> Self {
        let step = Vec3::new(
            data.param_or("rotX", 0.005),
            data.param_or("rotY", 0.005),
            data.param_or("rotZ", 0.001),
        );
        Self {
            step: Quat::from_euler_angles(step.x, step.y, step.z),
            bus: Rc::downgrade(entity.bus()),
            rotating: Rc::new(Cell::new(false)),
            ticker: None,
        }
    }

    /// Whether the rotation is running
    pub fn is_rotating(&self) -> bool {
        self.rotating.get()
    }
}

impl Action for RotateObject {
    fn execute(&mut self, entity: &Entity) {
        self.rotating.set(!self.rotating.get());
        if self.ticker.is_some() {
            return;
        }

        let node = entity.scene_object();
        let rotating = Rc::clone(&self.rotating);
        let step = self.step;
        let ticker = listener(move |_| {
            if rotating.get() {
                node.transform_mut().rotate(step);
            }
        });
        entity.subscribe(names::ENGINE_UPDATE, &ticker);
        self.ticker = Some(ticker);
    }

    fn teardown(&mut self) {
        if let (Some(ticker), Some(bus)) = (self.ticker.take(), self.bus.upgrade()) {
            bus.off(names::ENGINE_UPDATE, &ticker);
        }
    }
}

/// Flips the visibility of the entity's scene object
#[derive(Debug, Default)]
pub struct ToggleVisibility;

impl ToggleVisibility {
    /// Registered name
    pub const NAME: &'static str = "toggleVisibility";
}

impl Action for ToggleVisibility {
    fn execute(&mut self, entity: &Entity) {
        let node = entity.scene_object();
        node.set_visible(!node.is_visible());
    }
}

struct Binding {
    event_name: String,
    callback: Listener,
    action: Rc<RefCell<Box<dyn Action>>>,
}

struct ActionState {
    registry: RefCell<ActionRegistry>,
    bindings: RefCell<HashMap<EntityId, Vec<Binding>>>,
    entities: WeakRegistry,
}

impl ActionState {
    fn build(&self, entity: &EntityRef) -> usize {
        let Some(id) = entity.id() else {
            return 0;
        };
        let Some(handle) = entity.component::<ActionComponent>() else {
            return 0;
        };
        let pending = handle
            .downcast_ref::<ActionComponent>()
            .map(|actions| actions.pending())
            .unwrap_or_default();

        let mut built = 0;
        for (index, data) in pending {
            let factory = self.registry.borrow().get(&data.action_name);
            let Some(factory) = factory else {
                log::warn!("Entity {}: unknown action '{}'", id, data.action_name);
                continue;
            };

            let action = Rc::new(RefCell::new(factory(entity, &data)));
            let target = Rc::downgrade(entity);
            let runner = Rc::clone(&action);
            let callback = listener(move |_| {
                if let Some(entity) = target.upgrade() {
                    runner.borrow_mut().execute(&entity);
                }
            });
            entity.on(&data.event_name, &callback);
            if let Some(mut actions) = handle.downcast_mut::<ActionComponent>() {
                actions.mark_bound(index);
            }
            self.bindings.borrow_mut().entry(id).or_default().push(Binding {
                event_name: data.event_name.clone(),
                callback: Rc::clone(&callback),
                action,
            });
            built += 1;

            log::debug!(
                "Entity {}: '{}' bound to '{}'",
                id,
                data.action_name,
                data.event_name
            );
            if data.event_name == names::START && entity.is_started() {
                callback(&Event::new(names::START));
            }
        }
        built
    }

    fn unbind(&self, id: EntityId) {
        let Some(bindings) = self.bindings.borrow_mut().remove(&id) else {
            return;
        };
        let entity = self.entities.get(id);
        for binding in bindings {
            if let Some(entity) = &entity {
                entity.off(&binding.event_name, &binding.callback);
            }
            binding.action.borrow_mut().teardown();
        }
    }

    fn bound_count(&self, id: EntityId) -> usize {
        self.bindings.borrow().get(&id).map_or(0, Vec::len)
    }
}

/// Binds [`ActionComponent`] entries to entity events
pub struct EventActionSystem {
    query: Query,
    state: Rc<ActionState>,
    listeners: Vec<(&'static str, Listener)>,
}

impl EventActionSystem {
    /// Create the system with the built-in actions
    pub fn new(manager: &Manager) -> Self {
        Self::with_registry(manager, ActionRegistry::with_builtins())
    }

    /// Create the system with a custom action registry
    pub fn with_registry(manager: &Manager, registry: ActionRegistry) -> Self {
        Self {
            query: manager.query([ActionComponent::TYPE]),
            state: Rc::new(ActionState {
                registry: RefCell::new(registry),
                bindings: RefCell::new(HashMap::new()),
                entities: manager.registry().downgrade(),
            }),
            listeners: Vec::new(),
        }
    }

    /// Register an action factory
    pub fn register_action<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&EntityRef, &ActionData) -> Box<dyn Action> + 'static,
    {
        self.state.registry.borrow_mut().register(name, factory);
    }

    /// Bind actions added to components after attachment
    ///
    /// Returns the number of newly bound actions.
    pub fn rebuild(&self) -> usize {
        self.query
            .execute()
            .iter()
            .map(|entity| self.state.build(entity))
            .sum()
    }

    /// Number of live bindings for an entity
    pub fn bound_count(&self, id: EntityId) -> usize {
        self.state.bound_count(id)
    }

    fn listen<F>(&mut self, manager: &Manager, name: &'static str, on_event: F)
    where
        F: Fn(&ActionState, &Event) + 'static,
    {
        let state: Weak<ActionState> = Rc::downgrade(&self.state);
        let callback = listener(move |event: &Event| {
            if let Some(state) = state.upgrade() {
                on_event(&state, event);
            }
        });
        manager.bus().on(name, &callback);
        self.listeners.push((name, callback));
    }
}

impl System for EventActionSystem {
    fn system_type(&self) -> SystemType {
        Self::TYPE
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn init(&mut self, manager: &Manager) {
        self.listen(manager, names::COMPONENT_ADDED, |state, event| {
            if event.component_type() != Some(ActionComponent::TYPE) {
                return;
            }
            let Some(entity) = event.entity_id().and_then(|id| state.entities.get(id)) else {
                return;
            };
            if let Some(id) = entity.id() {
                state.unbind(id);
            }
            state.build(&entity);
        });
        self.listen(manager, names::ENTITY_ADDED, |state, event| {
            let Some(entity) = event.entity_id().and_then(|id| state.entities.get(id)) else {
                return;
            };
            if entity.has_component_type(ActionComponent::TYPE) {
                state.build(&entity);
            }
        });
        self.listen(manager, names::COMPONENT_REMOVED, |state, event| {
            if event.component_type() != Some(ActionComponent::TYPE) {
                return;
            }
            if let Some(id) = event.entity_id() {
                state.unbind(id);
            }
        });
        self.listen(manager, names::ENTITY_REMOVING, |state, event| {
            if let Some(id) = event.entity_id() {
                state.unbind(id);
            }
        });
    }

    fn start(&mut self, _manager: &Manager) {
        self.rebuild();
    }

    fn destroy(&mut self, manager: &Manager) {
        for (name, callback) in self.listeners.drain(..) {
            manager.bus().off(name, &callback);
        }
        let ids: Vec<EntityId> = self.state.bindings.borrow().keys().copied().collect();
        for id in ids {
            self.state.unbind(id);
        }
    }
}

impl SystemKind for EventActionSystem {
    const TYPE: SystemType = SystemType::new("EventActionSystem");
}
