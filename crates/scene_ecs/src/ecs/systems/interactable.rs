//! Hover, press and select tracking for interactable entities

use std::cell::Cell;
use std::rc::Rc;

use crate::ecs::components::InteractableComponent;
use crate::ecs::{
    ComponentKind, EntityId, Manager, Query, System, SystemKind, SystemType, WeakRegistry,
};
use crate::events::{listener, names, Event, Listener, PointerKind};

struct InteractState {
    registry: WeakRegistry,
    hovered: Cell<Option<EntityId>>,
    pressed: Cell<Option<EntityId>>,
    selected: Cell<Option<EntityId>>,
}

impl InteractState {
    fn update<F>(&self, id: Option<EntityId>, apply: F)
    where
        F: FnOnce(&mut InteractableComponent),
    {
        let Some(entity) = id.and_then(|id| self.registry.get(id)) else {
            return;
        };
        let Some(handle) = entity.component::<InteractableComponent>() else {
            return;
        };
        let Some(mut state) = handle.downcast_mut::<InteractableComponent>() else {
            return;
        };
        apply(&mut state);
    }

    fn is_interactable(&self, id: EntityId) -> bool {
        self.registry
            .get(id)
            .is_some_and(|entity| entity.has_component_type(InteractableComponent::TYPE))
    }

    fn hover(&self, target: Option<EntityId>) {
        let previous = self.hovered.get();
        if previous == target {
            return;
        }
        self.update(previous, |state| state.hovered = false);
        self.update(target, |state| state.hovered = true);
        self.hovered.set(target);
    }

    fn select(&self, target: EntityId) {
        let previous = self.selected.get();
        if previous == Some(target) {
            return;
        }
        self.update(previous, |state| state.selected = false);
        self.update(Some(target), |state| state.selected = true);
        self.selected.set(Some(target));
        log::debug!("Entity {} selected", target);
    }

    fn on_pointer(&self, event: &Event) {
        let Some(pointer) = event.pointer() else {
            return;
        };
        if pointer.kind == PointerKind::Click {
            return;
        }

        let target = event.entity_id().filter(|id| self.is_interactable(*id));
        self.hover(target);

        match pointer.kind {
            PointerKind::PointerDown => {
                self.pressed.set(target);
                self.update(target, |state| state.pressed = true);
            }
            PointerKind::PointerUp => {
                let pressed = self.pressed.take();
                self.update(pressed, |state| state.pressed = false);
                if let Some(id) = pressed.filter(|id| Some(*id) == target) {
                    self.select(id);
                }
            }
            _ => {}
        }
    }

    fn forget(&self, id: EntityId) {
        for slot in [&self.hovered, &self.pressed, &self.selected] {
            if slot.get() == Some(id) {
                slot.set(None);
            }
        }
    }
}

/// Tracks which interactable entity is hovered, pressed and selected
///
/// Listens to the viewport's pointer samples. A press followed by a release
/// over the same entity selects it and deselects the previous one.
pub struct InteractableSystem {
    query: Query,
    state: Rc<InteractState>,
    listeners: Vec<(&'static str, Listener)>,
}

impl InteractableSystem {
    /// Create the system over `manager`'s entities
    pub fn new(manager: &Manager) -> Self {
        Self {
            query: manager.query([InteractableComponent::TYPE]),
            state: Rc::new(InteractState {
                registry: manager.registry().downgrade(),
                hovered: Cell::new(None),
                pressed: Cell::new(None),
                selected: Cell::new(None),
            }),
            listeners: Vec::new(),
        }
    }

    /// Entity under the pointer
    pub fn hovered(&self) -> Option<EntityId> {
        self.state.hovered.get()
    }

    /// Entity pressed and not yet released
    pub fn pressed(&self) -> Option<EntityId> {
        self.state.pressed.get()
    }

    /// Last selected entity
    pub fn selected(&self) -> Option<EntityId> {
        self.state.selected.get()
    }
}

impl System for InteractableSystem {
    fn system_type(&self) -> SystemType {
        Self::TYPE
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn init(&mut self, manager: &Manager) {
        let state = Rc::downgrade(&self.state);
        let on_pointer = listener(move |event: &Event| {
            if let Some(state) = state.upgrade() {
                state.on_pointer(event);
            }
        });
        manager.bus().on(names::VIEWPORT_POINTER, &on_pointer);
        self.listeners.push((names::VIEWPORT_POINTER, on_pointer));

        let state = Rc::downgrade(&self.state);
        let on_removing = listener(move |event: &Event| {
            if let (Some(state), Some(id)) = (state.upgrade(), event.entity_id()) {
                state.forget(id);
            }
        });
        manager.bus().on(names::ENTITY_REMOVING, &on_removing);
        self.listeners.push((names::ENTITY_REMOVING, on_removing));
    }

    fn destroy(&mut self, manager: &Manager) {
        for (name, callback) in self.listeners.drain(..) {
            manager.bus().off(name, &callback);
        }
    }
}

impl SystemKind for InteractableSystem {
    const TYPE: SystemType = SystemType::new("InteractableSystem");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::EntityRef;
    use crate::events::{EventArg, EventBus, PointerEvent};

    fn setup() -> Manager {
        let manager = Manager::new(Rc::new(EventBus::new()));
        let system = InteractableSystem::new(&manager);
        manager.add_system(system).unwrap();
        manager
    }

    fn interactable(manager: &Manager) -> EntityRef {
        let entity = manager.create_entity(None);
        entity.add_component(InteractableComponent::new());
        entity
    }

    fn pointer(manager: &Manager, kind: PointerKind, target: Option<&EntityRef>) {
        let mut event = Event::new(names::VIEWPORT_POINTER).with_arg(
            names::ARG_POINTER,
            EventArg::Pointer(PointerEvent::new(kind, 0.0, 0.0, 0.0)),
        );
        if let Some(id) = target.and_then(|entity| entity.id()) {
            event = event.with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id));
        }
        manager.bus().emit(&event);
    }

    fn state(entity: &EntityRef) -> InteractableComponent {
        let handle = entity.component::<InteractableComponent>().unwrap();
        let state = *handle.downcast_ref::<InteractableComponent>().unwrap();
        state
    }

    fn selected(manager: &Manager) -> Option<EntityId> {
        manager.with_system::<InteractableSystem, _, _>(|system| system.selected()).flatten()
    }

    #[test]
    fn test_hover_moves_between_entities() {
        let manager = setup();
        let a = interactable(&manager);
        let b = interactable(&manager);

        pointer(&manager, PointerKind::PointerMove, Some(&a));
        assert!(state(&a).hovered);

        pointer(&manager, PointerKind::PointerMove, Some(&b));
        assert!(!state(&a).hovered);
        assert!(state(&b).hovered);

        pointer(&manager, PointerKind::PointerMove, None);
        assert!(!state(&b).hovered);
    }

    #[test]
    fn test_press_and_release_selects() {
        let manager = setup();
        let a = interactable(&manager);
        let b = interactable(&manager);

        pointer(&manager, PointerKind::PointerDown, Some(&a));
        assert!(state(&a).pressed);
        pointer(&manager, PointerKind::PointerUp, Some(&a));
        assert!(!state(&a).pressed);
        assert!(state(&a).selected);
        assert_eq!(selected(&manager), a.id());

        pointer(&manager, PointerKind::PointerDown, Some(&b));
        pointer(&manager, PointerKind::PointerUp, Some(&b));
        assert!(!state(&a).selected);
        assert!(state(&b).selected);
    }

    #[test]
    fn test_release_elsewhere_keeps_selection() {
        let manager = setup();
        let a = interactable(&manager);
        let b = interactable(&manager);

        pointer(&manager, PointerKind::PointerDown, Some(&a));
        pointer(&manager, PointerKind::PointerUp, Some(&b));
        assert!(!state(&a).selected);
        assert!(!state(&b).selected);
        assert_eq!(selected(&manager), None);
    }

    #[test]
    fn test_entities_without_component_are_ignored() {
        let manager = setup();
        let plain = manager.create_entity(None);

        pointer(&manager, PointerKind::PointerDown, Some(&plain));
        pointer(&manager, PointerKind::PointerUp, Some(&plain));
        assert_eq!(selected(&manager), None);
    }

    #[test]
    fn test_removed_entity_is_forgotten() {
        let manager = setup();
        let a = interactable(&manager);
        pointer(&manager, PointerKind::PointerDown, Some(&a));
        pointer(&manager, PointerKind::PointerUp, Some(&a));

        manager.remove_entity(a.id().unwrap());
        assert_eq!(selected(&manager), None);
    }
}
