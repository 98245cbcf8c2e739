//! Viewport system
//!
//! Bridges the entity registry and the renderer: activated entities join the
//! rendered scene, removed entities leave it, pointer samples are hit-tested
//! against interactive entities and relayed on the bus.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::ViewportSettings;
use crate::ecs::components::{AnimationComponent, MeshComponent};
use crate::ecs::{
    ComponentKind, EntityId, Manager, Query, System, SystemKind, SystemType, WeakRegistry,
};
use crate::events::{listener, names, Event, EventArg, EventBus, Listener, PointerEvent, PointerKind};
use crate::scene::{SceneHandle, SceneRenderer};

struct ViewportShared {
    renderer: RefCell<Box<dyn SceneRenderer>>,
    settings: ViewportSettings,
    should_render: Cell<bool>,
    last_move_ms: Cell<Option<f64>>,
    highlighted: Cell<Option<EntityId>>,
    selected: Cell<Option<EntityId>>,
    bus: Rc<EventBus>,
    registry: WeakRegistry,
}

impl ViewportShared {
    fn request_render(&self) {
        self.should_render.set(true);
    }

    fn attach(&self, id: EntityId) {
        let Some(entity) = self.registry.get(id) else {
            return;
        };
        if entity.is_on_scene() {
            return;
        }

        let node = entity.scene_object();
        {
            let Ok(mut renderer) = self.renderer.try_borrow_mut() else {
                log::warn!("Renderer busy, entity {} not attached", id);
                return;
            };
            if node.entity_id().is_none() {
                renderer.add(&node);
            }
        }
        node.tag_entity(Some(id));
        entity.set_on_scene(true);
        self.request_render();

        log::debug!("Entity {} on scene", id);
        self.bus.emit(
            &Event::new(names::ENTITY_ON_SCENE).with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id)),
        );
    }

    fn detach(&self, id: EntityId) {
        let Some(entity) = self.registry.get(id) else {
            return;
        };
        let node = entity.scene_object();
        if let Ok(mut renderer) = self.renderer.try_borrow_mut() {
            renderer.remove(&node);
        }
        node.tag_entity(None);
        entity.set_on_scene(false);

        if self.selected.get() == Some(id) {
            self.selected.set(None);
        }
        if self.highlighted.get() == Some(id) {
            self.highlighted.set(None);
        }
        self.request_render();
    }

    fn throttled(&self, pointer: &PointerEvent) -> bool {
        if pointer.kind != PointerKind::PointerMove {
            return false;
        }
        if let Some(last) = self.last_move_ms.get() {
            if pointer.timestamp_ms - last < self.settings.pointer_throttle_ms {
                return true;
            }
        }
        self.last_move_ms.set(Some(pointer.timestamp_ms));
        false
    }

    fn candidates(&self) -> Vec<SceneHandle> {
        self.registry
            .upgrade()
            .map(|registry| {
                registry
                    .snapshot()
                    .iter()
                    .filter(|entity| entity.is_interactive())
                    .map(|entity| entity.scene_object())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn handle_pointer(&self, pointer: &PointerEvent) -> Option<EntityId> {
        if self.throttled(pointer) {
            return None;
        }

        let candidates = self.candidates();
        let hit = {
            let renderer = self.renderer.try_borrow().ok()?;
            renderer.pick(&candidates, pointer.x, pointer.y)
        };
        let target = hit.and_then(|hit| hit.node.entity_id());

        if let Some(id) = target {
            self.bus.emit(
                &Event::new(pointer.kind.relay_name())
                    .with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id))
                    .with_arg(names::ARG_POINTER, EventArg::Pointer(*pointer)),
            );
        }

        match pointer.kind {
            PointerKind::Click if self.settings.use_transform_controls => {
                if self.selected.replace(target) != target {
                    self.request_render();
                }
            }
            PointerKind::PointerMove if self.settings.use_helper => {
                if self.highlighted.replace(target) != target {
                    self.request_render();
                }
            }
            _ => {}
        }

        let mut event =
            Event::new(names::VIEWPORT_POINTER).with_arg(names::ARG_POINTER, EventArg::Pointer(*pointer));
        if let Some(id) = target {
            event = event.with_arg(names::ARG_ENTITY_ID, EventArg::EntityId(id));
        }
        self.bus.emit(&event);

        target
    }
}

/// Cloneable access to the viewport from outside the frame loop
///
/// Input glue feeds pointer samples through the handle; tests reach the
/// renderer through [`ViewportHandle::renderer_as`].
#[derive(Clone)]
pub struct ViewportHandle(Rc<ViewportShared>);

impl ViewportHandle {
    /// Hit-test a pointer sample and relay the result
    ///
    /// Returns the entity under the pointer. Pointer moves arriving faster
    /// than the configured throttle are dropped.
    pub fn handle_pointer(&self, pointer: &PointerEvent) -> Option<EntityId> {
        self.0.handle_pointer(pointer)
    }

    /// Ask for a frame on the next update
    pub fn request_render(&self) {
        self.0.request_render();
    }

    /// Whether a frame is pending
    pub fn render_requested(&self) -> bool {
        self.0.should_render.get()
    }

    /// Resize the renderer surface
    pub fn resize(&self, width: u32, height: u32) {
        if let Ok(mut renderer) = self.0.renderer.try_borrow_mut() {
            renderer.resize(width, height);
        }
        self.0.request_render();
    }

    /// Settings the viewport was built with
    pub fn settings(&self) -> &ViewportSettings {
        &self.0.settings
    }

    /// Entity selected by the last click
    pub fn selected(&self) -> Option<EntityId> {
        self.0.selected.get()
    }

    /// Entity under the last processed pointer move
    pub fn highlighted(&self) -> Option<EntityId> {
        self.0.highlighted.get()
    }

    /// Borrow the renderer as its concrete type
    pub fn renderer_as<R: SceneRenderer>(&self) -> Option<Ref<'_, R>> {
        let renderer = self.0.renderer.try_borrow().ok()?;
        Ref::filter_map(renderer, |renderer| (**renderer).as_any().downcast_ref::<R>()).ok()
    }
}

impl fmt::Debug for ViewportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportHandle")
            .field("selected", &self.selected())
            .field("highlighted", &self.highlighted())
            .finish_non_exhaustive()
    }
}

/// Keeps the rendered scene in sync with the entity registry
pub struct ViewportSystem {
    query: Query,
    shared: Rc<ViewportShared>,
    listeners: Vec<(&'static str, Listener)>,
}

impl ViewportSystem {
    /// Build a viewport over `manager`'s entities drawing with `renderer`
    pub fn new(
        manager: &Manager,
        mut renderer: Box<dyn SceneRenderer>,
        settings: ViewportSettings,
    ) -> Self {
        renderer.configure(&settings);
        let shared = ViewportShared {
            renderer: RefCell::new(renderer),
            settings,
            should_render: Cell::new(true),
            last_move_ms: Cell::new(None),
            highlighted: Cell::new(None),
            selected: Cell::new(None),
            bus: Rc::clone(manager.bus()),
            registry: manager.registry().downgrade(),
        };
        Self {
            query: manager.query([MeshComponent::TYPE]),
            shared: Rc::new(shared),
            listeners: Vec::new(),
        }
    }

    /// Shared handle for input glue
    pub fn handle(&self) -> ViewportHandle {
        ViewportHandle(Rc::clone(&self.shared))
    }

    fn bind<F>(&mut self, manager: &Manager, name: &'static str, on_entity: F)
    where
        F: Fn(&ViewportShared, EntityId) + 'static,
    {
        let shared: Weak<ViewportShared> = Rc::downgrade(&self.shared);
        let callback = listener(move |event: &Event| {
            let (Some(shared), Some(id)) = (shared.upgrade(), event.entity_id()) else {
                return;
            };
            on_entity(&shared, id);
        });
        manager.bus().on(name, &callback);
        self.listeners.push((name, callback));
    }

    fn advance_animations(&self, delta: f32) {
        for entity in self.query.execute().iter() {
            if !entity.is_on_scene() {
                continue;
            }
            let Some(handle) = entity.component::<AnimationComponent>() else {
                continue;
            };
            let Some(mut animation) = handle.downcast_mut::<AnimationComponent>() else {
                continue;
            };
            if !animation.is_playing() {
                continue;
            }
            let Some(clip) = entity.scene_object().animation(animation.name()) else {
                log::warn!("Entity {:?}: no clip named '{}'", entity.id(), animation.name());
                animation.stop();
                continue;
            };
            animation.advance(delta, clip.duration);
            self.shared.request_render();
        }
    }
}

impl System for ViewportSystem {
    fn system_type(&self) -> SystemType {
        Self::TYPE
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn needs_update_calls(&self) -> bool {
        true
    }

    fn init(&mut self, manager: &Manager) {
        self.bind(manager, names::ENTITY_ACTIVATE, ViewportShared::attach);
        self.bind(manager, names::ENTITY_REMOVING, ViewportShared::detach);
    }

    fn update(&mut self, _manager: &Manager, delta: f32) {
        self.advance_animations(delta);

        let on_demand = self.shared.settings.use_render_on_demand;
        if !on_demand || self.shared.should_render.replace(false) {
            if let Ok(mut renderer) = self.shared.renderer.try_borrow_mut() {
                renderer.render(delta);
            }
        }
    }

    fn destroy(&mut self, manager: &Manager) {
        for (name, callback) in self.listeners.drain(..) {
            manager.bus().off(name, &callback);
        }
    }
}

impl SystemKind for ViewportSystem {
    const TYPE: SystemType = SystemType::new("ViewportSystem");
}
