//! Cross-module tests: entities, queries, systems and the manager together

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::{Component, ComponentKind, ComponentType, Manager, Query, System, SystemKind, SystemType};
use crate::events::{listener, Event, EventBus};

mod lifecycle;

pub(super) struct Mesh;

impl Component for Mesh {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }
}

impl ComponentKind for Mesh {
    const TYPE: ComponentType = ComponentType::new("Mesh");
}

pub(super) struct Light;

impl Component for Light {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }
}

impl ComponentKind for Light {
    const TYPE: ComponentType = ComponentType::new("Light");
}

/// System requiring `Mesh` that counts its hooks
pub(super) struct MeshSystem {
    query: Query,
    per_frame: bool,
    pub(super) inits: u32,
    pub(super) starts: u32,
    pub(super) updates: u32,
    pub(super) destroys: u32,
}

impl MeshSystem {
    pub(super) fn new(manager: &Manager, per_frame: bool) -> Self {
        Self {
            query: manager.query([Mesh::TYPE]),
            per_frame,
            inits: 0,
            starts: 0,
            updates: 0,
            destroys: 0,
        }
    }
}

impl System for MeshSystem {
    fn system_type(&self) -> SystemType {
        Self::TYPE
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn needs_update_calls(&self) -> bool {
        self.per_frame
    }

    fn init(&mut self, _manager: &Manager) {
        self.inits += 1;
    }

    fn start(&mut self, _manager: &Manager) {
        self.starts += 1;
    }

    fn update(&mut self, _manager: &Manager, _delta: f32) {
        self.updates += 1;
    }

    fn destroy(&mut self, _manager: &Manager) {
        self.destroys += 1;
    }
}

impl SystemKind for MeshSystem {
    const TYPE: SystemType = SystemType::new("MeshSystem");
}

pub(super) fn manager() -> Manager {
    Manager::new(Rc::new(EventBus::new()))
}

pub(super) fn record(bus: &EventBus, name: &str) -> Rc<RefCell<Vec<Event>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.on(name, &listener(move |event: &Event| sink.borrow_mut().push(event.clone())));
    seen
}
