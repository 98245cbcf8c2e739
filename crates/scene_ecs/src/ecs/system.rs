//! System trait and registered system handles

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::{AsAny, LifecycleFlags, Manager, Query, QueryResults};

/// Stable tag identifying a system kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemType(&'static str);

impl SystemType {
    /// Create a tag from a static name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// System identifier, drawn from the manager's shared counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    /// Wrap a raw identifier
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stateful processor bound to a component-type filter
///
/// The filter lives in the system's [`Query`], fixed at construction. Every
/// hook receives the manager so systems can reach entities without holding a
/// reference chain.
pub trait System: AsAny {
    /// Kind tag; at most one system per tag is registered
    fn system_type(&self) -> SystemType;

    /// Query scoped to the system's required component types
    fn query(&self) -> &Query;

    /// Whether the frame loop should call [`System::update`]
    fn needs_update_calls(&self) -> bool {
        false
    }

    /// Called once after registration
    fn init(&mut self, _manager: &Manager) {}

    /// Called once after `init`
    fn start(&mut self, _manager: &Manager) {}

    /// Called each frame when [`System::needs_update_calls`] is true
    fn update(&mut self, _manager: &Manager, _delta: f32) {}

    /// Called when the manager pauses
    fn pause(&mut self, _manager: &Manager) {}

    /// Called when the manager resumes
    fn resume(&mut self, _manager: &Manager) {}

    /// Called once when the system is removed
    fn destroy(&mut self, _manager: &Manager) {}
}

/// System kinds with a compile-time tag, for typed lookups
pub trait SystemKind: System {
    /// Tag shared by every instance of the kind
    const TYPE: SystemType;
}

struct SystemCell {
    id: SystemId,
    system_type: SystemType,
    flags: Cell<LifecycleFlags>,
    inner: RefCell<Box<dyn System>>,
}

/// Shared handle to a registered system
#[derive(Clone)]
pub struct SystemHandle(Rc<SystemCell>);

impl SystemHandle {
    pub(crate) fn new(id: SystemId, system: Box<dyn System>) -> Self {
        let system_type = system.system_type();
        Self(Rc::new(SystemCell {
            id,
            system_type,
            flags: Cell::new(LifecycleFlags::empty()),
            inner: RefCell::new(system),
        }))
    }

    /// Identifier assigned on registration
    pub fn id(&self) -> SystemId {
        self.0.id
    }

    /// Kind tag
    pub fn system_type(&self) -> SystemType {
        self.0.system_type
    }

    /// Whether `init()` has run
    pub fn is_inited(&self) -> bool {
        self.0.flags.get().contains(LifecycleFlags::INITED)
    }

    /// Whether `start()` has run
    pub fn is_started(&self) -> bool {
        self.0.flags.get().contains(LifecycleFlags::STARTED)
    }

    /// Whether the system wants per-frame updates
    pub fn needs_update_calls(&self) -> bool {
        self.0.inner.borrow().needs_update_calls()
    }

    /// Entities currently matched by the system's query
    pub fn entities(&self) -> QueryResults {
        self.0.inner.borrow().query().execute()
    }

    /// Borrow the system as a trait object
    pub fn borrow(&self) -> Ref<'_, dyn System> {
        Ref::map(self.0.inner.borrow(), |system| &**system)
    }

    /// Mutably borrow the system as a trait object
    pub fn borrow_mut(&self) -> RefMut<'_, dyn System> {
        RefMut::map(self.0.inner.borrow_mut(), |system| &mut **system)
    }

    /// Borrow the system as its concrete kind
    pub fn downcast_ref<T: System>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.inner.borrow(), |system| {
            (**system).as_any().downcast_ref::<T>()
        })
        .ok()
    }

    /// Mutably borrow the system as its concrete kind
    pub fn downcast_mut<T: System>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.inner.borrow_mut(), |system| {
            (**system).as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// Like [`SystemHandle::downcast_mut`], but `None` while the system is
    /// already borrowed
    pub fn try_downcast_mut<T: System>(&self) -> Option<RefMut<'_, T>> {
        let system = self.0.inner.try_borrow_mut().ok()?;
        RefMut::filter_map(system, |system| (**system).as_any_mut().downcast_mut::<T>()).ok()
    }

    /// Whether two handles refer to the same system
    pub fn ptr_eq(&self, other: &SystemHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn init(&self, manager: &Manager) {
        if self.transition(LifecycleFlags::INITED) {
            self.0.inner.borrow_mut().init(manager);
        }
    }

    pub(crate) fn start(&self, manager: &Manager) {
        if self.transition(LifecycleFlags::STARTED) {
            self.0.inner.borrow_mut().start(manager);
        }
    }

    pub(crate) fn update(&self, manager: &Manager, delta: f32) {
        let mut system = self.0.inner.borrow_mut();
        if system.needs_update_calls() {
            system.update(manager, delta);
        }
    }

    pub(crate) fn pause(&self, manager: &Manager) {
        self.0.inner.borrow_mut().pause(manager);
    }

    pub(crate) fn resume(&self, manager: &Manager) {
        self.0.inner.borrow_mut().resume(manager);
    }

    pub(crate) fn destroy(&self, manager: &Manager) {
        if self.transition(LifecycleFlags::DESTROYED) {
            self.0.inner.borrow_mut().destroy(manager);
        }
    }

    fn transition(&self, flag: LifecycleFlags) -> bool {
        let mut flags = self.0.flags.get();
        let entered = flags.enter(flag);
        self.0.flags.set(flags);
        entered
    }
}

impl fmt::Debug for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemHandle")
            .field("id", &self.id())
            .field("system_type", &self.system_type())
            .field("flags", &self.0.flags.get())
            .finish()
    }
}
