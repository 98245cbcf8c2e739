//! Component trait and shared component handles

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::{EntityId, LifecycleFlags};
use crate::events::Listener;

/// Stable tag identifying a component kind
///
/// Declared once per kind through [`ComponentKind::TYPE`]; identical for every
/// instance of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentType(&'static str);

impl ComponentType {
    /// Wildcard matching every entity in entity filters
    pub const ANY: ComponentType = ComponentType("*");

    /// Create a tag from a static name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name
    pub fn name(&self) -> &'static str {
        self.0
    }

    /// Whether this is the `*` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::ANY.0
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Component identifier, unique within the owning entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    /// Wrap a raw index
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw index
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Downcasting support for trait objects
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A facet of an entity's data or behavior
///
/// Lifecycle hooks default to no-ops so data-only kinds only declare their
/// type tag.
pub trait Component: AsAny {
    /// Kind tag of this component
    fn component_type(&self) -> ComponentType;

    /// Called once when attached or when the owning entity initialises
    fn init(&mut self) {}

    /// Called once when the owning entity starts
    fn start(&mut self) {}

    /// Called when the owning entity is updated
    fn update(&mut self, _delta: f32) {}

    /// Called when the owning entity pauses
    fn pause(&mut self) {}

    /// Called when the owning entity resumes
    fn resume(&mut self) {}

    /// Release the component's data
    fn destroy(&mut self) {}

    /// Local entity event this component reacts to, with its listener
    fn behavior(&self) -> Option<(&str, Listener)> {
        None
    }

    /// Reserved flag carried for descriptors; no invariant depends on it
    fn is_independent(&self) -> bool {
        false
    }
}

/// Component kinds with a compile-time tag, for typed lookups
pub trait ComponentKind: Component {
    /// Tag shared by every instance of the kind
    const TYPE: ComponentType;
}

struct ComponentCell {
    component_type: ComponentType,
    id: Cell<ComponentId>,
    entity_id: Cell<Option<EntityId>>,
    flags: Cell<LifecycleFlags>,
    inner: RefCell<Box<dyn Component>>,
}

/// Shared handle to a component owned by an entity
///
/// Cloning the handle does not clone the component. Two handles refer to the
/// same component when [`ComponentHandle::ptr_eq`] holds.
#[derive(Clone)]
pub struct ComponentHandle(Rc<ComponentCell>);

impl ComponentHandle {
    /// Wrap a component
    pub fn new<C: Component>(component: C) -> Self {
        Self::from_boxed(Box::new(component))
    }

    /// Wrap an already boxed component
    pub fn from_boxed(component: Box<dyn Component>) -> Self {
        let component_type = component.component_type();
        Self(Rc::new(ComponentCell {
            component_type,
            id: Cell::new(ComponentId::new(0)),
            entity_id: Cell::new(None),
            flags: Cell::new(LifecycleFlags::empty()),
            inner: RefCell::new(component),
        }))
    }

    /// Identifier assigned at attach time
    pub fn id(&self) -> ComponentId {
        self.0.id.get()
    }

    /// Owning entity, if it was registered when the component was attached
    pub fn entity_id(&self) -> Option<EntityId> {
        self.0.entity_id.get()
    }

    /// Kind tag
    pub fn component_type(&self) -> ComponentType {
        self.0.component_type
    }

    /// Whether `init()` has run
    pub fn is_inited(&self) -> bool {
        self.0.flags.get().contains(LifecycleFlags::INITED)
    }

    /// Whether `start()` has run
    pub fn is_started(&self) -> bool {
        self.0.flags.get().contains(LifecycleFlags::STARTED)
    }

    /// Whether two handles refer to the same component
    pub fn ptr_eq(&self, other: &ComponentHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the component as a trait object
    pub fn borrow(&self) -> Ref<'_, dyn Component> {
        Ref::map(self.0.inner.borrow(), |component| &**component)
    }

    /// Mutably borrow the component as a trait object
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Component> {
        RefMut::map(self.0.inner.borrow_mut(), |component| &mut **component)
    }

    /// Borrow the component as its concrete kind
    pub fn downcast_ref<T: Component>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.inner.borrow(), |component| {
            (**component).as_any().downcast_ref::<T>()
        })
        .ok()
    }

    /// Mutably borrow the component as its concrete kind
    pub fn downcast_mut<T: Component>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.inner.borrow_mut(), |component| {
            (**component).as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    pub(crate) fn attach(&self, id: ComponentId, entity_id: Option<EntityId>) {
        self.0.id.set(id);
        self.0.entity_id.set(entity_id);
    }

    pub(crate) fn set_entity_id(&self, entity_id: Option<EntityId>) {
        self.0.entity_id.set(entity_id);
    }

    pub(crate) fn init(&self) {
        if self.transition(LifecycleFlags::INITED) {
            self.0.inner.borrow_mut().init();
        }
    }

    pub(crate) fn start(&self) {
        if self.transition(LifecycleFlags::STARTED) {
            self.0.inner.borrow_mut().start();
        }
    }

    pub(crate) fn update(&self, delta: f32) {
        self.0.inner.borrow_mut().update(delta);
    }

    pub(crate) fn pause(&self) {
        self.0.inner.borrow_mut().pause();
    }

    pub(crate) fn resume(&self) {
        self.0.inner.borrow_mut().resume();
    }

    pub(crate) fn destroy(&self) {
        if self.transition(LifecycleFlags::DESTROYED) {
            self.0.inner.borrow_mut().destroy();
        }
    }

    fn transition(&self, flag: LifecycleFlags) -> bool {
        let mut flags = self.0.flags.get();
        let entered = flags.enter(flag);
        self.0.flags.set(flags);
        entered
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id())
            .field("component_type", &self.component_type())
            .field("entity_id", &self.entity_id())
            .field("flags", &self.0.flags.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Health {
        points: u32,
        inits: u32,
    }

    impl Component for Health {
        fn component_type(&self) -> ComponentType {
            Self::TYPE
        }

        fn init(&mut self) {
            self.inits += 1;
        }

        fn destroy(&mut self) {
            self.points = 0;
        }
    }

    impl ComponentKind for Health {
        const TYPE: ComponentType = ComponentType::new("Health");
    }

    struct Marker;

    impl Component for Marker {
        fn component_type(&self) -> ComponentType {
            ComponentType::new("Marker")
        }
    }

    #[test]
    fn test_downcast_to_concrete_kind() {
        let handle = ComponentHandle::new(Health { points: 10, inits: 0 });

        assert_eq!(handle.component_type(), Health::TYPE);
        assert_eq!(handle.downcast_ref::<Health>().map(|h| h.points), Some(10));
        assert!(handle.downcast_ref::<Marker>().is_none());

        if let Some(mut health) = handle.downcast_mut::<Health>() {
            health.points = 3;
        }
        assert_eq!(handle.downcast_ref::<Health>().map(|h| h.points), Some(3));
    }

    #[test]
    fn test_init_runs_once() {
        let handle = ComponentHandle::new(Health::default());
        handle.init();
        handle.init();

        assert!(handle.is_inited());
        assert_eq!(handle.downcast_ref::<Health>().map(|h| h.inits), Some(1));
    }

    #[test]
    fn test_destroy_clears_data() {
        let handle = ComponentHandle::new(Health { points: 7, inits: 0 });
        handle.destroy();
        assert_eq!(handle.downcast_ref::<Health>().map(|h| h.points), Some(0));
    }

    #[test]
    fn test_clones_share_the_component() {
        let handle = ComponentHandle::new(Marker);
        let other = handle.clone();
        assert!(handle.ptr_eq(&other));
        assert!(!handle.ptr_eq(&ComponentHandle::new(Marker)));
    }

    #[test]
    fn test_wildcard_type() {
        assert!(ComponentType::ANY.is_wildcard());
        assert!(!Health::TYPE.is_wildcard());
        assert_eq!(Health::TYPE.to_string(), "Health");
    }
}
