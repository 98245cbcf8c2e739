//! Cached entity queries and the shared entity registry

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::{ComponentType, Entity, EntityId, EntityRef};
use crate::events::{listener, names, EventBus, Listener};

/// Events after which every cached query result is stale
pub const STRUCTURAL_EVENTS: [&str; 4] = [
    names::ENTITY_ADDED,
    names::ENTITY_REMOVED,
    names::COMPONENT_ADDED,
    names::COMPONENT_REMOVED,
];

/// Whether an entity satisfies a component-type filter
///
/// An entity matches when it holds every required type. The `*` wildcard
/// matches any entity; an empty filter matches nothing. The manager's direct
/// scan and [`Query::execute`] both go through this predicate.
pub fn matches_filter<'a, I>(entity: &Entity, component_types: I) -> bool
where
    I: IntoIterator<Item = &'a ComponentType>,
{
    let mut required = component_types.into_iter().peekable();
    if required.peek().is_none() {
        return false;
    }
    required.all(|ty| ty.is_wildcard() || entity.has_component_type(*ty))
}

/// Insertion-ordered map of registered entities
///
/// Cloning the registry shares the same map; the manager is its only writer.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    entities: Rc<RefCell<IndexMap<EntityId, EntityRef>>>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entity by id
    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.borrow().get(&id).cloned()
    }

    /// Whether an id is registered
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.borrow().contains_key(&id)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    /// All entities in insertion order
    pub fn snapshot(&self) -> Vec<EntityRef> {
        self.entities.borrow().values().cloned().collect()
    }

    /// Entities matching a component-type filter, in insertion order
    pub fn matching(&self, component_types: &[ComponentType]) -> Vec<EntityRef> {
        self.entities
            .borrow()
            .values()
            .filter(|entity| matches_filter(entity, component_types))
            .cloned()
            .collect()
    }

    /// Non-owning handle, for listeners that must not keep entities alive
    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Rc::downgrade(&self.entities))
    }

    pub(crate) fn insert(&self, entity: EntityRef) -> Option<EntityId> {
        let id = entity.id()?;
        self.entities.borrow_mut().insert(id, entity);
        Some(id)
    }

    pub(crate) fn remove(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.borrow_mut().shift_remove(&id)
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entities.borrow().keys())
            .finish()
    }
}

/// Weak counterpart of [`EntityRegistry`]
#[derive(Clone)]
pub struct WeakRegistry(Weak<RefCell<IndexMap<EntityId, EntityRef>>>);

impl WeakRegistry {
    /// Recover the registry if the manager is still alive
    pub fn upgrade(&self) -> Option<EntityRegistry> {
        self.0.upgrade().map(|entities| EntityRegistry { entities })
    }

    /// Look up an entity by id
    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.upgrade().and_then(|registry| registry.get(id))
    }
}

/// Shared result of a query execution
pub type QueryResults = Rc<Vec<EntityRef>>;

type Cache = Rc<RefCell<Option<QueryResults>>>;

/// Memoized filter over the registry
///
/// The cache is dropped on every structural event and rebuilt lazily on the
/// next [`Query::execute`].
pub struct Query {
    component_types: RefCell<IndexSet<ComponentType>>,
    registry: EntityRegistry,
    cache: Cache,
    bus: Rc<EventBus>,
    invalidator: Listener,
}

impl Query {
    /// Create a query with an empty filter, subscribed to structural events
    pub fn new(registry: EntityRegistry, bus: Rc<EventBus>) -> Self {
        let cache: Cache = Rc::new(RefCell::new(None));
        let weak_cache: Weak<RefCell<Option<QueryResults>>> = Rc::downgrade(&cache);
        let invalidator = listener(move |_| {
            if let Some(cache) = weak_cache.upgrade() {
                cache.borrow_mut().take();
            }
        });
        for name in STRUCTURAL_EVENTS {
            bus.on(name, &invalidator);
        }

        Self {
            component_types: RefCell::new(IndexSet::new()),
            registry,
            cache,
            bus,
            invalidator,
        }
    }

    /// Create a query with a filter
    pub fn with_filter<I>(registry: EntityRegistry, bus: Rc<EventBus>, component_types: I) -> Self
    where
        I: IntoIterator<Item = ComponentType>,
    {
        let query = Self::new(registry, bus);
        query.set_filter(component_types);
        query
    }

    /// Replace the required component types
    ///
    /// Does not invalidate a cached result; configure before the first
    /// [`Query::execute`].
    pub fn set_filter<I>(&self, component_types: I)
    where
        I: IntoIterator<Item = ComponentType>,
    {
        let mut current = self.component_types.borrow_mut();
        current.clear();
        current.extend(component_types);
    }

    /// Required component types in filter order
    pub fn component_types(&self) -> Vec<ComponentType> {
        self.component_types.borrow().iter().copied().collect()
    }

    /// Matching entities, from cache when still valid
    pub fn execute(&self) -> QueryResults {
        if let Some(results) = self.cache.borrow().as_ref() {
            return Rc::clone(results);
        }

        let results: QueryResults = {
            let component_types = self.component_types.borrow();
            Rc::new(
                self.registry
                    .snapshot()
                    .into_iter()
                    .filter(|entity| matches_filter(entity, component_types.iter()))
                    .collect(),
            )
        };
        *self.cache.borrow_mut() = Some(Rc::clone(&results));
        results
    }

    /// Drop the cached result
    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().take();
    }

    /// Whether a result is currently cached
    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        for name in STRUCTURAL_EVENTS {
            self.bus.off(name, &self.invalidator);
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("component_types", &self.component_types())
            .field("cached", &self.is_cached())
            .finish()
    }
}
