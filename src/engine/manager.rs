//! The entity-component manager facade: entity lifecycle, component CRUD,
//! parenting, views, and descendant queries.
//!
//! The manager is single-writer by convention: the simulator's tick owns
//! structural mutation (`&mut self` methods), while staging, predicates,
//! view access and serialisation may be called from helper threads
//! (`&self` methods backed by the dedicated mutexes).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{error, warn};

use crate::engine::component::{Component, ComponentType};
use crate::engine::graph::EntityGraph;
use crate::engine::registry;
use crate::engine::state::StatePartitions;
use crate::engine::storage::EntityStorage;
use crate::engine::tracker::ChangeTracker;
use crate::engine::types::{
    ComponentAdditionResult, ComponentKey, ComponentState, ComponentTypeId, Entity, NULL_ENTITY,
};
use crate::engine::view::{canonical_types, View, ViewKey};

/// Authoritative in-process world-state store.
///
/// Owns component storage, the scene graph, the change tracker, the view
/// cache and the descendant cache. Simulation systems mutate through this
/// facade; the facade keeps every cache coherent with the mutation and
/// feeds the change tracker that drives incremental state messages.
pub struct EntityComponentManager {
    pub(crate) storage: EntityStorage,
    pub(crate) created_types: HashSet<ComponentTypeId>,
    pub(crate) entities: EntityGraph,
    pub(crate) entity_components: HashMap<Entity, BTreeSet<ComponentTypeId>>,
    pub(crate) tracker: ChangeTracker,
    pub(crate) views: Mutex<HashMap<ViewKey, View>>,
    pub(crate) descendant_cache: Mutex<HashMap<Entity, BTreeSet<Entity>>>,
    pub(crate) entity_counter: u64,
    pub(crate) partitions: Mutex<StatePartitions>,
    pub(crate) storage_dirty: AtomicBool,
    pub(crate) warned_types: Mutex<HashSet<ComponentTypeId>>,
}

impl Default for EntityComponentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityComponentManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            storage: EntityStorage::new(),
            created_types: HashSet::new(),
            entities: EntityGraph::new(),
            entity_components: HashMap::new(),
            tracker: ChangeTracker::new(),
            views: Mutex::new(HashMap::new()),
            descendant_cache: Mutex::new(HashMap::new()),
            entity_counter: 0,
            partitions: Mutex::new(StatePartitions::default()),
            storage_dirty: AtomicBool::new(true),
            warned_types: Mutex::new(HashSet::new()),
        }
    }

    /// Number of entities currently in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.vertex_count()
    }

    /// Allocates and registers a new entity, returning its id.
    ///
    /// Identifiers are allocated strictly monotonically and never reused.
    /// Once the allocator saturates, the saturated id (`u64::MAX`) is
    /// returned with a warning and no entity is registered.
    pub fn create_entity(&mut self) -> Entity {
        let entity = match self.entity_counter.checked_add(1) {
            Some(next) => {
                self.entity_counter = next;
                next
            }
            None => {
                warn!("reached maximum number of entities [{}]", Entity::MAX);
                return Entity::MAX;
            }
        };

        if entity == Entity::MAX {
            warn!("reached maximum number of entities [{}]", entity);
            return entity;
        }

        self.create_entity_implementation(entity);
        entity
    }

    /// Registers `entity` with the graph, the newly-created set and
    /// storage. Shared by [`EntityComponentManager::create_entity`] and the
    /// message apply path, which creates entities with externally supplied
    /// ids.
    pub(crate) fn create_entity_implementation(&mut self, entity: Entity) {
        self.entities.add_vertex(entity);
        self.tracker.insert_created(entity);
        if let Ok(mut cache) = self.descendant_cache.lock() {
            cache.clear();
        }
        if !self.storage.add_entity(entity) {
            warn!(
                "attempted to add entity [{}] to component storage, but it is already present",
                entity
            );
        }
    }

    /// Sets the entity allocation counter.
    ///
    /// Warns when `offset` is below the current counter, since identifier
    /// collisions become possible.
    pub fn set_entity_create_offset(&mut self, offset: u64) {
        if offset < self.entity_counter {
            warn!(
                "setting an entity create offset of [{}] below the current counter [{}]; \
                 identifier collisions become possible",
                offset, self.entity_counter
            );
        }
        self.entity_counter = offset;
    }

    /// Returns `true` if `entity` exists in the world. Entities staged for
    /// removal still exist until the barrier.
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.has_vertex(entity)
    }

    /// Returns `true` if `entity` was created since the newly-created set
    /// was last cleared.
    pub fn is_new_entity(&self, entity: Entity) -> bool {
        self.tracker.is_created(entity)
    }

    /// Returns `true` if `entity` will be removed at the next barrier.
    pub fn is_marked_for_removal(&self, entity: Entity) -> bool {
        self.tracker.is_marked_for_removal(entity)
    }

    /// Returns `true` if any entity is in the newly-created set.
    pub fn has_new_entities(&self) -> bool {
        self.tracker.has_created()
    }

    /// Returns `true` if any removal is staged.
    pub fn has_entities_marked_for_removal(&self) -> bool {
        self.tracker.has_removals()
    }

    /// Read access to the scene graph.
    pub fn entities(&self) -> &EntityGraph {
        &self.entities
    }

    /// Stages `entity` for removal at the next barrier; with `recursive`,
    /// its scene-graph descendants are staged with it. Each staged entity
    /// is marked for removal in every view.
    pub fn request_remove_entity(&self, entity: Entity, recursive: bool) {
        let mut staged = if recursive {
            self.descendants(entity)
        } else {
            BTreeSet::new()
        };
        staged.insert(entity);

        self.tracker.stage_removals(staged.iter().copied());

        if let Ok(mut views) = self.views.lock() {
            for view in views.values_mut() {
                for &staged_entity in &staged {
                    view.mark_entity_to_remove(staged_entity);
                }
            }
        }
    }

    /// Requests that the next barrier wipe the world, and rebuilds views so
    /// every member is marked for removal.
    pub fn request_remove_entities(&self) {
        self.tracker.set_remove_all();
        self.rebuild_views();
    }

    /// The commit barrier for staged removals.
    ///
    /// ## Behavior
    /// - With remove-all set: clears the scene graph, the per-entity index,
    ///   storage and the view map.
    /// - Otherwise: removes each staged entity that still exists from the
    ///   graph, storage, the index and every view.
    /// - Always invalidates the descendant cache.
    pub fn process_remove_entity_requests(&mut self) {
        let (remove_all, staged) = self.tracker.take_removals();

        if remove_all {
            self.entities = EntityGraph::new();
            self.entity_components.clear();
            self.storage.clear();
            self.mark_storage_dirty();
            if let Ok(mut views) = self.views.lock() {
                views.clear();
            }
        } else {
            for entity in staged {
                if !self.has_entity(entity) {
                    continue;
                }

                self.entities.remove_vertex(entity);

                if self.entity_components.remove(&entity).is_some() {
                    self.storage.remove_entity(entity);
                    self.mark_storage_dirty();
                }

                if let Ok(mut views) = self.views.lock() {
                    for view in views.values_mut() {
                        view.remove_entity(entity);
                    }
                }
            }
        }

        if let Ok(mut cache) = self.descendant_cache.lock() {
            cache.clear();
        }
    }

    /// The single parent of `entity`, or [`NULL_ENTITY`] if it is a root.
    pub fn parent_entity(&self, entity: Entity) -> Entity {
        self.entities
            .adjacents_to(entity)
            .first()
            .copied()
            .unwrap_or(NULL_ENTITY)
    }

    /// Reparents `child`. All current in-edges of `child` are removed; a
    /// [`NULL_ENTITY`] parent leaves the child a root. Returns `true` iff
    /// the requested edge now exists (always `true` for a null parent).
    pub fn set_parent_entity(&mut self, child: Entity, parent: Entity) -> bool {
        for current in self.entities.adjacents_to(child) {
            self.entities.remove_edge(current, child);
        }

        if let Ok(mut cache) = self.descendant_cache.lock() {
            cache.clear();
        }

        if parent == NULL_ENTITY {
            return true;
        }
        self.entities.add_edge(parent, child)
    }

    /// BFS closure of `entity` in the scene graph, including `entity`
    /// itself when it exists. Results are memoised; the cache is
    /// invalidated by any entity create, remove, or parent change.
    pub fn descendants(&self, entity: Entity) -> BTreeSet<Entity> {
        match self.descendant_cache.lock() {
            Ok(mut cache) => {
                if let Some(cached) = cache.get(&entity) {
                    return cached.clone();
                }
                if !self.has_entity(entity) {
                    return BTreeSet::new();
                }
                let descendants: BTreeSet<Entity> =
                    self.entities.breadth_first_sort(entity).into_iter().collect();
                cache.insert(entity, descendants.clone());
                descendants
            }
            Err(_) => self.entities.breadth_first_sort(entity).into_iter().collect(),
        }
    }

    /// Type-erased component creation.
    ///
    /// ## Behavior
    /// Rejects unknown entities and type-ids that are neither previously
    /// created nor registered. On success the component is recorded as a
    /// one-time change, the entity as modified, and affected views are
    /// notified according to how storage classified the addition.
    ///
    /// ## Returns
    /// `true` when the caller must copy its payload into the live slot
    /// (re-addition or modification); `false` when the stored instance is
    /// already current (fresh addition) or the operation failed.
    pub fn create_component_implementation(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        component: Box<dyn Component>,
    ) -> bool {
        if !self.has_entity(entity) {
            error!(
                "cannot create component of type [{}] for entity [{}]: entity does not exist",
                type_id, entity
            );
            return false;
        }

        if !self.has_component_type(type_id) && !registry::has_type(type_id) {
            error!(
                "failed to create component of type [{}] for entity [{}]: \
                 type has not been registered",
                type_id, entity
            );
            return false;
        }

        if component.component_type_id() != type_id {
            error!(
                "component instance reports type [{}] but was submitted as type [{}]",
                component.component_type_id(),
                type_id
            );
            return false;
        }

        // The stored data must be refreshed by the caller unless this is a
        // brand new addition.
        let mut update_data = true;

        self.tracker.add_modified(entity);
        self.entity_components
            .entry(entity)
            .or_default()
            .insert(type_id);
        self.tracker
            .mark_changed(entity, type_id, ComponentState::OneTimeChange);
        self.mark_storage_dirty();

        match self.storage.add_component(entity, component) {
            ComponentAdditionResult::FailedAddition => {
                error!(
                    "component storage rejected component of type [{}] for entity [{}]",
                    type_id, entity
                );
                if let Some(component_set) = self.entity_components.get_mut(&entity) {
                    component_set.remove(&type_id);
                }
                self.tracker.scrub_component(entity, type_id);
                return false;
            }
            ComponentAdditionResult::NewAddition => {
                update_data = false;
                let is_new = self.is_new_entity(entity);
                if let Ok(mut views) = self.views.lock() {
                    for view in views.values_mut() {
                        if self.entity_matches(entity, view.component_types()) {
                            view.mark_entity_to_add(entity, is_new);
                        }
                    }
                }
            }
            ComponentAdditionResult::ReAddition => {
                let is_new = self.is_new_entity(entity);
                if let Ok(mut views) = self.views.lock() {
                    for view in views.values_mut() {
                        view.notify_component_addition(entity, is_new, type_id);
                    }
                }
            }
            ComponentAdditionResult::Modification => {}
        }

        self.created_types.insert(type_id);
        update_data
    }

    /// Typed component creation. Returns `true` iff the component is live
    /// on `entity` afterwards.
    pub fn create_component<T: ComponentType + Clone>(&mut self, entity: Entity, value: T) -> bool {
        let update_data =
            self.create_component_implementation(entity, T::TYPE_ID, Box::new(value.clone()));
        if update_data {
            if let Some(live) = self.component_mut::<T>(entity) {
                *live = value;
            }
        }
        self.entity_has_component_type(entity, T::TYPE_ID)
    }

    /// Removes the component of `type_id` from `entity`.
    ///
    /// Strips the per-entity index, scrubs the changed-component maps,
    /// notifies views, records the entity as modified and the component as
    /// removed. Returns `false` if (entity, type) was not present.
    pub fn remove_component(&mut self, entity: Entity, type_id: ComponentTypeId) -> bool {
        if !self.entity_has_component_type(entity, type_id) {
            return false;
        }

        if let Some(component_set) = self.entity_components.get_mut(&entity) {
            component_set.remove(&type_id);
        }
        self.mark_storage_dirty();

        self.tracker.scrub_component(entity, type_id);

        if self.storage.remove_component(entity, type_id).is_some() {
            if let Ok(mut views) = self.views.lock() {
                for view in views.values_mut() {
                    view.notify_component_removal(entity, type_id);
                }
            }
        }

        self.tracker.add_modified(entity);
        self.tracker.insert_removed_component(entity, type_id);

        true
    }

    /// Key-based variant of [`EntityComponentManager::remove_component`].
    pub fn remove_component_by_key(&mut self, entity: Entity, key: ComponentKey) -> bool {
        self.remove_component(entity, key.0)
    }

    /// Returns `true` if `entity` holds a component matching `key`.
    pub fn entity_has_component(&self, entity: Entity, key: ComponentKey) -> bool {
        self.entity_has_component_type(entity, key.0)
    }

    /// Returns `true` if `entity` holds a component of `type_id`.
    pub fn entity_has_component_type(&self, entity: Entity, type_id: ComponentTypeId) -> bool {
        if !self.has_entity(entity) {
            return false;
        }
        self.entity_components
            .get(&entity)
            .is_some_and(|component_set| component_set.contains(&type_id))
    }

    /// Returns `true` if a component of `type_id` has ever been created in
    /// this manager.
    pub fn has_component_type(&self, type_id: ComponentTypeId) -> bool {
        self.created_types.contains(&type_id)
    }

    /// The component types currently attached to `entity`.
    pub fn component_types(&self, entity: Entity) -> BTreeSet<ComponentTypeId> {
        self.entity_components
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if every type in `types` is attached to `entity`.
    pub fn entity_matches(&self, entity: Entity, types: &[ComponentTypeId]) -> bool {
        let Some(component_set) = self.entity_components.get(&entity) else {
            return false;
        };
        if types.len() > component_set.len() {
            return false;
        }
        types.iter().all(|type_id| component_set.contains(type_id))
    }

    /// Borrowed type-erased access to a live component.
    pub fn component_raw(&self, entity: Entity, type_id: ComponentTypeId) -> Option<&dyn Component> {
        self.storage.valid_component(entity, type_id)
    }

    /// Mutable type-erased access to a live component.
    pub fn component_raw_mut(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&mut dyn Component> {
        self.storage.valid_component_mut(entity, type_id)
    }

    /// Borrowed typed access to a live component.
    pub fn component<T: ComponentType>(&self, entity: Entity) -> Option<&T> {
        self.storage
            .valid_component(entity, T::TYPE_ID)?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable typed access to a live component.
    pub fn component_mut<T: ComponentType>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage
            .valid_component_mut(entity, T::TYPE_ID)?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// The key of the live component of `type_id` on `entity`, if any.
    pub fn component_key(&self, entity: Entity, type_id: ComponentTypeId) -> Option<ComponentKey> {
        let slot = self.storage.slot_index(entity, type_id)?;
        Some((type_id, slot))
    }

    /// Change classification of (entity, type). One-time takes precedence
    /// over periodic.
    pub fn component_state(&self, entity: Entity, type_id: ComponentTypeId) -> ComponentState {
        if !self.entity_has_component_type(entity, type_id) {
            return ComponentState::NoChange;
        }
        self.tracker.component_state(entity, type_id)
    }

    /// Reclassifies the pending change of (entity, type). No-op when the
    /// pair is not present. Marks the entity as modified.
    pub fn set_changed(&mut self, entity: Entity, type_id: ComponentTypeId, state: ComponentState) {
        let Some(component_set) = self.entity_components.get(&entity) else {
            return;
        };
        if !component_set.contains(&type_id) {
            return;
        }

        self.tracker.mark_changed(entity, type_id, state);
        self.tracker.add_modified(entity);
    }

    /// Returns `true` if any one-time component change is pending.
    pub fn has_one_time_component_changes(&self) -> bool {
        self.tracker.has_one_time_changes()
    }

    /// The component types with pending periodic changes.
    pub fn component_types_with_periodic_changes(&self) -> BTreeSet<ComponentTypeId> {
        self.tracker.periodic_types()
    }

    /// Returns a copy of the view over `types`, if one exists.
    pub fn find_view(&self, types: &[ComponentTypeId]) -> Option<View> {
        let key = canonical_types(types);
        match self.views.lock() {
            Ok(views) => views.get(&key).cloned(),
            Err(_) => None,
        }
    }

    /// Inserts `view` under `types` unless a view for that key exists.
    pub fn add_view(&self, types: &[ComponentTypeId], view: View) {
        let key = canonical_types(types);
        if let Ok(mut views) = self.views.lock() {
            views.entry(key).or_insert(view);
        }
    }

    /// Returns a copy of the view over `types`, creating and populating it
    /// on first use. Pending additions are folded into the membership
    /// before the copy is taken.
    pub fn view(&self, types: &[ComponentTypeId]) -> View {
        let key = canonical_types(types);
        let mut views = match self.views.lock() {
            Ok(views) => views,
            Err(_) => {
                error!("views lock poisoned; returning a detached view");
                return View::new(&key);
            }
        };

        if !views.contains_key(&key) {
            let view = self.build_view(&key);
            views.insert(key.clone(), view);
        }

        match views.get_mut(&key) {
            Some(view) => {
                view.process_add_queue();
                view.clone()
            }
            None => View::new(&key),
        }
    }

    /// Reinitialises every view from the current world: membership is
    /// rebuilt from the per-entity index, with new and to-remove marks
    /// taken from the change tracker.
    pub fn rebuild_views(&self) {
        let mut views = match self.views.lock() {
            Ok(views) => views,
            Err(_) => {
                error!("views lock poisoned; skipping view rebuild");
                return;
            }
        };

        for view in views.values_mut() {
            view.reset();
            let key: ViewKey = view.component_types().to_vec();
            for entity in self.entities.vertices() {
                if self.entity_matches(entity, &key) {
                    view.mark_entity_to_add(entity, self.is_new_entity(entity));
                    if self.is_marked_for_removal(entity) {
                        view.mark_entity_to_remove(entity);
                    }
                }
            }
        }
    }

    fn build_view(&self, key: &[ComponentTypeId]) -> View {
        let mut view = View::new(key);
        for entity in self.entities.vertices() {
            if self.entity_matches(entity, key) {
                view.mark_entity_to_add(entity, self.is_new_entity(entity));
                if self.is_marked_for_removal(entity) {
                    view.mark_entity_to_remove(entity);
                }
            }
        }
        view
    }

    /// Empties the newly-created set and resets every view's new-this-tick
    /// subset.
    pub fn clear_newly_created_entities(&mut self) {
        self.tracker.clear_created();
        if let Ok(mut views) = self.views.lock() {
            for view in views.values_mut() {
                view.reset_new_entity_state();
            }
        }
    }

    /// Clears the changed-component maps and the modified set, so the next
    /// delta starts from a clean slate.
    pub fn set_all_components_unchanged(&mut self) {
        self.tracker.set_all_unchanged();
    }

    /// Empties the removed-components map.
    pub fn clear_removed_components(&mut self) {
        self.tracker.clear_removed_components();
    }

    pub(crate) fn mark_storage_dirty(&self) {
        self.storage_dirty.store(true, Ordering::Relaxed);
    }
}
