//! # Change Tracker
//!
//! Per-tick delta sets driving incremental serialisation: newly-created
//! entities, staged removals, modified-component entities, the one-time and
//! periodic changed-component maps, and the removed-components map.
//!
//! ## Delta discipline
//! Delta messages classify each entity into exactly one bucket: created,
//! removed, or modified. The modified bucket exists only for in-place
//! mutations on steady-state entities, so [`ChangeTracker::add_modified`]
//! refuses entities that are newly created or staged for removal.
//!
//! ## Invariants
//! - For any (entity, type-id), membership in at most one of the one-time
//!   and periodic maps.
//! - `modified` is disjoint from both lifecycle sets.
//!
//! ## Concurrency
//! The newly-created set, the staged-removal set (with its remove-all
//! flag), and the removed-components map may be written from helper threads
//! during a tick and are guarded by dedicated mutexes. The modified set and
//! the changed-component maps are single-writer and unguarded; concurrent
//! readers see them through `&self` only.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use crate::engine::types::{ComponentState, ComponentTypeId, Entity};

#[derive(Default)]
struct RemovalStaging {
    to_remove: HashSet<Entity>,
    remove_all: bool,
}

/// The collection of per-tick delta sets.
#[derive(Default)]
pub struct ChangeTracker {
    /// Entities created since the last clear. Guarded: written by
    /// `CreateEntity` on the tick thread, read by predicates anywhere.
    newly_created: Mutex<HashSet<Entity>>,

    /// Entities staged for removal plus the remove-all flag.
    removal: Mutex<RemovalStaging>,

    /// Entities whose component set changed outside entity birth/death.
    modified: HashSet<Entity>,

    /// type-id → entities with a one-time change on that type.
    one_time: HashMap<ComponentTypeId, HashSet<Entity>>,

    /// type-id → entities with a periodic change on that type.
    periodic: HashMap<ComponentTypeId, HashSet<Entity>>,

    /// entity → component types removed since the last clear.
    removed_components: Mutex<HashMap<Entity, BTreeSet<ComponentTypeId>>>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entity` as newly created.
    pub fn insert_created(&self, entity: Entity) {
        if let Ok(mut created) = self.newly_created.lock() {
            created.insert(entity);
        }
    }

    /// Returns `true` if `entity` is in the newly-created set.
    pub fn is_created(&self, entity: Entity) -> bool {
        match self.newly_created.lock() {
            Ok(created) => created.contains(&entity),
            Err(_) => false,
        }
    }

    /// Returns `true` if any entity was created since the last clear.
    pub fn has_created(&self) -> bool {
        match self.newly_created.lock() {
            Ok(created) => !created.is_empty(),
            Err(_) => false,
        }
    }

    /// Empties the newly-created set.
    pub fn clear_created(&self) {
        if let Ok(mut created) = self.newly_created.lock() {
            created.clear();
        }
    }

    /// Ordered snapshot of the newly-created set.
    pub fn created_snapshot(&self) -> BTreeSet<Entity> {
        match self.newly_created.lock() {
            Ok(created) => created.iter().copied().collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    /// Stages entities for removal at the next barrier.
    pub fn stage_removals<I: IntoIterator<Item = Entity>>(&self, entities: I) {
        if let Ok(mut removal) = self.removal.lock() {
            removal.to_remove.extend(entities);
        }
    }

    /// Requests that the next barrier wipe the world.
    pub fn set_remove_all(&self) {
        if let Ok(mut removal) = self.removal.lock() {
            removal.remove_all = true;
        }
    }

    /// Returns `true` if `entity` will be removed at the next barrier,
    /// either individually or through remove-all.
    pub fn is_marked_for_removal(&self, entity: Entity) -> bool {
        match self.removal.lock() {
            Ok(removal) => removal.remove_all || removal.to_remove.contains(&entity),
            Err(_) => false,
        }
    }

    /// Returns `true` if `entity` is individually staged for removal.
    ///
    /// Unlike [`ChangeTracker::is_marked_for_removal`] the remove-all flag
    /// is not consulted; state messages flag only individually staged
    /// entities.
    pub fn is_staged_for_removal(&self, entity: Entity) -> bool {
        match self.removal.lock() {
            Ok(removal) => removal.to_remove.contains(&entity),
            Err(_) => false,
        }
    }

    /// Returns `true` if any removal is pending.
    pub fn has_removals(&self) -> bool {
        match self.removal.lock() {
            Ok(removal) => removal.remove_all || !removal.to_remove.is_empty(),
            Err(_) => false,
        }
    }

    /// Ordered snapshot of the individually staged entities.
    pub fn staged_snapshot(&self) -> BTreeSet<Entity> {
        match self.removal.lock() {
            Ok(removal) => removal.to_remove.iter().copied().collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    /// Drains the staged-removal state for the barrier: returns the
    /// remove-all flag and the staged set, resetting both.
    pub fn take_removals(&self) -> (bool, HashSet<Entity>) {
        match self.removal.lock() {
            Ok(mut removal) => {
                let remove_all = removal.remove_all;
                removal.remove_all = false;
                (remove_all, std::mem::take(&mut removal.to_remove))
            }
            Err(_) => (false, HashSet::new()),
        }
    }

    /// Records a component-level modification on `entity`.
    ///
    /// No-op for entities in the newly-created or staged-removal sets; the
    /// modified bucket is reserved for steady-state entities.
    pub fn add_modified(&mut self, entity: Entity) {
        if self.is_created(entity) || self.is_staged_for_removal(entity) {
            return;
        }
        self.modified.insert(entity);
    }

    /// Ordered snapshot of the modified-components set.
    pub fn modified_snapshot(&self) -> BTreeSet<Entity> {
        self.modified.iter().copied().collect()
    }

    /// Moves (entity, type) into the bucket matching `state`.
    ///
    /// `PeriodicChange` and `OneTimeChange` are mutually exclusive;
    /// `NoChange` removes the pair from both buckets.
    pub fn mark_changed(&mut self, entity: Entity, type_id: ComponentTypeId, state: ComponentState) {
        match state {
            ComponentState::PeriodicChange => {
                self.periodic.entry(type_id).or_default().insert(entity);
                if let Some(entities) = self.one_time.get_mut(&type_id) {
                    entities.remove(&entity);
                }
            }
            ComponentState::OneTimeChange => {
                if let Some(entities) = self.periodic.get_mut(&type_id) {
                    entities.remove(&entity);
                }
                self.one_time.entry(type_id).or_default().insert(entity);
            }
            ComponentState::NoChange => {
                if let Some(entities) = self.periodic.get_mut(&type_id) {
                    entities.remove(&entity);
                }
                if let Some(entities) = self.one_time.get_mut(&type_id) {
                    entities.remove(&entity);
                }
            }
        }
    }

    /// Change classification of (entity, type). One-time takes precedence.
    pub fn component_state(&self, entity: Entity, type_id: ComponentTypeId) -> ComponentState {
        if self.one_time_contains(type_id, entity) {
            ComponentState::OneTimeChange
        } else if self.periodic_contains(type_id, entity) {
            ComponentState::PeriodicChange
        } else {
            ComponentState::NoChange
        }
    }

    /// Returns `true` if (entity, type) has a pending one-time change.
    pub fn one_time_contains(&self, type_id: ComponentTypeId, entity: Entity) -> bool {
        self.one_time
            .get(&type_id)
            .is_some_and(|entities| entities.contains(&entity))
    }

    /// Returns `true` if (entity, type) has a pending periodic change.
    pub fn periodic_contains(&self, type_id: ComponentTypeId, entity: Entity) -> bool {
        self.periodic
            .get(&type_id)
            .is_some_and(|entities| entities.contains(&entity))
    }

    /// Returns `true` if any one-time change is pending.
    pub fn has_one_time_changes(&self) -> bool {
        self.one_time.values().any(|entities| !entities.is_empty())
    }

    /// The set of component types with pending periodic changes.
    pub fn periodic_types(&self) -> BTreeSet<ComponentTypeId> {
        self.periodic
            .iter()
            .filter(|(_, entities)| !entities.is_empty())
            .map(|(&type_id, _)| type_id)
            .collect()
    }

    /// Scrubs (entity, type) from both changed-component maps, dropping
    /// buckets that become empty. Used when the component is removed.
    pub fn scrub_component(&mut self, entity: Entity, type_id: ComponentTypeId) {
        if let Some(entities) = self.one_time.get_mut(&type_id) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.one_time.remove(&type_id);
            }
        }
        if let Some(entities) = self.periodic.get_mut(&type_id) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.periodic.remove(&type_id);
            }
        }
    }

    /// Records that `type_id` was removed from `entity`.
    pub fn insert_removed_component(&self, entity: Entity, type_id: ComponentTypeId) {
        if let Ok(mut removed) = self.removed_components.lock() {
            removed.entry(entity).or_default().insert(type_id);
        }
    }

    /// The component types removed from `entity` since the last clear,
    /// restricted to `types` when non-empty.
    pub fn removed_components_filtered(
        &self,
        entity: Entity,
        types: &[ComponentTypeId],
    ) -> Vec<ComponentTypeId> {
        match self.removed_components.lock() {
            Ok(removed) => removed
                .get(&entity)
                .map(|set| {
                    set.iter()
                        .copied()
                        .filter(|type_id| types.is_empty() || types.contains(type_id))
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Empties the removed-components map.
    pub fn clear_removed_components(&self) {
        if let Ok(mut removed) = self.removed_components.lock() {
            removed.clear();
        }
    }

    /// Clears the changed-component maps and the modified set. Entity
    /// lifecycle sets are untouched.
    pub fn set_all_unchanged(&mut self) {
        self.periodic.clear();
        self.one_time.clear();
        self.modified.clear();
    }
}
