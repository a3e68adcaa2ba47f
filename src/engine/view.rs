//! # View Cache Entries
//!
//! A view is a persistent index over the entities matching a fixed set of
//! required component types. Entity `e` matches iff the view's type set is
//! a subset of `e`'s per-entity component index.
//!
//! ## Key canonicalisation
//! Views are keyed by an ordered set of type-ids. Two requests differing
//! only in iteration order must collide, so keys are canonicalised by
//! sorting and deduplicating before hashing ([`canonical_types`]).
//!
//! ## Deltas
//! Each view memoises the matched entity set and three deltas:
//! * an **add queue** of entities that started matching (with a flag for
//!   entities born this tick),
//! * a **remove queue** of entities staged for removal — exposed
//!   immediately so downstream iteration can treat them as tombstones,
//! * the **new-this-tick** subset, cleared when the manager clears the
//!   newly-created entity set.
//!
//! An entity whose required component is removed drops out of the matched
//! set but is remembered in an invalidated set, so a re-addition of the
//! component can reinstate it without a structural re-scan.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::types::{ComponentTypeId, Entity};

/// Canonical view key: the required types, sorted and deduplicated.
pub type ViewKey = Vec<ComponentTypeId>;

/// Canonicalises a type list into a [`ViewKey`]: sorted, duplicates
/// removed. Hashing the canonical form makes view lookup insensitive to
/// the caller's iteration order.
pub fn canonical_types(types: &[ComponentTypeId]) -> ViewKey {
    let mut key: ViewKey = types.to_vec();
    key.sort_unstable();
    key.dedup();
    key
}

/// Cached query result for a fixed set of required component types.
#[derive(Clone, Debug, Default)]
pub struct View {
    component_types: ViewKey,
    entities: BTreeSet<Entity>,
    invalidated: BTreeSet<Entity>,
    new_entities: BTreeSet<Entity>,
    to_add: BTreeMap<Entity, bool>,
    to_remove: BTreeSet<Entity>,
}

impl View {
    /// Creates an empty view over `types` (canonicalised).
    pub fn new(types: &[ComponentTypeId]) -> Self {
        Self {
            component_types: canonical_types(types),
            ..Self::default()
        }
    }

    /// The view's required component types, in canonical order.
    pub fn component_types(&self) -> &[ComponentTypeId] {
        &self.component_types
    }

    /// Returns `true` if `type_id` is one of the view's required types.
    pub fn requires_component(&self, type_id: ComponentTypeId) -> bool {
        self.component_types.binary_search(&type_id).is_ok()
    }

    /// Enqueues `entity` for addition. `is_new` flags entities created
    /// this tick; a later enqueue can upgrade the flag but not clear it.
    pub fn mark_entity_to_add(&mut self, entity: Entity, is_new: bool) {
        let flag = self.to_add.entry(entity).or_insert(false);
        *flag = *flag || is_new;
    }

    /// Marks `entity` as staged for removal. The entity remains a member
    /// until [`View::remove_entity`]; iteration must treat it as a
    /// tombstone.
    pub fn mark_entity_to_remove(&mut self, entity: Entity) {
        self.to_remove.insert(entity);
    }

    /// Notifies the view that a component covered by its type set was
    /// re-added on `entity`. Reinstates the entity if a prior removal of
    /// that component invalidated it.
    pub fn notify_component_addition(
        &mut self,
        entity: Entity,
        is_new: bool,
        type_id: ComponentTypeId,
    ) {
        if !self.requires_component(type_id) {
            return;
        }
        if self.invalidated.remove(&entity) {
            self.entities.insert(entity);
        }
        if is_new && self.entities.contains(&entity) {
            self.new_entities.insert(entity);
        }
    }

    /// Notifies the view that a component was removed from `entity`. If
    /// the component is required, the entity stops matching — whether
    /// already a member or still queued for addition — but is remembered
    /// for a possible re-addition.
    pub fn notify_component_removal(&mut self, entity: Entity, type_id: ComponentTypeId) {
        if !self.requires_component(type_id) {
            return;
        }
        let was_queued = self.to_add.remove(&entity).is_some();
        if self.entities.remove(&entity) || was_queued {
            self.invalidated.insert(entity);
        }
        self.new_entities.remove(&entity);
    }

    /// Structural erase on entity death: forgets `entity` entirely.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.entities.remove(&entity);
        self.invalidated.remove(&entity);
        self.new_entities.remove(&entity);
        self.to_add.remove(&entity);
        self.to_remove.remove(&entity);
    }

    /// Folds the add queue into the matched set.
    pub fn process_add_queue(&mut self) {
        for (entity, is_new) in std::mem::take(&mut self.to_add) {
            self.invalidated.remove(&entity);
            self.entities.insert(entity);
            if is_new {
                self.new_entities.insert(entity);
            }
        }
    }

    /// Clears all membership and queues. Used by view rebuilds.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.invalidated.clear();
        self.new_entities.clear();
        self.to_add.clear();
        self.to_remove.clear();
    }

    /// Clears the new-this-tick subset.
    pub fn reset_new_entity_state(&mut self) {
        self.new_entities.clear();
    }

    /// The matched entities, including tombstoned ones.
    pub fn entities(&self) -> &BTreeSet<Entity> {
        &self.entities
    }

    /// The subset of matched entities created this tick.
    pub fn new_entities(&self) -> &BTreeSet<Entity> {
        &self.new_entities
    }

    /// Entities marked for removal but not yet erased.
    pub fn marked_for_removal(&self) -> &BTreeSet<Entity> {
        &self.to_remove
    }

    /// Returns `true` if `entity` is a current member of the view.
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Returns `true` if no entity currently matches.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
