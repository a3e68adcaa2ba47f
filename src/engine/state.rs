//! # State Serialisation
//!
//! Builders that project world state into the neutral message types, and
//! the apply path that drives a manager from such a message.
//!
//! ## Delta assembly
//! [`EntityComponentManager::changed_state`] concatenates the three
//! lifecycle buckets — newly created, staged for removal, modified — with
//! each entity passed exactly once. The flat form serialises every
//! component of a changed entity; the map form serialises only components
//! with a pending one-time or periodic change.
//!
//! ## Parallel serialisation
//! [`EntityComponentManager::state_map`] partitions a snapshot of the
//! per-entity index into contiguous slices, one per worker, with the
//! worker count capped at the hardware parallelism. Each worker fills a
//! private message and merges it into the shared output under a single
//! mutex. The slice table is rebuilt lazily, only when the storage-dirty
//! flag reports that the index changed. Output is keyed by entity id, so
//! the merged message is deterministic regardless of worker interleaving.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error, warn};
use rayon::prelude::*;

use crate::engine::manager::EntityComponentManager;
use crate::engine::messages::{
    SerializedComponent, SerializedEntity, SerializedEntityMap, SerializedState,
    SerializedStateMap, REMOVED_COMPONENT_PAYLOAD,
};
use crate::engine::registry;
use crate::engine::types::{ComponentState, ComponentTypeId, Entity};

/// Precomputed work slices for the parallel serialiser: a snapshot of the
/// per-entity index keys plus the contiguous ranges assigned to workers.
#[derive(Clone, Default)]
pub(crate) struct StatePartitions {
    pub(crate) entities: Arc<Vec<Entity>>,
    pub(crate) ranges: Vec<Range<usize>>,
}

impl EntityComponentManager {
    /// Appends `entity` to a flat state message.
    ///
    /// The entity entry is always appended. Components are restricted to
    /// `types` when non-empty; an empty `types` means all of the entity's
    /// components. Removed components are appended as removal stubs.
    pub fn add_entity_to_message(
        &self,
        msg: &mut SerializedState,
        entity: Entity,
        types: &[ComponentTypeId],
    ) {
        let mut entity_msg = SerializedEntity {
            id: entity,
            remove: false,
            components: Vec::new(),
        };

        let Some(component_set) = self.entity_components.get(&entity) else {
            msg.entities.push(entity_msg);
            return;
        };

        if self.tracker.is_staged_for_removal(entity) {
            entity_msg.remove = true;
        }

        let types_to_send: Vec<ComponentTypeId> = if types.is_empty() {
            component_set.iter().copied().collect()
        } else {
            types.to_vec()
        };

        for type_id in types_to_send {
            if !component_set.contains(&type_id) {
                continue;
            }
            let Some(component) = self.storage.valid_component(entity, type_id) else {
                error!(
                    "per-entity index lists type [{}] for entity [{}] \
                     but storage holds no live instance",
                    type_id, entity
                );
                continue;
            };

            let mut bytes = Vec::new();
            match component.serialize(&mut bytes) {
                Ok(()) => entity_msg.components.push(SerializedComponent {
                    type_id: component.component_type_id(),
                    component: bytes,
                    remove: false,
                }),
                Err(e) => error!("{}", e),
            }
        }

        for type_id in self.tracker.removed_components_filtered(entity, types) {
            entity_msg.components.push(SerializedComponent {
                type_id,
                component: REMOVED_COMPONENT_PAYLOAD.to_vec(),
                remove: true,
            });
        }

        msg.entities.push(entity_msg);
    }

    /// Writes `entity` into a keyed state message.
    ///
    /// Nothing is written for entities absent from the per-entity index.
    /// With `full` unset, components without a pending one-time or periodic
    /// change are skipped; the entity entry is only created when something
    /// is actually written for it.
    pub fn add_entity_to_message_map(
        &self,
        msg: &mut SerializedStateMap,
        entity: Entity,
        types: &[ComponentTypeId],
        full: bool,
    ) {
        let Some(component_set) = self.entity_components.get(&entity) else {
            return;
        };

        if self.tracker.is_staged_for_removal(entity) {
            let entry = msg
                .entities
                .entry(entity)
                .or_insert_with(|| SerializedEntityMap {
                    id: entity,
                    ..Default::default()
                });
            entry.remove = true;
        }

        let types_to_send: Vec<ComponentTypeId> = if types.is_empty() {
            component_set.iter().copied().collect()
        } else {
            types.to_vec()
        };

        for type_id in types_to_send {
            if !component_set.contains(&type_id) {
                continue;
            }

            if !full
                && !self.tracker.one_time_contains(type_id, entity)
                && !self.tracker.periodic_contains(type_id, entity)
            {
                continue;
            }

            let Some(component) = self.storage.valid_component(entity, type_id) else {
                error!(
                    "per-entity index lists type [{}] for entity [{}] \
                     but storage holds no live instance",
                    type_id, entity
                );
                continue;
            };

            let mut bytes = Vec::new();
            if let Err(e) = component.serialize(&mut bytes) {
                error!("{}", e);
                continue;
            }

            let entry = msg
                .entities
                .entry(entity)
                .or_insert_with(|| SerializedEntityMap {
                    id: entity,
                    ..Default::default()
                });
            entry.components.insert(
                type_id,
                SerializedComponent {
                    type_id: component.component_type_id(),
                    component: bytes,
                    remove: false,
                },
            );
        }

        let removed = self.tracker.removed_components_filtered(entity, types);
        if !removed.is_empty() {
            let entry = msg
                .entities
                .entry(entity)
                .or_insert_with(|| SerializedEntityMap {
                    id: entity,
                    ..Default::default()
                });
            for type_id in removed {
                entry.components.insert(
                    type_id,
                    SerializedComponent {
                        type_id,
                        component: REMOVED_COMPONENT_PAYLOAD.to_vec(),
                        remove: true,
                    },
                );
            }
        }
    }

    /// Assembles the flat delta message: every entity in the newly-created,
    /// staged-removal and modified buckets, each passed once.
    pub fn changed_state(&self) -> SerializedState {
        let mut msg = SerializedState::default();
        for entity in self.delta_entities() {
            self.add_entity_to_message(&mut msg, entity, &[]);
        }
        msg
    }

    /// Assembles the keyed delta message into `state`. Only changed
    /// components are serialised. The message's one-time flag is set iff
    /// any one-time change is pending.
    pub fn changed_state_map(&self, state: &mut SerializedStateMap) {
        for entity in self.delta_entities() {
            self.add_entity_to_message_map(state, entity, &[], false);
        }
        state.one_time_component_changes = self.tracker.has_one_time_changes();
    }

    /// Assembles a flat full-state message for every entity in the
    /// per-entity index, optionally filtered to `entities` and `types`
    /// (empty slices mean no filter).
    pub fn state(&self, entities: &[Entity], types: &[ComponentTypeId]) -> SerializedState {
        let filter: HashSet<Entity> = entities.iter().copied().collect();
        let mut msg = SerializedState::default();

        let mut indexed: Vec<Entity> = self.entity_components.keys().copied().collect();
        indexed.sort_unstable();

        for entity in indexed {
            if !filter.is_empty() && !filter.contains(&entity) {
                continue;
            }
            self.add_entity_to_message(&mut msg, entity, types);
        }
        msg
    }

    /// Assembles a keyed state message in parallel.
    ///
    /// Work is partitioned into contiguous slices of the per-entity index;
    /// each worker fills a private message and merges it into `state` under
    /// a single mutex. Empty `entities`/`types` slices mean no filter;
    /// `full` selects full versus changed-only component serialisation.
    pub fn state_map(
        &self,
        state: &mut SerializedStateMap,
        entities: &[Entity],
        types: &[ComponentTypeId],
        full: bool,
    ) {
        let partitions = self.calculate_state_thread_load();
        let filter: HashSet<Entity> = entities.iter().copied().collect();
        let merged = Mutex::new(state);

        partitions.ranges.par_iter().for_each(|range| {
            let mut local = SerializedStateMap::default();
            for &entity in &partitions.entities[range.clone()] {
                if filter.is_empty() || filter.contains(&entity) {
                    self.add_entity_to_message_map(&mut local, entity, types, full);
                }
            }

            match merged.lock() {
                Ok(mut out) => out.entities.extend(local.entities),
                Err(_) => error!("state merge lock poisoned; dropping a worker slice"),
            }
        });
    }

    /// Applies a flat state message.
    ///
    /// Entities flagged `remove` are staged for recursive removal; unknown
    /// entities are created with the supplied id. Component entries with an
    /// unset payload are skipped; entries flagged `remove` remove the
    /// component; otherwise the payload is deserialised onto the existing
    /// instance (marked as a periodic change) or a new instance built
    /// through the registry.
    pub fn set_state(&mut self, msg: &SerializedState) {
        for entity_msg in &msg.entities {
            let entity = entity_msg.id;

            if entity_msg.remove {
                self.request_remove_entity(entity, true);
                continue;
            }

            if !self.has_entity(entity) {
                self.create_entity_implementation(entity);
            }

            for component_msg in &entity_msg.components {
                // An unset payload means the sender had nothing to say
                // about this component.
                if component_msg.component.is_empty() {
                    continue;
                }

                let type_id = component_msg.type_id;
                if !registry::has_type(type_id) {
                    self.warn_unregistered_once(type_id);
                    continue;
                }

                if component_msg.remove {
                    self.remove_component(entity, type_id);
                    continue;
                }

                self.apply_component(
                    entity,
                    type_id,
                    &component_msg.component,
                    ComponentState::PeriodicChange,
                );
            }
        }
    }

    /// Applies a keyed state message. Updated components are marked
    /// one-time or periodic according to the message's one-time flag.
    pub fn set_state_map(&mut self, msg: &SerializedStateMap) {
        let applied_state = if msg.one_time_component_changes {
            ComponentState::OneTimeChange
        } else {
            ComponentState::PeriodicChange
        };

        for (&entity, entity_msg) in &msg.entities {
            if entity_msg.remove {
                self.request_remove_entity(entity, true);
                continue;
            }

            if !self.has_entity(entity) {
                self.create_entity_implementation(entity);
            }

            for (&type_id, component_msg) in &entity_msg.components {
                if !registry::has_type(type_id) {
                    self.warn_unregistered_once(type_id);
                    continue;
                }

                if component_msg.remove {
                    self.remove_component(entity, type_id);
                    continue;
                }

                self.apply_component(entity, type_id, &component_msg.component, applied_state);
            }
        }
    }

    /// Deserialises `bytes` onto the live instance of (entity, type), or
    /// constructs one through the registry when the component is absent.
    fn apply_component(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        bytes: &[u8],
        state: ComponentState,
    ) {
        let present = self.storage.valid_component(entity, type_id).is_some();

        if present {
            let Some(component) = self.storage.valid_component_mut(entity, type_id) else {
                return;
            };
            if let Err(e) = component.deserialize(bytes) {
                error!("{}", e);
                return;
            }
            self.set_changed(entity, type_id, state);
        } else {
            match registry::new_from_bytes(type_id, bytes) {
                Ok(component) => {
                    self.create_component_implementation(entity, type_id, component);
                }
                Err(e) => error!("{}", e),
            }
        }
    }

    /// The delta buckets concatenated in order — created, staged for
    /// removal, modified — with duplicates dropped.
    fn delta_entities(&self) -> Vec<Entity> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for entity in self
            .tracker
            .created_snapshot()
            .into_iter()
            .chain(self.tracker.staged_snapshot())
            .chain(self.tracker.modified_snapshot())
        {
            if seen.insert(entity) {
                ordered.push(entity);
            }
        }
        ordered
    }

    /// Returns the worker slices for parallel serialisation, rebuilding
    /// them when the per-entity index changed since the last call.
    fn calculate_state_thread_load(&self) -> StatePartitions {
        let mut cache = match self.partitions.lock() {
            Ok(cache) => cache,
            Err(_) => {
                error!("state partition lock poisoned; serialising on a single slice");
                let entities: Vec<Entity> = self.entity_components.keys().copied().collect();
                let len = entities.len();
                return StatePartitions {
                    entities: Arc::new(entities),
                    ranges: vec![0..len],
                };
            }
        };

        if self.storage_dirty.swap(false, Ordering::Relaxed) {
            let entities: Vec<Entity> = self.entity_components.keys().copied().collect();
            let count = entities.len();

            let max_workers = thread::available_parallelism()
                .map(|parallelism| parallelism.get())
                .unwrap_or(1);
            let workers = count.min(max_workers).max(1);
            let per_worker = (count + workers - 1) / workers;

            let mut ranges = Vec::with_capacity(workers);
            let mut start = 0;
            while start < count {
                let end = (start + per_worker).min(count);
                ranges.push(start..end);
                start = end;
            }

            debug!(
                "updated state worker slices: {} workers processing around {} entities each",
                ranges.len(),
                per_worker
            );

            *cache = StatePartitions {
                entities: Arc::new(entities),
                ranges,
            };
        }

        cache.clone()
    }

    /// Warns once per unregistered type-id arriving in an external message.
    fn warn_unregistered_once(&self, type_id: ComponentTypeId) {
        if let Ok(mut warned) = self.warned_types.lock() {
            if warned.insert(type_id) {
                warn!(
                    "component type [{}] has not been registered in this process, \
                     so it cannot be deserialized",
                    type_id
                );
            }
        }
    }
}
