//! Component storage: boxed component instances keyed by (entity, type-id).
//!
//! Storage exclusively owns component instances and lends them out by
//! borrowed reference. Each entity maps to a vector of slots, one per
//! component type ever attached to the entity. Removing a component clears
//! the slot's value but keeps the slot, so a later add of the same type can
//! be distinguished as a re-addition rather than a first-time addition —
//! the distinction views rely on.

use crate::engine::component::Component;
use crate::engine::types::{ComponentAdditionResult, ComponentTypeId, Entity};
use std::collections::HashMap;

/// A slot remembers its component type for the lifetime of the entity;
/// only the value comes and goes.
struct ComponentSlot {
    type_id: ComponentTypeId,
    component: Option<Box<dyn Component>>,
}

/// Owner of all component instances, keyed by (entity, type-id).
#[derive(Default)]
pub struct EntityStorage {
    entities: HashMap<Entity, Vec<ComponentSlot>>,
}

impl EntityStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity with storage.
    ///
    /// Returns `false` if the entity is already present.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity) {
            return false;
        }
        self.entities.insert(entity, Vec::new());
        true
    }

    /// Returns `true` if the entity is registered with storage.
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Stores `component` for `entity`, reporting how the store changed.
    ///
    /// ## Behavior
    /// - Unknown entity → [`ComponentAdditionResult::FailedAddition`];
    ///   nothing is stored.
    /// - No slot for the component's type →
    ///   [`ComponentAdditionResult::NewAddition`]; a slot is created.
    /// - Cleared slot for the type → [`ComponentAdditionResult::ReAddition`];
    ///   the slot is reinstated.
    /// - Live slot for the type → [`ComponentAdditionResult::Modification`];
    ///   the existing instance is replaced.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: Box<dyn Component>,
    ) -> ComponentAdditionResult {
        let type_id = component.component_type_id();
        let Some(slots) = self.entities.get_mut(&entity) else {
            return ComponentAdditionResult::FailedAddition;
        };

        match slots.iter_mut().find(|slot| slot.type_id == type_id) {
            Some(slot) => {
                let occupied = slot.component.is_some();
                slot.component = Some(component);
                if occupied {
                    ComponentAdditionResult::Modification
                } else {
                    ComponentAdditionResult::ReAddition
                }
            }
            None => {
                slots.push(ComponentSlot {
                    type_id,
                    component: Some(component),
                });
                ComponentAdditionResult::NewAddition
            }
        }
    }

    /// Takes the component of `type_id` out of `entity`'s slot.
    ///
    /// The slot itself survives, enabling a later re-addition. Returns
    /// `None` if the entity is unknown, the slot never existed, or the slot
    /// was already cleared.
    pub fn remove_component(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<Box<dyn Component>> {
        let slots = self.entities.get_mut(&entity)?;
        let slot = slots.iter_mut().find(|slot| slot.type_id == type_id)?;
        slot.component.take()
    }

    /// Returns the live component of `type_id` attached to `entity`, if any.
    pub fn valid_component(
        &self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&dyn Component> {
        let slots = self.entities.get(&entity)?;
        let slot = slots.iter().find(|slot| slot.type_id == type_id)?;
        slot.component.as_deref()
    }

    /// Mutable variant of [`EntityStorage::valid_component`].
    pub fn valid_component_mut(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&mut dyn Component> {
        let slots = self.entities.get_mut(&entity)?;
        let slot = slots.iter_mut().find(|slot| slot.type_id == type_id)?;
        slot.component.as_deref_mut()
    }

    /// Returns the internal slot index of a live component, for callers
    /// that hold component keys.
    pub fn slot_index(&self, entity: Entity, type_id: ComponentTypeId) -> Option<usize> {
        let slots = self.entities.get(&entity)?;
        slots
            .iter()
            .position(|slot| slot.type_id == type_id && slot.component.is_some())
    }

    /// Destroys all components of `entity` and forgets the entity.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        self.entities.remove(&entity).is_some()
    }

    /// Drops every entity and component.
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}
