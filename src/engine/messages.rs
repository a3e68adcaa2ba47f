//! Neutral message types for whole and incremental world state.
//!
//! Two message shapes are supported: a flat entity list
//! ([`SerializedState`]) and a map keyed by entity id
//! ([`SerializedStateMap`]). Component payloads are opaque bytes produced
//! by each component's own codec; the manager never interprets them.
//!
//! Component-removal entries are stubs carrying the single-space sentinel
//! payload ([`REMOVED_COMPONENT_PAYLOAD`]) with the `remove` flag set. The
//! sentinel is a message-level artefact; readers only need to honour the
//! flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::types::{ComponentTypeId, Entity};

/// Sentinel payload carried by component-removal stubs.
pub const REMOVED_COMPONENT_PAYLOAD: &[u8] = b" ";

/// One serialised component: its type, opaque payload bytes, and whether
/// the entry records a removal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedComponent {
    /// Component type-id.
    pub type_id: ComponentTypeId,

    /// Opaque payload bytes. Real components may produce any bytes,
    /// including none; removal stubs carry the sentinel.
    pub component: Vec<u8>,

    /// `true` if this entry records a component removal.
    pub remove: bool,
}

/// One entity in a flat state message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEntity {
    /// Entity id.
    pub id: Entity,

    /// `true` if the entity is staged for removal.
    pub remove: bool,

    /// Serialised components, in no particular order.
    pub components: Vec<SerializedComponent>,
}

/// Flat state message: a sequence of entities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedState {
    /// The serialised entities.
    pub entities: Vec<SerializedEntity>,
}

/// One entity in a keyed state message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEntityMap {
    /// Entity id.
    pub id: Entity,

    /// `true` if the entity is staged for removal.
    pub remove: bool,

    /// Serialised components keyed by type-id.
    pub components: BTreeMap<ComponentTypeId, SerializedComponent>,
}

/// Keyed state message: entities indexed by id, deterministic ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedStateMap {
    /// The serialised entities, keyed by entity id.
    pub entities: BTreeMap<Entity, SerializedEntityMap>,

    /// `true` if the message carries one-time component changes; a reader
    /// applying the message marks updated components accordingly.
    pub one_time_component_changes: bool,
}
