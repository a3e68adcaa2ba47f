//! # ECM Framework
//!
//! In-process entity-component manager serving as the authoritative
//! world-state representation of a simulator.
//!
//! ## Design Goals
//! - Heterogeneous typed storage keyed by (entity, component-type)
//! - Deferred removal committed at a well-defined barrier
//! - Cached entity views and descendant queries kept coherent with mutation
//! - Two-granularity change tracking driving minimal delta messages
//! - Deterministic parallel serialisation of large state
//!
//! Simulation systems mutate world state through
//! [`EntityComponentManager`]; the manager keeps storage, the scene graph,
//! the change tracker and every cache coherent, and projects whole or
//! incremental state into neutral messages for cross-process transport.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::manager::EntityComponentManager;

pub use engine::types::{
    ComponentAdditionResult,
    ComponentKey,
    ComponentState,
    ComponentTypeId,
    Entity,
    NULL_ENTITY,
};

pub use engine::component::{Component, ComponentType, Data};

pub use engine::registry::{
    clear_registry,
    descriptor,
    has_type,
    new_default,
    new_from_bytes,
    register_component,
    ComponentDescriptor,
};

pub use engine::graph::EntityGraph;

pub use engine::view::{canonical_types, View, ViewKey};

pub use engine::messages::{
    SerializedComponent,
    SerializedEntity,
    SerializedEntityMap,
    SerializedState,
    SerializedStateMap,
    REMOVED_COMPONENT_PAYLOAD,
};

pub use engine::error::{
    ComponentError,
    EcmError,
    EcmResult,
    RegistryError,
    RegistryResult,
    TypeConflictError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used manager types.
///
/// Import with:
/// ```rust
/// use ecm_framework::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        register_component,
        Component,
        ComponentState,
        ComponentType,
        ComponentTypeId,
        Data,
        Entity,
        EntityComponentManager,
        SerializedState,
        SerializedStateMap,
        NULL_ENTITY,
    };
}
