//! Core Identifiers and State Enums
//!
//! This module defines the **fundamental types and identifiers** shared by
//! every subsystem of the entity-component manager: entity handles, component
//! type identifiers, component keys, and the change-state and
//! addition-result enums.
//!
//! ## Entity Representation
//!
//! Entities are opaque 64-bit identifiers. Zero is reserved as the null
//! entity ([`NULL_ENTITY`]). Identifiers are allocated strictly
//! monotonically by the manager and are never reused within a process;
//! `u64::MAX` is the saturation sentinel returned once the allocator is
//! exhausted.
//!
//! ## Component Type Identifiers
//!
//! Component types are identified by stable [`ComponentTypeId`] values,
//! unique per concrete component type across a process. Assignments are made
//! by the component author via [`ComponentType::TYPE_ID`] and recorded in the
//! global type registry.
//!
//! [`ComponentType::TYPE_ID`]: crate::engine::component::ComponentType::TYPE_ID

/// Globally unique entity identifier.
pub type Entity = u64;

/// The null entity. Never allocated; used as the "no entity" value, for
/// example as the parent of a root entity.
pub const NULL_ENTITY: Entity = 0;

/// Stable identifier for a concrete component type.
pub type ComponentTypeId = u64;

/// External handle to a stored component: the component type plus the
/// internal storage slot it occupies. The manager treats a key as
/// equivalent to an (entity, type-id) pair for removal and presence queries.
pub type ComponentKey = (ComponentTypeId, usize);

/// Change classification of a component, controlling how a delta reader
/// should treat a mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComponentState {
    /// The component has not changed since changes were last cleared.
    #[default]
    NoChange,

    /// A continuous update; a delta reader may coalesce or drop it.
    PeriodicChange,

    /// An event-like update; a delta reader must observe it exactly once.
    OneTimeChange,
}

/// Outcome of handing a component to storage.
///
/// The three success values exist because views need to know whether a
/// newly present (entity, type-id) pair just appeared for the first time
/// (which may change which views match the entity), reappeared in a slot
/// the views already know about, or merely overwrote a live instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentAdditionResult {
    /// The entity is unknown to storage; nothing was stored.
    FailedAddition,

    /// First time this component type was stored for this entity.
    NewAddition,

    /// A slot previously held this type, was cleared, and is now
    /// reinstated.
    ReAddition,

    /// The type was already live; the existing instance was replaced.
    Modification,
}
