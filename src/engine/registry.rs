//! # Type Registry
//!
//! Process-wide registry mapping [`ComponentTypeId`] values to the
//! capabilities the manager needs from previously-unseen component types:
//! constructing a default instance, constructing an instance from payload
//! bytes, and reporting metadata for diagnostics.
//!
//! ## Purpose
//! The registry decouples component identity from runtime storage. The
//! manager consults it before accepting a type-id it has not seen and
//! before deserialising components arriving in external state messages.
//!
//! ## Design
//! - Concrete component types self-register during an init phase via
//!   [`register_component`].
//! - Registration is idempotent for the same Rust type; a different type
//!   claiming an already-taken id is rejected.
//! - A per-type factory function constructs default instances; byte
//!   construction is default-then-deserialise.
//!
//! ## Invariants
//! - A registered type-id always has a descriptor with a working factory.
//! - `descriptor.type_id` equals the registration id.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and
//! serialized writes. [`clear_registry`] exists for test-scoped reset and
//! must not be called while a simulation is live.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::engine::component::{Component, ComponentType};
use crate::engine::error::{EcmResult, RegistryError, RegistryResult, TypeConflictError};
use crate::engine::types::ComponentTypeId;

/// Factory function constructing a default instance of a registered type.
type DefaultFactory = fn() -> Box<dyn Component>;

/// Metadata and capabilities recorded for a registered component type.
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    /// The registered component type-id.
    pub type_id: ComponentTypeId,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the registered Rust type.
    rust_type: TypeId,

    /// Default-instance factory.
    factory: DefaultFactory,
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .finish()
    }
}

fn make_default<T: ComponentType>() -> Box<dyn Component> {
    Box::new(T::default())
}

/// Registry state: descriptors keyed by component type-id.
#[derive(Default)]
struct TypeRegistry {
    by_id: HashMap<ComponentTypeId, ComponentDescriptor>,
}

static REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();

fn type_registry() -> &'static RwLock<TypeRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(TypeRegistry::default()))
}

impl TypeRegistry {
    fn register<T: ComponentType>(&mut self) -> RegistryResult<ComponentTypeId> {
        let rust_type = TypeId::of::<T>();
        if let Some(existing) = self.by_id.get(&T::TYPE_ID) {
            if existing.rust_type == rust_type {
                return Ok(T::TYPE_ID);
            }
            return Err(TypeConflictError {
                type_id: T::TYPE_ID,
                existing: existing.name,
                incoming: std::any::type_name::<T>(),
            }
            .into());
        }

        self.by_id.insert(
            T::TYPE_ID,
            ComponentDescriptor {
                type_id: T::TYPE_ID,
                name: std::any::type_name::<T>(),
                rust_type,
                factory: make_default::<T>,
            },
        );
        Ok(T::TYPE_ID)
    }
}

/// Registers component type `T` in the global registry and returns its
/// type-id.
///
/// ## Behavior
/// - Registering the same type twice is idempotent.
/// - A different type claiming an already-registered id is rejected with
///   [`RegistryError::Conflict`].
pub fn register_component<T: ComponentType>() -> EcmResult<ComponentTypeId> {
    let mut registry = type_registry()
        .write()
        .map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.register::<T>()?)
}

/// Returns `true` if `type_id` has been registered in this process.
pub fn has_type(type_id: ComponentTypeId) -> bool {
    match type_registry().read() {
        Ok(registry) => registry.by_id.contains_key(&type_id),
        Err(_) => false,
    }
}

/// Returns a copy of the descriptor registered for `type_id`, if any.
pub fn descriptor(type_id: ComponentTypeId) -> Option<ComponentDescriptor> {
    match type_registry().read() {
        Ok(registry) => registry.by_id.get(&type_id).copied(),
        Err(_) => None,
    }
}

/// Constructs a default instance of the component type registered under
/// `type_id`.
///
/// ## Errors
/// Returns [`RegistryError::NotRegistered`] if the id is unknown.
pub fn new_default(type_id: ComponentTypeId) -> EcmResult<Box<dyn Component>> {
    let registry = type_registry()
        .read()
        .map_err(|_| RegistryError::PoisonedLock)?;
    let descriptor = registry
        .by_id
        .get(&type_id)
        .ok_or(RegistryError::NotRegistered { type_id })?;
    Ok((descriptor.factory)())
}

/// Constructs an instance of the component type registered under `type_id`
/// and decodes `bytes` onto it.
///
/// ## Errors
/// Propagates [`RegistryError::NotRegistered`] for unknown ids and the
/// component's own codec error when the payload does not decode.
pub fn new_from_bytes(type_id: ComponentTypeId, bytes: &[u8]) -> EcmResult<Box<dyn Component>> {
    let mut component = new_default(type_id)?;
    component.deserialize(bytes)?;
    Ok(component)
}

/// Removes every registration. Test-scoped reset only; never call while a
/// simulation is live.
pub fn clear_registry() {
    if let Ok(mut registry) = type_registry().write() {
        registry.by_id.clear();
    }
}
