//! Component capability traits and the generic payload component.
//!
//! A component is a polymorphic value owned by exactly one
//! (entity, type-id) pair. The manager stores components behind the
//! type-erased [`Component`] trait and hands out borrowed references;
//! concrete access goes through `Any` downcasting.
//!
//! ## Required capabilities
//! * a stable [`ComponentTypeId`] reported by every instance,
//! * a byte codec (`serialize`/`deserialize`) producing and consuming an
//!   opaque payload. The manager is format-agnostic with respect to these
//!   bytes; they travel verbatim inside state messages.
//!
//! ## Defining components
//! Most components are a payload type wrapped in [`Data`], which supplies
//! the codec via `bincode`:
//!
//! ```ignore
//! type Pose = Data<[f64; 3], 100>;
//! register_component::<Pose>()?;
//! ```
//!
//! Hand-written implementations of [`Component`] + [`ComponentType`] are
//! equally valid for types that need a custom wire form.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::error::ComponentError;
use crate::engine::types::ComponentTypeId;

/// Object-safe capability trait for stored components.
pub trait Component: Any + Send + Sync {
    /// Returns the stable type-id of this component's concrete type.
    fn component_type_id(&self) -> ComponentTypeId;

    /// Encodes the component to bytes, appending to `out`.
    fn serialize(&self, out: &mut Vec<u8>) -> Result<(), ComponentError>;

    /// Decodes `bytes` onto this component in place.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), ComponentError>;

    /// Upcast for concrete downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Static companion of [`Component`], required for registration and typed
/// lookups.
///
/// ## Invariants
/// * `T::TYPE_ID` equals `instance.component_type_id()` for every instance
///   of `T`.
/// * `TYPE_ID` values are unique per concrete type across the process; the
///   registry rejects conflicting claims.
pub trait ComponentType: Component + Default {
    /// The process-stable type-id of this component type.
    const TYPE_ID: ComponentTypeId;
}

/// Generic payload component: wraps any serde-serialisable value and gives
/// it a component identity.
///
/// The payload is encoded with `bincode`. Simulation components are
/// typically declared as type aliases:
///
/// ```ignore
/// type LinearVelocity = Data<[f64; 3], 12>;
/// type Name = Data<String, 13>;
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Data<T, const ID: u64> {
    /// The wrapped payload.
    pub data: T,
}

impl<T, const ID: u64> Data<T, ID> {
    /// Wraps a payload value.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T, const ID: u64> Component for Data<T, ID>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    fn component_type_id(&self) -> ComponentTypeId {
        ID
    }

    fn serialize(&self, out: &mut Vec<u8>) -> Result<(), ComponentError> {
        let bytes = bincode::serialize(&self.data).map_err(|e| ComponentError::Serialize {
            type_id: ID,
            reason: e.to_string(),
        })?;
        out.extend_from_slice(&bytes);
        Ok(())
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        self.data = bincode::deserialize(bytes).map_err(|e| ComponentError::Deserialize {
            type_id: ID,
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T, const ID: u64> ComponentType for Data<T, ID>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    const TYPE_ID: ComponentTypeId = ID;
}
