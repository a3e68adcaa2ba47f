//! Error types for the type registry and component codec seams.
//!
//! This module declares focused, composable error types used across the
//! registry and component serialisation pipeline. Each error carries enough
//! context to make failures actionable while remaining small and cheap to
//! pass around or convert into the aggregate [`EcmError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g.
//!   a type-id claimed by two different Rust types, a payload that does not
//!   decode).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`EcmError`].
//! * **Actionability:** Structured fields (offending type-ids, the names of
//!   the conflicting Rust types) make logs useful without reproducing the
//!   issue.
//!
//! The manager facade itself is non-throwing: facade operations report
//! failure by returning `false`/`None` and logging a diagnostic. `Result`
//! values appear only on the registry and component-codec seams, where the
//! caller can meaningfully match on the failure.

use std::fmt;

use crate::engine::types::ComponentTypeId;

/// Returned when a component type-id is registered a second time by a
/// different Rust type.
///
/// Re-registering the *same* type under the same id is idempotent and is
/// not an error; a conflicting claim indicates two component definitions
/// sharing an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeConflictError {
    /// The contested component type-id.
    pub type_id: ComponentTypeId,

    /// Rust type name already registered under the id.
    pub existing: &'static str,

    /// Rust type name attempting the conflicting registration.
    pub incoming: &'static str,
}

impl fmt::Display for TypeConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component type id [{}] already registered by [{}]; rejected [{}]",
            self.type_id, self.existing, self.incoming
        )
    }
}

impl std::error::Error for TypeConflictError {}

/// Failures of the global type registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A type-id was claimed by two different Rust types.
    Conflict(TypeConflictError),

    /// A lookup or construction referenced a type-id that was never
    /// registered.
    NotRegistered {
        /// The unknown component type-id.
        type_id: ComponentTypeId,
    },

    /// The registry lock was poisoned by a panicking thread.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Conflict(e) => e.fmt(f),
            RegistryError::NotRegistered { type_id } => {
                write!(f, "component type id [{}] has not been registered", type_id)
            }
            RegistryError::PoisonedLock => write!(f, "type registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<TypeConflictError> for RegistryError {
    fn from(error: TypeConflictError) -> Self {
        RegistryError::Conflict(error)
    }
}

/// Failures of a component's byte codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component could not be encoded to bytes.
    Serialize {
        /// Type-id of the offending component.
        type_id: ComponentTypeId,
        /// Codec-provided reason.
        reason: String,
    },

    /// The payload bytes could not be decoded onto the component.
    Deserialize {
        /// Type-id of the offending component.
        type_id: ComponentTypeId,
        /// Codec-provided reason.
        reason: String,
    },
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentError::Serialize { type_id, reason } => {
                write!(f, "failed to serialize component of type [{}]: {}", type_id, reason)
            }
            ComponentError::Deserialize { type_id, reason } => {
                write!(f, "failed to deserialize component of type [{}]: {}", type_id, reason)
            }
        }
    }
}

impl std::error::Error for ComponentError {}

/// Aggregate error for the entity-component manager's fallible seams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcmError {
    /// A type-registry failure.
    Registry(RegistryError),

    /// A component codec failure.
    Component(ComponentError),
}

impl fmt::Display for EcmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcmError::Registry(e) => e.fmt(f),
            EcmError::Component(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for EcmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcmError::Registry(e) => Some(e),
            EcmError::Component(e) => Some(e),
        }
    }
}

impl From<RegistryError> for EcmError {
    fn from(error: RegistryError) -> Self {
        EcmError::Registry(error)
    }
}

impl From<TypeConflictError> for EcmError {
    fn from(error: TypeConflictError) -> Self {
        EcmError::Registry(RegistryError::Conflict(error))
    }
}

impl From<ComponentError> for EcmError {
    fn from(error: ComponentError) -> Self {
        EcmError::Component(error)
    }
}

/// Result alias for fallible manager seams.
pub type EcmResult<T> = Result<T, EcmError>;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
