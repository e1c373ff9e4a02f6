use crate::Kind;
use thiserror::Error;

/// Errors raised by the database. All variants are structural/programming
/// errors; the database performs no I/O and never fails for that reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// A lookup-by-name within a kind table found nothing.
    #[error("no entity named {name:?} in kind table {kind:?}")]
    NameNotFound {
        /// The kind table that was searched.
        kind: Kind,
        /// The name that was not found.
        name: String,
    },

    /// An attribute required for emission/validation was never set.
    #[error("entity is missing a required attribute for kind {0:?}")]
    MissingAttribute(Kind),

    /// A child id does not belong to the kind an edge declares, or an entity
    /// was asked to behave as a kind it was never registered as.
    #[error("kind mismatch: expected {expected:?}, found {found:?}")]
    KindMismatch {
        /// The kind the caller expected.
        expected: Kind,
        /// The kind actually found (`None` if the entity is unregistered).
        found: Option<Kind>,
    },

    /// `assert_valid` found a cycle in the parent relation.
    #[error("cycle detected in parent relation")]
    CycleDetected,

    /// `assert_valid` found a `modes` reference that does not resolve to a
    /// `type.mode` child of an ancestor.
    #[error("mode reference {0:?} does not resolve to an ancestor's type.mode child")]
    DanglingModeRef(crate::EntityId),

    /// `assert_valid` found an `enum_ref` that is not reachable from the
    /// field's ancestry.
    #[error("enum reference {0:?} is not reachable from the field's ancestry")]
    DanglingEnumRef(crate::EntityId),

    /// `assert_valid` found an `instance.peripheral` whose target type is
    /// neither a `type.peripheral` nor a `type.register_group`.
    #[error("instance {0:?} targets a type that is neither a peripheral nor a register group")]
    InvalidInstanceType(crate::EntityId),

    /// `assert_valid` found a child edge whose child kind does not match the
    /// edge it was registered under, or whose recorded parent disagrees.
    #[error("broken parent/child edge at {0:?}")]
    BrokenEdge(crate::EntityId),
}
