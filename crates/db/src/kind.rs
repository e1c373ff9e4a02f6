//! Entity kinds and the parent/child edges the database allows between them.

use serde::{Deserialize, Serialize};

/// Tags exactly one kind table an entity belongs to.
///
/// Membership in a `Kind` table is the only type information an entity
/// carries; every other property is a sparse attribute keyed by the entity's
/// id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// `type.peripheral` — a reusable peripheral template.
    TypePeripheral,
    /// `type.register_group` — a nested, reusable grouping of registers.
    TypeRegisterGroup,
    /// `type.register` — a memory-mapped register.
    TypeRegister,
    /// `type.field` — a bit-range inside a register.
    TypeField,
    /// `type.enum` — a named mapping of integers to symbolic names.
    TypeEnum,
    /// `type.enum_field` — one value of a `type.enum`.
    TypeEnumField,
    /// `type.mode` — a named operating configuration.
    TypeMode,
    /// `instance.device` — a concrete chip/device.
    InstanceDevice,
    /// `instance.peripheral` — a peripheral placed at a base address.
    InstancePeripheral,
    /// `instance.interrupt` — an interrupt line of a device.
    InstanceInterrupt,
}

impl Kind {
    /// Returns whether `self` is allowed to own a child of kind `child` per
    /// the edge table in the data model (device/type/instance graphs).
    ///
    /// `instance.peripheral -> instance.register_group` is not modeled: no
    /// supported dialect ever populates it, since SVD/ATDF instances are flat
    /// base-address placements rather than nested groups.
    pub fn allows_child(self, child: Kind) -> bool {
        use Kind::*;
        matches!(
            (self, child),
            (InstanceDevice, InstancePeripheral)
                | (InstanceDevice, InstanceInterrupt)
                | (TypePeripheral, TypeRegister)
                | (TypePeripheral, TypeRegisterGroup)
                | (TypePeripheral, TypeMode)
                | (TypePeripheral, TypeEnum)
                | (TypeRegisterGroup, TypeRegister)
                | (TypeRegisterGroup, TypeRegisterGroup)
                | (TypeRegisterGroup, TypeMode)
                | (TypeRegister, TypeField)
                | (TypeRegister, TypeMode)
                | (TypeEnum, TypeEnumField)
        )
    }
}
