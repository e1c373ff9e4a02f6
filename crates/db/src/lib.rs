//! Entity-attribute database for peripheral descriptions.
//!
//! A [`Database`] holds every entity discovered by a dialect loader as
//! an opaque, monotonically increasing id. An entity's only intrinsic type
//! information is membership in one [`Kind`] table; everything else — name,
//! description, offset, size, access, reset value, parent/child edges — is a
//! sparse attribute keyed by that id. The shape mirrors the "opaque integer
//! plus sparse maps" model the source tool uses, kept here as one `Kind` enum
//! plus per-attribute [`indexmap::IndexMap`]s so iteration order (and so
//! generator output) is insertion-order and therefore deterministic.
//!
//! The database does no I/O and is not freed piecemeal: a loader builds one
//! from scratch, the generator and JSON codec read it, and it is dropped as
//! a unit when the caller is done with it.

mod builders;
mod error;
mod kind;

pub use error::DbError;
pub use kind::Kind;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// An opaque entity id. Ids are assigned by [`Database::create_entity`] in
/// increasing order and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// How software may interact with a register or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Reads only; writes are undefined or ignored.
    ReadOnly,
    /// Writes only; reads are undefined.
    WriteOnly,
    /// Both reads and writes are well-defined.
    ReadWrite,
}

/// The `{value, qualifier}` payload carried by a `type.mode` entity.
///
/// `qualifier` is a dotted path (`PERIPHERAL.MODE.REG.FIELD`) telling the
/// generator which field to read to detect whether this mode is active;
/// `value` is a whitespace-separated list of integer literals the field may
/// hold while the mode applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePayload {
    /// Whitespace-separated integer literals identifying this mode.
    pub value: String,
    /// Dotted path to the field whose value selects this mode.
    pub qualifier: String,
}

fn set_once<V>(map: &mut IndexMap<EntityId, V>, id: EntityId, value: V) {
    let previous = map.insert(id, value);
    assert!(previous.is_none(), "attribute already set for {id:?}");
}

/// The entity-attribute-relational store of the whole peripheral description.
#[derive(Debug, Default)]
pub struct Database {
    next_id: u32,
    kind_of: IndexMap<EntityId, Kind>,
    kind_members: IndexMap<Kind, IndexSet<EntityId>>,
    name_index: IndexMap<(Kind, String), EntityId>,

    names: IndexMap<EntityId, String>,
    descriptions: IndexMap<EntityId, String>,
    offsets: IndexMap<EntityId, u64>,
    sizes: IndexMap<EntityId, u64>,
    accesses: IndexMap<EntityId, Access>,
    reset_values: IndexMap<EntityId, u64>,
    reset_masks: IndexMap<EntityId, u64>,
    versions: IndexMap<EntityId, String>,
    enum_refs: IndexMap<EntityId, EntityId>,
    modes: IndexMap<EntityId, IndexSet<EntityId>>,
    parents: IndexMap<EntityId, EntityId>,
    /// `instance.peripheral[i] = T`, the only cross-reference from an
    /// instance entity to a type entity.
    instance_of: IndexMap<EntityId, EntityId>,
    /// Intrinsic payload of a `type.enum_field`: its numeric value.
    enum_field_values: IndexMap<EntityId, i64>,
    /// Intrinsic payload of a `type.mode`.
    mode_payloads: IndexMap<EntityId, ModePayload>,
    /// Intrinsic payload of an `instance.interrupt`: its vector number.
    interrupt_values: IndexMap<EntityId, u32>,

    children: IndexMap<EntityId, IndexMap<Kind, IndexSet<EntityId>>>,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity id. The entity has no kind and no attributes
    /// until [`Database::register_as`] and the attribute setters are called.
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers `id` as a member of `kind`'s table. An id may be registered
    /// exactly once; registering it twice is a programming error.
    pub fn register_as(&mut self, id: EntityId, kind: Kind) {
        let previous = self.kind_of.insert(id, kind);
        assert!(previous.is_none(), "entity {id:?} already registered as a kind");
        self.kind_members.entry(kind).or_default().insert(id);
    }

    /// Adds `child` to the `children.<child_kind>` set of `parent` and sets
    /// `child`'s `parent` attribute. Fails with [`DbError::KindMismatch`] if
    /// `child` is not actually a member of `child_kind`'s table or if
    /// `parent_kind -> child_kind` is not an allowed edge.
    pub fn add_child(
        &mut self,
        parent: EntityId,
        child: EntityId,
        child_kind: Kind,
    ) -> Result<(), DbError> {
        let parent_kind = self.kind_of(parent).ok_or(DbError::KindMismatch {
            expected: child_kind,
            found: None,
        })?;
        let actual_child_kind = self.kind_of(child).ok_or(DbError::KindMismatch {
            expected: child_kind,
            found: None,
        })?;
        if actual_child_kind != child_kind {
            return Err(DbError::KindMismatch {
                expected: child_kind,
                found: Some(actual_child_kind),
            });
        }
        if !parent_kind.allows_child(child_kind) {
            return Err(DbError::KindMismatch {
                expected: child_kind,
                found: Some(actual_child_kind),
            });
        }
        assert!(
            !self.parents.contains_key(&child),
            "entity {child:?} already has a parent"
        );
        self.children
            .entry(parent)
            .or_default()
            .entry(child_kind)
            .or_default()
            .insert(child);
        self.parents.insert(child, parent);
        Ok(())
    }

    // --- attribute setters -------------------------------------------------

    /// Sets `name` and indexes it for [`Database::find_by_name`]. Names are
    /// not required to be unique across kinds; disambiguating same-named
    /// types is left to the generator.
    pub fn set_name(&mut self, id: EntityId, name: impl Into<String>) {
        let name = name.into();
        if let Some(kind) = self.kind_of(id) {
            self.name_index.insert((kind, name.clone()), id);
        }
        set_once(&mut self.names, id, name);
    }

    /// Sets free-text `description`.
    pub fn set_description(&mut self, id: EntityId, description: impl Into<String>) {
        set_once(&mut self.descriptions, id, description.into());
    }

    /// Sets `offset`, in the unit the source dialect uses.
    pub fn set_offset(&mut self, id: EntityId, offset: u64) {
        set_once(&mut self.offsets, id, offset);
    }

    /// Sets `size` in bits.
    pub fn set_size(&mut self, id: EntityId, size: u64) {
        set_once(&mut self.sizes, id, size);
    }

    /// Sets `access`.
    pub fn set_access(&mut self, id: EntityId, access: Access) {
        set_once(&mut self.accesses, id, access);
    }

    /// Sets `reset_value`.
    pub fn set_reset_value(&mut self, id: EntityId, reset_value: u64) {
        set_once(&mut self.reset_values, id, reset_value);
    }

    /// Sets `reset_mask`.
    pub fn set_reset_mask(&mut self, id: EntityId, reset_mask: u64) {
        set_once(&mut self.reset_masks, id, reset_mask);
    }

    /// Sets `version`.
    pub fn set_version(&mut self, id: EntityId, version: impl Into<String>) {
        set_once(&mut self.versions, id, version.into());
    }

    /// Sets a field's `enum_ref`. Whether the target actually resolves to a
    /// sibling enum is checked by [`Database::assert_valid`], not here.
    pub fn set_enum_ref(&mut self, field: EntityId, enum_id: EntityId) {
        set_once(&mut self.enum_refs, field, enum_id);
    }

    /// Sets a register's or field's `modes` set. Whether those modes
    /// actually belong to an ancestor peripheral is checked by
    /// [`Database::assert_valid`], not here.
    pub fn set_modes(&mut self, id: EntityId, modes: IndexSet<EntityId>) {
        set_once(&mut self.modes, id, modes);
    }

    /// Sets an `instance.peripheral`'s target type.
    pub fn set_instance_of(&mut self, instance: EntityId, type_id: EntityId) {
        set_once(&mut self.instance_of, instance, type_id);
    }

    /// Sets a `type.enum_field`'s numeric value.
    pub fn set_enum_field_value(&mut self, id: EntityId, value: i64) {
        set_once(&mut self.enum_field_values, id, value);
    }

    /// Sets a `type.mode`'s `{value, qualifier}` payload.
    pub fn set_mode_payload(&mut self, id: EntityId, payload: ModePayload) {
        set_once(&mut self.mode_payloads, id, payload);
    }

    /// Sets an `instance.interrupt`'s vector number.
    pub fn set_interrupt_value(&mut self, id: EntityId, value: u32) {
        set_once(&mut self.interrupt_values, id, value);
    }

    // --- queries ------------------------------------------------------------

    /// The kind `id` was registered as, if any.
    pub fn kind_of(&self, id: EntityId) -> Option<Kind> {
        self.kind_of.get(&id).copied()
    }

    /// Tests whether `id` is a member of `kind`'s table.
    pub fn entity_is(&self, kind: Kind, id: EntityId) -> bool {
        self.kind_of(id) == Some(kind)
    }

    /// Iterates every entity registered as `kind`, in insertion order.
    pub fn iter_kind(&self, kind: Kind) -> impl Iterator<Item = EntityId> + '_ {
        self.kind_members
            .get(&kind)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Looks up an entity of `kind` by its `name` attribute.
    pub fn find_by_name(&self, kind: Kind, name: &str) -> Result<EntityId, DbError> {
        self.name_index
            .get(&(kind, name.to_string()))
            .copied()
            .ok_or_else(|| DbError::NameNotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// The ordered set of `id`'s children of kind `child_kind`.
    pub fn children(&self, id: EntityId, child_kind: Kind) -> impl Iterator<Item = EntityId> + '_ {
        self.children
            .get(&id)
            .and_then(|m| m.get(&child_kind))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All of `id`'s children, across every kind, grouped by kind in the
    /// order the kinds were first populated.
    pub fn all_children(&self, id: EntityId) -> impl Iterator<Item = (Kind, EntityId)> + '_ {
        self.children
            .get(&id)
            .into_iter()
            .flat_map(|m| m.iter().flat_map(|(k, set)| set.iter().map(move |c| (*k, *c))))
    }

    /// `id`'s ancestors, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(self.parent(id), move |cur| self.parent(*cur))
    }

    /// Returns `id`'s parent, if one was set via [`Database::add_child`].
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    /// Returns `id`'s `name` attribute.
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Returns `id`'s `description` attribute.
    pub fn description(&self, id: EntityId) -> Option<&str> {
        self.descriptions.get(&id).map(String::as_str)
    }

    /// Returns `id`'s `offset` attribute.
    pub fn offset(&self, id: EntityId) -> Option<u64> {
        self.offsets.get(&id).copied()
    }

    /// Returns `id`'s `size` attribute.
    pub fn size(&self, id: EntityId) -> Option<u64> {
        self.sizes.get(&id).copied()
    }

    /// Returns `id`'s `access` attribute.
    pub fn access(&self, id: EntityId) -> Option<Access> {
        self.accesses.get(&id).copied()
    }

    /// Returns `id`'s `reset_value` attribute.
    pub fn reset_value(&self, id: EntityId) -> Option<u64> {
        self.reset_values.get(&id).copied()
    }

    /// Returns `id`'s `reset_mask` attribute.
    pub fn reset_mask(&self, id: EntityId) -> Option<u64> {
        self.reset_masks.get(&id).copied()
    }

    /// Returns `id`'s `version` attribute.
    pub fn version(&self, id: EntityId) -> Option<&str> {
        self.versions.get(&id).map(String::as_str)
    }

    /// Returns a field's `enum_ref` attribute.
    pub fn enum_ref(&self, id: EntityId) -> Option<EntityId> {
        self.enum_refs.get(&id).copied()
    }

    /// Returns `id`'s `modes` attribute.
    pub fn modes(&self, id: EntityId) -> Option<&IndexSet<EntityId>> {
        self.modes.get(&id)
    }

    /// Returns an `instance.peripheral`'s target type.
    pub fn instance_of(&self, id: EntityId) -> Option<EntityId> {
        self.instance_of.get(&id).copied()
    }

    /// Returns a `type.enum_field`'s numeric value.
    pub fn enum_field_value(&self, id: EntityId) -> Option<i64> {
        self.enum_field_values.get(&id).copied()
    }

    /// Returns a `type.mode`'s `{value, qualifier}` payload.
    pub fn mode_payload(&self, id: EntityId) -> Option<&ModePayload> {
        self.mode_payloads.get(&id)
    }

    /// Returns an `instance.interrupt`'s vector number.
    pub fn interrupt_value(&self, id: EntityId) -> Option<u32> {
        self.interrupt_values.get(&id).copied()
    }

    /// Checks every structural invariant: registered kinds, well-formed
    /// parent/child edges, an acyclic tree, modes scoped to their owning
    /// peripheral, resolvable enum references, and instance targets that are
    /// actually types. Called by loaders after a load completes and by the
    /// generator/codec before they read the database.
    pub fn assert_valid(&self) -> Result<(), DbError> {
        self.check_edges()?;
        self.check_acyclic()?;
        self.check_mode_scope()?;
        self.check_enum_scope()?;
        self.check_instance_typing()?;
        Ok(())
    }

    fn check_edges(&self) -> Result<(), DbError> {
        for (parent, by_kind) in &self.children {
            for (child_kind, set) in by_kind {
                for child in set {
                    if self.kind_of(*child) != Some(*child_kind) {
                        return Err(DbError::BrokenEdge(*child));
                    }
                    if self.parent(*child) != Some(*parent) {
                        return Err(DbError::BrokenEdge(*child));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_acyclic(&self) -> Result<(), DbError> {
        for id in self.kind_of.keys().copied() {
            let mut visited = IndexSet::new();
            visited.insert(id);
            let mut cur = id;
            while let Some(parent) = self.parent(cur) {
                if !visited.insert(parent) {
                    return Err(DbError::CycleDetected);
                }
                cur = parent;
            }
        }
        Ok(())
    }

    fn check_mode_scope(&self) -> Result<(), DbError> {
        for (id, mode_set) in &self.modes {
            for mode_id in mode_set {
                if self.kind_of(*mode_id) != Some(Kind::TypeMode) {
                    return Err(DbError::DanglingModeRef(*mode_id));
                }
                let resolves = self
                    .ancestors(*id)
                    .any(|ancestor| self.children(ancestor, Kind::TypeMode).any(|m| m == *mode_id));
                if !resolves {
                    return Err(DbError::DanglingModeRef(*mode_id));
                }
            }
        }
        Ok(())
    }

    fn check_enum_scope(&self) -> Result<(), DbError> {
        for (field, enum_id) in &self.enum_refs {
            if self.kind_of(*enum_id) != Some(Kind::TypeEnum) {
                return Err(DbError::DanglingEnumRef(*enum_id));
            }
            let resolves = self
                .ancestors(*field)
                .any(|ancestor| self.children(ancestor, Kind::TypeEnum).any(|e| e == *enum_id));
            if !resolves {
                return Err(DbError::DanglingEnumRef(*enum_id));
            }
        }
        Ok(())
    }

    fn check_instance_typing(&self) -> Result<(), DbError> {
        for instance in self.iter_kind(Kind::InstancePeripheral) {
            let target = self
                .instance_of(instance)
                .ok_or(DbError::MissingAttribute(Kind::InstancePeripheral))?;
            match self.kind_of(target) {
                Some(Kind::TypePeripheral) | Some(Kind::TypeRegisterGroup) => {}
                _ => return Err(DbError::InvalidInstanceType(instance)),
            }
        }
        Ok(())
    }
}
