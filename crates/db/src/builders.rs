//! Convenience "create + register + attach" builders so loaders don't repeat
//! the same three calls for every entity they discover.

use crate::{Database, DbError, EntityId, Kind, ModePayload};

impl Database {
    /// Creates a `type.peripheral`. Peripherals are top-level, so there is
    /// no parent to attach to. `name` is `None` for anonymous peripherals,
    /// which only arise as an instance's inline target type and are never
    /// hoisted into the named top-level type table.
    pub fn create_peripheral(&mut self, name: Option<&str>) -> EntityId {
        let id = self.create_entity();
        self.register_as(id, Kind::TypePeripheral);
        if let Some(name) = name {
            self.set_name(id, name);
        }
        id
    }

    /// Creates a `type.register_group` and attaches it under `parent`
    /// (a `type.peripheral` or another `type.register_group`). `name` is
    /// `None` for anonymous groups, embedded inline at their use site
    /// rather than listed by name under their parent.
    pub fn create_register_group(
        &mut self,
        parent: EntityId,
        name: Option<&str>,
    ) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeRegisterGroup);
        if let Some(name) = name {
            self.set_name(id, name);
        }
        self.add_child(parent, id, Kind::TypeRegisterGroup)?;
        Ok(id)
    }

    /// Creates a `type.register` and attaches it under `parent`.
    pub fn create_register(&mut self, parent: EntityId, name: &str) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeRegister);
        self.set_name(id, name);
        self.add_child(parent, id, Kind::TypeRegister)?;
        Ok(id)
    }

    /// Creates a `type.field` and attaches it under `parent` (a
    /// `type.register`).
    pub fn create_field(&mut self, parent: EntityId, name: &str) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeField);
        self.set_name(id, name);
        self.add_child(parent, id, Kind::TypeField)?;
        Ok(id)
    }

    /// Creates a `type.enum` under `parent` (a `type.peripheral`). `name` is
    /// `None` for anonymous enums, which the generator inlines at their use
    /// site.
    pub fn create_enum(&mut self, parent: EntityId, name: Option<&str>) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeEnum);
        if let Some(name) = name {
            self.set_name(id, name);
        }
        self.add_child(parent, id, Kind::TypeEnum)?;
        Ok(id)
    }

    /// Creates a `type.enum_field` with its intrinsic numeric `value`, under
    /// `parent` (a `type.enum`).
    pub fn create_enum_field(
        &mut self,
        parent: EntityId,
        name: &str,
        value: i64,
    ) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeEnumField);
        self.set_name(id, name);
        self.set_enum_field_value(id, value);
        self.add_child(parent, id, Kind::TypeEnumField)?;
        Ok(id)
    }

    /// Creates a `type.mode` with its `{value, qualifier}` payload, under
    /// `parent` (a `type.peripheral` or `type.register_group`).
    pub fn create_mode(
        &mut self,
        parent: EntityId,
        name: &str,
        value: String,
        qualifier: String,
    ) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::TypeMode);
        self.set_name(id, name);
        self.set_mode_payload(id, ModePayload { value, qualifier });
        self.add_child(parent, id, Kind::TypeMode)?;
        Ok(id)
    }

    /// Creates an `instance.device`.
    pub fn create_device(&mut self, name: &str) -> EntityId {
        let id = self.create_entity();
        self.register_as(id, Kind::InstanceDevice);
        self.set_name(id, name);
        id
    }

    /// Creates an `instance.peripheral` placed under `device` at `base`,
    /// targeting `type_id` (a `type.peripheral` or `type.register_group`).
    pub fn create_peripheral_instance(
        &mut self,
        device: EntityId,
        name: &str,
        type_id: EntityId,
        base: u64,
    ) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::InstancePeripheral);
        self.set_name(id, name);
        self.set_offset(id, base);
        self.set_instance_of(id, type_id);
        self.add_child(device, id, Kind::InstancePeripheral)?;
        Ok(id)
    }

    /// Creates an `instance.interrupt` under `device` with vector `value`.
    pub fn create_interrupt_instance(
        &mut self,
        device: EntityId,
        name: &str,
        value: u32,
    ) -> Result<EntityId, DbError> {
        let id = self.create_entity();
        self.register_as(id, Kind::InstanceInterrupt);
        self.set_name(id, name);
        self.set_interrupt_value(id, value);
        self.add_child(device, id, Kind::InstanceInterrupt)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_produce_a_linked_tree() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("UART0"));
        let register = db.create_register(peripheral, "CR1").unwrap();
        let field = db.create_field(register, "EN").unwrap();
        let enum_id = db.create_enum(peripheral, Some("ENABLE")).unwrap();
        db.create_enum_field(enum_id, "DISABLED", 0).unwrap();
        db.create_enum_field(enum_id, "ENABLED", 1).unwrap();
        db.set_enum_ref(field, enum_id);

        let device = db.create_device("CHIP0");
        let instance = db
            .create_peripheral_instance(device, "UART0", peripheral, 0x4000_0000)
            .unwrap();
        assert_eq!(db.instance_of(instance), Some(peripheral));

        db.assert_valid().unwrap();
        assert_eq!(db.children(peripheral, Kind::TypeRegister).count(), 1);
        assert_eq!(db.children(register, Kind::TypeField).count(), 1);
        assert_eq!(db.children(enum_id, Kind::TypeEnumField).count(), 2);
    }

    #[test]
    fn anonymous_peripheral_and_register_group_have_no_name() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(None);
        let group = db.create_register_group(peripheral, None).unwrap();
        assert_eq!(db.name(peripheral), None);
        assert_eq!(db.name(group), None);
        db.assert_valid().unwrap();
    }
}
