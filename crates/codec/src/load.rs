use indexmap::IndexSet;
use perigen_db::{Access, Database, EntityId, ModePayload};
use serde_json::Value;

use crate::CodecError;

pub(crate) fn load(value: &Value) -> Result<Database, CodecError> {
    let mut db = Database::new();

    if let Some(peripherals) = value
        .get("types")
        .and_then(|t| t.get("peripherals"))
        .and_then(Value::as_object)
    {
        for (name, body) in peripherals {
            load_peripheral(&mut db, name, body)?;
        }
    }

    if let Some(devices) = value.get("devices").and_then(Value::as_object) {
        for (name, body) in devices {
            load_device(&mut db, name, body)?;
        }
    }

    db.assert_valid()?;
    tracing::debug!(
        peripherals = db.iter_kind(perigen_db::Kind::TypePeripheral).count(),
        devices = db.iter_kind(perigen_db::Kind::InstanceDevice).count(),
        "loaded database from canonical JSON"
    );
    Ok(db)
}

fn load_peripheral(db: &mut Database, name: &str, body: &Value) -> Result<EntityId, CodecError> {
    let peripheral = db.create_peripheral(Some(name));
    load_peripheral_body(db, peripheral, body)
}

fn load_register_group(
    db: &mut Database,
    parent: EntityId,
    peripheral_root: EntityId,
    name: &str,
    body: &Value,
) -> Result<EntityId, CodecError> {
    let group = db.create_register_group(parent, Some(name))?;
    if let Some(offset) = body.get("offset").and_then(Value::as_u64) {
        db.set_offset(group, offset);
    }
    apply_description(db, group, body);

    let children = body.get("children");
    if let Some(modes) = children.and_then(|c| c.get("modes")).and_then(Value::as_object) {
        for (mode_name, mode_body) in modes {
            load_mode(db, group, mode_name, mode_body)?;
        }
    }
    if let Some(registers) = children.and_then(|c| c.get("registers")).and_then(Value::as_object) {
        for (reg_name, reg_body) in registers {
            load_register(db, group, peripheral_root, reg_name, reg_body)?;
        }
    }
    if let Some(groups) = children
        .and_then(|c| c.get("register_groups"))
        .and_then(Value::as_object)
    {
        for (group_name, group_body) in groups {
            load_register_group(db, group, peripheral_root, group_name, group_body)?;
        }
    }

    Ok(group)
}

fn load_register(
    db: &mut Database,
    parent: EntityId,
    peripheral_root: EntityId,
    name: &str,
    body: &Value,
) -> Result<EntityId, CodecError> {
    let register = db.create_register(parent, name)?;
    if let Some(offset) = body.get("offset").and_then(Value::as_u64) {
        db.set_offset(register, offset);
    }
    if let Some(size) = body.get("size").and_then(Value::as_u64) {
        db.set_size(register, size);
    }
    apply_access(db, register, body);
    if let Some(v) = body.get("reset_value").and_then(Value::as_u64) {
        db.set_reset_value(register, v);
    }
    if let Some(v) = body.get("reset_mask").and_then(Value::as_u64) {
        db.set_reset_mask(register, v);
    }
    apply_description(db, register, body);
    apply_modes(db, register, body)?;

    if let Some(fields) = body
        .get("children")
        .and_then(|c| c.get("fields"))
        .and_then(Value::as_object)
    {
        for (field_name, field_body) in fields {
            load_field(db, register, peripheral_root, field_name, field_body)?;
        }
    }

    Ok(register)
}

fn load_field(
    db: &mut Database,
    register: EntityId,
    peripheral_root: EntityId,
    name: &str,
    body: &Value,
) -> Result<EntityId, CodecError> {
    let field = db.create_field(register, name)?;
    if let Some(offset) = body.get("offset").and_then(Value::as_u64) {
        db.set_offset(field, offset);
    }
    if let Some(size) = body.get("size").and_then(Value::as_u64) {
        db.set_size(field, size);
    }
    apply_access(db, field, body);
    apply_description(db, field, body);
    apply_modes(db, field, body)?;

    if let Some(enum_ref) = body.get("enum_ref").and_then(Value::as_str) {
        let enum_id = db.find_by_name(perigen_db::Kind::TypeEnum, enum_ref)?;
        db.set_enum_ref(field, enum_id);
    } else if let Some(enum_body) = body.get("enum") {
        let enum_id = load_enum(db, peripheral_root, None, enum_body)?;
        db.set_enum_ref(field, enum_id);
    }

    Ok(field)
}

fn load_enum(
    db: &mut Database,
    peripheral: EntityId,
    name: Option<&str>,
    body: &Value,
) -> Result<EntityId, CodecError> {
    let enum_id = db.create_enum(peripheral, name)?;
    if let Some(size) = body.get("size").and_then(Value::as_u64) {
        db.set_size(enum_id, size);
    }
    apply_description(db, enum_id, body);

    if let Some(fields) = body
        .get("children")
        .and_then(|c| c.get("enum_fields"))
        .and_then(Value::as_object)
    {
        for (field_name, field_value) in fields {
            let value = field_value
                .as_i64()
                .or_else(|| field_value.as_u64().map(|v| v as i64))
                .ok_or_else(|| CodecError::Malformed(format!("enum field {field_name} has no integer value")))?;
            db.create_enum_field(enum_id, field_name, value)?;
        }
    }

    Ok(enum_id)
}

fn load_mode(db: &mut Database, parent: EntityId, name: &str, body: &Value) -> Result<EntityId, CodecError> {
    let value = body
        .get("value")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let qualifier = body
        .get("qualifier")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(db.create_mode(parent, name, value, qualifier)?)
}

fn load_device(db: &mut Database, name: &str, body: &Value) -> Result<EntityId, CodecError> {
    let device = db.create_device(name);
    apply_description(db, device, body);

    let children = body.get("children");
    if let Some(peripherals) = children
        .and_then(|c| c.get("peripherals"))
        .and_then(Value::as_object)
    {
        for (instance_name, instance_body) in peripherals {
            load_peripheral_instance(db, device, instance_name, instance_body)?;
        }
    }
    if let Some(interrupts) = children.and_then(|c| c.get("interrupts")).and_then(Value::as_object) {
        for (interrupt_name, interrupt_value) in interrupts {
            let value = interrupt_value.as_u64().ok_or_else(|| {
                CodecError::Malformed(format!("interrupt {interrupt_name} has no integer value"))
            })? as u32;
            db.create_interrupt_instance(device, interrupt_name, value)?;
        }
    }

    Ok(device)
}

fn load_peripheral_instance(
    db: &mut Database,
    device: EntityId,
    name: &str,
    body: &Value,
) -> Result<EntityId, CodecError> {
    let offset = body.get("offset").and_then(Value::as_u64).unwrap_or(0);
    let type_value = body
        .get("type")
        .ok_or_else(|| CodecError::Malformed(format!("peripheral instance {name} is missing a type")))?;
    let type_id = match type_value {
        Value::String(path) => resolve_type_path(db, path)?,
        Value::Object(_) => load_anonymous_type(db, type_value)?,
        _ => return Err(CodecError::Malformed(format!("peripheral instance {name} has a malformed type"))),
    };

    let instance = db.create_peripheral_instance(device, name, type_id, offset)?;
    apply_version(db, instance, body);
    apply_description(db, instance, body);
    Ok(instance)
}

/// Resolves a dotted `PERIPHERAL.GROUP.GROUP` cross-reference path back to
/// the entity it names.
fn resolve_type_path(db: &Database, path: &str) -> Result<EntityId, CodecError> {
    let mut segments = path.split('.');
    let root_name = segments
        .next()
        .ok_or_else(|| CodecError::Malformed(format!("empty type path {path:?}")))?;
    let mut current = db.find_by_name(perigen_db::Kind::TypePeripheral, root_name)?;
    for segment in segments {
        current = db.find_by_name(perigen_db::Kind::TypeRegisterGroup, segment)?;
    }
    Ok(current)
}

/// Rebuilds an unnamed `type.peripheral` inlined at an instance's `type`
/// slot instead of referenced by path.
fn load_anonymous_type(db: &mut Database, body: &Value) -> Result<EntityId, CodecError> {
    let peripheral = db.create_peripheral(None);
    load_peripheral_body(db, peripheral, body)
}

fn load_peripheral_body(db: &mut Database, peripheral: EntityId, body: &Value) -> Result<EntityId, CodecError> {
    apply_description(db, peripheral, body);
    apply_version(db, peripheral, body);

    let children = body.get("children");
    if let Some(enums) = children.and_then(|c| c.get("enums")).and_then(Value::as_object) {
        for (enum_name, enum_body) in enums {
            load_enum(db, peripheral, Some(enum_name), enum_body)?;
        }
    }
    if let Some(modes) = children.and_then(|c| c.get("modes")).and_then(Value::as_object) {
        for (mode_name, mode_body) in modes {
            load_mode(db, peripheral, mode_name, mode_body)?;
        }
    }
    if let Some(registers) = children.and_then(|c| c.get("registers")).and_then(Value::as_object) {
        for (reg_name, reg_body) in registers {
            load_register(db, peripheral, peripheral, reg_name, reg_body)?;
        }
    }
    if let Some(groups) = children
        .and_then(|c| c.get("register_groups"))
        .and_then(Value::as_object)
    {
        for (group_name, group_body) in groups {
            load_register_group(db, peripheral, peripheral, group_name, group_body)?;
        }
    }

    Ok(peripheral)
}

fn apply_description(db: &mut Database, id: EntityId, body: &Value) {
    if let Some(d) = body.get("description").and_then(Value::as_str) {
        db.set_description(id, d);
    }
}

fn apply_version(db: &mut Database, id: EntityId, body: &Value) {
    if let Some(v) = body.get("version").and_then(Value::as_str) {
        db.set_version(id, v);
    }
}

fn apply_access(db: &mut Database, id: EntityId, body: &Value) {
    let access = match body.get("access").and_then(Value::as_str) {
        Some("read-only") => Access::ReadOnly,
        Some("write-only") => Access::WriteOnly,
        Some(_) => Access::ReadWrite,
        None => Access::ReadWrite,
    };
    db.set_access(id, access);
}

fn apply_modes(db: &mut Database, id: EntityId, body: &Value) -> Result<(), CodecError> {
    let Some(names) = body.get("modes").and_then(Value::as_array) else {
        return Ok(());
    };
    let mut set = IndexSet::new();
    for name in names {
        let name = name
            .as_str()
            .ok_or_else(|| CodecError::Malformed("mode name must be a string".to_string()))?;
        set.insert(db.find_by_name(perigen_db::Kind::TypeMode, name)?);
    }
    db.set_modes(id, set);
    Ok(())
}
