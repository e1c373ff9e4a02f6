use perigen_db::{Access, Database, EntityId, Kind};
use serde_json::{Map, Value};

use crate::SCHEMA_VERSION;

pub(crate) fn emit(db: &Database) -> Value {
    let mut top = Map::new();
    top.insert("version".to_string(), Value::String(SCHEMA_VERSION.to_string()));

    let mut peripherals = Map::new();
    for id in db.iter_kind(Kind::TypePeripheral) {
        if let Some(name) = db.name(id) {
            peripherals.insert(name.to_string(), emit_peripheral(db, id));
        }
    }
    if !peripherals.is_empty() {
        let mut types = Map::new();
        types.insert("peripherals".to_string(), Value::Object(peripherals));
        top.insert("types".to_string(), Value::Object(types));
    }

    let mut devices = Map::new();
    for id in db.iter_kind(Kind::InstanceDevice) {
        if let Some(name) = db.name(id) {
            devices.insert(name.to_string(), emit_device(db, id));
        }
    }
    if !devices.is_empty() {
        top.insert("devices".to_string(), Value::Object(devices));
    }

    Value::Object(top)
}

fn emit_peripheral(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_description(db, id, &mut obj);
    put_version(db, id, &mut obj);

    let mut children = Map::new();
    emit_named_group(db, id, Kind::TypeEnum, "enums", emit_enum, &mut children);
    emit_named_group(db, id, Kind::TypeMode, "modes", emit_mode, &mut children);
    emit_named_group(db, id, Kind::TypeRegister, "registers", emit_register, &mut children);
    emit_named_group(
        db,
        id,
        Kind::TypeRegisterGroup,
        "register_groups",
        emit_register_group,
        &mut children,
    );
    if !children.is_empty() {
        obj.insert("children".to_string(), Value::Object(children));
    }
    Value::Object(obj)
}

fn emit_register_group(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_offset(db, id, &mut obj);
    put_description(db, id, &mut obj);

    let mut children = Map::new();
    emit_named_group(db, id, Kind::TypeMode, "modes", emit_mode, &mut children);
    emit_named_group(db, id, Kind::TypeRegister, "registers", emit_register, &mut children);
    emit_named_group(
        db,
        id,
        Kind::TypeRegisterGroup,
        "register_groups",
        emit_register_group,
        &mut children,
    );
    if !children.is_empty() {
        obj.insert("children".to_string(), Value::Object(children));
    }
    Value::Object(obj)
}

fn emit_register(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_offset(db, id, &mut obj);
    put_size(db, id, &mut obj);
    put_access(db, id, &mut obj);
    if let Some(v) = db.reset_value(id) {
        obj.insert("reset_value".to_string(), Value::from(v));
    }
    if let Some(v) = db.reset_mask(id) {
        obj.insert("reset_mask".to_string(), Value::from(v));
    }
    put_description(db, id, &mut obj);
    put_modes(db, id, &mut obj);

    let mut children = Map::new();
    emit_named_group(db, id, Kind::TypeField, "fields", emit_field, &mut children);
    if !children.is_empty() {
        obj.insert("children".to_string(), Value::Object(children));
    }
    Value::Object(obj)
}

fn emit_field(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_offset(db, id, &mut obj);
    put_size(db, id, &mut obj);
    put_access(db, id, &mut obj);
    put_description(db, id, &mut obj);
    put_modes(db, id, &mut obj);

    if let Some(enum_id) = db.enum_ref(id) {
        match db.name(enum_id) {
            Some(name) => {
                obj.insert("enum_ref".to_string(), Value::String(name.to_string()));
            }
            None => {
                obj.insert("enum".to_string(), emit_enum(db, enum_id));
            }
        }
    }
    Value::Object(obj)
}

fn emit_enum(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_size(db, id, &mut obj);
    put_description(db, id, &mut obj);

    let mut fields = Map::new();
    for field in db.children(id, Kind::TypeEnumField) {
        if let Some(name) = db.name(field) {
            let value = db.enum_field_value(field).unwrap_or(0);
            fields.insert(name.to_string(), Value::from(value));
        }
    }
    if !fields.is_empty() {
        let mut children = Map::new();
        children.insert("enum_fields".to_string(), Value::Object(fields));
        obj.insert("children".to_string(), Value::Object(children));
    }
    Value::Object(obj)
}

fn emit_mode(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    if let Some(payload) = db.mode_payload(id) {
        obj.insert("value".to_string(), Value::String(payload.value.clone()));
        obj.insert("qualifier".to_string(), Value::String(payload.qualifier.clone()));
    }
    Value::Object(obj)
}

fn emit_device(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_description(db, id, &mut obj);

    let mut children = Map::new();
    let mut instances = Map::new();
    for instance in db.children(id, Kind::InstancePeripheral) {
        if let Some(name) = db.name(instance) {
            instances.insert(name.to_string(), emit_peripheral_instance(db, instance));
        }
    }
    if !instances.is_empty() {
        children.insert("peripherals".to_string(), Value::Object(instances));
    }

    let mut interrupts = Map::new();
    for interrupt in db.children(id, Kind::InstanceInterrupt) {
        if let Some(name) = db.name(interrupt) {
            let value = db.interrupt_value(interrupt).unwrap_or(0);
            interrupts.insert(name.to_string(), Value::from(value));
        }
    }
    if !interrupts.is_empty() {
        children.insert("interrupts".to_string(), Value::Object(interrupts));
    }

    if !children.is_empty() {
        obj.insert("children".to_string(), Value::Object(children));
    }
    Value::Object(obj)
}

fn emit_peripheral_instance(db: &Database, id: EntityId) -> Value {
    let mut obj = Map::new();
    put_offset(db, id, &mut obj);
    put_version(db, id, &mut obj);
    put_description(db, id, &mut obj);
    if let Some(type_id) = db.instance_of(id) {
        let type_value = match db.name(type_id) {
            Some(_) => Value::String(type_path(db, type_id)),
            None => emit_anonymous_type(db, type_id),
        };
        obj.insert("type".to_string(), type_value);
    }
    Value::Object(obj)
}

/// Embeds an unnamed `type.peripheral`/`type.register_group` inline as a full
/// record, for instances whose target type is never hoisted into the named
/// top-level type table.
fn emit_anonymous_type(db: &Database, id: EntityId) -> Value {
    match db.kind_of(id) {
        Some(Kind::TypeRegisterGroup) => emit_register_group(db, id),
        _ => emit_peripheral(db, id),
    }
}

/// Walks `type_id` up through its `type.register_group`/`type.peripheral`
/// ancestors and joins names with `.`, matching the generator's namespacing
/// rule.
fn type_path(db: &Database, type_id: EntityId) -> String {
    let mut names = vec![db.name(type_id).unwrap_or_default().to_string()];
    let mut cur = type_id;
    while let Some(parent) = db.parent(cur) {
        match db.kind_of(parent) {
            Some(Kind::TypePeripheral) | Some(Kind::TypeRegisterGroup) => {
                names.push(db.name(parent).unwrap_or_default().to_string());
                cur = parent;
            }
            _ => break,
        }
    }
    names.reverse();
    names.join(".")
}

fn emit_named_group(
    db: &Database,
    parent: EntityId,
    kind: Kind,
    key: &str,
    emit_one: fn(&Database, EntityId) -> Value,
    into: &mut Map<String, Value>,
) {
    let mut group = Map::new();
    for child in db.children(parent, kind) {
        if let Some(name) = db.name(child) {
            group.insert(name.to_string(), emit_one(db, child));
        }
    }
    if !group.is_empty() {
        into.insert(key.to_string(), Value::Object(group));
    }
}

fn put_description(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(d) = db.description(id) {
        obj.insert("description".to_string(), Value::String(d.to_string()));
    }
}

fn put_version(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(v) = db.version(id) {
        obj.insert("version".to_string(), Value::String(v.to_string()));
    }
}

fn put_offset(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(v) = db.offset(id) {
        obj.insert("offset".to_string(), Value::from(v));
    }
}

fn put_size(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(v) = db.size(id) {
        obj.insert("size".to_string(), Value::from(v));
    }
}

fn put_access(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(access) = db.access(id) {
        let text = match access {
            Access::ReadOnly => Some("read-only"),
            Access::WriteOnly => Some("write-only"),
            Access::ReadWrite => None,
        };
        if let Some(text) = text {
            obj.insert("access".to_string(), Value::String(text.to_string()));
        }
    }
}

fn put_modes(db: &Database, id: EntityId, obj: &mut Map<String, Value>) {
    if let Some(modes) = db.modes(id) {
        if !modes.is_empty() {
            let names: Vec<Value> = modes
                .iter()
                .filter_map(|m| db.name(*m))
                .map(|n| Value::String(n.to_string()))
                .collect();
            obj.insert("modes".to_string(), Value::Array(names));
        }
    }
}
