//! SVD dialect loader. Deserializes the document into a small typed tree
//! with `quick_xml::de` (mirroring how `drone-svd` models SVD with
//! `#[derive(Deserialize)]` structs) and walks that tree to populate a
//! [`perigen_db::Database`].

use perigen_db::{Database, EntityId};
use serde::Deserialize;

use crate::numeric::parse_int;
use crate::LoaderError;

#[derive(Debug, Deserialize)]
#[serde(rename = "device")]
struct SvdDevice {
    name: String,
    description: Option<String>,
    #[serde(default)]
    peripherals: SvdPeripherals,
}

#[derive(Debug, Default, Deserialize)]
struct SvdPeripherals {
    #[serde(rename = "peripheral", default)]
    peripheral: Vec<SvdPeripheral>,
}

#[derive(Debug, Deserialize)]
struct SvdPeripheral {
    name: String,
    description: Option<String>,
    #[serde(rename = "baseAddress")]
    base_address: String,
    #[serde(default)]
    interrupt: Vec<SvdInterrupt>,
    registers: Option<SvdRegisters>,
}

#[derive(Debug, Deserialize)]
struct SvdInterrupt {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct SvdRegisters {
    #[serde(rename = "register", default)]
    register: Vec<SvdRegister>,
    #[serde(rename = "cluster", default)]
    cluster: Vec<SvdCluster>,
}

#[derive(Debug, Deserialize)]
struct SvdCluster {
    name: String,
    description: Option<String>,
    #[serde(rename = "addressOffset")]
    address_offset: Option<String>,
    #[serde(rename = "register", default)]
    register: Vec<SvdRegister>,
    #[serde(rename = "cluster", default)]
    cluster: Vec<SvdCluster>,
}

#[derive(Debug, Deserialize)]
struct SvdRegister {
    name: String,
    description: Option<String>,
    #[serde(rename = "addressOffset")]
    address_offset: String,
    size: Option<String>,
    access: Option<String>,
    #[serde(rename = "resetValue")]
    reset_value: Option<String>,
    #[serde(rename = "resetMask")]
    reset_mask: Option<String>,
    fields: Option<SvdFields>,
}

#[derive(Debug, Default, Deserialize)]
struct SvdFields {
    #[serde(rename = "field", default)]
    field: Vec<SvdField>,
}

#[derive(Debug, Deserialize)]
struct SvdField {
    name: String,
    description: Option<String>,
    access: Option<String>,
    #[serde(rename = "bitOffset")]
    bit_offset: Option<u32>,
    #[serde(rename = "bitWidth")]
    bit_width: Option<u32>,
    lsb: Option<u32>,
    msb: Option<u32>,
    #[serde(rename = "bitRange")]
    bit_range: Option<String>,
    #[serde(rename = "enumeratedValues")]
    enumerated_values: Option<SvdEnumeratedValues>,
}

#[derive(Debug, Deserialize)]
struct SvdEnumeratedValues {
    name: Option<String>,
    #[serde(rename = "enumeratedValue", default)]
    enumerated_value: Vec<SvdEnumeratedValue>,
}

#[derive(Debug, Deserialize)]
struct SvdEnumeratedValue {
    name: String,
    value: Option<String>,
}

pub(crate) fn load(xml: &str) -> Result<Database, LoaderError> {
    let device: SvdDevice = quick_xml::de::from_str(xml)?;
    if device.name.trim().is_empty() {
        return Err(LoaderError::MissingRootIdentity("device name".to_string()));
    }

    let mut db = Database::new();
    let dev_id = db.create_device(&device.name);
    if let Some(d) = &device.description {
        db.set_description(dev_id, d.clone());
    }

    for peripheral in &device.peripherals.peripheral {
        match load_peripheral_type(&mut db, peripheral) {
            Ok(type_id) => attach_peripheral_instance(&mut db, dev_id, peripheral, type_id),
            Err(err) => {
                tracing::warn!(peripheral = %peripheral.name, %err, "skipping peripheral");
            }
        }
    }

    db.assert_valid()?;
    Ok(db)
}

fn attach_peripheral_instance(
    db: &mut Database,
    dev_id: EntityId,
    peripheral: &SvdPeripheral,
    type_id: EntityId,
) {
    let Some(base) = parse_int(&peripheral.base_address) else {
        tracing::warn!(peripheral = %peripheral.name, "unparseable baseAddress, skipping instance");
        return;
    };
    if let Err(err) = db.create_peripheral_instance(dev_id, &peripheral.name, type_id, base) {
        tracing::warn!(peripheral = %peripheral.name, %err, "skipping peripheral instance");
    }
    for interrupt in &peripheral.interrupt {
        match parse_int(&interrupt.value) {
            Some(value) => {
                if let Err(err) = db.create_interrupt_instance(dev_id, &interrupt.name, value as u32) {
                    tracing::warn!(interrupt = %interrupt.name, %err, "skipping interrupt");
                }
            }
            None => tracing::warn!(interrupt = %interrupt.name, "unparseable interrupt value, skipping"),
        }
    }
}

fn load_peripheral_type(db: &mut Database, peripheral: &SvdPeripheral) -> Result<EntityId, LoaderError> {
    let type_id = db.create_peripheral(Some(&peripheral.name));
    if let Some(d) = &peripheral.description {
        db.set_description(type_id, d.clone());
    }

    if let Some(registers) = &peripheral.registers {
        if registers.register.is_empty()
            && registers.cluster.len() == 1
            && registers.cluster[0].name == peripheral.name
        {
            // A lone same-named register group is flattened into the
            // peripheral itself.
            let only = &registers.cluster[0];
            for register in &only.register {
                load_register(db, type_id, type_id, register);
            }
            for cluster in &only.cluster {
                load_cluster(db, type_id, type_id, cluster);
            }
        } else {
            for register in &registers.register {
                load_register(db, type_id, type_id, register);
            }
            for cluster in &registers.cluster {
                load_cluster(db, type_id, type_id, cluster);
            }
        }
    }

    Ok(type_id)
}

fn load_cluster(db: &mut Database, parent: EntityId, peripheral_root: EntityId, cluster: &SvdCluster) {
    let group_id = match db.create_register_group(parent, Some(&cluster.name)) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(cluster = %cluster.name, %err, "skipping register group");
            return;
        }
    };
    if let Some(offset) = cluster.address_offset.as_deref().and_then(parse_int) {
        db.set_offset(group_id, offset);
    }
    if let Some(d) = &cluster.description {
        db.set_description(group_id, d.clone());
    }
    for register in &cluster.register {
        load_register(db, group_id, peripheral_root, register);
    }
    for nested in &cluster.cluster {
        load_cluster(db, group_id, peripheral_root, nested);
    }
}

fn load_register(db: &mut Database, parent: EntityId, peripheral_root: EntityId, register: &SvdRegister) {
    let Some(offset) = parse_int(&register.address_offset) else {
        tracing::warn!(register = %register.name, "unparseable addressOffset, skipping");
        return;
    };
    let size = register
        .size
        .as_deref()
        .and_then(parse_int)
        .unwrap_or(32);
    if size % 8 != 0 {
        tracing::warn!(register = %register.name, size, "register size is not a multiple of 8 bits, skipping");
        return;
    }

    let id = match db.create_register(parent, &register.name) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(register = %register.name, %err, "skipping register");
            return;
        }
    };
    db.set_offset(id, offset);
    db.set_size(id, size);
    if let Some(d) = &register.description {
        db.set_description(id, d.clone());
    }
    if let Some(access) = &register.access {
        db.set_access(id, parse_access(access));
    }
    if let Some(rv) = register.reset_value.as_deref().and_then(parse_int) {
        db.set_reset_value(id, rv);
    }
    if let Some(rm) = register.reset_mask.as_deref().and_then(parse_int) {
        db.set_reset_mask(id, rm);
    }

    if let Some(fields) = &register.fields {
        for field in &fields.field {
            load_field(db, id, peripheral_root, field);
        }
    }
}

fn load_field(db: &mut Database, register: EntityId, peripheral_root: EntityId, field: &SvdField) {
    let Some((offset, width)) = resolve_bit_range(field) else {
        tracing::warn!(field = %field.name, "field has no resolvable bit range, skipping");
        return;
    };
    let id = match db.create_field(register, &field.name) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(field = %field.name, %err, "skipping field");
            return;
        }
    };
    db.set_offset(id, offset as u64);
    db.set_size(id, width as u64);
    if let Some(d) = &field.description {
        db.set_description(id, d.clone());
    }
    if let Some(access) = &field.access {
        db.set_access(id, parse_access(access));
    }

    if let Some(values) = &field.enumerated_values {
        let name = values.name.as_deref();
        match db.create_enum(peripheral_root, name) {
            Ok(enum_id) => {
                db.set_size(enum_id, width as u64);
                for value in &values.enumerated_value {
                    match value.value.as_deref().and_then(parse_int) {
                        Some(v) => {
                            if let Err(err) = db.create_enum_field(enum_id, &value.name, v as i64) {
                                tracing::warn!(enum_field = %value.name, %err, "skipping enumerated value");
                            }
                        }
                        None => {
                            tracing::warn!(enum_field = %value.name, "unparseable enumerated value, skipping");
                        }
                    }
                }
                db.set_enum_ref(id, enum_id);
            }
            Err(err) => tracing::warn!(field = %field.name, %err, "skipping enumeratedValues"),
        }
    }
}

fn resolve_bit_range(field: &SvdField) -> Option<(u32, u32)> {
    if let (Some(offset), Some(width)) = (field.bit_offset, field.bit_width) {
        return Some((offset, width));
    }
    if let (Some(lsb), Some(msb)) = (field.lsb, field.msb) {
        return Some((lsb, msb.checked_sub(lsb)? + 1));
    }
    if let Some(range) = &field.bit_range {
        let trimmed = range.trim().trim_start_matches('[').trim_end_matches(']');
        let mut parts = trimmed.split(':');
        let msb: u32 = parts.next()?.parse().ok()?;
        let lsb: u32 = parts.next()?.parse().ok()?;
        return Some((lsb, msb.checked_sub(lsb)? + 1));
    }
    None
}

fn parse_access(text: &str) -> perigen_db::Access {
    let has_read = text.contains("read");
    let has_write = text.contains("write");
    match (has_read, has_write) {
        (true, true) | (false, false) => perigen_db::Access::ReadWrite,
        (true, false) => perigen_db::Access::ReadOnly,
        (false, true) => perigen_db::Access::WriteOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perigen_db::Kind;

    const ONE_FIELD_DEVICE: &str = r#"
        <device>
            <name>TEST_DEVICE</name>
            <peripherals>
                <peripheral>
                    <name>TEST_PERIPHERAL</name>
                    <baseAddress>0x40000000</baseAddress>
                    <registers>
                        <register>
                            <name>TEST_REGISTER</name>
                            <addressOffset>0x0</addressOffset>
                            <size>32</size>
                            <fields>
                                <field>
                                    <name>TEST_FIELD</name>
                                    <bitOffset>0</bitOffset>
                                    <bitWidth>1</bitWidth>
                                </field>
                            </fields>
                        </register>
                    </registers>
                </peripheral>
            </peripherals>
        </device>
    "#;

    #[test]
    fn loads_one_register_one_field() {
        let db = load(ONE_FIELD_DEVICE).unwrap();
        let peripheral = db.find_by_name(Kind::TypePeripheral, "TEST_PERIPHERAL").unwrap();
        let register = db.find_by_name(Kind::TypeRegister, "TEST_REGISTER").unwrap();
        assert_eq!(db.parent(register), Some(peripheral));
        let field = db.find_by_name(Kind::TypeField, "TEST_FIELD").unwrap();
        assert_eq!(db.offset(field), Some(0));
        assert_eq!(db.size(field), Some(1));
    }

    const INLINED_GROUP_DEVICE: &str = r#"
        <device>
            <name>TEST_DEVICE</name>
            <peripherals>
                <peripheral>
                    <name>PORT</name>
                    <baseAddress>0x20000000</baseAddress>
                    <registers>
                        <cluster>
                            <name>PORT</name>
                            <register>
                                <name>DATA</name>
                                <addressOffset>0x0</addressOffset>
                                <size>8</size>
                            </register>
                        </cluster>
                    </registers>
                </peripheral>
            </peripherals>
        </device>
    "#;

    #[test]
    fn same_named_cluster_is_inlined() {
        let db = load(INLINED_GROUP_DEVICE).unwrap();
        let peripheral = db.find_by_name(Kind::TypePeripheral, "PORT").unwrap();
        assert_eq!(db.children(peripheral, Kind::TypeRegisterGroup).count(), 0);
        let register = db.find_by_name(Kind::TypeRegister, "DATA").unwrap();
        assert_eq!(db.parent(register), Some(peripheral));
    }

    const BAD_SIZE_DEVICE: &str = r#"
        <device>
            <name>TEST_DEVICE</name>
            <peripherals>
                <peripheral>
                    <name>ODD</name>
                    <baseAddress>0x0</baseAddress>
                    <registers>
                        <register>
                            <name>BAD</name>
                            <addressOffset>0x0</addressOffset>
                            <size>13</size>
                        </register>
                    </registers>
                </peripheral>
            </peripherals>
        </device>
    "#;

    #[test]
    fn register_size_not_a_multiple_of_eight_is_skipped() {
        let db = load(BAD_SIZE_DEVICE).unwrap();
        assert!(db.find_by_name(Kind::TypeRegister, "BAD").is_err());
    }
}
