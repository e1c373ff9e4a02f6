//! ATDF dialect loader. Structurally similar to the SVD loader: deserialize
//! into a typed tree with `quick_xml::de`, then walk it to build the
//! database.

use indexmap::IndexMap;
use perigen_db::{Database, EntityId};
use serde::Deserialize;

use crate::numeric::parse_int;
use crate::LoaderError;

#[derive(Debug, Deserialize)]
#[serde(rename = "avr-tools-device-file")]
struct AtdfRoot {
    #[serde(default)]
    modules: AtdfModules,
    devices: AtdfDevices,
}

#[derive(Debug, Default, Deserialize)]
struct AtdfModules {
    #[serde(rename = "module", default)]
    module: Vec<AtdfModule>,
}

#[derive(Debug, Deserialize)]
struct AtdfModule {
    name: String,
    #[serde(rename = "mode", default)]
    mode: Vec<AtdfMode>,
    #[serde(rename = "value-group", default)]
    value_group: Vec<AtdfValueGroup>,
    #[serde(rename = "register-group", default)]
    register_group: Vec<AtdfRegisterGroup>,
}

#[derive(Debug, Deserialize)]
struct AtdfMode {
    name: String,
    qualifier: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtdfValueGroup {
    name: String,
    #[serde(rename = "value", default)]
    value: Vec<AtdfValue>,
}

#[derive(Debug, Deserialize)]
struct AtdfValue {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtdfRegisterGroup {
    name: String,
    #[serde(rename = "register", default)]
    register: Vec<AtdfRegister>,
}

#[derive(Debug, Deserialize)]
struct AtdfRegister {
    name: String,
    caption: Option<String>,
    offset: String,
    size: Option<String>,
    rw: Option<String>,
    modes: Option<String>,
    #[serde(rename = "bitfield", default)]
    bitfield: Vec<AtdfBitfield>,
}

#[derive(Debug, Deserialize)]
struct AtdfBitfield {
    name: String,
    mask: String,
    caption: Option<String>,
    values: Option<String>,
    modes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtdfDevices {
    #[serde(rename = "device", default)]
    device: Vec<AtdfDevice>,
}

#[derive(Debug, Deserialize)]
struct AtdfDevice {
    name: String,
    #[serde(default)]
    architecture: Option<String>,
    peripherals: Option<AtdfDevicePeripherals>,
    interrupts: Option<AtdfInterrupts>,
}

#[derive(Debug, Deserialize)]
struct AtdfDevicePeripherals {
    #[serde(rename = "module", default)]
    module: Vec<AtdfModuleInstances>,
}

#[derive(Debug, Deserialize)]
struct AtdfModuleInstances {
    name: String,
    #[serde(rename = "instance", default)]
    instance: Vec<AtdfInstance>,
}

#[derive(Debug, Deserialize)]
struct AtdfInstance {
    name: String,
    #[serde(rename = "register-group", default)]
    register_group: Vec<AtdfInstanceRegisterGroup>,
}

#[derive(Debug, Deserialize)]
struct AtdfInstanceRegisterGroup {
    name: Option<String>,
    offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtdfInterrupts {
    #[serde(rename = "interrupt", default)]
    interrupt: Vec<AtdfInterrupt>,
}

#[derive(Debug, Deserialize)]
struct AtdfInterrupt {
    name: String,
    index: String,
}

pub(crate) fn load(xml: &str) -> Result<Database, LoaderError> {
    let root: AtdfRoot = quick_xml::de::from_str(xml)?;
    let mut db = Database::new();

    for module in &root.modules.module {
        if let Err(err) = load_module(&mut db, module) {
            tracing::warn!(module = %module.name, %err, "skipping module");
        }
    }

    for device in &root.devices.device {
        load_device(&mut db, device)?;
    }

    db.assert_valid()?;
    Ok(db)
}

fn load_module(db: &mut Database, module: &AtdfModule) -> Result<EntityId, LoaderError> {
    let peripheral = db.create_peripheral(Some(&module.name));

    let mut enums_by_name: IndexMap<String, EntityId> = IndexMap::new();
    for group in &module.value_group {
        match db.create_enum(peripheral, Some(&group.name)) {
            Ok(enum_id) => {
                for value in &group.value {
                    match parse_int(&value.value) {
                        Some(v) => {
                            if let Err(err) = db.create_enum_field(enum_id, &value.name, v as i64) {
                                tracing::warn!(value = %value.name, %err, "skipping enum value");
                            }
                        }
                        None => tracing::warn!(value = %value.name, "unparseable enum value, skipping"),
                    }
                }
                enums_by_name.insert(group.name.clone(), enum_id);
            }
            Err(err) => tracing::warn!(group = %group.name, %err, "skipping value-group"),
        }
    }

    let mut modes_by_name: IndexMap<String, EntityId> = IndexMap::new();
    for mode in &module.mode {
        match db.create_mode(peripheral, &mode.name, mode.value.clone(), mode.qualifier.clone()) {
            Ok(mode_id) => {
                modes_by_name.insert(mode.name.clone(), mode_id);
            }
            Err(err) => tracing::warn!(mode = %mode.name, %err, "skipping mode"),
        }
    }

    if module.register_group.len() == 1 && module.register_group[0].name == module.name {
        // Lone same-named register group inlines into the peripheral directly.
        for register in &module.register_group[0].register {
            load_register(db, peripheral, register, &enums_by_name, &modes_by_name);
        }
    } else {
        for group in &module.register_group {
            load_register_group(db, peripheral, group, &enums_by_name, &modes_by_name);
        }
    }

    Ok(peripheral)
}

fn load_register_group(
    db: &mut Database,
    parent: EntityId,
    group: &AtdfRegisterGroup,
    enums: &IndexMap<String, EntityId>,
    modes: &IndexMap<String, EntityId>,
) {
    let group_id = match db.create_register_group(parent, Some(&group.name)) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(group = %group.name, %err, "skipping register group");
            return;
        }
    };
    for register in &group.register {
        load_register(db, group_id, register, enums, modes);
    }
}

fn load_register(
    db: &mut Database,
    parent: EntityId,
    register: &AtdfRegister,
    enums: &IndexMap<String, EntityId>,
    modes: &IndexMap<String, EntityId>,
) {
    let Some(offset) = parse_int(&register.offset) else {
        tracing::warn!(register = %register.name, "unparseable offset, skipping");
        return;
    };
    let size = register.size.as_deref().and_then(parse_int).unwrap_or(8);
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
    if let Some(c) = &register.caption {
        db.set_description(id, c.clone());
    }
    if let Some(rw) = &register.rw {
        db.set_access(id, parse_access(rw));
    }
    if let Some(names) = &register.modes {
        let set = resolve_modes(names, modes, &register.name);
        db.set_modes(id, set);
    }

    for bitfield in &register.bitfield {
        load_bitfield(db, id, bitfield, enums, modes);
    }
}

/// Resolves a space-separated list of mode names against the enclosing
/// parent's mode set, warning and skipping any that don't resolve.
fn resolve_modes(names: &str, modes: &IndexMap<String, EntityId>, context: &str) -> indexmap::IndexSet<EntityId> {
    let mut set = indexmap::IndexSet::new();
    for name in names.split_whitespace() {
        match modes.get(name) {
            Some(mode_id) => {
                set.insert(*mode_id);
            }
            None => tracing::warn!(mode = %name, %context, "unresolved mode name, skipping"),
        }
    }
    set
}

fn load_bitfield(
    db: &mut Database,
    register: EntityId,
    bitfield: &AtdfBitfield,
    enums: &IndexMap<String, EntityId>,
    modes: &IndexMap<String, EntityId>,
) {
    let Some(mask) = parse_int(&bitfield.mask) else {
        tracing::warn!(bitfield = %bitfield.name, "unparseable mask, skipping");
        return;
    };
    if mask == 0 {
        tracing::warn!(bitfield = %bitfield.name, "zero mask, skipping");
        return;
    }
    let lowest = mask.trailing_zeros();
    let highest = 63 - mask.leading_zeros();
    let width = highest - lowest + 1;
    let popcount = mask.count_ones();

    if popcount != width {
        // Discontiguous mask: split into one-bit fields, one per set bit,
        // named `<Name>_bitK`. Enum attachment is dropped.
        for bit in lowest..=highest {
            if mask & (1u64 << bit) != 0 {
                let name = format!("{}_bit{}", bitfield.name, bit);
                match db.create_field(register, &name) {
                    Ok(id) => {
                        db.set_offset(id, bit as u64);
                        db.set_size(id, 1);
                        if let Some(c) = &bitfield.caption {
                            db.set_description(id, c.clone());
                        }
                        if let Some(names) = &bitfield.modes {
                            let set = resolve_modes(names, modes, &name);
                            db.set_modes(id, set);
                        }
                    }
                    Err(err) => tracing::warn!(field = %name, %err, "skipping split field"),
                }
            }
        }
        return;
    }

    let id = match db.create_field(register, &bitfield.name) {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(bitfield = %bitfield.name, %err, "skipping bitfield");
            return;
        }
    };
    db.set_offset(id, lowest as u64);
    db.set_size(id, width as u64);
    if let Some(c) = &bitfield.caption {
        db.set_description(id, c.clone());
    }
    if let Some(names) = &bitfield.modes {
        let set = resolve_modes(names, modes, &bitfield.name);
        db.set_modes(id, set);
    }
    if let Some(values_name) = &bitfield.values {
        match enums.get(values_name) {
            Some(enum_id) => {
                if db.size(*enum_id).is_none() {
                    db.set_size(*enum_id, width as u64);
                }
                db.set_enum_ref(id, *enum_id);
            }
            None => tracing::warn!(group = %values_name, "unresolved value-group reference, skipping"),
        }
    }
}

fn load_device(db: &mut Database, device: &AtdfDevice) -> Result<EntityId, LoaderError> {
    if device.name.trim().is_empty() || device.architecture.as_deref().unwrap_or("").trim().is_empty() {
        return Err(LoaderError::MissingRootIdentity(
            "device name/architecture".to_string(),
        ));
    }

    let dev_id = db.create_device(&device.name);

    if let Some(peripherals) = &device.peripherals {
        for module_instances in &peripherals.module {
            for instance in &module_instances.instance {
                let named_group = instance
                    .register_group
                    .first()
                    .and_then(|rg| rg.name.as_deref());
                let resolved = match named_group {
                    Some(group_name) => db
                        .find_by_name(perigen_db::Kind::TypeRegisterGroup, group_name)
                        .or_else(|_| db.find_by_name(perigen_db::Kind::TypePeripheral, &module_instances.name)),
                    None => db.find_by_name(perigen_db::Kind::TypePeripheral, &module_instances.name),
                };
                match resolved {
                    Ok(type_id) => {
                        let base = instance
                            .register_group
                            .first()
                            .and_then(|rg| rg.offset.as_deref())
                            .and_then(parse_int)
                            .unwrap_or(0);
                        if let Err(err) = db.create_peripheral_instance(dev_id, &instance.name, type_id, base) {
                            tracing::warn!(instance = %instance.name, %err, "skipping peripheral instance");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(module = %module_instances.name, %err, "unresolved module type, skipping instance");
                    }
                }
            }
        }
    }

    if let Some(interrupts) = &device.interrupts {
        for interrupt in &interrupts.interrupt {
            match parse_int(&interrupt.index) {
                Some(value) => {
                    if let Err(err) = db.create_interrupt_instance(dev_id, &interrupt.name, value as u32) {
                        tracing::warn!(interrupt = %interrupt.name, %err, "skipping interrupt");
                    }
                }
                None => tracing::warn!(interrupt = %interrupt.name, "unparseable interrupt index, skipping"),
            }
        }
    }

    Ok(dev_id)
}

fn parse_access(text: &str) -> perigen_db::Access {
    match text {
        "R" => perigen_db::Access::ReadOnly,
        "W" => perigen_db::Access::WriteOnly,
        _ => perigen_db::Access::ReadWrite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perigen_db::Kind;

    const DISCONTIGUOUS_DOCUMENT: &str = r#"
        <avr-tools-device-file>
            <modules>
                <module name="PORT">
                    <register-group name="PORT">
                        <register name="SPLIT" offset="0x0" size="8">
                            <bitfield name="GAPPY" mask="0x0B"/>
                        </register>
                    </register-group>
                </module>
            </modules>
            <devices>
                <device name="TEST_DEVICE" architecture="AVR8"/>
            </devices>
        </avr-tools-device-file>
    "#;

    #[test]
    fn discontiguous_mask_splits_into_bit_fields() {
        let db = load(DISCONTIGUOUS_DOCUMENT).unwrap();
        let register = db.find_by_name(Kind::TypeRegister, "SPLIT").unwrap();
        let names: Vec<_> = db
            .children(register, Kind::TypeField)
            .filter_map(|f| db.name(f))
            .collect();
        assert_eq!(names, vec!["GAPPY_bit0", "GAPPY_bit1", "GAPPY_bit3"]);
    }

    const TWO_MODE_DOCUMENT: &str = r#"
        <avr-tools-device-file>
            <modules>
                <module name="TEST_PERIPHERAL">
                    <mode name="TEST_MODE1" qualifier="TEST_PERIPHERAL.TEST_MODE1.COMMON_REGISTER.TEST_FIELD" value="0"/>
                    <mode name="TEST_MODE2" qualifier="TEST_PERIPHERAL.TEST_MODE2.COMMON_REGISTER.TEST_FIELD" value="1"/>
                    <register-group name="TEST_PERIPHERAL">
                        <register name="COMMON_REGISTER" offset="0x0" size="32" modes="TEST_MODE1 TEST_MODE2 BOGUS">
                            <bitfield name="TEST_FIELD" mask="0x1"/>
                        </register>
                    </register-group>
                </module>
            </modules>
            <devices>
                <device name="TEST_DEVICE" architecture="AVR8"/>
            </devices>
        </avr-tools-device-file>
    "#;

    #[test]
    fn mode_names_resolve_and_unresolved_names_are_skipped() {
        let db = load(TWO_MODE_DOCUMENT).unwrap();
        let register = db.find_by_name(Kind::TypeRegister, "COMMON_REGISTER").unwrap();
        let modes = db.modes(register).unwrap();
        assert_eq!(modes.len(), 2);
        for mode in modes {
            assert_eq!(db.kind_of(*mode), Some(Kind::TypeMode));
        }
    }

    const FIELD_MODE_DOCUMENT: &str = r#"
        <avr-tools-device-file>
            <modules>
                <module name="TEST_PERIPHERAL">
                    <mode name="TEST_MODE1" qualifier="TEST_PERIPHERAL.TEST_MODE1.COMMON_REGISTER.TEST_FIELD" value="0"/>
                    <mode name="TEST_MODE2" qualifier="TEST_PERIPHERAL.TEST_MODE2.COMMON_REGISTER.TEST_FIELD" value="1"/>
                    <register-group name="TEST_PERIPHERAL">
                        <register name="COMMON_REGISTER" offset="0x0" size="32">
                            <bitfield name="TEST_FIELD" mask="0x1" modes="TEST_MODE1 BOGUS"/>
                        </register>
                    </register-group>
                </module>
            </modules>
            <devices>
                <device name="TEST_DEVICE" architecture="AVR8"/>
            </devices>
        </avr-tools-device-file>
    "#;

    #[test]
    fn field_modes_resolve_and_unresolved_names_are_skipped() {
        let db = load(FIELD_MODE_DOCUMENT).unwrap();
        let field = db.find_by_name(Kind::TypeField, "TEST_FIELD").unwrap();
        let modes = db.modes(field).unwrap();
        assert_eq!(modes.len(), 1);
        assert_eq!(db.name(*modes.iter().next().unwrap()), Some("TEST_MODE1"));
    }

    const AVR_PORT_DOCUMENT: &str = r#"
        <avr-tools-device-file>
            <modules>
                <module name="PORT">
                    <register-group name="PORTB">
                        <register name="OUT" offset="0x04" size="8"/>
                    </register-group>
                    <register-group name="PORTC">
                        <register name="OUT" offset="0x07" size="8"/>
                    </register-group>
                </module>
            </modules>
            <devices>
                <device name="ATDUMMY" architecture="AVR8">
                    <peripherals>
                        <module name="PORT">
                            <instance name="PORTB">
                                <register-group name="PORTB" offset="0x23"/>
                            </instance>
                            <instance name="PORTC">
                                <register-group name="PORTC" offset="0x26"/>
                            </instance>
                        </module>
                    </peripherals>
                </device>
            </devices>
        </avr-tools-device-file>
    "#;

    #[test]
    fn instances_resolve_to_their_named_register_group_not_the_whole_module() {
        let db = load(AVR_PORT_DOCUMENT).unwrap();
        let portb_group = db.find_by_name(Kind::TypeRegisterGroup, "PORTB").unwrap();
        let portc_group = db.find_by_name(Kind::TypeRegisterGroup, "PORTC").unwrap();

        let device = db.iter_kind(Kind::InstanceDevice).next().unwrap();
        let instances: Vec<_> = db.children(device, Kind::InstancePeripheral).collect();
        assert_eq!(instances.len(), 2);

        let portb_instance = instances
            .iter()
            .find(|id| db.name(**id) == Some("PORTB"))
            .unwrap();
        let portc_instance = instances
            .iter()
            .find(|id| db.name(**id) == Some("PORTC"))
            .unwrap();

        assert_eq!(db.instance_of(*portb_instance), Some(portb_group));
        assert_eq!(db.instance_of(*portc_instance), Some(portc_group));
        assert_eq!(db.offset(*portb_instance), Some(0x23));
        assert_eq!(db.offset(*portc_instance), Some(0x26));
    }
}
