//! Generates a single text artifact from a [`perigen_db::Database`]:
//! a `devices` namespace of typed pointers and a `types` namespace of
//! peripheral record declarations, terminated by a NUL byte that the
//! external formatter treats as a parse sentinel.
//!
//! Output is built with string templating rather than a Rust token builder
//! (`quote!`/`syn`): the emitted text targets a firmware DSL, not Rust, so
//! there is nothing for a Rust-token builder to construct.

mod device;
mod enum_type;
mod error;
mod field;
mod mode;
mod namespace;
mod peripheral;
mod register;

pub use error::GeneratorError;

use perigen_db::{Database, Kind};

/// Generates the complete output document for `db`.
pub fn generate(db: &Database) -> Result<String, GeneratorError> {
    db.assert_valid()?;

    let mut out = String::new();
    out.push_str("import mmio;\n\n");

    device::emit_devices(db, &mut out);

    let named_types: Vec<_> = db
        .iter_kind(Kind::TypePeripheral)
        .filter(|id| db.name(*id).is_some())
        .collect();
    if !named_types.is_empty() {
        out.push_str("types {\n");
        for type_id in named_types {
            match peripheral::emit_peripheral(db, type_id) {
                Some(text) => out.push_str(&format!("    {text},\n")),
                None => continue,
            }
        }
        out.push_str("}\n");
    }

    out.push('\0');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perigen_db::{Access, Database};

    fn one_field_peripheral() -> Database {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let register = db.create_register(peripheral, "TEST_REGISTER").unwrap();
        db.set_offset(register, 0);
        db.set_size(register, 32);
        let field = db.create_field(register, "TEST_FIELD").unwrap();
        db.set_offset(field, 0);
        db.set_size(field, 1);
        db.assert_valid().unwrap();
        db
    }

    #[test]
    fn scenario_one_register_one_field() {
        let db = one_field_peripheral();
        let output = generate(&db).unwrap();
        assert!(output.contains(
            "TEST_PERIPHERAL = packed struct { TEST_REGISTER: Mmio(32, packed struct { TEST_FIELD: u1, padding: u31 = 0 }) }"
        ));
        assert!(output.ends_with('\0'));
    }

    #[test]
    fn scenario_two_instances_share_one_type() {
        let mut db = one_field_peripheral();
        let peripheral = db.find_by_name(perigen_db::Kind::TypePeripheral, "TEST_PERIPHERAL").unwrap();
        let device = db.create_device("TEST_DEVICE");
        db.create_peripheral_instance(device, "FIRST", peripheral, 0x1000).unwrap();
        db.create_peripheral_instance(device, "SECOND", peripheral, 0x2000).unwrap();
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("FIRST = ptr(types.TEST_PERIPHERAL, 0x1000)"));
        assert!(output.contains("SECOND = ptr(types.TEST_PERIPHERAL, 0x2000)"));
    }

    #[test]
    fn scenario_two_modes_with_a_common_register() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let mode1 = db
            .create_mode(
                peripheral,
                "TEST_MODE1",
                "0".to_string(),
                "TEST_PERIPHERAL.TEST_MODE1.COMMON_REGISTER.TEST_FIELD".to_string(),
            )
            .unwrap();
        let mode2 = db
            .create_mode(
                peripheral,
                "TEST_MODE2",
                "1".to_string(),
                "TEST_PERIPHERAL.TEST_MODE2.COMMON_REGISTER.TEST_FIELD".to_string(),
            )
            .unwrap();
        let register = db.create_register(peripheral, "COMMON_REGISTER").unwrap();
        db.set_offset(register, 0);
        db.set_size(register, 32);
        let mut modes = indexmap::IndexSet::new();
        modes.insert(mode1);
        modes.insert(mode2);
        db.set_modes(register, modes);
        let field = db.create_field(register, "TEST_FIELD").unwrap();
        db.set_offset(field, 0);
        db.set_size(field, 1);
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("Mode = enum { TEST_MODE1, TEST_MODE2 }"));
        assert!(output.contains(
            "match self.TEST_MODE1.COMMON_REGISTER.read().TEST_FIELD { 0 => return Mode.TEST_MODE1, _ => {} }"
        ));
        assert!(output.contains(
            "match self.TEST_MODE2.COMMON_REGISTER.read().TEST_FIELD { 1 => return Mode.TEST_MODE2, _ => {} }"
        ));
    }

    #[test]
    fn scenario_exhausted_enum_has_no_sentinel() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let enum_id = db.create_enum(peripheral, Some("TEST_ENUM")).unwrap();
        db.set_size(enum_id, 1);
        db.create_enum_field(enum_id, "TEST_ENUM_FIELD1", 0).unwrap();
        db.create_enum_field(enum_id, "TEST_ENUM_FIELD2", 1).unwrap();
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("TEST_ENUM = enum(u1) { TEST_ENUM_FIELD1 = 0x0, TEST_ENUM_FIELD2 = 0x1 }"));
        assert!(!output.contains("TEST_ENUM_FIELD2 = 0x1, _"));
    }

    #[test]
    fn scenario_namespaced_register_groups() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("PORT"));
        let portb = db.create_register_group(peripheral, Some("PORTB")).unwrap();
        let portc = db.create_register_group(peripheral, Some("PORTC")).unwrap();
        let device = db.create_device("TEST_DEVICE");
        db.create_peripheral_instance(device, "PORTB", portb, 0x23).unwrap();
        db.create_peripheral_instance(device, "PORTC", portc, 0x26).unwrap();
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("PORTB = ptr(types.PORT.PORTB, 0x23)"));
        assert!(output.contains("PORTC = ptr(types.PORT.PORTC, 0x26)"));
        assert!(output.contains("PORT = packed struct { PORTB:"));
    }

    #[test]
    fn reserved_bytes_fill_holes_between_registers() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let first = db.create_register(peripheral, "FIRST").unwrap();
        db.set_offset(first, 0);
        db.set_size(first, 8);
        let second = db.create_register(peripheral, "SECOND").unwrap();
        db.set_offset(second, 4);
        db.set_size(second, 8);
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("reserved4: [u8; 3]"));
    }

    #[test]
    fn equal_offset_registers_keep_the_smallest() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let wide = db.create_register(peripheral, "WIDE").unwrap();
        db.set_offset(wide, 0);
        db.set_size(wide, 32);
        let narrow = db.create_register(peripheral, "NARROW").unwrap();
        db.set_offset(narrow, 0);
        db.set_size(narrow, 8);
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("NARROW: u8"));
        assert!(!output.contains("WIDE: u32"));
    }

    #[test]
    fn generation_is_deterministic() {
        let db = one_field_peripheral();
        assert_eq!(generate(&db).unwrap(), generate(&db).unwrap());
    }

    #[test]
    fn no_devices_elides_the_devices_block() {
        let db = one_field_peripheral();
        let output = generate(&db).unwrap();
        assert!(!output.contains("devices {"));
    }

    #[test]
    fn peripheral_with_only_an_enum_omits_packed() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let enum_id = db.create_enum(peripheral, Some("TEST_ENUM")).unwrap();
        db.set_size(enum_id, 1);
        db.create_enum_field(enum_id, "TEST_ENUM_FIELD1", 0).unwrap();
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("TEST_PERIPHERAL = struct { TEST_ENUM = enum(u1) { TEST_ENUM_FIELD1 = 0x0, _ }"));
        assert!(!output.contains("TEST_PERIPHERAL = packed struct"));
    }

    #[test]
    fn instance_with_an_anonymous_target_type_inlines_its_record() {
        let mut db = Database::new();
        let anon = db.create_peripheral(None);
        let register = db.create_register(anon, "STATUS").unwrap();
        db.set_offset(register, 0);
        db.set_size(register, 8);
        let device = db.create_device("TEST_DEVICE");
        db.create_peripheral_instance(device, "ONE_OFF", anon, 0x5000_0000).unwrap();
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("ONE_OFF = ptr(packed struct { STATUS:"));
        assert!(!output.contains("ptr(types."));
    }

    #[test]
    fn read_only_field_access_renders_plainly_regardless_of_access_mode() {
        let mut db = Database::new();
        let peripheral = db.create_peripheral(Some("TEST_PERIPHERAL"));
        let register = db.create_register(peripheral, "STATUS").unwrap();
        db.set_offset(register, 0);
        db.set_size(register, 8);
        let field = db.create_field(register, "READY").unwrap();
        db.set_offset(field, 0);
        db.set_size(field, 1);
        db.set_access(field, Access::ReadOnly);
        db.assert_valid().unwrap();

        let output = generate(&db).unwrap();
        assert!(output.contains("READY: u1"));
    }
}
