use perigen_db::{Database, EntityId, Kind};

use crate::enum_type::render_named_enum;
use crate::register::render_register;

/// Renders a peripheral with `type.mode` children as a `packed union`: a
/// `Mode` enum, a `get_mode` selector, any enum declarations, and one
/// variant struct per mode holding the registers that apply to it.
pub(crate) fn render_mode_union(db: &Database, peripheral: EntityId, modes: &[EntityId]) -> String {
    let mode_names: Vec<&str> = modes.iter().filter_map(|mode| db.name(*mode)).collect();
    let mut members = vec![format!("Mode = enum {{ {} }}", mode_names.join(", "))];
    members.push(render_get_mode(db, modes));

    for enum_id in db.children(peripheral, Kind::TypeEnum) {
        if let Some(text) = render_named_enum(db, enum_id) {
            members.push(text);
        }
    }

    for mode in modes {
        let Some(mode_name) = db.name(*mode) else {
            continue;
        };
        members.push(format!("{mode_name}: {}", render_variant(db, peripheral, *mode)));
    }

    format!("packed union {{ {} }}", members.join(", "))
}

fn render_get_mode(db: &Database, modes: &[EntityId]) -> String {
    let mut arms = Vec::new();
    for mode in modes {
        let (Some(mode_name), Some(payload)) = (db.name(*mode), db.mode_payload(*mode)) else {
            continue;
        };
        let mut segments = payload.qualifier.split('.');
        segments.next(); // leading component is the peripheral type name, discarded
        let rest: Vec<&str> = segments.collect();
        let Some((field_name, access_segments)) = rest.split_last() else {
            tracing::warn!(mode = %mode_name, "mode qualifier has no field component, skipping");
            continue;
        };
        let access_path = access_segments.join(".");
        let pattern = payload.value.split_whitespace().collect::<Vec<_>>().join(" | ");
        arms.push(format!(
            "match self.{access_path}.read().{field_name} {{ {pattern} => return Mode.{mode_name}, _ => {{}} }}"
        ));
    }
    format!("get_mode = fn(self) -> Mode {{ {} unreachable; }}", arms.join(" "))
}

fn render_variant(db: &Database, peripheral: EntityId, mode: EntityId) -> String {
    let members: Vec<String> = db
        .children(peripheral, Kind::TypeRegister)
        .filter(|register| db.modes(*register).map(|set| set.contains(&mode)).unwrap_or(false))
        .filter_map(|register| render_register(db, register))
        .collect();
    format!("packed struct {{ {} }}", members.join(", "))
}
