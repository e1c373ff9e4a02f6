use perigen_db::{Database, EntityId, Kind};

use crate::enum_type::render_named_enum;
use crate::mode::render_mode_union;
use crate::register::layout_registers;

/// Renders one top-level `type.peripheral` as a `Name = <expr>` member of
/// the `types` block, or `None` if a per-peripheral failure means it should
/// be skipped.
pub(crate) fn emit_peripheral(db: &Database, id: EntityId) -> Option<String> {
    let name = db.name(id).or_else(|| {
        tracing::warn!("skipping unnamed top-level peripheral type");
        None
    })?;

    let modes: Vec<EntityId> = db.children(id, Kind::TypeMode).collect();
    let body = if modes.is_empty() {
        render_struct(db, id)
    } else {
        render_mode_union(db, id, &modes)
    };
    Some(format!("{name} = {body}"))
}

/// Renders a peripheral or register_group scope as a plain packed struct:
/// its named enum declarations, its laid-out registers, then its nested
/// register groups as substructs.
pub(crate) fn render_struct(db: &Database, scope: EntityId) -> String {
    let mut members: Vec<String> = Vec::new();
    for enum_id in db.children(scope, Kind::TypeEnum) {
        if let Some(text) = render_named_enum(db, enum_id) {
            members.push(text);
        }
    }

    let registers = layout_registers(db, scope);
    let groups: Vec<EntityId> = db.children(scope, Kind::TypeRegisterGroup).collect();

    if registers.is_empty() && groups.is_empty() {
        return if members.is_empty() {
            "struct {}".to_string()
        } else {
            format!("struct {{ {} }}", members.join(", "))
        };
    }

    members.extend(registers);
    for group in groups {
        let Some(group_name) = db.name(group) else {
            tracing::warn!("skipping unnamed register group");
            continue;
        };
        members.push(format!("{group_name}: {}", render_struct(db, group)));
    }

    format!("packed struct {{ {} }}", members.join(", "))
}
