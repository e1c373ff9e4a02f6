use perigen_db::{Database, EntityId, Kind};

use crate::field::layout_fields;

/// Lays registers out across a byte cursor starting at 0: sorted by byte
/// offset, holes become `reservedN: [u8; N]`, same-offset ties keep the
/// smallest register, and the cursor advances by `size / 8` after each one.
pub(crate) fn layout_registers(db: &Database, scope: EntityId) -> Vec<String> {
    let mut registers: Vec<EntityId> = db.children(scope, Kind::TypeRegister).collect();
    registers.sort_by_key(|register| db.offset(*register).unwrap_or(0));

    let selected = resolve_overlaps(db, &registers);

    let mut members = Vec::new();
    let mut cursor: u64 = 0;
    for register in selected {
        let offset = db.offset(register).unwrap_or(0);
        if offset > cursor {
            let gap = offset - cursor;
            members.push(format!("reserved{offset}: [u8; {gap}]"));
        }
        if let Some(text) = render_register(db, register) {
            members.push(text);
        }
        let size = db.size(register).unwrap_or(0);
        cursor = offset + size / 8;
    }
    members
}

fn resolve_overlaps(db: &Database, sorted: &[EntityId]) -> Vec<EntityId> {
    let mut selected = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let offset = db.offset(sorted[i]).unwrap_or(0);
        let mut end = i + 1;
        while end < sorted.len() && db.offset(sorted[end]).unwrap_or(0) == offset {
            end += 1;
        }
        let group = &sorted[i..end];
        if group.len() == 1 {
            selected.push(group[0]);
        } else {
            let winner = *group
                .iter()
                .min_by_key(|register| db.size(**register).unwrap_or(u64::MAX))
                .expect("group is non-empty");
            for register in group {
                if *register != winner {
                    tracing::warn!(
                        register = db.name(*register).unwrap_or("?"),
                        "overlapping register at same offset, skipped"
                    );
                }
            }
            selected.push(winner);
        }
        i = end;
    }
    selected
}

/// Renders a single register member: a plain integer if it has no fields,
/// or `Mmio(size, packed struct { ... })` otherwise.
pub(crate) fn render_register(db: &Database, id: EntityId) -> Option<String> {
    let name = db.name(id)?;
    let size = db.size(id)?;
    let has_fields = db.children(id, Kind::TypeField).next().is_some();
    if !has_fields {
        return Some(format!("{name}: u{size}"));
    }
    let fields = layout_fields(db, id, size);
    Some(format!("{name}: Mmio({size}, packed struct {{ {} }})", fields.join(", ")))
}
