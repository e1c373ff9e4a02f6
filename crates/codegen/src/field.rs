use perigen_db::{Database, EntityId, Kind};

use crate::enum_type::render_enum_body;

/// Lays fields out across `register_size` bits: sorted by bit offset,
/// same-offset tie-break keeps the smallest, a field extending past
/// `register_size` stops emission, and any trailing unused bits become a
/// `padding` member.
pub(crate) fn layout_fields(db: &Database, register: EntityId, register_size: u64) -> Vec<String> {
    let mut fields: Vec<EntityId> = db.children(register, Kind::TypeField).collect();
    fields.sort_by_key(|field| db.offset(*field).unwrap_or(0));

    let selected = resolve_overlaps(db, &fields);

    let mut members = Vec::new();
    let mut cursor: u64 = 0;
    for field in selected {
        let offset = db.offset(field).unwrap_or(0);
        let width = db.size(field).unwrap_or(0);
        if offset + width > register_size {
            tracing::warn!(
                field = db.name(field).unwrap_or("?"),
                "field extends past register bounds, stopping emission"
            );
            break;
        }
        members.push(render_field(db, field, width));
        cursor = offset + width;
    }

    if cursor < register_size {
        members.push(format!("padding: u{} = 0", register_size - cursor));
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
                .min_by_key(|field| db.size(**field).unwrap_or(u64::MAX))
                .expect("group is non-empty");
            for field in group {
                if *field != winner {
                    tracing::warn!(
                        field = db.name(*field).unwrap_or("?"),
                        "overlapping field at same bit offset, skipped"
                    );
                }
            }
            selected.push(winner);
        }
        i = end;
    }
    selected
}

fn render_field(db: &Database, field: EntityId, width: u64) -> String {
    let name = db.name(field).unwrap_or("field");
    match db.enum_ref(field) {
        Some(enum_id) => {
            let value_type = match db.name(enum_id) {
                Some(enum_name) => enum_name.to_string(),
                None => render_enum_body(db, enum_id),
            };
            format!("{name}: union {{ raw: u{width}, value: {value_type} }}")
        }
        None => format!("{name}: u{width}"),
    }
}
