use perigen_db::{Database, Kind};

use crate::namespace::type_path;
use crate::peripheral::render_struct;

/// Emits the `devices` block, eliding it entirely if the database has no
/// devices.
pub(crate) fn emit_devices(db: &Database, out: &mut String) {
    let devices: Vec<_> = db.iter_kind(Kind::InstanceDevice).collect();
    if devices.is_empty() {
        return;
    }

    out.push_str("devices {\n");
    for device in devices {
        let Some(name) = db.name(device) else {
            tracing::warn!("skipping unnamed device instance");
            continue;
        };
        out.push_str(&format!("    {name} {{\n"));
        for instance in db.children(device, Kind::InstancePeripheral) {
            let Some(instance_name) = db.name(instance) else {
                tracing::warn!("skipping unnamed peripheral instance");
                continue;
            };
            let Some(type_id) = db.instance_of(instance) else {
                tracing::warn!(instance = %instance_name, "peripheral instance has no target type, skipping");
                continue;
            };
            let offset = db.offset(instance).unwrap_or(0);
            let path = if db.name(type_id).is_some() {
                type_path(db, type_id)
            } else {
                // Anonymous target type: inline its record at the pointer-cast
                // site instead of a `types.X` reference.
                render_struct(db, type_id)
            };
            out.push_str(&format!("        {instance_name} = ptr({path}, {offset:#x}),\n"));
        }
        out.push_str("    },\n");
    }
    out.push_str("}\n\n");
}
