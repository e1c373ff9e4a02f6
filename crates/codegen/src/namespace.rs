use perigen_db::{Database, EntityId, Kind};

/// Builds the fully-qualified `types.X.Y` reference for `type_id` by walking
/// `parent` up through `type.register_group`/`type.peripheral` ancestors.
pub(crate) fn type_path(db: &Database, type_id: EntityId) -> String {
    let mut names = vec![db.name(type_id).unwrap_or("_").to_string()];
    let mut cur = type_id;
    while let Some(parent) = db.parent(cur) {
        match db.kind_of(parent) {
            Some(Kind::TypePeripheral) | Some(Kind::TypeRegisterGroup) => {
                names.push(db.name(parent).unwrap_or("_").to_string());
                cur = parent;
            }
            _ => break,
        }
    }
    names.reverse();
    format!("types.{}", names.join("."))
}
