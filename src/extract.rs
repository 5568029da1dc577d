//! Entity and schema-coordinate extraction from execution results.
//!
//! One recursive walk over the result tree serves both sides of the cache:
//! it produces the dependency set registered alongside a cached entry, and
//! the entity set a mutation result invalidates by.

use std::collections::HashSet;

use serde_json::Value;

use crate::keys::EntityRef;

/// Everything the cache learns from one execution result.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResultFacts {
    /// Entities referenced by the result, deduplicated.
    pub entities: HashSet<EntityRef>,
    /// Schema coordinates (`Type.field`) selected by the result.
    pub coordinates: HashSet<String>,
}

impl ResultFacts {
    /// Distinct type names among the referenced entities.
    pub fn type_names(&self) -> HashSet<&str> {
        self.entities
            .iter()
            .map(|entity| entity.type_name.as_str())
            .collect()
    }
}

/// Walk a result tree, collecting `(__typename, id)` entity references and
/// `Type.field` coordinates.
///
/// Objects without a `__typename` contribute no entity and, unless they sit
/// at the operation root (attributed to `root_type`), no coordinates; their
/// children are still visited.
pub fn collect_facts(data: &Value, root_type: &str, id_fields: &[String]) -> ResultFacts {
    let mut facts = ResultFacts::default();
    walk(data, Some(root_type), id_fields, &mut facts);
    facts
}

fn walk(value: &Value, type_name: Option<&str>, id_fields: &[String], facts: &mut ResultFacts) {
    match value {
        Value::Object(map) => {
            let own_type = map.get("__typename").and_then(Value::as_str);
            if let Some(type_name) = own_type {
                let id = id_fields
                    .iter()
                    .find_map(|field| map.get(field))
                    .and_then(value_as_id);
                facts.entities.insert(EntityRef {
                    type_name: type_name.to_string(),
                    id,
                });
            }

            // An object's own __typename wins over the inherited context.
            let effective = own_type.or(type_name);
            for (field, child) in map {
                if field.as_str() == "__typename" {
                    continue;
                }
                if let Some(parent) = effective {
                    facts.coordinates.insert(format!("{parent}.{field}"));
                }
                walk(child, None, id_fields, facts);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, type_name, id_fields, facts);
            }
        }
        _ => {}
    }
}

/// Entity ids may arrive as strings or numbers; anything else is treated as
/// "no id".
fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
