//! Where-clause compiler that renders condition groups into NocoDB's
//! string filter grammar.
//!
//! The grammar is `(field,op,value)` atoms joined by `~and` / `~or` inside a
//! group and by `~or` between groups. An atom with no rendered values uses
//! the backend's "any value" wildcard: `(field,op,*)`. The grammar must stay
//! bit-exact for backend compatibility.

use serde_json::Value;

use crate::filter::{ConditionGroup, SortField};
use crate::params::{resolve_id, SortFieldParam};

/// A logical operator mapped onto the backend's operator token plus the
/// rendered value list for the atom.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedOperator {
    pub op: String,
    pub values: Vec<String>,
}

impl MappedOperator {
    fn new(op: &str, values: Vec<String>) -> Self {
        Self {
            op: op.to_string(),
            values,
        }
    }
}

/// Coerce a raw condition value to its string form, "" when absent.
fn value_to_string(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Split a comma-separated value, trimming entries and dropping empty ones.
fn listify(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map a logical operator and raw value onto the backend operator token and
/// value list.
///
/// Never fails: unrecognized operators degrade to `eq` with the
/// single-element-or-empty value rule. Permissiveness over strict validation.
pub fn map_operator_and_value(operator: &str, raw_value: Option<&Value>) -> MappedOperator {
    let value = value_to_string(raw_value);
    let single = |op: &str| {
        let values = if value.is_empty() {
            Vec::new()
        } else {
            vec![value.clone()]
        };
        MappedOperator::new(op, values)
    };

    match operator {
        "contains" => MappedOperator::new("like", vec![format!("%{value}%")]),
        "not_contains" => MappedOperator::new("nlike", vec![format!("%{value}%")]),
        "starts_with" => MappedOperator::new("like", vec![format!("{value}%")]),
        "ends_with" => MappedOperator::new("like", vec![format!("%{value}")]),
        "in" | "anyof" | "allof" | "nallof" | "nanyof" => {
            MappedOperator::new(operator, listify(&value))
        }
        "btw" | "nbtw" => {
            let mut values = listify(&value);
            values.truncate(2);
            MappedOperator::new(operator, values)
        }
        "is" | "isnot" | "like" | "nlike" | "gt" | "ge" | "lt" | "le" | "eq" | "neq"
        | "isWithin" => single(operator),
        "not" => single("neq"),
        _ => single("eq"),
    }
}

/// Compile a filter tree into the backend's where-clause string.
///
/// Conditions whose field does not resolve to a non-empty id are dropped;
/// groups rendering zero conditions are omitted entirely. An empty result
/// means "no filter" and the caller omits the query parameter.
pub fn build_where(groups: &[ConditionGroup]) -> String {
    let mut parts = Vec::new();
    for group in groups {
        let mut rendered = Vec::new();
        for condition in &group.conditions {
            let field = resolve_id(condition.field.as_ref());
            if field.is_empty() {
                continue;
            }
            let operator = match condition.operator.as_deref() {
                Some(op) if !op.is_empty() => op,
                _ => "eq",
            };
            let mapped = map_operator_and_value(operator, condition.value.as_ref());
            let value_part = if mapped.values.is_empty() {
                ",*".to_string()
            } else {
                format!(",{}", mapped.values.join(","))
            };
            rendered.push(format!("({},{}{})", field, mapped.op, value_part));
        }
        if !rendered.is_empty() {
            parts.push(rendered.join(&format!("~{}", group.logic.as_str())));
        }
    }
    parts.join("~or")
}

/// Encode sort keys as the backend's JSON sort parameter: a single object
/// for one key, an array for several. Entries without a resolvable field
/// are dropped; direction defaults to ascending.
pub fn encode_sort(sort_fields: &[SortFieldParam]) -> Option<String> {
    let resolved: Vec<SortField> = sort_fields
        .iter()
        .map(|s| SortField {
            direction: s
                .direction
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "asc".to_string()),
            field: resolve_id(s.field.as_ref()),
        })
        .filter(|s| !s.field.is_empty())
        .collect();

    if resolved.is_empty() {
        return None;
    }
    let encoded = if resolved.len() == 1 {
        serde_json::to_string(&resolved[0])
    } else {
        serde_json::to_string(&resolved)
    };
    encoded.ok()
}
