use crate::annotation::KeyValue;
use crate::schema_generator::Schema;
use log::{debug, warn};
use serde_json::Value;

/// Rewrites shorthand constraint keys into validation keywords for the
/// schema's declared type.
///
/// | key   | integer / number                   | string      | array      |
/// |-------|------------------------------------|-------------|------------|
/// | `min` | `minimum`                          | `minLength` | `minItems` |
/// | `max` | `maximum`                          | `maxLength` | `maxItems` |
/// | `gt`  | `minimum` + `exclusiveMinimum`     | -           | -          |
/// | `lt`  | `maximum` + `exclusiveMaximum`     | -           | -          |
///
/// Other keys are copied through. Shorthand keys that have no meaning for the
/// schema's type are dropped.
pub fn expand_constraints(schema: &mut Schema, tag: &KeyValue) {
    let kind = schema.schema_type.clone().unwrap_or_default();
    let numeric = kind == "integer" || kind == "number";

    for (key, value) in tag {
        match key.as_str() {
            "min" => match kind.as_str() {
                _ if numeric => schema.set_keyword("minimum", value.clone()),
                "string" => schema.set_keyword("minLength", value.clone()),
                "array" => schema.set_keyword("minItems", value.clone()),
                _ => dropped(key, &kind),
            },
            "max" => match kind.as_str() {
                _ if numeric => schema.set_keyword("maximum", value.clone()),
                "string" => schema.set_keyword("maxLength", value.clone()),
                "array" => schema.set_keyword("maxItems", value.clone()),
                _ => dropped(key, &kind),
            },
            "gt" if numeric => {
                schema.set_keyword("minimum", value.clone());
                schema.set_keyword("exclusiveMinimum", Value::Bool(true));
            }
            "lt" if numeric => {
                schema.set_keyword("maximum", value.clone());
                schema.set_keyword("exclusiveMaximum", Value::Bool(true));
            }
            "gt" | "lt" => dropped(key, &kind),
            "type" | "format" => match value {
                Value::String(s) if key == "type" => schema.schema_type = Some(s.clone()),
                Value::String(s) => schema.format = Some(s.clone()),
                other => warn!("Ignoring non-string {} annotation: {}", key, other),
            },
            _ => schema.set_keyword(key, value.clone()),
        }
    }
}

fn dropped(key: &str, kind: &str) {
    debug!("Constraint {} has no meaning for type {:?}, dropped", key, kind);
}
