//! Language-neutral output-schema descriptors for schema-constrained decoding.
//!
//! The model gateway turns a [`ResponseSchema`] into the provider's
//! `responseSchema` JSON; keeping the descriptors here means the stages never
//! couple to one provider's schema dialect.

use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
    /// String restricted to a closed set of values.
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl SchemaField {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false }
    }
}

/// One record shape (an object with typed fields).
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub fields: &'static [SchemaField],
}

/// What the gateway asks the model to emit: an ordered list of records.
#[derive(Debug, Clone, Copy)]
pub struct ResponseSchema {
    pub items: RecordSchema,
}

impl ResponseSchema {
    /// Render to the Gemini `responseSchema` dialect
    /// (`{"type": "ARRAY", "items": {"type": "OBJECT", ...}}`).
    pub fn to_gemini(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for f in self.items.fields {
            let prop = match f.kind {
                FieldKind::Str => json!({"type": "STRING"}),
                FieldKind::Int => json!({"type": "INTEGER"}),
                FieldKind::Bool => json!({"type": "BOOLEAN"}),
                FieldKind::Enum(values) => json!({"type": "STRING", "enum": values}),
            };
            let prop = if f.required {
                prop
            } else {
                let mut p = prop;
                p["nullable"] = json!(true);
                p
            };
            properties.insert(f.name.to_string(), prop);
            if f.required {
                required.push(f.name);
            }
        }

        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": Value::Object(properties),
                "required": required,
            }
        })
    }
}

/// "Ordered sequence of Task": the extraction stage's output contract.
pub const fn task_list_schema() -> ResponseSchema {
    const FIELDS: &[SchemaField] = &[
        SchemaField::required("id", FieldKind::Str),
        SchemaField::required("title", FieldKind::Str),
        SchemaField::required("priority", FieldKind::Enum(&["P1", "P2", "P3"])),
        SchemaField::required("estimated_duration_minutes", FieldKind::Int),
        SchemaField::required("constraint_type", FieldKind::Enum(&["fixed", "flexible"])),
        SchemaField::optional("fixed_time_iso", FieldKind::Str),
    ];
    ResponseSchema { items: RecordSchema { fields: FIELDS } }
}

/// "Ordered sequence of ScheduleEvent": the optimizer's output contract.
pub const fn event_list_schema() -> ResponseSchema {
    const FIELDS: &[SchemaField] = &[
        SchemaField::required("summary", FieldKind::Str),
        SchemaField::required("start_iso", FieldKind::Str),
        SchemaField::required("end_iso", FieldKind::Str),
        SchemaField::optional("description", FieldKind::Str),
        SchemaField::required("event_type", FieldKind::Enum(&["task", "break", "buffer"])),
    ];
    ResponseSchema { items: RecordSchema { fields: FIELDS } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_schema_renders_gemini_dialect() {
        let schema = task_list_schema().to_gemini();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["type"], "OBJECT");
        assert_eq!(
            schema["items"]["properties"]["priority"]["enum"],
            serde_json::json!(["P1", "P2", "P3"])
        );
        // optional fields are nullable and not listed as required
        assert_eq!(schema["items"]["properties"]["fixed_time_iso"]["nullable"], true);
        let required = schema["items"]["required"].as_array().unwrap();
        assert!(!required.iter().any(|v| v == "fixed_time_iso"));
        assert!(required.iter().any(|v| v == "id"));
    }

    #[test]
    fn test_event_schema_covers_event_types() {
        let schema = event_list_schema().to_gemini();
        assert_eq!(
            schema["items"]["properties"]["event_type"]["enum"],
            serde_json::json!(["task", "break", "buffer"])
        );
    }
}
