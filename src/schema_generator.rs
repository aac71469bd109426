use crate::annotation::{parse_tag, KeyValue};
use crate::constraint::expand_constraints;
use crate::declaration::{Field, RecordDecl, TypeExpr};
use crate::error::{Error, Result};
use heck::ToLowerCamelCase;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

/// Prefix of every component reference
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Schema generator - maps declared types to schemas and builds the
/// component registry from records
pub struct SchemaGenerator {
    /// Registered components, in registration order
    schemas: IndexMap<String, Schema>,
    /// Convert property names to lowerCamel
    camel_case: bool,
    /// Fail on malformed field annotations instead of ignoring them
    strict_annotations: bool,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Composition used for an embedded parent record
    #[serde(rename = "allOf", skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Validation keywords and anything else copied from annotations
    #[serde(flatten)]
    pub keywords: KeyValue,
}

impl Schema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Default::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type("array")
        }
    }

    pub fn set_keyword(&mut self, key: &str, value: Value) {
        self.keywords.insert(key.to_string(), value);
    }

    /// Whether this is a plain object schema whose properties can be listed
    pub fn is_object(&self) -> bool {
        self.schema_type.as_deref() == Some("object") && self.all_of.is_empty()
    }
}

/// Primitive identifiers with a fixed schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Int,
    I8,
    I16,
    I32,
    I64,
    I128,
    UInt,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Bool,
    String,
    Char,
}

impl PrimitiveType {
    pub fn parse(name: &str) -> Option<Self> {
        let primitive = match name {
            "isize" => PrimitiveType::Int,
            "i8" => PrimitiveType::I8,
            "i16" => PrimitiveType::I16,
            "i32" => PrimitiveType::I32,
            "i64" => PrimitiveType::I64,
            "i128" => PrimitiveType::I128,
            "usize" => PrimitiveType::UInt,
            "u8" => PrimitiveType::U8,
            "u16" => PrimitiveType::U16,
            "u32" => PrimitiveType::U32,
            "u64" => PrimitiveType::U64,
            "u128" => PrimitiveType::U128,
            "f32" => PrimitiveType::F32,
            "f64" => PrimitiveType::F64,
            "bool" => PrimitiveType::Bool,
            "String" | "str" => PrimitiveType::String,
            "char" => PrimitiveType::Char,
            _ => return None,
        };
        Some(primitive)
    }

    /// Convert a primitive type to an OpenAPI schema
    pub fn to_schema(self) -> Schema {
        let (schema_type, format) = match self {
            PrimitiveType::Int | PrimitiveType::UInt => ("integer", None),
            PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 => {
                ("integer", Some("int32"))
            }
            PrimitiveType::U8 | PrimitiveType::U16 | PrimitiveType::U32 => {
                ("integer", Some("int32"))
            }
            PrimitiveType::I64 | PrimitiveType::I128 => ("integer", Some("int64")),
            PrimitiveType::U64 | PrimitiveType::U128 => ("integer", Some("int64")),
            PrimitiveType::F32 => ("number", Some("float")),
            PrimitiveType::F64 => ("number", Some("double")),
            PrimitiveType::Bool => ("boolean", None),
            PrimitiveType::String | PrimitiveType::Char => ("string", None),
        };

        Schema {
            format: format.map(|s| s.to_string()),
            ..Schema::of_type(schema_type)
        }
    }
}

impl SchemaGenerator {
    pub fn new(camel_case: bool, strict_annotations: bool) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            schemas: IndexMap::new(),
            camel_case,
            strict_annotations,
        }
    }

    /// Generate a schema for a declared type. Named types that are not
    /// primitives become references, whether or not they are registered.
    pub fn generate_schema(&self, ty: &TypeExpr) -> Schema {
        match ty {
            TypeExpr::Array(inner) => Schema::array(self.generate_schema(inner)),
            TypeExpr::Named(name) => match PrimitiveType::parse(name) {
                Some(primitive) => primitive.to_schema(),
                None => Schema::reference(name),
            },
        }
    }

    /// Builds the component for a record and registers it under the
    /// record's name.
    pub fn add_record(&mut self, record: &RecordDecl) -> Result<()> {
        debug!("Generating component schema for: {}", record.name);

        let mut parent: Option<&str> = None;
        let mut object = Schema::of_type("object");

        for field in &record.fields {
            match field {
                Field::Embedded { parent: name } => {
                    if parent.is_some() {
                        return Err(Error::MultipleEmbeddedFields {
                            record: record.name.clone(),
                        });
                    }
                    parent = Some(name);
                }
                Field::Named {
                    name,
                    ty,
                    annotation,
                } => {
                    let mut property = self.generate_schema(ty);
                    if let Some(annotation) = annotation {
                        let tag = self.field_annotation(&record.name, name, annotation)?;
                        expand_constraints(&mut property, &tag);
                    }

                    let property_name = self.property_name(name);
                    object.required.push(property_name.clone());
                    object.properties.insert(property_name, property);
                }
            }
        }

        let schema = match parent {
            Some(parent) => Schema {
                all_of: vec![Schema::reference(parent), object],
                ..Default::default()
            },
            None => object,
        };

        self.schemas.insert(record.name.clone(), schema);
        Ok(())
    }

    fn field_annotation(&self, record: &str, field: &str, annotation: &str) -> Result<KeyValue> {
        match parse_tag(annotation) {
            Ok(tag) => Ok(tag),
            Err(e) if self.strict_annotations => Err(Error::MalformedAnnotation {
                field: format!("{}.{}", record, field),
                message: e.to_string(),
            }),
            Err(e) => {
                warn!(
                    "Ignoring malformed annotation on {}.{}: {}",
                    record, field, e
                );
                Ok(KeyValue::new())
            }
        }
    }

    fn property_name(&self, name: &str) -> String {
        if self.camel_case {
            name.to_lower_camel_case()
        } else {
            name.to_string()
        }
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Get all generated schemas
    pub fn get_schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }
}
