use crate::declaration::{Method, TypeExpr};
use crate::error::{Error, Result};
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::security::{SecurityDefinitions, SecurityRequirement, SecurityScheme};
use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;

/// OpenAPI version written into every document
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Content type of request and response bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Component every `default` response refers to
pub const ERROR_SCHEMA: &str = "Error";

/// Parameter names with a fixed meaning
const QUERY_BAG_PARAM: &str = "params";
const BODY_PARAM: &str = "body";

static ROUTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z]+) (/.+)\)").expect("valid route pattern"));

static RESPONSE_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9][0-9]$").expect("valid response code pattern"));

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section, omitted when `None`
    info: Option<Info>,
    /// Paths collection (URL path -> PathItem)
    paths: IndexMap<String, PathItem>,
    /// Security schemes and the document-wide requirements
    security: SecurityDefinitions,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// HTTP methods an operation can be routed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn parse(verb: &str) -> Option<Self> {
        let method = match verb {
            "GET" => HttpMethod::Get,
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "HEAD" => HttpMethod::Head,
            "PATCH" => HttpMethod::Patch,
            "TRACE" => HttpMethod::Trace,
            _ => return None,
        };
        Some(method)
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Stores the operation under the method, replacing any previous one
    pub fn set_operation(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Trace => &mut self.trace,
        };
        *slot = Some(operation);
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    /// Operation ID
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters (query, path)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code or `default`
    pub responses: IndexMap<String, Response>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter is required
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Response {
    /// Response description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Components {
    /// Schema definitions
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    /// Security scheme definitions
    #[serde(rename = "securitySchemes", skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas, security schemes)
    pub components: Components,
    /// Document-wide security requirements
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// Method documentation split around its routing line
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDoc {
    /// Text before the routing line, trimmed
    pub description: String,
    /// Verb as written, e.g. `GET`
    pub method: String,
    pub path: String,
    /// Response descriptions keyed by status code or `default`
    pub responses: IndexMap<String, String>,
}

/// Splits method documentation at the first `(METHOD /path)` line.
///
/// Returns `None` when no line carries a route. Lines after the route are
/// read as YAML; entries keyed by a status code or `default` become response
/// descriptions and everything else is ignored.
pub fn parse_operation_doc(doc: &str) -> Option<OperationDoc> {
    let lines: Vec<&str> = doc.split('\n').collect();

    for (i, line) in lines.iter().enumerate() {
        let Some(captures) = ROUTE_PATTERN.captures(line) else {
            continue;
        };
        let description = lines[..i].join("\n").trim().to_string();
        let rest = lines[i + 1..].join("\n");

        return Some(OperationDoc {
            description,
            method: captures[1].to_string(),
            path: captures[2].to_string(),
            responses: response_descriptions(&rest),
        });
    }
    None
}

fn response_descriptions(text: &str) -> IndexMap<String, String> {
    let mut responses = IndexMap::new();
    let value: Value = match serde_yaml::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring malformed response annotations: {}", e);
            return responses;
        }
    };
    let Value::Mapping(entries) = value else {
        return responses;
    };

    for (key, value) in entries {
        let Some(code) = scalar_text(&key) else {
            continue;
        };
        if !is_response_code(&code) {
            continue;
        }
        match scalar_text(&value) {
            Some(description) => {
                responses.insert(code, description);
            }
            None => warn!("Ignoring non-scalar description for response {}", code),
        }
    }
    responses
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_response_code(key: &str) -> bool {
    key == "default" || RESPONSE_CODE_PATTERN.is_match(key)
}

fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_CONTENT_TYPE.to_string(), MediaType { schema });
    content
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Some(Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            }),
            paths: IndexMap::new(),
            security: SecurityDefinitions::default(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Some(Info {
            title,
            version,
            description,
        });
        self
    }

    /// Leave the info section to a hand-written base document
    pub fn without_info(mut self) -> Self {
        self.info = None;
        self
    }

    pub fn set_security(&mut self, security: SecurityDefinitions) {
        self.security = security;
    }

    /// Add an interface method as an operation
    pub fn add_method(&mut self, method: &Method, schema_gen: &SchemaGenerator) -> Result<()> {
        let doc = parse_operation_doc(&method.doc).ok_or_else(|| Error::MissingRoute {
            method: method.name.clone(),
        })?;
        let http_method =
            HttpMethod::parse(&doc.method).ok_or_else(|| Error::UnsupportedHttpMethod {
                method: method.name.clone(),
                verb: doc.method.clone(),
            })?;
        debug!("Adding operation: {} {} {}", method.name, doc.method, doc.path);

        let mut operation = Operation {
            operation_id: method.name.clone(),
            description: Some(doc.description).filter(|d| !d.is_empty()),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
        };

        for (code, description) in doc.responses {
            operation.responses.entry(code).or_default().description = Some(description);
        }

        for param in &method.params {
            match param.name.as_str() {
                QUERY_BAG_PARAM => {
                    let bag = Self::query_bag(&method.name, &param.ty, schema_gen)?;
                    for (name, schema) in &bag.properties {
                        operation.parameters.push(Parameter {
                            name: name.clone(),
                            location: ParameterLocation::Query,
                            required: false,
                            schema: schema.clone(),
                        });
                    }
                }
                BODY_PARAM => {
                    operation.request_body = Some(RequestBody {
                        required: true,
                        content: json_content(schema_gen.generate_schema(&param.ty)),
                    });
                }
                name => operation.parameters.push(Parameter {
                    name: name.to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: schema_gen.generate_schema(&param.ty),
                }),
            }
        }

        if let Some(result) = method.results.first() {
            operation.responses.entry("200".to_string()).or_default().content =
                Some(json_content(schema_gen.generate_schema(result)));
        }
        operation.responses.entry("default".to_string()).or_default().content =
            Some(json_content(Schema::reference(ERROR_SCHEMA)));

        self.paths
            .entry(doc.path)
            .or_default()
            .set_operation(http_method, operation);
        Ok(())
    }

    fn query_bag<'a>(
        method: &str,
        ty: &TypeExpr,
        schema_gen: &'a SchemaGenerator,
    ) -> Result<&'a Schema> {
        let schema = match ty {
            TypeExpr::Named(name) => schema_gen.get_schema(name),
            TypeExpr::Array(_) => None,
        };
        schema
            .filter(|schema| schema.is_object())
            .ok_or_else(|| Error::InvalidQueryParameters {
                method: method.to_string(),
                type_name: ty.to_string(),
            })
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            paths: self.paths,
            components: Components {
                schemas: schema_gen.into_schemas(),
                security_schemes: self.security.schemes,
            },
            security: self.security.requirements,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Declaration, DeclarationModel};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Builds records first, then every interface method
    fn build_document(code: &str) -> Result<OpenApiDocument> {
        let file = syn::parse_file(code).unwrap();
        let model = DeclarationModel::from_file(&file)?;
        let mut schema_gen = SchemaGenerator::new(true, false);
        for record in model.records() {
            schema_gen.add_record(record)?;
        }

        let mut builder = OpenApiBuilder::new();
        for declaration in &model.declarations {
            if let Declaration::Interface(interface) = declaration {
                for method in &interface.methods {
                    builder.add_method(method, &schema_gen)?;
                }
            }
        }
        Ok(builder.build(schema_gen))
    }

    fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_parse_operation_doc() {
        let doc = parse_operation_doc(
            "Description\n\n(GET /pets)\n200: pet response\ndefault: unexpected error\n",
        )
        .unwrap();

        assert_eq!(doc.description, "Description");
        assert_eq!(doc.method, "GET");
        assert_eq!(doc.path, "/pets");
        let responses: Vec<_> = doc
            .responses
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            responses,
            vec![("200", "pet response"), ("default", "unexpected error")]
        );
    }

    #[test]
    fn test_parse_operation_doc_without_route() {
        assert!(parse_operation_doc("Just a description\n200: ok\n").is_none());
        assert!(parse_operation_doc("").is_none());
    }

    #[test]
    fn test_parse_operation_doc_filters_keys() {
        let doc = parse_operation_doc("(DELETE /pets/{id})\n204: deleted\n099: no\nx-note: skip\n")
            .unwrap();
        assert_eq!(doc.description, "");
        assert_eq!(doc.path, "/pets/{id}");
        assert_eq!(doc.responses.keys().collect::<Vec<_>>(), vec!["204"]);
    }

    #[test]
    fn test_parse_operation_doc_malformed_annotations() {
        let doc = parse_operation_doc("(GET /pets)\n200: [unclosed\n").unwrap();
        assert!(doc.responses.is_empty());
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("TRACE"), Some(HttpMethod::Trace));
        assert_eq!(HttpMethod::parse("get"), None);
        assert_eq!(HttpMethod::parse("FETCH"), None);
    }

    #[test]
    fn test_query_bag_path_and_responses() {
        let document = build_document(
            r#"
            pub struct FindPetsParams {
                pub tags: Vec<String>,
                pub limit: i32,
            }

            pub trait Api {
                /// Returns all pets
                ///
                /// (GET /pets)
                /// 200: pet response
                /// default: unexpected error
                fn find_pets(&self, params: FindPetsParams) -> Vec<Pet>;

                /// (GET /pets/{id})
                fn find_pet_by_id(&self, id: i64) -> Pet;
            }
            "#,
        )
        .unwrap();

        let find = document.paths["/pets"].operation(HttpMethod::Get).unwrap();
        assert_eq!(
            to_json(find),
            json!({
                "operationId": "find_pets",
                "description": "Returns all pets",
                "parameters": [
                    {
                        "name": "tags",
                        "in": "query",
                        "schema": {"type": "array", "items": {"type": "string"}}
                    },
                    {
                        "name": "limit",
                        "in": "query",
                        "schema": {"type": "integer", "format": "int32"}
                    }
                ],
                "responses": {
                    "200": {
                        "description": "pet response",
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "array",
                                    "items": {"$ref": "#/components/schemas/Pet"}
                                }
                            }
                        }
                    },
                    "default": {
                        "description": "unexpected error",
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Error"}
                            }
                        }
                    }
                }
            })
        );

        let by_id = document.paths["/pets/{id}"]
            .operation(HttpMethod::Get)
            .unwrap();
        assert_eq!(by_id.description, None);
        assert_eq!(by_id.parameters[0].location, ParameterLocation::Path);
        assert!(by_id.parameters[0].required);
        assert_eq!(
            by_id.responses.keys().collect::<Vec<_>>(),
            vec!["200", "default"]
        );
    }

    #[test]
    fn test_response_order() {
        let document = build_document(
            r#"
            pub trait Api {
                /// (DELETE /pets/{id})
                /// 204: pet deleted
                fn delete_pet(&self, id: i64);
            }
            "#,
        )
        .unwrap();

        let delete = document.paths["/pets/{id}"]
            .operation(HttpMethod::Delete)
            .unwrap();
        assert_eq!(
            delete.responses.keys().collect::<Vec<_>>(),
            vec!["204", "default"]
        );
        assert!(delete.responses["204"].content.is_none());
        assert!(delete.responses["default"].description.is_none());
    }

    #[test]
    fn test_request_body() {
        let document = build_document(
            r#"
            pub trait Api {
                /// (POST /pets)
                fn add_pet(&self, body: NewPet) -> Pet;
            }
            "#,
        )
        .unwrap();

        let add = document.paths["/pets"].operation(HttpMethod::Post).unwrap();
        assert!(add.parameters.is_empty());
        assert_eq!(
            to_json(add.request_body.as_ref().unwrap()),
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": {"$ref": "#/components/schemas/NewPet"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_operations_share_a_path_item() {
        let document = build_document(
            r#"
            pub trait Api {
                /// (GET /pets/{id})
                fn find(&self, id: i64) -> Pet;
                /// (DELETE /pets/{id})
                fn delete(&self, id: i64);
            }
            "#,
        )
        .unwrap();

        assert_eq!(document.paths.len(), 1);
        let item = &document.paths["/pets/{id}"];
        assert!(item.get.is_some());
        assert!(item.delete.is_some());
        assert!(item.post.is_none());
    }

    #[test]
    fn test_missing_route_is_fatal() {
        let result = build_document("pub trait Api { /// Nothing here\n fn m(&self); }");
        assert!(matches!(result, Err(Error::MissingRoute { .. })));
    }

    #[test]
    fn test_unsupported_verb_is_fatal() {
        let result = build_document("pub trait Api { /// (FETCH /pets)\n fn m(&self); }");
        assert!(matches!(result, Err(Error::UnsupportedHttpMethod { .. })));
    }

    #[test]
    fn test_query_bag_must_be_an_object_record() {
        let result = build_document(
            "pub trait Api { /// (GET /pets)\n fn m(&self, params: Missing); }",
        );
        assert!(matches!(result, Err(Error::InvalidQueryParameters { .. })));

        let result = build_document(
            r#"
            pub struct Base { pub a: i32 }
            pub struct Derived { #[serde(flatten)] pub base: Base, pub b: i32 }
            pub trait Api {
                /// (GET /pets)
                fn m(&self, params: Derived);
            }
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidQueryParameters { .. })));
    }

    #[test]
    fn test_build_document_structure() {
        let document = build_document("pub struct User { pub id: u32 }").unwrap();

        assert_eq!(document.openapi, "3.0.0");
        assert_eq!(document.info.as_ref().unwrap().title, "Generated API");
        assert!(document.paths.is_empty());
        assert!(document.components.schemas.contains_key("User"));
        assert!(document.security.is_empty());

        let value = to_json(&document);
        assert_eq!(value["components"].get("securitySchemes"), None);
        assert_eq!(value.get("security"), None);
    }

    #[test]
    fn test_with_and_without_info() {
        let document = OpenApiBuilder::new()
            .with_info("Pets".to_string(), "2.0.0".to_string(), None)
            .build(SchemaGenerator::new(true, false));
        assert_eq!(document.info.unwrap().version, "2.0.0");

        let document = OpenApiBuilder::new()
            .without_info()
            .build(SchemaGenerator::new(true, false));
        assert_eq!(to_json(&document).get("info"), None);
    }

    #[test]
    fn test_route_path_is_kept_as_written() {
        let document = build_document(
            r#"
            pub trait Api {
                /// (GET /pets/:id)
                fn find(&self, id: i64);
                /// (GET /pets/{id}/toys)
                fn toys(&self, id: i64);
            }
            "#,
        )
        .unwrap();

        let paths: Vec<_> = document.paths.keys().cloned().collect();
        assert_eq!(paths, vec!["/pets/:id", "/pets/{id}/toys"]);
    }
}
