//! OpenAPI from declarations - OpenAPI documents from Rust declarations.
//!
//! A single Rust source file describes an API:
//!
//! - `struct`s are schema components. A `#[serde(flatten)]` field names the
//!   parent record and a `#[tag = "{min:1,max:10}"]` attribute adds
//!   validation constraints to a field.
//! - `trait` methods are operations. Their doc comments carry a
//!   `(METHOD /path)` routing line followed by `code: description` lines.
//!   A parameter named `params` is a bag of query parameters, one named
//!   `body` is the request body and every other parameter is a path
//!   parameter.
//! - the string constant `OPENAPI_SPEC` is a hand-written document fragment
//!   merged under the generated sections, and `AUTH` declares security
//!   schemes.
//!
//! # Architecture
//!
//! 1. [`parser`] - Parses the source file into an Abstract Syntax Tree (AST)
//! 2. [`declaration`] - Lowers the AST into a declaration model
//! 3. [`annotation`] - Reads field annotations
//! 4. [`constraint`] - Expands constraint shorthands into schema keywords
//! 5. [`schema_generator`] - Maps types to schemas and builds components
//! 6. [`openapi_builder`] - Builds operations and the document
//! 7. [`security`] - Builds security schemes and requirements
//! 8. [`merge`] - Merges ordered trees
//! 9. [`generator`] - Drives generation end to end
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```
//! use openapi_from_declarations::{
//!     declaration::DeclarationModel,
//!     generator::{Config, Generator},
//!     parser::AstParser,
//! };
//!
//! let source = r#"
//!     pub struct Error {
//!         pub code: i32,
//!         pub message: String,
//!     }
//!
//!     pub trait Health {
//!         /// Reports service health
//!         ///
//!         /// (GET /health)
//!         /// 200: healthy
//!         fn health(&self) -> String;
//!     }
//! "#;
//!
//! let file = AstParser::parse_source(source).unwrap();
//! let model = DeclarationModel::from_file(&file).unwrap();
//! let generator = Generator::new(Config::new("health.rs")).unwrap();
//! let tree = generator.generate(&model).unwrap();
//! let yaml = generator.render(&tree).unwrap();
//! assert!(yaml.contains("operationId: health"));
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod annotation;
pub mod cli;
pub mod constraint;
pub mod declaration;
pub mod error;
pub mod generator;
pub mod merge;
pub mod openapi_builder;
pub mod parser;
pub mod schema_generator;
pub mod security;
pub mod serializer;
