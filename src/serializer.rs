//! Serialization module for writing the generated document as YAML or JSON.
//!
//! Both formats keep map keys in insertion order, so a document serializes to
//! the same text every time it is generated from the same declarations.

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Output formats for the generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Serializes a document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_declarations::serializer::serialize_yaml;
/// use serde_yaml::{Mapping, Value};
///
/// let mut doc = Mapping::new();
/// doc.insert(Value::from("openapi"), Value::from("3.0.0"));
/// assert_eq!(serialize_yaml(&doc).unwrap(), "openapi: 3.0.0\n");
/// ```
pub fn serialize_yaml<T: Serialize + ?Sized>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes a document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails, e.g. for a YAML tree with
/// non-scalar mapping keys.
pub fn serialize_json<T: Serialize + ?Sized>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    let mut json =
        serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")?;
    json.push('\n');
    Ok(json)
}

/// Serializes a document in the requested format
pub fn serialize<T: Serialize + ?Sized>(doc: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(doc),
        OutputFormat::Json => serialize_json(doc),
    }
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Writes to the file when a path is given, otherwise to stdout
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => write_to_file(content, path),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}
