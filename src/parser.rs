use crate::declaration::DeclarationModel;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// AST (Abstract Syntax Tree) parser for the declaration source file.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into an abstract syntax tree,
/// which is then lowered into a [`DeclarationModel`].
///
/// # Example
///
/// ```no_run
/// use openapi_from_declarations::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("api/pet_store.rs")).unwrap();
/// let model = parsed.declarations().unwrap();
/// println!("Found {} declarations", model.declarations.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = Self::parse_source(&content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses source text that does not come from a file
    pub fn parse_source(content: &str) -> Result<syn::File> {
        Ok(syn::parse_file(content)?)
    }
}

impl ParsedFile {
    /// Lowers the syntax tree into declarations
    pub fn declarations(&self) -> Result<DeclarationModel> {
        DeclarationModel::from_file(&self.syntax_tree)
            .with_context(|| format!("Invalid declarations in {}", self.path.display()))
    }
}
