//! Generation driver: turns a declaration model into the final document tree.

use crate::declaration::{Declaration, DeclarationModel, LiteralDecl, LiteralKind};
use crate::error::Error;
use crate::merge::{merge_tree, order_top_level};
use crate::openapi_builder::OpenApiBuilder;
use crate::parser::AstParser;
use crate::schema_generator::SchemaGenerator;
use crate::security::generate_security_schemes;
use crate::serializer::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;

/// Title used when no package name is given
pub const DEFAULT_TITLE: &str = "Generated API";
/// Version written into a generated info section
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Write the lowered declarations instead of the document
    pub debug: bool,
    /// Name hint used as the generated info title
    pub package_name: Option<String>,
    /// Declaration source file
    pub input: PathBuf,
    /// Output file, stdout when `None`
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    /// Convert property names to lowerCamel
    pub camel_case: bool,
    /// Fail on malformed field annotations
    pub strict_annotations: bool,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            debug: false,
            package_name: None,
            input: input.into(),
            output: None,
            format: OutputFormat::Yaml,
            camel_case: true,
            strict_annotations: false,
        }
    }
}

pub struct Generator {
    config: Config,
}

impl Generator {
    /// Creates a generator, rejecting a config without an input file
    pub fn new(config: Config) -> Result<Self> {
        if config.input.as_os_str().is_empty() {
            bail!("An input file is required");
        }
        Ok(Self { config })
    }

    /// Parses the input, generates the document and writes it out
    pub fn run(&self) -> Result<()> {
        let parsed = AstParser::parse_file(&self.config.input)?;
        let model = parsed.declarations()?;

        let content = if self.config.debug {
            info!("Debug mode: writing lowered declarations");
            format!("{:#?}\n", model)
        } else {
            let tree = self.generate(&model)?;
            self.render(&tree)?
        };

        serializer::write_output(&content, self.config.output.as_deref())?;
        if let Some(output) = &self.config.output {
            info!("Wrote {}", output.display());
        }
        Ok(())
    }

    /// Builds the final, ordered document tree.
    ///
    /// Records are registered before anything else, so a query parameter
    /// record may be declared after the interface that uses it. Literals and
    /// interfaces are then handled in declaration order.
    pub fn generate(&self, model: &DeclarationModel) -> Result<Mapping> {
        let mut schema_gen =
            SchemaGenerator::new(self.config.camel_case, self.config.strict_annotations);
        for record in model.records() {
            schema_gen.add_record(record)?;
        }
        debug!("Registered {} components", schema_gen.get_schemas().len());

        let mut builder = OpenApiBuilder::new();
        let mut base = Mapping::new();
        for declaration in &model.declarations {
            match declaration {
                Declaration::Record(_) => {}
                Declaration::Literal(literal) => match literal.kind() {
                    Some(LiteralKind::BaseDocument) => {
                        merge_tree(&mut base, &parse_base_document(literal)?);
                    }
                    Some(LiteralKind::Security) => {
                        builder.set_security(generate_security_schemes(&literal.value)?);
                    }
                    None => debug!("Ignoring literal {}", literal.name),
                },
                Declaration::Interface(interface) => {
                    debug!("Building operations of {}", interface.name);
                    for method in &interface.methods {
                        builder
                            .add_method(method, &schema_gen)
                            .with_context(|| format!("In interface {}", interface.name))?;
                    }
                }
            }
        }

        builder = if base.contains_key("info") {
            builder.without_info()
        } else {
            let title = self.config.package_name.as_deref().unwrap_or(DEFAULT_TITLE);
            builder.with_info(title.to_string(), DEFAULT_VERSION.to_string(), None)
        };

        let document = builder.build(schema_gen);
        let generated = match serde_yaml::to_value(&document)
            .context("Failed to convert the generated document")?
        {
            Value::Mapping(mapping) => mapping,
            _ => bail!("Generated document is not a mapping"),
        };

        merge_tree(&mut base, &generated);
        Ok(order_top_level(base))
    }

    /// Serializes the tree in the configured format
    pub fn render(&self, tree: &Mapping) -> Result<String> {
        serializer::serialize(tree, self.config.format)
    }
}

fn parse_base_document(literal: &LiteralDecl) -> std::result::Result<Mapping, Error> {
    match serde_yaml::from_str::<Value>(&literal.value) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(other) => Err(Error::InvalidBaseDocument(format!(
            "{} must be a mapping, got {:?}",
            literal.name, other
        ))),
        Err(e) => Err(Error::InvalidBaseDocument(format!("{}: {}", literal.name, e))),
    }
}
