use crate::generator::{Config, Generator};
use crate::serializer::OutputFormat;
use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

/// OpenAPI from declarations - generate an OpenAPI document from Rust struct, trait and const declarations
#[derive(Parser, Debug)]
#[command(name = "openapi-from-declarations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Write the lowered declarations instead of the document
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Package name, used as the title of a generated info section
    #[arg(short = 'p', long = "package", value_name = "NAME")]
    pub package: Option<String>,

    /// Rust source file holding the declarations
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Keep field names as declared instead of converting them to lowerCamel
    #[arg(long = "keep-field-names")]
    pub keep_field_names: bool,

    /// Fail on malformed field annotations instead of ignoring them
    #[arg(long = "strict-annotations")]
    pub strict_annotations: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Generation settings for these arguments
    pub fn to_config(&self) -> Config {
        Config {
            debug: self.debug,
            package_name: self.package.clone(),
            input: self.input.clone(),
            output: self.output_path.clone(),
            format: self.output_format,
            camel_case: !self.keep_field_names,
            strict_annotations: self.strict_annotations,
        }
    }
}

/// Logger builder whose filter comes from the environment, falling back to
/// `debug` with `--verbose` and `info` otherwise
pub fn logger_builder(env: Env<'_>, verbose: bool) -> env_logger::Builder {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env.default_filter_or(default_filter))
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if !args.input.is_file() {
        anyhow::bail!("Input path is not a file: {}", args.input.display());
    }

    info!("Input file: {}", args.input.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    if args.debug {
        info!("Debug mode enabled");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let generator = Generator::new(args.to_config())?;
    generator.run()?;
    info!("Generation complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> std::result::Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("openapi-from-declarations").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-i", "api.rs"]).unwrap();
        let config = args.to_config();

        assert_eq!(config.input, PathBuf::from("api.rs"));
        assert_eq!(config.format, OutputFormat::Yaml);
        assert!(config.camel_case);
        assert!(!config.debug);
        assert!(!config.strict_annotations);
        assert!(config.output.is_none());
        assert!(config.package_name.is_none());
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "--debug",
            "-p",
            "petstore",
            "--input",
            "api.rs",
            "-o",
            "out.json",
            "-f",
            "json",
            "--keep-field-names",
            "--strict-annotations",
            "-v",
        ])
        .unwrap();
        let config = args.to_config();

        assert!(config.debug);
        assert_eq!(config.package_name.as_deref(), Some("petstore"));
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.camel_case);
        assert!(config.strict_annotations);
        assert!(args.verbose);
    }

    #[test]
    fn test_input_is_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-f", "toml", "-i", "api.rs"]).is_err());
    }

    #[test]
    fn test_validate_input_path() {
        let temp_dir = TempDir::new().unwrap();

        let missing = parse(&["-i", "/nonexistent/api.rs"]).unwrap();
        let err = parse_args_from_parsed(missing).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let dir = parse(&["-i", temp_dir.path().to_str().unwrap()]).unwrap();
        let err = parse_args_from_parsed(dir).unwrap_err();
        assert!(err.to_string().contains("not a file"));

        let file = temp_dir.path().join("api.rs");
        fs::write(&file, "").unwrap();
        let ok = parse(&["-i", file.to_str().unwrap()]).unwrap();
        assert!(parse_args_from_parsed(ok).is_ok());
    }

    #[test]
    fn test_run_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("api.rs");
        let output = temp_dir.path().join("out").join("openapi.yaml");
        fs::write(&input, "pub struct Error { pub code: i32, pub message: String }").unwrap();

        let args = parse(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        run(args).unwrap();

        let yaml = fs::read_to_string(&output).unwrap();
        assert!(yaml.starts_with("openapi: 3.0.0\n"));
        assert!(yaml.contains("Error:"));
    }

    #[test]
    fn test_debug_mode_writes_declarations() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("api.rs");
        let output = temp_dir.path().join("model.txt");
        fs::write(&input, "pub struct Error { pub code: i32 }").unwrap();

        let args = parse(&[
            "-d",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        run(args).unwrap();

        let dump = fs::read_to_string(&output).unwrap();
        assert!(dump.contains("DeclarationModel"));
        assert!(dump.contains("RecordDecl"));
    }

    #[test]
    fn test_logger_defaults_follow_verbose_flag() {
        let env = || Env::new().filter("OPENAPI_FROM_DECLARATIONS_UNSET_LOG");
        assert_eq!(
            logger_builder(env(), false).build().filter(),
            log::LevelFilter::Info
        );
        assert_eq!(
            logger_builder(env(), true).build().filter(),
            log::LevelFilter::Debug
        );
    }

    #[test]
    fn test_logger_environment_overrides_verbose_flag() {
        std::env::set_var("OPENAPI_FROM_DECLARATIONS_TEST_LOG", "warn");
        let env = Env::new().filter("OPENAPI_FROM_DECLARATIONS_TEST_LOG");
        assert_eq!(
            logger_builder(env, true).build().filter(),
            log::LevelFilter::Warn
        );
    }
}
