//! OpenAPI from declarations - command-line tool for generating OpenAPI documents.
//!
//! Reads one Rust source file of declarations (records as structs, operations as
//! trait methods, base document and security schemes as string constants) and
//! writes an OpenAPI 3.0 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-declarations [OPTIONS] --input <FILE>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-declarations -i api/pet_store.rs -o openapi.yaml
//! ```
//!
//! Generate JSON documentation:
//! ```bash
//! openapi-from-declarations -i api/pet_store.rs -f json -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-declarations -i api/pet_store.rs -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_declarations::cli;

fn main() -> Result<()> {
    // Parse once for the verbose flag, validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    cli::logger_builder(env_logger::Env::default(), args_for_verbose.verbose).init();

    info!("OpenAPI from declarations starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
