// perigen - peripheral description database and code generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use perigen_db::Database;
use perigen_loader::Dialect;
use tracing::info;

const EXIT_SUCCESS: u8 = 0;
const EXIT_EXPLAINED_FAILURE: u8 = 1;

/// Loads a vendor peripheral description and emits either typed code or
/// canonical JSON.
#[derive(Parser, Debug)]
#[command(author, version, about = "Peripheral description database and code generator")]
struct Cli {
    /// Input file. Omit to read from standard input (requires --schema).
    input: Option<PathBuf>,

    /// Dialect of the input document.
    #[arg(short, long, value_name = "svd|atdf|json|dslite|xml")]
    schema: Option<String>,

    /// Output file; created or truncated. Defaults to standard output.
    #[arg(short, long = "output_path", value_name = "path")]
    output_path: Option<PathBuf>,

    /// Emit canonical JSON instead of generated code.
    #[arg(short, long)]
    json: bool,

    /// Increase logging verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(EXIT_EXPLAINED_FAILURE)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let document = read_input(cli.input.as_deref())?;
    let db = load_document(cli, &document)?;

    let rendered = if cli.json {
        perigen_codec::emit_json_string(&db, true).context("failed to render canonical JSON")?
    } else {
        perigen_codegen::generate(&db).context("failed to generate code")?
    };

    write_output(cli.output_path.as_deref(), &rendered)
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            Ok(buf)
        }
    }
}

fn load_document(cli: &Cli, document: &str) -> Result<Database> {
    let schema = resolve_schema(cli, document)?;
    info!(schema = %schema, "loading document");

    if schema == "json" {
        return perigen_codec::load_json_str(document).context("failed to load canonical JSON");
    }

    let dialect = match schema.as_str() {
        "svd" => Dialect::Svd,
        "atdf" => Dialect::Atdf,
        "dslite" => Dialect::Dslite,
        other => return Err(anyhow!("unrecognized schema '{other}'")),
    };
    perigen_loader::load(dialect, document).context("failed to load document")
}

/// Resolves the effective dialect name: an explicit `--schema` wins; `xml`
/// sniffs the document's root element to tell SVD and ATDF apart; otherwise
/// the input path's extension decides.
fn resolve_schema(cli: &Cli, document: &str) -> Result<String> {
    match cli.schema.as_deref() {
        Some("xml") => sniff_xml_dialect(document),
        Some(explicit) => Ok(explicit.to_ascii_lowercase()),
        None => {
            let path = cli
                .input
                .as_deref()
                .ok_or_else(|| anyhow!("--schema is required when reading from standard input"))?;
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .ok_or_else(|| anyhow!("cannot infer a schema from {}", path.display()))?;
            Ok(extension.to_ascii_lowercase())
        }
    }
}

fn sniff_xml_dialect(document: &str) -> Result<String> {
    if document.contains("<avr-tools-device-file") {
        Ok("atdf".to_string())
    } else if document.contains("<device") {
        Ok("svd".to_string())
    } else {
        Err(anyhow!("could not sniff an XML dialect from the document root"))
    }
}

fn write_output(output_path: Option<&Path>, rendered: &str) -> Result<()> {
    match output_path {
        Some(path) => {
            if path.is_relative() {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
            }
            fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
        }
        None => std::io::stdout()
            .write_all(rendered.as_bytes())
            .context("failed to write to standard output"),
    }
}
