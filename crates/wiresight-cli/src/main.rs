//! wiresight - Decode Protocol Buffer payloads into an inspectable field tree
//!
//! This tool parses payload text (hex or base64), decodes it schema-lessly or
//! against supplied `.proto` files, and prints the resulting field tree as
//! JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use wiresight_core::{input, wire, DecodedField, ProtoSource, SchemaRegistry};

/// Decode Protocol Buffer payloads into an inspectable field tree
#[derive(Parser, Debug)]
#[command(name = "wiresight")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    payload: PayloadSource,

    /// .proto file to load; repeatable. Enables schema-based decoding
    #[arg(short, long = "proto", value_name = "FILE")]
    proto: Vec<PathBuf>,

    /// Message type to decode as (defaults to the first registered type)
    #[arg(short, long)]
    message_type: Option<String>,

    /// List registered message types and exit (requires --proto)
    #[arg(long)]
    list_types: bool,

    /// Emit compact single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct PayloadSource {
    /// Payload text, hex or base64
    payload: Option<String>,

    /// Read payload text from a file ('-' for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let registry = if cli.proto.is_empty() {
        None
    } else {
        Some(load_registry(&cli.proto)?)
    };

    if cli.list_types {
        let Some(registry) = &registry else {
            bail!("--list-types requires at least one --proto file");
        };
        for name in registry.message_type_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let text = read_payload_text(&cli.payload)?;
    let bytes = input::parse_payload_text(&text)?;
    debug!("decoding {} payload byte(s)", bytes.len());

    let fields = match &registry {
        Some(registry) => registry.decode(&bytes, cli.message_type.as_deref())?,
        None => {
            if cli.message_type.is_some() {
                bail!("--message-type requires at least one --proto file");
            }
            wire::decode(&bytes)?
        }
    };

    println!("{}", render(&fields, cli.compact)?);
    Ok(())
}

/// Read proto files from disk and compile them into a registry.
fn load_registry(paths: &[PathBuf]) -> Result<SchemaRegistry> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read proto file: {}", path.display()))?;
        sources.push(ProtoSource::new(logical_name(path), text));
    }
    Ok(SchemaRegistry::from_sources(&sources)?)
}

/// The logical source name used for imports and error messages: the file name
/// when available, the full path otherwise.
fn logical_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Obtain the payload text from the positional argument, a file, or stdin.
fn read_payload_text(source: &PayloadSource) -> Result<String> {
    if let Some(text) = &source.payload {
        return Ok(text.clone());
    }

    let Some(path) = &source.input else {
        bail!("a payload argument or --input file is required");
    };

    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read payload from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read payload file: {}", path.display()))
    }
}

/// Render the field tree as JSON.
fn render(fields: &[DecodedField], compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(fields)?
    } else {
        serde_json::to_string_pretty(fields)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_registry_from_files() {
        let mut file = NamedTempFile::with_suffix(".proto").unwrap();
        write!(
            file,
            "syntax = \"proto3\";\nmessage Ping {{ uint32 seq = 1; }}\n"
        )
        .unwrap();

        let registry = load_registry(&[file.path().to_path_buf()]).unwrap();
        assert!(registry
            .message_type_names()
            .contains(&"Ping".to_string()));
    }

    #[test]
    fn test_load_registry_missing_file() {
        let err = load_registry(&[PathBuf::from("/nonexistent/schema.proto")]).unwrap_err();
        assert!(err.to_string().contains("failed to read proto file"));
    }

    #[test]
    fn test_read_payload_text_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "08 96 01").unwrap();

        let source = PayloadSource {
            payload: None,
            input: Some(file.path().to_path_buf()),
        };
        assert_eq!(read_payload_text(&source).unwrap(), "08 96 01");
    }

    #[test]
    fn test_read_payload_text_requires_a_source() {
        let source = PayloadSource {
            payload: None,
            input: None,
        };
        assert!(read_payload_text(&source).is_err());
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let bytes = input::parse_payload_text("08 96 01").unwrap();
        let fields = wire::decode(&bytes).unwrap();

        let compact = render(&fields, true).unwrap();
        assert!(compact.contains("\"fieldNumber\":1"));
        assert!(compact.contains("\"value\":\"150\""));
        assert!(!compact.contains('\n'));

        let pretty = render(&fields, false).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
