//! CLI entry point for `tnefextract`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use tnefextract::config::{self, Config};
use tnefextract::export;
use tnefextract::model::message::TnefFile;
use tnefextract::DecodeOptions;

#[derive(Parser)]
#[command(
    name = "tnefextract",
    version,
    about = "Extract attachments and rich-text bodies from TNEF (winmail.dat) files"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TNEF file(s) to extract (shorthand for `extract`)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Output directory (defaults to the configured directory, then "out")
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract bodies and attachments to an output directory
    Extract {
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not write `.raw` metadata sidecars
        #[arg(long)]
        no_meta: bool,
    },
    /// Show what a container holds without writing anything
    Info {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Extract {
            files,
            output,
            no_meta,
        }) => cmd_extract(&files, output.or(cli.output), !no_meta, &config),
        Some(Commands::Info { file, json }) => cmd_info(&file, json, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => {
            if cli.files.is_empty() {
                Cli::command().print_help()?;
                std::process::exit(2);
            }
            cmd_extract(&cli.files, cli.output, true, &config)
        }
    }
}

/// Set up tracing with stderr output and a rolling log file in the cache dir.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "tnefextract.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Decode each input and write its artifacts.
///
/// A failing input is reported and skipped; the process exits non-zero if
/// any input failed.
fn cmd_extract(
    files: &[PathBuf],
    output: Option<PathBuf>,
    write_meta: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let output_dir = output.unwrap_or_else(|| config.export.default_output_dir.clone());
    let write_meta = write_meta && config.export.write_meta_sidecars;
    let options = DecodeOptions {
        max_body_size: config.limits.max_body_size,
    };

    let progress = if files.len() > 1 {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .expect("static template is valid"),
        );
        Some(bar)
    } else {
        None
    };

    let mut failures = 0usize;
    for file in files {
        if let Some(bar) = &progress {
            bar.set_message(file.display().to_string());
        }
        match extract_one(file, &output_dir, write_meta, &options) {
            Ok(written) => {
                info!(file = %file.display(), files_written = written, "Extraction complete");
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e:#}", file.display());
            }
        }
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} input(s) failed", files.len());
    }
    Ok(())
}

/// Decode one file and write everything it contains. Returns the number of
/// files written.
fn extract_one(
    file: &Path,
    output_dir: &Path,
    write_meta: bool,
    options: &DecodeOptions,
) -> anyhow::Result<usize> {
    let tnef = tnefextract::decode_file_with_options(file, options)?;
    log_warnings(&tnef);

    let stem = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "winmail".to_string());

    let mut written = 0;
    for path in export::body::export_bodies(&tnef, &stem, output_dir)? {
        println!("Saved body to: {}", path.display());
        written += 1;
    }
    for path in export::attachment::export_attachments(&tnef, output_dir, write_meta)? {
        println!("Saved attachment file to: {}", path.display());
        written += 1;
    }
    Ok(written)
}

/// Surface decode warnings as log lines.
fn log_warnings(tnef: &TnefFile) {
    for warning in &tnef.warnings {
        warn!(%warning, "Decode warning");
    }
}

/// Print a summary of a container's contents.
fn cmd_info(file: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let options = DecodeOptions {
        max_body_size: config.limits.max_body_size,
    };
    let tnef = tnefextract::decode_file_with_options(file, &options)?;

    if json {
        let summary = serde_json::json!({
            "file": file.display().to_string(),
            "key": tnef.key,
            "version": tnef.version,
            "oem_codepage": tnef.oem_codepage,
            "message_class": tnef.message_class,
            "message_attributes": tnef.message_attributes.iter().map(|a| serde_json::json!({
                "tag": format!("{:#010x}", a.tag),
                "type": a.data_type,
                "size": a.payload.len(),
                "checksum_valid": a.checksum_valid,
            })).collect::<Vec<_>>(),
            "bodies": tnef.bodies.iter().map(|b| serde_json::json!({
                "kind": b.kind,
                "size": b.data.len(),
            })).collect::<Vec<_>>(),
            "attachments": tnef.attachments.iter().map(|a| serde_json::json!({
                "filename": a.filename,
                "size": a.size(),
                "meta_attributes": a.raw_meta.len(),
            })).collect::<Vec<_>>(),
            "warnings": tnef.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("File:          {}", file.display());
    println!("Legacy key:    {:#06x}", tnef.key);
    if let Some(version) = tnef.version {
        println!("TNEF version:  {:#010x}", version);
    }
    if let Some((primary, secondary)) = tnef.oem_codepage {
        println!("OEM codepage:  {primary} (secondary {secondary})");
    }
    if let Some(class) = &tnef.message_class {
        println!("Message class: {class}");
    }

    println!("\nMessage attributes ({}):", tnef.message_attributes.len());
    for attr in &tnef.message_attributes {
        println!(
            "  {:#010x}  {:<9}  {:>10}  {}",
            attr.tag,
            format!("{:?}", attr.data_type),
            format_size(attr.payload.len() as u64, DECIMAL),
            if attr.checksum_valid { "" } else { "checksum mismatch" }
        );
    }

    println!("\nBodies ({}):", tnef.bodies.len());
    for body in &tnef.bodies {
        println!(
            "  {:?}  {}",
            body.kind,
            format_size(body.data.len() as u64, DECIMAL)
        );
    }

    println!("\nAttachments ({}):", tnef.attachments.len());
    for attachment in &tnef.attachments {
        let name = if attachment.filename.is_empty() {
            "<unnamed>"
        } else {
            attachment.filename.as_str()
        };
        println!(
            "  {:<40}  {:>10}  {} meta attribute(s)",
            name,
            format_size(attachment.size(), DECIMAL),
            attachment.raw_meta.len()
        );
    }

    if !tnef.warnings.is_empty() {
        println!("\nWarnings ({}):", tnef.warnings.len());
        for warning in &tnef.warnings {
            println!("  {warning}");
        }
    }

    Ok(())
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    man.render(&mut std::io::stdout())?;
    Ok(())
}
