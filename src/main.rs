//! # utfcodec CLI - Unicode Transcoder
//!
//! Command-line interface for converting files between UTF-8, UTF-16 and
//! UTF-32, and for inspecting their byte order marks.

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::{Context, Result, bail};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use tracing::{Level, debug, info};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use utfcodec::detection::{ByteOrderDetector, DetectionResult, detect_bom};
#[cfg(feature = "cli")]
use utfcodec::{Encoding, Family, Translator};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// utfcodec: convert between UTF-8, UTF-16 and UTF-32
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "utfcodec")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (text, json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Convert a file between Unicode encodings
    Convert(ConvertArgs),

    /// Report the BOM and byte order of a file
    Detect(DetectArgs),

    /// List all supported encodings
    List,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConvertArgs {
    /// Source encoding
    #[arg(short = 'f', long = "from")]
    from: EncodingArg,

    /// Target encoding
    #[arg(short = 't', long = "to")]
    to: EncodingArg,

    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Add BOM to output
    #[arg(long)]
    bom: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct DetectArgs {
    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Family to sniff the byte order for when no BOM is present
    #[arg(long, value_enum)]
    family: Option<FamilyArg>,

    /// Maximum bytes to scan for byte order evidence
    #[arg(long)]
    sample_size: Option<usize>,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, Debug, ValueEnum)]
enum FamilyArg {
    #[value(name = "utf-16", alias = "utf16")]
    Utf16,
    #[value(name = "utf-32", alias = "utf32")]
    Utf32,
}

#[cfg(feature = "cli")]
impl From<FamilyArg> for Family {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Utf16 => Family::Utf16,
            FamilyArg::Utf32 => Family::Utf32,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, Debug, PartialEq)]
struct EncodingArg(Encoding);

#[cfg(feature = "cli")]
impl std::str::FromStr for EncodingArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let encoding = match s.to_uppercase().as_str() {
            "UTF8" | "UTF-8" => Encoding::UTF8,
            "UTF16" | "UTF-16" => Encoding::UTF16,
            "UTF16LE" | "UTF-16LE" => Encoding::UTF16LE,
            "UTF16BE" | "UTF-16BE" => Encoding::UTF16BE,
            "UTF32" | "UTF-32" => Encoding::UTF32,
            "UTF32LE" | "UTF-32LE" => Encoding::UTF32LE,
            "UTF32BE" | "UTF-32BE" => Encoding::UTF32BE,
            _ => bail!("Unknown encoding: {s}. Use utf-8, utf-16[le|be] or utf-32[le|be]"),
        };

        Ok(EncodingArg(encoding))
    }
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionReport {
    from: Encoding,
    to: Encoding,
    bom_added: bool,
    bytes_processed: usize,
    bytes_written: usize,
    processing_time_ms: u64,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct DetectionReport {
    bom: Option<Encoding>,
    bom_len: usize,
    #[serde(flatten)]
    byte_order: Option<DetectionResult>,
    input_size: usize,
    sample_size: usize,
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Convert(ref args) => convert_command(args, &cli)?,
        Commands::Detect(ref args) => detect_command(args, &cli)?,
        Commands::List => list_command(&cli)?,
    }

    Ok(())
}

/// Reject requests that can never succeed before touching any file
#[cfg(feature = "cli")]
fn precheck(from: Encoding, to: Encoding) -> Result<()> {
    if from == to {
        bail!(
            "incorrect source/target encoding provided. cannot encode {} again to {}",
            from,
            to
        );
    }
    if !from.supports(to) {
        bail!("{} to {} not implemented", from, to);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => {
            info!("Reading from: {}", path.display());
            fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
        }
        None => {
            info!("Reading from stdin");
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(feature = "cli")]
fn convert_command(args: &ConvertArgs, cli: &Cli) -> Result<()> {
    let start_time = std::time::Instant::now();

    let EncodingArg(from) = args.from;
    let EncodingArg(to) = args.to;
    precheck(from, to)?;

    info!("Converting from {} to {}", from, to);

    let translator = Translator::new(from, to)
        .with_context(|| format!("Failed to create translator from {from} to {to}"))?
        .with_bom(args.bom);

    let input_data = read_input(args.input.as_deref())?;
    let output_data = translator
        .convert(&input_data)
        .with_context(|| format!("Conversion from {from} to {to} failed"))?;

    match args.output {
        Some(ref output_path) => {
            fs::write(output_path, &output_data).with_context(|| {
                format!("Failed to write output file: {}", output_path.display())
            })?;
            info!("Wrote to: {}", output_path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&output_data)
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")?;
        }
    }

    let processing_time = start_time.elapsed();
    debug!(
        "Processed {} bytes -> {} bytes in {:?}",
        input_data.len(),
        output_data.len(),
        processing_time
    );

    if let OutputFormat::Json = cli.format {
        let report = ConversionReport {
            from,
            to,
            bom_added: args.bom,
            bytes_processed: input_data.len(),
            bytes_written: output_data.len(),
            processing_time_ms: processing_time.as_millis() as u64,
        };
        let json = serde_json::to_string_pretty(&report)?;
        // stdout already carries the converted bytes
        if args.output.is_some() {
            println!("{json}");
        } else {
            eprintln!("{json}");
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn detect_command(args: &DetectArgs, cli: &Cli) -> Result<()> {
    let sample_data = read_input(args.input.as_deref())?;

    let detector = match args.sample_size {
        Some(size) => ByteOrderDetector::with_sample_size(size),
        None => ByteOrderDetector::new(),
    };
    let report = detection_report(&sample_data, args.family.map(Family::from), detector);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            match report.bom {
                Some(encoding) => {
                    println!("BOM detected: {} ({} bytes)", encoding, report.bom_len)
                }
                None => println!("BOM detected: No"),
            }

            if let Some(result) = report.byte_order {
                println!("Byte order: {}", result.endianness);
                println!("Confidence: {:.1}%", result.confidence.score() * 100.0);
            }

            println!(
                "Sample size: {} of {} bytes",
                report.sample_size, report.input_size
            );
        }
    }

    Ok(())
}

/// Family comes from `family`, else from the BOM; without either only the
/// BOM is reported.
#[cfg(feature = "cli")]
fn detection_report(
    data: &[u8],
    family: Option<Family>,
    detector: ByteOrderDetector,
) -> DetectionReport {
    let bom = detect_bom(data);
    let family = family.or_else(|| bom.map(|(encoding, _)| encoding.family()));
    let byte_order = family.and_then(|family| detector.detect(data, family));

    DetectionReport {
        bom: bom.map(|(encoding, _)| encoding),
        bom_len: bom.map_or(0, |(_, len)| len),
        byte_order,
        input_size: data.len(),
        sample_size: detector.sample_len(data.len()),
    }
}

#[cfg(feature = "cli")]
fn list_command(cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let encodings_info: Vec<_> = Encoding::ALL
                .iter()
                .map(|encoding| {
                    serde_json::json!({
                        "name": encoding.name(),
                        "family": encoding.family(),
                        "unit_size": encoding.family().unit_size(),
                        "endianness": encoding.explicit_endianness(),
                        "bom": format!("{:02X?}", encoding.bom()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&encodings_info)?);
        }
        OutputFormat::Text => {
            println!("Supported Encodings ({} total):", Encoding::ALL.len());
            println!();

            for encoding in Encoding::ALL {
                let byte_order = match encoding.explicit_endianness() {
                    Some(endianness) => endianness.to_string(),
                    None if encoding.family() == Family::Utf8 => "-".to_string(),
                    None => "detected (writes big-endian)".to_string(),
                };
                println!(
                    "{:10} {:30} BOM: {:02X?}",
                    encoding.name(),
                    byte_order,
                    encoding.bom()
                );
            }
        }
    }

    Ok(())
}
