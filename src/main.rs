//! pdf-notary command-line interface
//!
//! Canonicalize uploads, notarize them with an embedded proof and a
//! presentation page, verify notarized documents and inspect their
//! embedded files.

use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use pdf_notary::config::NotaryConfig;
use pdf_notary::error::{Error, Result};
use pdf_notary::issuer::HmacIssuer;
use pdf_notary::presentation::{DonationShare, PresentationSpec};
use pdf_notary::utils::{read_file, write_file, Logger};
use pdf_notary::{Notary, ProofExtractor, Verdict};
use tracing::{error, info};

/// Environment variable holding the HMAC signing key
const KEY_ENV: &str = "PDF_NOTARY_HMAC_KEY";

const EXIT_TAMPERED: i32 = 2;
const EXIT_MALFORMED: i32 = 3;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and all messages
    Debug,
    /// Trace and all messages (most verbose)
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => match NotaryConfig::from_file(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file: {}", e);
                process::exit(1);
            }
        },
        None => NotaryConfig::default(),
    };

    let level = matches
        .get_one::<LogLevel>("verbose")
        .map(|l| l.as_filter().to_string())
        .unwrap_or_else(|| config.runtime.log_level.clone());
    Logger::with_level(&level).init();

    let Some((command, sub)) = matches.subcommand() else {
        error!("❌ No subcommand given");
        process::exit(1);
    };
    let command = command.to_string();
    let sub = sub.clone();
    let timeout_secs = config.runtime.timeout_secs;
    let start_time = Instant::now();

    let task = tokio::task::spawn_blocking(move || run(&command, &sub, config));
    let code = match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
        Ok(Ok(Ok(code))) => code,
        Ok(Ok(Err(e))) => {
            error!("❌ {}", e);
            1
        }
        Ok(Err(join_error)) => {
            error!("❌ Worker failed: {}", join_error);
            1
        }
        Err(_) => {
            error!("❌ {}", Error::Timeout(format!("gave up after {}s", timeout_secs)));
            1
        }
    };
    info!("Finished in {:.2?}", start_time.elapsed());
    process::exit(code);
}

fn build_cli() -> Command {
    Command::new("pdf-notary")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deterministic PDF canonicalization and embedded-proof notarization")
        .subcommand_required(true)
        .arg_required_else_help(true)

        // Configuration
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .global(true)
            .help("Configuration file (JSON/YAML)"))

        // Logging
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .value_parser(clap::value_parser!(LogLevel))
            .global(true)
            .help("Set logging verbosity (overrides the configured level)"))

        .subcommand(Command::new("canonicalize")
            .about("Rebuild a PDF as its deterministic baseline and print the fingerprint")
            .arg(input_arg())
            .arg(Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Where to write the canonical PDF")))

        .subcommand(Command::new("notarize")
            .about("Canonicalize, sign and embed a proof with a presentation page")
            .arg(input_arg())
            .arg(Arg::new("out-dir")
                .long("out-dir")
                .value_name("DIR")
                .required(true)
                .help("Directory receiving <slug>.raw.pdf and <slug>.pdf"))
            .arg(Arg::new("slug")
                .long("slug")
                .value_name("NAME")
                .required(true)
                .help("Output file name stem"))
            .arg(Arg::new("subject")
                .long("subject")
                .value_name("ID")
                .required(true)
                .help("Identifier of the notarized publication"))
            .arg(Arg::new("issuer")
                .long("issuer")
                .value_name("ID")
                .default_value("did:web:notary.local")
                .help("Issuer identifier written into the proof"))
            .arg(Arg::new("presentation")
                .long("presentation")
                .value_name("FILE")
                .help("Presentation spec (JSON/YAML); flags below override it"))
            .arg(Arg::new("address")
                .long("address")
                .value_name("ADDRESS")
                .help("Payment address shown on the presentation page"))
            .arg(Arg::new("notice")
                .long("notice")
                .value_name("FILE")
                .help("Notice template with {{placeholder}} slots"))
            .arg(Arg::new("split")
                .long("split")
                .value_name("LABEL=PERCENT")
                .action(ArgAction::Append)
                .help("Donation share, repeatable"))
            .arg(Arg::new("notes")
                .long("notes")
                .value_name("TEXT")
                .help("Publisher notes"))
            .arg(Arg::new("set")
                .long("set")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Notice placeholder value, repeatable")))

        .subcommand(Command::new("verify")
            .about("Verify notarized PDFs (exit 0 MATCH, 2 TAMPERED, 3 MALFORMED)")
            .arg(Arg::new("files")
                .value_name("FILE")
                .required(true)
                .num_args(1..)
                .help("Notarized PDF files")))

        .subcommand(Command::new("extract")
            .about("Write an embedded file to disk")
            .arg(input_arg())
            .arg(Arg::new("name")
                .long("name")
                .value_name("NAME")
                .help("Registry name (defaults to the reserved proof name)"))
            .arg(Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .required(true)
                .help("Destination file")))

        .subcommand(Command::new("inspect")
            .about("List embedded files as JSON")
            .arg(input_arg()))
}

fn input_arg() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .value_name("FILE")
        .required(true)
        .help("Input PDF file path")
}

fn run(command: &str, matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    match command {
        "canonicalize" => canonicalize(matches, config),
        "notarize" => notarize(matches, config),
        "verify" => verify(matches, config),
        "extract" => extract(matches, config),
        "inspect" => inspect(matches, config),
        other => Err(Error::Config(format!("unknown command '{}'", other))),
    }
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| Error::Config(format!("--{} is required", id)))
}

fn canonicalize(matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    let input = PathBuf::from(required(matches, "input")?);
    let notary = Notary::new(config)?;
    let raw = notary.build_raw(&read_file(&input)?)?;
    if let Some(output) = matches.get_one::<String>("output") {
        write_file(Path::new(output), raw.bytes())?;
        info!("📁 Wrote canonical document to {}", output);
    }
    println!("{}", raw.content_fingerprint());
    Ok(0)
}

fn notarize(matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    let key = std::env::var(KEY_ENV).map_err(|_| Error::Issuer(format!("{} is not set", KEY_ENV)))?;
    let issuer = HmacIssuer::new(required(matches, "issuer")?.as_str(), key.into_bytes())?;
    let presentation = presentation_from(matches)?;

    let notary = Notary::new(config)?;
    let files = notary.notarize_file(
        Path::new(required(matches, "input")?),
        Path::new(required(matches, "out-dir")?),
        required(matches, "slug")?,
        &issuer,
        required(matches, "subject")?,
        &presentation,
    )?;
    info!("✅ Raw: {}", files.raw_path.display());
    info!("✅ Notarized: {}", files.notarized_path.display());
    println!("{}", files.raw.content_fingerprint());
    Ok(0)
}

fn presentation_from(matches: &ArgMatches) -> Result<PresentationSpec> {
    let mut spec = match matches.get_one::<String>("presentation") {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            if path.to_ascii_lowercase().ends_with(".json") {
                serde_json::from_str(&text)?
            } else {
                serde_yaml::from_str(&text)?
            }
        }
        None => PresentationSpec::default(),
    };
    if let Some(address) = matches.get_one::<String>("address") {
        spec.payment_address = address.clone();
    }
    if let Some(path) = matches.get_one::<String>("notice") {
        spec.notice_text = Some(std::fs::read_to_string(path)?);
    }
    if let Some(notes) = matches.get_one::<String>("notes") {
        spec.notes = Some(notes.clone());
    }
    if let Some(shares) = matches.get_many::<String>("split") {
        let mut split = Vec::new();
        for share in shares {
            let (label, pct) = split_pair(share)?;
            let pct = pct
                .parse::<u32>()
                .map_err(|_| Error::Config(format!("'{}' is not a whole percentage", pct)))?;
            split.push(DonationShare::new(label, pct));
        }
        spec.donation_split = Some(split);
    }
    if let Some(pairs) = matches.get_many::<String>("set") {
        for pair in pairs {
            let (key, value) = split_pair(pair)?;
            spec.substitutions.insert(key.to_string(), value.to_string());
        }
    }
    Ok(spec)
}

fn split_pair(value: &str) -> Result<(&str, &str)> {
    value
        .rsplit_once('=')
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| Error::Config(format!("expected KEY=VALUE, got '{}'", value)))
}

fn verify(matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    let files: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|v| v.collect())
        .unwrap_or_default();
    let documents = files
        .iter()
        .map(|f| read_file(Path::new(f)))
        .collect::<Result<Vec<_>>>()?;

    let notary = Notary::new(config)?;
    let results = notary.verify_batch(&documents);

    let mut code = 0;
    for (file, result) in files.iter().zip(&results) {
        info!("🔍 {}: {}", file, result.verdict);
        let exit = match result.verdict {
            Verdict::Match => 0,
            Verdict::Tampered => EXIT_TAMPERED,
            Verdict::Malformed => EXIT_MALFORMED,
        };
        code = code.max(exit);
    }
    let output = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])?
    } else {
        serde_json::to_string_pretty(&results)?
    };
    println!("{}", output);
    Ok(code)
}

fn extract(matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    let extractor = ProofExtractor::new(&config);
    let name = matches
        .get_one::<String>("name")
        .map(String::as_str)
        .unwrap_or(extractor.reserved_name())
        .to_string();
    let bytes = read_file(Path::new(required(matches, "input")?))?;
    let payload = extractor.extract_payload(&bytes, &name)?;
    let output = required(matches, "output")?;
    write_file(Path::new(output), &payload.bytes)?;
    info!("📁 Wrote '{}' ({} bytes, {}) to {}", payload.name, payload.len(), payload.mime_type, output);
    Ok(0)
}

fn inspect(matches: &ArgMatches, config: NotaryConfig) -> Result<i32> {
    let bytes = read_file(Path::new(required(matches, "input")?))?;
    let payloads = ProofExtractor::new(&config).list_payloads(&bytes)?;
    let listing: Vec<serde_json::Value> = payloads
        .iter()
        .map(|p| serde_json::json!({ "name": p.name, "mimeType": p.mime_type, "size": p.len() }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(0)
}
