//! Header Verifier - command line tools
//!
//! Offline utilities around the verification library: decode header records,
//! convert between compact bits and targets, and resolve the expected target
//! at a height from a file of preceding headers.

use ravencoin_header_verifier::{
    config::{Command, Config},
    core::{
        bits_to_target, chainwork, target_to_bits, ConsensusParameters, Header, HeaderWindow,
        Target,
    },
    utils::{hex_to_bytes, init_logging, parse_bits},
    verify::resolve_target,
    Error, Result, APP_NAME, APP_VERSION,
};
use serde_json::json;
use std::path::Path;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run() {
        error!(category = e.category(), "{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::load()?;
    init_logging(config.log_level, config.log_format)?;
    debug!("{} {} starting", APP_NAME, APP_VERSION);

    if config.print_config {
        return print_configuration(&config);
    }

    let params = config.consensus_parameters();
    match &config.command {
        Some(Command::Decode { hex, height }) => decode(hex, *height, &params),
        Some(Command::Bits { bits }) => expand_bits(bits),
        Some(Command::TargetBits { target }) => compress_target(target),
        Some(Command::ResolveTarget {
            height,
            headers,
            first_height,
        }) => {
            let window = match headers {
                Some(path) => load_headers(path, *first_height, &params)?,
                None => HeaderWindow::new(),
            };
            let checkpoints = config.checkpoint_table()?;
            info!(
                height,
                window = window.len(),
                checkpoints = checkpoints.len(),
                "Resolving target"
            );
            let target = resolve_target(*height, &params, &checkpoints, &window)?;
            print_json(&json!({
                "height": height,
                "target": target,
                "bits": format!("{:#010x}", target_to_bits(&target)),
            }))
        }
        None => {
            println!("{} {}", APP_NAME, APP_VERSION);
            println!("Run with --help to list the available commands.");
            Ok(())
        }
    }
}

fn decode(hex: &str, height: u64, params: &ConsensusParameters) -> Result<()> {
    let bytes = hex_to_bytes(hex)?;
    let header = Header::deserialize(&bytes, height, params)?;
    print_json(&header)
}

fn expand_bits(bits: &str) -> Result<()> {
    let bits = parse_bits(bits)?;
    let target = bits_to_target(bits);
    let strict = match Target::from_compact_strict(bits) {
        Ok(t) => json!(t),
        Err(e) => json!({ "error": e.to_string() }),
    };
    print_json(&json!({
        "bits": format!("{:#010x}", bits),
        "target": target,
        "strict_target": strict,
        "chainwork": chainwork(&target).to_string(),
    }))
}

fn compress_target(target: &str) -> Result<()> {
    let target = Target::from_hex(target)?;
    let bits = target_to_bits(&target);
    print_json(&json!({
        "target": target,
        "bits": format!("{:#010x}", bits),
        "roundtrip": bits_to_target(bits),
    }))
}

/// Read one hex header per line, at consecutive heights
fn load_headers(
    path: &Path,
    first_height: u64,
    params: &ConsensusParameters,
) -> Result<HeaderWindow> {
    let content = std::fs::read_to_string(path)?;
    let mut window = HeaderWindow::new();
    let lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    for (height, line) in (first_height..).zip(lines) {
        let bytes = hex_to_bytes(line)?;
        window.insert(Header::deserialize(&bytes, height, params)?);
    }
    if window.is_empty() {
        return Err(Error::config(format!("No headers in {}", path.display())));
    }
    Ok(window)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print current configuration
fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}
