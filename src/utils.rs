//! Utility functions and helpers
//!
//! Logging setup and input helpers shared by the binary and tests.

use crate::config::{LogFormat, LogLevel};
use crate::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this twice is an
/// error, reported rather than panicking.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Plain => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))
}

/// Validate hex string format
pub fn validate_hex_string(s: &str, expected_len: Option<usize>) -> Result<()> {
    if let Some(len) = expected_len {
        if s.len() != len {
            return Err(Error::config(format!(
                "Expected {} hex characters, got {}",
                len,
                s.len()
            )));
        }
    }

    if s.len() % 2 != 0 {
        return Err(Error::config("Hex string has an odd number of characters"));
    }

    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::config("String contains non-hexadecimal characters"));
    }

    Ok(())
}

/// Convert hex string to bytes, ignoring surrounding whitespace and a `0x` prefix
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    validate_hex_string(hex, None)?;
    hex::decode(hex).map_err(|e| Error::config(format!("Invalid hex: {}", e)))
}

/// Parse a compact `bits` value given as hex (`0x1d00ffff`) or decimal
pub fn parse_bits(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| Error::config(format!("Invalid bits value '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hex_string() {
        assert!(validate_hex_string("abcd", Some(4)).is_ok());
        assert!(validate_hex_string("abcd", Some(6)).is_err());
        assert!(validate_hex_string("abc", None).is_err());
        assert!(validate_hex_string("zz", None).is_err());
    }

    #[test]
    fn test_hex_to_bytes() {
        assert_eq!(hex_to_bytes(" 0x0102 \n").unwrap(), vec![1, 2]);
        assert!(hex_to_bytes("0x1").is_err());
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("0x1d00ffff").unwrap(), 0x1d00ffff);
        assert_eq!(parse_bits("486604799").unwrap(), 0x1d00ffff);
        assert!(parse_bits("0xzz").is_err());
    }
}
