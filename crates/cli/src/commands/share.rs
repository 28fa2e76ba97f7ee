//! share command - GET URL for an object
//!
//! Public objects get their static URL. Private ones get a signed URL that
//! expires after `--expire`.

use std::time::Duration;

use clap::Args;
use osskit_core::{Error, Result};
use serde::Serialize;

use super::{Session, open_storage, parse_object_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Generate a GET URL for an object
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Object path (storage/bucket/key)
    pub target: String,

    /// Validity of a signed URL: seconds, or a number with s, m, h or d
    #[arg(short, long, default_value = "1h")]
    pub expire: String,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    target: String,
    url: String,
    expire_secs: u64,
}

/// Parse `90`, `90s`, `15m`, `1h` or `7d`
fn parse_expiry(value: &str) -> Result<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last() {
        Some((index, c)) if c.is_ascii_alphabetic() => (&value[..index], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        other => {
            return Err(Error::Validation(format!(
                "unknown expiry unit '{other}' in '{value}'"
            )));
        }
    };

    let amount: u64 = digits
        .parse()
        .map_err(|_| Error::Validation(format!("invalid expiry '{value}'")))?;
    if amount == 0 {
        return Err(Error::Validation("expiry must be greater than zero".into()));
    }

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::Validation(format!("expiry '{value}' is too large")))
}

/// Execute the share command
pub async fn execute(args: ShareArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let expiry = match parse_expiry(&args.expire) {
        Ok(expiry) => expiry,
        Err(e) => return formatter.fail("Invalid --expire", &e),
    };
    let path = match parse_object_path(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    match storage
        .presigned_get_object(&path.bucket, &path.key, expiry)
        .await
    {
        Ok(url) => {
            if formatter.is_json() {
                formatter.json(&ShareOutput {
                    target: path.to_string(),
                    url,
                    expire_secs: expiry.as_secs(),
                });
            } else {
                formatter.println(&url);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to share '{path}'"), &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_expiry("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_expiry("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_expiry("1H").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_expiry(" 7d ").unwrap(), Duration::from_secs(604_800));
    }

    #[test]
    fn test_parse_expiry_rejects_garbage() {
        for value in ["", "0", "0h", "h", "1w", "-5", "1.5h", "99999999999999999999d"] {
            assert!(
                matches!(parse_expiry(value), Err(Error::Validation(_))),
                "{value:?} should be rejected"
            );
        }
    }
}
