//! mb command - Make bucket
//!
//! Creates a new bucket on the specified storage. New buckets are private.

use clap::Args;
use osskit_core::{Error, RemotePath, parse_remote};
use serde::Serialize;

use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a bucket
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Target path (storage/bucket)
    pub target: String,

    /// Ignore error if bucket already exists
    #[arg(short = 'p', long)]
    pub ignore_existing: bool,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Parse a `storage/bucket` target; a key is not allowed
pub(crate) fn parse_bucket_path(target: &str) -> osskit_core::Result<RemotePath> {
    let path = parse_remote(target)?;
    if !path.key.is_empty() {
        return Err(Error::Validation(format!(
            "'{target}' names an object. Expected: storage/bucket"
        )));
    }
    Ok(path)
}

/// Execute the mb command
pub async fn execute(args: MbArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_bucket_path(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let already_exists = |formatter: &Formatter| {
        if formatter.is_json() {
            formatter.json(&MbOutput {
                status: "success",
                bucket: path.bucket.clone(),
                message: Some("Bucket already exists".to_string()),
            });
        } else {
            formatter.success(&format!("Bucket '{path}' already exists."));
        }
        ExitCode::Success
    };

    if args.ignore_existing {
        match storage.bucket_exists(&path.bucket).await {
            Ok(true) => return already_exists(&formatter),
            Ok(false) => {}
            Err(e) => return formatter.fail("Failed to check bucket existence", &e),
        }
    }

    match storage.create_bucket(&path.bucket).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&MbOutput {
                    status: "success",
                    bucket: path.bucket.clone(),
                    message: None,
                });
            } else {
                formatter.success(&format!("Bucket '{path}' created successfully."));
            }
            ExitCode::Success
        }
        Err(Error::Conflict(_)) if args.ignore_existing => already_exists(&formatter),
        Err(e) => formatter.fail(&format!("Failed to create bucket '{path}'"), &e),
    }
}
