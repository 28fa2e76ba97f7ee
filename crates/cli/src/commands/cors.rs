//! cors command - Replace the CORS rules of a bucket
//!
//! Rules come either from flags (one rule per origin and method pair) or
//! from a JSON file holding an array of rules.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use osskit_core::{CorsRule, Error, HttpMethod, Result};
use serde::Serialize;

use super::mb::parse_bucket_path;
use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Replace the CORS rules of a bucket
#[derive(Args, Debug)]
pub struct CorsArgs {
    /// Bucket path (storage/bucket)
    pub target: String,

    /// Allowed origin, repeatable
    #[arg(long = "origin", conflicts_with = "file")]
    pub origins: Vec<String>,

    /// Allowed method, repeatable (default: POST)
    #[arg(long = "method", conflicts_with = "file")]
    pub methods: Vec<String>,

    /// Allowed request header
    #[arg(long, conflicts_with = "file")]
    pub allowed_header: Option<String>,

    /// Response header exposed to the browser
    #[arg(long, conflicts_with = "file")]
    pub expose_header: Option<String>,

    /// JSON file with an array of rules
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CorsOutput {
    bucket: String,
    rules: Vec<CorsRule>,
}

/// Rules described by the flags
fn rules_from_flags(args: &CorsArgs) -> Result<Vec<CorsRule>> {
    if args.origins.is_empty() {
        return Err(Error::Validation(
            "at least one --origin (or --file) is required".into(),
        ));
    }

    let methods = if args.methods.is_empty() {
        vec![HttpMethod::default()]
    } else {
        args.methods
            .iter()
            .map(|m| HttpMethod::from_str(m))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(args
        .origins
        .iter()
        .flat_map(|origin| {
            methods.iter().map(move |method| CorsRule {
                origin: origin.clone(),
                method: *method,
                allowed_header: args.allowed_header.clone(),
                expose_header: args.expose_header.clone(),
            })
        })
        .collect())
}

fn load_rules(args: &CorsArgs) -> Result<Vec<CorsRule>> {
    let Some(file) = &args.file else {
        return rules_from_flags(args);
    };
    let content = std::fs::read_to_string(file)?;
    let rules: Vec<CorsRule> = serde_json::from_str(&content)?;
    if rules.is_empty() {
        return Err(Error::Validation(format!(
            "'{}' contains no rules",
            file.display()
        )));
    }
    Ok(rules)
}

/// Execute the cors command
pub async fn execute(args: CorsArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_bucket_path(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let rules = match load_rules(&args) {
        Ok(rules) => rules,
        Err(e) => return formatter.fail("Invalid CORS rules", &e),
    };
    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    match storage.set_bucket_cors(&path.bucket, &rules).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&CorsOutput {
                    bucket: path.bucket.clone(),
                    rules,
                });
            } else {
                formatter.success(&format!(
                    "Applied {} CORS rule(s) to '{path}'.",
                    rules.len()
                ));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to set CORS rules on '{path}'"), &e),
    }
}
