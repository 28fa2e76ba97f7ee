//! rm command - Remove objects
//!
//! Removes single objects, or every object under a prefix with
//! `--recursive`. Prefix removals use batch deletes.

use clap::Args;
use osskit_core::{Error, ObjectStorage, RemotePath, Result, parse_remote};
use serde::Serialize;

use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object path(s) to remove (storage/bucket/key or storage/bucket/prefix/)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove every object under the given prefix
    #[arg(short, long)]
    pub recursive: bool,

    /// Only show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut code = ExitCode::Success;

    for target in &args.paths {
        let path = match parse_remote(target) {
            Ok(path) => path,
            Err(e) => return formatter.fail("Invalid path", &e),
        };

        let storage = match open_storage(session, &path, &formatter).await {
            Ok(storage) => storage,
            Err(exit) => return exit,
        };

        match remove_path(storage.as_ref(), &path, args.recursive, args.dry_run).await {
            Ok(removed) => {
                for key in removed {
                    let full = format!("{}/{}/{key}", path.storage, path.bucket);
                    if !formatter.is_json() {
                        let verb = if args.dry_run { "Would remove" } else { "Removed" };
                        formatter.println(&format!("{verb}: {full}"));
                    }
                    deleted.push(full);
                }
            }
            Err(e) => {
                code = formatter.fail(&format!("Failed to remove '{target}'"), &e);
                failed.push(target.clone());
                if matches!(e, Error::Validation(_) | Error::Configuration(_)) {
                    return code;
                }
            }
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len(),
            deleted,
            failed,
        });
    } else if !args.dry_run && !deleted.is_empty() {
        formatter.success(&format!("Removed {} object(s).", deleted.len()));
    }

    code
}

/// Remove what `path` names and return the removed keys
async fn remove_path(
    storage: &dyn ObjectStorage,
    path: &RemotePath,
    recursive: bool,
    dry_run: bool,
) -> Result<Vec<String>> {
    if !recursive {
        if path.key.is_empty() || path.is_dir {
            return Err(Error::Validation(format!(
                "'{path}' is a prefix. Use -r/--recursive to remove it"
            )));
        }
        if !storage.object_exists(&path.bucket, &path.key).await? {
            return Err(Error::NotFound(format!("object '{path}'")));
        }
        if !dry_run {
            storage.remove_object(&path.bucket, &path.key).await?;
        }
        return Ok(vec![path.key.clone()]);
    }

    let prefix = (!path.key.is_empty()).then_some(path.key.as_str());
    let keys: Vec<String> = storage
        .list_objects(&path.bucket, prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .collect();

    if !dry_run && !keys.is_empty() {
        storage.remove_objects(&path.bucket, &keys).await?;
    }
    Ok(keys)
}
