//! ls command - List buckets and objects
//!
//! Lists buckets when given a storage name only, or objects under a
//! bucket path. Listings are always complete: every page is fetched.

use std::collections::BTreeSet;

use clap::Args;
use osskit_core::{BucketInfo, ObjectInfo, ObjectStorage, RemotePath, parse_remote};
use serde::Serialize;

use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// List buckets or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (storage, or storage/bucket[/prefix])
    pub path: String,

    /// List recursively instead of grouping by `/`
    #[arg(short, long)]
    pub recursive: bool,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct BucketsOutput {
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Serialize)]
struct ObjectsOutput {
    items: Vec<ObjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// What an ls argument points at
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Storage(String),
    Objects(RemotePath),
}

fn parse_target(path: &str) -> osskit_core::Result<Target> {
    let trimmed = path.trim_end_matches('/');
    if !trimmed.is_empty() && !trimmed.contains('/') {
        return Ok(Target::Storage(trimmed.to_string()));
    }
    parse_remote(path).map(Target::Objects)
}

/// Execute the ls command
pub async fn execute(args: LsArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let target = match parse_target(&args.path) {
        Ok(target) => target,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    match target {
        Target::Storage(name) => {
            let storage = match session.open(&name).await {
                Ok(storage) => storage,
                Err(e) => {
                    return formatter.fail(&format!("Failed to open storage '{name}'"), &e);
                }
            };
            list_buckets(storage.as_ref(), &formatter, args.summarize).await
        }
        Target::Objects(path) => {
            let storage = match open_storage(session, &path, &formatter).await {
                Ok(storage) => storage,
                Err(code) => return code,
            };
            list_objects(storage.as_ref(), &path, &args, &formatter).await
        }
    }
}

async fn list_buckets(storage: &dyn ObjectStorage, formatter: &Formatter, summarize: bool) -> ExitCode {
    let buckets = match storage.list_buckets().await {
        Ok(buckets) => buckets,
        Err(e) => return formatter.fail("Failed to list buckets", &e),
    };

    if formatter.is_json() {
        formatter.json(&BucketsOutput { buckets });
        return ExitCode::Success;
    }

    for bucket in &buckets {
        let date = bucket
            .created
            .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| " ".repeat(19));
        let location = bucket.location.as_deref().unwrap_or("");
        formatter.println(&format!("[{date}] {location:<16} {}/", bucket.name));
    }
    if summarize {
        formatter.println(&format!("\nTotal: {} buckets", buckets.len()));
    }
    ExitCode::Success
}

async fn list_objects(
    storage: &dyn ObjectStorage,
    path: &RemotePath,
    args: &LsArgs,
    formatter: &Formatter,
) -> ExitCode {
    let prefix = (!path.key.is_empty()).then_some(path.key.as_str());
    let spinner = ProgressBar::spinner(formatter.config(), &format!("Listing {path}"));
    let result = storage.list_objects(&path.bucket, prefix).await;
    spinner.finish_and_clear();

    let objects = match result {
        Ok(objects) => objects,
        Err(e) => return formatter.fail(&format!("Failed to list '{path}'"), &e),
    };

    let items = if args.recursive {
        objects
    } else {
        group_by_directory(objects, &path.bucket, prefix.unwrap_or(""))
    };

    let summary = args.summarize.then(|| {
        let files = items.iter().filter(|o| !o.is_dir);
        let total_size_bytes: u64 = files.clone().map(|o| o.size).sum();
        Summary {
            total_objects: files.count(),
            total_size_bytes,
            total_size_human: humansize::format_size(total_size_bytes, humansize::BINARY),
        }
    });

    if formatter.is_json() {
        formatter.json(&ObjectsOutput { items, summary });
        return ExitCode::Success;
    }

    for item in &items {
        let date = item
            .last_modified
            .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| " ".repeat(19));
        let size = if item.is_dir {
            "DIR".to_string()
        } else {
            item.size_human()
        };
        formatter.println(&format!("[{date}] {size:>10} {}", item.key));
    }
    if let Some(summary) = summary {
        formatter.println(&format!(
            "\nTotal: {} objects, {}",
            summary.total_objects, summary.total_size_human
        ));
    }
    ExitCode::Success
}

/// Collapse keys below the next `/` after `prefix` into directory entries
fn group_by_directory(objects: Vec<ObjectInfo>, bucket: &str, prefix: &str) -> Vec<ObjectInfo> {
    let mut dirs = BTreeSet::new();
    let mut files = Vec::new();

    for object in objects {
        let rest = object.key.strip_prefix(prefix).unwrap_or(&object.key);
        match rest.find('/') {
            Some(index) if index + 1 < rest.len() || object.size == 0 => {
                dirs.insert(format!("{prefix}{}", &rest[..=index]));
            }
            _ => files.push(object),
        }
    }

    dirs.into_iter()
        .map(|dir| ObjectInfo::new(bucket, dir, 0))
        .chain(files)
        .collect()
}
