//! rb command - Remove bucket
//!
//! Removes a bucket. With `--force` the bucket is emptied first using
//! batch deletes.

use clap::Args;
use osskit_core::ObjectStorage;
use serde::Serialize;

use super::mb::parse_bucket_path;
use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Remove a bucket
#[derive(Args, Debug)]
pub struct RbArgs {
    /// Target path (storage/bucket)
    pub target: String,

    /// Delete every object in the bucket first
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RbOutput {
    status: &'static str,
    bucket: String,
    objects_removed: usize,
}

/// Remove every object in a bucket and return how many there were
pub(crate) async fn empty_bucket(storage: &dyn ObjectStorage, bucket: &str) -> osskit_core::Result<usize> {
    let keys: Vec<String> = storage
        .list_objects(bucket, None)
        .await?
        .into_iter()
        .map(|o| o.key)
        .collect();
    if !keys.is_empty() {
        storage.remove_objects(bucket, &keys).await?;
    }
    Ok(keys.len())
}

/// Execute the rb command
pub async fn execute(args: RbArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_bucket_path(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let mut removed = 0;
    if args.force {
        let spinner = ProgressBar::spinner(output_config, &format!("Emptying {path}"));
        let result = empty_bucket(storage.as_ref(), &path.bucket).await;
        spinner.finish_and_clear();
        removed = match result {
            Ok(count) => count,
            Err(e) => return formatter.fail(&format!("Failed to empty bucket '{path}'"), &e),
        };
    }

    if let Err(e) = storage.remove_bucket(&path.bucket).await {
        if matches!(e, osskit_core::Error::Conflict(_)) && !args.force {
            formatter.warning("Bucket is not empty; use --force to delete its objects first");
        }
        return formatter.fail(&format!("Failed to remove bucket '{path}'"), &e);
    }

    if formatter.is_json() {
        formatter.json(&RbOutput {
            status: "success",
            bucket: path.bucket.clone(),
            objects_removed: removed,
        });
    } else {
        formatter.success(&format!("Bucket '{path}' removed successfully."));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use osskit_core::{MemoryBackend, MemoryStorage, StorageConfig};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_bucket_then_remove() {
        let storage = MemoryStorage::new(
            StorageConfig::new("memory", "", "AK", "SK"),
            Arc::new(MemoryBackend::new()),
        )
        .unwrap();
        storage.create_bucket("b").await.unwrap();
        for i in 0..5 {
            storage
                .put_object("b", &format!("dir/{i}"), vec![1], None)
                .await
                .unwrap();
        }

        assert!(matches!(
            storage.remove_bucket("b").await,
            Err(osskit_core::Error::Conflict(_))
        ));
        assert_eq!(empty_bucket(&storage, "b").await.unwrap(), 5);
        assert_eq!(empty_bucket(&storage, "b").await.unwrap(), 0);
        storage.remove_bucket("b").await.unwrap();
    }
}
