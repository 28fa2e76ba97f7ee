//! stat command - Show object metadata
//!
//! Displays an object's metadata together with its effective access mode.
//! Given a bucket path, shows the bucket's access mode instead.

use std::collections::BTreeMap;

use clap::Args;
use jiff::Timestamp;
use osskit_core::{AccessMode, Error, MetadataOptions, Result, parse_remote};
use serde::Serialize;

use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object or bucket path (storage/bucket[/key])
    pub path: String,

    /// Read this object version
    #[arg(long)]
    pub version_id: Option<String>,

    /// Fail unless the object's ETag matches
    #[arg(long)]
    pub if_match: Option<String>,

    /// Fail unless the object changed after this RFC 3339 time
    #[arg(long)]
    pub if_modified_since: Option<String>,
}

impl StatArgs {
    fn metadata_options(&self) -> Result<MetadataOptions> {
        let if_modified_since = self
            .if_modified_since
            .as_deref()
            .map(|value| {
                value.parse::<Timestamp>().map_err(|e| {
                    Error::Validation(format!("invalid --if-modified-since '{value}': {e}"))
                })
            })
            .transpose()?;
        Ok(MetadataOptions {
            version_id: self.version_id.clone(),
            if_match: self.if_match.clone(),
            if_modified_since,
        })
    }
}

#[derive(Debug, Serialize)]
struct StatOutput {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
    content_type: String,
    acl: AccessMode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct BucketStatOutput {
    bucket: String,
    acl: AccessMode,
}

/// Execute the stat command
pub async fn execute(args: StatArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_remote(&args.path) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let options = match args.metadata_options() {
        Ok(options) => options,
        Err(e) => return formatter.fail("Invalid condition", &e),
    };

    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    if path.key.is_empty() {
        return match storage.get_bucket_acl(&path.bucket).await {
            Ok(acl) => {
                if formatter.is_json() {
                    formatter.json(&BucketStatOutput {
                        bucket: path.bucket.clone(),
                        acl,
                    });
                } else {
                    formatter.println(&format!("Bucket : {}", path.bucket));
                    formatter.println(&format!("ACL    : {acl}"));
                }
                ExitCode::Success
            }
            Err(e) => formatter.fail(&format!("Failed to stat bucket '{path}'"), &e),
        };
    }

    let metadata = match storage
        .get_object_metadata_with(&path.bucket, &path.key, &options)
        .await
    {
        Ok(metadata) => metadata,
        Err(e) => return formatter.fail(&format!("Failed to stat '{path}'"), &e),
    };
    let acl = match storage.get_object_acl(&path.bucket, &path.key).await {
        Ok(acl) => acl,
        Err(e) => return formatter.fail(&format!("Failed to read ACL of '{path}'"), &e),
    };

    let output = StatOutput {
        name: path.to_full_path(),
        last_modified: metadata
            .last_modified
            .map(|t| t.strftime("%Y-%m-%d %H:%M:%S UTC").to_string()),
        size_bytes: metadata.size,
        size_human: humansize::format_size(metadata.size, humansize::BINARY),
        etag: metadata.etag,
        version_id: metadata.version_id,
        content_type: metadata.content_type,
        acl,
        metadata: metadata.metadata,
    };

    if formatter.is_json() {
        formatter.json(&output);
        return ExitCode::Success;
    }

    formatter.println(&format!("Name      : {}", output.name));
    if let Some(modified) = &output.last_modified {
        formatter.println(&format!("Date      : {modified}"));
    }
    formatter.println(&format!(
        "Size      : {} ({} bytes)",
        output.size_human, output.size_bytes
    ));
    if let Some(etag) = &output.etag {
        formatter.println(&format!("ETag      : {etag}"));
    }
    if let Some(version) = &output.version_id {
        formatter.println(&format!("Version   : {version}"));
    }
    formatter.println(&format!("Type      : {}", output.content_type));
    formatter.println(&format!("ACL       : {}", output.acl));
    for (key, value) in &output.metadata {
        formatter.println(&format!("Meta      : {key}={value}"));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_output_serialization() {
        let output = StatOutput {
            name: "local/b/k".to_string(),
            last_modified: None,
            size_bytes: 2048,
            size_human: "2 KiB".to_string(),
            etag: Some("abc".to_string()),
            version_id: None,
            content_type: "text/plain".to_string(),
            acl: AccessMode::PublicRead,
            metadata: BTreeMap::new(),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["acl"], "public-read");
        assert_eq!(json["size_bytes"], 2048);
        assert!(json.get("metadata").is_none());
        assert!(json.get("last_modified").is_none());
        assert!(json.get("version_id").is_none());
    }

    fn args(if_modified_since: Option<&str>) -> StatArgs {
        StatArgs {
            path: "local/b/k".to_string(),
            version_id: Some("v1".to_string()),
            if_match: Some("abc".to_string()),
            if_modified_since: if_modified_since.map(str::to_string),
        }
    }

    #[test]
    fn test_metadata_options_from_flags() {
        let options = args(Some("2024-05-01T12:00:00Z")).metadata_options().unwrap();
        assert_eq!(options.version_id.as_deref(), Some("v1"));
        assert_eq!(options.if_match.as_deref(), Some("abc"));
        assert_eq!(
            options.if_modified_since,
            Some("2024-05-01T12:00:00Z".parse().unwrap())
        );

        assert_eq!(args(None).metadata_options().unwrap().if_modified_since, None);
        assert!(matches!(
            args(Some("yesterday")).metadata_options(),
            Err(Error::Validation(_))
        ));
    }
}
