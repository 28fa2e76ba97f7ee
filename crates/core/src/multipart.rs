//! Multipart copy support
//!
//! Server-side copy of large objects in byte-range parts. Parts are
//! dispatched with bounded parallelism and reassembled by part number; any
//! failure or cancellation aborts the upload session.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Default copy part size: 50 MiB
pub const DEFAULT_COPY_PART_SIZE: u64 = 50 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Default number of parts copied at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Multipart copy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Part size in bytes
    pub part_size: u64,

    /// Number of concurrent part copies
    pub concurrency: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_COPY_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CopyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Part size for an object of `object_size` bytes.
    ///
    /// The configured size is kept within the S3 part limits and only
    /// enlarged when it would need more than [`MAX_PARTS`] parts.
    pub fn calculate_part_size(&self, object_size: u64) -> u64 {
        let configured = self.part_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        let parts = object_size.div_ceil(configured);

        if parts <= MAX_PARTS as u64 {
            configured
        } else {
            let required_size = object_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for an object
pub fn calculate_parts(object_size: u64, part_size: u64) -> usize {
    object_size.div_ceil(part_size) as usize
}

/// Get the half-open byte range `[start, end)` for a 1-based part number
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

/// A bucket/key pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// One part-copy request within an upload session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartCopyRequest {
    pub source: ObjectLocation,
    pub dest: ObjectLocation,
    pub upload_id: String,
    pub part_number: i32,
    /// First byte, inclusive
    pub start: u64,
    /// Last byte, exclusive
    pub end: u64,
}

/// Tag returned for a copied part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Outcome of a finished copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    pub size: u64,
    pub parts: usize,
}

/// Server-side primitives the orchestrator drives
#[async_trait]
pub trait PartCopier: Send + Sync {
    /// Byte length of the source object
    async fn source_size(&self, source: &ObjectLocation) -> Result<u64>;

    /// Start an upload session on the destination and return its id
    async fn initiate(&self, dest: &ObjectLocation) -> Result<String>;

    async fn copy_part(&self, request: &PartCopyRequest) -> Result<CompletedPart>;

    /// Finish the session; `parts` is sorted by part number
    async fn complete(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()>;

    async fn abort(&self, dest: &ObjectLocation, upload_id: &str) -> Result<()>;

    /// Single-request copy, used when there is nothing to split
    async fn copy_whole(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()>;
}

/// Copy `source` to `dest` in parts.
///
/// Cancelling `cancel` stops dispatching new parts and aborts the session.
pub async fn copy_object<C>(
    copier: &C,
    config: &CopyConfig,
    source: &ObjectLocation,
    dest: &ObjectLocation,
    cancel: &CancellationToken,
) -> Result<CopySummary>
where
    C: PartCopier + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(cancelled(dest));
    }

    let size = copier.source_size(source).await?;
    if size == 0 {
        copier.copy_whole(source, dest).await?;
        tracing::info!(%source, %dest, "Copied empty object");
        return Ok(CopySummary { size: 0, parts: 0 });
    }

    let part_size = config.calculate_part_size(size);
    let part_count = calculate_parts(size, part_size);
    let upload_id = copier.initiate(dest).await?;
    tracing::debug!(%source, %dest, size, part_size, part_count, upload_id = %upload_id, "Started multipart copy");

    let parts = match copy_parts(
        copier,
        config.concurrency,
        source,
        dest,
        &upload_id,
        part_size,
        size,
        cancel,
    )
    .await
    {
        Ok(parts) => parts,
        Err(e) => {
            abort_session(copier, dest, &upload_id).await;
            return Err(e);
        }
    };

    if let Err(e) = copier.complete(dest, &upload_id, &parts).await {
        abort_session(copier, dest, &upload_id).await;
        return Err(e);
    }

    tracing::info!(%source, %dest, size, parts = part_count, "Completed multipart copy");
    Ok(CopySummary {
        size,
        parts: part_count,
    })
}

#[allow(clippy::too_many_arguments)]
async fn copy_parts<C>(
    copier: &C,
    concurrency: usize,
    source: &ObjectLocation,
    dest: &ObjectLocation,
    upload_id: &str,
    part_size: u64,
    size: u64,
    cancel: &CancellationToken,
) -> Result<Vec<CompletedPart>>
where
    C: PartCopier + ?Sized,
{
    let part_count = calculate_parts(size, part_size);

    // The stream pulls requests lazily, so dropping it stops dispatch
    let mut pending = futures::stream::iter((1..=part_count as i32).map(|part_number| {
        let (start, end) = part_byte_range(part_number, part_size, size);
        let request = PartCopyRequest {
            source: source.clone(),
            dest: dest.clone(),
            upload_id: upload_id.to_string(),
            part_number,
            start,
            end,
        };
        async move {
            tracing::debug!(part_number, start, end, "Copying part");
            copier.copy_part(&request).await
        }
    }))
    .buffer_unordered(concurrency.max(1));

    let mut parts = Vec::with_capacity(part_count);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(dest)),
            next = pending.next() => match next {
                Some(Ok(part)) => parts.push(part),
                Some(Err(e)) => return Err(e),
                None => break,
            },
        }
    }

    parts.sort_by_key(|p| p.part_number);
    Ok(parts)
}

async fn abort_session<C>(copier: &C, dest: &ObjectLocation, upload_id: &str)
where
    C: PartCopier + ?Sized,
{
    if let Err(e) = copier.abort(dest, upload_id).await {
        tracing::warn!(%dest, upload_id = %upload_id, error = %e, "Failed to abort multipart copy");
    }
}

fn cancelled(dest: &ObjectLocation) -> Error {
    Error::Cancelled(format!("copy to '{dest}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_config() {
        let config = CopyConfig::default();
        assert_eq!(config.part_size, DEFAULT_COPY_PART_SIZE);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_config_builder() {
        let config = CopyConfig::new().part_size(128 * 1024 * 1024).concurrency(8);

        assert_eq!(config.part_size, 128 * 1024 * 1024);
        assert_eq!(config.concurrency, 8);
        assert_eq!(CopyConfig::new().concurrency(0).concurrency, 1);
    }

    #[test]
    fn test_part_size_clamping() {
        let config = CopyConfig::new().part_size(1024);
        assert_eq!(config.part_size, MIN_PART_SIZE);

        let config = CopyConfig::new().part_size(10 * 1024 * 1024 * 1024);
        assert_eq!(config.part_size, MAX_PART_SIZE);
    }

    #[test]
    fn test_calculate_part_size() {
        let config = CopyConfig::default();
        assert_eq!(config.calculate_part_size(1024), DEFAULT_COPY_PART_SIZE);

        // Would need more than 10,000 parts with the default size
        let huge = DEFAULT_COPY_PART_SIZE * 20_000;
        let size = config.calculate_part_size(huge);
        assert!(size > DEFAULT_COPY_PART_SIZE);
        assert!(calculate_parts(huge, size) <= MAX_PARTS);
    }

    #[test]
    fn test_calculate_parts() {
        assert_eq!(calculate_parts(100, 10), 10);
        assert_eq!(calculate_parts(101, 10), 11);
        assert_eq!(calculate_parts(99, 10), 10);
    }

    #[test]
    fn test_part_byte_range() {
        assert_eq!(part_byte_range(1, 100, 250), (0, 100));
        assert_eq!(part_byte_range(2, 100, 250), (100, 200));
        assert_eq!(part_byte_range(3, 100, 250), (200, 250));
    }

    /// Records every call; optionally fails one part number
    #[derive(Default)]
    struct RecordingCopier {
        size: u64,
        fail_part: Option<i32>,
        fail_complete: bool,
        requests: Mutex<Vec<PartCopyRequest>>,
        completed: Mutex<Option<Vec<CompletedPart>>>,
        aborts: AtomicUsize,
        whole_copies: AtomicUsize,
    }

    #[async_trait]
    impl PartCopier for RecordingCopier {
        async fn source_size(&self, _source: &ObjectLocation) -> Result<u64> {
            Ok(self.size)
        }

        async fn initiate(&self, _dest: &ObjectLocation) -> Result<String> {
            Ok("upload-1".to_string())
        }

        async fn copy_part(&self, request: &PartCopyRequest) -> Result<CompletedPart> {
            // Finish later parts first to exercise reordering
            let delay = 10u64.saturating_sub(request.part_number as u64);
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;

            self.requests.lock().unwrap().push(request.clone());
            if self.fail_part == Some(request.part_number) {
                return Err(Error::Provider("part copy failed".into()));
            }
            Ok(CompletedPart {
                part_number: request.part_number,
                etag: format!("etag-{}", request.part_number),
            })
        }

        async fn complete(
            &self,
            _dest: &ObjectLocation,
            _upload_id: &str,
            parts: &[CompletedPart],
        ) -> Result<()> {
            *self.completed.lock().unwrap() = Some(parts.to_vec());
            if self.fail_complete {
                return Err(Error::Provider("complete failed".into()));
            }
            Ok(())
        }

        async fn abort(&self, _dest: &ObjectLocation, _upload_id: &str) -> Result<()> {
            self.aborts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn copy_whole(
            &self,
            _source: &ObjectLocation,
            _dest: &ObjectLocation,
        ) -> Result<()> {
            self.whole_copies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn locations() -> (ObjectLocation, ObjectLocation) {
        (
            ObjectLocation::new("src", "big.bin"),
            ObjectLocation::new("dst", "copy.bin"),
        )
    }

    #[tokio::test]
    async fn test_parts_partition_source() {
        let config = CopyConfig::new();
        let sizes = [
            1,
            MIN_PART_SIZE,
            MIN_PART_SIZE + 1,
            7 * MIN_PART_SIZE - 3,
            DEFAULT_COPY_PART_SIZE * 3,
        ];
        for part_size in [MIN_PART_SIZE, DEFAULT_COPY_PART_SIZE] {
            let config = config.clone().part_size(part_size);
            for size in sizes {
                let copier = RecordingCopier {
                    size,
                    ..Default::default()
                };
                let (src, dst) = locations();
                let summary = copy_object(&copier, &config, &src, &dst, &CancellationToken::new())
                    .await
                    .unwrap();

                let expected = size.div_ceil(part_size) as usize;
                assert_eq!(summary.parts, expected);

                let mut requests = copier.requests.lock().unwrap().clone();
                assert_eq!(requests.len(), expected);
                requests.sort_by_key(|r| r.start);
                let mut cursor = 0;
                for request in &requests {
                    assert_eq!(request.start, cursor);
                    assert!(request.end > request.start);
                    cursor = request.end;
                }
                assert_eq!(cursor, size);

                let completed = copier.completed.lock().unwrap().clone().unwrap();
                let numbers: Vec<i32> = completed.iter().map(|p| p.part_number).collect();
                let ascending: Vec<i32> = (1..=expected as i32).collect();
                assert_eq!(numbers, ascending);
                assert_eq!(copier.aborts.load(Ordering::SeqCst), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_zero_part_size_is_clamped() {
        let config = CopyConfig {
            part_size: 0,
            concurrency: 0,
        };
        assert_eq!(config.calculate_part_size(1024), MIN_PART_SIZE);

        let copier = RecordingCopier {
            size: MIN_PART_SIZE * 2 + 1,
            ..Default::default()
        };
        let (src, dst) = locations();
        let summary = copy_object(&copier, &config, &src, &dst, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.parts, 3);
        assert_eq!(copier.aborts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_part_failure_aborts() {
        let copier = RecordingCopier {
            size: MIN_PART_SIZE * 6,
            fail_part: Some(3),
            ..Default::default()
        };
        let config = CopyConfig::new().part_size(MIN_PART_SIZE).concurrency(2);
        let (src, dst) = locations();

        let err = copy_object(&copier, &config, &src, &dst, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(copier.aborts.load(Ordering::SeqCst), 1);
        assert!(copier.completed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_failure_aborts() {
        let copier = RecordingCopier {
            size: MIN_PART_SIZE * 2,
            fail_complete: true,
            ..Default::default()
        };
        let config = CopyConfig::new().part_size(MIN_PART_SIZE);
        let (src, dst) = locations();

        let err = copy_object(&copier, &config, &src, &dst, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("complete failed"));
        assert_eq!(copier.aborts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let copier = RecordingCopier {
            size: MIN_PART_SIZE,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (src, dst) = locations();

        let err = copy_object(&copier, &CopyConfig::new(), &src, &dst, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert!(copier.requests.lock().unwrap().is_empty());
    }

    /// Cancels the token from inside the first part copy
    struct CancellingCopier {
        inner: RecordingCopier,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl PartCopier for CancellingCopier {
        async fn source_size(&self, source: &ObjectLocation) -> Result<u64> {
            self.inner.source_size(source).await
        }

        async fn initiate(&self, dest: &ObjectLocation) -> Result<String> {
            self.inner.initiate(dest).await
        }

        async fn copy_part(&self, request: &PartCopyRequest) -> Result<CompletedPart> {
            self.cancel.cancel();
            self.inner.copy_part(request).await
        }

        async fn complete(
            &self,
            dest: &ObjectLocation,
            upload_id: &str,
            parts: &[CompletedPart],
        ) -> Result<()> {
            self.inner.complete(dest, upload_id, parts).await
        }

        async fn abort(&self, dest: &ObjectLocation, upload_id: &str) -> Result<()> {
            self.inner.abort(dest, upload_id).await
        }

        async fn copy_whole(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
            self.inner.copy_whole(source, dest).await
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_copy_aborts_and_skips_parts() {
        let cancel = CancellationToken::new();
        let copier = CancellingCopier {
            inner: RecordingCopier {
                size: MIN_PART_SIZE * 20,
                ..Default::default()
            },
            cancel: cancel.clone(),
        };
        let config = CopyConfig::new().part_size(MIN_PART_SIZE).concurrency(2);
        let (src, dst) = locations();

        let err = copy_object(&copier, &config, &src, &dst, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(copier.inner.aborts.load(Ordering::SeqCst), 1);
        assert!(copier.inner.requests.lock().unwrap().len() < 20);
        assert!(copier.inner.completed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_source_uses_whole_copy() {
        let copier = RecordingCopier::default();
        let (src, dst) = locations();

        let summary = copy_object(&copier, &CopyConfig::new(), &src, &dst, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary, CopySummary { size: 0, parts: 0 });
        assert_eq!(copier.whole_copies.load(Ordering::SeqCst), 1);
        assert!(copier.requests.lock().unwrap().is_empty());
    }
}
