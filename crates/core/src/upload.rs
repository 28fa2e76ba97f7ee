//! Streaming uploads
//!
//! Bodies of unknown length are read one part at a time, so memory stays
//! bounded by the part size. A body that ends inside the first part goes up
//! in a single request; anything longer becomes a multipart upload that is
//! aborted on failure.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};
use crate::multipart::{CompletedPart, MAX_PART_SIZE, MAX_PARTS, MIN_PART_SIZE, ObjectLocation};

/// Default upload part size: 16 MiB
pub const DEFAULT_UPLOAD_PART_SIZE: u64 = 16 * 1024 * 1024;

/// Outcome of a finished upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub size: u64,
    /// Zero for a single-request upload
    pub parts: usize,
}

/// Provider primitives behind [`upload_stream`]
#[async_trait]
pub trait PartUploader: Send + Sync {
    /// Single-request upload of a body shorter than one part
    async fn put_whole(&self, dest: &ObjectLocation, data: Vec<u8>, content_type: &str)
    -> Result<()>;

    async fn initiate_upload(&self, dest: &ObjectLocation, content_type: &str) -> Result<String>;

    async fn upload_part(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<CompletedPart>;

    /// Finish the session; `parts` is sorted by part number
    async fn complete_upload(
        &self,
        dest: &ObjectLocation,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<()>;

    async fn abort_upload(&self, dest: &ObjectLocation, upload_id: &str) -> Result<()>;
}

/// Read up to `limit` bytes; a short chunk means the reader is exhausted
pub async fn read_chunk<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut chunk = Vec::new();
    (&mut *reader).take(limit as u64).read_to_end(&mut chunk).await?;
    Ok(chunk)
}

/// Upload everything `reader` yields to `dest`
pub async fn upload_stream<U, R>(
    uploader: &U,
    dest: &ObjectLocation,
    reader: &mut R,
    content_type: &str,
    part_size: u64,
) -> Result<UploadSummary>
where
    U: PartUploader + ?Sized,
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let part_size = usize::try_from(part_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE))
        .unwrap_or(usize::MAX);

    let first = read_chunk(reader, part_size).await?;
    if first.len() < part_size {
        let size = first.len() as u64;
        uploader.put_whole(dest, first, content_type).await?;
        tracing::debug!(%dest, size, "Uploaded object in one request");
        return Ok(UploadSummary { size, parts: 0 });
    }

    let upload_id = uploader.initiate_upload(dest, content_type).await?;
    tracing::debug!(%dest, part_size, upload_id = %upload_id, "Started multipart upload");

    let (size, parts) =
        match upload_parts(uploader, dest, &upload_id, first, reader, part_size).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                abort_session(uploader, dest, &upload_id).await;
                return Err(e);
            }
        };

    if let Err(e) = uploader.complete_upload(dest, &upload_id, &parts).await {
        abort_session(uploader, dest, &upload_id).await;
        return Err(e);
    }

    tracing::info!(%dest, size, parts = parts.len(), "Completed multipart upload");
    Ok(UploadSummary {
        size,
        parts: parts.len(),
    })
}

async fn upload_parts<U, R>(
    uploader: &U,
    dest: &ObjectLocation,
    upload_id: &str,
    first: Vec<u8>,
    reader: &mut R,
    part_size: usize,
) -> Result<(u64, Vec<CompletedPart>)>
where
    U: PartUploader + ?Sized,
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut parts = Vec::new();
    let mut size = 0u64;
    let mut chunk = first;

    while !chunk.is_empty() {
        if parts.len() >= MAX_PARTS {
            return Err(Error::Validation(format!(
                "upload to '{dest}' needs more than {MAX_PARTS} parts of {part_size} bytes"
            )));
        }
        let part_number = parts.len() as i32 + 1;
        let len = chunk.len();
        tracing::debug!(part_number, len, "Uploading part");
        parts.push(uploader.upload_part(dest, upload_id, part_number, chunk).await?);
        size += len as u64;

        if len < part_size {
            break;
        }
        chunk = read_chunk(reader, part_size).await?;
    }

    Ok((size, parts))
}

async fn abort_session<U>(uploader: &U, dest: &ObjectLocation, upload_id: &str)
where
    U: PartUploader + ?Sized,
{
    if let Err(e) = uploader.abort_upload(dest, upload_id).await {
        tracing::warn!(%dest, upload_id = %upload_id, error = %e, "Failed to abort multipart upload");
    }
}
