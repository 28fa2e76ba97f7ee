//! SDK error classification
//!
//! Maps aws-sdk-s3 failures onto the core error taxonomy. Service error
//! codes win over HTTP status; anything unrecognized stays opaque.

use std::fmt::Display;

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use osskit_core::Error;

/// Classify a failure from its HTTP status and service error code
pub fn classify(
    status: Option<u16>,
    code: Option<&str>,
    context: impl Display,
    message: impl Display,
) -> Error {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchUpload") => {
            return Error::NotFound(context.to_string());
        }
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty") => {
            return Error::Conflict(context.to_string());
        }
        Some("PreconditionFailed") => return Error::Precondition(context.to_string()),
        _ => {}
    }

    match status {
        Some(status @ (304 | 404 | 409 | 412)) => Error::from_status(status, context),
        _ => Error::provider(context, message),
    }
}

/// HTTP status of the response behind an SDK error, if one arrived
pub fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

/// Convert an SDK error, naming the operation in `context`
pub fn from_sdk<E>(err: SdkError<E, HttpResponse>, context: impl Display) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = status_of(&err);
    let code = err.code().map(str::to_string);
    classify(status, code.as_deref(), context, DisplayErrorContext(&err))
}
