//! osskit-s3: S3-compatible provider adapters
//!
//! This crate implements the `ObjectStorage` contract from osskit-core on
//! top of aws-sdk-s3. Amazon S3, MinIO, Aliyun OSS, Tencent COS and Huawei
//! OBS are all reached through their S3-compatible APIs; it is the only
//! crate that directly depends on the AWS SDK.

pub mod acl_header;
pub mod client;
pub mod dialect;
pub mod error;
pub mod factory;

pub use client::S3Storage;
pub use dialect::Dialect;
pub use factory::{S3Factory, register_providers};
