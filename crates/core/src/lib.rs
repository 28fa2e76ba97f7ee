//! osskit-core: provider-neutral object storage layer
//!
//! This crate provides the parts of osskit that do not depend on any vendor SDK:
//! - The `ObjectStorage` contract and its data model
//! - Access-mode translation between canonical and provider ACLs
//! - Listing normalization over paged list calls
//! - Multipart copy orchestration and bounded-memory streaming uploads
//! - ACL-aware presigned URL resolution
//! - The provider registry with per-name adapter caching
//! - Configuration and profile management
//! - An in-memory backend for tests and local experiments

pub mod acl;
pub mod config;
pub mod error;
pub mod listing;
pub mod memory;
pub mod multipart;
pub mod path;
pub mod presign;
pub mod profile;
pub mod registry;
pub mod traits;
pub mod upload;

pub use acl::{AccessMode, CannedAcl, Grant, Grantee, Permission};
pub use config::{Config, ConfigManager, StorageConfig};
pub use error::{Error, Result};
pub use listing::{ListPage, PageRequest, PageSource};
pub use memory::{MemoryBackend, MemoryFactory, MemoryStorage};
pub use multipart::{CompletedPart, CopyConfig, ObjectLocation, PartCopier, PartCopyRequest};
pub use path::{ParsedPath, RemotePath, parse_path, parse_remote};
pub use presign::UrlSigner;
pub use profile::{Profile, ProfileManager};
pub use registry::{ProviderFactory, StorageHandle, StorageRegistry};
pub use traits::{
    BucketInfo, CorsRule, HttpMethod, MetadataOptions, ObjectInfo, ObjectMetadata, ObjectReader,
    ObjectStorage, Owner,
};
pub use upload::{PartUploader, UploadSummary};
