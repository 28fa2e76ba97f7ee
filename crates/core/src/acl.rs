//! Access-mode translation
//!
//! Providers describe permissions either as a canned ACL string or as a list
//! of grants. Both collapse onto the four-state [`AccessMode`].

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Group URI identifying every anonymous user
pub const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Group URI identifying every authenticated user
pub const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// Canonical access mode of a bucket or object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Inherit from the parent bucket
    #[default]
    Default,
    Private,
    PublicRead,
    PublicReadWrite,
}

impl AccessMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Default => "default",
            AccessMode::Private => "private",
            AccessMode::PublicRead => "public-read",
            AccessMode::PublicReadWrite => "public-read-write",
        }
    }

    /// Whether anonymous users can read
    pub const fn is_public(&self) -> bool {
        matches!(self, AccessMode::PublicRead | AccessMode::PublicReadWrite)
    }

    /// Position in the disclosure order `Private < PublicRead < PublicReadWrite`
    ///
    /// `Default` has no level until it is resolved against its parent.
    pub const fn disclosure_level(&self) -> Option<u8> {
        match self {
            AccessMode::Default => None,
            AccessMode::Private => Some(0),
            AccessMode::PublicRead => Some(1),
            AccessMode::PublicReadWrite => Some(2),
        }
    }

    /// Build a mode from the two all-users flags.
    ///
    /// Write without read has no canonical form and collapses to `Private`.
    pub const fn from_flags(public_read: bool, public_write: bool) -> Self {
        match (public_read, public_write) {
            (true, false) => AccessMode::PublicRead,
            (true, true) => AccessMode::PublicReadWrite,
            (false, _) => AccessMode::Private,
        }
    }

    /// A bucket has no parent, so `Default` reads as `Private`
    pub const fn resolve_bucket(self) -> Self {
        match self {
            AccessMode::Default => AccessMode::Private,
            other => other,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(AccessMode::Default),
            "private" => Ok(AccessMode::Private),
            "public-read" | "publicread" => Ok(AccessMode::PublicRead),
            "public-read-write" | "publicreadwrite" => Ok(AccessMode::PublicReadWrite),
            other => Err(Error::Validation(format!(
                "unknown access mode '{other}': expected default, private, public-read or public-read-write"
            ))),
        }
    }
}

/// Canned ACL as sent in `x-amz-acl` style headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CannedAcl {
    /// Provider-specific "inherit from bucket"
    Default,
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Default => "default",
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let acl = match s {
            "default" => CannedAcl::Default,
            "private" => CannedAcl::Private,
            "public-read" => CannedAcl::PublicRead,
            "public-read-write" => CannedAcl::PublicReadWrite,
            "authenticated-read" => CannedAcl::AuthenticatedRead,
            "bucket-owner-read" => CannedAcl::BucketOwnerRead,
            "bucket-owner-full-control" => CannedAcl::BucketOwnerFullControl,
            _ => return None,
        };
        Some(acl)
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a grant applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grantee {
    AllUsers,
    AuthenticatedUsers,
    /// Canonical user id
    User(String),
    /// Any other group URI
    Group(String),
}

impl Grantee {
    /// Classify a group URI; anything naming "allusers" is the public group
    pub fn from_uri(uri: &str) -> Self {
        let lower = uri.to_ascii_lowercase();
        if lower.contains("allusers") {
            Grantee::AllUsers
        } else if lower.contains("authenticatedusers") {
            Grantee::AuthenticatedUsers
        } else {
            Grantee::Group(uri.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    ReadAcp,
    WriteAcp,
    FullControl,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
            Permission::FullControl => "FULL_CONTROL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let permission = match s.to_ascii_uppercase().as_str() {
            "READ" => Permission::Read,
            "WRITE" => Permission::Write,
            "READ_ACP" => Permission::ReadAcp,
            "WRITE_ACP" => Permission::WriteAcp,
            "FULL_CONTROL" => Permission::FullControl,
            _ => return None,
        };
        Some(permission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

impl Grant {
    pub fn new(grantee: Grantee, permission: Permission) -> Self {
        Self {
            grantee,
            permission,
        }
    }
}

/// Translation between a provider-native ACL shape and [`AccessMode`]
pub trait AclTranslator {
    type Native;

    fn to_canonical(&self, native: &Self::Native) -> AccessMode;

    fn from_canonical(&self, mode: AccessMode) -> Self::Native;
}

/// One-to-one mapping for providers that speak canned ACL strings
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedAclTranslator;

impl AclTranslator for CannedAclTranslator {
    type Native = CannedAcl;

    fn to_canonical(&self, native: &CannedAcl) -> AccessMode {
        match native {
            CannedAcl::Default => AccessMode::Default,
            CannedAcl::PublicRead => AccessMode::PublicRead,
            CannedAcl::PublicReadWrite => AccessMode::PublicReadWrite,
            CannedAcl::Private
            | CannedAcl::AuthenticatedRead
            | CannedAcl::BucketOwnerRead
            | CannedAcl::BucketOwnerFullControl => AccessMode::Private,
        }
    }

    fn from_canonical(&self, mode: AccessMode) -> CannedAcl {
        match mode {
            AccessMode::Default => CannedAcl::Default,
            AccessMode::Private => CannedAcl::Private,
            AccessMode::PublicRead => CannedAcl::PublicRead,
            AccessMode::PublicReadWrite => CannedAcl::PublicReadWrite,
        }
    }
}

/// Scan-based mapping for providers that return grant lists
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantListTranslator;

impl AclTranslator for GrantListTranslator {
    type Native = Vec<Grant>;

    fn to_canonical(&self, grants: &Vec<Grant>) -> AccessMode {
        let mut public_read = false;
        let mut public_write = false;
        for grant in grants.iter().filter(|g| g.grantee == Grantee::AllUsers) {
            match grant.permission {
                Permission::Read => public_read = true,
                Permission::Write => public_write = true,
                _ => {}
            }
        }
        AccessMode::from_flags(public_read, public_write)
    }

    fn from_canonical(&self, mode: AccessMode) -> Vec<Grant> {
        match mode {
            AccessMode::Default | AccessMode::Private => Vec::new(),
            AccessMode::PublicRead => vec![Grant::new(Grantee::AllUsers, Permission::Read)],
            AccessMode::PublicReadWrite => vec![
                Grant::new(Grantee::AllUsers, Permission::Read),
                Grant::new(Grantee::AllUsers, Permission::Write),
            ],
        }
    }
}

/// Resolve an object's effective mode.
///
/// The bucket mode is only fetched when the object inherits.
pub async fn resolve_effective<F, Fut>(object_mode: AccessMode, bucket_mode: F) -> Result<AccessMode>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<AccessMode>>,
{
    if object_mode != AccessMode::Default {
        return Ok(object_mode);
    }
    Ok(bucket_mode().await?.resolve_bucket())
}
