//! Object ACL from response headers
//!
//! Aliyun OSS and Tencent COS report an object's canned ACL in a response
//! header of GetObjectAcl, and `default` there means the object defers to
//! its bucket. The S3 body always lists the owner's FULL_CONTROL grant, so
//! the grant list alone cannot tell an inheriting object from a private one.

use std::sync::{Arc, Mutex};

use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::interceptors::context::BeforeDeserializationInterceptorContextRef;
use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
use aws_smithy_runtime_api::http::Headers;
use aws_smithy_types::config_bag::ConfigBag;

use osskit_core::acl::{AccessMode, AclTranslator, CannedAclTranslator, Grant, GrantListTranslator};
use osskit_core::CannedAcl;

/// Records one response header of the request it is attached to
#[derive(Debug, Clone)]
pub struct AclHeaderCapture {
    header: &'static str,
    value: Arc<Mutex<Option<String>>>,
}

impl AclHeaderCapture {
    pub fn new(header: &'static str) -> Self {
        Self {
            header,
            value: Arc::new(Mutex::new(None)),
        }
    }

    pub fn record(&self, headers: &Headers) {
        let Some(value) = headers.get(self.header) else {
            return;
        };
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value.to_string());
        }
    }

    /// Header value seen by the last response, if any
    pub fn take(&self) -> Option<String> {
        self.value.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl Intercept for AclHeaderCapture {
    fn name(&self) -> &'static str {
        "AclHeaderCapture"
    }

    fn read_before_deserialization(
        &self,
        context: &BeforeDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        self.record(context.response().headers());
        Ok(())
    }
}

/// Own mode of an object.
///
/// A recognized canned value in the header wins. Without one the grant
/// list decides, except that an inheriting provider returning no grants at
/// all also means `Default`.
pub fn object_mode(header: Option<&str>, grants: &Vec<Grant>, inherits: bool) -> AccessMode {
    let canned = header.and_then(|value| CannedAcl::parse(&value.trim().to_ascii_lowercase()));
    match canned {
        Some(canned) => CannedAclTranslator.to_canonical(&canned),
        None if inherits && grants.is_empty() => AccessMode::Default,
        None => GrantListTranslator.to_canonical(grants),
    }
}
