//! Listing normalization
//!
//! Providers page object listings with an opaque marker and a truncation
//! flag. [`list_all`] drives any [`PageSource`] to a single flat listing.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::traits::ObjectInfo;

/// Keys requested per page
pub const DEFAULT_PAGE_SIZE: i32 = 100;

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,

    /// Whether more pages follow
    pub truncated: bool,

    /// Marker to send with the next request
    pub next_marker: Option<String>,
}

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    /// `None` on the first request
    pub marker: Option<String>,
    pub max_keys: i32,
}

/// A provider's paged list-objects call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ListPage>;
}

/// Collect every object under `prefix`.
///
/// A truncated page without a marker, or with any marker already seen in
/// this listing, is a protocol violation and fails with
/// [`Error::Provider`] instead of looping.
pub async fn list_all<S>(source: &S, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectInfo>>
where
    S: PageSource + ?Sized,
{
    list_all_with(source, bucket, prefix, DEFAULT_PAGE_SIZE).await
}

/// [`list_all`] with an explicit page size
pub async fn list_all_with<S>(
    source: &S,
    bucket: &str,
    prefix: Option<&str>,
    page_size: i32,
) -> Result<Vec<ObjectInfo>>
where
    S: PageSource + ?Sized,
{
    let mut request = PageRequest {
        bucket: bucket.to_string(),
        prefix: prefix.map(str::to_string),
        marker: None,
        max_keys: page_size.max(1),
    };
    let mut objects = Vec::new();
    let mut pages = 0usize;
    let mut seen = HashSet::new();

    loop {
        let page = source.fetch_page(&request).await?;
        pages += 1;
        tracing::debug!(
            bucket,
            page = pages,
            count = page.objects.len(),
            truncated = page.truncated,
            "Fetched listing page"
        );
        objects.extend(page.objects);

        if !page.truncated {
            break;
        }

        let next = match page.next_marker {
            Some(next) if !next.is_empty() => next,
            _ => {
                return Err(Error::Provider(format!(
                    "listing of '{bucket}' is truncated but returned no marker"
                )));
            }
        };
        if !seen.insert(next.clone()) {
            return Err(Error::Provider(format!(
                "listing of '{bucket}' repeated marker '{next}'"
            )));
        }
        request.marker = Some(next);
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `total` keys in pages, using the last key as the marker
    struct PagedSource {
        keys: Vec<String>,
    }

    impl PagedSource {
        fn new(total: usize) -> Self {
            Self {
                keys: (0..total).map(|i| format!("obj-{i:05}")).collect(),
            }
        }
    }

    #[async_trait]
    impl PageSource for PagedSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<ListPage> {
            let start = match &request.marker {
                Some(m) => self.keys.iter().position(|k| k == m).map_or(0, |p| p + 1),
                None => 0,
            };
            let end = (start + request.max_keys as usize).min(self.keys.len());
            let objects: Vec<ObjectInfo> = self.keys[start..end]
                .iter()
                .map(|k| ObjectInfo::new(&request.bucket, k.clone(), 1))
                .collect();
            let truncated = end < self.keys.len();
            Ok(ListPage {
                next_marker: truncated.then(|| self.keys[end - 1].clone()),
                objects,
                truncated,
            })
        }
    }

    #[tokio::test]
    async fn test_list_all_returns_every_object_once() {
        for total in [0usize, 1, 99, 100, 101, 250] {
            let source = PagedSource::new(total);
            for page_size in [1, 7, 100, 1000] {
                let objects = list_all_with(&source, "b", None, page_size).await.unwrap();
                assert_eq!(objects.len(), total, "total={total} page_size={page_size}");

                let unique: HashSet<_> = objects.iter().map(|o| o.key.as_str()).collect();
                assert_eq!(unique.len(), total);
            }
        }
    }

    #[tokio::test]
    async fn test_default_page_size_is_requested() {
        let mut source = MockPageSource::new();
        source
            .expect_fetch_page()
            .withf(|req| {
                req.bucket == "b"
                    && req.prefix.as_deref() == Some("logs/")
                    && req.marker.is_none()
                    && req.max_keys == DEFAULT_PAGE_SIZE
            })
            .times(1)
            .returning(|req| {
                Ok(ListPage {
                    objects: vec![ObjectInfo::new(&req.bucket, "logs/a", 3)],
                    truncated: false,
                    next_marker: None,
                })
            });

        let objects = list_all(&source, "b", Some("logs/")).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].bucket, "b");
    }

    #[tokio::test]
    async fn test_repeated_marker_is_provider_error() {
        let mut source = MockPageSource::new();
        source
            .expect_fetch_page()
            .times(2)
            .returning(|req| {
                Ok(ListPage {
                    objects: vec![ObjectInfo::new(&req.bucket, "same", 1)],
                    truncated: true,
                    next_marker: Some("m1".to_string()),
                })
            });

        let err = list_all(&source, "b", None).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("repeated marker"));
    }

    /// Alternates between two markers forever
    struct CyclingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CyclingSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<ListPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = match request.marker.as_deref() {
                Some("A") => "B",
                _ => "A",
            };
            Ok(ListPage {
                objects: vec![ObjectInfo::new(&request.bucket, next, 1)],
                truncated: true,
                next_marker: Some(next.to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_marker_cycle_is_provider_error() {
        let source = CyclingSource {
            calls: AtomicUsize::new(0),
        };

        let err = list_all(&source, "b", None).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("repeated marker 'A'"));
        // None -> A, A -> B, B -> A
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_truncated_without_marker_is_provider_error() {
        for marker in [None, Some(String::new())] {
            let mut source = MockPageSource::new();
            source
                .expect_fetch_page()
                .times(1)
                .returning(move |_| {
                    Ok(ListPage {
                        objects: Vec::new(),
                        truncated: true,
                        next_marker: marker.clone(),
                    })
                });

            let err = list_all(&source, "b", None).await.unwrap_err();
            assert!(matches!(err, Error::Provider(_)));
        }
    }
}
