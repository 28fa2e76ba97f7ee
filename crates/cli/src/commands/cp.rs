//! cp command - Copy objects
//!
//! Copies between the local filesystem and a storage, or between two remote
//! locations. Copies inside one storage are server-side multipart copies;
//! Ctrl-C cancels them and aborts the upload session.

use std::future::Future;
use std::path::{Path, PathBuf};

use clap::Args;
use osskit_core::{
    Error, ObjectStorage, ParsedPath, RemotePath, Result, StorageHandle, parse_path,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{Session, open_storage};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Copy objects
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source path (local path or storage/bucket/key)
    pub source: String,

    /// Destination path (local path or storage/bucket/key)
    pub target: String,

    /// Copy every file or object under the source
    #[arg(short, long)]
    pub recursive: bool,

    /// Continue with the remaining files after a failure
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(Debug, Serialize)]
struct Transfer {
    source: String,
    target: String,
    size_bytes: u64,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    copied: Vec<Transfer>,
    total_bytes: u64,
    total_human: String,
}

/// One planned copy
#[derive(Debug, Clone, PartialEq, Eq)]
struct Job<S, T> {
    source: S,
    target: T,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let source = match parse_path(&args.source) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid source path", &e),
    };
    let target = match parse_path(&args.target) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid target path", &e),
    };

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupt received, cancelling copy");
                cancel.cancel();
            }
        })
    };

    let code = match (&source, &target) {
        (ParsedPath::Local(src), ParsedPath::Remote(dst)) => {
            upload(src, dst, &args, session, &formatter, &cancel).await
        }
        (ParsedPath::Remote(src), ParsedPath::Local(dst)) => {
            download(src, dst, &args, session, &formatter, &cancel).await
        }
        (ParsedPath::Remote(src), ParsedPath::Remote(dst)) => {
            copy_remote(src, dst, &args, session, &formatter, &cancel).await
        }
        (ParsedPath::Local(_), ParsedPath::Local(_)) => {
            formatter.error("Cannot copy between two local paths. Use system cp command.");
            ExitCode::UsageError
        }
    };

    watcher.abort();
    code
}

/// Key for `relative` under a remote destination
fn destination_key(dst_key: &str, relative: &str, into_dir: bool) -> String {
    if into_dir || dst_key.is_empty() || dst_key.ends_with('/') {
        let base = dst_key.trim_end_matches('/');
        if base.is_empty() {
            relative.to_string()
        } else {
            format!("{base}/{relative}")
        }
    } else {
        dst_key.to_string()
    }
}

/// Key of `object` relative to the listed `prefix`
fn relative_key<'a>(object: &'a str, prefix: &str) -> &'a str {
    object
        .strip_prefix(prefix)
        .unwrap_or(object)
        .trim_start_matches('/')
}

/// Every regular file below `dir`, with `/`-separated relative names
fn collect_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                let relative = path
                    .strip_prefix(dir)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((path, relative));
            }
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Run `operation` unless `cancel` fires first
async fn cancellable<T>(
    cancel: &CancellationToken,
    what: &str,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled(what.to_string())),
        result = operation => result,
    }
}

async fn upload(
    src: &Path,
    dst: &RemotePath,
    args: &CpArgs,
    session: &Session,
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> ExitCode {
    if !src.exists() {
        formatter.error(&format!("Source not found: {}", src.display()));
        return ExitCode::NotFound;
    }

    let jobs: Vec<Job<PathBuf, String>> = if src.is_dir() {
        if !args.recursive {
            formatter.error("Source is a directory. Use -r/--recursive to copy directories.");
            return ExitCode::UsageError;
        }
        match collect_files(src) {
            Ok(files) => files
                .into_iter()
                .map(|(path, relative)| Job {
                    source: path,
                    target: destination_key(&dst.key, &relative, true),
                })
                .collect(),
            Err(e) => {
                return formatter.fail("Failed to read source directory", &Error::from(e));
            }
        }
    } else {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        vec![Job {
            source: src.to_path_buf(),
            target: destination_key(&dst.key, &name, false),
        }]
    };

    let storage = match open_storage(session, dst, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let storage = &storage;
    run_jobs(jobs, args, formatter, move |job| {
        let display = (
            job.source.display().to_string(),
            format!("{}/{}/{}", dst.storage, dst.bucket, job.target),
        );
        async move {
            let size = cancellable(
                cancel,
                &display.1,
                storage.put_object_from_file(&dst.bucket, &job.target, &job.source),
            )
            .await?;
            Ok(Transfer {
                source: display.0,
                target: display.1,
                size_bytes: size,
            })
        }
    })
    .await
}

async fn download(
    src: &RemotePath,
    dst: &Path,
    args: &CpArgs,
    session: &Session,
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> ExitCode {
    let storage = match open_storage(session, src, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let jobs: Vec<Job<String, PathBuf>> = if args.recursive {
        match list_sources(storage.as_ref(), src).await {
            Ok(keys) => keys
                .into_iter()
                .map(|key| {
                    let relative = relative_key(&key, &src.key).to_string();
                    Job {
                        target: dst.join(&relative),
                        source: key,
                    }
                })
                .collect(),
            Err(e) => return formatter.fail(&format!("Failed to list '{src}'"), &e),
        }
    } else {
        if src.key.is_empty() || src.is_dir {
            formatter.error("Source is a prefix. Use -r/--recursive to copy it.");
            return ExitCode::UsageError;
        }
        let target = match src.file_name() {
            Some(name) if dst.is_dir() => dst.join(name),
            _ => dst.to_path_buf(),
        };
        vec![Job {
            source: src.key.clone(),
            target,
        }]
    };

    let storage = &storage;
    run_jobs(jobs, args, formatter, move |job| {
        let display = (
            format!("{}/{}/{}", src.storage, src.bucket, job.source),
            job.target.display().to_string(),
        );
        async move {
            let size = cancellable(
                cancel,
                &display.0,
                storage.get_object_to_file(&src.bucket, &job.source, &job.target),
            )
            .await?;
            Ok(Transfer {
                source: display.0,
                target: display.1,
                size_bytes: size,
            })
        }
    })
    .await
}

async fn copy_remote(
    src: &RemotePath,
    dst: &RemotePath,
    args: &CpArgs,
    session: &Session,
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> ExitCode {
    let source_storage = match open_storage(session, src, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };
    let dest_storage = if dst.storage == src.storage {
        source_storage.clone()
    } else {
        match open_storage(session, dst, formatter).await {
            Ok(storage) => storage,
            Err(code) => return code,
        }
    };
    let same_storage = dst.storage == src.storage;

    let jobs: Vec<Job<String, String>> = if args.recursive {
        match list_sources(source_storage.as_ref(), src).await {
            Ok(keys) => keys
                .into_iter()
                .map(|key| Job {
                    target: destination_key(&dst.key, relative_key(&key, &src.key), true),
                    source: key,
                })
                .collect(),
            Err(e) => return formatter.fail(&format!("Failed to list '{src}'"), &e),
        }
    } else {
        if src.key.is_empty() || src.is_dir {
            formatter.error("Source is a prefix. Use -r/--recursive to copy it.");
            return ExitCode::UsageError;
        }
        let name = src.file_name().unwrap_or(src.key.as_str()).to_string();
        vec![Job {
            source: src.key.clone(),
            target: destination_key(&dst.key, &name, false),
        }]
    };

    let (source_storage, dest_storage) = (&source_storage, &dest_storage);
    run_jobs(jobs, args, formatter, move |job| {
        let display = (
            format!("{}/{}/{}", src.storage, src.bucket, job.source),
            format!("{}/{}/{}", dst.storage, dst.bucket, job.target),
        );
        async move {
            let size = if same_storage {
                let size = source_storage
                    .get_object_metadata(&src.bucket, &job.source)
                    .await?
                    .size;
                source_storage
                    .copy_object_with(&src.bucket, &job.source, &dst.bucket, &job.target, cancel)
                    .await?;
                size
            } else {
                cancellable(
                    cancel,
                    &display.1,
                    stream_between(source_storage, dest_storage, src, dst, &job),
                )
                .await?
            };
            Ok(Transfer {
                source: display.0,
                target: display.1,
                size_bytes: size,
            })
        }
    })
    .await
}

/// Copy one object between two different storages through this process
async fn stream_between(
    source: &StorageHandle,
    dest: &StorageHandle,
    src: &RemotePath,
    dst: &RemotePath,
    job: &Job<String, String>,
) -> Result<u64> {
    let metadata = source.get_object_metadata(&src.bucket, &job.source).await?;
    let reader = source.get_object(&src.bucket, &job.source).await?;
    dest.put_object_stream(&dst.bucket, &job.target, reader, Some(&metadata.content_type))
        .await
}

/// Object keys under a remote prefix, directory placeholders excluded
async fn list_sources(storage: &dyn ObjectStorage, src: &RemotePath) -> Result<Vec<String>> {
    let prefix = (!src.key.is_empty()).then_some(src.key.as_str());
    Ok(storage
        .list_objects(&src.bucket, prefix)
        .await?
        .into_iter()
        .filter(|o| !o.is_dir)
        .map(|o| o.key)
        .collect())
}

async fn run_jobs<S, T, F, Fut>(
    jobs: Vec<Job<S, T>>,
    args: &CpArgs,
    formatter: &Formatter,
    mut run: F,
) -> ExitCode
where
    F: FnMut(Job<S, T>) -> Fut,
    Fut: Future<Output = Result<Transfer>>,
{
    if jobs.is_empty() {
        formatter.warning("Nothing to copy");
        return ExitCode::Success;
    }

    let progress = if jobs.len() > 1 {
        ProgressBar::new(formatter.config(), jobs.len() as u64)
    } else {
        ProgressBar::spinner(formatter.config(), "Copying")
    };
    let mut copied = Vec::new();
    let mut failure = None;

    for (index, job) in jobs.into_iter().enumerate() {
        let result = run(job).await;
        progress.set_position(index as u64 + 1);
        match result {
            Ok(transfer) => {
                progress.set_message(&transfer.target);
                if !formatter.is_json() {
                    formatter.println(&format!(
                        "{} -> {} ({})",
                        transfer.source,
                        transfer.target,
                        humansize::format_size(transfer.size_bytes, humansize::BINARY)
                    ));
                }
                copied.push(transfer);
            }
            Err(e) => {
                let code = formatter.fail("Copy failed", &e);
                let stop = matches!(e, Error::Cancelled(_)) || !args.continue_on_error;
                failure = Some(code);
                if stop {
                    break;
                }
            }
        }
    }
    progress.finish_and_clear();

    let total_bytes: u64 = copied.iter().map(|t| t.size_bytes).sum();
    if formatter.is_json() {
        formatter.json(&CpOutput {
            status: if failure.is_some() { "partial" } else { "success" },
            total_human: humansize::format_size(total_bytes, humansize::BINARY),
            total_bytes,
            copied,
        });
    }
    failure.unwrap_or(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use osskit_core::{MemoryFactory, StorageConfig, StorageRegistry, parse_remote};

    #[test]
    fn test_destination_key() {
        assert_eq!(destination_key("", "a.txt", false), "a.txt");
        assert_eq!(destination_key("docs/", "a.txt", false), "docs/a.txt");
        assert_eq!(destination_key("docs/b.txt", "a.txt", false), "docs/b.txt");
        assert_eq!(destination_key("docs", "x/a.txt", true), "docs/x/a.txt");
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(relative_key("logs/2024/a.log", "logs/"), "2024/a.log");
        assert_eq!(relative_key("logs/2024/a.log", "logs"), "2024/a.log");
        assert_eq!(relative_key("a.log", ""), "a.log");
    }

    #[test]
    fn test_collect_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/deeper/b.txt"), b"b").unwrap();

        let names: Vec<String> = collect_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(_, relative)| relative)
            .collect();
        assert_eq!(names, vec!["a.txt", "sub/deeper/b.txt"]);
    }

    #[tokio::test]
    async fn test_cancellable_stops_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, "copy", std::future::pending::<Result<()>>()).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_stream_between_storages() {
        let registry = StorageRegistry::new(HashMap::new())
            .with_storage("one", StorageConfig::new("memory", "", "AK", "SK"))
            .with_storage("two", StorageConfig::new("memory", "", "AK", "SK"));
        registry
            .register_factory(Arc::new(MemoryFactory::default()))
            .await;
        let one = registry.create("one").await.unwrap();
        let two = registry.create("two").await.unwrap();
        one.create_bucket("src").await.unwrap();
        two.create_bucket("dst").await.unwrap();

        let body: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        one.put_object("src", "data.bin", body.clone(), Some("image/png"))
            .await
            .unwrap();

        let src = parse_remote("one/src/data.bin").unwrap();
        let dst = parse_remote("two/dst/copy.bin").unwrap();
        let job = Job {
            source: "data.bin".to_string(),
            target: "copy.bin".to_string(),
        };
        let size = stream_between(&one, &two, &src, &dst, &job).await.unwrap();

        assert_eq!(size, body.len() as u64);
        let meta = two.get_object_metadata("dst", "copy.bin").await.unwrap();
        assert_eq!(meta.size, size);
        assert_eq!(meta.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_upload_to_missing_bucket_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let session = Session::new(Some(dir.path().join("config.toml"))).unwrap();
        session
            .profiles()
            .set("local", StorageConfig::new("memory", "", "AK", "SK"))
            .unwrap();

        let args = CpArgs {
            source: file.display().to_string(),
            target: "local/nobucket/".to_string(),
            recursive: false,
            continue_on_error: false,
        };
        let output = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(execute(args, &session, output).await, ExitCode::NotFound);
    }
}
