//! cat command - Display object contents
//!
//! Streams an object to stdout.

use clap::Args;
use osskit_core::Error;
use tokio::io::AsyncWriteExt;

use super::{Session, open_storage, parse_object_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object path (storage/bucket/key)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_object_path(&args.path) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let storage = match open_storage(session, &path, &formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let mut reader = match storage.get_object(&path.bucket, &path.key).await {
        Ok(reader) => reader,
        Err(e) => return formatter.fail(&format!("Failed to read '{path}'"), &e),
    };

    let mut stdout = tokio::io::stdout();
    let copied = tokio::io::copy(&mut reader, &mut stdout).await;
    let flushed = stdout.flush().await;
    match copied.and(flushed) {
        Ok(()) => ExitCode::Success,
        Err(e) => formatter.fail(&format!("Failed to write '{path}'"), &Error::from(e)),
    }
}
