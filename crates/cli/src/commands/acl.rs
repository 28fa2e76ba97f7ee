//! acl command - Bucket and object access modes
//!
//! Modes are `default`, `private`, `public-read` and `public-read-write`.
//! `storage/bucket` addresses the bucket, `storage/bucket/key` an object.

use std::str::FromStr;

use clap::Subcommand;
use osskit_core::{AccessMode, RemotePath, parse_remote};
use serde::Serialize;

use super::{Session, open_storage, parse_object_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Subcommand, Debug)]
pub enum AclCommands {
    /// Show the effective access mode
    Get(GetArgs),

    /// Change the access mode
    Set(SetArgs),

    /// Reset an object to inherit from its bucket
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// storage/bucket or storage/bucket/key
    pub target: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// storage/bucket or storage/bucket/key
    pub target: String,

    /// default, private, public-read or public-read-write
    pub mode: String,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// storage/bucket/key
    pub target: String,
}

#[derive(Debug, Serialize)]
struct AclOutput {
    target: String,
    mode: AccessMode,
}

/// Execute an acl subcommand
pub async fn execute(cmd: AclCommands, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match cmd {
        AclCommands::Get(args) => execute_get(args, session, &formatter).await,
        AclCommands::Set(args) => execute_set(args, session, &formatter).await,
        AclCommands::Remove(args) => execute_remove(args, session, &formatter).await,
    }
}

fn report(formatter: &Formatter, path: &RemotePath, mode: AccessMode) {
    if formatter.is_json() {
        formatter.json(&AclOutput {
            target: path.to_string(),
            mode,
        });
    } else {
        formatter.println(&format!("{path}: {mode}"));
    }
}

async fn execute_get(args: GetArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let path = match parse_remote(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let storage = match open_storage(session, &path, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let result = if path.key.is_empty() {
        storage.get_bucket_acl(&path.bucket).await
    } else {
        storage.get_object_acl(&path.bucket, &path.key).await
    };

    match result {
        Ok(mode) => {
            report(formatter, &path, mode);
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to get access mode of '{path}'"), &e),
    }
}

async fn execute_set(args: SetArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let mode = match AccessMode::from_str(&args.mode) {
        Ok(mode) => mode,
        Err(e) => return formatter.fail("Invalid access mode", &e),
    };
    let path = match parse_remote(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let storage = match open_storage(session, &path, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    let result = if path.key.is_empty() {
        storage.set_bucket_acl(&path.bucket, mode).await
    } else {
        storage.set_object_acl(&path.bucket, &path.key, mode).await
    };

    match result {
        Ok(()) => {
            if formatter.is_json() {
                report(formatter, &path, mode);
            } else {
                formatter.success(&format!("Access mode of '{path}' set to {mode}."));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to set access mode of '{path}'"), &e),
    }
}

async fn execute_remove(args: RemoveArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let path = match parse_object_path(&args.target) {
        Ok(path) => path,
        Err(e) => return formatter.fail("Invalid path", &e),
    };
    let storage = match open_storage(session, &path, formatter).await {
        Ok(storage) => storage,
        Err(code) => return code,
    };

    match storage.remove_object_acl(&path.bucket, &path.key).await {
        Ok(effective) => {
            if formatter.is_json() {
                report(formatter, &path, effective);
            } else {
                formatter.success(&format!(
                    "'{path}' now inherits from its bucket ({effective})."
                ));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to reset access mode of '{path}'"), &e),
    }
}
