//! CLI command definitions and execution
//!
//! Every command resolves its storage through a [`Session`], which loads the
//! configuration file and builds the provider registry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use osskit_core::{
    ConfigManager, Error, MemoryFactory, ProfileManager, RemotePath, Result, StorageHandle,
    StorageRegistry, parse_remote,
};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod acl;
mod cat;
mod completions;
mod cp;
mod cors;
mod ls;
mod mb;
mod profile;
mod rb;
mod rm;
mod share;
mod stat;

/// osk - one object-storage CLI for S3, MinIO, Aliyun OSS, Tencent COS and Huawei OBS
#[derive(Parser, Debug)]
#[command(name = "osk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Configuration file (default: <config dir>/osskit/config.toml)
    #[arg(long, global = true, env = "OSSKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage named storage configurations
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// List buckets and objects
    Ls(ls::LsArgs),

    /// Create a bucket
    Mb(mb::MbArgs),

    /// Remove a bucket
    Rb(rb::RbArgs),

    /// Show object metadata and access mode
    Stat(stat::StatArgs),

    /// Display object contents
    Cat(cat::CatArgs),

    /// Copy objects (local<->remote, remote<->remote)
    Cp(cp::CpArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Get or change bucket and object access modes
    #[command(subcommand)]
    Acl(acl::AclCommands),

    /// Generate a GET URL for an object
    Share(share::ShareArgs),

    /// Replace the CORS rules of a bucket
    Cors(cors::CorsArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Configuration and registry access shared by the commands
pub struct Session {
    config_path: PathBuf,
}

impl Session {
    /// Use `config_path` or the default configuration location
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => ConfigManager::new()?.config_path().clone(),
        };
        Ok(Self { config_path })
    }

    pub fn config_manager(&self) -> ConfigManager {
        ConfigManager::with_path(self.config_path.clone())
    }

    pub fn profiles(&self) -> ProfileManager {
        ProfileManager::with_config_manager(self.config_manager())
    }

    /// Registry over every configured storage with all providers registered
    pub async fn registry(&self) -> Result<StorageRegistry> {
        let config = self.config_manager().load()?;
        let registry = StorageRegistry::from_config(&config);
        registry
            .register_factory(Arc::new(MemoryFactory::default()))
            .await;
        osskit_s3::register_providers(&registry).await;
        Ok(registry)
    }

    /// Adapter for a named storage
    pub async fn open(&self, storage: &str) -> Result<StorageHandle> {
        self.registry().await?.create(storage).await
    }
}

/// Open the storage a remote path points into, reporting failures
pub(crate) async fn open_storage(
    session: &Session,
    path: &RemotePath,
    formatter: &Formatter,
) -> std::result::Result<StorageHandle, ExitCode> {
    session
        .open(&path.storage)
        .await
        .map_err(|e| formatter.fail(&format!("Failed to open storage '{}'", path.storage), &e))
}

/// Parse a `storage/bucket/key` path that must name a single object
pub(crate) fn parse_object_path(target: &str) -> Result<RemotePath> {
    let path = parse_remote(target)?;
    if path.key.is_empty() || path.is_dir {
        return Err(Error::Validation(format!(
            "'{target}' does not name an object. Expected: storage/bucket/key"
        )));
    }
    Ok(path)
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    if let Commands::Completions(args) = cli.command {
        return completions::execute(args);
    }

    let session = match Session::new(cli.config) {
        Ok(session) => session,
        Err(e) => {
            return Formatter::new(output_config).fail("Failed to locate configuration", &e);
        }
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, &session, output_config).await,
        Commands::Ls(args) => ls::execute(args, &session, output_config).await,
        Commands::Mb(args) => mb::execute(args, &session, output_config).await,
        Commands::Rb(args) => rb::execute(args, &session, output_config).await,
        Commands::Stat(args) => stat::execute(args, &session, output_config).await,
        Commands::Cat(args) => cat::execute(args, &session, output_config).await,
        Commands::Cp(args) => cp::execute(args, &session, output_config).await,
        Commands::Rm(args) => rm::execute(args, &session, output_config).await,
        Commands::Acl(cmd) => acl::execute(cmd, &session, output_config).await,
        Commands::Share(args) => share::execute(args, &session, output_config).await,
        Commands::Cors(args) => cors::execute(args, &session, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}
