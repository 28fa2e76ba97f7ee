//! Profile management commands
//!
//! A profile is a named storage configuration: provider, endpoint,
//! credentials and region. Remote paths start with a profile name.

use clap::Subcommand;
use osskit_core::config::DEFAULT_REGION;
use osskit_core::{Profile, StorageConfig};
use serde::Serialize;

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "default", "archive", "cdn")
    pub name: String,

    /// Provider: s3, minio, aliyun, qcloud, huawei or memory
    pub provider: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Service endpoint (required for minio, derived from the region otherwise)
    #[arg(long, default_value = "")]
    pub endpoint: String,

    /// Region
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Talk plain HTTP
    #[arg(long, default_value = "false")]
    pub insecure: bool,

    /// Tencent Cloud APPID appended to bucket names
    #[arg(long)]
    pub app_id: Option<String>,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show region and scheme as well
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for JSON output (without credentials)
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    provider: String,
    endpoint: String,
    region: String,
    use_https: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<String>,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            provider: profile.storage.provider.clone(),
            endpoint: profile.storage.endpoint.clone(),
            region: profile.storage.effective_region().to_string(),
            use_https: profile.storage.use_https,
            app_id: profile.storage.app_id.clone(),
        }
    }
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, session: &Session, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match cmd {
        ProfileCommands::Set(args) => execute_set(args, session, &formatter),
        ProfileCommands::List(args) => execute_list(args, session, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, session, &formatter),
    }
}

fn storage_config(args: &SetArgs) -> StorageConfig {
    let config = StorageConfig::new(
        args.provider.trim().to_ascii_lowercase(),
        &args.endpoint,
        &args.access_key,
        &args.secret_key,
    )
    .with_region(&args.region)
    .with_https(!args.insecure);

    match &args.app_id {
        Some(app_id) => config.with_app_id(app_id),
        None => config,
    }
}

fn execute_set(args: SetArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    if let Err(e) = storage_config(&args).require_credentials() {
        return formatter.fail("Invalid profile", &e);
    }

    match session.profiles().set(&args.name, storage_config(&args)) {
        Ok(()) => {
            let message = format!("Profile '{}' configured successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save profile", &e),
    }
}

fn execute_list(args: ListArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    let profiles = match session.profiles().list() {
        Ok(profiles) => profiles,
        Err(e) => return formatter.fail("Failed to load profiles", &e),
    };

    if formatter.is_json() {
        let infos: Vec<ProfileInfo> = profiles.iter().map(ProfileInfo::from).collect();
        formatter.json(&serde_json::json!({ "profiles": infos }));
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &profiles {
            let endpoint = if profile.storage.endpoint.is_empty() {
                "<provider default>"
            } else {
                profile.storage.endpoint.as_str()
            };
            if args.long {
                formatter.println(&format!(
                    "{:<12} {:<8} {} (region: {}, {})",
                    profile.name,
                    profile.storage.provider,
                    endpoint,
                    profile.storage.effective_region(),
                    profile.storage.scheme()
                ));
            } else {
                formatter.println(&format!(
                    "{:<12} {:<8} {}",
                    profile.name, profile.storage.provider, endpoint
                ));
            }
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, session: &Session, formatter: &Formatter) -> ExitCode {
    match session.profiles().remove(&args.name) {
        Ok(()) => {
            let message = format!("Profile '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to remove profile", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args(app_id: Option<&str>) -> SetArgs {
        SetArgs {
            name: "cos".to_string(),
            provider: " QCloud ".to_string(),
            access_key: "AK".to_string(),
            secret_key: "SK".to_string(),
            endpoint: String::new(),
            region: "ap-guangzhou".to_string(),
            insecure: true,
            app_id: app_id.map(str::to_string),
        }
    }

    #[test]
    fn test_storage_config_from_args() {
        let config = storage_config(&set_args(Some("1250000000")));
        assert_eq!(config.provider, "qcloud");
        assert_eq!(config.region, "ap-guangzhou");
        assert!(!config.use_https);
        assert_eq!(config.app_id.as_deref(), Some("1250000000"));

        assert_eq!(storage_config(&set_args(None)).app_id, None);
    }

    #[test]
    fn test_profile_info_hides_credentials() {
        let profile = Profile {
            name: "cos".to_string(),
            storage: storage_config(&set_args(None)),
        };
        let json = serde_json::to_string(&ProfileInfo::from(&profile)).unwrap();
        assert!(json.contains("\"provider\":\"qcloud\""));
        assert!(!json.contains("SK"));
        assert!(!json.contains("app_id"));
    }

    #[tokio::test]
    async fn test_set_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("config.toml"))).unwrap();
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });

        assert_eq!(
            execute_set(set_args(None), &session, &formatter),
            ExitCode::Success
        );
        assert!(session.profiles().exists("cos").unwrap());

        let list = ListArgs { long: true };
        assert_eq!(execute_list(list, &session, &formatter), ExitCode::Success);

        let remove = RemoveArgs {
            name: "cos".to_string(),
        };
        assert_eq!(execute_remove(remove, &session, &formatter), ExitCode::Success);

        let again = RemoveArgs {
            name: "cos".to_string(),
        };
        assert_eq!(
            execute_remove(again, &session, &formatter),
            ExitCode::UsageError
        );
    }

    #[tokio::test]
    async fn test_set_without_secret_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("config.toml"))).unwrap();
        let mut args = set_args(None);
        args.secret_key = String::new();

        assert_eq!(
            execute_set(args, &session, &Formatter::default()),
            ExitCode::UsageError
        );
        assert!(!session.profiles().exists("cos").unwrap());
    }
}
