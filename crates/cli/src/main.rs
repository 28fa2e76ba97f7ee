//! osk - one command line for S3, MinIO, Aliyun OSS, Tencent COS and Huawei OBS

use clap::Parser;
use osskit_cli::commands::{self, Cli};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; --debug raises the fallback level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.debug {
            "osskit_core=debug,osskit_s3=debug,osskit_cli=debug"
        } else {
            "warn"
        })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;
    std::process::exit(exit_code.as_i32());
}
