use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;
use zm_onvif_time::constants::{DEFAULT_DEVICE_TIMEOUT_SECS, FATAL_EXIT_CODE};
use zm_onvif_time::{Config, OnvifConnector, Reconciler, ZoneMinderClient};

/// Set the date and time on every ONVIF camera known to ZoneMinder.
///
/// Reads ZM_API_URL, ONVIF_USERNAME and ONVIF_PASSWORD from the environment.
/// Exits 0 when every camera succeeded, otherwise with the number of failed
/// cameras (at most 254), or 255 when the run could not complete.
#[derive(Parser, Debug)]
#[command(name = "zm-onvif-time", version, about)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Exit on first error instead of trying all cameras
    #[arg(short, long)]
    fail_fast: bool,

    /// Log what would be done but do not change anything
    #[arg(short = 'D', long, alias = "dry_run")]
    dry_run: bool,

    /// Timeout for each camera request, in seconds
    #[arg(long, default_value_t = DEFAULT_DEVICE_TIMEOUT_SECS)]
    timeout: u64,

    /// Offset security token timestamps by the camera's clock error
    #[arg(long)]
    adjust_time: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for quiet in ["hyper=warn", "hyper_util=warn", "reqwest=warn"] {
        if let Ok(directive) = quiet.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .init();
}

async fn run(cli: Cli) -> zm_onvif_time::Result<i32> {
    let config = Config::from_env()?;
    tracing::debug!(
        "Using ZoneMinder API URL: {}; ONVIF credentials {:?}",
        config.zm_url,
        config.credentials
    );

    let inventory = ZoneMinderClient::new(config.zm_url);
    let connector = OnvifConnector::new(config.credentials)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_time_adjust(cli.adjust_time);

    let batch = Reconciler::new(inventory, connector)
        .with_dry_run(cli.dry_run)
        .run(cli.fail_fast)
        .await?;
    Ok(batch.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            FATAL_EXIT_CODE
        }
    };
    ExitCode::from(code as u8)
}
