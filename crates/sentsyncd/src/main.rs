// # sentsyncd - Sentinel-to-Endpoints Daemon
//
// Thin integration layer only: flag parsing, logging setup, wiring. All
// reconciliation logic lives in sentsync-core; the protocol clients live in
// sentsync-source-sentinel and sentsync-publisher-kube.
//
// ## Usage
//
// ```bash
// sentsyncd \
//     --sentinel 10.0.0.2:26379 \
//     --master mymaster \
//     --kube-api kubernetes.default.svc:443 \
//     --service redis-master \
//     --log-level info
// ```
//
// The daemon expects to run inside a pod with the service-account directory
// mounted (token, namespace, ca.crt); `--secrets-dir` relocates it for
// out-of-cluster runs.

use anyhow::Result;
use clap::Parser;
use sentsync_core::{Reconciler, ReconcilerEvent, SyncConfig};
use sentsync_publisher_kube::KubeEndpointPublisher;
use sentsync_source_sentinel::SentinelSource;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SentsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SentsyncExitCode> for ExitCode {
    fn from(code: SentsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep a Kubernetes Endpoints resource pointed at the current Redis master
#[derive(Parser, Debug)]
#[command(name = "sentsyncd", version)]
struct Args {
    /// Kubernetes API server address (host:port)
    #[arg(long = "kube-api", default_value = "kubernetes.default.svc:443")]
    kube_api: String,

    /// Redis Sentinel address (host:port)
    #[arg(long, default_value = "127.0.0.1:26379")]
    sentinel: String,

    /// Logical name of the master Redis node, as known to Sentinel
    #[arg(long, default_value = "mymaster")]
    master: String,

    /// Name of the Endpoints resource to keep in sync
    #[arg(long)]
    service: String,

    /// Directory holding the service-account token, namespace and CA cert
    #[arg(
        long = "secrets-dir",
        default_value = "/var/run/secrets/kubernetes.io/serviceaccount"
    )]
    secrets_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = SyncConfig {
        sentinel_addr: args.sentinel.clone(),
        master_name: args.master.clone(),
        kube_api_addr: args.kube_api.clone(),
        service_name: args.service.clone(),
        loop_settings: Default::default(),
    };

    // Fail fast on bad configuration, before any network activity.
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {e}");
        return SentsyncExitCode::ConfigError.into();
    }

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!("invalid log level '{other}' (expected trace, debug, info, warn or error)");
            return SentsyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {e}");
        return SentsyncExitCode::ConfigError.into();
    }

    info!(
        sentinel = %config.sentinel_addr,
        master = %config.master_name,
        kube_api = %config.kube_api_addr,
        service = %config.service_name,
        "starting sentsyncd"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return SentsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config, args.secrets_dir).await {
            error!("daemon error: {e}");
            SentsyncExitCode::RuntimeError
        } else {
            SentsyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the components together and run the loop until killed
async fn run_daemon(config: SyncConfig, secrets_dir: PathBuf) -> Result<()> {
    let source = SentinelSource::new(config.sentinel_addr.clone(), config.master_name.clone());
    let publisher = KubeEndpointPublisher::new(
        config.kube_api_addr.clone(),
        config.service_name.clone(),
    )
    .with_secrets_dir(secrets_dir);

    let (mut reconciler, mut events) =
        Reconciler::new(Box::new(source), Box::new(publisher), &config)?;

    // The reconciler already logs its own decisions; the event stream is
    // drained here so it never backs up.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ReconcilerEvent::MasterChanged { new, previous } => {
                    debug!(?previous, %new, "event: master changed");
                }
                other => debug!(?other, "event"),
            }
        }
    });

    reconciler.run().await?;
    Ok(())
}
