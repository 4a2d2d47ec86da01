use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::output::{print_json, OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::models::notification::{ErrorSignal, NotificationDecision};
use crate::core::models::usage::{UsagePeriodView, UsageSnapshot};
use crate::core::selector::NotificationSelector;
use crate::core::signals::NotificationCenter;
use crate::core::snapshot_provider::{Phase, SnapshotProvider};
use crate::core::sources::file::FileQuotaSource;
use crate::core::sources::http::HttpQuotaSource;
use crate::core::sources::{QuotaSource, UserId};
use crate::core::threshold::UsageReport;

#[derive(Debug, Default, clap::Args)]
pub struct StatusArgs {
    /// User to query (default: quota.user_id from config)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Override the quota endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Evaluate a saved quota payload instead of calling the endpoint
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Simulate an upstream generation error
    #[arg(long, value_name = "MESSAGE")]
    pub blocking_error: Option<String>,

    /// Simulate a file upload error
    #[arg(long, value_name = "MESSAGE")]
    pub upload_error: Option<String>,

    /// Keep refreshing every SECS seconds
    #[arg(short, long, value_name = "SECS")]
    pub watch: Option<u64>,
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    source: &'static str,
    phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    daily: Option<&'a UsagePeriodView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly: Option<&'a UsagePeriodView>,
    decision: &'a NotificationDecision,
}

fn build_source(args: &StatusArgs, config: &AppConfig) -> Result<Arc<dyn QuotaSource>> {
    if let Some(path) = &args.snapshot {
        return Ok(Arc::new(FileQuotaSource::new(path)));
    }
    let endpoint = args.endpoint.as_deref().unwrap_or(&config.quota.endpoint);
    let source = HttpQuotaSource::new(endpoint, config.quota.token(), config.quota.timeout())
        .context("Failed to set up quota endpoint")?;
    Ok(Arc::new(source))
}

fn emit(
    provider: &SnapshotProvider,
    center: &NotificationCenter,
    config: &AppConfig,
    opts: &OutputOptions,
) -> Result<()> {
    let report: Option<UsageReport> = center.usage();
    let decision = center.current();

    match opts.format {
        OutputFormat::Text => {
            let tier_name = report
                .as_ref()
                .map(|r| config.tiers.get(r.tier).display_name.as_str())
                .unwrap_or("unknown");
            println!(
                "{}",
                renderer::render_status(
                    report.as_ref(),
                    tier_name,
                    provider.source_name(),
                    &decision,
                    opts.use_color,
                )
            );
        }
        OutputFormat::Json => {
            let snapshot = provider.current();
            let payload = StatusPayload {
                source: provider.source_name(),
                phase: provider.phase(),
                snapshot: snapshot.as_deref(),
                daily: report.as_ref().map(|r| &r.daily),
                monthly: report.as_ref().map(|r| &r.monthly),
                decision: &decision,
            };
            print_json(&payload, opts)?;
        }
    }
    Ok(())
}

pub async fn run(args: StatusArgs, config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let source = build_source(&args, config)?;
    let user = args
        .user
        .clone()
        .or_else(|| config.quota.user_id.clone())
        .unwrap_or_else(|| "me".to_string());
    let provider = SnapshotProvider::new(source, UserId::new(user));
    let center =
        NotificationCenter::new(NotificationSelector::new(Arc::new(config.tiers.clone())));

    center.set_blocking_error(
        args.blocking_error
            .clone()
            .map(|message| ErrorSignal::new(message, "generation")),
    );
    center.set_upload_error(
        args.upload_error
            .clone()
            .map(|message| ErrorSignal::new(message, "upload")),
    );

    let snapshot = provider
        .refresh()
        .await
        .context("Failed to fetch usage")?;
    center.set_usage(Some(&snapshot), Utc::now());
    emit(&provider, &center, config, opts)?;

    let Some(interval_secs) = args.watch else {
        return Ok(());
    };
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c, stopping watch");
        }
    };
    let every = Duration::from_secs(interval_secs.max(1));
    watch(&provider, &center, config, opts, every, shutdown).await
}

/// Refresh on an interval and re-render whenever the decision changes.
async fn watch(
    provider: &SnapshotProvider,
    center: &NotificationCenter,
    config: &AppConfig,
    opts: &OutputOptions,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);
    let mut snapshots = provider.subscribe();
    snapshots.mark_unchanged();
    let mut decisions = center.subscribe();
    decisions.mark_unchanged();

    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    info!(every_secs = every.as_secs(), "watching quota usage");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                tokio::select! {
                    _ = &mut shutdown => break,
                    result = provider.refresh() => {
                        if let Err(err) = result {
                            warn!(error = %err, "refresh failed, keeping last snapshot");
                        }
                    }
                }
            }
            changed = snapshots.changed() => {
                changed?;
                let snapshot = snapshots.borrow_and_update().clone();
                center.set_usage(snapshot.as_deref(), Utc::now());
            }
            changed = decisions.changed() => {
                changed?;
                decisions.mark_unchanged();
                if opts.format == OutputFormat::Text {
                    println!();
                }
                emit(provider, center, config, opts)?;
            }
        }
    }
    provider.cancel_pending();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flag_selects_file_source() {
        let args = StatusArgs {
            snapshot: Some(PathBuf::from("/tmp/quota.json")),
            ..StatusArgs::default()
        };
        let source = build_source(&args, &AppConfig::default()).unwrap();
        assert_eq!(source.name(), "file");
    }

    #[test]
    fn endpoint_flag_overrides_config() {
        let args = StatusArgs {
            endpoint: Some("http://evil.com/usage".to_string()),
            ..StatusArgs::default()
        };
        assert!(build_source(&args, &AppConfig::default()).is_err());

        let args = StatusArgs {
            endpoint: Some("http://127.0.0.1:9/usage".to_string()),
            ..StatusArgs::default()
        };
        assert_eq!(build_source(&args, &AppConfig::default()).unwrap().name(), "http");
    }

    /// Source whose requests never complete.
    struct StalledSource;

    #[async_trait::async_trait]
    impl QuotaSource for StalledSource {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn fetch_snapshot(
            &self,
            _user: &UserId,
        ) -> Result<UsageSnapshot, crate::core::sources::FetchError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn watch_stops_during_hung_refresh() {
        let config = AppConfig::default();
        let provider = SnapshotProvider::new(Arc::new(StalledSource), UserId::new("u"));
        let center =
            NotificationCenter::new(NotificationSelector::new(Arc::new(config.tiers.clone())));
        let opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
        };

        let stopped = tokio::time::timeout(
            Duration::from_secs(2),
            watch(
                &provider,
                &center,
                &config,
                &opts,
                Duration::from_millis(10),
                tokio::time::sleep(Duration::from_millis(100)),
            ),
        )
        .await;
        assert!(stopped.unwrap().is_ok());
        assert_eq!(provider.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn run_with_saved_snapshot() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tier":"free","dailyUsed":1,"dailyLimit":3,"dailyResetAt":"2099-01-01T00:00:00Z",
               "monthlyUsed":8,"monthlyLimit":10,"monthlyResetAt":"2099-01-01T00:00:00Z"}}"#
        )
        .unwrap();

        let args = StatusArgs {
            snapshot: Some(file.path().to_path_buf()),
            ..StatusArgs::default()
        };
        let opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
        };
        run(args, &AppConfig::default(), &opts).await.unwrap();
    }
}
