// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crosspost - pre-approved social publishing on a schedule.
//!
//! Binary entry point: CLI for campaign management, the worker loop, and
//! the combined serve mode (worker plus Telegram control plane).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use crosspost_config::CrosspostConfig;
use crosspost_connectors::RestConnector;
use crosspost_control::ControlPlane;
use crosspost_core::{
    ChatMessageId, ChatTransport, CrosspostError, Platform, PlatformConnector, RolloutStage,
};
use crosspost_scheduler::{ApprovalOutcome, Scheduler, interlocks, reports};
use crosspost_storage::Database;
use crosspost_storage::queries::posts;
use crosspost_telegram::TelegramNotifier;
use crosspost_vault::TokenVault;
use crosspost_worker::Runner;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LINKEDIN_TOKEN: &str = "linkedin_access_token";
const X_TOKEN: &str = "x_access_token";

/// Crosspost - pre-approved social publishing on a schedule.
#[derive(Parser, Debug)]
#[command(name = "crosspost", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a campaign from a markdown source document.
    Create {
        source_path: String,
        /// Audience UTC offset in minutes (defaults to config).
        #[arg(long)]
        offset_minutes: Option<i32>,
    },
    /// List the posts of a campaign.
    Posts { campaign_id: String },
    /// Replace a post's content from a file (or stdin with -).
    Edit { post_id: String, file: String },
    /// Compute and store the timing recommendation for a campaign.
    Analyze { campaign_id: String },
    /// Approve a campaign's posts for publishing.
    Approve { campaign_id: String },
    /// Schedule a campaign at an explicit RFC 3339 time.
    Schedule { campaign_id: String, at: String },
    /// Cancel a post.
    Cancel { post_id: String },
    /// Re-queue a failed post.
    Retry { post_id: String },
    /// Show scheduler and interlock status.
    Status,
    /// Run (or show) the daily health gate.
    Health,
    /// Engage or release the global kill switch.
    Kill { state: SwitchState },
    /// Show or set the rollout stage.
    Rollout { stage: Option<String> },
    /// Print a digest report.
    Digest {
        #[arg(long)]
        weekly: bool,
    },
    /// Run the publish worker.
    Worker {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },
    /// Run the worker and the Telegram control plane together.
    Serve,
    /// Store a platform token in the vault (value read from stdin).
    TokenSet { name: String },
    /// List vault tokens (masked).
    TokenList,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SwitchState {
    On,
    Off,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match crosspost_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            crosspost_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.scheduler.log_level.clone())),
        )
        .init();
    if let Err(e) = run(cli.command, config).await {
        eprintln!("crosspost: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: CrosspostConfig) -> Result<(), CrosspostError> {
    let db = Database::open(&config.storage.database_path).await?;
    let offset = config.timing.audience_utc_offset_minutes;
    let scheduler = Scheduler::new(db.clone(), offset);
    let now = Utc::now();

    match command {
        Commands::Create {
            source_path,
            offset_minutes,
        } => {
            let (campaign, drafted) =
                scheduler.create_campaign(&source_path, offset_minutes).await?;
            println!("campaign {}", campaign.id);
            for post in drafted {
                println!("  {} {}", post.platform, post.id);
            }
        }
        Commands::Posts { campaign_id } => {
            for post in posts::list_posts_for_campaign(&db, &campaign_id).await? {
                println!(
                    "{} {} [{}]{}",
                    post.platform,
                    post.id,
                    post.state,
                    post.scheduled_for_utc
                        .map(|t| format!(" at {}", t.format("%Y-%m-%d %H:%M UTC")))
                        .unwrap_or_default(),
                );
            }
        }
        Commands::Edit { post_id, file } => {
            let content = if file == "-" {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).map_err(|e| {
                    CrosspostError::validation(format!("cannot read stdin: {e}"))
                })?;
                buf
            } else {
                tokio::fs::read_to_string(&file).await.map_err(|e| {
                    CrosspostError::validation(format!("cannot read {file}: {e}"))
                })?
            };
            let post = scheduler.edit_post(&post_id, content.trim_end()).await?;
            println!("post {} updated ({})", post.id, post.state);
        }
        Commands::Analyze { campaign_id } => {
            let rec = scheduler.analyze_optimal_time(&campaign_id, None, now).await?;
            println!(
                "recommended {} (confidence {:.2}{})",
                rec.recommended_time_utc.format("%Y-%m-%d %H:%M UTC"),
                rec.confidence,
                if rec.fallback_used { ", fallback" } else { "" },
            );
            println!("{}", rec.reasoning_summary);
        }
        Commands::Approve { campaign_id } => {
            match scheduler.approve_campaign(&campaign_id, None, now).await? {
                ApprovalOutcome::Scheduled { recommendation } => println!(
                    "approved and scheduled for {}",
                    recommendation.recommended_time_utc.format("%Y-%m-%d %H:%M UTC"),
                ),
                ApprovalOutcome::HeldForConfirmation { request, .. } => {
                    println!("approved, awaiting confirmation: {}", request.message)
                }
            }
        }
        Commands::Schedule { campaign_id, at } => {
            let at = at
                .parse::<DateTime<Utc>>()
                .map_err(|e| CrosspostError::validation(format!("invalid time {at:?}: {e}")))?;
            scheduler.schedule_campaign(&campaign_id, at, now).await?;
            println!("scheduled for {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
        Commands::Cancel { post_id } => {
            let post = scheduler.cancel_post(&post_id).await?;
            println!("post {} canceled", post.id);
        }
        Commands::Retry { post_id } => {
            let post = scheduler.retry_failed_post(&post_id, now).await?;
            println!("post {} re-queued", post.id);
        }
        Commands::Status => {
            let kill = interlocks::kill_switch_on(&db).await?;
            let stage = interlocks::rollout_stage(&db).await?;
            let heartbeat = interlocks::heartbeat_fresh(&db, now).await?;
            println!("kill switch: {}", if kill { "ON" } else { "off" });
            println!("rollout stage: {stage}");
            println!("worker heartbeat: {}", if heartbeat { "fresh" } else { "stale" });
            for state in [
                crosspost_core::PostState::Scheduled,
                crosspost_core::PostState::PendingManual,
                crosspost_core::PostState::Failed,
            ] {
                let in_state = posts::list_posts_in_state(&db, state).await?;
                if !in_state.is_empty() {
                    println!("{state}: {}", in_state.len());
                }
            }
        }
        Commands::Health => {
            let vault = TokenVault::open(&config.vault)?;
            let tokens_present = tokens_present(&vault).await?;
            let cycle = interlocks::gate_cycle_date(now, offset);
            let status = interlocks::run_health_check(&db, tokens_present, now, &cycle).await?;
            println!("health gate {} for {cycle}", status.overall_status);
            println!("  tokens: {}", status.token_status);
            println!("  worker: {}", status.worker_status);
            println!("  kill switch: {}", status.kill_switch_status);
            println!("  failures: {}", status.critical_failure_status);
        }
        Commands::Kill { state } => {
            let on = matches!(state, SwitchState::On);
            let reconfirmations = interlocks::set_kill_switch(&db, on, now).await?;
            if on {
                println!("kill switch engaged");
            } else {
                println!(
                    "kill switch released; {} post(s) parked for reconfirmation",
                    reconfirmations.len()
                );
            }
        }
        Commands::Rollout { stage } => match stage {
            None => println!("rollout stage: {}", interlocks::rollout_stage(&db).await?),
            Some(value) => {
                let stage = value.parse::<RolloutStage>().map_err(|_| {
                    CrosspostError::validation(format!(
                        "unknown stage {value}; expected dry_run_only, linkedin_live, or all_live"
                    ))
                })?;
                interlocks::set_rollout_stage(&db, stage, now).await?;
                println!("rollout stage set to {stage}");
            }
        },
        Commands::Digest { weekly } => {
            let kind = if weekly {
                reports::DigestKind::Weekly
            } else {
                reports::DigestKind::Evening
            };
            println!("{}", reports::build_digest(&db, kind, now).await?);
        }
        Commands::Worker { once } => {
            let runner = build_runner(&config, scheduler).await?;
            if once {
                runner.run_once(Utc::now()).await?;
            } else {
                runner
                    .run_forever(std::time::Duration::from_secs(
                        config.scheduler.poll_interval_seconds,
                    ))
                    .await;
            }
        }
        Commands::Serve => {
            let notifier = TelegramNotifier::new(&config.telegram)?;
            let allowed_user_id = config
                .telegram
                .allowed_user_id
                .clone()
                .unwrap_or_default();
            let plane = ControlPlane::new(scheduler.clone(), allowed_user_id.clone(), offset);
            let runner =
                build_runner_with_transport(&config, scheduler, Arc::new(notifier.clone()))
                    .await?;
            let poll = std::time::Duration::from_secs(config.scheduler.poll_interval_seconds);
            info!("serving worker and Telegram control plane");
            tokio::join!(
                runner.run_forever(poll),
                crosspost_telegram::run_control_loop(
                    notifier.bot().clone(),
                    plane,
                    allowed_user_id,
                ),
            );
        }
        Commands::TokenSet { name } => {
            let vault = TokenVault::open(&config.vault)?;
            eprintln!("paste token value and press enter:");
            let mut value = String::new();
            std::io::BufRead::read_line(&mut std::io::stdin().lock(), &mut value)
                .map_err(|e| CrosspostError::validation(format!("cannot read stdin: {e}")))?;
            vault.set_token(&name, value.trim()).await?;
            println!("token {name} stored");
        }
        Commands::TokenList => {
            let vault = TokenVault::open(&config.vault)?;
            for (name, masked) in vault.list_tokens().await? {
                println!("{name} {masked}");
            }
        }
    }
    Ok(())
}

async fn tokens_present(vault: &TokenVault) -> Result<bool, CrosspostError> {
    Ok(vault.get_token(LINKEDIN_TOKEN).await?.is_some()
        && vault.get_token(X_TOKEN).await?.is_some())
}

async fn build_runner(
    config: &CrosspostConfig,
    scheduler: Scheduler,
) -> Result<Runner, CrosspostError> {
    let transport: Arc<dyn ChatTransport> = match TelegramNotifier::new(&config.telegram) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!(error = %e, "Telegram not configured, alerts go to the log only");
            Arc::new(LogTransport)
        }
    };
    build_runner_with_transport(config, scheduler, transport).await
}

async fn build_runner_with_transport(
    config: &CrosspostConfig,
    scheduler: Scheduler,
    transport: Arc<dyn ChatTransport>,
) -> Result<Runner, CrosspostError> {
    let vault = TokenVault::open(&config.vault)?;
    let timeout = std::time::Duration::from_secs(config.scheduler.connector_timeout_seconds);

    let mut connectors: HashMap<Platform, Arc<dyn PlatformConnector>> = HashMap::new();
    connectors.insert(
        Platform::Linkedin,
        Arc::new(RestConnector::new(
            Platform::Linkedin,
            &config.linkedin,
            vault.get_token(LINKEDIN_TOKEN).await?,
            timeout,
        )?),
    );
    connectors.insert(
        Platform::X,
        Arc::new(RestConnector::new(
            Platform::X,
            &config.x,
            vault.get_token(X_TOKEN).await?,
            timeout,
        )?),
    );

    let tokens_present = tokens_present(&vault).await?;
    Ok(Runner::new(
        scheduler,
        connectors,
        transport,
        config.timing.audience_utc_offset_minutes,
        config.scheduler.dry_run,
        // The worker grants the connector slightly more than its own HTTP
        // timeout before declaring the attempt ambiguous.
        timeout + std::time::Duration::from_secs(5),
        tokens_present,
    ))
}

/// Fallback transport when Telegram is not configured: alerts land in the
/// log, and the outage fail-safe treats the channel as up so a dry-run
/// setup without a bot does not pause itself.
struct LogTransport;

#[async_trait::async_trait]
impl ChatTransport for LogTransport {
    async fn send_alert(&self, text: &str, critical: bool) -> Result<ChatMessageId, CrosspostError> {
        if critical {
            warn!(alert = text, "operator alert (no chat transport)");
        } else {
            info!(alert = text, "operator alert (no chat transport)");
        }
        Ok(ChatMessageId("log".into()))
    }

    async fn send_decision_card(
        &self,
        request_id: &str,
        message: &str,
    ) -> Result<ChatMessageId, CrosspostError> {
        warn!(request_id, message, "decision request (no chat transport)");
        Ok(ChatMessageId("log".into()))
    }

    async fn healthy(&self) -> bool {
        true
    }
}
