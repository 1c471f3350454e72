pub mod audit;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod http_client;
pub mod keywords;
pub mod models;
pub mod monitor;
pub mod reporter;
pub mod scheduler;
pub mod seo_analyzer;
pub mod tag_generator;
pub mod text;

use anyhow::{Context, Result};
use audit::Auditor;
use cli::Cli;
use colored::*;
use http_client::HttpFetcher;
use models::{AuditResult, MonitorEvent, SchedulerEvent};
use monitor::{ContentMonitor, MonitorOptions};
use reporter::Reporter;
use scheduler::{FileStore, HISTORY_KEY, Scheduler, SchedulerOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Cli) -> Result<()> {
    // Validate URL
    if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
        anyhow::bail!("URL must start with http:// or https://");
    }

    let timeout = Duration::from_secs(args.timeout);
    let mut fetcher = HttpFetcher::new(timeout)?;
    if let Some(rps) = args.rate_limit {
        fetcher = fetcher.with_rate_limit(rps);
    }
    let fetcher = Arc::new(fetcher);

    match args.mode.as_str() {
        "audit" => run_audit(&args, fetcher.as_ref(), timeout).await,
        "monitor" => run_monitor(&args, fetcher, timeout).await,
        "schedule" => run_schedule(&args, fetcher, timeout).await,
        other => anyhow::bail!("Unknown mode '{}': expected audit, monitor or schedule", other),
    }
}

async fn run_audit(args: &Cli, fetcher: &HttpFetcher, timeout: Duration) -> Result<()> {
    if args.output != "json" {
        eprintln!("{} {}", "Auditing:".bright_white().bold(), args.url);
    }

    let result = Auditor::audit_url(fetcher, &args.url, timeout)
        .await
        .with_context(|| format!("Failed to audit {}", args.url))?;

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => Reporter::print_audit(&result),
    }

    if let Some(filename) = &args.save {
        save_audit(&result, filename)?;
    }

    Ok(())
}

/// `.txt` files get the plain-text export, everything else JSON
fn save_audit(result: &AuditResult, filename: &str) -> Result<()> {
    let is_text = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if is_text {
        Reporter::save_text_report(result, filename)
    } else {
        Reporter::save_json_report(result, filename)
    }
}

async fn run_monitor(args: &Cli, fetcher: Arc<HttpFetcher>, timeout: Duration) -> Result<()> {
    let (mut monitor, mut events) = ContentMonitor::new(
        fetcher,
        MonitorOptions {
            fetch_timeout: timeout,
        },
    );
    monitor.start(&args.url, Duration::from_secs(args.interval))?;

    if args.output != "json" {
        eprintln!(
            "{} {} every {}s (Ctrl+C to stop)",
            "Watching:".bright_white().bold(),
            args.url,
            args.interval
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cycles = 0u64;
    let mut last_audit: Option<AuditResult> = None;

    loop {
        let event = tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if args.output == "json" {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_monitor_event(&event);
        }

        match event {
            MonitorEvent::Changed { audit, .. } => {
                last_audit = Some(*audit);
                cycles += 1;
            }
            MonitorEvent::Stopped { .. } => break,
            _ => cycles += 1,
        }

        if args.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }
    }

    monitor.stop();

    if let (Some(filename), Some(result)) = (&args.save, &last_audit) {
        save_audit(result, filename)?;
    }

    Ok(())
}

fn print_monitor_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::BaselineEstablished { url, hash } => {
            println!("{} {} ({})", "Baseline:".bright_cyan().bold(), url, hash);
        }
        MonitorEvent::NoChange { checked_at, .. } => {
            println!(
                "{} {}",
                checked_at.format("%H:%M:%S").to_string().dimmed(),
                "no change".dimmed()
            );
        }
        MonitorEvent::Changed {
            diffs, checked_at, ..
        } => {
            println!(
                "{} {} {} field(s) changed",
                checked_at.format("%H:%M:%S"),
                "Changed:".bright_yellow().bold(),
                diffs.len()
            );
            for diff in diffs {
                println!(
                    "    {}: {} {} {}",
                    diff.field.bright_white(),
                    diff.before,
                    "->".bright_green(),
                    diff.after
                );
            }
        }
        MonitorEvent::Error { message, .. } => {
            eprintln!("{} {}", "Check failed:".bright_red().bold(), message);
        }
        MonitorEvent::Stopped { url } => {
            eprintln!("{} {}", "Stopped watching".bright_white(), url);
        }
    }
}

async fn run_schedule(args: &Cli, fetcher: Arc<HttpFetcher>, timeout: Duration) -> Result<()> {
    let store = match args.history_file.as_deref() {
        Some(file) => FileStore::new(FileStore::default_dir()).pin(HISTORY_KEY, file),
        None => FileStore::new(FileStore::default_dir()),
    };

    let (mut scheduler, mut events) = Scheduler::new(
        fetcher,
        Arc::new(store),
        SchedulerOptions {
            fetch_timeout: timeout,
            ..SchedulerOptions::default()
        },
    );
    scheduler.start(&args.url, Duration::from_secs(args.interval))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut runs = 0u64;

    loop {
        let event = tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if args.output == "json" {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            SchedulerEvent::RunStarted { url } => {
                if args.output != "json" {
                    eprintln!("{} {}", "Auditing site:".bright_white().bold(), url);
                }
            }
            SchedulerEvent::Completed(entry) => {
                if args.output != "json" {
                    Reporter::print_run_entry(&entry);
                }
                runs += 1;
            }
            SchedulerEvent::Scheduled { next_run_at } => {
                if args.output != "json" {
                    eprintln!(
                        "{} {}",
                        "Next run at".dimmed(),
                        next_run_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            SchedulerEvent::Error { url, message } => {
                eprintln!(
                    "{} {}: {}",
                    "Run failed:".bright_red().bold(),
                    url,
                    message
                );
                runs += 1;
            }
            SchedulerEvent::Stopped => break,
        }

        if args.max_cycles.is_some_and(|max| runs >= max) {
            break;
        }
    }

    scheduler.stop();

    if let Some(filename) = &args.save {
        Reporter::save_json_report(&scheduler.history(), filename)?;
    }

    Ok(())
}
