use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio::sync::mpsc;

use keyshelf_core::{Listing, SiteProfile};
use keyshelf_lib::async_util::run_with_events;
use keyshelf_lib::{Session, SessionEvent, Settings, StatsCounters};

use crate::error::CliError;

pub(crate) struct ScanOptions {
    pub listings: PathBuf,
    pub site: SiteProfile,
    pub report: Option<PathBuf>,
    pub min_interval_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub quiet: bool,
}

/// Run the scan command.
pub(crate) fn run_scan(options: ScanOptions) -> Result<(), CliError> {
    let contents = fs::read_to_string(&options.listings)?;
    let listings: Vec<Listing> = serde_json::from_str(&contents)?;

    let mut settings = Settings::load()?;
    if let Some(ms) = options.min_interval_ms {
        settings.scheduler.min_interval_ms = ms;
    }
    if let Some(n) = options.concurrency {
        settings.scheduler.concurrency = n;
    }
    let cache = super::open_cache(&settings)?;
    let steam = Arc::new(super::steam_client(&settings)?);

    log::info!(
        "Scanning {} listings from {}",
        listings.len(),
        options.site.if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!(
        "{}",
        format!(
            "Request spacing: {} ms, concurrency: {}",
            settings.scheduler.min_interval_ms, settings.scheduler.concurrency
        )
        .if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("");

    let rt = super::runtime()?;
    let stats = rt.block_on(async {
        let session = Session::new(options.site, steam, cache, settings.session_config());
        let pb = progress_bar(listings.len() as u64, options.quiet);
        let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();

        let stats = run_with_events(session.process_all(listings, event_tx), event_rx, |e| {
            handle_event(&pb, e)
        })
        .await;
        pb.finish_and_clear();

        if let Some(path) = &options.report {
            session.write_report(path)?;
            log::info!(
                "Report written to {}",
                path.display().if_supports_color(Stdout, |t| t.cyan()),
            );
        }
        Ok::<StatsCounters, CliError>(stats)
    })?;

    print_summary(&stats);
    Ok(())
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    if let Ok(style) =
        ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn handle_event(pb: &ProgressBar, event: SessionEvent) {
    match event {
        SessionEvent::Started { title, .. } => pb.set_message(title),
        SessionEvent::Resolved {
            title,
            identity,
            method,
            ..
        } => {
            log::debug!("\"{}\" -> {} via {}", title, identity, method);
        }
        SessionEvent::Completed {
            title,
            record,
            search_hit,
            ..
        } => {
            pb.inc(1);
            pb.suspend(|| {
                log::info!(
                    "  {} {}",
                    title.if_supports_color(Stdout, |t| t.bold()),
                    super::format_record(&record, search_hit.as_ref()),
                );
            });
        }
        SessionEvent::NoData { title, reason, .. } => {
            pb.inc(1);
            pb.suspend(|| {
                log::info!(
                    "  {} {}",
                    title.if_supports_color(Stdout, |t| t.bold()),
                    format!("[no data: {}]", reason).if_supports_color(Stdout, |t| t.dimmed()),
                );
            });
        }
        SessionEvent::Halted { message } => {
            pb.suspend(|| {
                log::warn!(
                    "{} {}",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                    message,
                );
            });
        }
        SessionEvent::Done { .. } => {}
    }
}

fn print_summary(stats: &StatsCounters) {
    log::info!("");
    log::info!("{}", "Summary".if_supports_color(Stdout, |t| t.bold()));
    log::info!("  Listings:   {}", stats.total);
    log::info!(
        "  Owned:      {}",
        stats.owned.if_supports_color(Stdout, |t| t.green())
    );
    log::info!(
        "  Wishlisted: {}",
        stats.wishlisted.if_supports_color(Stdout, |t| t.cyan())
    );
    log::info!("  Ignored:    {}", stats.ignored);
    log::info!(
        "  Missing:    {}",
        stats.missing.if_supports_color(Stdout, |t| t.yellow())
    );
    log::info!(
        "  No data:    {}",
        stats.no_data.if_supports_color(Stdout, |t| t.dimmed())
    );
}
