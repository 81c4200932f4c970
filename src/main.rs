//! Headless driver: runs a feed session against the configured backends and
//! logs what each cycle produced. The real presentation layer consumes the
//! same surface; this binary exists to exercise it end to end.

use anyhow::Result;
use atelier_feed::config::Config;
use atelier_feed::error::FeedError;
use atelier_feed::session::{FeedSession, LoadOutcome};
use atelier_feed::social::{NullEngagementIndex, StaticFollowGraph};
use atelier_feed::source::discover::DiscoverApi;
use atelier_feed::source::portfolio::PortfolioApi;
use atelier_feed::source::ItemSource;
use atelier_feed::feed::types::FilterConfig;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const MAX_CYCLES: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load_or_default(Path::new("config.toml"))?;

    let sources: Vec<Box<dyn ItemSource>> = vec![
        Box::new(PortfolioApi::new(
            &config.sources.portfolio.base_url,
            config.sources.portfolio.request_timeout_ms,
        )?),
        Box::new(DiscoverApi::new(
            &config.sources.discover.base_url,
            config.sources.discover.request_timeout_ms,
        )?),
    ];

    let follow_graph = StaticFollowGraph::new(config.social.followed_authors.clone());
    let mut session = FeedSession::new(
        &config,
        sources,
        Box::new(follow_graph),
        Box::new(NullEngagementIndex),
    );

    let filters = FilterConfig {
        portfolio_only: true,
        tags: Vec::new(),
    };

    match session.load_initial(filters).await {
        Ok(outcome) => report(&mut session, outcome),
        Err(FeedError::PageUnavailable) => {
            tracing::error!("initial load failed on every source; nothing to show");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    for cycle in 1..=MAX_CYCLES {
        tokio::time::sleep(Duration::from_millis(700)).await;

        match session.load_more().await {
            Ok(LoadOutcome::Exhausted) => {
                tracing::info!(cycle, "feed exhausted");
                break;
            }
            Ok(outcome) => report(&mut session, outcome),
            Err(e) => {
                tracing::warn!(cycle, error = %e, "load failed, retrying next cycle");
            }
        }

        if let Some(notice) = session.take_stuck_notice() {
            tracing::warn!(notice = %notice, "recoverable load notice");
        }
        session.poll(Instant::now());
    }

    let ready = session.is_ready(Instant::now());
    let state = session.current_layout();
    tracing::info!(
        items = state.ordered_items.len(),
        slots = state.slots.len(),
        ready,
        "session finished"
    );

    Ok(())
}

fn report(session: &mut FeedSession, outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::Loaded {
            appended,
            total,
            mode,
        } => {
            tracing::info!(appended, total, mode = ?mode, "page loaded");
        }
        other => tracing::info!(outcome = ?other, "load trigger"),
    }
    session.poll(Instant::now());
}
