//! Headless academy runner: polls prices for the market list, records a
//! portfolio snapshot into the history on every tick and prints it until
//! interrupted.

use anyhow::Result;
use app_lib::commands::quiz::{get_quiz_statuses, sync_points};
use app_lib::config::Config;
use app_lib::quotes::{spawn_price_poller, ProxyQuoteClient};
use app_lib::rewards::PointsClient;
use app_lib::{catalog, open_state};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let mut state = open_state(&config)?;
    let today = chrono::Local::now().date_naive();

    for status in get_quiz_statuses(&state, catalog::quizzes(), today)? {
        println!(
            "Quiz {:<28} {:>3} pts  {}",
            status.title,
            status.max_points,
            if status.completed_today { "done today" } else { "open" }
        );
    }

    if let Some(url) = &config.points_url {
        let client = PointsClient::new(url, config.api_key.as_deref())?;
        let report = sync_points(&state, &client).await?;
        println!("Points sync: {} sent, {} failed", report.sent, report.failed);
    }

    let poller = match &config.quote_proxy_url {
        Some(url) => {
            let source = Arc::new(ProxyQuoteClient::new(url, config.api_key.as_deref())?);
            state.watch_market();
            Some(spawn_price_poller(source, state.prices().clone(), config.poll_interval))
        }
        None => {
            log::warn!("ACADEMY_QUOTE_PROXY_URL not set, valuing with reference prices only");
            None
        }
    };

    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = state.record_snapshot();
                if let Err(e) = state.save() {
                    log::error!("Failed to save snapshot: {}", e);
                }
                println!(
                    "{}  cash {:>12.2}  holdings {:>12.2}  total {:>12.2}  P/L {:>+10.2}",
                    snapshot.timestamp.format("%H:%M:%S"),
                    snapshot.cash,
                    snapshot.holdings_value,
                    snapshot.total_value,
                    snapshot.unrealized_pnl
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(poller) = poller {
        poller.stop();
    }
    state.save()?;
    log::info!("Saved state for {}", state.user_id());

    Ok(())
}
