pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod events;
pub mod ledger;
pub mod models;
pub mod quiz;
pub mod quotes;
pub mod rewards;
pub mod state;

use anyhow::{Context, Result};
use config::Config;
use db::Store;
use state::AcademyState;

/// Open the configured database and load the configured user's state
pub fn open_state(config: &Config) -> Result<AcademyState> {
    let store = Store::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    let state = AcademyState::load(
        store,
        &config.user_id,
        config.starting_balance,
        catalog::stocks().to_vec(),
    )
    .context("Failed to load academy state")?;

    Ok(state)
}
