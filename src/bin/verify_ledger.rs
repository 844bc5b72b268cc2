//! Print a user's persisted ledger, balance and pending point increments

use anyhow::Result;
use app_lib::config::Config;
use app_lib::rewards;
use app_lib::open_state;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    println!("Opening database: {:?}", config.db_path);
    let state = open_state(&config)?;
    let ledger = state.ledger();

    println!("\n=== {} ===", state.user_id());
    println!("Balance: {:.2}", state.balance().balance());

    println!("\nHoldings ({}):", ledger.holdings().len());
    for h in ledger.holdings() {
        println!(
            "  {:<8} {:>6} @ {:>10.2}  cost {:>12.2}",
            h.symbol,
            h.quantity,
            h.avg_buy_price,
            h.cost_basis()
        );
    }

    let snapshot = state.valuation();
    println!(
        "\nValue at reference prices: {:.2} (unrealized {:+.2})",
        snapshot.total_value, snapshot.unrealized_pnl
    );

    println!("\nRecent trades ({}):", ledger.trades().len());
    for t in ledger.trades().iter().take(10) {
        println!(
            "  {}  {:?} {:>6} {:<8} @ {:>10.2}",
            t.timestamp.format("%Y-%m-%d %H:%M"),
            t.trade_type,
            t.quantity,
            t.symbol,
            t.price
        );
    }

    if let (Some(first), Some(last)) = (ledger.history().first(), ledger.history().last()) {
        println!(
            "\nHistory: {} points, {:.2} -> {:.2}",
            ledger.history().len(),
            first.total_value,
            last.total_value
        );
    }

    let pending = rewards::pending(state.store(), state.user_id())?;
    println!("\nPending point increments: {}", pending.len());
    for entry in &pending {
        println!(
            "  {:>5} pts  {}  attempts {}{}",
            entry.amount,
            entry.reason,
            entry.attempts,
            entry
                .last_error
                .as_deref()
                .map(|e| format!("  last error: {}", e))
                .unwrap_or_default()
        );
    }

    Ok(())
}
