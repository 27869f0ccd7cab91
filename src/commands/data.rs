//! Panel loading for the CLI: CSV files or synthetic data.

use crate::cli::DataSourceConfig;
use crate::error::StatArbError;
use crate::panel::PricePanel;
use std::collections::BTreeMap;
use tracing::info;

/// Load the price panel named by the CLI configuration.
pub fn load_panel(config: &DataSourceConfig) -> Result<PricePanel, StatArbError> {
    match &config.data {
        Some(path) => {
            info!(path = %path.display(), "Loading CSV data");
            PricePanel::from_csv_path(path)
        }
        None => generate_synthetic_panel(&config.symbols, config.bars),
    }
}

/// Generate a synthetic panel for CI and demos.
///
/// Even-indexed symbols are independent random walks; each odd-indexed
/// symbol tracks its predecessor with small mean-reverting noise, so the
/// universe always contains cointegrated pairs for the scanner to find.
pub fn generate_synthetic_panel(
    symbols: &[String],
    bars: usize,
) -> Result<PricePanel, StatArbError> {
    info!(symbols = symbols.len(), bars, "Generating synthetic data");

    let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut previous: Option<Vec<f64>> = None;

    for (index, symbol) in symbols.iter().enumerate() {
        let prices = if index % 2 == 1 {
            // Follower leg: half the predecessor plus AR(1) noise.
            let anchor = previous.clone().unwrap_or_default();
            let mut noise_state = lcg_seed(symbol);
            let mut noise = 0.0;
            anchor
                .iter()
                .map(|&p| {
                    noise = 0.6 * noise + 0.2 * lcg_uniform(&mut noise_state);
                    (0.5 * p + noise).max(1.0)
                })
                .collect()
        } else {
            random_walk(symbol, bars)
        };
        previous = Some(prices.clone());
        series.insert(symbol.clone(), prices);
    }

    PricePanel::new((0..bars as i64).collect(), series)
}

/// Reproducible multiplicative random walk, seeded by the symbol name.
fn random_walk(symbol: &str, bars: usize) -> Vec<f64> {
    let mut state = lcg_seed(symbol);
    let mut price = 100.0_f64;
    let mut prices = Vec::with_capacity(bars);
    for _ in 0..bars {
        let drift = 0.0001;
        let volatility = 0.02;
        price *= 1.0 + drift + volatility * lcg_uniform(&mut state);
        price = price.max(1.0);
        prices.push(price);
    }
    prices
}

fn lcg_seed(symbol: &str) -> u64 {
    symbol.bytes().map(|b| b as u64).sum::<u64>().wrapping_add(1)
}

/// Uniform step in [-0.5, 0.5) from a simple LCG.
fn lcg_uniform(state: &mut u64) -> f64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    ((*state >> 33) as f64) / (u32::MAX as f64) - 0.5
}
