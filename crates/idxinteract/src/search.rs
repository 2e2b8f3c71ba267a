//! Search entry points that hide the driver wiring.

use std::path::Path;

use tokio::sync::mpsc;

use idxinteract_config::{ConfigError, InteractionConfig};
use idxinteract_core::{Result, Workload};
use idxinteract_search::{InteractingPair, PairSearchDriver, PairSearchOutcome};

/// Configuration file read by [`run_search`].
const CONFIG_FILE: &str = "interaction.toml";

/// Finds every interacting pair in `workload` on the built-in solver.
pub fn find_interactions(workload: &Workload, config: &InteractionConfig) -> Result<PairSearchOutcome> {
    PairSearchDriver::new(config.clone()).search(workload)
}

/// Like [`find_interactions`], streaming each confirmed pair through `sender`.
pub fn find_interactions_with_channel(
    workload: &Workload,
    config: &InteractionConfig,
    sender: mpsc::UnboundedSender<InteractingPair>,
) -> Result<PairSearchOutcome> {
    PairSearchDriver::new(config.clone()).search_with_channel(workload, sender)
}

/// Runs the search with `interaction.toml` from the working directory, or
/// the defaults when that file does not exist.
pub fn run_search(workload: &Workload) -> Result<PairSearchOutcome> {
    let config = load_or_default(CONFIG_FILE)?;
    find_interactions(workload, &config)
}

fn load_or_default(path: impl AsRef<Path>) -> std::result::Result<InteractionConfig, ConfigError> {
    match InteractionConfig::load(path) {
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok(InteractionConfig::default())
        }
        other => other,
    }
}
