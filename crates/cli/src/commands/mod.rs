// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations.

pub mod daemon;
pub mod project;
pub mod pull;
pub mod recovery;

use crate::exit_error::ExitError;
use gaffer_daemon::DaemonConfig;
use gaffer_store::Store;

/// Load the shared config and open the store.
pub fn open_store() -> Result<(DaemonConfig, Store), ExitError> {
    let config = DaemonConfig::load()?;
    let store = Store::open(&config.db_path)?;
    Ok((config, store))
}
