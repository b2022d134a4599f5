// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-side pull hook.
//!
//! Invoked by the agent runtime on its hook events. Prints at most one
//! message as a JSON record; empty output means "no message; agent set
//! ready". The previously pulled message is acked before a new one is
//! returned.

use super::open_store;
use crate::exit_error::ExitError;
use clap::Args;
use gaffer_core::{AgentId, SystemClock};
use gaffer_engine::{EngineError, MessageBus, PullMode};

#[derive(Args)]
pub struct PullArgs {
    /// Agent target in session:window form
    #[arg(long)]
    pub agent: String,

    /// Session-start bootstrap: fetch the highest-priority waiting message
    #[arg(long, conflicts_with_all = ["rebrief", "check_idle", "session_end"])]
    pub bootstrap: bool,

    /// Context compaction: enqueue a rebriefing to self, then pull it
    #[arg(long, conflicts_with_all = ["bootstrap", "check_idle", "session_end"])]
    pub rebrief: bool,

    /// Idle probe: pull one message, flag ready when empty
    #[arg(long = "check-idle", conflicts_with_all = ["bootstrap", "rebrief", "session_end"])]
    pub check_idle: bool,

    /// Session end: ack in-flight and take the agent off the bus
    #[arg(long = "session-end")]
    pub session_end: bool,

    /// With --session-end: the session ended uncleanly
    #[arg(long, requires = "session_end")]
    pub unclean: bool,

    /// Error notification from the agent runtime
    #[arg(long)]
    pub error: Option<String>,

    /// Project this agent belongs to (recorded on first contact)
    #[arg(long)]
    pub project: Option<String>,
}

pub fn run(args: PullArgs) -> Result<(), ExitError> {
    let agent = AgentId::parse(&args.agent)
        .map_err(|e| ExitError::new(2, e.to_string()))?;

    let (config, store) = open_store()?;
    let bus = MessageBus::new(store, SystemClock, config.bus_config());

    if let Some(error) = &args.error {
        bus.error_hook(&agent, error)?;
        return Ok(());
    }

    if args.session_end {
        bus.session_end(&agent, !args.unclean)?;
        return Ok(());
    }

    let mode = if args.bootstrap {
        PullMode::Bootstrap
    } else if args.rebrief {
        PullMode::Rebrief
    } else if args.check_idle {
        PullMode::CheckIdle
    } else {
        PullMode::Normal
    };

    match bus.pull(&agent, mode, args.project.as_deref()) {
        Ok(Some(delivery)) => {
            let record = serde_json::to_string(&delivery)
                .map_err(|e| ExitError::new(4, e.to_string()))?;
            println!("{record}");
            Ok(())
        }
        // Empty output: no message, set ready
        Ok(None) => Ok(()),
        // Budget engaged: the message stays pending, nothing delivered
        Err(EngineError::BudgetExceeded(_)) => Ok(()),
        Err(EngineError::AgentUnknown(agent)) => {
            Err(ExitError::new(1, format!("agent unknown: {agent}")))
        }
        Err(e) => Err(e.into()),
    }
}
