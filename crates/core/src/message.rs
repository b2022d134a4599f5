// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-queue row, delivery states, and priority bands.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

/// Row identifier in the message queue.
pub type MessageId = i64;

/// Priority reserved for re-briefing messages after context compaction.
pub const REBRIEF_PRIORITY: u8 = 200;

/// Delivery state of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Waiting for a pull
    Pending,
    /// Handed to the agent; acked implicitly by the next successful pull
    Pulled,
    /// Acked
    Delivered,
    /// Aged out without delivery
    Expired,
}

impl MessageStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "pulled" => Some(Self::Pulled),
            "delivered" => Some(Self::Delivered),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

crate::simple_display! {
    MessageStatus {
        Pending => "pending",
        Pulled => "pulled",
        Delivered => "delivered",
        Expired => "expired",
    }
}

/// Scope within which FIFO ordering is promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FifoScope {
    #[default]
    Agent,
    Project,
    Global,
}

impl FifoScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(Self::Agent),
            "project" => Some(Self::Project),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

crate::simple_display! {
    FifoScope {
        Agent => "agent",
        Project => "project",
        Global => "global",
    }
}

/// Priority band convention. Higher bands are delivered first; critical
/// and above bypass the per-agent rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityBand {
    /// 0–9
    Normal,
    /// 10–49
    High,
    /// 50–99
    Critical,
    /// 100+ (200 reserved for re-briefing)
    Emergency,
}

impl PriorityBand {
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            0..=9 => Self::Normal,
            10..=49 => Self::High,
            50..=99 => Self::Critical,
            _ => Self::Emergency,
        }
    }

    /// Critical and emergency messages skip the leaky bucket.
    pub fn bypasses_rate_limit(&self) -> bool {
        matches!(self, Self::Critical | Self::Emergency)
    }
}

crate::simple_display! {
    PriorityBand {
        Normal => "normal",
        High => "high",
        Critical => "critical",
        Emergency => "emergency",
    }
}

/// A durable message addressed to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub agent_session: AgentId,
    pub project_name: Option<String>,
    pub payload: Vec<u8>,
    pub priority: u8,
    /// Monotonically increasing across all messages, assigned atomically.
    pub sequence_number: i64,
    pub dependency_id: Option<MessageId>,
    pub status: MessageStatus,
    pub enqueued_at: i64,
    pub pulled_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub fifo_scope: FifoScope,
}

impl Message {
    pub fn band(&self) -> PriorityBand {
        PriorityBand::from_priority(self.priority)
    }

    pub fn is_rebrief(&self) -> bool {
        self.priority == REBRIEF_PRIORITY
    }

    /// Payload as UTF-8, replacing invalid sequences.
    pub fn payload_utf8(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

crate::builder! {
    pub struct MessageBuilder => Message {
        into {
            agent_session: AgentId = "proj:0",
            payload: Vec<u8> = b"hello".to_vec(),
        }
        set {
            id: MessageId = 1,
            priority: u8 = 0,
            sequence_number: i64 = 1,
            status: MessageStatus = MessageStatus::Pending,
            enqueued_at: i64 = 0,
            fifo_scope: FifoScope = FifoScope::Agent,
        }
        option {
            project_name: String = None,
            dependency_id: MessageId = None,
            pulled_at: i64 = None,
            delivered_at: i64 = None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
