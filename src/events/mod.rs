//! Lifecycle events and the fire-and-forget notification bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{Party, ProductionStage, QualityResult, StageStatus};

/// Event types published after a transition commits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    DealCreated {
        deal_id: i64,
        timestamp: DateTime<Utc>,
    },

    DealReviewed {
        deal_id: i64,
        actor_id: i64,
        timestamp: DateTime<Utc>,
    },

    QuoteSent {
        deal_id: i64,
        by: Party,
        unit_price: f64,
        days: i32,
        timestamp: DateTime<Utc>,
    },

    CounterOfferSent {
        deal_id: i64,
        by: Party,
        unit_price: f64,
        days: i32,
        round: u32,
        timestamp: DateTime<Utc>,
    },

    DealConfirmed {
        deal_id: i64,
        tracker_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    DealRejected {
        deal_id: i64,
        by: Party,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    DealCancelled {
        deal_id: i64,
        timestamp: DateTime<Utc>,
    },

    StageAdvanced {
        tracker_id: Uuid,
        stage: ProductionStage,
        status: StageStatus,
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    StageHeld {
        tracker_id: Uuid,
        stage: ProductionStage,
        timestamp: DateTime<Utc>,
    },

    StageResumed {
        tracker_id: Uuid,
        stage: ProductionStage,
        timestamp: DateTime<Utc>,
    },

    QualityResult {
        tracker_id: Uuid,
        result: QualityResult,
        score: u8,
        timestamp: DateTime<Utc>,
    },

    StageReverted {
        tracker_id: Uuid,
        from_stage: ProductionStage,
        target_stage: ProductionStage,
        revision_number: u32,
        timestamp: DateTime<Utc>,
    },

    ProductionCompleted {
        tracker_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// The deal this event concerns, if any
    pub fn deal_id(&self) -> Option<i64> {
        match self {
            Event::DealCreated { deal_id, .. }
            | Event::DealReviewed { deal_id, .. }
            | Event::QuoteSent { deal_id, .. }
            | Event::CounterOfferSent { deal_id, .. }
            | Event::DealConfirmed { deal_id, .. }
            | Event::DealRejected { deal_id, .. }
            | Event::DealCancelled { deal_id, .. } => Some(*deal_id),
            _ => None,
        }
    }

    /// The tracker this event concerns, if any
    pub fn tracker_id(&self) -> Option<Uuid> {
        match self {
            Event::DealConfirmed { tracker_id, .. }
            | Event::StageAdvanced { tracker_id, .. }
            | Event::StageHeld { tracker_id, .. }
            | Event::StageResumed { tracker_id, .. }
            | Event::QualityResult { tracker_id, .. }
            | Event::StageReverted { tracker_id, .. }
            | Event::ProductionCompleted { tracker_id, .. } => Some(*tracker_id),
            _ => None,
        }
    }
}

/// Fire-and-forget event sink. Publishing never fails the operation that
/// produced the event; a missing subscriber is not an error.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Errors from absent receivers are ignored.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
