//! Subscription lifecycle states

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a catalog subscription as the agent sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionState {
    Initial,
    Approved,
    Subscribing,
    Active,
    FailedToSubscribe,
    UnsubscribeInitiated,
    Unsubscribing,
    Unsubscribed,
    FailedToUnsubscribe,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Initial => "INITIAL",
            SubscriptionState::Approved => "APPROVED",
            SubscriptionState::Subscribing => "SUBSCRIBING",
            SubscriptionState::Active => "ACTIVE",
            SubscriptionState::FailedToSubscribe => "FAILED_TO_SUBSCRIBE",
            SubscriptionState::UnsubscribeInitiated => "UNSUBSCRIBE_INITIATED",
            SubscriptionState::Unsubscribing => "UNSUBSCRIBING",
            SubscriptionState::Unsubscribed => "UNSUBSCRIBED",
            SubscriptionState::FailedToUnsubscribe => "FAILED_TO_UNSUBSCRIBE",
        }
    }

    /// Whether the agent has work to do for a subscription in this state
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Approved | SubscriptionState::UnsubscribeInitiated
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Active
                | SubscriptionState::FailedToSubscribe
                | SubscriptionState::Unsubscribed
                | SubscriptionState::FailedToUnsubscribe
        )
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
