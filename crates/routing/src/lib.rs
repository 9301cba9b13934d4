//! Subscription routing for the speech bridge
//!
//! Turns a flat list of subscription strings into the minimal set of
//! upstream stream plans, with unambiguous per-language ownership of
//! transcription output.

mod optimizer;
mod plan;
mod subscription;

pub use optimizer::SubscriptionOptimizer;
pub use plan::{PlanConfig, PlanKind, StreamPlan};
pub use subscription::Subscription;

use thiserror::Error;

/// Routing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Invalid subscription '{0}'")]
    InvalidSubscription(String),
}
