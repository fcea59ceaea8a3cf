//! LiftFlow Cloud Infrastructure
//!
//! This crate provides the provider abstraction for LiftFlow, enabling
//! declarative management of remote resources (fleets, scaling policies)
//! through a plan / apply cycle backed by a local state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   LiftFlow CLI                   │
//! │            (lift plan / apply / destroy)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 liftflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │  Set Diff  │ │ Wait/Retry │ │ State Mgmt │   │
//! │  └────────────┘ └────────────┘ └────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │   gamelift    │
//!           │   provider    │
//!           └───────────────┘
//! ```

pub mod action;
pub mod diff;
pub mod error;
pub mod provider;
pub mod state;
pub mod wait;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use diff::{SetDiff, diff_sets};
pub use error::{CloudError, Result};
pub use provider::{AuthStatus, CloudProvider, ResourceConfig, ResourceSet, RetryConfig};
pub use state::{
    GlobalState, ProviderState, ResourceState, ResourceStatus, StateLock, StateManager,
};
pub use wait::{PollStatus, WaitConfig, retry_until, wait_until};
