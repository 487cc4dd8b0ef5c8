// File: nowtify-core/src/services/mod.rs

pub mod reconciler;
pub mod sweep;
pub mod scheduler;
pub mod notifier;
pub mod team_service;
pub mod api;

pub use api::{ApiRequest, ApiResponse, ApiService, StreamerView};
pub use scheduler::AdaptiveScheduler;
pub use sweep::{SweepService, SweepSummary};
