//! Bulk reaffirmation engine.
//!
//! Runs a batch of combination reaffirmations on a background tokio task and
//! reports progress as immutable [`BulkOperationProgress`] snapshots wrapped
//! in [`ProgressMessage`]s. Items are processed strictly in input order, one
//! repository call at a time; a failing item is recorded and the batch moves
//! on.
//!
//! # Components
//!
//! - [`BulkReaffirmationEngine`] -- one batch at a time per instance; returns
//!   a [`ProgressStream`] per run; `cancel()` ends a run silently
//! - [`ProgressHub`] -- fans progress out to any number of filtered observers
//! - [`BulkController`] -- message-driven front end accepting
//!   [`ControlMessage`]s and publishing to a hub
//!
//! # Message Order
//!
//! For every run: zero or more `PROGRESS_UPDATE`, then exactly one of
//! `COMPLETION` or `ERROR` -- or nothing further once the run is cancelled.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod hub;
pub mod message;
pub mod progress;
pub mod request;

pub use config::EngineConfig;
pub use controller::{BulkController, ControllerHandle};
pub use engine::{BulkReaffirmationEngine, ProgressStream};
pub use error::{EngineError, EngineResult, RequestError};
pub use hub::{ProgressFilter, ProgressHub, ProgressSubscription};
pub use message::{ControlMessage, ProgressMessage};
pub use progress::{BulkOperationProgress, OperationStatus};
pub use request::BulkReaffirmationRequest;
