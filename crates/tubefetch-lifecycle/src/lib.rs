//! Simulated download lifecycle.
//!
//! This crate provides:
//! - A pure state machine for the idle/preparing/downloading/converting/completed flow
//! - Injectable clocks and progress increment sources
//! - An async runner that drives the machine and publishes stream events

pub mod clock;
pub mod config;
pub mod error;
pub mod increment;
pub mod machine;
pub mod runner;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::LifecycleConfig;
pub use error::{LifecycleAction, LifecycleError, LifecycleResult};
pub use increment::{FixedIncrement, ProgressIncrement, RandomIncrement};
pub use machine::{DownloadLifecycle, Transition, PROGRESS_MAX};
pub use runner::{transition_messages, LifecycleRunner};
