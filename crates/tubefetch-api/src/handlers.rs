//! Request handlers.

pub mod analyze;
pub mod download;
pub mod health;
pub mod insights;
pub mod sessions;

pub use analyze::*;
pub use download::*;
pub use health::*;
pub use insights::*;
pub use sessions::*;
