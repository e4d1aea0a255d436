//! Business logic services.

pub mod gemini;
pub mod session;

pub use gemini::{GeminiClient, GeminiConfig, InsightError, InsightGenerator, InsightOutcome, InsightService};
pub use session::{Session, SessionService, SessionStore, SessionView};
