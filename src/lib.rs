//! Header override rule engine.
//!
//! Profiles of HTTP header overrides are compiled into a minimal set of
//! match/action rules and installed wholesale into a request-interception
//! layer that evaluates them per request.
//!
//! ```text
//! UI / CLI ──commands──▶ engine ──compile──▶ rules ──install──▶ intercept
//!                          │                                       │
//!                          ├─ profile store ── persistence         │
//!                          └─ session (counter, timer) ◀─ match events
//! ```

pub mod config;
pub mod control;
pub mod engine;
pub mod intercept;
pub mod observability;
pub mod pattern;
pub mod profile;
pub mod rules;
pub mod session;
pub mod store;

pub use engine::{Command, CommandOutcome, HeaderEngine};
pub use profile::{Profile, ProfileStore};
pub use rules::CompiledRule;
