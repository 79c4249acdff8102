//! Session state: the match counter and the auto-disable timer.
//!
//! Both are explicit objects passed into handlers rather than ambient
//! globals; the timer's deadline is an absolute timestamp so restart
//! logic is a pure function of "now vs. persisted deadline".

pub mod counter;
pub mod timer;

pub use counter::MatchCounter;
pub use timer::AutoDisableTimer;
