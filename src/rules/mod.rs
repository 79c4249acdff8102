//! Rule synthesis: translating a profile into the minimal set of
//! match/action rules installed into the interception layer.

pub mod synthesizer;
pub mod types;

pub use synthesizer::compile;
pub use types::{CompiledRule, HeaderAction, ResourceCategory, RuleConditions};
