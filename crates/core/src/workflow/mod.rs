pub mod engine;

pub use engine::{TransitionDecision, TransitionEngine, TransitionPolicy};
