pub mod chain;
pub mod period;
pub mod withdrawal;

pub use reward_models::*;
