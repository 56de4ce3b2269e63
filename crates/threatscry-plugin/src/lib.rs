//! Out-of-process plugins: custom risk rules and relative attacker
//! attractiveness (RAA) calculators, invoked as subprocesses that speak JSON
//! over stdin and stdout.

pub mod contract;
pub mod error;
pub mod raa;
pub mod rule;
pub mod runner;

pub use contract::{PluginInfo, RaaResult};
pub use error::PluginError;
pub use raa::RaaPlugin;
pub use rule::PluginRule;
pub use runner::{PluginRunner, DEFAULT_TIMEOUT};
