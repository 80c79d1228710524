pub mod config;
pub mod health;
pub mod metrics;
pub mod monitor;
pub mod state;
pub mod store;

pub use config::Config;
pub use monitor::Monitor;
pub use state::StateMachine;
