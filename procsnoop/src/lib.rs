pub mod cancel;
pub mod config;
pub mod core_logic;
pub mod error;
pub mod event;
pub mod logger;
pub mod probe;
pub mod pump;
pub mod signal_handler;
