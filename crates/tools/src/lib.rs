//! RADAE Tools - the `radae-rx` CLI binary's configuration and driver.

pub mod config;
pub mod driver;

pub use config::ReceiverConfig;
pub use driver::Driver;
