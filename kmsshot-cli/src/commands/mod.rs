//! CLI command implementations

mod capture;
mod config;
mod list;

pub use capture::{capture, CaptureArgs};
pub use config::{config, ConfigArgs};
pub use list::{list, ListArgs};
