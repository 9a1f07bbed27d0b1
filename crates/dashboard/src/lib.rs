pub mod cache;
pub mod cards;
pub mod clients;
pub mod config;
pub mod dashboard;
pub mod daylight;
pub mod error;
pub mod pollers;
pub mod theme;
pub mod ticker;

pub use config::DashboardConfig;
pub use dashboard::Dashboard;
pub use error::{DashboardError, DashboardResult};

/// Log filter used by the binaries when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "household_dashboard=debug";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_targets_this_crate() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        assert_eq!(DEFAULT_LOG_FILTER.split('=').next(), Some(env!("CARGO_CRATE_NAME")));
    }
}
