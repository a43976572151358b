/// Application-level constants
pub const APP_NAME: &str = "labsense";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable enabling per-document diagnostic dumps.
pub const DUMP_DIR_ENV: &str = "LABSENSE_DUMP_DIR";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "labsense=info"
}
