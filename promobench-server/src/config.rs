use std::time::Duration;

/// Maximum time a request waits for exclusive access to the store.
/// A benchmark run holds the store for its whole duration, so this is generous.
pub const DB_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire and storage format of every promotion date (`YYYYMMDD`).
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Address the binary binds when `--address` is not given.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";
