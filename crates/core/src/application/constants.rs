// Application constants (no magic values)
use std::time::Duration;

/// Call-next refuses to start a second service at the same shop by default
pub const DEFAULT_GUARD_CALL_NEXT: bool = true;

/// Attempts per refresh before a watcher skips the round
pub const MAX_REFRESH_ATTEMPTS: u32 = 3;

/// Pause between failed refresh attempts (1s)
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Buffered views per watcher before the producer waits on the observer
pub const WATCH_CHANNEL_CAPACITY: usize = 16;

/// Longest note a customer can attach when joining
pub const MAX_NOTES_LEN: usize = 500;

/// Shop name used when a customer's shop can no longer be loaded
pub const UNKNOWN_SHOP_NAME: &str = "Unknown Shop";
