pub const APP_NAME: &str = "Huddle";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_CHANNEL_NAME_LENGTH: usize = 80;
pub const MAX_CHANNEL_DESCRIPTION_LENGTH: usize = 250;
pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MIN_USERNAME_LENGTH: usize = 2;
pub const MAX_EMOJI_LENGTH: usize = 32;
/// Levels of channel nesting, counting roots as the first.
pub const MAX_CHANNEL_DEPTH: usize = 10;

pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MAX_MESSAGE_PAGE_SIZE: i64 = 100;

/// Window after creation during which the author may still edit a message.
pub const MESSAGE_EDIT_WINDOW_SECS: i64 = 15 * 60;

// Polling
pub const DM_POLL_INTERVAL_MS: u64 = 2_000;
pub const ACTIVE_POLL_INTERVAL_MS: u64 = 5_000;
pub const IDLE_POLL_INTERVAL_MS: u64 = 30_000;
pub const IDLE_THRESHOLD_MS: u64 = 120_000;

// Presence
pub const PRESENCE_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

// Integrations
pub const GOOGLE_DRIVE_PROVIDER: &str = "google_drive";
/// Stored access tokens this close to expiry are refreshed before use.
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 60;
