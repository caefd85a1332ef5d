use std::time::Duration;

// User Agent constants
pub const USER_AGENT: &str = concat!("Mp3Downloader/", env!("CARGO_PKG_VERSION"), " reqwest/0.12");

// Network configuration
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const METADATA_PATH: &str = "get_metadata";
pub const DOWNLOAD_PATH: &str = "download_mp3";
pub const METADATA_TIMEOUT_SECS: u64 = 100;
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 3000;

// Channel capacity
pub const CHANNEL_CAPACITY: usize = 10;

// Delay between a finished download and the automatic reset of the form
pub const RESET_DELAY: Duration = Duration::from_secs(3);

// Settings
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const LOG_FILE_NAME: &str = "mp3-downloader.log";
pub const APP_QUALIFIER: &str = "";
pub const APP_ORGANIZATION: &str = "";
pub const APP_NAME: &str = "mp3-downloader";

// Fallbacks for partial replies from the service
pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const AUDIO_EXTENSION: &str = "mp3";

// UI layout constants
pub const HEADER_HEIGHT: u16 = 3;
pub const LINK_BAR_HEIGHT: u16 = 3;
pub const STATUS_HEIGHT: u16 = 3;
pub const FOOTER_HEIGHT: u16 = 1;
pub const PREVIEW_HEIGHT: u16 = 7;

// Event polling
pub const EVENT_POLL_TIMEOUT_MS: u64 = 10;
