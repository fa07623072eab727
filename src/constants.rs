pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MiB
pub const MAX_IMAGE_WIDTH: usize = 1920;
pub const IMAGE_QUALITY: usize = 80;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/svg+xml",
];

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const EXCERPT_LENGTH: usize = 160;

pub const SETTINGS_ID: &str = "singleton";

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;
pub const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOGIN_WINDOW_SECONDS: u64 = 15 * 60;
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 30;
