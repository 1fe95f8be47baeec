// =============================================================================
// AUDIO UPLOAD
// =============================================================================

/// Content types accepted by the audio upload endpoint
pub const ALLOWED_AUDIO_TYPES: [&str; 4] = ["audio/wav", "audio/webm", "audio/mp3", "audio/ogg"];

/// Largest accepted audio file (10MB)
pub const MAX_AUDIO_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extension used when the uploaded file name has none
pub const DEFAULT_AUDIO_EXTENSION: &str = "wav";

// =============================================================================
// WALLET ACTIVITY
// =============================================================================

/// Maximum number of activities accepted by one batch request
pub const MAX_BATCH_ACTIVITIES: usize = 100;

/// Default number of records returned by the activity list endpoints
pub const DEFAULT_ACTIVITY_LIST_LIMIT: i64 = 10;

/// Window used for "recent activity" statistics
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Score weight of one recording contribution
pub const RECORDING_SCORE: i64 = 10;

/// Score weight of one review
pub const REVIEW_SCORE: i64 = 5;
