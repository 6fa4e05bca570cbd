//! Test constants shared across all e2e tests
//!
//! Fixture handles, catalog ids and timeouts live here so tests never
//! hardcode them.

// ============================================================================
// Test Users
// ============================================================================

/// The user most tests act as
pub const TEST_USER: &str = "alice";

/// Accepted friend of the test user
pub const FRIEND_USER: &str = "bob";

/// Second accepted friend of the test user
pub const SECOND_FRIEND_USER: &str = "carol";

/// User with no friendship to the test user
pub const STRANGER_USER: &str = "mallory";

/// User with a pending request from the test user
pub const PENDING_USER: &str = "dave";

// ============================================================================
// Test Catalog IDs
// ============================================================================

/// Artist with tracks on First Album, featured on Solo Song
pub const ARTIST_1_ID: &str = "artist-1";

/// Artist of Jazz Collection
pub const ARTIST_2_ID: &str = "artist-2";

/// Artist of the album-less Solo Song
pub const ARTIST_3_ID: &str = "artist-3";

/// Album by artist-1 (tracks 1 and 2)
pub const ALBUM_1_ID: &str = "album-1";

/// Album by artist-2 (track 3)
pub const ALBUM_2_ID: &str = "album-2";

/// "Opening Track" on First Album
pub const TRACK_1_ID: &str = "track-1";

/// "Middle Track" on First Album
pub const TRACK_2_ID: &str = "track-2";

/// "Smooth Jazz" on Jazz Collection
pub const TRACK_3_ID: &str = "track-3";

/// "Solo Song", no album
pub const TRACK_4_ID: &str = "track-4";

// ============================================================================
// Test Catalog Metadata
// ============================================================================

pub const ARTIST_1_NAME: &str = "The Test Band";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";
pub const ARTIST_3_NAME: &str = "Solo Act";

pub const ALBUM_1_TITLE: &str = "First Album";
pub const ALBUM_2_TITLE: &str = "Jazz Collection";

pub const TRACK_1_TITLE: &str = "Opening Track";
pub const TRACK_2_TITLE: &str = "Middle Track";
pub const TRACK_3_TITLE: &str = "Smooth Jazz";
pub const TRACK_4_TITLE: &str = "Solo Song";

/// Duration of every seeded full play
pub const FULL_PLAY_MS: u64 = 180_000;

/// Duration of the seeded skipped play, below the minimum listen duration
pub const SHORT_PLAY_MS: u64 = 5_000;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
