//! Core constants shared by the buffer, the viewport and the configuration.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default viewport size in pixels when no target size is configured.
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (800, 600);

/// Default zoom factor (no scaling).
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Extra tiles added to the buffer beyond the viewport on each axis.
///
/// Also the largest per-call camera displacement, in tiles, that is handled
/// by an incremental scroll instead of a full rebuild.
pub const DEFAULT_TILE_PADDING: u32 = 1;

/// Clear colour of a per-pixel-alpha frame (fully transparent).
pub const RGBA_CLEAR_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Clear colour of an opaque frame without colorkey.
pub const RGB_CLEAR_COLOR: [u8; 3] = [0, 0, 0];

/// Lower bound applied to animation frame durations, in milliseconds.
pub const MIN_FRAME_DURATION_MS: u64 = 1;

/// Upper bound on the delay between two frame changes once the speed
/// multiplier is applied, in milliseconds (one day).
pub const MAX_FRAME_DURATION_MS: u64 = 86_400_000;
