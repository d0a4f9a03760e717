pub mod token;
pub mod tracker;

// Re-export commonly used types for convenience
pub use token::{AnimationFrame, AnimationToken};
pub use tracker::{AnimationSwap, AnimationTracker, Swaps};
