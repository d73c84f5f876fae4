//! Hand-pose interpretation — landmarks, finger counting, and gesture
//! classification.
//!
//! Everything here is pure per-frame computation; temporal smoothing and
//! debouncing live in the `debounce` module.

pub mod classify;
pub mod fingers;
pub mod landmarks;

pub use classify::{classify_pair, GestureToken, Op};
pub use fingers::count_fingers;
pub use landmarks::{
    HandLandmark, HandObservation, Handedness, LandmarkPoint, LANDMARK_COUNT,
};
