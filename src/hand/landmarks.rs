//! Hand landmark data structures.
//!
//! Models the 21-point hand skeleton produced by the external tracker,
//! one observation per detected hand per frame.  Coordinates are
//! normalized [0,1] image coordinates with y increasing downward; the z
//! depth component is carried through but not interpreted here.

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks, indexed as the tracker reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// (tip, pip) landmark pairs for the four non-thumb fingers.
    pub fn finger_tip_pip_pairs() -> [(HandLandmark, HandLandmark); 4] {
        [
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Which physical hand an observation belongs to, as labeled by the
/// tracker on the mirrored camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a handedness label ("left"/"right", case-insensitive).
    pub fn parse(s: &str) -> Option<Handedness> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Landmark point ─────────────────────────────────────────

/// A single tracked keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar Euclidean distance to another point (z ignored — movement
    /// gating operates in image space).
    pub fn distance_2d(&self, other: &LandmarkPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ── Hand observation ───────────────────────────────────────

/// One detected hand in one frame: 21 landmarks plus handedness.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct HandObservation {
    pub landmarks: [LandmarkPoint; LANDMARK_COUNT],
    pub handedness: Handedness,
}

impl HandObservation {
    /// Build an observation from exactly 21 points.  Returns None when the
    /// tracker delivered the wrong landmark count.
    pub fn from_points(points: &[LandmarkPoint], handedness: Handedness) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            return None;
        }
        let mut landmarks = [LandmarkPoint::default(); LANDMARK_COUNT];
        landmarks.copy_from_slice(points);
        Some(Self {
            landmarks,
            handedness,
        })
    }

    /// Position of a named landmark.
    pub fn point(&self, landmark: HandLandmark) -> LandmarkPoint {
        self.landmarks[landmark.index()]
    }

    /// The wrist point, used as the hand centroid for movement gating.
    pub fn wrist(&self) -> LandmarkPoint {
        self.point(HandLandmark::Wrist)
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbIp.index(), 3);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexPip.index(), 6);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        assert_eq!(LANDMARK_COUNT, 21);
    }

    #[test]
    fn test_tip_pip_pairs() {
        let pairs = HandLandmark::finger_tip_pip_pairs();
        assert_eq!(pairs[0], (HandLandmark::IndexTip, HandLandmark::IndexPip));
        assert_eq!(pairs[3], (HandLandmark::PinkyTip, HandLandmark::PinkyPip));
    }

    #[test]
    fn test_handedness_parse() {
        assert_eq!(Handedness::parse("left"), Some(Handedness::Left));
        assert_eq!(Handedness::parse("Right"), Some(Handedness::Right));
        assert_eq!(Handedness::parse("both"), None);
    }

    #[test]
    fn test_distance_2d() {
        let a = LandmarkPoint::new(0.0, 0.0, 0.5);
        let b = LandmarkPoint::new(0.3, 0.4, 0.9);
        assert!((a.distance_2d(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_from_points_wrong_count() {
        let points = vec![LandmarkPoint::default(); 10];
        assert!(HandObservation::from_points(&points, Handedness::Left).is_none());
    }

    #[test]
    fn test_from_points_and_lookup() {
        let mut points = vec![LandmarkPoint::default(); LANDMARK_COUNT];
        points[HandLandmark::IndexTip.index()] = LandmarkPoint::new(0.1, 0.2, 0.0);
        let obs = HandObservation::from_points(&points, Handedness::Right).unwrap();
        assert_eq!(obs.handedness, Handedness::Right);
        let tip = obs.point(HandLandmark::IndexTip);
        assert!((tip.x - 0.1).abs() < 1e-6);
        assert!((tip.y - 0.2).abs() < 1e-6);
    }
}
