//! Finger-up counting from a single hand observation.
//!
//! The thumb compares x-coordinates of tip vs. IP joint with the
//! direction flipped by handedness (the camera image is mirrored).  The
//! remaining four fingers compare tip vs. PIP y-coordinates; image y
//! grows downward, so a raised fingertip has the smaller y.

use super::landmarks::{HandLandmark, HandObservation, Handedness};

/// Count raised fingers on one hand.  Always returns a value in 0..=5.
pub fn count_fingers(hand: &HandObservation) -> u8 {
    let mut up = 0u8;

    let thumb_tip = hand.point(HandLandmark::ThumbTip);
    let thumb_ip = hand.point(HandLandmark::ThumbIp);
    let thumb_up = match hand.handedness {
        Handedness::Left => thumb_tip.x > thumb_ip.x,
        Handedness::Right => thumb_tip.x < thumb_ip.x,
    };
    if thumb_up {
        up += 1;
    }

    for (tip, pip) in HandLandmark::finger_tip_pip_pairs() {
        if hand.point(tip).y < hand.point(pip).y {
            up += 1;
        }
    }

    up
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
pub(crate) fn make_hand(fingers_up: u8, handedness: Handedness) -> HandObservation {
    use super::landmarks::{LandmarkPoint, LANDMARK_COUNT};

    assert!(fingers_up <= 5);
    let mut points = vec![LandmarkPoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT];

    // Thumb counts first: spread tip past the IP joint in the direction
    // that reads as "up" for this handedness.
    let thumb_up = fingers_up >= 5;
    let tip_x = match (handedness, thumb_up) {
        (Handedness::Left, true) => 0.6,
        (Handedness::Left, false) => 0.4,
        (Handedness::Right, true) => 0.4,
        (Handedness::Right, false) => 0.6,
    };
    points[HandLandmark::ThumbTip.index()] = LandmarkPoint::new(tip_x, 0.5, 0.0);
    points[HandLandmark::ThumbIp.index()] = LandmarkPoint::new(0.5, 0.5, 0.0);

    // Raise the first `n` non-thumb fingers by lifting their tips above
    // the PIP joints.
    let non_thumb = fingers_up.min(4);
    for (i, (tip, pip)) in HandLandmark::finger_tip_pip_pairs().iter().enumerate() {
        let y = if (i as u8) < non_thumb { 0.3 } else { 0.7 };
        points[tip.index()] = LandmarkPoint::new(0.5, y, 0.0);
        points[pip.index()] = LandmarkPoint::new(0.5, 0.5, 0.0);
    }

    HandObservation::from_points(&points, handedness).unwrap()
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_full_range() {
        for n in 0..=5u8 {
            assert_eq!(count_fingers(&make_hand(n, Handedness::Left)), n);
            assert_eq!(count_fingers(&make_hand(n, Handedness::Right)), n);
        }
    }

    #[test]
    fn test_thumb_direction_flips_by_handedness() {
        // A left-hand layout with the thumb tip at larger x reads as up;
        // the identical geometry labeled right reads as down.
        let left = make_hand(5, Handedness::Left);
        assert_eq!(count_fingers(&left), 5);

        let mut points = left.landmarks.to_vec();
        let relabeled =
            HandObservation::from_points(&points, Handedness::Right).unwrap();
        assert_eq!(count_fingers(&relabeled), 4);

        // Mirror the thumb and the right hand reads 5 again.
        points[HandLandmark::ThumbTip.index()].x = 0.4;
        let mirrored =
            HandObservation::from_points(&points, Handedness::Right).unwrap();
        assert_eq!(count_fingers(&mirrored), 5);
    }

    #[test]
    fn test_result_always_in_range() {
        // Degenerate geometry (all points coincident) still yields 0..=5.
        use super::super::landmarks::{LandmarkPoint, LANDMARK_COUNT};
        let points = vec![LandmarkPoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        let obs = HandObservation::from_points(&points, Handedness::Left).unwrap();
        assert!(count_fingers(&obs) <= 5);
    }
}
