//! Per-frame keypoints and the validation gate every counter sits behind.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Number of keypoints in the 17-point body layout.
pub const KEYPOINT_COUNT: usize = 17;

/// One detected landmark in frame-pixel coordinates.
///
/// Deserializes from either `{"x":..,"y":..,"confidence":..}` or `[x, y, confidence]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn point(&self) -> Point {
        (self.x, self.y)
    }
}

/// Anatomical index into the keypoint sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Joint {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One frame as delivered by the external detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time in milliseconds on any monotonic clock.
    pub t_ms: u64,
    pub keypoints: Vec<Keypoint>,
}

impl Frame {
    pub fn new(t_ms: u64, keypoints: Vec<Keypoint>) -> Self {
        Self { t_ms, keypoints }
    }
}

/// Validated view over a frame's keypoints.
#[derive(Debug, Clone, Copy)]
pub struct Pose<'a> {
    keypoints: &'a [Keypoint],
}

impl Pose<'_> {
    pub fn keypoint(&self, joint: Joint) -> Keypoint {
        self.keypoints[joint.index()]
    }

    pub fn point(&self, joint: Joint) -> Point {
        self.keypoint(joint).point()
    }
}

/// Returns `None` when the sequence is shorter than the layout or any
/// `required` joint falls below `min_confidence`.
pub fn select<'a>(
    keypoints: &'a [Keypoint],
    required: &[Joint],
    min_confidence: f32,
) -> Option<Pose<'a>> {
    if keypoints.len() < KEYPOINT_COUNT {
        return None;
    }
    let confident = required
        .iter()
        .all(|j| keypoints[j.index()].confidence >= min_confidence);
    if !confident {
        return None;
    }
    Some(Pose { keypoints })
}
