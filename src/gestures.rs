//! Whole-body control gestures for the curl session.

use crate::config::SessionThresholds;
use crate::counters::CurlMode;
use crate::geometry::distance;
use crate::keypoints::{Joint, Pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Held an arm (or both) out to the side long enough to pick a mode.
    SelectMode(CurlMode),
    /// Held both hands above the head long enough to end the session.
    Reset,
}

/// Both wrists close to the opposite shoulder.
pub fn arms_crossed(pose: &Pose<'_>, cross_ratio: f32) -> bool {
    let ls = pose.point(Joint::LeftShoulder);
    let rs = pose.point(Joint::RightShoulder);
    let limit = distance(ls, rs) * cross_ratio;
    distance(pose.point(Joint::LeftWrist), rs) < limit
        && distance(pose.point(Joint::RightWrist), ls) < limit
}

/// Which arms are held out past `offset_px` from their own shoulder.
///
/// "Out" points away from the body midline, so this reads the same on a
/// mirrored feed.
pub fn arms_out(pose: &Pose<'_>, offset_px: f32) -> Option<CurlMode> {
    let ls = pose.point(Joint::LeftShoulder);
    let rs = pose.point(Joint::RightShoulder);
    let left_side = if ls.0 <= rs.0 { -1.0 } else { 1.0 };

    let left_out = (pose.point(Joint::LeftWrist).0 - ls.0) * left_side > offset_px;
    let right_out = (pose.point(Joint::RightWrist).0 - rs.0) * -left_side > offset_px;

    match (left_out, right_out) {
        (true, true) => Some(CurlMode::Both),
        (true, false) => Some(CurlMode::Left),
        (false, true) => Some(CurlMode::Right),
        (false, false) => None,
    }
}

/// Both wrists above the nose (image y grows downward).
pub fn hands_up(pose: &Pose<'_>) -> bool {
    let nose_y = pose.point(Joint::Nose).1;
    pose.point(Joint::LeftWrist).1 < nose_y && pose.point(Joint::RightWrist).1 < nose_y
}

#[derive(Debug, Default, Clone)]
struct HoldCounters {
    left: u32,
    right: u32,
    both: u32,
}

impl HoldCounters {
    /// Only the counter matching this frame's pose survives.
    fn observe(&mut self, out: Option<CurlMode>) {
        let (l, r, b) = match out {
            Some(CurlMode::Left) => (self.left + 1, 0, 0),
            Some(CurlMode::Right) => (0, self.right + 1, 0),
            Some(CurlMode::Both) => (0, 0, self.both + 1),
            None => (0, 0, 0),
        };
        self.left = l;
        self.right = r;
        self.both = b;
    }
}

/// Frame-counting detector for the active session.
#[derive(Debug)]
pub struct GestureDetector {
    th: SessionThresholds,
    hold: HoldCounters,
    reset_frames: u32,
}

impl GestureDetector {
    pub fn new(th: SessionThresholds) -> Self {
        Self {
            th,
            hold: HoldCounters::default(),
            reset_frames: 0,
        }
    }

    /// Feeds one frame. A gesture keeps firing every frame while it stays
    /// held past the threshold; reset wins over mode selection.
    pub fn update(&mut self, pose: &Pose<'_>) -> Option<Gesture> {
        self.hold.observe(arms_out(pose, self.th.mode_offset_px));

        if hands_up(pose) {
            self.reset_frames += 1;
        } else {
            self.reset_frames = 0;
        }

        let limit = self.th.gesture_frames;
        if self.reset_frames > limit {
            self.clear();
            return Some(Gesture::Reset);
        }
        if self.hold.both > limit {
            Some(Gesture::SelectMode(CurlMode::Both))
        } else if self.hold.left > limit {
            Some(Gesture::SelectMode(CurlMode::Left))
        } else if self.hold.right > limit {
            Some(Gesture::SelectMode(CurlMode::Right))
        } else {
            None
        }
    }

    /// Frames the reset pose has been held so far.
    pub fn reset_progress(&self) -> u32 {
        self.reset_frames
    }

    pub fn clear(&mut self) {
        self.hold = HoldCounters::default();
        self.reset_frames = 0;
    }
}
