//! Bicep curls, each arm counted independently.

use serde::Serialize;
use std::fmt;

use super::{Exercise, Feedback, Hysteresis, Phase, Reading, RepCounter, Transition};
use crate::config::CurlThresholds;
use crate::error::ConfigError;
use crate::geometry::{angle, tilt, tilt_difference};
use crate::keypoints::{Frame, Joint, Pose, select};
use crate::smoother::Smoother;

pub(crate) const ARM_JOINTS: [Joint; 6] = [
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftElbow,
    Joint::RightElbow,
    Joint::LeftWrist,
    Joint::RightWrist,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CurlMode {
    Left,
    Right,
    Both,
}

impl CurlMode {
    fn counts_left(self) -> bool {
        matches!(self, CurlMode::Left | CurlMode::Both)
    }

    fn counts_right(self) -> bool {
        matches!(self, CurlMode::Right | CurlMode::Both)
    }
}

impl fmt::Display for CurlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CurlMode::Left => "left",
            CurlMode::Right => "right",
            CurlMode::Both => "both",
        })
    }
}

#[derive(Debug, Clone)]
struct Arm {
    smoother: Smoother,
    machine: Hysteresis,
    angle: Option<f32>,
}

impl Arm {
    fn new(th: &CurlThresholds) -> Self {
        Self {
            smoother: Smoother::new(th.smoothing_window),
            machine: Hysteresis::new(th.bent, th.extended),
            angle: None,
        }
    }

    fn reset(&mut self) {
        self.smoother.clear();
        self.machine.reset();
        self.angle = None;
    }
}

/// Shoulder line tilt used for posture tracking.
pub fn shoulder_tilt(pose: &Pose<'_>) -> f32 {
    let left = pose.point(Joint::LeftShoulder);
    let right = pose.point(Joint::RightShoulder);
    tilt(left, right)
}

#[derive(Debug, Clone)]
pub struct CurlCounter {
    th: CurlThresholds,
    mode: CurlMode,
    left: Arm,
    right: Arm,
    baseline: Option<f32>,
    posture_alert: bool,
}

impl CurlCounter {
    pub fn new(th: CurlThresholds) -> Result<Self, ConfigError> {
        th.validate()?;
        Ok(Self {
            left: Arm::new(&th),
            right: Arm::new(&th),
            th,
            mode: CurlMode::Both,
            baseline: None,
            posture_alert: false,
        })
    }

    pub fn min_confidence(&self) -> f32 {
        self.th.min_confidence
    }

    pub fn mode(&self) -> CurlMode {
        self.mode
    }

    /// Arms outside the new mode keep their counts but stop counting.
    pub fn set_mode(&mut self, mode: CurlMode) {
        self.mode = mode;
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn set_baseline(&mut self, baseline: Option<f32>) {
        self.baseline = baseline;
        if baseline.is_none() {
            self.posture_alert = false;
        }
    }

    pub fn posture_alert(&self) -> bool {
        self.posture_alert
    }

    pub fn left_count(&self) -> u32 {
        self.left.machine.count()
    }

    pub fn right_count(&self) -> u32 {
        self.right.machine.count()
    }

    pub fn left_angle(&self) -> Option<f32> {
        self.left.angle
    }

    pub fn right_angle(&self) -> Option<f32> {
        self.right.angle
    }

    /// Runs one validated frame. Both smoothers always advance; only the
    /// arms selected by the mode move their machines.
    pub(crate) fn process_pose(&mut self, pose: &Pose<'_>) -> (Reading, Transition, Transition) {
        let raw_left = angle(
            pose.point(Joint::LeftShoulder),
            pose.point(Joint::LeftElbow),
            pose.point(Joint::LeftWrist),
        );
        let raw_right = angle(
            pose.point(Joint::RightShoulder),
            pose.point(Joint::RightElbow),
            pose.point(Joint::RightWrist),
        );
        let left = self.left.smoother.update(raw_left);
        let right = self.right.smoother.update(raw_right);
        self.left.angle = Some(left);
        self.right.angle = Some(right);

        let lt = if self.mode.counts_left() {
            self.left.machine.step(left)
        } else {
            Transition::None
        };
        let rt = if self.mode.counts_right() {
            self.right.machine.step(right)
        } else {
            Transition::None
        };

        let current = shoulder_tilt(pose);
        let tolerance = self.th.posture_tolerance;
        self.posture_alert = self
            .baseline
            .is_some_and(|b| tilt_difference(current, b).abs() > tolerance);

        (self.reading(), lt, rt)
    }

    fn reading(&self) -> Reading {
        let (angle, phase) = match self.mode {
            CurlMode::Left => (self.left.angle, self.left.machine.phase()),
            CurlMode::Right => (self.right.angle, self.right.machine.phase()),
            CurlMode::Both => {
                let angle = match (self.left.angle, self.right.angle) {
                    (Some(l), Some(r)) => Some((l + r) / 2.0),
                    _ => None,
                };
                let down = self.left.machine.phase() == Phase::Down
                    || self.right.machine.phase() == Phase::Down;
                (angle, if down { Phase::Down } else { Phase::Up })
            }
        };
        Reading {
            angle,
            feedback: Feedback::from(phase),
            count: self.count(),
        }
    }
}

impl RepCounter for CurlCounter {
    fn exercise(&self) -> Exercise {
        Exercise::Curls
    }

    fn process(&mut self, frame: &Frame) -> Reading {
        match select(&frame.keypoints, &ARM_JOINTS, self.th.min_confidence) {
            Some(pose) => self.process_pose(&pose).0,
            None => Reading::insufficient(self.count()),
        }
    }

    /// Mode is a selection, not counting state, and survives a reset.
    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.baseline = None;
        self.posture_alert = false;
    }

    fn count(&self) -> u32 {
        match self.mode {
            CurlMode::Left => self.left_count(),
            CurlMode::Right => self.right_count(),
            CurlMode::Both => self.left_count() + self.right_count(),
        }
    }

    fn phase(&self) -> Phase {
        match self.mode {
            CurlMode::Right => self.right.machine.phase(),
            _ => self.left.machine.phase(),
        }
    }
}
