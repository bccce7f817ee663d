//! Push-ups: averaged elbow angle, gated on a level torso.

use super::{Exercise, Feedback, Hysteresis, Phase, Reading, RepCounter};
use crate::config::{AlignmentCheck, PushupThresholds};
use crate::error::ConfigError;
use crate::geometry::{angle, horizontal_deviation, midpoint};
use crate::keypoints::{Frame, Joint, select};
use crate::smoother::Smoother;

const REQUIRED: [Joint; 8] = [
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftElbow,
    Joint::RightElbow,
    Joint::LeftWrist,
    Joint::RightWrist,
    Joint::LeftHip,
    Joint::RightHip,
];

#[derive(Debug, Clone)]
pub struct PushupCounter {
    th: PushupThresholds,
    smoother: Smoother,
    machine: Hysteresis,
}

impl PushupCounter {
    pub fn new(th: PushupThresholds) -> Result<Self, ConfigError> {
        th.validate()?;
        Ok(Self {
            smoother: Smoother::new(th.smoothing_window),
            machine: Hysteresis::new(th.bent, th.extended),
            th,
        })
    }
}

impl RepCounter for PushupCounter {
    fn exercise(&self) -> Exercise {
        Exercise::Pushups
    }

    fn process(&mut self, frame: &Frame) -> Reading {
        let Some(pose) = select(&frame.keypoints, &REQUIRED, self.th.min_confidence) else {
            return Reading::insufficient(self.count());
        };

        let left = angle(
            pose.point(Joint::LeftShoulder),
            pose.point(Joint::LeftElbow),
            pose.point(Joint::LeftWrist),
        );
        let right = angle(
            pose.point(Joint::RightShoulder),
            pose.point(Joint::RightElbow),
            pose.point(Joint::RightWrist),
        );
        let elbow = self.smoother.update((left + right) / 2.0);

        let ls = pose.point(Joint::LeftShoulder);
        let rs = pose.point(Joint::RightShoulder);
        let lh = pose.point(Joint::LeftHip);
        let rh = pose.point(Joint::RightHip);
        let shoulders = midpoint(ls, rs);
        let hips = midpoint(lh, rh);
        let aligned = horizontal_deviation(shoulders, hips) <= self.th.max_torso_tilt;

        let feedback = match self.th.alignment {
            AlignmentCheck::Enforce if !aligned => {
                // a sagging or piked body loses the pending rep
                self.machine.release();
                Feedback::FixAlignment
            }
            AlignmentCheck::Advisory if !aligned => {
                self.machine.step(elbow);
                Feedback::FixAlignment
            }
            _ => {
                self.machine.step(elbow);
                self.machine.phase().into()
            }
        };

        Reading {
            angle: Some(elbow),
            feedback,
            count: self.count(),
        }
    }

    fn reset(&mut self) {
        self.smoother.clear();
        self.machine.reset();
    }

    fn count(&self) -> u32 {
        self.machine.count()
    }

    fn phase(&self) -> Phase {
        self.machine.phase()
    }
}
