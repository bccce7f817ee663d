//! Squats: knee angle, upright-torso gate, minimum spacing between reps.

use log::debug;

use super::{Exercise, Feedback, Hysteresis, Phase, Reading, RepCounter, Transition};
use crate::config::{AlignmentCheck, SquatThresholds};
use crate::error::ConfigError;
use crate::geometry::{angle, vertical_deviation};
use crate::keypoints::{Frame, Joint, select};
use crate::smoother::Smoother;

const REQUIRED: [Joint; 4] = [
    Joint::LeftShoulder,
    Joint::LeftHip,
    Joint::LeftKnee,
    Joint::LeftAnkle,
];

#[derive(Debug, Clone)]
pub struct SquatCounter {
    th: SquatThresholds,
    smoother: Smoother,
    machine: Hysteresis,
    last_rep_ms: Option<u64>,
}

impl SquatCounter {
    pub fn new(th: SquatThresholds) -> Result<Self, ConfigError> {
        th.validate()?;
        Ok(Self {
            smoother: Smoother::new(th.smoothing_window),
            machine: Hysteresis::new(th.bent, th.extended),
            last_rep_ms: None,
            th,
        })
    }

    fn rep_allowed(&self, now_ms: u64) -> bool {
        let gap = self.th.min_rep_interval_ms;
        self.last_rep_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= gap)
    }

    fn advance(&mut self, knee: f32, now_ms: u64) {
        let allowed = self.rep_allowed(now_ms);
        match self.machine.step_with(knee, allowed) {
            Transition::Counted => self.last_rep_ms = Some(now_ms),
            Transition::Suppressed => debug!(
                "squat: rep at {now_ms}ms within {}ms of the previous one, ignored",
                self.th.min_rep_interval_ms
            ),
            _ => {}
        }
    }
}

impl RepCounter for SquatCounter {
    fn exercise(&self) -> Exercise {
        Exercise::Squats
    }

    fn process(&mut self, frame: &Frame) -> Reading {
        let Some(pose) = select(&frame.keypoints, &REQUIRED, self.th.min_confidence) else {
            return Reading::insufficient(self.count());
        };

        let raw = angle(
            pose.point(Joint::LeftHip),
            pose.point(Joint::LeftKnee),
            pose.point(Joint::LeftAnkle),
        );
        let knee = self.smoother.update(raw);

        let shoulder = pose.point(Joint::LeftShoulder);
        let hip = pose.point(Joint::LeftHip);
        let upright = match self.th.alignment {
            AlignmentCheck::Disabled => true,
            _ => vertical_deviation(shoulder, hip) < self.th.max_torso_lean,
        };

        let feedback = match self.th.alignment {
            // phase is held while leaning; nothing moves until the torso is back
            AlignmentCheck::Enforce if !upright => Feedback::FixTorso,
            AlignmentCheck::Advisory if !upright => {
                self.advance(knee, frame.t_ms);
                Feedback::FixTorso
            }
            _ => {
                self.advance(knee, frame.t_ms);
                self.machine.phase().into()
            }
        };

        Reading {
            angle: Some(knee),
            feedback,
            count: self.count(),
        }
    }

    fn reset(&mut self) {
        self.smoother.clear();
        self.machine.reset();
        self.last_rep_ms = None;
    }

    fn count(&self) -> u32 {
        self.machine.count()
    }

    fn phase(&self) -> Phase {
        self.machine.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::testutil::{blank, frame, place_for_angle, set};
    use crate::keypoints::Keypoint;

    /// Standing figure; `lean_dx` shifts the shoulder forward of the hip.
    fn body(knee_deg: f32, lean_dx: f32) -> Vec<Keypoint> {
        let mut kps = blank();
        let hip = (200.0, 300.0);
        let knee = (200.0, 400.0);
        let ankle = place_for_angle(hip, knee, knee_deg, 100.0);
        set(&mut kps, Joint::LeftShoulder, 200.0 + lean_dx, 150.0);
        set(&mut kps, Joint::LeftHip, hip.0, hip.1);
        set(&mut kps, Joint::LeftKnee, knee.0, knee.1);
        set(&mut kps, Joint::LeftAnkle, ankle.0, ankle.1);
        kps
    }

    fn counter(alignment: AlignmentCheck, interval_ms: u64) -> SquatCounter {
        SquatCounter::new(SquatThresholds {
            bent: 120.0,
            extended: 165.0,
            smoothing_window: 1,
            alignment,
            min_rep_interval_ms: interval_ms,
            ..SquatThresholds::default()
        })
        .unwrap()
    }

    #[test]
    fn debounce_merges_fast_reps() {
        let mut c = counter(AlignmentCheck::Enforce, 500);
        let seq = [
            (0, 170.0),
            (100, 100.0),
            (200, 170.0),
            (300, 100.0),
            (400, 170.0),
        ];
        for (t, a) in seq {
            c.process(&frame(t, body(a, 0.0)));
        }
        assert_eq!(c.count(), 1);

        // spaced out, the next one counts
        c.process(&frame(900, body(100.0, 0.0)));
        c.process(&frame(1000, body(170.0, 0.0)));
        assert_eq!(c.count(), 2);
    }

    #[test]
    fn enforced_lean_blocks_counting() {
        let mut c = counter(AlignmentCheck::Enforce, 0);
        let mut last = Reading::insufficient(0);
        let knees = [170.0, 100.0, 170.0, 100.0, 170.0];
        for (i, a) in knees.into_iter().enumerate() {
            last = c.process(&frame(i as u64 * 1000, body(a, 120.0)));
        }
        assert_eq!(c.count(), 0);
        assert_eq!(last.feedback, Feedback::FixTorso);
    }

    #[test]
    fn enforced_lean_holds_phase() {
        let mut c = counter(AlignmentCheck::Enforce, 0);
        c.process(&frame(0, body(100.0, 0.0)));
        assert_eq!(c.phase(), Phase::Down);
        c.process(&frame(1000, body(170.0, 120.0)));
        assert_eq!(c.phase(), Phase::Down);
        assert_eq!(c.count(), 0);
        c.process(&frame(2000, body(170.0, 0.0)));
        assert_eq!(c.count(), 1);
    }

    #[test]
    fn advisory_lean_still_counts() {
        let mut c = counter(AlignmentCheck::Advisory, 0);
        c.process(&frame(0, body(100.0, 120.0)));
        let r = c.process(&frame(1000, body(170.0, 120.0)));
        assert_eq!(r.count, 1);
        assert_eq!(r.feedback, Feedback::FixTorso);
    }

    #[test]
    fn disabled_check_ignores_lean() {
        let mut c = counter(AlignmentCheck::Disabled, 0);
        c.process(&frame(0, body(100.0, 120.0)));
        let r = c.process(&frame(1000, body(170.0, 120.0)));
        assert_eq!(r.count, 1);
        assert_eq!(r.feedback, Feedback::Up);
    }

    #[test]
    fn low_confidence_is_noop() {
        let mut c = counter(AlignmentCheck::Enforce, 0);
        c.process(&frame(0, body(100.0, 0.0)));
        let mut kps = body(170.0, 0.0);
        kps[Joint::LeftAnkle.index()].confidence = 0.1;
        let r = c.process(&frame(1000, kps));
        assert_eq!(r, Reading::insufficient(0));
        assert_eq!(c.phase(), Phase::Down);
    }

    #[test]
    fn rejected_frame_leaves_smoother_untouched() {
        let mut c = SquatCounter::new(SquatThresholds {
            smoothing_window: 3,
            ..SquatThresholds::default()
        })
        .unwrap();
        c.process(&frame(0, body(170.0, 0.0)));
        c.process(&frame(1000, body(100.0, 0.0)));
        let mut kps = body(40.0, 0.0);
        kps[Joint::LeftKnee.index()].confidence = 0.0;
        c.process(&frame(2000, kps));
        let r = c.process(&frame(3000, body(130.0, 0.0)));
        let expected = (170.0 + 100.0 + 130.0) / 3.0;
        assert!((r.angle.unwrap() - expected).abs() < 1e-2, "{:?}", r.angle);
    }

    #[test]
    fn invalid_band_fails_construction() {
        let th = SquatThresholds {
            bent: 170.0,
            extended: 165.0,
            ..SquatThresholds::default()
        };
        assert!(SquatCounter::new(th).is_err());
    }
}
