//! Curl session controller: start gesture, calibration, then counting with
//! gesture-driven mode selection and reset.

use serde::Serialize;

use crate::config::{CurlThresholds, SessionThresholds};
use crate::counters::curl::{ARM_JOINTS, shoulder_tilt};
use crate::counters::{CurlCounter, CurlMode, Reading, RepCounter, Transition};
use crate::error::ConfigError;
use crate::geometry::tilt_difference;
use crate::gestures::{Gesture, GestureDetector, arms_crossed};
use crate::keypoints::{Frame, Joint, select};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Waiting,
    Calibrating,
    Active,
}

impl SessionPhase {
    pub fn instruction(self) -> &'static str {
        match self {
            SessionPhase::Waiting => "Cross your arms to start",
            SessionPhase::Calibrating => "Hold a neutral pose for calibration...",
            SessionPhase::Active => "Reset: raise both hands above your head",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    CalibrationStarted,
    Activated { baseline: f32 },
    Rep { side: Side },
    ModeChanged { mode: CurlMode },
    Reset,
}

#[derive(Debug, Clone)]
enum State {
    Waiting,
    Calibrating { samples: Vec<f32> },
    Active { started_ms: u64 },
}

/// Per-frame session output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReading {
    pub phase: SessionPhase,
    pub mode: CurlMode,
    pub reading: Reading,
    pub left_count: u32,
    pub right_count: u32,
    pub left_angle: Option<f32>,
    pub right_angle: Option<f32>,
    pub posture_alert: bool,
    pub elapsed_ms: Option<u64>,
    pub events: Vec<SessionEvent>,
}

#[derive(Debug)]
pub struct CurlSession {
    th: SessionThresholds,
    counter: CurlCounter,
    gestures: GestureDetector,
    state: State,
}

impl CurlSession {
    pub fn new(curl: CurlThresholds, th: SessionThresholds) -> Result<Self, ConfigError> {
        th.validate()?;
        Ok(Self {
            counter: CurlCounter::new(curl)?,
            gestures: GestureDetector::new(th.clone()),
            th,
            state: State::Waiting,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            State::Waiting => SessionPhase::Waiting,
            State::Calibrating { .. } => SessionPhase::Calibrating,
            State::Active { .. } => SessionPhase::Active,
        }
    }

    pub fn counter(&self) -> &CurlCounter {
        &self.counter
    }

    pub fn mode(&self) -> CurlMode {
        self.counter.mode()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.counter.baseline()
    }

    /// Timestamp of the frame that finished calibration.
    pub fn started_ms(&self) -> Option<u64> {
        match self.state {
            State::Active { started_ms } => Some(started_ms),
            _ => None,
        }
    }

    /// Back to `Waiting` with counts, baseline and gesture progress cleared.
    /// The selected mode is kept.
    pub fn reset(&mut self) {
        self.counter.reset();
        self.gestures.clear();
        self.state = State::Waiting;
    }

    pub fn process(&mut self, frame: &Frame) -> SessionReading {
        let mut required = ARM_JOINTS.to_vec();
        required.push(Joint::Nose);

        let min_confidence = self.counter.min_confidence();
        let Some(pose) = select(&frame.keypoints, &required, min_confidence) else {
            let reading = Reading::insufficient(self.counter.count());
            return self.snapshot(frame.t_ms, reading, Vec::new());
        };

        let mut events = Vec::new();
        let mut reading = self.idle_reading();

        match &mut self.state {
            State::Waiting => {
                if arms_crossed(&pose, self.th.cross_ratio) {
                    self.state = State::Calibrating {
                        samples: Vec::with_capacity(self.th.calibration_frames),
                    };
                    events.push(SessionEvent::CalibrationStarted);
                }
            }
            State::Calibrating { samples } => {
                samples.push(shoulder_tilt(&pose));
                if samples.len() >= self.th.calibration_frames {
                    let baseline = mean_direction(samples);
                    self.counter.set_baseline(Some(baseline));
                    self.state = State::Active {
                        started_ms: frame.t_ms,
                    };
                    events.push(SessionEvent::Activated { baseline });
                }
            }
            State::Active { .. } => {
                let (r, left, right) = self.counter.process_pose(&pose);
                reading = r;
                if left == Transition::Counted {
                    events.push(SessionEvent::Rep { side: Side::Left });
                }
                if right == Transition::Counted {
                    events.push(SessionEvent::Rep { side: Side::Right });
                }

                match self.gestures.update(&pose) {
                    Some(Gesture::SelectMode(mode)) if mode != self.counter.mode() => {
                        self.counter.set_mode(mode);
                        events.push(SessionEvent::ModeChanged { mode });
                    }
                    Some(Gesture::Reset) => {
                        self.reset();
                        reading = self.idle_reading();
                        events.push(SessionEvent::Reset);
                    }
                    _ => {}
                }
            }
        }

        self.snapshot(frame.t_ms, reading, events)
    }

    fn idle_reading(&self) -> Reading {
        Reading {
            angle: None,
            feedback: self.counter.phase().into(),
            count: self.counter.count(),
        }
    }

    fn snapshot(&self, now: u64, reading: Reading, events: Vec<SessionEvent>) -> SessionReading {
        SessionReading {
            phase: self.phase(),
            mode: self.counter.mode(),
            reading,
            left_count: self.counter.left_count(),
            right_count: self.counter.right_count(),
            left_angle: self.counter.left_angle(),
            right_angle: self.counter.right_angle(),
            posture_alert: self.counter.posture_alert(),
            elapsed_ms: self.started_ms().map(|s| now.saturating_sub(s)),
            events,
        }
    }
}

/// Mean of tilt samples, taken around the first one so readings that
/// straddle ±180° do not cancel out.
fn mean_direction(samples: &[f32]) -> f32 {
    let Some(&first) = samples.first() else {
        return 0.0;
    };
    let total: f32 = samples.iter().map(|s| tilt_difference(*s, first)).sum();
    let offset = total / samples.len() as f32;
    tilt_difference(first + offset, 0.0)
}
