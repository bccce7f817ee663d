//! Rep counters: one hysteresis machine per tracked angle plus per-exercise gating.

pub mod curl;
pub mod pushup;
pub mod squat;

use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::config::Profile;
use crate::error::ConfigError;
use crate::keypoints::Frame;

pub use curl::{CurlCounter, CurlMode};
pub use pushup::PushupCounter;
pub use squat::SquatCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Curls,
    Pushups,
    Squats,
}

impl Exercise {
    pub fn name(self) -> &'static str {
        match self {
            Exercise::Curls => "bicep_curls",
            Exercise::Pushups => "pushups",
            Exercise::Squats => "squats",
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exercise {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "curl" | "curls" | "bicep_curls" | "bicep-curls" => Ok(Exercise::Curls),
            "pushup" | "pushups" | "push-ups" => Ok(Exercise::Pushups),
            "squat" | "squats" => Ok(Exercise::Squats),
            other => Err(format!("unknown exercise: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Extended, waiting for the bend.
    Up,
    /// Bent, waiting for the extension that completes the rep.
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feedback {
    Up,
    Down,
    FixAlignment,
    FixTorso,
    InsufficientKeypoints,
}

impl Feedback {
    pub fn label(self) -> &'static str {
        match self {
            Feedback::Up => "Up",
            Feedback::Down => "Down",
            Feedback::FixAlignment => "Fix Alignment",
            Feedback::FixTorso => "Fix Torso",
            Feedback::InsufficientKeypoints => "Insufficient keypoints detected",
        }
    }
}

impl From<Phase> for Feedback {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Up => Feedback::Up,
            Phase::Down => Feedback::Down,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a counter reports for one frame; the values an overlay would render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Smoothed primary angle, `None` when the frame was rejected.
    pub angle: Option<f32>,
    pub feedback: Feedback,
    pub count: u32,
}

impl Reading {
    pub fn insufficient(count: u32) -> Self {
        Self {
            angle: None,
            feedback: Feedback::InsufficientKeypoints,
            count,
        }
    }
}

pub trait RepCounter {
    fn exercise(&self) -> Exercise;
    fn process(&mut self, frame: &Frame) -> Reading;
    fn reset(&mut self);
    fn count(&self) -> u32;
    fn phase(&self) -> Phase;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Crossed below `bent`.
    Lowered,
    /// Crossed above `extended` and the rep was counted.
    Counted,
    /// Crossed above `extended` but the rep was refused.
    Suppressed,
}

/// Two-phase machine over a smoothed angle.
///
/// `Up → Down` when the angle drops below `bent`; `Down → Up` when it rises
/// above `extended`, which is the only edge that counts. The band between the
/// two thresholds never changes the phase.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    bent: f32,
    extended: f32,
    phase: Phase,
    count: u32,
}

impl Hysteresis {
    pub fn new(bent: f32, extended: f32) -> Self {
        Self {
            bent,
            extended,
            phase: Phase::Up,
            count: 0,
        }
    }

    pub fn step(&mut self, angle: f32) -> Transition {
        self.step_with(angle, true)
    }

    /// Like `step`, but a completing crossing with `rep_allowed == false`
    /// returns to `Up` without counting.
    pub fn step_with(&mut self, angle: f32, rep_allowed: bool) -> Transition {
        match self.phase {
            Phase::Up if angle < self.bent => {
                self.phase = Phase::Down;
                Transition::Lowered
            }
            Phase::Down if angle > self.extended => {
                self.phase = Phase::Up;
                if rep_allowed {
                    self.count += 1;
                    Transition::Counted
                } else {
                    Transition::Suppressed
                }
            }
            _ => Transition::None,
        }
    }

    /// Drops a pending `Down` without counting.
    pub fn release(&mut self) {
        self.phase = Phase::Up;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Up;
        self.count = 0;
    }
}

/// Builds the standalone counter for an exercise from the profile.
pub fn build_counter(
    exercise: Exercise,
    profile: &Profile,
) -> Result<Box<dyn RepCounter>, ConfigError> {
    Ok(match exercise {
        Exercise::Curls => Box::new(CurlCounter::new(profile.curl.clone())?),
        Exercise::Pushups => Box::new(PushupCounter::new(profile.pushup.clone())?),
        Exercise::Squats => Box::new(SquatCounter::new(profile.squat.clone())?),
    })
}
