//! Pull-based frame loop: one frame in, one reading out.

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    io::{BufRead, Lines, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::config::Profile;
use crate::counters::{Exercise, Feedback, Reading, RepCounter, build_counter};
use crate::keypoints::Frame;
use crate::session::{CurlSession, SessionEvent, SessionReading};

/// Frames from a JSON-lines source. Blank lines are ignored and malformed
/// ones are skipped with a warning; a read error ends the stream.
pub struct FrameReader<R> {
    lines: Lines<R>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) => {
                    warn!("frame source read failed: {e}");
                    return None;
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Frame>(&line) {
                Ok(f) => return Some(f),
                Err(e) => {
                    self.skipped += 1;
                    warn!("skipping malformed frame on line {}: {e}", self.line_no);
                }
            }
        }
    }
}

/// What drives the frames: curls go through the full session controller.
pub enum Tracker {
    Session(CurlSession),
    Counter(Box<dyn RepCounter>),
}

impl Tracker {
    pub fn build(exercise: Exercise, profile: &Profile) -> Result<Self> {
        Ok(match exercise {
            Exercise::Curls => {
                let session = CurlSession::new(profile.curl.clone(), profile.session.clone())?;
                Tracker::Session(session)
            }
            other => Tracker::Counter(build_counter(other, profile)?),
        })
    }

    pub fn count(&self) -> u32 {
        match self {
            Tracker::Session(s) => s.counter().count(),
            Tracker::Counter(c) => c.count(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Tracker::Session(s) => s.reset(),
            Tracker::Counter(c) => c.reset(),
        }
    }
}

#[derive(Serialize)]
struct CounterLine {
    t_ms: u64,
    angle: Option<f32>,
    feedback: &'static str,
    count: u32,
}

#[derive(Serialize)]
struct SessionLine<'a> {
    t_ms: u64,
    feedback: &'static str,
    instruction: &'static str,
    #[serde(flatten)]
    reading: &'a SessionReading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub exercise: Exercise,
    pub reps: u32,
    pub duration_sec: f32,
    pub mode: String,
    pub frames: u64,
}

/// Drives `tracker` until the frames run out or `stop` is raised, then
/// resets it. With `emit`, each reading is written to `out` as a JSON line.
pub fn run<I, W>(
    exercise: Exercise,
    tracker: &mut Tracker,
    frames: I,
    out: &mut W,
    emit: bool,
    stop: &AtomicBool,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Frame>,
    W: Write,
{
    info!("{exercise}: session started");

    let mut n: u64 = 0;
    let mut first_ms: Option<u64> = None;
    let mut last_ms: u64 = 0;
    let mut last_feedback: Option<Feedback> = None;
    let mut last_count = 0;

    for frame in frames {
        if stop.load(Ordering::Relaxed) {
            info!("{exercise}: stop requested");
            break;
        }
        n += 1;
        first_ms.get_or_insert(frame.t_ms);
        last_ms = frame.t_ms;

        let reading = match tracker {
            Tracker::Session(s) => {
                let r = s.process(&frame);
                log_events(&r.events);
                if emit {
                    let line = SessionLine {
                        t_ms: frame.t_ms,
                        feedback: r.reading.feedback.label(),
                        instruction: r.phase.instruction(),
                        reading: &r,
                    };
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                if r.posture_alert {
                    debug!("posture drifted from baseline");
                }
                r.reading
            }
            Tracker::Counter(c) => {
                let r = c.process(&frame);
                if r.count > last_count {
                    info!("{exercise}: rep {}", r.count);
                }
                if emit {
                    let line = CounterLine {
                        t_ms: frame.t_ms,
                        angle: r.angle,
                        feedback: r.feedback.label(),
                        count: r.count,
                    };
                    writeln!(out, "{}", serde_json::to_string(&line)?)?;
                }
                r
            }
        };

        note_feedback(&mut last_feedback, &reading);
        last_count = reading.count;
    }

    let (reps, start_ms, mode) = match tracker {
        Tracker::Session(s) => (s.counter().count(), s.started_ms(), s.mode().to_string()),
        Tracker::Counter(c) => (c.count(), first_ms, "default".to_string()),
    };
    let duration_sec = start_ms
        .map(|s| last_ms.saturating_sub(s) as f32 / 1000.0)
        .unwrap_or(0.0);

    info!("{exercise}: session ended after {n} frames, {reps} reps in {duration_sec:.1}s");
    tracker.reset();

    Ok(RunSummary {
        exercise,
        reps,
        duration_sec,
        mode,
        frames: n,
    })
}

fn note_feedback(last: &mut Option<Feedback>, reading: &Reading) {
    if *last != Some(reading.feedback) {
        debug!("feedback: {}", reading.feedback);
        *last = Some(reading.feedback);
    }
}

fn log_events(events: &[SessionEvent]) {
    for e in events {
        match e {
            SessionEvent::CalibrationStarted => info!("curls: arms crossed, calibrating"),
            SessionEvent::Activated { baseline } => {
                info!("curls: calibrated, shoulder baseline {baseline:.1}°")
            }
            SessionEvent::Rep { side } => info!("curls: {side:?} rep"),
            SessionEvent::ModeChanged { mode } => info!("curls: mode -> {mode}"),
            SessionEvent::Reset => info!("curls: reset gesture, back to waiting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn squat_line(t: u64, hip_knee_ankle: [(f32, f32); 3]) -> String {
        let mut kps = vec![[0.0f32, 0.0, 1.0]; 17];
        kps[5] = [200.0, 150.0, 1.0];
        kps[11] = [hip_knee_ankle[0].0, hip_knee_ankle[0].1, 1.0];
        kps[13] = [hip_knee_ankle[1].0, hip_knee_ankle[1].1, 1.0];
        kps[15] = [hip_knee_ankle[2].0, hip_knee_ankle[2].1, 1.0];
        serde_json::json!({"t_ms": t, "keypoints": kps}).to_string()
    }

    #[test]
    fn reader_skips_bad_lines() {
        let src = "{\"t_ms\":1,\"keypoints\":[]}\n\nnot json\n{\"t_ms\":2,\"keypoints\":[]}\n";
        let mut r = FrameReader::new(Cursor::new(src));
        let ts: Vec<u64> = r.by_ref().map(|f| f.t_ms).collect();
        assert_eq!(ts, vec![1, 2]);
        assert_eq!(r.skipped(), 1);
    }

    #[test]
    fn run_counts_and_emits() {
        let standing = [(200.0, 300.0), (200.0, 400.0), (200.0, 500.0)];
        let deep = [(200.0, 300.0), (200.0, 400.0), (300.0, 400.0)];
        let src = [
            squat_line(0, standing),
            squat_line(1000, deep),
            squat_line(2000, deep),
            squat_line(3000, standing),
            squat_line(4000, standing),
        ]
        .join("\n");

        let mut profile = Profile::default();
        profile.squat.smoothing_window = 1;
        let mut tracker = Tracker::build(Exercise::Squats, &profile).unwrap();
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let summary = run(
            Exercise::Squats,
            &mut tracker,
            FrameReader::new(Cursor::new(src)),
            &mut out,
            true,
            &stop,
        )
        .unwrap();

        assert_eq!(summary.reps, 1);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.duration_sec, 4.0);
        // ended sessions are reset
        assert_eq!(tracker.count(), 0);

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1]["feedback"], "Down");
        assert_eq!(lines[4]["count"], 1);
    }

    #[test]
    fn stop_flag_ends_early() {
        let profile = Profile::default();
        let mut tracker = Tracker::build(Exercise::Pushups, &profile).unwrap();
        let stop = AtomicBool::new(true);
        let frames = vec![Frame::default(); 3];
        let summary = run(
            Exercise::Pushups,
            &mut tracker,
            frames,
            &mut std::io::sink(),
            false,
            &stop,
        )
        .unwrap();
        assert_eq!(summary.frames, 0);
    }
}
