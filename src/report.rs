//! Workout reports and the JSON history file.

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::config::ReportRates;
use crate::counters::Exercise;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutReport {
    pub workout: String,
    pub user: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub reps: u32,
    pub duration_sec: f32,
    pub mode: String,
    pub calories: f32,
}

pub fn kcal_per_rep(rates: &ReportRates, workout: &str) -> f32 {
    match workout.parse::<Exercise>() {
        Ok(Exercise::Curls) => rates.curls,
        Ok(Exercise::Pushups) => rates.pushups,
        Ok(Exercise::Squats) => rates.squats,
        Err(_) => rates.fallback,
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

impl WorkoutReport {
    pub fn new(
        rates: &ReportRates,
        exercise: Exercise,
        reps: u32,
        duration_sec: f32,
        mode: &str,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            workout: exercise.name().to_string(),
            user: whoami::username(),
            timestamp,
            reps,
            duration_sec: round2(duration_sec),
            mode: mode.to_string(),
            calories: round2(reps as f32 * kcal_per_rep(rates, exercise.name())),
        }
    }
}

/// Reads the history; a missing or unreadable file is an empty history.
pub fn load_reports(path: &Path) -> Vec<WorkoutReport> {
    let Ok(txt) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str(&txt) {
        Ok(v) => v,
        Err(e) => {
            warn!("ignoring unreadable report history {}: {e}", path.display());
            Vec::new()
        }
    }
}

pub fn append_report(path: &Path, report: &WorkoutReport) -> Result<()> {
    let mut all = load_reports(path);
    all.push(report.clone());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(&all)?)?;
    info!(
        "saved {} report: {} reps, {} kcal",
        report.workout, report.reps, report.calories
    );
    Ok(())
}
