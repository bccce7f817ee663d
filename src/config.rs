use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::ConfigError;

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// How a counter treats its secondary alignment signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentCheck {
    /// Bad alignment blocks counting and is reported.
    Enforce,
    /// Bad alignment is reported, counting proceeds.
    Advisory,
    /// Alignment is not measured.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurlThresholds {
    pub bent: f32,
    pub extended: f32,
    pub smoothing_window: usize,
    /// Allowed shoulder-tilt drift from the calibrated baseline, degrees.
    pub posture_tolerance: f32,
    pub min_confidence: f32,
}

impl Default for CurlThresholds {
    fn default() -> Self {
        Self {
            bent: 50.0,
            extended: 160.0,
            smoothing_window: 5,
            posture_tolerance: 5.0,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushupThresholds {
    pub bent: f32,
    pub extended: f32,
    pub smoothing_window: usize,
    /// Max deviation of the torso line from horizontal, degrees.
    pub max_torso_tilt: f32,
    pub alignment: AlignmentCheck,
    pub min_confidence: f32,
}

impl Default for PushupThresholds {
    fn default() -> Self {
        Self {
            bent: 90.0,
            extended: 160.0,
            smoothing_window: 5,
            max_torso_tilt: 30.0,
            alignment: AlignmentCheck::Enforce,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquatThresholds {
    pub bent: f32,
    pub extended: f32,
    pub smoothing_window: usize,
    /// Max deviation of shoulder→hip from vertical, degrees.
    pub max_torso_lean: f32,
    pub alignment: AlignmentCheck,
    pub min_rep_interval_ms: u64,
    pub min_confidence: f32,
}

impl Default for SquatThresholds {
    fn default() -> Self {
        Self {
            bent: 120.0,
            extended: 165.0,
            smoothing_window: 3,
            max_torso_lean: 20.0,
            alignment: AlignmentCheck::Enforce,
            min_rep_interval_ms: 500,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionThresholds {
    pub calibration_frames: usize,
    /// Consecutive frames a gesture must be held; fires once exceeded.
    pub gesture_frames: u32,
    /// Outward wrist displacement from the shoulder that selects an arm, pixels.
    pub mode_offset_px: f32,
    /// Wrist to opposite shoulder distance, as a fraction of shoulder width,
    /// below which the arms count as crossed.
    pub cross_ratio: f32,
}

impl Default for SessionThresholds {
    fn default() -> Self {
        Self {
            calibration_frames: 30,
            gesture_frames: 30,
            mode_offset_px: 50.0,
            cross_ratio: 0.6,
        }
    }
}

/// Calorie estimate per counted rep, kcal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRates {
    pub curls: f32,
    pub pushups: f32,
    pub squats: f32,
    pub fallback: f32,
}

impl Default for ReportRates {
    fn default() -> Self {
        Self {
            curls: 0.28,
            pushups: 0.29,
            squats: 0.32,
            fallback: 0.30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub curl: CurlThresholds,
    #[serde(default)]
    pub pushup: PushupThresholds,
    #[serde(default)]
    pub squat: SquatThresholds,
    #[serde(default)]
    pub session: SessionThresholds,
    #[serde(default)]
    pub report: ReportRates,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

pub(crate) fn check_band(section: &str, bent: f32, extended: f32) -> Result<()> {
    if !bent.is_finite() || !extended.is_finite() {
        return Err(invalid(format!("{section}: thresholds must be finite")));
    }
    if extended <= bent {
        return Err(invalid(format!(
            "{section}: extended ({extended}) must be greater than bent ({bent})"
        )));
    }
    Ok(())
}

pub(crate) fn check_window(section: &str, window: usize) -> Result<()> {
    if window == 0 {
        return Err(invalid(format!(
            "{section}: smoothing_window must be positive"
        )));
    }
    Ok(())
}

pub(crate) fn check_confidence(section: &str, c: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&c) {
        return Err(invalid(format!(
            "{section}: min_confidence must be in [0,1]"
        )));
    }
    Ok(())
}

pub(crate) fn check_tolerance(section: &str, key: &str, v: f32) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(invalid(format!(
            "{section}.{key} must be a non-negative number"
        )));
    }
    Ok(())
}

impl CurlThresholds {
    pub fn validate(&self) -> Result<()> {
        check_band("curl", self.bent, self.extended)?;
        check_window("curl", self.smoothing_window)?;
        check_tolerance("curl", "posture_tolerance", self.posture_tolerance)?;
        check_confidence("curl", self.min_confidence)
    }
}

impl PushupThresholds {
    pub fn validate(&self) -> Result<()> {
        check_band("pushup", self.bent, self.extended)?;
        check_window("pushup", self.smoothing_window)?;
        check_tolerance("pushup", "max_torso_tilt", self.max_torso_tilt)?;
        check_confidence("pushup", self.min_confidence)
    }
}

impl SquatThresholds {
    pub fn validate(&self) -> Result<()> {
        check_band("squat", self.bent, self.extended)?;
        check_window("squat", self.smoothing_window)?;
        check_tolerance("squat", "max_torso_lean", self.max_torso_lean)?;
        check_confidence("squat", self.min_confidence)
    }
}

impl SessionThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.calibration_frames == 0 || self.gesture_frames == 0 {
            return Err(invalid("session: frame counts must be positive"));
        }
        check_tolerance("session", "mode_offset_px", self.mode_offset_px)?;
        if !(self.cross_ratio > 0.0 && self.cross_ratio.is_finite()) {
            return Err(invalid("session.cross_ratio must be positive"));
        }
        Ok(())
    }
}

impl ReportRates {
    pub fn validate(&self) -> Result<()> {
        for (k, v) in [
            ("curls", self.curls),
            ("pushups", self.pushups),
            ("squats", self.squats),
            ("fallback", self.fallback),
        ] {
            check_tolerance("report", k, v)?;
        }
        Ok(())
    }
}

pub fn validate_profile(p: &Profile) -> Result<()> {
    p.curl.validate()?;
    p.pushup.validate()?;
    p.squat.validate()?;
    p.session.validate()?;
    p.report.validate()
}

fn home_dir() -> Result<PathBuf> {
    UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| invalid("could not determine home directory"))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("repctl"))
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("share").join("repctl"))
}

pub fn runtime_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("run"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// Profile directory plus the pointer naming the active profile.
#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open(config_dir()?)
    }

    pub fn open(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    /// Switches the active profile. Only takes effect for sessions built afterwards.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(ConfigError::ProfileNotFound(p));
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    if !path.exists() {
        return Err(ConfigError::ProfileNotFound(path));
    }
    let txt = fs::read_to_string(&path)?;
    Profile::parse(&txt)
}
