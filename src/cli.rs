use anyhow::{Result, anyhow};
use log::info;
use pico_args::Arguments;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{
    env,
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use crate::config::{self, ConfigState};
use crate::counters::Exercise;
use crate::device::{self, DeviceLock};
use crate::pipeline::{self, FrameReader, Tracker};
use crate::report::{self, WorkoutReport};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("run") => {
            let input: Option<PathBuf> = pargs.opt_value_from_str("--input")?;
            let device: Option<String> = pargs.opt_value_from_str("--device")?;
            let emit = pargs.contains("--emit");
            let no_report = pargs.contains("--no-report");
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: repctl run <curls|pushups|squats> [options]"))?;
            let exercise: Exercise = what.parse().map_err(|e: String| anyhow!(e))?;
            run_workout(exercise, input, device, emit, no_report)
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: repctl use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("show") => {
            let cfg = ConfigState::load_or_install_default()?;
            print_json(&serde_json::json!({
                "active_profile": cfg.active_name,
                "profile": cfg.profile,
            }));
            Ok(())
        }

        Some("history") => {
            let last: usize = pargs.opt_value_from_str("--last")?.unwrap_or(5);
            let all = report::load_reports(&reports_path()?);
            let skip = all.len().saturating_sub(last);
            print_json(&serde_json::json!(&all[skip..]));
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            let reports = reports_path()?;
            let runtime = config::runtime_dir()?;
            print_json(&serde_json::json!({
                "config_dir": cfg.config_dir,
                "profiles": cfg.list_profiles(),
                "active_profile": cfg.active_name,
                "reports": reports,
                "report_count": report::load_reports(&reports).len(),
                "runtime_dir": runtime,
                "stdin_owner": device::owner(&runtime, "stdin"),
            }));
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn reports_path() -> Result<PathBuf> {
    Ok(config::data_dir()?.join("reports.json"))
}

fn run_workout(
    exercise: Exercise,
    input: Option<PathBuf>,
    device: Option<String>,
    emit: bool,
    no_report: bool,
) -> Result<()> {
    let cfg = ConfigState::load_or_install_default()?;
    info!("using profile '{}'", cfg.active_name);

    let device = device.unwrap_or_else(|| match &input {
        Some(p) => p.display().to_string(),
        None => "stdin".to_string(),
    });
    let lease = DeviceLock::acquire(&config::runtime_dir()?, &device)?;

    // first signal asks the loop to stop; a second one while the flag is
    // still set exits, e.g. when blocked on an idle pipe
    let stop = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(sig, 1, Arc::clone(&stop))?;
        signal_hook::flag::register(sig, Arc::clone(&stop))?;
    }

    let source: Box<dyn BufRead> = match &input {
        Some(p) => Box::new(BufReader::new(
            File::open(p)
                .map_err(|e| anyhow!("failed to open {}: {e}", p.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut tracker = Tracker::build(exercise, &cfg.profile)?;
    let mut out = io::stdout().lock();
    let summary = pipeline::run(
        exercise,
        &mut tracker,
        FrameReader::new(source),
        &mut out,
        emit,
        &stop,
    )?;
    drop(lease);

    if no_report {
        return Ok(());
    }
    let report = WorkoutReport::new(
        &cfg.profile.report,
        exercise,
        summary.reps,
        summary.duration_sec,
        &summary.mode,
    );
    report::append_report(&reports_path()?, &report)?;
    if emit {
        eprintln!("{}", serde_json::to_string(&report)?);
    } else {
        print_json(&serde_json::to_value(&report)?);
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"repctl: exercise repetition counter over body keypoint streams

USAGE:
  repctl help [command]                   Show general or command-specific help
  repctl run <curls|pushups|squats>       Count reps from keypoint frames (JSON lines)
        [--input FILE] [--device NAME] [--emit] [--no-report]
  repctl list                             List profiles
  repctl use <name>                       Switch active profile
  repctl show                             Print the active profile
  repctl history [--last N]               Show recent workout reports
  repctl doctor                           Show paths and device status

FRAMES:
  One JSON object per line: {{"t_ms": 1234, "keypoints": [[x, y, confidence], ...]}}
  17 keypoints: nose, eyes, ears, shoulders, elbows, wrists, hips, knees, ankles.

TIPS:
  - Profiles: ~/.config/repctl/profiles
  - Active profile pointer: ~/.config/repctl/active
  - Reports: ~/.local/share/repctl/reports.json
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: repctl run <curls|pushups|squats>\n\
             \x20      [--input FILE] [--device NAME] [--emit] [--no-report]\n\
             Reads frames from FILE (default stdin) until end of input or Ctrl-C.\n\
             Curls: cross arms to start, hold still to calibrate, hold an arm out to pick it,\n\
             raise both hands above your head to reset.\n\
             --emit writes one JSON reading per frame to stdout."
        ),
        "list" => {
            println!("usage: repctl list\nLists available profiles; marks active with '*'.")
        }
        "use" => println!(
            "usage: repctl use <name>\nSwitches the active profile; applies to the next session."
        ),
        "show" => println!("usage: repctl show\nPrints the active profile's thresholds."),
        "history" => println!(
            "usage: repctl history [--last N]\nPrints the last N workout reports (default 5)."
        ),
        "doctor" => println!(
            "usage: repctl doctor\nShows config, report and runtime paths and who holds stdin."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_json(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
