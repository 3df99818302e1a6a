// src/executor/run.rs
//
// Runs one self-contained unit in a scratch directory with a wall-clock
// bound. The scratch directory lives exactly as long as this call, and so
// does every process the unit starts.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::executor::SandboxConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const UNIT_FILE_STEM: &str = "candidate";
const OUTPUT_FILE: &str = "output.log";

#[derive(Debug)]
pub enum UnitExit {
    Exited(ExitStatus),
    TimedOut,
    /// Could not be started or waited on.
    Crashed(String),
}

#[derive(Debug)]
pub struct UnitRun {
    pub exit: UnitExit,
    /// Combined stdout + stderr.
    pub output: String,
    pub duration_ms: u64,
}

pub fn run_unit(cfg: &SandboxConfig, source: &str) -> UnitRun {
    let started = Instant::now();

    // Dropping `dir` removes everything inside it, on every return path.
    let dir = match scratch_dir(cfg) {
        Ok(d) => d,
        Err(e) => return crashed(started, format!("scratch directory: {e}")),
    };

    let unit_path = dir.path().join(format!("{UNIT_FILE_STEM}{}", cfg.file_suffix));
    if let Err(e) = fs::write(&unit_path, source) {
        return crashed(started, format!("write unit: {e}"));
    }

    let output_path = dir.path().join(OUTPUT_FILE);
    let exit = match spawn_and_wait(cfg, dir.path(), &unit_path, &output_path) {
        Ok(exit) => exit,
        Err(e) => UnitExit::Crashed(e),
    };

    let mut output = fs::read(&output_path)
        .map(|b| String::from_utf8_lossy(&b).trim().to_string())
        .unwrap_or_default();

    match &exit {
        UnitExit::TimedOut => {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!(
                "Execution timed out after {}s",
                cfg.timeout.as_secs_f32()
            ));
        }
        UnitExit::Crashed(e) => {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!("Test execution error: {e}"));
        }
        UnitExit::Exited(_) => {}
    }

    UnitRun {
        exit,
        output,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn scratch_dir(cfg: &SandboxConfig) -> std::io::Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("forgerank-");

    match &cfg.scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

fn spawn_and_wait(
    cfg: &SandboxConfig,
    workdir: &Path,
    unit_path: &Path,
    output_path: &Path,
) -> Result<UnitExit, String> {
    let stdout = File::create(output_path).map_err(|e| e.to_string())?;
    let stderr = stdout.try_clone().map_err(|e| e.to_string())?;

    let mut cmd = Command::new(&cfg.program);
    cmd.args(&cfg.args)
        .arg(unit_path)
        .current_dir(workdir)
        .env("PYTHONDONTWRITEBYTECODE", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    own_process_group(&mut cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("failed to start `{}`: {e}", cfg.program))?;

    let deadline = Instant::now() + cfg.timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                // Background processes left behind by the unit.
                kill_process_group(&child);
                return Ok(UnitExit::Exited(status));
            }
            Ok(None) if Instant::now() >= deadline => {
                terminate(&mut child);
                return Ok(UnitExit::TimedOut);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                terminate(&mut child);
                return Err(e.to_string());
            }
        }
    }
}

fn terminate(child: &mut Child) {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// The unit leads its own group, so descendants can be killed with it.
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // ESRCH just means the group is already gone.
    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill_process_group(_: &Child) {}

fn crashed(started: Instant, msg: String) -> UnitRun {
    UnitRun {
        output: format!("Test execution error: {msg}"),
        exit: UnitExit::Crashed(msg),
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
