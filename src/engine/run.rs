use std::io::BufRead;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::types::{CancelToken, CommandResult, EngineCommand, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long output readers may keep draining after the process was killed.
/// A descendant that left the process group can hold the pipes open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Spawn an engine process and return a channel that streams its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`Stderr`] as they arrive,
/// followed by exactly one [`OutputLine::Done`] carrying the final result.
/// An `Err` means the process could not be launched at all.
pub fn spawn(cmd: EngineCommand, cancel: CancelToken) -> Result<Receiver<OutputLine>> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &cmd.current_dir {
        command.current_dir(dir);
    }
    // Own process group: the terminal's Ctrl-C reaches only us, and a kill
    // takes down helper processes (CLI plugins, wrapper scripts) as well.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().with_context(|| {
        format!(
            "failed to invoke `{}`, is it installed and on PATH?",
            cmd.program
        )
    })?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        supervise(child, stdout, stderr, tx, cancel, cmd.timeout);
    });

    Ok(rx)
}

/// Run an engine process to completion, handing every output line to
/// `on_line` as it arrives.
pub fn execute(
    cmd: EngineCommand,
    cancel: &CancelToken,
    mut on_line: impl FnMut(&str),
) -> Result<CommandResult> {
    let rx = spawn(cmd, cancel.clone())?;

    for line in rx {
        match line {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => on_line(&s),
            OutputLine::Done(result) => return Ok(result),
        }
    }

    // Supervisor thread died without reporting.
    Ok(CommandResult {
        success: false,
        ..CommandResult::default()
    })
}

fn supervise(
    mut child: std::process::Child,
    stdout: std::process::ChildStdout,
    stderr: std::process::ChildStderr,
    tx: Sender<OutputLine>,
    cancel: CancelToken,
    timeout: Duration,
) {
    let log_buf = std::sync::Arc::new(std::sync::Mutex::new(String::new()));

    // --- reader threads ---------------------------------------------------
    let stdout_handle = forward_lines(stdout, tx.clone(), log_buf.clone(), OutputLine::Stdout);
    let stderr_handle = forward_lines(stderr, tx.clone(), log_buf.clone(), OutputLine::Stderr);

    // --- poll loop ---------------------------------------------------------
    let start = Instant::now();
    let mut cancelled = false;
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if cancel.is_cancelled() {
            cancelled = true;
            terminate(&mut child);
            break None;
        }

        if start.elapsed() > timeout {
            timed_out = true;
            terminate(&mut child);
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    // --- finalize ----------------------------------------------------------
    if cancelled || timed_out {
        let deadline = Instant::now() + DRAIN_GRACE;
        while !(stdout_handle.is_finished() && stderr_handle.is_finished())
            && Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(20));
        }
        // Readers still blocked past the grace period are left detached.
        for handle in [stdout_handle, stderr_handle] {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    } else {
        let _ = stdout_handle.join();
        let _ = stderr_handle.join();
    }

    let exit_code = exit_status.and_then(|s| s.code());
    let log = log_buf.lock().map(|b| b.clone()).unwrap_or_default();

    let _ = tx.send(OutputLine::Done(CommandResult {
        success: exit_code == Some(0),
        exit_code,
        log,
        cancelled,
        timed_out,
    }));
}

/// Kill the child together with everything in its process group.
fn terminate(child: &mut std::process::Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal. The child leads its own group
            // (process_group(0) at spawn), so the group id equals its pid.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn forward_lines<R>(
    pipe: R,
    tx: Sender<OutputLine>,
    log_buf: std::sync::Arc<std::sync::Mutex<String>>,
    wrap: fn(String) -> OutputLine,
) -> std::thread::JoinHandle<()>
where
    R: std::io::Read + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = std::io::BufReader::new(pipe);
        for line in reader.lines() {
            let Ok(l) = line else { break };
            if let Ok(mut buf) = log_buf.lock() {
                buf.push_str(&l);
                buf.push('\n');
            }
            // Receiver may be dropped, ignore send errors.
            let _ = tx.send(wrap(l));
        }
    })
}
