//! Process Session
//!
//! Owns one child process's lifecycle and raw I/O: spawning the target on
//! a pseudo-terminal, feeding it bytes, accumulating its output, and
//! blocking waits for expected content with bounded timeouts.
//!
//! A session is driven by exactly one caller; all methods take `&mut self`
//! so exclusive access is enforced by the type system rather than by
//! internal locking. Independent sessions share no state.

use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use regex::Regex;

use crate::error::{HarnessError, Result};
use crate::keys::{self, KeyAction};
use crate::pty::{Geometry, Pty};
use crate::screen::{reconstruct, ScreenSnapshot};

/// Lifecycle state of a [`Session`]
///
/// `NotStarted` -> `Running` -> `Stopped`. A stopped session is not
/// restarted in place; a new `start` replaces the process wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Stopped,
}

/// Configuration for a [`Session`]
///
/// Passed in explicitly at construction; the harness keeps no process-wide
/// defaults.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed terminal geometry for the spawned program
    pub geometry: Geometry,
    /// Default timeout for [`Session::wait_for`]
    pub timeout: Duration,
    /// How often wait loops re-check output and liveness
    pub poll_interval: Duration,
    /// How long to wait after the interrupt key before escalating
    pub interrupt_grace: Duration,
    /// How long to wait after SIGTERM (and again after SIGKILL)
    pub terminate_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
            interrupt_grace: Duration::from_secs(1),
            terminate_grace: Duration::from_millis(500),
        }
    }
}

/// One running instance of the target program.
///
/// Owns the process handle exclusively, together with the raw output
/// accumulated since `start` and the read cursor used by pattern waits.
pub struct Session {
    config: SessionConfig,
    /// The owned child process, if any
    pty: Option<Pty>,
    state: SessionState,
    /// Raw output accumulated since the last `start`; append-only
    raw: Vec<u8>,
    /// Byte offset just past the last matched pattern: content before it
    /// is consumed and not re-matched
    search_from: usize,
}

impl Session {
    /// Create a session with the given configuration. No process is
    /// spawned until [`Session::start`].
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            pty: None,
            state: SessionState::NotStarted,
            raw: Vec::new(),
            search_from: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// PID of the owned child, if a process handle is held
    pub fn pid(&self) -> Option<i32> {
        self.pty.as_ref().map(|pty| pty.child_pid().as_raw())
    }

    /// Spawn the target program attached to a fresh pty.
    ///
    /// If a process is already owned it is terminated and released first
    /// (restart by replacement, never in place). The output buffer and
    /// read cursor are reset.
    pub fn start(&mut self, command: &str, args: &[&str], env_overrides: &[(&str, &str)]) -> Result<()> {
        if self.pty.is_some() {
            self.close()?;
        }

        let pty = Pty::spawn(command, args, env_overrides, self.config.geometry).map_err(|source| {
            HarnessError::Spawn {
                command: command.to_string(),
                source,
            }
        })?;

        self.raw.clear();
        self.search_from = 0;
        self.pty = Some(pty);
        self.state = SessionState::Running;
        tracing::debug!(command, "session running");
        Ok(())
    }

    /// Whether the owned process is still alive. Non-blocking.
    pub fn is_running(&mut self) -> bool {
        self.pty.as_mut().map(|pty| pty.is_alive()).unwrap_or(false)
    }

    /// Write raw bytes to the target's input stream.
    ///
    /// Fails with [`HarnessError::NotRunning`] before `start` or after the
    /// process has exited. No implicit delay: callers pacing a slow target
    /// do their own settling.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.live_pty()?.write_all(data)?;
        Ok(())
    }

    /// Send a symbolic key action
    pub fn send_key(&mut self, key: KeyAction) -> Result<()> {
        self.send_bytes(key.encode())
    }

    /// Send literal text, untranslated
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_bytes(keys::encode_text(text))
    }

    /// Block until `pattern` (a regular expression) appears in the output,
    /// or `timeout` elapses.
    ///
    /// On a match the read cursor advances past it and the matched region
    /// is returned; already-consumed content is never re-matched, so a
    /// repeated wait for the same literal text needs an intervening state
    /// change in the target. Timeout raises [`HarnessError::Timeout`];
    /// a process exit during the wait raises [`HarnessError::ProcessEnded`]
    /// so callers can tell a hang from a crash.
    pub fn wait_for_pattern(&mut self, pattern: &str, timeout: Duration) -> Result<String> {
        let re = Regex::new(pattern)?;
        let (_, matched) = self.wait_internal(std::slice::from_ref(&re), pattern, timeout)?;
        Ok(matched)
    }

    /// [`Session::wait_for_pattern`] with the configured default timeout
    pub fn wait_for(&mut self, pattern: &str) -> Result<String> {
        self.wait_for_pattern(pattern, self.config.timeout)
    }

    /// Block until any of `patterns` matches; returns the index of the
    /// winning pattern and the matched region. When several patterns have
    /// a match pending, the earliest match in the stream wins.
    pub fn wait_for_any(&mut self, patterns: &[&str], timeout: Duration) -> Result<(usize, String)> {
        let mut regexes = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            regexes.push(Regex::new(pattern)?);
        }
        let display = patterns.join("|");
        self.wait_internal(&regexes, &display, timeout)
    }

    /// Boolean convenience around [`Session::wait_for_pattern`]: `false`
    /// on timeout instead of an error. Transport failures (including the
    /// process exiting mid-wait) still propagate.
    pub fn wait_for_screen(&mut self, pattern: &str, timeout: Duration) -> Result<bool> {
        match self.wait_for_pattern(pattern, timeout) {
            Ok(_) => Ok(true),
            Err(HarnessError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reconstruct the current screen from everything captured so far
    pub fn snapshot(&self) -> ScreenSnapshot {
        reconstruct(&String::from_utf8_lossy(&self.raw))
    }

    /// The accumulated raw output, lossily decoded. For diagnostics.
    pub fn raw_output(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Shut the target down, gently first.
    ///
    /// Sends the interrupt key and gives the process a grace period; if it
    /// survives, escalates to SIGTERM, then SIGKILL, each step only if the
    /// previous one did not result in exit. Idempotent: stopping an
    /// already-stopped session is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        let interrupt_grace = self.config.interrupt_grace;
        let terminate_grace = self.config.terminate_grace;
        let poll_interval = self.config.poll_interval;

        let Some(pty) = self.pty.as_mut() else {
            return Ok(());
        };
        if !pty.is_alive() {
            self.state = SessionState::Stopped;
            return Ok(());
        }

        // As a user would: ^C first. A write failure here just means the
        // target is already on its way out.
        let _ = pty.write_all(KeyAction::Interrupt.encode());
        if !wait_for_exit(pty, interrupt_grace, poll_interval) {
            tracing::debug!("target survived interrupt, escalating to SIGTERM");
            pty.signal(Signal::SIGTERM)?;
            if !wait_for_exit(pty, terminate_grace, poll_interval) {
                tracing::debug!("target survived SIGTERM, escalating to SIGKILL");
                pty.signal(Signal::SIGKILL)?;
                let _ = wait_for_exit(pty, terminate_grace, poll_interval);
            }
        }

        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Release the owned process unconditionally.
    ///
    /// Implies [`Session::stop`] if the process is still running; the
    /// handle is reaped and dropped either way. Dropping the session calls
    /// this too, so a panicking test cannot leak the target process.
    pub fn close(&mut self) -> Result<()> {
        if self.pty.is_some() {
            self.stop()?;
            // Dropping the handle reaps (or force-kills) whatever is left
            self.pty = None;
            self.state = SessionState::Stopped;
        }
        Ok(())
    }

    fn live_pty(&mut self) -> Result<&Pty> {
        if let Some(pty) = self.pty.as_mut() {
            if pty.is_alive() {
                return Ok(&*pty);
            }
        }
        Err(HarnessError::NotRunning)
    }

    /// Pull everything currently readable off the pty into the buffer
    fn drain_output(&mut self) -> Result<()> {
        let Session { pty, raw, .. } = self;
        let Some(pty) = pty.as_ref() else {
            return Err(HarnessError::NotRunning);
        };
        let mut chunk = [0u8; 4096];
        loop {
            let n = pty.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    /// Search unconsumed output for the earliest match among `regexes`;
    /// on a hit, consume through the end of the match.
    fn match_and_consume(&mut self, regexes: &[Regex]) -> Option<(usize, String)> {
        let decoded = String::from_utf8_lossy(&self.raw);
        let window = decoded.get(self.search_from..)?;

        let mut best: Option<(usize, regex::Match<'_>)> = None;
        for (index, re) in regexes.iter().enumerate() {
            if let Some(m) = re.find(window) {
                let earlier = best
                    .as_ref()
                    .map_or(true, |(_, held)| m.start() < held.start());
                if earlier {
                    best = Some((index, m));
                }
            }
        }

        let (index, m) = best?;
        let matched = m.as_str().to_string();
        self.search_from += m.end();
        Some((index, matched))
    }

    fn wait_internal(
        &mut self,
        regexes: &[Regex],
        pattern_str: &str,
        timeout: Duration,
    ) -> Result<(usize, String)> {
        if self.pty.is_none() {
            return Err(HarnessError::NotRunning);
        }

        let deadline = Instant::now() + timeout;
        loop {
            self.drain_output()?;
            if let Some(hit) = self.match_and_consume(regexes) {
                return Ok(hit);
            }

            let alive = self.pty.as_mut().map(|pty| pty.is_alive()).unwrap_or(false);
            if !alive {
                // Output can land between the last drain and the exit
                self.drain_output()?;
                if let Some(hit) = self.match_and_consume(regexes) {
                    return Ok(hit);
                }
                tracing::warn!(pattern = %pattern_str, "process exited during wait");
                return Err(HarnessError::ProcessEnded {
                    pattern: pattern_str.to_string(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                let snapshot = self.snapshot();
                tracing::warn!(
                    pattern = %pattern_str,
                    timeout_ms = timeout.as_millis() as u64,
                    snapshot = %snapshot.to_text(),
                    "timed out waiting for pattern"
                );
                return Err(HarnessError::Timeout {
                    pattern: pattern_str.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            let wait = (deadline - now).min(self.config.poll_interval);
            if let Some(pty) = self.pty.as_ref() {
                pty.poll_read(wait.as_millis().max(1) as i32)?;
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Poll liveness until the child exits or the grace period runs out.
/// Returns true if the child is gone.
fn wait_for_exit(pty: &mut Pty, grace: Duration, poll_interval: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        if !pty.is_alive() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(poll_interval);
    }
}
