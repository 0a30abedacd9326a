//! Ping probe: runs the system `ping` binary directly (no shell) and parses its output.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::parser::{PingOutput, parse_ping_output};
use super::{ProbeConfig, ProbeError, ProbeResult, Prober, validate_target};

#[derive(Debug, Clone)]
pub struct PingProber {
    config: ProbeConfig,
    program: String,
}

impl PingProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            program: "ping".into(),
        }
    }

    /// Use a different ping executable (absolute path or name on PATH).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, address: &str) -> Result<ProbeResult, ProbeError> {
        let ip = validate_target(address)?;
        let count = self.config.count;

        let child = Command::new(&self.program)
            .arg("-n")
            .arg("-c")
            .arg(count.to_string())
            .arg("-W")
            .arg(wait_arg(self.config.timeout))
            .arg(ip.to_string())
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.config.deadline(), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(ProbeResult::failed(
                    count,
                    &ProbeError::Unreachable(format!("failed to execute {}: {}", self.program, e)),
                ));
            }
            Err(_) => {
                return Ok(ProbeResult::failed(
                    count,
                    &ProbeError::Timeout(self.config.deadline()),
                ));
            }
        };

        // ping exits non-zero on total loss and on usage/network errors; the
        // statistics decide reachability, the exit code only adds context.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            text.push('\n');
            text.push_str(&stderr);
        }

        let parsed = parse_ping_output(&text);
        if !output.status.success() && matches!(parsed, PingOutput::Unparseable(_)) {
            tracing::debug!(
                target_address = %ip,
                status = %output.status,
                "ping failed without statistics"
            );
        }
        Ok(ProbeResult::from_output(&parsed, count))
    }
}

/// Per-reply wait for `-W`: milliseconds on macOS and FreeBSD, whole seconds on Linux iputils.
#[cfg(any(target_os = "macos", target_os = "freebsd"))]
fn wait_arg(timeout: Duration) -> String {
    timeout.as_millis().max(1).to_string()
}

#[cfg(not(any(target_os = "macos", target_os = "freebsd")))]
fn wait_arg(timeout: Duration) -> String {
    timeout.as_secs().max(1).to_string()
}

impl Prober for PingProber {
    async fn probe(&self, address: &str) -> Result<ProbeResult, ProbeError> {
        self.run(address).await
    }

    fn deadline(&self) -> Duration {
        self.config.deadline()
    }

    fn packets_per_probe(&self) -> u32 {
        self.config.count
    }
}
