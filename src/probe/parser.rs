//! Parser for `ping` text output (iputils and BSD/macOS formats).

use regex::Regex;
use std::sync::OnceLock;

/// Statistics read from a ping summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    pub transmitted: u32,
    pub received: u32,
    pub loss_pct: f64,
    /// Average round trip; from the summary line, else the mean of per-reply times.
    pub rtt_avg_ms: Option<f64>,
    /// Hard network error reported alongside the statistics, if any.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PingOutput {
    Parsed(PingStats),
    /// No statistics, but the tool reported a network error.
    HardError(String),
    /// Neither statistics nor a recognizable error; raw text kept.
    Unparseable(String),
}

fn counts_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(\d+) packets transmitted, (\d+) (?:packets )?received,(?: \+\d+ (?:errors|duplicates),)* ([0-9.]+)% packet loss",
        )
        .expect("static regex")
    })
}

fn rtt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:rtt|round-trip) min/avg/max/(?:mdev|stddev) = ([0-9.]+)/([0-9.]+)/([0-9.]+)/([0-9.]+) ms",
        )
        .expect("static regex")
    })
}

fn reply_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"time[=<]([0-9.]+)\s*ms").expect("static regex"))
}

fn failure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(destination host unreachable|destination net unreachable|network is unreachable|no route to host|name or service not known)",
        )
        .expect("static regex")
    })
}

pub fn parse_ping_output(output: &str) -> PingOutput {
    let failure = failure_re()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let Some(caps) = counts_re().captures(output) else {
        return match failure {
            Some(msg) => PingOutput::HardError(msg),
            None => PingOutput::Unparseable(output.to_string()),
        };
    };

    let (Ok(transmitted), Ok(received), Ok(loss_pct)) = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<f64>(),
    ) else {
        return PingOutput::Unparseable(output.to_string());
    };

    let rtt_avg_ms = rtt_re()
        .captures(output)
        .and_then(|c| c[2].parse::<f64>().ok())
        .or_else(|| mean_reply_time(output));

    PingOutput::Parsed(PingStats {
        transmitted,
        received,
        loss_pct,
        rtt_avg_ms,
        failure,
    })
}

fn mean_reply_time(output: &str) -> Option<f64> {
    let times: Vec<f64> = reply_time_re()
        .captures_iter(output)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect();
    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }
}
