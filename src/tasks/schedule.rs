//! Schedule specifications
//! Mission: parse `@every D` interval specs and cron expressions into a
//! common "next fire time" abstraction (spec section 4.6).

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScheduleSpec {
    Interval(Duration),
    Cron(CronSchedule),
}

impl ScheduleSpec {
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        if let Some(rest) = spec.strip_prefix("@every ") {
            let duration = parse_duration(rest.trim())?;
            return Ok(ScheduleSpec::Interval(duration));
        }
        let schedule = CronSchedule::from_str(spec)
            .map_err(|e| anyhow::anyhow!("invalid cron expression {spec:?}: {e}"))?;
        Ok(ScheduleSpec::Cron(schedule))
    }

    /// Time until the next fire, measured from `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            ScheduleSpec::Interval(d) => Some(*d),
            ScheduleSpec::Cron(schedule) => schedule
                .after(&now)
                .next()
                .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO)),
        }
    }
}

/// Parses a Go-style duration string (`30s`, `5m`, `1h`) — the format
/// `@every` specs use.
fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| anyhow::anyhow!("missing duration unit in {s:?}"))?;
    let (number, unit) = s.split_at(split_at);
    let amount: u64 = number.parse().map_err(|_| anyhow::anyhow!("invalid duration number in {s:?}"))?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        other => anyhow::bail!("unsupported duration unit {other:?}"),
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_style_intervals() {
        let spec = ScheduleSpec::parse("@every 30s").unwrap();
        assert!(matches!(spec, ScheduleSpec::Interval(d) if d == Duration::from_secs(30)));

        let spec = ScheduleSpec::parse("@every 5m").unwrap();
        assert!(matches!(spec, ScheduleSpec::Interval(d) if d == Duration::from_secs(300)));
    }

    #[test]
    fn parses_cron_expressions() {
        let spec = ScheduleSpec::parse("0 0 * * * *").unwrap();
        assert!(matches!(spec, ScheduleSpec::Cron(_)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(ScheduleSpec::parse("not a schedule").is_err());
    }
}
