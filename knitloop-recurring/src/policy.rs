//! Loop cadence policies.
//!
//! Text form, as accepted by `--policy`:
//!
//! ```text
//! backlog                 drain pending work, then stop
//! forever                 poll again immediately when idle
//! forever:500ms           wait 500ms between idle polls (units: ns us µs ms s m h)
//! until-error(backlog)    any of the above, stopping at the first failed cycle
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::driver::CycleOutcome;

/// How a loop paces itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Never stops on its own; sleeps `cooldown` after an idle or failed cycle.
    Forever { cooldown: Duration },
    /// Stops once a cycle finds no work.
    Backlog,
    /// Same as the inner policy, but a failed cycle stops the loop.
    UntilError(Box<Policy>),
}

/// What the driver does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Start the next cycle right away.
    Continue,
    /// Wait, then start the next cycle.
    Cooldown(Duration),
    /// Stop successfully: nothing is left to do.
    Drained,
    /// Stop with the cycle's error.
    Fail,
}

impl Policy {
    pub fn forever(cooldown: Duration) -> Self {
        Policy::Forever { cooldown }
    }

    /// Wrap in [`Policy::UntilError`]. Already-wrapped policies are returned as is.
    pub fn until_error(self) -> Self {
        match self {
            Policy::UntilError(_) => self,
            other => Policy::UntilError(Box::new(other)),
        }
    }

    pub fn stops_on_error(&self) -> bool {
        matches!(self, Policy::UntilError(_))
    }

    /// Decide the next step after a cycle ended with `outcome`.
    pub fn step(&self, outcome: &CycleOutcome) -> Step {
        match (self, outcome) {
            (Policy::UntilError(_), CycleOutcome::Failed(_)) => Step::Fail,
            (Policy::UntilError(inner), _) => inner.step(outcome),

            (_, CycleOutcome::Processed) => Step::Continue,

            (Policy::Backlog, CycleOutcome::NoWorkAvailable) => Step::Drained,
            (Policy::Backlog, CycleOutcome::Failed(_)) => Step::Continue,

            (Policy::Forever { cooldown }, CycleOutcome::NoWorkAvailable)
            | (Policy::Forever { cooldown }, CycleOutcome::Failed(_)) => Step::Cooldown(*cooldown),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Backlog => f.write_str("backlog"),
            Policy::Forever { cooldown } if cooldown.is_zero() => f.write_str("forever"),
            Policy::Forever { cooldown } => write!(f, "forever:{}", format_duration(*cooldown)),
            Policy::UntilError(inner) => write!(f, "until-error({inner})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePolicyError {
    #[error("unknown policy '{0}'; expected backlog, forever or forever:COOLDOWN")]
    Unknown(String),

    #[error("invalid cooldown '{text}': {reason}")]
    InvalidDuration { text: String, reason: &'static str },
}

impl FromStr for Policy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some(inner) = text
            .strip_prefix("until-error(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return inner.parse::<Policy>().map(Policy::until_error);
        }
        match text {
            "backlog" => Ok(Policy::Backlog),
            "forever" => Ok(Policy::forever(Duration::ZERO)),
            _ => match text.strip_prefix("forever:") {
                Some(cooldown) => parse_duration(cooldown).map(Policy::forever),
                None => Err(ParsePolicyError::Unknown(text.to_owned())),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        _ => return None,
    })
}

/// Parse a duration such as `1m30s`, `1.5s` or `250ms`. A bare `0` is zero.
pub fn parse_duration(text: &str) -> Result<Duration, ParsePolicyError> {
    let invalid = |reason| ParsePolicyError::InvalidDuration {
        text: text.to_owned(),
        reason,
    };
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail;

        if number.is_empty() {
            return Err(invalid("expected a number"));
        }
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid("unknown unit"))?;

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }
        if fraction.contains('.') {
            return Err(invalid("malformed number"));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut part = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("number out of range"))?;

        // Digits past nanosecond precision cannot contribute.
        let mut place = scale;
        for digit in fraction.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            part += u128::from(digit - b'0') * place;
        }

        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("number out of range"))?;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid("number out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Render a duration in the form [`parse_duration`] reads, e.g. `1m30s`, `1.5s`, `250ms`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}us", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let secs = nanos / NANOS_PER_SEC;
    let (hours, minutes) = (secs / 3_600, (secs % 3_600) / 60);
    let seconds = decimal(nanos % (60 * NANOS_PER_SEC), NANOS_PER_SEC);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, m) => format!("{m}m{seconds}s"),
        (h, m) => format!("{h}h{m}m{seconds}s"),
    }
}

/// `value / unit` with the remainder as trailing-zero-free decimals.
fn decimal(value: u128, unit: u128) -> String {
    let (whole, remainder) = (value / unit, value % unit);
    if remainder == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let fraction = format!("{remainder:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::reconciler::ReconcileError;

    #[rstest]
    #[case("0", Duration::ZERO)]
    #[case("0s", Duration::ZERO)]
    #[case("50ms", Duration::from_millis(50))]
    #[case("1.5s", Duration::from_millis(1_500))]
    #[case(".5s", Duration::from_millis(500))]
    #[case("1m30s", Duration::from_secs(90))]
    #[case("2h", Duration::from_secs(7_200))]
    #[case("1h1m1s1ms", Duration::from_millis(3_661_001))]
    #[case("10us", Duration::from_micros(10))]
    #[case("10µs", Duration::from_micros(10))]
    #[case("7ns", Duration::from_nanos(7))]
    fn parses_durations(#[case] text: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(text).expect("parse"), expected);
    }

    #[rstest]
    #[case("", "empty duration")]
    #[case("10", "missing unit")]
    #[case("s", "expected a number")]
    #[case("5d", "unknown unit")]
    #[case("-1s", "expected a number")]
    #[case("1.2.3s", "malformed number")]
    #[case("99999999999999h", "number out of range")]
    fn rejects_malformed_durations(#[case] text: &str, #[case] reason: &'static str) {
        let err = parse_duration(text).unwrap_err();
        assert_eq!(
            err,
            ParsePolicyError::InvalidDuration {
                text: text.to_owned(),
                reason,
            }
        );
    }

    #[rstest]
    #[case(Duration::from_nanos(7), "7ns")]
    #[case(Duration::from_micros(1_500), "1.5ms")]
    #[case(Duration::from_millis(50), "50ms")]
    #[case(Duration::from_millis(1_500), "1.5s")]
    #[case(Duration::from_secs(90), "1m30s")]
    #[case(Duration::from_secs(3_600), "1h0m0s")]
    fn formats_durations(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
        assert_eq!(parse_duration(expected).expect("reparse"), duration);
    }

    #[rstest]
    #[case("backlog", Policy::Backlog)]
    #[case("forever", Policy::forever(Duration::ZERO))]
    #[case("forever:50ms", Policy::forever(Duration::from_millis(50)))]
    #[case("forever:1m30s", Policy::forever(Duration::from_secs(90)))]
    #[case("until-error(backlog)", Policy::Backlog.until_error())]
    #[case(
        "until-error(forever:2s)",
        Policy::forever(Duration::from_secs(2)).until_error()
    )]
    fn policy_text_round_trips(#[case] text: &str, #[case] expected: Policy) {
        let parsed: Policy = text.parse().expect("parse");
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), text);
    }

    fn outcome(kind: &str) -> CycleOutcome {
        match kind {
            "processed" => CycleOutcome::Processed,
            "idle" => CycleOutcome::NoWorkAvailable,
            _ => CycleOutcome::Failed(ReconcileError::new("boom").into()),
        }
    }

    const COOL: Duration = Duration::from_millis(50);

    #[rstest]
    #[case(Policy::Backlog, "processed", Step::Continue)]
    #[case(Policy::Backlog, "idle", Step::Drained)]
    #[case(Policy::Backlog, "failed", Step::Continue)]
    #[case(Policy::forever(COOL), "processed", Step::Continue)]
    #[case(Policy::forever(COOL), "idle", Step::Cooldown(COOL))]
    #[case(Policy::forever(COOL), "failed", Step::Cooldown(COOL))]
    #[case(Policy::Backlog.until_error(), "processed", Step::Continue)]
    #[case(Policy::Backlog.until_error(), "idle", Step::Drained)]
    #[case(Policy::Backlog.until_error(), "failed", Step::Fail)]
    #[case(Policy::forever(COOL).until_error(), "processed", Step::Continue)]
    #[case(Policy::forever(COOL).until_error(), "idle", Step::Cooldown(COOL))]
    #[case(Policy::forever(COOL).until_error(), "failed", Step::Fail)]
    fn step_decisions(#[case] policy: Policy, #[case] kind: &str, #[case] expected: Step) {
        assert_eq!(policy.step(&outcome(kind)), expected);
    }

    #[test]
    fn forever_with_zero_cooldown_displays_bare() {
        assert_eq!("forever:0".parse::<Policy>().expect("parse").to_string(), "forever");
    }

    #[rstest]
    #[case("")]
    #[case("Backlog")]
    #[case("sometimes")]
    #[case("backlog:1s")]
    #[case("until-error(never)")]
    fn rejects_unknown_policies(#[case] text: &str) {
        let err = text.parse::<Policy>().unwrap_err();
        assert!(matches!(err, ParsePolicyError::Unknown(_)), "got: {err}");
    }

    #[test]
    fn bad_cooldown_names_the_text() {
        let err = "forever:soon".parse::<Policy>().unwrap_err();
        assert!(err.to_string().contains("'soon'"), "got: {err}");
    }

    #[test]
    fn until_error_does_not_nest() {
        let once = Policy::Backlog.until_error();
        assert_eq!(once.clone().until_error(), once);
        assert!(once.stops_on_error());
        assert!(!Policy::Backlog.stops_on_error());
    }
}
