//! Exponential backoff with jitter.
//!
//! For attempt `k` the delay is drawn uniformly from
//! `[base * factor^(k-1), min(max, base * factor^k)]`. Attempt 0 never
//! waits, and from `max_errors` on the delay is exactly `max`.
//!
//! Delays too long for a `Duration` saturate at `Duration::MAX`.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::config::schema::BackoffConfig;
use crate::config::validation::validate_backoff;

/// Windows listed by [`BackoffPolicy::schedule`] before the ceiling.
const SCHEDULE_LIMIT: u32 = 64;

/// Validated backoff tunables shared by every endpoint of a tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackoffPolicy {
    min_backoff_factor: f64,
    base_backoff_secs: f64,
    max_backoff_secs: f64,
    recovery_interval: u32,
    max_errors: u32,
}

/// Jitter window for one attempt, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BackoffWindow {
    pub attempt: u32,
    pub lower_secs: f64,
    pub upper_secs: f64,
}

impl BackoffPolicy {
    /// Build a policy from raw configuration.
    ///
    /// Out-of-range values fall back to their defaults and are logged.
    pub fn from_config(raw: &BackoffConfig) -> Self {
        let sanitized = validate_backoff(raw);
        for warning in &sanitized.warnings {
            tracing::warn!(
                field = warning.field,
                value = %warning.value,
                default = %warning.default,
                "Invalid backoff setting, using default"
            );
        }

        let max_errors = derive_max_errors(
            sanitized.factor,
            sanitized.base_secs,
            sanitized.max_secs,
        );
        let recovery_interval = if sanitized.recovery_reset {
            max_errors
        } else {
            sanitized.recovery_interval
        };

        Self {
            min_backoff_factor: sanitized.factor,
            base_backoff_secs: sanitized.base_secs,
            max_backoff_secs: sanitized.max_secs,
            recovery_interval,
            max_errors,
        }
    }

    pub fn min_backoff_factor(&self) -> f64 {
        self.min_backoff_factor
    }

    pub fn base_backoff_time(&self) -> Duration {
        secs_to_duration(self.base_backoff_secs)
    }

    pub fn max_backoff_time(&self) -> Duration {
        secs_to_duration(self.max_backoff_secs)
    }

    /// Ceiling in seconds, without conversion to a `Duration`.
    pub fn max_backoff_secs(&self) -> f64 {
        self.max_backoff_secs
    }

    /// Error counts healed by one success.
    pub fn recovery_interval(&self) -> u32 {
        self.recovery_interval
    }

    /// Error count at which backoff saturates at the ceiling.
    ///
    /// Saturates at `u32::MAX` for policies whose envelope grows too slowly
    /// to reach the ceiling within that many errors.
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Delay to impose after `attempt` consecutive errors.
    ///
    /// `attempt` is clamped to `max_errors`. The only state touched is `rng`,
    /// so concurrent callers just need their own (or a locked) generator.
    pub fn backoff_duration<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let attempt = attempt.min(self.max_errors);
        if attempt == 0 {
            return Duration::ZERO;
        }
        if attempt == self.max_errors {
            return self.max_backoff_time();
        }

        let window = self.window(attempt);
        let secs = window.lower_secs + rng.gen::<f64>() * (window.upper_secs - window.lower_secs);
        secs_to_duration(secs)
    }

    /// Jitter windows by attempt, ending with the ceiling at `max_errors`.
    ///
    /// At most 64 windows: past that, intermediate attempts are left out and
    /// only the ceiling window follows.
    pub fn schedule(&self) -> Vec<BackoffWindow> {
        let listed = self.max_errors.min(SCHEDULE_LIMIT);
        let mut windows: Vec<BackoffWindow> =
            (1..listed).map(|attempt| self.window(attempt)).collect();
        windows.push(self.window(self.max_errors));
        windows
    }

    fn window(&self, attempt: u32) -> BackoffWindow {
        if attempt >= self.max_errors {
            return BackoffWindow {
                attempt,
                lower_secs: self.max_backoff_secs,
                upper_secs: self.max_backoff_secs,
            };
        }
        let lower = self.envelope(attempt - 1);
        let upper = self.envelope(attempt).min(self.max_backoff_secs);
        BackoffWindow {
            attempt,
            lower_secs: lower,
            upper_secs: upper,
        }
    }

    fn envelope(&self, exponent: u32) -> f64 {
        self.base_backoff_secs * self.min_backoff_factor.powf(f64::from(exponent))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Smallest `n` with `base * factor^n >= max`, never below 1 so that a
/// failure always blocks, and never above `u32::MAX`.
fn derive_max_errors(factor: f64, base: f64, max: f64) -> u32 {
    if base >= max {
        return 1;
    }

    let reaches = |n: u32| base * factor.powf(f64::from(n)) >= max;

    // Estimate with logs, then correct for float error.
    let estimate = ((max / base).ln() / factor.ln()).ceil();
    let mut n = if estimate.is_finite() && estimate > 0.0 {
        estimate as u32
    } else {
        1
    };
    while n > 1 && reaches(n - 1) {
        n -= 1;
    }
    while n < u32::MAX && !reaches(n) {
        n += 1;
    }
    n.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(10)
    }

    fn policy(factor: f64, base: f64, max: f64) -> BackoffPolicy {
        BackoffPolicy::from_config(&BackoffConfig {
            factor,
            base_secs: base,
            max_secs: max,
            ..BackoffConfig::default()
        })
    }

    #[test]
    fn test_default_policy() {
        let p = BackoffPolicy::default();
        assert_eq!(p.min_backoff_factor(), 2.0);
        assert_eq!(p.base_backoff_time(), Duration::from_secs(2));
        assert_eq!(p.max_backoff_time(), Duration::from_secs(64));
        assert_eq!(p.recovery_interval(), 2);
        assert_eq!(p.max_errors(), 5);
    }

    #[test]
    fn test_max_errors_derivation() {
        assert_eq!(derive_max_errors(2.0, 2.0, 64.0), 5);
        assert_eq!(derive_max_errors(2.0, 2.0, 65.0), 6);
        assert_eq!(derive_max_errors(4.0, 2.0, 64.0), 3);
        assert_eq!(derive_max_errors(2.0, 4.0, 128.0), 5);
        assert_eq!(derive_max_errors(10.0, 1.0, 999.0), 3);
        assert_eq!(derive_max_errors(1.5, 1.0, 2.0), 2);
    }

    #[test]
    fn test_max_errors_floor_when_base_exceeds_max() {
        let p = policy(2.0, 100.0, 10.0);
        assert_eq!(p.max_errors(), 1);
        assert_eq!(p.backoff_duration(1, &mut seeded()), Duration::from_secs(10));
    }

    #[test]
    fn test_recovery_reset_matches_max_errors() {
        let p = BackoffPolicy::from_config(&BackoffConfig {
            recovery_interval: 1,
            recovery_reset: true,
            ..BackoffConfig::default()
        });
        assert_eq!(p.recovery_interval(), p.max_errors());
        assert_eq!(p.recovery_interval(), 5);
    }

    #[test]
    fn test_zero_attempt_has_no_backoff() {
        let mut rng = seeded();
        for p in [BackoffPolicy::default(), policy(3.0, 0.5, 300.0), policy(1.1, 1.0, 2.0)] {
            assert_eq!(p.backoff_duration(0, &mut rng), Duration::ZERO);
        }
    }

    #[test]
    fn test_ceiling_is_exact() {
        let p = BackoffPolicy::default();
        let mut rng = seeded();
        for _ in 0..50 {
            assert_eq!(
                p.backoff_duration(p.max_errors(), &mut rng),
                p.max_backoff_time()
            );
        }
        assert_eq!(p.backoff_duration(100, &mut rng), p.max_backoff_time());
        assert_eq!(p.backoff_duration(u32::MAX, &mut rng), p.max_backoff_time());
    }

    #[test]
    fn test_jitter_stays_in_envelope() {
        let p = BackoffPolicy::default();
        let mut rng = seeded();
        for attempt in 1..p.max_errors() {
            let lower = 2.0 * 2f64.powi(attempt as i32 - 1);
            let upper = (2.0 * 2f64.powi(attempt as i32)).min(64.0);
            for _ in 0..100 {
                let secs = p.backoff_duration(attempt, &mut rng).as_secs_f64();
                assert!(secs >= lower - 1e-9, "attempt {attempt}: {secs} < {lower}");
                assert!(secs <= upper + 1e-9, "attempt {attempt}: {secs} > {upper}");
            }
        }
    }

    #[test]
    fn test_backoff_increases_on_average() {
        let p = BackoffPolicy::default();
        let mut rng = seeded();
        let mut previous = Duration::ZERO;
        let mut increases = 0;
        let mut decreases = 0;
        let mut steps = 0;

        for attempt in 1..1000 {
            let current = p.backoff_duration(attempt, &mut rng);
            if current == previous {
                steps = attempt - 1;
                break;
            }
            if current > previous {
                increases += 1;
            } else {
                decreases += 1;
            }
            previous = current;
        }

        assert!(increases >= decreases);
        assert_eq!(steps, p.max_errors());
    }

    #[test]
    fn test_schedule() {
        let schedule = BackoffPolicy::default().schedule();
        let bounds: Vec<_> = schedule
            .iter()
            .map(|w| (w.attempt, w.lower_secs, w.upper_secs))
            .collect();
        assert_eq!(
            bounds,
            vec![
                (1, 2.0, 4.0),
                (2, 4.0, 8.0),
                (3, 8.0, 16.0),
                (4, 16.0, 32.0),
                (5, 64.0, 64.0),
            ]
        );
    }

    #[test]
    fn test_max_errors_saturates() {
        // ln(1e600) / ln(1.0000001) is about 1.4e10 attempts
        assert_eq!(derive_max_errors(1.000_000_1, 1e-300, 1e300), u32::MAX);

        let p = policy(1.000_000_1, 1e-300, 1e300);
        assert_eq!(p.max_errors(), u32::MAX);
        assert_eq!(p.backoff_duration(u32::MAX, &mut seeded()), Duration::MAX);
    }

    #[test]
    fn test_schedule_is_bounded() {
        let p = policy(1.000_000_1, 1e-300, 1e300);
        let schedule = p.schedule();

        assert_eq!(schedule.len(), SCHEDULE_LIMIT as usize);
        assert_eq!(schedule[SCHEDULE_LIMIT as usize - 2].attempt, SCHEDULE_LIMIT - 1);
        let last = schedule.last().unwrap();
        assert_eq!(last.attempt, u32::MAX);
        assert_eq!((last.lower_secs, last.upper_secs), (1e300, 1e300));
    }

    #[test]
    fn test_huge_ceiling_saturates_duration() {
        let p = policy(2.0, 2.0, 1e20);
        assert_eq!(p.max_backoff_time(), Duration::MAX);
        assert_eq!(p.max_backoff_secs(), 1e20);

        let mut rng = seeded();
        for attempt in 0..=p.max_errors() + 1 {
            assert!(p.backoff_duration(attempt, &mut rng) <= p.max_backoff_time());
        }
        assert_eq!(p.backoff_duration(p.max_errors(), &mut rng), Duration::MAX);
    }

    #[test]
    fn test_narrow_ranges() {
        // 3 * 2 already overshoots 5
        let p = policy(2.0, 3.0, 5.0);
        assert_eq!(p.max_errors(), 1);

        let p = policy(3.0, 1.0, 5.0);
        assert_eq!(p.max_errors(), 2);
        let window = p.schedule()[0];
        assert_eq!((window.lower_secs, window.upper_secs), (1.0, 3.0));
    }
}
