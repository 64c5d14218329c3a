//! Shift (duty) timer.
//!
//! A [`DutyTimer`] tracks at most one [`DutySession`] at a time. It is driven
//! entirely by the caller: `start` and `end` come from user actions, `tick`
//! comes from the 1 Hz [`Clock`](crate::Clock). Nothing here reads the system
//! clock, so every transition can be exercised with fixed timestamps.
//!
//! ## Phases
//!
//! ```text
//!            start              remaining <= 2 min
//!   Idle ───────────► Active ─────────────────────► Alerted
//!    ▲                  │                              │
//!    └──────────────────┴──── end / remaining <= 0 ────┘
//! ```
//!
//! Timestamps are local wall-clock [`NaiveDateTime`]s, which is what a user
//! means by "I log out at 18:00".

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ShiftError;

/// Window before logout in which the one-time alert fires.
pub const ALERT_THRESHOLD_MS: i64 = 2 * 60 * 1000;

/// The spoken announcement for the alert.
pub const ALERT_MESSAGE: &str = "Attention. Your shift ends in two minutes.";

/// Shown instead of a countdown while no session is running.
pub const IDLE_PLACEHOLDER: &str = "--:--:--";

/// Shift length used until the user configures one.
pub const DEFAULT_SHIFT_HOURS: f64 = 8.0;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// How the logout time is derived when a shift starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Log out a fixed number of hours after starting.
    #[default]
    FixedDuration,
    /// Log out at the next occurrence of a wall-clock time.
    FixedClockTime,
}

/// User-chosen shift settings.
///
/// Only the field belonging to `mode` is consulted; the other one is kept so
/// switching modes back and forth does not lose what the user typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftConfig {
    /// Which field is authoritative.
    pub mode: ShiftMode,
    /// Shift length in hours (FixedDuration).
    pub duration_hours: f64,
    /// Logout time of day (FixedClockTime).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<NaiveTime>,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self::fixed_duration(DEFAULT_SHIFT_HOURS)
    }
}

impl ShiftConfig {
    /// A shift lasting `hours` from the moment it starts.
    pub fn fixed_duration(hours: f64) -> Self {
        Self {
            mode: ShiftMode::FixedDuration,
            duration_hours: hours,
            target_time: None,
        }
    }

    /// A shift ending at the next occurrence of `time`.
    pub fn fixed_clock_time(time: NaiveTime) -> Self {
        Self {
            mode: ShiftMode::FixedClockTime,
            duration_hours: DEFAULT_SHIFT_HOURS,
            target_time: Some(time),
        }
    }

    /// Checks the authoritative field for the current mode.
    ///
    /// ## Errors
    ///
    /// Returns [`ShiftError::InvalidConfig`] for a non-positive or non-finite
    /// duration, or a missing target time.
    pub fn validate(&self) -> Result<(), ShiftError> {
        match self.mode {
            ShiftMode::FixedDuration => {
                if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
                    return Err(ShiftError::InvalidConfig(
                        "shift length must be greater than zero hours".to_string(),
                    ));
                }
            }
            ShiftMode::FixedClockTime => {
                if self.target_time.is_none() {
                    return Err(ShiftError::InvalidConfig(
                        "a logout time is required".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Computes the logout instant for a shift starting at `now`.
    ///
    /// ## Errors
    ///
    /// Returns [`ShiftError::InvalidConfig`] when the config is invalid or the
    /// resulting instant is out of range.
    ///
    /// ## Examples
    ///
    /// ```
    /// use chrono::{NaiveDate, NaiveTime};
    /// use vocalize_lib::ShiftConfig;
    ///
    /// let now = NaiveDate::from_ymd_opt(2024, 1, 1)
    ///     .unwrap()
    ///     .and_hms_opt(19, 0, 0)
    ///     .unwrap();
    /// let config = ShiftConfig::fixed_clock_time(NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    ///
    /// // 18:00 has already passed today, so the shift ends tomorrow.
    /// let logout = config.logout_at(now).unwrap();
    /// assert_eq!(logout.to_string(), "2024-01-02 18:00:00");
    /// ```
    pub fn logout_at(&self, now: NaiveDateTime) -> Result<NaiveDateTime, ShiftError> {
        self.validate()?;

        let out_of_range = || ShiftError::InvalidConfig("logout time is out of range".to_string());

        match (self.mode, self.target_time) {
            (ShiftMode::FixedClockTime, Some(target)) => {
                let today = now.date().and_time(target);
                if today > now {
                    Ok(today)
                } else {
                    today
                        .checked_add_signed(TimeDelta::days(1))
                        .ok_or_else(out_of_range)
                }
            }
            _ => {
                let ms = (self.duration_hours * MS_PER_HOUR as f64).round() as i64;
                if ms <= 0 {
                    return Err(ShiftError::InvalidConfig(
                        "shift length must be at least one millisecond".to_string(),
                    ));
                }
                let delta = TimeDelta::try_milliseconds(ms).ok_or_else(out_of_range)?;
                now.checked_add_signed(delta).ok_or_else(out_of_range)
            }
        }
    }
}

/// One login-to-logout interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutySession {
    /// When the shift started.
    pub login_at: NaiveDateTime,
    /// When the shift ends.
    pub logout_at: NaiveDateTime,
    /// Whether the two-minute alert has fired for this session.
    pub alerted: bool,
}

impl DutySession {
    /// Milliseconds until logout; negative once the logout time has passed.
    pub fn remaining_ms(&self, now: NaiveDateTime) -> i64 {
        (self.logout_at - now).num_milliseconds()
    }
}

/// Observable phase of the timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DutyPhase {
    /// No session.
    #[default]
    Idle,
    /// Session running, alert not yet fired.
    Active,
    /// Session running, alert fired.
    Alerted,
}

/// Result of feeding one clock tick to the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed.
    Unchanged,
    /// The session just entered the alert window. Fires once per session.
    Alert,
    /// The logout time was reached; the session has ended.
    Completed(DutySession),
}

/// The shift timer state machine.
///
/// ## Examples
///
/// ```
/// use chrono::NaiveDate;
/// use vocalize_lib::{DutyPhase, DutyTimer, ShiftConfig, TickOutcome};
///
/// let at = |h, m, s| {
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, m, s).unwrap()
/// };
///
/// let mut timer = DutyTimer::new();
/// timer.start(&ShiftConfig::fixed_duration(8.0), at(9, 0, 0)).unwrap();
///
/// assert_eq!(timer.tick(at(16, 58, 30)), TickOutcome::Alert);
/// assert_eq!(timer.countdown(at(16, 58, 30)), "00:01:30");
/// assert_eq!(timer.phase(), DutyPhase::Alerted);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DutyTimer {
    session: Option<DutySession>,
}

impl DutyTimer {
    /// Creates an idle timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> DutyPhase {
        match &self.session {
            None => DutyPhase::Idle,
            Some(session) if session.alerted => DutyPhase::Alerted,
            Some(_) => DutyPhase::Active,
        }
    }

    /// Returns true while a session is running.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the running session, if any.
    pub fn session(&self) -> Option<&DutySession> {
        self.session.as_ref()
    }

    /// Starts a new session at `now`.
    ///
    /// ## Errors
    ///
    /// - [`ShiftError::AlreadyActive`] if a session is running.
    /// - [`ShiftError::InvalidConfig`] if `config` cannot produce a logout time.
    ///
    /// In both cases the timer is left unchanged.
    pub fn start(
        &mut self,
        config: &ShiftConfig,
        now: NaiveDateTime,
    ) -> Result<&DutySession, ShiftError> {
        if self.session.is_some() {
            return Err(ShiftError::AlreadyActive);
        }

        let logout_at = config.logout_at(now)?;
        info!(login_at = %now, logout_at = %logout_at, mode = ?config.mode, "Shift started");

        Ok(self.session.insert(DutySession {
            login_at: now,
            logout_at,
            alerted: false,
        }))
    }

    /// Advances the state machine to `now`.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Unchanged;
        };

        let remaining = session.remaining_ms(now);

        if remaining <= 0 {
            let finished = self.session.take();
            info!(now = %now, "Shift complete, logging out");
            return finished.map_or(TickOutcome::Unchanged, TickOutcome::Completed);
        }

        if remaining <= ALERT_THRESHOLD_MS && !session.alerted {
            session.alerted = true;
            debug!(remaining_ms = remaining, "Shift alert window entered");
            return TickOutcome::Alert;
        }

        TickOutcome::Unchanged
    }

    /// Ends the running session immediately.
    ///
    /// ## Errors
    ///
    /// Returns [`ShiftError::NotActive`] when no session is running.
    pub fn end(&mut self) -> Result<DutySession, ShiftError> {
        let session = self.session.take().ok_or(ShiftError::NotActive)?;
        info!(logout_at = %session.logout_at, "Shift ended manually");
        Ok(session)
    }

    /// Milliseconds until logout, clamped at zero; `None` while idle.
    pub fn remaining_ms(&self, now: NaiveDateTime) -> Option<i64> {
        self.session
            .as_ref()
            .map(|session| session.remaining_ms(now).max(0))
    }

    /// The countdown text for display at `now`.
    pub fn countdown(&self, now: NaiveDateTime) -> String {
        self.remaining_ms(now)
            .map(format_remaining)
            .unwrap_or_else(|| IDLE_PLACEHOLDER.to_string())
    }
}

/// Formats milliseconds as zero-padded `HH:MM:SS`, clamping negatives to zero.
///
/// ## Examples
///
/// ```
/// use vocalize_lib::format_remaining;
///
/// assert_eq!(format_remaining(0), "00:00:00");
/// assert_eq!(format_remaining(7_325_000), "02:02:05");
/// assert_eq!(format_remaining(-5_000), "00:00:00");
/// ```
pub fn format_remaining(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .expect("date")
            .and_hms_opt(h, m, s)
            .expect("time")
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("time")
    }

    #[test]
    fn fixed_duration_adds_hours_to_start() {
        for hours in [0.5, 1.0, 7.5, 8.0, 12.25, 30.0] {
            let mut timer = DutyTimer::new();
            let start = at(1, 9, 0, 0);
            let session = timer
                .start(&ShiftConfig::fixed_duration(hours), start)
                .expect("valid config")
                .clone();

            let expected_ms = (hours * 3_600_000.0) as i64;
            assert_eq!((session.logout_at - start).num_milliseconds(), expected_ms);
            assert_eq!(timer.remaining_ms(start), Some(expected_ms));
            assert_eq!(timer.tick(start), TickOutcome::Unchanged);
        }
    }

    #[test]
    fn eight_hour_shift_scenario() {
        let mut timer = DutyTimer::new();
        let session = timer
            .start(&ShiftConfig::fixed_duration(8.0), at(1, 9, 0, 0))
            .expect("start")
            .clone();
        assert_eq!(session.logout_at, at(1, 17, 0, 0));
        assert_eq!(session.login_at, at(1, 9, 0, 0));

        let now = at(1, 16, 58, 30);
        assert_eq!(timer.tick(now), TickOutcome::Alert);
        assert_eq!(timer.countdown(now), "00:01:30");
        assert_eq!(timer.phase(), DutyPhase::Alerted);
    }

    #[test]
    fn clock_time_later_today_stays_on_same_day() {
        let config = ShiftConfig::fixed_clock_time(hm(18, 0));
        assert_eq!(config.logout_at(at(1, 9, 0, 0)).expect("valid"), at(1, 18, 0, 0));
    }

    #[test]
    fn clock_time_already_passed_rolls_to_next_day() {
        let config = ShiftConfig::fixed_clock_time(hm(18, 0));
        assert_eq!(config.logout_at(at(1, 19, 0, 0)).expect("valid"), at(2, 18, 0, 0));
    }

    #[test]
    fn clock_time_equal_to_now_rolls_to_next_day() {
        let config = ShiftConfig::fixed_clock_time(hm(18, 0));
        assert_eq!(config.logout_at(at(1, 18, 0, 0)).expect("valid"), at(2, 18, 0, 0));
    }

    #[test]
    fn clock_time_crosses_midnight() {
        let config = ShiftConfig::fixed_clock_time(hm(6, 0));
        assert_eq!(config.logout_at(at(1, 22, 0, 0)).expect("valid"), at(2, 6, 0, 0));
    }

    #[test]
    fn invalid_duration_is_rejected_and_timer_stays_idle() {
        let mut timer = DutyTimer::new();
        for hours in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = timer
                .start(&ShiftConfig::fixed_duration(hours), at(1, 9, 0, 0))
                .expect_err("invalid");
            assert!(matches!(err, ShiftError::InvalidConfig(_)));
            assert_eq!(timer.phase(), DutyPhase::Idle);
        }
    }

    #[test]
    fn missing_target_time_is_rejected() {
        let mut timer = DutyTimer::new();
        let config = ShiftConfig {
            mode: ShiftMode::FixedClockTime,
            duration_hours: 8.0,
            target_time: None,
        };
        let err = timer.start(&config, at(1, 9, 0, 0)).expect_err("invalid");
        assert!(matches!(err, ShiftError::InvalidConfig(_)));
        assert!(!timer.is_active());
    }

    #[test]
    fn inactive_field_is_ignored() {
        // A bogus duration does not matter in clock-time mode.
        let config = ShiftConfig {
            mode: ShiftMode::FixedClockTime,
            duration_hours: -3.0,
            target_time: Some(hm(17, 0)),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn start_while_active_is_rejected() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");
        let err = timer
            .start(&ShiftConfig::fixed_duration(2.0), at(1, 9, 30, 0))
            .expect_err("already active");
        assert_eq!(err, ShiftError::AlreadyActive);
        assert_eq!(
            timer.session().expect("session").logout_at,
            at(1, 10, 0, 0)
        );
    }

    #[test]
    fn alert_fires_exactly_once_even_if_clock_goes_backwards() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");

        let ticks = [
            at(1, 9, 57, 0),  // 3 min left
            at(1, 9, 58, 30), // 90 s left: alert
            at(1, 9, 56, 0),  // clock paused/resumed backwards: 4 min left
            at(1, 9, 58, 45), // back inside the window
            at(1, 9, 59, 30),
        ];
        let alerts = ticks
            .iter()
            .filter(|now| timer.tick(**now) == TickOutcome::Alert)
            .count();

        assert_eq!(alerts, 1);
        assert_eq!(timer.phase(), DutyPhase::Alerted);
    }

    #[test]
    fn alert_boundary_is_inclusive_at_two_minutes() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");

        assert_eq!(timer.tick(at(1, 9, 57, 59)), TickOutcome::Unchanged);
        assert_eq!(timer.tick(at(1, 9, 58, 0)), TickOutcome::Alert);
    }

    #[test]
    fn reaching_logout_completes_the_session() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");
        assert_eq!(timer.tick(at(1, 9, 59, 0)), TickOutcome::Alert);

        match timer.tick(at(1, 10, 0, 0)) {
            TickOutcome::Completed(session) => {
                assert_eq!(session.logout_at, at(1, 10, 0, 0));
                assert!(session.alerted);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(timer.phase(), DutyPhase::Idle);

        // Irreversible: further ticks do nothing.
        assert_eq!(timer.tick(at(1, 9, 30, 0)), TickOutcome::Unchanged);
        assert_eq!(timer.phase(), DutyPhase::Idle);
        assert_eq!(timer.countdown(at(1, 10, 0, 1)), IDLE_PLACEHOLDER);
    }

    #[test]
    fn overshooting_logout_from_active_completes_without_alert() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");

        let outcome = timer.tick(at(1, 11, 0, 0));
        assert!(matches!(outcome, TickOutcome::Completed(ref s) if !s.alerted));
        assert!(!timer.is_active());
    }

    #[test]
    fn end_from_active_and_alerted_returns_to_idle() {
        let mut timer = DutyTimer::new();
        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("start");
        assert!(timer.end().is_ok());
        assert_eq!(timer.phase(), DutyPhase::Idle);

        timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 9, 0, 0))
            .expect("restart");
        assert_eq!(timer.tick(at(1, 9, 59, 0)), TickOutcome::Alert);
        let ended = timer.end().expect("end");
        assert!(ended.alerted);
        assert_eq!(timer.phase(), DutyPhase::Idle);

        // The next session is re-armed.
        let session = timer
            .start(&ShiftConfig::fixed_duration(1.0), at(1, 12, 0, 0))
            .expect("start again");
        assert!(!session.alerted);
        assert_eq!(timer.tick(at(1, 12, 59, 0)), TickOutcome::Alert);
    }

    #[test]
    fn end_while_idle_is_an_error() {
        let mut timer = DutyTimer::new();
        assert_eq!(timer.end(), Err(ShiftError::NotActive));
    }

    #[test]
    fn tick_while_idle_is_a_noop() {
        let mut timer = DutyTimer::new();
        assert_eq!(timer.tick(at(1, 9, 0, 0)), TickOutcome::Unchanged);
    }

    #[test]
    fn format_remaining_examples() {
        assert_eq!(format_remaining(0), "00:00:00");
        assert_eq!(format_remaining(7_325_000), "02:02:05");
        assert_eq!(format_remaining(999), "00:00:00");
        assert_eq!(format_remaining(-1), "00:00:00");
        assert_eq!(format_remaining(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn countdown_shows_placeholder_when_idle() {
        let timer = DutyTimer::new();
        assert_eq!(timer.countdown(at(1, 9, 0, 0)), IDLE_PLACEHOLDER);
        assert_eq!(timer.remaining_ms(at(1, 9, 0, 0)), None);
    }

    #[test]
    fn shift_config_serializes_with_snake_case_mode() {
        let json = serde_json::to_string(&ShiftConfig::fixed_clock_time(hm(18, 0))).expect("json");
        assert!(json.contains(r#""mode":"fixed_clock_time""#));
        assert!(json.contains(r#""target_time":"18:00:00""#));
    }
}
