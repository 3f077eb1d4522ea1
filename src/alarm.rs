// src/alarm.rs
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Polling slower than this can step over the target minute.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(thiserror::Error, Debug)]
pub enum AlarmError {
    #[error("invalid alarm time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("poll interval {0:?} must be non-zero and shorter than one minute")]
    PollInterval(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AlarmTime {
    pub hour: u32,   // 0..=23
    pub minute: u32, // 0..=59
}

impl AlarmTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, AlarmError> {
        if hour > 23 || minute > 59 {
            return Err(AlarmError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl FromStr for AlarmTime {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AlarmError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        let hour = h.parse().map_err(|_| bad())?;
        let minute = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute).map_err(|_| bad())
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = AlarmError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Wall-clock source in the zone the alarm is expressed in.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time, or a fixed IANA zone when one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub tz: Option<Tz>,
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.tz {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

/// Once-per-day debounce. Only the most recent fired date is retained;
/// a new date has no record and is therefore pending again.
#[derive(Debug, Clone)]
pub struct DailyAlarm {
    time: AlarmTime,
    fired_on: Option<NaiveDate>,
}

impl DailyAlarm {
    pub fn new(time: AlarmTime) -> Self {
        Self { time, fired_on: None }
    }

    pub fn time(&self) -> AlarmTime { self.time }

    pub fn fired_on(&self) -> Option<NaiveDate> { self.fired_on }

    /// Returns `true` exactly once per date, on the first poll inside the
    /// target minute. The date is recorded before returning, so a slow
    /// callback cannot cause a second firing.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if !self.time.matches(&now) {
            return false;
        }
        let today = now.date();
        if self.fired_on == Some(today) {
            return false;
        }
        self.fired_on = Some(today);
        true
    }
}

/// Handle to the polling task. Dropping it leaves the task running.
#[derive(Debug)]
pub struct AlarmHandle {
    task: JoinHandle<()>,
}

impl AlarmHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Poll `clock` every `poll_every` and run `callback` when the alarm fires.
///
/// The callback is awaited inside the polling task, so two runs never
/// overlap; ticks missed while it runs are skipped.
pub fn spawn_daily<C, F, Fut>(
    mut alarm: DailyAlarm,
    poll_every: Duration,
    clock: C,
    mut callback: F,
) -> Result<AlarmHandle, AlarmError>
where
    C: Clock + 'static,
    F: FnMut(NaiveDateTime) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if poll_every.is_zero() || poll_every >= MAX_POLL_INTERVAL {
        return Err(AlarmError::PollInterval(poll_every));
    }
    info!("daily alarm armed for {} (poll every {:?})", alarm.time(), poll_every);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let now = clock.now();
            if alarm.poll(now) {
                debug!("alarm triggered at {now} ({})", now.format("%Y-%m-%d"));
                callback(now).await;
            }
        }
    });
    Ok(AlarmHandle { task })
}
