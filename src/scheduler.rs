use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::backup::BackupRotator;

const TICK_SECONDS: u64 = 30;

/// A wall-clock time of day in a named time zone, recurring daily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// First trigger instant strictly after `now`. Each day is resolved in
    /// local time, so the UTC offset follows DST changes.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.with_timezone(&self.tz).date_naive();
        for _ in 0..3 {
            if let Some(candidate) = self.resolve(date) {
                if candidate > now {
                    return candidate;
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        now + ChronoDuration::days(1)
    }

    // Skipped wall times (spring forward) move to the first valid hour after
    // the gap; repeated ones (fall back) take the earlier instant.
    fn resolve(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let mut local = date.and_time(self.at);
        for _ in 0..24 {
            if let Some(found) = self.tz.from_local_datetime(&local).earliest() {
                return Some(found.with_timezone(&Utc));
            }
            local += ChronoDuration::hours(1);
        }
        None
    }
}

/// Tracks the next trigger instant; re-anchored after every firing.
#[derive(Debug)]
pub struct BackupJob {
    schedule: DailySchedule,
    next: DateTime<Utc>,
}

impl BackupJob {
    pub fn new(schedule: DailySchedule, now: DateTime<Utc>) -> Self {
        Self {
            schedule,
            next: schedule.next_after(now),
        }
    }

    pub fn next(&self) -> DateTime<Utc> {
        self.next
    }

    /// Returns true when the trigger has passed, advancing to the following
    /// day's instant.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next {
            return false;
        }
        self.next = self.schedule.next_after(now);
        true
    }
}

pub fn start_backup_scheduler(rotator: BackupRotator, schedule: DailySchedule) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut job = BackupJob::new(schedule, Utc::now());
        log::info!(
            "backup scheduled daily at {} {}; next run {}",
            schedule.at(),
            schedule.time_zone(),
            job.next().with_timezone(&schedule.time_zone())
        );

        let mut interval = tokio::time::interval(Duration::from_secs(TICK_SECONDS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !job.poll(Utc::now()) {
                continue;
            }

            let rotator = rotator.clone();
            match tokio::task::spawn_blocking(move || rotator.run(Utc::now())).await {
                Ok(report) => log::info!(
                    "backup run finished snapshot={} pruned={} failures={}",
                    report
                        .snapshot
                        .as_deref()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    report.pruned.len(),
                    report.failed.len()
                ),
                Err(err) => log::error!("backup run aborted: {err}"),
            }
            log::info!(
                "next backup run {}",
                job.next().with_timezone(&schedule.time_zone())
            );
        }
    })
}
