//! Weekly leaderboard job: one summary for the admin, one per mentor.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wienergame_shared::TaskEntry;
use wienergame_shared::report::build_weekly_report;
use wienergame_shared::schedule::WeeklySchedule;

use crate::bot::BotError;
use crate::storage::Store;

pub const WEEKLY_REPORT_JOB: &str = "weekly_report";

/// Smallest lateness tolerated when waking up for a slot.
fn min_grace() -> Duration {
    Duration::minutes(1)
}

/// Delivers a text message to a username (no `@`).
pub trait MessageSink {
    fn send_text(
        &self,
        to: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), BotError>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    /// `None` when no admin is configured and nothing was sent.
    pub admin: Option<String>,
    pub mentors_sent: Vec<String>,
    pub mentors_failed: Vec<String>,
}

/// Builds and sends the weekly report. Fails only when reading the store or
/// messaging the admin fails; a mentor that cannot be reached is logged.
pub async fn send_weekly_report<S: MessageSink>(
    store: &Store,
    sink: &S,
) -> Result<ReportOutcome, BotError> {
    let Some(admin) = store.get_admin().await? else {
        info!("weekly report skipped: no admin configured");
        return Ok(ReportOutcome::default());
    };

    let scores = store.get_all_user_scores().await?;
    let mut tasks: HashMap<String, Vec<TaskEntry>> = HashMap::with_capacity(scores.len());
    for row in &scores {
        let entries = store.get_user_tasks(&row.username).await?;
        tasks.insert(row.username.clone(), entries);
    }
    let report = build_weekly_report(&scores, |user| {
        tasks.get(user).map(Vec::as_slice).unwrap_or(&[])
    });

    sink.send_text(&admin, &report.admin_text).await?;
    info!(admin = %admin, users = scores.len(), "weekly report sent to admin");

    let mut outcome = ReportOutcome {
        admin: Some(admin),
        ..Default::default()
    };
    for (mentor, text) in &report.mentor_texts {
        match sink.send_text(mentor, text).await {
            Ok(()) => outcome.mentors_sent.push(mentor.clone()),
            Err(err) => {
                warn!(mentor = %mentor, error = %err, "weekly report to mentor failed");
                outcome.mentors_failed.push(mentor.clone());
            }
        }
    }
    info!(
        sent = outcome.mentors_sent.len(),
        failed = outcome.mentors_failed.len(),
        "weekly mentor reports done"
    );
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    RunNow { slot: DateTime<Utc> },
    SleepUntil(DateTime<Utc>),
}

/// Decides whether the slot that most recently passed still needs serving.
///
/// A slot is served when `last_run` is at or after it. An unserved slot runs
/// only while `now` is within `catch_up` of it; otherwise the next slot waits.
pub fn plan(
    schedule: &WeeklySchedule,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
    last_attempt: Option<DateTime<Utc>>,
    catch_up: Duration,
) -> Plan {
    let slot = schedule.latest_at_or_before(now);
    let served = last_run.is_some_and(|at| at >= slot);
    let attempted = last_attempt == Some(slot);
    let grace = catch_up.max(min_grace());
    if !served && !attempted && now - slot <= grace {
        Plan::RunNow { slot }
    } else {
        Plan::SleepUntil(schedule.next_after(now))
    }
}

pub struct ReportScheduler<S> {
    store: Store,
    sink: S,
    schedule: WeeklySchedule,
    catch_up: Duration,
}

impl<S: MessageSink> ReportScheduler<S> {
    pub fn new(store: Store, sink: S, schedule: WeeklySchedule, catch_up: Duration) -> Self {
        Self {
            store,
            sink,
            schedule,
            catch_up,
        }
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(schedule = %self.schedule, "weekly report scheduler started");
        let mut last_attempt: Option<DateTime<Utc>> = None;
        loop {
            let now = Utc::now();
            let last_run = match self.store.last_job_run(WEEKLY_REPORT_JOB).await {
                Ok(at) => at,
                Err(err) => {
                    error!(error = %err, "could not read last report run");
                    None
                }
            };
            match plan(&self.schedule, now, last_run, last_attempt, self.catch_up) {
                Plan::RunNow { slot } => {
                    last_attempt = Some(slot);
                    self.run_once(slot).await;
                }
                Plan::SleepUntil(next) => {
                    info!(next = %next, "next weekly report");
                    let wait = (next - now).to_std().unwrap_or_default();
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
            if shutdown.is_cancelled() {
                break;
            }
        }
        info!("weekly report scheduler stopped");
    }

    async fn run_once(&self, slot: DateTime<Utc>) {
        info!(slot = %slot, "running weekly report");
        match send_weekly_report(&self.store, &self.sink).await {
            Ok(_) => {
                if let Err(err) = self.store.mark_job_run(WEEKLY_REPORT_JOB, Utc::now()).await {
                    error!(error = %err, "could not persist report run");
                }
            }
            Err(err) => error!(error = %err, slot = %slot, "weekly report failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> WeeklySchedule {
        WeeklySchedule::parse("thu 13:00", "Europe/Kyiv").unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    /// Thursday 13:00 in Kyiv.
    fn slot() -> DateTime<Utc> {
        utc(2025, 3, 6, 11, 0)
    }

    #[test]
    fn runs_when_woken_at_slot() {
        let now = slot() + Duration::seconds(2);
        let last = Some(slot() - Duration::days(7));
        assert_eq!(
            plan(&schedule(), now, last, None, Duration::hours(6)),
            Plan::RunNow { slot: slot() }
        );
    }

    #[test]
    fn restart_after_run_does_not_duplicate() {
        let now = slot() + Duration::minutes(5);
        let last = Some(slot() + Duration::seconds(3));
        assert_eq!(
            plan(&schedule(), now, last, None, Duration::hours(6)),
            Plan::SleepUntil(utc(2025, 3, 13, 11, 0))
        );
    }

    #[test]
    fn missed_slot_is_caught_up_within_grace() {
        let now = slot() + Duration::hours(2);
        assert_eq!(
            plan(&schedule(), now, None, None, Duration::hours(6)),
            Plan::RunNow { slot: slot() }
        );
    }

    #[test]
    fn missed_slot_beyond_grace_waits_for_next_week() {
        let now = slot() + Duration::hours(7);
        assert_eq!(
            plan(&schedule(), now, None, None, Duration::hours(6)),
            Plan::SleepUntil(utc(2025, 3, 13, 11, 0))
        );
    }

    #[test]
    fn failed_attempt_is_not_retried() {
        let now = slot() + Duration::seconds(30);
        assert_eq!(
            plan(&schedule(), now, None, Some(slot()), Duration::hours(6)),
            Plan::SleepUntil(utc(2025, 3, 13, 11, 0))
        );
    }

    #[test]
    fn zero_catch_up_still_tolerates_wakeup_jitter() {
        let now = slot() + Duration::seconds(5);
        assert_eq!(
            plan(&schedule(), now, None, None, Duration::zero()),
            Plan::RunNow { slot: slot() }
        );
    }
}
