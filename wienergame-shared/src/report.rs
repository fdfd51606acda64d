use std::collections::BTreeMap;

use crate::domain::{ScoreRow, TaskEntry};

pub const ADMIN_HEADER: &str = "Щотижневий звіт:";
pub const MENTOR_HEADER: &str = "Звіт по ваших менті:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub admin_text: String,
    /// Keyed by mentor username (no `@`).
    pub mentor_texts: BTreeMap<String, String>,
}

/// The mentor a user reports to: the mentor on their earliest task that names one.
pub fn mentor_of(tasks: &[TaskEntry]) -> Option<&str> {
    tasks
        .iter()
        .find_map(|t| t.mentor.as_deref().filter(|m| !m.is_empty()))
}

pub fn score_line(row: &ScoreRow) -> String {
    format!("{} - {}", row.username, row.score)
}

pub fn task_line(task: &TaskEntry) -> String {
    format!("{} - {} балів", task.description, task.points)
}

/// `alice - 10` followed by one tab-indented line per task.
pub fn mentee_summary(row: &ScoreRow, tasks: &[TaskEntry]) -> String {
    let task_list = tasks.iter().map(task_line).collect::<Vec<_>>().join("\n\t");
    format!("{}\n\t{}", score_line(row), task_list)
}

/// `scores` must already be in leaderboard order; `tasks_for` returns a
/// user's tasks oldest first.
pub fn build_weekly_report<'a, F>(scores: &[ScoreRow], mut tasks_for: F) -> WeeklyReport
where
    F: FnMut(&str) -> &'a [TaskEntry],
{
    let lines = scores.iter().map(score_line).collect::<Vec<_>>().join("\n");
    let admin_text = format!("{ADMIN_HEADER}\n{lines}");

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in scores {
        let tasks = tasks_for(&row.username);
        let Some(mentor) = mentor_of(tasks) else {
            continue;
        };
        grouped
            .entry(mentor.to_string())
            .or_default()
            .push(mentee_summary(row, tasks));
    }

    let mentor_texts = grouped
        .into_iter()
        .map(|(mentor, summaries)| {
            let text = format!("{MENTOR_HEADER}\n{}", summaries.join("\n"));
            (mentor, text)
        })
        .collect();

    WeeklyReport {
        admin_text,
        mentor_texts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn row(username: &str, score: i32) -> ScoreRow {
        ScoreRow {
            username: username.into(),
            score,
        }
    }

    fn task(description: &str, points: i32, mentor: Option<&str>, minute: u32) -> TaskEntry {
        TaskEntry {
            description: description.into(),
            points,
            recorded_at: Utc.with_ymd_and_hms(2025, 3, 6, 10, minute, 0).unwrap(),
            mentor: mentor.map(str::to_string),
        }
    }

    #[test]
    fn admin_text_lists_scores_in_given_order() {
        let scores = vec![row("bob", 20), row("carol", 10), row("alice", 5)];
        let report = build_weekly_report(&scores, |_| &[]);
        assert_eq!(
            report.admin_text,
            "Щотижневий звіт:\nbob - 20\ncarol - 10\nalice - 5"
        );
        assert!(report.mentor_texts.is_empty());
    }

    #[test]
    fn mentees_are_grouped_under_their_mentor() {
        let scores = vec![row("alice", 15), row("bob", 7), row("eve", 3)];
        let mut tasks: HashMap<&str, Vec<TaskEntry>> = HashMap::new();
        tasks.insert(
            "alice",
            vec![
                task("Завдання 1", 10, Some("olena"), 0),
                task("Завдання 2", 5, Some("ivan"), 1),
            ],
        );
        tasks.insert("bob", vec![task("Завдання 1", 7, Some("olena"), 2)]);
        tasks.insert("eve", vec![task("Завдання 4", 3, None, 3)]);

        let report = build_weekly_report(&scores, |u| {
            tasks.get(u).map(Vec::as_slice).unwrap_or(&[])
        });

        assert_eq!(report.mentor_texts.len(), 1);
        assert_eq!(
            report.mentor_texts["olena"],
            "Звіт по ваших менті:\n\
             alice - 15\n\tЗавдання 1 - 10 балів\n\tЗавдання 2 - 5 балів\n\
             bob - 7\n\tЗавдання 1 - 7 балів"
        );
    }

    #[test]
    fn legacy_rows_without_mentor_are_skipped_when_resolving() {
        let tasks = vec![task("old", 1, None, 0), task("new", 2, Some("ivan"), 1)];
        assert_eq!(mentor_of(&tasks), Some("ivan"));
        assert_eq!(mentor_of(&[]), None);
    }

    #[test]
    fn empty_leaderboard_still_produces_admin_header() {
        let report = build_weekly_report(&[], |_| &[]);
        assert_eq!(report.admin_text, "Щотижневий звіт:\n");
    }
}
