use crate::storage::schema::{admin, job_runs, tasks, tasks_info, users};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use wienergame_shared::csv_import::TaskDefinition;
use wienergame_shared::{ScoreRow, TaskEntry};

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
#[diesel(primary_key(user_id))]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub score: i32,
}

impl From<User> for ScoreRow {
    fn from(u: User) -> Self {
        ScoreRow {
            username: u.username,
            score: u.score,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(primary_key(task_id))]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct Task {
    pub task_id: i32,
    pub user_id: i32,
    pub task_description: String,
    pub points: i32,
    pub timestamp: NaiveDateTime,
    pub mentor_username: Option<String>,
}

impl From<Task> for TaskEntry {
    fn from(t: Task) -> Self {
        TaskEntry {
            description: t.task_description,
            points: t.points,
            recorded_at: DateTime::<Utc>::from_naive_utc_and_offset(t.timestamp, Utc),
            mentor: t.mentor_username,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub user_id: i32,
    pub task_description: &'a str,
    pub points: i32,
    pub timestamp: NaiveDateTime,
    pub mentor_username: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = tasks_info)]
#[diesel(primary_key(task_id))]
pub struct TaskInfo {
    pub task_id: i32,
    pub task_description: String,
    pub points: i32,
}

impl From<TaskInfo> for TaskDefinition {
    fn from(t: TaskInfo) -> Self {
        TaskDefinition {
            description: t.task_description,
            points: t.points,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = tasks_info)]
pub struct NewTaskInfo<'a> {
    pub task_description: &'a str,
    pub points: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = admin)]
#[diesel(primary_key(admin_id))]
pub struct Admin {
    pub admin_id: i32,
    pub username: String,
}

#[derive(Insertable)]
#[diesel(table_name = admin)]
pub struct NewAdmin<'a> {
    pub admin_id: i32,
    pub username: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = job_runs)]
#[diesel(primary_key(job))]
pub struct JobRun {
    pub job: String,
    pub last_run_at: NaiveDateTime,
}

/// What `record_task` stored, plus the owner's score afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTask {
    pub username: String,
    pub description: String,
    pub points: i32,
    pub new_score: i32,
    pub mentor: Option<String>,
    pub recorded_at: NaiveDateTime,
}
