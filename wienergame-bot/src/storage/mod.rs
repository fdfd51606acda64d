pub mod models;
pub mod schema;

use std::path::Path;

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{JobRun, NewAdmin, NewTask, NewTaskInfo, NewUser, RecordedTask, Task, TaskInfo, User};
use tracing::{debug, info, trace};
use wienergame_shared::csv_import::{self, CsvImportError, TaskDefinition};
use wienergame_shared::{ScoreRow, TaskEntry};

/// The admin table holds at most this one row.
pub const ADMIN_ROW_ID: i32 = 1;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The task-definition file could not be decoded.
    #[error("csv import failed: {0}")]
    Csv(#[from] CsvImportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl Store {
    /// Connects to PostgreSQL and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = {
            let builder = Pool::builder().max_size(max_connections.max(1));
            tokio::task::spawn_blocking(move || builder.build(manager)).await??
        };
        let store = Store { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Applies embedded migrations; a no-op when the schema is current.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| StorageError::Migration(e.to_string()))?;
            for version in &applied {
                info!(%version, "applied migration");
            }
            Ok(())
        })
        .await?
    }

    pub async fn upsert_user(&self, username: &str) -> Result<(), StorageError> {
        let pool = self.pool.clone();
        let name = username.to_string();
        trace!(username = %name, "upsert_user");
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            insert_user_if_missing(&mut conn, &name)?;
            Ok(())
        })
        .await?
    }

    /// Stores one completed task and adds its points to the owner's score.
    ///
    /// Points come from `tasks_info` at the time of the call; an unknown
    /// description is recorded with 0 points. All steps share one transaction.
    pub async fn record_task(
        &self,
        username: &str,
        description: &str,
        mentor: Option<&str>,
    ) -> Result<RecordedTask, StorageError> {
        use schema::{tasks, tasks_info, users};
        let pool = self.pool.clone();
        let name = username.to_string();
        let desc = description.to_string();
        let mentor = mentor.map(|m| m.to_string());
        trace!(username = %name, description = %desc, mentor = ?mentor, "record_task starting");
        tokio::task::spawn_blocking(move || -> Result<RecordedTask, StorageError> {
            let mut conn = pool.get()?;
            conn.transaction(|conn| -> Result<RecordedTask, StorageError> {
                insert_user_if_missing(conn, &name)?;
                let user_id: i32 = users::table
                    .filter(users::username.eq(&name))
                    .select(users::user_id)
                    .first(conn)?;
                let points: i32 = tasks_info::table
                    .filter(tasks_info::task_description.eq(&desc))
                    .select(tasks_info::points)
                    .first::<i32>(conn)
                    .optional()?
                    .unwrap_or(0);
                let now = Utc::now().naive_utc();
                let row = NewTask {
                    user_id,
                    task_description: &desc,
                    points,
                    timestamp: now,
                    mentor_username: mentor.as_deref(),
                };
                diesel::insert_into(tasks::table)
                    .values(&row)
                    .execute(conn)?;
                let new_score: i32 = diesel::update(users::table.filter(users::user_id.eq(user_id)))
                    .set(users::score.eq(users::score + points))
                    .returning(users::score)
                    .get_result(conn)?;
                Ok(RecordedTask {
                    username: name.clone(),
                    description: desc.clone(),
                    points,
                    new_score,
                    mentor: mentor.clone(),
                    recorded_at: now,
                })
            })
        })
        .await?
    }

    pub async fn get_user_score(&self, username_: &str) -> Result<i32, StorageError> {
        use schema::users::dsl::*;
        let pool = self.pool.clone();
        let name = username_.to_string();
        tokio::task::spawn_blocking(move || -> Result<i32, StorageError> {
            let mut conn = pool.get()?;
            Ok(users
                .filter(username.eq(&name))
                .select(score)
                .first::<i32>(&mut conn)
                .optional()?
                .unwrap_or(0))
        })
        .await?
    }

    /// Highest score first; equal scores are ordered by username.
    pub async fn get_all_user_scores(&self) -> Result<Vec<ScoreRow>, StorageError> {
        use schema::users::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<ScoreRow>, StorageError> {
            let mut conn = pool.get()?;
            let rows = users
                .order((score.desc(), username.asc()))
                .select(User::as_select())
                .load::<User>(&mut conn)?;
            Ok(rows.into_iter().map(ScoreRow::from).collect())
        })
        .await?
    }

    /// Oldest first. Unknown users have no tasks.
    pub async fn get_user_tasks(&self, username: &str) -> Result<Vec<TaskEntry>, StorageError> {
        use schema::{tasks, users};
        let pool = self.pool.clone();
        let name = username.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<TaskEntry>, StorageError> {
            let mut conn = pool.get()?;
            let rows = tasks::table
                .inner_join(users::table)
                .filter(users::username.eq(&name))
                .order((tasks::timestamp.asc(), tasks::task_id.asc()))
                .select(Task::as_select())
                .load::<Task>(&mut conn)?;
            Ok(rows.into_iter().map(TaskEntry::from).collect())
        })
        .await?
    }

    /// Replaces the admin in a single statement.
    pub async fn set_admin(&self, username: &str) -> Result<(), StorageError> {
        use schema::admin;
        let pool = self.pool.clone();
        let name = username.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            let row = NewAdmin {
                admin_id: ADMIN_ROW_ID,
                username: &name,
            };
            diesel::insert_into(admin::table)
                .values(&row)
                .on_conflict(admin::admin_id)
                .do_update()
                .set(admin::username.eq(&name))
                .execute(&mut conn)?;
            info!(username = %name, "admin set");
            Ok(())
        })
        .await?
    }

    pub async fn get_admin(&self) -> Result<Option<String>, StorageError> {
        use schema::admin::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<String>, StorageError> {
            let mut conn = pool.get()?;
            Ok(admin
                .filter(admin_id.eq(ADMIN_ROW_ID))
                .select(username)
                .first::<String>(&mut conn)
                .optional()?)
        })
        .await?
    }

    /// Decodes a task-definition CSV file and upserts every row; nothing is
    /// written when any row fails to decode. Returns the number of rows stored.
    pub async fn import_tasks_from_file(&self, path: &Path) -> Result<usize, StorageError> {
        let path = path.to_path_buf();
        let defs = tokio::task::spawn_blocking(
            move || -> Result<Vec<TaskDefinition>, StorageError> {
                let file = std::fs::File::open(&path)?;
                Ok(csv_import::decode(std::io::BufReader::new(file))?)
            },
        )
        .await??;
        self.import_task_definitions(defs).await
    }

    pub async fn import_task_definitions(
        &self,
        defs: Vec<TaskDefinition>,
    ) -> Result<usize, StorageError> {
        use diesel::upsert::excluded;
        use schema::tasks_info;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, StorageError> {
            let mut conn = pool.get()?;
            conn.transaction(|conn| -> Result<(), StorageError> {
                for def in &defs {
                    let row = NewTaskInfo {
                        task_description: &def.description,
                        points: def.points,
                    };
                    diesel::insert_into(tasks_info::table)
                        .values(&row)
                        .on_conflict(tasks_info::task_description)
                        .do_update()
                        .set(tasks_info::points.eq(excluded(tasks_info::points)))
                        .execute(conn)?;
                }
                Ok(())
            })?;
            debug!(rows = defs.len(), "task definitions imported");
            Ok(defs.len())
        })
        .await?
    }

    pub async fn list_task_definitions(&self) -> Result<Vec<TaskDefinition>, StorageError> {
        use schema::tasks_info::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<TaskDefinition>, StorageError> {
            let mut conn = pool.get()?;
            let rows = tasks_info
                .order(task_description.asc())
                .select(TaskInfo::as_select())
                .load::<TaskInfo>(&mut conn)?;
            Ok(rows.into_iter().map(TaskDefinition::from).collect())
        })
        .await?
    }

    pub async fn last_job_run(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        use schema::job_runs::dsl::*;
        let pool = self.pool.clone();
        let name = job_name.to_string();
        tokio::task::spawn_blocking(move || -> Result<Option<DateTime<Utc>>, StorageError> {
            let mut conn = pool.get()?;
            let at = job_runs
                .filter(job.eq(&name))
                .select(last_run_at)
                .first::<chrono::NaiveDateTime>(&mut conn)
                .optional()?;
            Ok(at.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)))
        })
        .await?
    }

    pub async fn mark_job_run(&self, job_name: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        use schema::job_runs;
        let pool = self.pool.clone();
        let row = JobRun {
            job: job_name.to_string(),
            last_run_at: at.naive_utc(),
        };
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            diesel::insert_into(job_runs::table)
                .values(&row)
                .on_conflict(job_runs::job)
                .do_update()
                .set(job_runs::last_run_at.eq(row.last_run_at))
                .execute(&mut conn)?;
            Ok(())
        })
        .await?
    }
}

fn insert_user_if_missing(conn: &mut PgConnection, name: &str) -> Result<usize, diesel::result::Error> {
    use schema::users;
    diesel::insert_into(users::table)
        .values(&NewUser { username: name })
        .on_conflict(users::username)
        .do_nothing()
        .execute(conn)
}
