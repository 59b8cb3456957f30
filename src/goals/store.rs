//! Persistence boundary for goal progress aggregation.
//!
//! The recalculation engine only ever sees [`ObjectiveSnapshot`] values, so
//! the strategies stay pure functions and the engine can be exercised
//! against any [`GoalStore`] implementation. [`DieselGoalStore`] is the
//! production implementation over PostgreSQL.

use crate::goals::{GoalsError, KeyResultUpdate, ProgressSource};
use crate::schema::goals::{
    key_result_tasks, key_result_updates, key_results, objective_projects, objective_tasks,
    objectives,
};
use crate::schema::tasks::tasks;
use crate::shared::utils::DbPool;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One key result's measure triple, already converted to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyResultMeasure {
    pub start_value: f64,
    pub current_value: f64,
    pub target_value: f64,
}

/// A child objective's identifier and stored progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProgress {
    pub id: Uuid,
    pub progress: i32,
}

/// Completion flags of one linked project's top-level tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTaskFlags {
    pub project_id: Uuid,
    pub tasks: Vec<bool>,
}

/// Everything the aggregation strategies need to recompute one objective.
#[derive(Debug, Clone)]
pub struct ObjectiveSnapshot {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub source: ProgressSource,
    pub progress: i32,
    pub key_results: Vec<KeyResultMeasure>,
    pub children: Vec<ChildProgress>,
    pub projects: Vec<ProjectTaskFlags>,
}

#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Loads an objective with the related data its strategy reads.
    /// Returns `None` when the objective does not exist.
    async fn load_objective(
        &self,
        objective_id: Uuid,
    ) -> Result<Option<ObjectiveSnapshot>, GoalsError>;

    /// Single-field write of a recomputed progress value.
    async fn update_objective_progress(
        &self,
        objective_id: Uuid,
        progress: i32,
    ) -> Result<(), GoalsError>;

    /// Atomically records an audit row and sets the key result's current
    /// value. Returns the owning objective's id. Fails with `NotFound`
    /// when the key result does not exist.
    async fn apply_key_result_update(
        &self,
        key_result_id: Uuid,
        new_value: f64,
        author_id: Uuid,
        note: Option<String>,
    ) -> Result<Uuid, GoalsError>;

    /// Audit trail for a key result, newest first.
    async fn key_result_history(
        &self,
        key_result_id: Uuid,
    ) -> Result<Vec<KeyResultUpdate>, GoalsError>;

    /// Objectives directly linked to a task.
    async fn objectives_for_task(&self, task_id: Uuid) -> Result<Vec<Uuid>, GoalsError>;

    /// Objectives owning a key result linked to a task.
    async fn objectives_via_key_results(&self, task_id: Uuid) -> Result<Vec<Uuid>, GoalsError>;

    /// Objectives directly linked to a project.
    async fn objectives_for_project(&self, project_id: Uuid) -> Result<Vec<Uuid>, GoalsError>;

    /// The project a task belongs to, if any.
    async fn task_project(&self, task_id: Uuid) -> Result<Option<Uuid>, GoalsError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = objectives)]
pub struct ObjectiveRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub owner_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub progress: i32,
    pub progress_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = key_results)]
pub struct KeyResultRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    pub start_value: BigDecimal,
    pub current_value: BigDecimal,
    pub target_value: BigDecimal,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = key_result_updates)]
pub struct KeyResultUpdateRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub key_result_id: Uuid,
    pub author_id: Uuid,
    pub previous_value: BigDecimal,
    pub new_value: BigDecimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn record_to_key_result_update(record: KeyResultUpdateRecord) -> KeyResultUpdate {
    KeyResultUpdate {
        id: record.id,
        key_result_id: record.key_result_id,
        author_id: record.author_id,
        previous_value: record.previous_value.to_f64().unwrap_or(0.0),
        new_value: record.new_value.to_f64().unwrap_or(0.0),
        note: record.note,
        created_at: record.created_at,
    }
}

#[derive(Clone)]
pub struct DieselGoalStore {
    pool: DbPool,
}

impl DieselGoalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoalStore for DieselGoalStore {
    async fn load_objective(
        &self,
        objective_id: Uuid,
    ) -> Result<Option<ObjectiveSnapshot>, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;

            let record = objectives::table
                .find(objective_id)
                .first::<ObjectiveRecord>(&mut conn)
                .optional()?;
            let Some(record) = record else {
                return Ok(None);
            };

            let key_results = key_results::table
                .filter(key_results::objective_id.eq(objective_id))
                .order(key_results::created_at.asc())
                .load::<KeyResultRecord>(&mut conn)?
                .into_iter()
                .map(|kr| KeyResultMeasure {
                    start_value: kr.start_value.to_f64().unwrap_or(0.0),
                    current_value: kr.current_value.to_f64().unwrap_or(0.0),
                    target_value: kr.target_value.to_f64().unwrap_or(0.0),
                })
                .collect();

            let children = objectives::table
                .filter(objectives::parent_id.eq(objective_id))
                .select((objectives::id, objectives::progress))
                .load::<(Uuid, i32)>(&mut conn)?
                .into_iter()
                .map(|(id, progress)| ChildProgress { id, progress })
                .collect();

            let project_ids = objective_projects::table
                .filter(objective_projects::objective_id.eq(objective_id))
                .select(objective_projects::project_id)
                .load::<Uuid>(&mut conn)?;

            let mut projects = Vec::with_capacity(project_ids.len());
            for project_id in project_ids {
                let flags = tasks::table
                    .filter(tasks::project_id.eq(project_id))
                    .filter(tasks::parent_id.is_null())
                    .select(tasks::completed)
                    .load::<bool>(&mut conn)?;
                projects.push(ProjectTaskFlags {
                    project_id,
                    tasks: flags,
                });
            }

            Ok(Some(ObjectiveSnapshot {
                id: record.id,
                parent_id: record.parent_id,
                source: ProgressSource::from_str(&record.progress_source),
                progress: record.progress,
                key_results,
                children,
                projects,
            }))
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn update_objective_progress(
        &self,
        objective_id: Uuid,
        progress: i32,
    ) -> Result<(), GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;

            let updated = diesel::update(objectives::table.find(objective_id))
                .set((
                    objectives::progress.eq(progress),
                    objectives::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?;

            if updated == 0 {
                return Err(GoalsError::NotFound(format!(
                    "Objective {objective_id} not found"
                )));
            }
            Ok(())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn apply_key_result_update(
        &self,
        key_result_id: Uuid,
        new_value: f64,
        author_id: Uuid,
        note: Option<String>,
    ) -> Result<Uuid, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;

            conn.transaction::<Uuid, GoalsError, _>(|conn| {
                let kr = key_results::table
                    .find(key_result_id)
                    .first::<KeyResultRecord>(conn)
                    .optional()?
                    .ok_or_else(|| {
                        GoalsError::NotFound(format!("Key result {key_result_id} not found"))
                    })?;

                let now = Utc::now();
                let value = BigDecimal::try_from(new_value)
                    .map_err(|e| GoalsError::Validation(e.to_string()))?;

                let audit = KeyResultUpdateRecord {
                    id: Uuid::new_v4(),
                    org_id: kr.org_id,
                    key_result_id,
                    author_id,
                    previous_value: kr.current_value.clone(),
                    new_value: value.clone(),
                    note,
                    created_at: now,
                };
                diesel::insert_into(key_result_updates::table)
                    .values(&audit)
                    .execute(conn)?;

                diesel::update(key_results::table.find(key_result_id))
                    .set((
                        key_results::current_value.eq(value),
                        key_results::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                Ok(kr.objective_id)
            })
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn key_result_history(
        &self,
        key_result_id: Uuid,
    ) -> Result<Vec<KeyResultUpdate>, GoalsError> {
        let pool = self.pool.clone();

        let records = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            key_result_updates::table
                .filter(key_result_updates::key_result_id.eq(key_result_id))
                .order(key_result_updates::created_at.desc())
                .load::<KeyResultUpdateRecord>(&mut conn)
                .map_err(GoalsError::from)
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))??;

        Ok(records.into_iter().map(record_to_key_result_update).collect())
    }

    async fn objectives_for_task(&self, task_id: Uuid) -> Result<Vec<Uuid>, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            objective_tasks::table
                .filter(objective_tasks::task_id.eq(task_id))
                .select(objective_tasks::objective_id)
                .load::<Uuid>(&mut conn)
                .map_err(GoalsError::from)
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn objectives_via_key_results(&self, task_id: Uuid) -> Result<Vec<Uuid>, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;

            let kr_ids = key_result_tasks::table
                .filter(key_result_tasks::task_id.eq(task_id))
                .select(key_result_tasks::key_result_id)
                .load::<Uuid>(&mut conn)?;

            if kr_ids.is_empty() {
                return Ok(Vec::new());
            }

            key_results::table
                .filter(key_results::id.eq_any(kr_ids))
                .select(key_results::objective_id)
                .load::<Uuid>(&mut conn)
                .map_err(GoalsError::from)
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn objectives_for_project(&self, project_id: Uuid) -> Result<Vec<Uuid>, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            objective_projects::table
                .filter(objective_projects::project_id.eq(project_id))
                .select(objective_projects::objective_id)
                .load::<Uuid>(&mut conn)
                .map_err(GoalsError::from)
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }

    async fn task_project(&self, task_id: Uuid) -> Result<Option<Uuid>, GoalsError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| GoalsError::Database(e.to_string()))?;
            let project_id = tasks::table
                .find(task_id)
                .select(tasks::project_id)
                .first::<Option<Uuid>>(&mut conn)
                .optional()?;
            Ok(project_id.flatten())
        })
        .await
        .map_err(|e| GoalsError::Database(e.to_string()))?
    }
}
