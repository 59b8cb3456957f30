//! Recalculation engine for objective progress.
//!
//! `recalculate_progress` recomputes one objective from its strategy and
//! walks the parent chain upward, persisting each level before reading the
//! next, so a parent always aggregates already-updated children. The
//! trigger entry points (`recalculate_for_task` / `recalculate_for_project`)
//! are best-effort: they run after a primary mutation has already
//! succeeded, so failures are logged and swallowed rather than propagated.

use crate::goals::store::{GoalStore, ObjectiveSnapshot};
use crate::goals::{strategy, GoalsError, KeyResultUpdate, ProgressSource};
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub struct GoalProgressService {
    store: Arc<dyn GoalStore>,
}

impl GoalProgressService {
    pub fn new(store: Arc<dyn GoalStore>) -> Self {
        Self { store }
    }

    /// Recomputes an objective's progress, persists it, and cascades to
    /// its ancestors. Returns the unrounded value computed for the
    /// requested objective; the persisted value is rounded to an integer.
    ///
    /// Manual objectives are returned as stored, never written, and stop
    /// the upward walk.
    pub async fn recalculate_progress(&self, objective_id: Uuid) -> Result<f64, GoalsError> {
        let snapshot = self.load_snapshot(objective_id).await?;

        if snapshot.source == ProgressSource::Manual {
            return Ok(strategy::manual(snapshot.progress));
        }

        let computed = compute(&snapshot);
        self.persist(&snapshot, computed).await?;

        // The hierarchy is expected to be acyclic, but nothing enforces
        // that at write time. Track visited ids and stop on a revisit.
        let mut visited = HashSet::from([objective_id]);
        let mut next = snapshot.parent_id;

        while let Some(ancestor_id) = next {
            if !visited.insert(ancestor_id) {
                warn!("Cycle in objective hierarchy at {ancestor_id}, stopping cascade");
                break;
            }
            let snapshot = self.load_snapshot(ancestor_id).await?;
            if snapshot.source == ProgressSource::Manual {
                break;
            }
            let value = compute(&snapshot);
            self.persist(&snapshot, value).await?;
            next = snapshot.parent_id;
        }

        Ok(computed)
    }

    /// Recalculates every objective affected by a task change: objectives
    /// linked to the task, objectives owning a key result linked to the
    /// task, and objectives linked to the task's parent project. Each
    /// unique objective is recalculated at most once per call.
    pub async fn recalculate_for_task(&self, task_id: Uuid) {
        let targets = match self.objectives_for_task_event(task_id).await {
            Ok(targets) => targets,
            Err(err) => {
                warn!("Failed to resolve objectives for task {task_id}: {err}");
                return;
            }
        };
        self.recalculate_all(&targets).await;
    }

    /// Recalculates every objective linked to a project, best-effort.
    pub async fn recalculate_for_project(&self, project_id: Uuid) {
        let targets = match self.store.objectives_for_project(project_id).await {
            Ok(ids) => dedup(ids),
            Err(err) => {
                warn!("Failed to resolve objectives for project {project_id}: {err}");
                return;
            }
        };
        self.recalculate_all(&targets).await;
    }

    /// Applies a new current value to a key result. The audit record and
    /// the value change commit in one transaction; recalculation of the
    /// owning objective runs only after the commit.
    pub async fn update_key_result_and_recalculate(
        &self,
        key_result_id: Uuid,
        new_value: f64,
        author_id: Uuid,
        note: Option<String>,
    ) -> Result<(), GoalsError> {
        let objective_id = self
            .store
            .apply_key_result_update(key_result_id, new_value, author_id, note)
            .await?;
        info!("Recorded update for key result {key_result_id}");

        self.recalculate_progress(objective_id).await?;
        Ok(())
    }

    /// Audit trail for a key result, newest first.
    pub async fn key_result_history(
        &self,
        key_result_id: Uuid,
    ) -> Result<Vec<KeyResultUpdate>, GoalsError> {
        self.store.key_result_history(key_result_id).await
    }

    async fn load_snapshot(&self, objective_id: Uuid) -> Result<ObjectiveSnapshot, GoalsError> {
        self.store
            .load_objective(objective_id)
            .await?
            .ok_or_else(|| GoalsError::NotFound(format!("Objective {objective_id} not found")))
    }

    async fn persist(
        &self,
        snapshot: &ObjectiveSnapshot,
        computed: f64,
    ) -> Result<(), GoalsError> {
        let rounded = (computed.round() as i32).clamp(0, 100);
        self.store
            .update_objective_progress(snapshot.id, rounded)
            .await?;
        info!(
            "Objective {} progress {} -> {} ({})",
            snapshot.id,
            snapshot.progress,
            rounded,
            snapshot.source.to_str()
        );
        Ok(())
    }

    async fn objectives_for_task_event(&self, task_id: Uuid) -> Result<Vec<Uuid>, GoalsError> {
        let mut ids = self.store.objectives_for_task(task_id).await?;
        ids.extend(self.store.objectives_via_key_results(task_id).await?);
        if let Some(project_id) = self.store.task_project(task_id).await? {
            ids.extend(self.store.objectives_for_project(project_id).await?);
        }
        Ok(dedup(ids))
    }

    async fn recalculate_all(&self, objective_ids: &[Uuid]) {
        for &objective_id in objective_ids {
            if let Err(err) = self.recalculate_progress(objective_id).await {
                warn!("Progress recalculation for objective {objective_id} failed: {err}");
            }
        }
    }
}

fn compute(snapshot: &ObjectiveSnapshot) -> f64 {
    match snapshot.source {
        ProgressSource::Manual => strategy::manual(snapshot.progress),
        ProgressSource::KeyResults => strategy::from_key_results(&snapshot.key_results),
        ProgressSource::SubObjectives => strategy::from_sub_objectives(&snapshot.children),
        ProgressSource::Projects => strategy::from_projects(&snapshot.projects),
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
