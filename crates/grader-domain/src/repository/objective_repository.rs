//! Objective Repository - Abstract persistence for level Objectives

use crate::model::objective::{Objective, ObjectiveId, TaskType};
use crate::repository::agent_repository::RepositoryError;

/// Objective Repository Trait
///
/// This is a PORT in hexagonal architecture.
pub trait ObjectiveRepository {
    /// Save an objective (create or update)
    fn save(&mut self, objective: &Objective) -> Result<(), RepositoryError>;

    /// Find an objective by id
    fn find_by_id(&self, id: &ObjectiveId) -> Result<Option<Objective>, RepositoryError>;

    /// All objectives of a level, sorted by `order`
    fn find_by_level(&self, level: u32) -> Result<Vec<Objective>, RepositoryError>;

    /// List every objective
    fn list_all(&self) -> Result<Vec<Objective>, RepositoryError>;

    /// Open objectives of a level for a category and task type.
    ///
    /// Completed objectives are never returned, which is what keeps
    /// completion idempotent.
    fn find_open(
        &self,
        level: u32,
        category: &str,
        task_type: TaskType,
    ) -> Result<Vec<Objective>, RepositoryError> {
        Ok(self
            .find_by_level(level)?
            .into_iter()
            .filter(|o| {
                !o.is_completed() && o.goal_category() == category && o.task_type() == task_type
            })
            .collect())
    }
}
