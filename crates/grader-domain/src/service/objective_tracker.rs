//! Objective Tracker - Completes objectives from classifier matches
//!
//! For each match, the originating action decides the task type
//! ("comment" for public comments, "dm" for chats) and the resolved
//! target. Only open objectives of the current level are consulted,
//! so an objective completes at most once.

use crate::model::action::{Action, CategoryMatch};
use crate::model::session::Timestamp;
use crate::repository::agent_repository::RepositoryError;
use crate::repository::objective_repository::ObjectiveRepository;

/// Events emitted by the ObjectiveTracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectiveEvent {
    Completed {
        objective_id: String,
        label: String,
        category: String,
        action_id: String,
    },
    /// Match refers to an action that is not in the batch
    UnknownAction { action_id: String },
}

/// ObjectiveTracker - Stateless
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectiveTracker;

impl ObjectiveTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn track<R: ObjectiveRepository + ?Sized>(
        &self,
        objectives: &mut R,
        level: u32,
        matches: &[CategoryMatch],
        actions: &[Action],
        now: Timestamp,
    ) -> Result<Vec<ObjectiveEvent>, RepositoryError> {
        let mut events = Vec::new();

        for matched in matches {
            let Some(action) = actions.iter().find(|a| a.id == matched.action_id) else {
                events.push(ObjectiveEvent::UnknownAction {
                    action_id: matched.action_id.as_str().to_string(),
                });
                continue;
            };

            let open = objectives.find_open(level, &matched.category, action.kind.task_type())?;
            for mut objective in open {
                if !objective.is_satisfied_by(matched, action.target.as_deref()) {
                    continue;
                }
                if objective.complete(now) {
                    objectives.save(&objective)?;
                    events.push(ObjectiveEvent::Completed {
                        objective_id: objective.id().as_str().to_string(),
                        label: objective.label().to_string(),
                        category: matched.category.clone(),
                        action_id: matched.action_id.as_str().to_string(),
                    });
                }
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::action::{ActionId, Participant, ParticipantKind};
    use crate::model::objective::{Objective, ObjectiveId, TaskType};

    #[derive(Default)]
    struct VecObjectiveRepo {
        objectives: Vec<Objective>,
    }

    impl ObjectiveRepository for VecObjectiveRepo {
        fn save(&mut self, objective: &Objective) -> Result<(), RepositoryError> {
            match self.objectives.iter_mut().find(|o| o.id() == objective.id()) {
                Some(existing) => *existing = objective.clone(),
                None => self.objectives.push(objective.clone()),
            }
            Ok(())
        }

        fn find_by_id(&self, id: &ObjectiveId) -> Result<Option<Objective>, RepositoryError> {
            Ok(self.objectives.iter().find(|o| o.id() == id).cloned())
        }

        fn find_by_level(&self, level: u32) -> Result<Vec<Objective>, RepositoryError> {
            Ok(self
                .objectives
                .iter()
                .filter(|o| o.level() == level)
                .cloned()
                .collect())
        }

        fn list_all(&self) -> Result<Vec<Objective>, RepositoryError> {
            Ok(self.objectives.clone())
        }
    }

    fn user() -> Participant {
        Participant {
            kind: ParticipantKind::User,
            id: Some("u-1".to_string()),
            username: Some("player".to_string()),
        }
    }

    fn support_objective(level: u32) -> Objective {
        Objective::new(
            ObjectiveId::new(format!("support-{}", level)),
            level,
            "PublicVictimSupport",
            TaskType::Comment,
            "Stand up for victim1",
        )
        .with_target(None, Some("victim1".to_string()))
    }

    fn support_match(action: &str) -> CategoryMatch {
        CategoryMatch::new(
            ActionId::new(action),
            "PublicVictimSupport",
            vec!["victim1".to_string()],
        )
    }

    #[test]
    fn test_public_support_completes_comment_objective() {
        let mut repo = VecObjectiveRepo::default();
        repo.save(&support_objective(1)).unwrap();
        let actions = vec![Action::comment("c1", "leave them alone", user())];

        let events = ObjectiveTracker::new()
            .track(&mut repo, 1, &[support_match("c1")], &actions, Timestamp::from_millis(42))
            .unwrap();

        assert_eq!(events.len(), 1);
        let objective = repo.find_by_id(&ObjectiveId::new("support-1")).unwrap().unwrap();
        assert!(objective.is_completed());
        assert_eq!(objective.completed_at(), Some(Timestamp::from_millis(42)));
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut repo = VecObjectiveRepo::default();
        repo.save(&support_objective(1)).unwrap();
        let actions = vec![
            Action::comment("c1", "stop it", user()),
            Action::comment("c2", "stop it again", user()),
        ];
        let tracker = ObjectiveTracker::new();

        tracker
            .track(&mut repo, 1, &[support_match("c1")], &actions, Timestamp::from_millis(1))
            .unwrap();
        let events = tracker
            .track(&mut repo, 1, &[support_match("c2")], &actions, Timestamp::from_millis(99))
            .unwrap();

        assert!(events.is_empty());
        let objective = repo.find_by_id(&ObjectiveId::new("support-1")).unwrap().unwrap();
        assert_eq!(objective.completed_at(), Some(Timestamp::from_millis(1)));
    }

    #[test]
    fn test_task_type_must_match() {
        let mut repo = VecObjectiveRepo::default();
        repo.save(&support_objective(1)).unwrap();
        let actions = vec![Action::chat(
            "m1",
            "are you ok?",
            user(),
            "player-victim1",
            Some("victim1".to_string()),
            true,
        )];

        let events = ObjectiveTracker::new()
            .track(&mut repo, 1, &[support_match("m1")], &actions, Timestamp::from_millis(1))
            .unwrap();

        assert!(events.is_empty());
    }

    #[test]
    fn test_other_levels_are_ignored() {
        let mut repo = VecObjectiveRepo::default();
        repo.save(&support_objective(2)).unwrap();
        let actions = vec![Action::comment("c1", "stop", user())];

        let events = ObjectiveTracker::new()
            .track(&mut repo, 1, &[support_match("c1")], &actions, Timestamp::from_millis(1))
            .unwrap();

        assert!(events.is_empty());
    }

    #[test]
    fn test_dm_target_satisfies_without_affected_agents() {
        let mut repo = VecObjectiveRepo::default();
        repo.save(
            &Objective::new(
                ObjectiveId::new("ask"),
                1,
                "InvestigateInformer",
                TaskType::Dm,
                "Find out who leaked it",
            )
            .with_target(None, Some("friend2".to_string())),
        )
        .unwrap();
        let actions = vec![Action::chat(
            "m1",
            "who told them?",
            user(),
            "player-friend2",
            Some("friend2".to_string()),
            true,
        )];
        let matched = CategoryMatch::new(ActionId::new("m1"), "InvestigateInformer", vec![]);

        let events = ObjectiveTracker::new()
            .track(&mut repo, 1, &[matched], &actions, Timestamp::from_millis(1))
            .unwrap();

        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unknown_action_is_reported() {
        let mut repo = VecObjectiveRepo::default();
        let events = ObjectiveTracker::new()
            .track(&mut repo, 1, &[support_match("gone")], &[], Timestamp::from_millis(1))
            .unwrap();

        assert_eq!(
            events,
            vec![ObjectiveEvent::UnknownAction {
                action_id: "gone".to_string()
            }]
        );
    }
}
