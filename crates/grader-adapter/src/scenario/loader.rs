//! ScenarioLoader - Level rules, agents and objectives from files
//!
//! Level folders come from `level_order.json` when present, otherwise
//! from every `level*` directory, with the level number taken from the
//! solutions file itself.

use std::path::{Path, PathBuf};

use grader_domain::{
    Agent, AgentId, AgentRepository, AgentRole, Attribute, Category, NextStep, Objective,
    ObjectiveId, ObjectiveRepository, RepositoryError, RuleBook, RuleSet, TaskType, Traits,
};
use serde::de::DeserializeOwned;
use shared::{
    AgentDefinition, CategoryDefinition, DeltaSpec, GraderError, LevelOrderEntry,
    ObjectiveDefinition, PopulationFile, ScenarioError, SolutionsFile,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const LEVEL_ORDER: &str = "level_order.json";
const SOLUTIONS: &str = "solutions";
const POPULATION: &str = "population";
const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Everything a scenario directory defines
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub rules: RuleBook,
    pub agents: Vec<Agent>,
    pub objectives: Vec<Objective>,
}

impl Scenario {
    /// Write agents and objectives into the stores
    pub fn seed<A, O>(&self, agents: &mut A, objectives: &mut O) -> Result<(), RepositoryError>
    where
        A: AgentRepository + ?Sized,
        O: ObjectiveRepository + ?Sized,
    {
        for agent in &self.agents {
            agents.register(agent.clone())?;
        }
        for objective in &self.objectives {
            objectives.save(objective)?;
        }
        Ok(())
    }
}

fn scenario_error(path: &Path, reason: impl Into<String>) -> GraderError {
    ScenarioError {
        path: path.display().to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Parse JSON or YAML, picked by extension
fn read_document<T: DeserializeOwned>(path: &Path) -> shared::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(parsed)
}

/// `stem.json`, `stem.yaml` or `stem.yml`, first one that exists
fn find_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

fn traits_from(source: &Path, username: &str, values: &BTreeMap<String, f64>) -> Traits {
    let mut traits = Traits::new();
    for (name, value) in values {
        match Attribute::parse(name) {
            Some(attribute) => {
                traits.set(attribute, *value);
            }
            None => warn!(file = %source.display(), agent = username, field = %name, "Unknown attribute, skipped"),
        }
    }
    traits
}

fn category_from(source: &Path, level: u32, definition: &CategoryDefinition) -> Category {
    let mut category = Category::new(level, &definition.category, &definition.description)
        .with_agents(definition.agents.iter().cloned());

    match &definition.deltas {
        DeltaSpec::Fields(fields) => {
            for delta in fields {
                match Attribute::parse(&delta.field) {
                    Some(attribute) => category = category.with_delta(attribute, delta.value),
                    None => warn!(
                        file = %source.display(),
                        category = %definition.category,
                        field = %delta.field,
                        "Unknown delta field, skipped"
                    ),
                }
            }
        }
        DeltaSpec::Aggregate(value) => category = category.with_aggregate_delta(*value),
    }

    for step in &definition.next_steps {
        category = category.with_next_step(NextStep {
            kind: step.kind.clone(),
            agent: step.agent.clone(),
            content: step.content.clone(),
        });
    }
    category
}

fn agent_from(source: &Path, definition: &AgentDefinition) -> Agent {
    let traits = traits_from(source, &definition.username, &definition.traits);
    let initial = match &definition.initial_traits {
        Some(values) => traits_from(source, &definition.username, values),
        None => traits.clone(),
    };
    Agent::new(
        AgentId::new(&definition.id),
        &definition.username,
        AgentRole::parse(&definition.role),
    )
    .with_traits(traits)
    .with_initial_traits(initial)
}

fn objective_from(
    source: &Path,
    level: u32,
    index: usize,
    definition: &ObjectiveDefinition,
) -> Option<Objective> {
    let Some(task_type) = TaskType::parse(&definition.task_type) else {
        warn!(file = %source.display(), task_type = %definition.task_type, "Unknown task type, objective skipped");
        return None;
    };
    let level = definition.level.unwrap_or(level);
    let id = definition
        .id
        .clone()
        .unwrap_or_else(|| format!("level{}-{}", level, index + 1));

    let mut objective = Objective::new(
        ObjectiveId::new(id),
        level,
        &definition.goal_category,
        task_type,
        &definition.label,
    )
    .with_target(
        definition.target_agent.as_deref().map(AgentId::new),
        definition.target_agent_username.clone(),
    )
    .required(definition.is_required)
    .with_order(definition.order);
    if let Some(description) = &definition.description {
        objective = objective.with_description(description);
    }
    if let Some(hint) = &definition.hint {
        objective = objective.with_hint(hint);
    }
    Some(objective)
}

#[derive(Debug, Clone)]
pub struct ScenarioLoader {
    root: PathBuf,
}

impl ScenarioLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Level folders, with the level when `level_order.json` names it
    fn level_folders(&self) -> shared::Result<Vec<(Option<u32>, PathBuf)>> {
        let order_path = self.root.join(LEVEL_ORDER);
        if order_path.is_file() {
            let entries: Vec<LevelOrderEntry> = read_document(&order_path)?;
            return Ok(entries
                .into_iter()
                .map(|e| (Some(e.level), self.root.join(e.folder)))
                .collect());
        }

        debug!(root = %self.root.display(), "No level_order.json, discovering level folders");
        let pattern = self.root.join("level*");
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern).map_err(|e| scenario_error(&self.root, e.to_string()))?;

        let mut folders = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| scenario_error(&self.root, e.to_string()))?;
            if path.is_dir() {
                folders.push((None, path));
            }
        }
        folders.sort();
        Ok(folders)
    }

    pub fn load(&self) -> shared::Result<Scenario> {
        let mut scenario = Scenario::default();

        for (ordered_level, folder) in self.level_folders()? {
            let Some(solutions_path) = find_file(&folder, SOLUTIONS) else {
                return Err(scenario_error(&folder, "no solutions file"));
            };
            let solutions: SolutionsFile = read_document(&solutions_path)?;

            let level = match (ordered_level, solutions.declared_level()) {
                (Some(level), Some(declared)) if declared != level => {
                    warn!(
                        file = %solutions_path.display(),
                        level,
                        declared,
                        "Solutions file declares another level, using level_order.json"
                    );
                    level
                }
                (Some(level), _) => level,
                (None, Some(declared)) => declared,
                (None, None) => {
                    return Err(scenario_error(&solutions_path, "level is not declared"));
                }
            };
            if scenario.rules.for_level(level).is_some() {
                return Err(scenario_error(&folder, format!("level {} is defined twice", level)));
            }

            let categories: Vec<Category> = solutions
                .categories()
                .iter()
                .map(|c| category_from(&solutions_path, c.level.unwrap_or(level), c))
                .collect();
            info!(level, folder = %folder.display(), categories = categories.len(), "Level rules loaded");
            scenario.rules.insert(RuleSet::new(level, categories));

            if let Some(population_path) = find_file(&folder, POPULATION) {
                let population: PopulationFile = read_document(&population_path)?;
                for definition in &population.agents {
                    if scenario.agents.iter().any(|a| a.id().as_str() == definition.id) {
                        debug!(agent = %definition.id, "Agent already defined by an earlier level");
                        continue;
                    }
                    scenario.agents.push(agent_from(&population_path, definition));
                }
                scenario.objectives.extend(
                    population
                        .objectives
                        .iter()
                        .enumerate()
                        .filter_map(|(i, o)| objective_from(&population_path, level, i, o)),
                );
            }
        }

        if scenario.rules.is_empty() {
            return Err(scenario_error(&self.root, "no levels found"));
        }
        info!(
            levels = scenario.rules.len(),
            agents = scenario.agents.len(),
            objectives = scenario.objectives.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOLUTIONS_L1: &str = r#"{
        "level": 1,
        "categories": [
            {
                "category": "PublicVictimSupport",
                "description": "Publicly defends the victim",
                "deltas": [{"field": "PRS", "value": 1}, {"field": "BOGUS", "value": 3}],
                "next_steps": [{"type": "comment", "agent": "bully1", "content": "fine"}]
            },
            {
                "category": "InvestigateInformer",
                "description": "Asks who leaked",
                "deltas": -1,
                "agents": ["friend1"]
            }
        ]
    }"#;

    const POPULATION_L1: &str = r#"
agents:
  - id: a-bully1
    username: bully1
    role: bully
    traits: { AT: 3, PBC: 9, EMP: 3, TIN: 3, Mood: 2 }
  - id: a-victim1
    username: victim1
    role: victim
objectives:
  - goalCategory: PublicVictimSupport
    taskType: comment
    targetAgentUsername: victim1
    label: Stand up for the victim
  - goalCategory: PublicVictimSupport
    taskType: shout
    label: Invalid
"#;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_with_level_order() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            LEVEL_ORDER,
            r#"[{"level": 1, "folder": "intro"}, {"level": 2, "folder": "rumor"}]"#,
        );
        write(&root.path().join("intro"), "solutions.json", SOLUTIONS_L1);
        write(&root.path().join("intro"), "population.yaml", POPULATION_L1);
        write(
            &root.path().join("rumor"),
            "solutions.yaml",
            "- category: Ignore\n  description: Scrolls past\n",
        );

        let scenario = ScenarioLoader::new(root.path()).load().unwrap();

        assert_eq!(scenario.rules.levels(), vec![1, 2]);
        let level_one = scenario.rules.for_level(1).unwrap();
        let support = level_one.find("PublicVictimSupport").unwrap();
        assert_eq!(support.deltas().len(), 1);
        assert_eq!(support.next_steps()[0].agent, "bully1");
        let informer = level_one.find("InvestigateInformer").unwrap();
        assert_eq!(informer.aggregate_delta(), Some(-1.0));
        assert_eq!(informer.agents(), ["friend1".to_string()]);

        assert_eq!(scenario.agents.len(), 2);
        let bully = &scenario.agents[0];
        assert_eq!(bully.role(), AgentRole::Bully);
        assert_eq!(bully.attribute(Attribute::Pbc), Some(5.0));
        assert_eq!(bully.initial_traits(), Some(bully.traits()));

        assert_eq!(scenario.objectives.len(), 1);
        assert_eq!(scenario.objectives[0].id().as_str(), "level1-1");
        assert_eq!(scenario.objectives[0].target_agent_username(), Some("victim1"));
    }

    #[test]
    fn test_discovers_level_folders_without_order_file() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("level1-intro"), "solutions.json", SOLUTIONS_L1);
        write(
            &root.path().join("level3-final"),
            "solutions.json",
            r#"{"level": 3, "categories": []}"#,
        );
        write(&root.path().join("notes"), "solutions.json", "not even json");

        let scenario = ScenarioLoader::new(root.path()).load().unwrap();
        assert_eq!(scenario.rules.levels(), vec![1, 3]);
    }

    #[test]
    fn test_undeclared_level_is_an_error() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("level1"),
            "solutions.json",
            r#"[{"category": "A", "description": "a"}]"#,
        );

        let result = ScenarioLoader::new(root.path()).load();
        assert!(matches!(result, Err(GraderError::Scenario(_))));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let root = TempDir::new().unwrap();
        assert!(ScenarioLoader::new(root.path()).load().is_err());
    }

    #[test]
    fn test_seed_fills_the_stores() {
        use crate::repository::{InMemoryAgentRepository, InMemoryObjectiveRepository};

        let root = TempDir::new().unwrap();
        write(&root.path().join("level1"), "solutions.json", SOLUTIONS_L1);
        write(&root.path().join("level1"), "population.yaml", POPULATION_L1);
        let scenario = ScenarioLoader::new(root.path()).load().unwrap();

        let mut agents = InMemoryAgentRepository::new();
        let mut objectives = InMemoryObjectiveRepository::new();
        scenario.seed(&mut agents, &mut objectives).unwrap();

        assert_eq!(agents.list_all().unwrap().len(), 2);
        assert_eq!(objectives.find_by_level(1).unwrap().len(), 1);
    }
}
