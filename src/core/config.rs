//! Pipeline recipes from YAML

use crate::core::{
    condition::{ConditionPattern, FieldMatch},
    extensions::Extensions,
    handler::{handler_ref, HandlerRef},
    record::Record,
    step::{Step, StepAction, Variables},
};
use crate::execution::{
    compose::{Branch, Parallel, Series},
    entry::Pipeline,
};
use anyhow::{Context as _, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Top-level recipe loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Recipe name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Variables rendered into `set` values
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Steps run in series on every input record
    pub steps: Vec<StepConfig>,
}

/// One step as written in YAML: an optional name plus exactly one action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Record>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<Record>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<MatchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_if: Option<MatchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<StepConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<Vec<StepConfig>>,

    /// Each arm runs as a series on its own lineage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Vec<Vec<StepConfig>>>,
}

/// Field condition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    /// Dotted field path
    pub field: String,

    pub pattern: String,

    /// Whether to use regex pattern matching
    #[serde(default)]
    pub use_regex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    /// Dotted path of the array field
    pub field: String,

    /// Where each element goes; defaults to the split field itself
    #[serde(default)]
    pub into: Option<String>,
}

impl MatchConfig {
    fn to_field_match(&self) -> FieldMatch {
        FieldMatch::new(&self.field, ConditionPattern::new(&self.pattern, self.use_regex))
    }

    fn validate(&self, label: &str) -> Result<()> {
        if self.field.is_empty() {
            anyhow::bail!("Step '{}' has an empty field path", label);
        }
        if self.use_regex {
            Regex::new(&self.pattern)
                .with_context(|| format!("Step '{}' has an invalid regex pattern", label))?;
        }
        Ok(())
    }
}

/// The single action a step declares, borrowed from its config
enum ActionConfig<'a> {
    Set(&'a Record),
    Remove(&'a [String]),
    Replace(&'a Record),
    Filter(&'a MatchConfig),
    FinishIf(&'a MatchConfig),
    Split(&'a SplitConfig),
    Series(&'a [StepConfig]),
    Parallel(&'a [StepConfig]),
    Branch(&'a [Vec<StepConfig>]),
}

impl StepConfig {
    /// Resolve the step's action; fails unless exactly one is declared
    fn action(&self, label: &str) -> Result<ActionConfig<'_>> {
        let candidates = [
            self.set.as_ref().map(ActionConfig::Set),
            self.remove.as_deref().map(ActionConfig::Remove),
            self.replace.as_ref().map(ActionConfig::Replace),
            self.filter.as_ref().map(ActionConfig::Filter),
            self.finish_if.as_ref().map(ActionConfig::FinishIf),
            self.split.as_ref().map(ActionConfig::Split),
            self.series.as_deref().map(ActionConfig::Series),
            self.parallel.as_deref().map(ActionConfig::Parallel),
            self.branch.as_deref().map(ActionConfig::Branch),
        ];
        let mut actions: Vec<_> = candidates.into_iter().flatten().collect();

        let found = actions.len();
        match actions.pop() {
            Some(action) if found == 1 => Ok(action),
            _ => anyhow::bail!(
                "Step '{}' must declare exactly one action, found {}",
                label,
                found
            ),
        }
    }

    fn label(&self, path: &str) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, path),
            None => path.to_string(),
        }
    }

    /// Validate this step and everything nested in it
    fn validate(&self, path: &str) -> Result<()> {
        let label = self.label(path);

        match self.action(&label)? {
            ActionConfig::Filter(rule) | ActionConfig::FinishIf(rule) => rule.validate(&label)?,
            ActionConfig::Split(split) if split.field.is_empty() => {
                anyhow::bail!("Step '{}' splits an empty field path", label);
            }
            ActionConfig::Series(steps) => {
                validate_group(steps, &format!("{}.series", path), &label)?
            }
            ActionConfig::Parallel(steps) => {
                validate_group(steps, &format!("{}.parallel", path), &label)?
            }
            ActionConfig::Branch(arms) => {
                if arms.is_empty() {
                    anyhow::bail!("Step '{}' has an empty branch", label);
                }
                for (i, arm) in arms.iter().enumerate() {
                    validate_group(arm, &format!("{}.branch[{}]", path, i), &label)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Build the handler this step describes
    pub fn to_handler(&self) -> Result<HandlerRef> {
        self.build("step")
    }

    fn build(&self, path: &str) -> Result<HandlerRef> {
        let (default_name, action) = match self.action(&self.label(path))? {
            ActionConfig::Set(values) => ("set", StepAction::Set(values.clone())),
            ActionConfig::Remove(paths) => ("remove", StepAction::Remove(paths.to_vec())),
            ActionConfig::Replace(record) => ("replace", StepAction::Replace(record.clone())),
            ActionConfig::Filter(rule) => ("filter", StepAction::Filter(rule.to_field_match())),
            ActionConfig::FinishIf(rule) => {
                ("finish_if", StepAction::FinishIf(rule.to_field_match()))
            }
            ActionConfig::Split(split) => (
                "split",
                StepAction::Split {
                    field: split.field.clone(),
                    into: split.into.clone(),
                },
            ),
            ActionConfig::Series(steps) => {
                let steps = build_group(steps, &format!("{}.series", path))?;
                return Ok(self.wrap(handler_ref(Series::new(steps))));
            }
            ActionConfig::Parallel(steps) => {
                let steps = build_group(steps, &format!("{}.parallel", path))?;
                return Ok(self.wrap(handler_ref(Parallel::new(steps))));
            }
            ActionConfig::Branch(arms) => {
                let arms = arms
                    .iter()
                    .enumerate()
                    .map(|(i, arm)| {
                        build_group(arm, &format!("{}.branch[{}]", path, i))
                            .map(|steps| handler_ref(Series::new(steps)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                return Ok(self.wrap(handler_ref(Branch::new(arms))));
            }
        };

        let name = self.name.clone().unwrap_or_else(|| default_name.to_string());
        Ok(handler_ref(Step::new(name, action)))
    }

    /// Composites keep their operator name unless the step names them
    fn wrap(&self, composite: HandlerRef) -> HandlerRef {
        match &self.name {
            Some(name) => handler_ref(Step::new(name.clone(), StepAction::Nested(composite))),
            None => composite,
        }
    }
}

fn validate_group(steps: &[StepConfig], path: &str, label: &str) -> Result<()> {
    if steps.is_empty() {
        anyhow::bail!("Step '{}' has no nested steps", label);
    }
    for (i, step) in steps.iter().enumerate() {
        step.validate(&format!("{}[{}]", path, i))?;
    }
    Ok(())
}

fn build_group(steps: &[StepConfig], path: &str) -> Result<Vec<HandlerRef>> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| step.build(&format!("{}[{}]", path, i)))
        .collect()
}

impl PipelineConfig {
    /// Load a recipe from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse a recipe from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the recipe
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Recipe name must not be empty");
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate(&format!("steps[{}]", i))?;
        }
        Ok(())
    }

    /// Number of steps, nested ones included
    pub fn step_count(&self) -> usize {
        fn count(steps: &[StepConfig]) -> usize {
            steps
                .iter()
                .map(|step| {
                    1 + step.series.as_deref().map_or(0, count)
                        + step.parallel.as_deref().map_or(0, count)
                        + step
                            .branch
                            .as_ref()
                            .map_or(0, |arms| arms.iter().map(|arm| count(arm)).sum())
                })
                .sum()
        }
        count(&self.steps)
    }

    /// Recipe variables with `overrides` applied on top
    pub fn variables_with(&self, overrides: &HashMap<String, String>) -> Variables {
        let mut values = self.variables.clone();
        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Variables::new(values)
    }

    /// The recipe's steps as one series handler
    pub fn to_handler(&self) -> Result<HandlerRef> {
        Ok(handler_ref(Series::new(build_group(&self.steps, "steps")?)))
    }

    /// Convert the recipe to a runnable pipeline carrying its variables
    pub fn to_pipeline(&self, overrides: &HashMap<String, String>) -> Result<Pipeline> {
        let extensions = Extensions::new().with(self.variables_with(overrides));
        Ok(Pipeline::with_extensions(self.to_handler()?, extensions))
    }
}
