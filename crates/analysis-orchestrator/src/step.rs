use analysis_core::AnalysisError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One unit of the refresh pipeline.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Files that must exist before the step can run.
    fn requires(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Soft steps report errors as skipped; the pipeline then continues
    /// with whatever files are already on disk.
    fn is_soft(&self) -> bool {
        false
    }

    /// Run the step, returning a one-line summary.
    async fn execute(&self) -> Result<String, AnalysisError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed(String),
    Skipped(String),
    MissingDependency(PathBuf),
    Failed(String),
}

impl StepOutcome {
    pub fn from_result(result: Result<String, AnalysisError>, soft: bool) -> Self {
        match result {
            Ok(summary) => StepOutcome::Completed(summary),
            Err(AnalysisError::MissingArtifact(path)) => StepOutcome::MissingDependency(path),
            Err(e) if soft => StepOutcome::Skipped(e.to_string()),
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed(_))
    }

    /// Anything other than completed or skipped
    pub fn is_problem(&self) -> bool {
        matches!(self, StepOutcome::MissingDependency(_) | StepOutcome::Failed(_))
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed(s) => write!(f, "completed: {}", s),
            StepOutcome::Skipped(s) => write!(f, "skipped: {}", s),
            StepOutcome::MissingDependency(p) => write!(f, "missing dependency: {}", p.display()),
            StepOutcome::Failed(s) => write!(f, "failed: {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    pub fn completed(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_completed()).count()
    }

    pub fn has_problems(&self) -> bool {
        self.steps.iter().any(|s| s.outcome.is_problem())
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.steps {
            writeln!(f, "{:<22} {}", s.step, s.outcome)?;
        }
        write!(f, "{}/{} steps completed", self.completed(), self.steps.len())
    }
}
