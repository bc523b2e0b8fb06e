use sal_cascade::CascadeEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStage {
    LoadingInputs,
    CheckingCache,
    LoadingCachedResult,
    RunningCascade,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoadingInputs => "Loading inputs",
            Self::CheckingCache => "Checking cache",
            Self::LoadingCachedResult => "Loading cached result",
            Self::RunningCascade => "Running cascade",
            Self::SavingResults => "Saving results",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    /// Set while the cascade is running.
    pub cascade: Option<CascadeEvent>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            cascade: None,
        }
    }
}
