//! Four-step report wizard: fetch, validate, generate, export.
//!
//! All state lives in [`Wizard`] and changes only through [`Wizard::dispatch`],
//! so the CLI (or any other front end) drives it one [`Action`] at a time.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::kissflow::mapper::identify_missing_fields;
use crate::kissflow::FetchResponse;
use crate::report::types::{Defect, ReportField};
use crate::report::{ExportFormat, ReportRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    Fetch,
    Validate,
    Generate,
    Export,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Fetch, Step::Validate, Step::Generate, Step::Export];

    fn index(self) -> usize {
        self as usize
    }

    /// Export is terminal; only `StartOver` leaves it.
    fn next(self) -> Step {
        match self {
            Step::Fetch => Step::Validate,
            Step::Validate => Step::Generate,
            Step::Generate | Step::Export => Step::Export,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Fetch => write!(f, "Fetch Data"),
            Step::Validate => write!(f, "Validate"),
            Step::Generate => write!(f, "Generate"),
            Step::Export => write!(f, "Export"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepStatus {
    #[default]
    Pending,
    Success,
    Error,
}

/// Rejected actions. Step failures (bad fetch, missing fields) are not
/// errors here; they are recorded in the wizard state instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("{action} is not allowed during the {step} step")]
    WrongStep { action: &'static str, step: Step },

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("no {0} in progress")]
    Idle(&'static str),

    /// `position` is 1-based, as shown to the user.
    #[error("there is no {kind} #{position}")]
    NoSuchEntry { kind: &'static str, position: usize },
}

/// Counts for a build added during validation; failed count and
/// percentages are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildCounts {
    pub designed: u32,
    pub executed: u32,
    pub passed: u32,
    pub defects_found: u32,
}

#[derive(Debug, Clone)]
pub enum Action {
    FetchStarted,
    FetchSucceeded(FetchResponse),
    FetchFailed(String),
    SetField(ReportField, String),
    MergeEdits(ReportRecord),
    AddTestBuild(BuildCounts),
    /// 0-based index; later builds are renumbered.
    RemoveTestBuild(usize),
    AddDefect(Defect),
    RemoveDefect(usize),
    Validate { allow_missing: bool },
    GenerateStarted,
    GenerateSucceeded,
    GenerateFailed(String),
    Exported(ExportFormat),
    /// Logged only; the export step status is left as is.
    ExportFailed(ExportFormat, String),
    StartOver,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::FetchStarted => "fetch",
            Action::FetchSucceeded(_) | Action::FetchFailed(_) => "fetch result",
            Action::SetField(..)
            | Action::MergeEdits(_)
            | Action::AddTestBuild(_)
            | Action::RemoveTestBuild(_)
            | Action::AddDefect(_)
            | Action::RemoveDefect(_) => "editing",
            Action::Validate { .. } => "validation",
            Action::GenerateStarted => "generate",
            Action::GenerateSucceeded | Action::GenerateFailed(_) => "generate result",
            Action::Exported(_) | Action::ExportFailed(..) => "export",
            Action::StartOver => "start over",
        }
    }

    /// Step the action belongs to; `None` means any step.
    fn step(&self) -> Option<Step> {
        match self {
            Action::FetchStarted | Action::FetchSucceeded(_) | Action::FetchFailed(_) => {
                Some(Step::Fetch)
            }
            Action::SetField(..)
            | Action::MergeEdits(_)
            | Action::AddTestBuild(_)
            | Action::RemoveTestBuild(_)
            | Action::AddDefect(_)
            | Action::RemoveDefect(_)
            | Action::Validate { .. } => Some(Step::Validate),
            Action::GenerateStarted | Action::GenerateSucceeded | Action::GenerateFailed(_) => {
                Some(Step::Generate)
            }
            Action::Exported(_) | Action::ExportFailed(..) => Some(Step::Export),
            Action::StartOver => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Wizard {
    step: Step,
    statuses: [StepStatus; 4],
    record: ReportRecord,
    missing_fields: Vec<String>,
    fetching: bool,
    generating: bool,
    error: Option<String>,
    progress: Option<String>,
    exported: Vec<ExportFormat>,
}

impl Wizard {
    pub fn step(&self) -> Step {
        self.step
    }

    pub fn status(&self, step: Step) -> StepStatus {
        self.statuses[step.index()]
    }

    pub fn record(&self) -> &ReportRecord {
        &self.record
    }

    pub fn missing_fields(&self) -> &[String] {
        &self.missing_fields
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.fetching || self.generating
    }

    /// Formats written so far in this cycle.
    pub fn exported(&self) -> &[ExportFormat] {
        &self.exported
    }

    /// One-line step tracker followed by the latest progress message, e.g.
    /// `[x] Fetch Data  [>] Validate  [ ] Generate  [ ] Export | Data fetched successfully`.
    pub fn progress_line(&self) -> String {
        let steps: Vec<String> = Step::ALL
            .iter()
            .map(|&step| {
                let mark = match self.status(step) {
                    StepStatus::Success => 'x',
                    StepStatus::Error => '!',
                    StepStatus::Pending if step == self.step => '>',
                    StepStatus::Pending => ' ',
                };
                format!("[{mark}] {step}")
            })
            .collect();
        let mut line = steps.join("  ");
        if let Some(progress) = self.progress() {
            line.push_str(" | ");
            line.push_str(progress);
        }
        line
    }

    /// Apply one action. Returns `Err` only when the action does not fit the
    /// current state; the state is unchanged in that case.
    pub fn dispatch(&mut self, action: Action) -> Result<(), WizardError> {
        if let Some(step) = action.step() {
            if step != self.step {
                return Err(WizardError::WrongStep {
                    action: action.name(),
                    step: self.step,
                });
            }
        }
        debug!(action = action.name(), step = %self.step, "dispatch");

        match action {
            Action::FetchStarted => {
                if self.fetching {
                    return Err(WizardError::Busy("fetch"));
                }
                self.fetching = true;
                self.error = None;
                self.progress = Some("Fetching data from Kissflow...".to_string());
            }
            Action::FetchSucceeded(response) => {
                self.finish_fetch()?;
                self.record = response.data;
                self.missing_fields = response.missing_fields;
                self.progress = Some("Data fetched successfully".to_string());
                info!(missing = self.missing_fields.len(), "fetch complete");
                self.advance();
            }
            Action::FetchFailed(message) => {
                self.finish_fetch()?;
                self.fail(message);
            }
            Action::SetField(field, value) => {
                self.record.set(field, value);
                self.refresh_missing();
            }
            Action::MergeEdits(edits) => {
                self.record.merge(edits);
                self.refresh_missing();
            }
            Action::AddTestBuild(counts) => {
                let build = self.record.add_test_build();
                build.total_designed = counts.designed;
                build.defects_found = counts.defects_found;
                build.set_executed(counts.executed);
                build.set_passed(counts.passed);
                debug!(build = build.build_number, "test build added");
            }
            Action::RemoveTestBuild(index) => {
                self.record.remove_test_build(index).ok_or(WizardError::NoSuchEntry {
                    kind: "test build",
                    position: index + 1,
                })?;
            }
            Action::AddDefect(defect) => {
                self.record.add_defect(defect);
            }
            Action::RemoveDefect(index) => {
                self.record.remove_defect(index).ok_or(WizardError::NoSuchEntry {
                    kind: "defect",
                    position: index + 1,
                })?;
            }
            Action::Validate { allow_missing } => {
                self.refresh_missing();
                if self.missing_fields.is_empty() {
                    self.error = None;
                    self.advance();
                } else if allow_missing {
                    warn!(missing = ?self.missing_fields, "continuing with missing fields");
                    self.error = None;
                    self.advance();
                } else {
                    let count = self.missing_fields.len();
                    self.fail(format!("{count} required field(s) still missing"));
                }
            }
            Action::GenerateStarted => {
                if self.generating {
                    return Err(WizardError::Busy("generate"));
                }
                self.generating = true;
                self.error = None;
                self.progress = Some("Generating report...".to_string());
            }
            Action::GenerateSucceeded => {
                self.finish_generate()?;
                self.progress = Some("Report generated".to_string());
                self.advance();
            }
            Action::GenerateFailed(message) => {
                self.finish_generate()?;
                self.fail(message);
            }
            Action::Exported(format) => {
                self.statuses[Step::Export.index()] = StepStatus::Success;
                self.progress = Some(format!("{format} downloaded"));
                self.exported.push(format);
            }
            Action::ExportFailed(format, message) => {
                warn!(format = %format, error = %message, "export failed");
            }
            Action::StartOver => {
                if self.is_busy() {
                    let active = if self.fetching { "fetch" } else { "generate" };
                    return Err(WizardError::Busy(active));
                }
                info!("starting over");
                *self = Wizard::default();
            }
        }
        Ok(())
    }

    fn finish_fetch(&mut self) -> Result<(), WizardError> {
        if !self.fetching {
            return Err(WizardError::Idle("fetch"));
        }
        self.fetching = false;
        Ok(())
    }

    fn finish_generate(&mut self) -> Result<(), WizardError> {
        if !self.generating {
            return Err(WizardError::Idle("generate"));
        }
        self.generating = false;
        Ok(())
    }

    fn advance(&mut self) {
        self.statuses[self.step.index()] = StepStatus::Success;
        self.step = self.step.next();
    }

    /// Keep the current step and surface the message.
    fn fail(&mut self, message: String) {
        warn!(step = %self.step, error = %message, "step failed");
        self.statuses[self.step.index()] = StepStatus::Error;
        self.progress = None;
        self.error = Some(message);
    }

    fn refresh_missing(&mut self) {
        self.missing_fields = identify_missing_fields(&self.record);
    }
}
