use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Treat an explicit JSON `null` the same as a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One of the free-text fields of a [`ReportRecord`].
///
/// The string form is the wire name used by the backend and by edit files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    FeatureName,
    TeamName,
    QuarterRelease,
    Env,
    Url,
    FrontendPrLink,
    BackendPrLink,
    PrNumber,
    SpecDocLink,
    DesignLink,
    TddLink,
    TestCaseDocLink,
    TestCaseExecutionLink,
    EvidenceDocLink,
    RtmDocLink,
    PreparedBy,
    TestedBy,
    DevelopedBy,
    DesignedBy,
    ReviewedBy,
}

impl ReportField {
    pub const ALL: [ReportField; 20] = [
        ReportField::FeatureName,
        ReportField::TeamName,
        ReportField::QuarterRelease,
        ReportField::Env,
        ReportField::Url,
        ReportField::FrontendPrLink,
        ReportField::BackendPrLink,
        ReportField::PrNumber,
        ReportField::SpecDocLink,
        ReportField::DesignLink,
        ReportField::TddLink,
        ReportField::TestCaseDocLink,
        ReportField::TestCaseExecutionLink,
        ReportField::EvidenceDocLink,
        ReportField::RtmDocLink,
        ReportField::PreparedBy,
        ReportField::TestedBy,
        ReportField::DevelopedBy,
        ReportField::DesignedBy,
        ReportField::ReviewedBy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportField::FeatureName => "FeatureName",
            ReportField::TeamName => "TeamName",
            ReportField::QuarterRelease => "QuarterRelease",
            ReportField::Env => "env",
            ReportField::Url => "URL",
            ReportField::FrontendPrLink => "FrontendPRLink",
            ReportField::BackendPrLink => "BackendPRLink",
            ReportField::PrNumber => "PRNumber",
            ReportField::SpecDocLink => "SpecDocLink",
            ReportField::DesignLink => "DesignLink",
            ReportField::TddLink => "TDDLink",
            ReportField::TestCaseDocLink => "TestCaseDocLink",
            ReportField::TestCaseExecutionLink => "TestCaseExecutionLink",
            ReportField::EvidenceDocLink => "EvidenceDocLink",
            ReportField::RtmDocLink => "RTMDocLink",
            ReportField::PreparedBy => "PreparedBy",
            ReportField::TestedBy => "TestedBy",
            ReportField::DevelopedBy => "DevelopedBy",
            ReportField::DesignedBy => "DesignedBy",
            ReportField::ReviewedBy => "ReviewedBy",
        }
    }
}

impl std::fmt::Display for ReportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown report field: {s}"))
    }
}

/// Lifecycle state of a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefectStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl DefectStatus {
    /// Resolved and Closed defects count as closed in every roll-up.
    pub fn is_closed(&self) -> bool {
        matches!(self, DefectStatus::Resolved | DefectStatus::Closed)
    }
}

impl FromStr for DefectStatus {
    type Err = String;

    /// Accepts the display names in any case, with or without the space
    /// ("In Progress", "in-progress", "InProgress").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "open" => Ok(DefectStatus::Open),
            "inprogress" => Ok(DefectStatus::InProgress),
            "resolved" => Ok(DefectStatus::Resolved),
            "closed" => Ok(DefectStatus::Closed),
            _ => Err(format!("unknown defect status: {s}")),
        }
    }
}

impl std::fmt::Display for DefectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefectStatus::Open => write!(f, "Open"),
            DefectStatus::InProgress => write!(f, "In Progress"),
            DefectStatus::Resolved => write!(f, "Resolved"),
            DefectStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Severity of a defect, ordered from most to least severe in [`Severity::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .iter()
            .copied()
            .find(|severity| normalize_label(&severity.to_string()) == normalize_label(s))
            .ok_or_else(|| format!("unknown severity: {s}"))
    }
}

/// Lowercase with spaces, dashes and underscores dropped.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
        }
    }
}

/// A single defect logged against the feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defect {
    /// Tracker identifier (e.g., "FL-001"); not required to be unique
    pub defect_id: String,
    pub status: DefectStatus,
    pub severity: Severity,
}

impl Default for Defect {
    fn default() -> Self {
        Self {
            defect_id: String::new(),
            status: DefectStatus::Open,
            severity: Severity::Medium,
        }
    }
}

/// Aggregate test-case counts for one build / test cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestBuild {
    /// 1-based position within the record's build list; renumbered on merge
    #[serde(default, deserialize_with = "nullable")]
    pub build_number: u32,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_designed: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total_executed: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total_passed: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total_failed: u32,
    /// Whole percent after `recompute`; upstream payloads may carry fractions
    #[serde(default, deserialize_with = "nullable")]
    pub pass_percentage: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub fail_percentage: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub defects_found: u32,
}

impl TestBuild {
    pub fn new(build_number: u32) -> Self {
        Self {
            build_number,
            ..Self::default()
        }
    }

    /// Re-derive failed count and both percentages from passed / executed.
    /// Leaves the build untouched when nothing was executed. Passed is capped
    /// at executed so that `passed + failed == executed` always holds.
    pub fn recompute(&mut self) {
        if self.total_executed == 0 {
            return;
        }
        self.total_passed = self.total_passed.min(self.total_executed);
        let executed = f64::from(self.total_executed);
        self.total_failed = self.total_executed.saturating_sub(self.total_passed);
        self.pass_percentage = (100.0 * f64::from(self.total_passed) / executed).round();
        self.fail_percentage = (100.0 * f64::from(self.total_failed) / executed).round();
    }

    pub fn set_passed(&mut self, passed: u32) {
        self.total_passed = passed;
        self.recompute();
    }

    pub fn set_executed(&mut self, executed: u32) {
        self.total_executed = executed;
        self.recompute();
    }
}

/// The canonical report record every renderer works from.
///
/// Field names on the wire follow the QSR backend (`FeatureName`, `env`,
/// `URL`, ...), so backend responses and edit files deserialize directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "FeatureName", default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(rename = "TeamName", default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(rename = "QuarterRelease", default, skip_serializing_if = "Option::is_none")]
    pub quarter_release: Option<String>,
    #[serde(rename = "env", default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "FrontendPRLink", default, skip_serializing_if = "Option::is_none")]
    pub frontend_pr_link: Option<String>,
    #[serde(rename = "BackendPRLink", default, skip_serializing_if = "Option::is_none")]
    pub backend_pr_link: Option<String>,
    #[serde(rename = "PRNumber", default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<String>,
    #[serde(rename = "SpecDocLink", default, skip_serializing_if = "Option::is_none")]
    pub spec_doc_link: Option<String>,
    #[serde(rename = "DesignLink", default, skip_serializing_if = "Option::is_none")]
    pub design_link: Option<String>,
    #[serde(rename = "TDDLink", default, skip_serializing_if = "Option::is_none")]
    pub tdd_link: Option<String>,
    #[serde(rename = "TestCaseDocLink", default, skip_serializing_if = "Option::is_none")]
    pub test_case_doc_link: Option<String>,
    #[serde(rename = "TestCaseExecutionLink", default, skip_serializing_if = "Option::is_none")]
    pub test_case_execution_link: Option<String>,
    #[serde(rename = "EvidenceDocLink", default, skip_serializing_if = "Option::is_none")]
    pub evidence_doc_link: Option<String>,
    #[serde(rename = "RTMDocLink", default, skip_serializing_if = "Option::is_none")]
    pub rtm_doc_link: Option<String>,
    #[serde(rename = "PreparedBy", default, skip_serializing_if = "Option::is_none")]
    pub prepared_by: Option<String>,
    #[serde(rename = "TestedBy", default, skip_serializing_if = "Option::is_none")]
    pub tested_by: Option<String>,
    #[serde(rename = "DevelopedBy", default, skip_serializing_if = "Option::is_none")]
    pub developed_by: Option<String>,
    #[serde(rename = "DesignedBy", default, skip_serializing_if = "Option::is_none")]
    pub designed_by: Option<String>,
    #[serde(rename = "ReviewedBy", default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(rename = "TestExecutionData", default, deserialize_with = "nullable")]
    pub test_builds: Vec<TestBuild>,
    #[serde(rename = "DefectData", default, deserialize_with = "nullable")]
    pub defects: Vec<Defect>,
}

impl ReportRecord {
    pub fn get(&self, field: ReportField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: ReportField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    fn slot(&self, field: ReportField) -> &Option<String> {
        match field {
            ReportField::FeatureName => &self.feature_name,
            ReportField::TeamName => &self.team_name,
            ReportField::QuarterRelease => &self.quarter_release,
            ReportField::Env => &self.env,
            ReportField::Url => &self.url,
            ReportField::FrontendPrLink => &self.frontend_pr_link,
            ReportField::BackendPrLink => &self.backend_pr_link,
            ReportField::PrNumber => &self.pr_number,
            ReportField::SpecDocLink => &self.spec_doc_link,
            ReportField::DesignLink => &self.design_link,
            ReportField::TddLink => &self.tdd_link,
            ReportField::TestCaseDocLink => &self.test_case_doc_link,
            ReportField::TestCaseExecutionLink => &self.test_case_execution_link,
            ReportField::EvidenceDocLink => &self.evidence_doc_link,
            ReportField::RtmDocLink => &self.rtm_doc_link,
            ReportField::PreparedBy => &self.prepared_by,
            ReportField::TestedBy => &self.tested_by,
            ReportField::DevelopedBy => &self.developed_by,
            ReportField::DesignedBy => &self.designed_by,
            ReportField::ReviewedBy => &self.reviewed_by,
        }
    }

    fn slot_mut(&mut self, field: ReportField) -> &mut Option<String> {
        match field {
            ReportField::FeatureName => &mut self.feature_name,
            ReportField::TeamName => &mut self.team_name,
            ReportField::QuarterRelease => &mut self.quarter_release,
            ReportField::Env => &mut self.env,
            ReportField::Url => &mut self.url,
            ReportField::FrontendPrLink => &mut self.frontend_pr_link,
            ReportField::BackendPrLink => &mut self.backend_pr_link,
            ReportField::PrNumber => &mut self.pr_number,
            ReportField::SpecDocLink => &mut self.spec_doc_link,
            ReportField::DesignLink => &mut self.design_link,
            ReportField::TddLink => &mut self.tdd_link,
            ReportField::TestCaseDocLink => &mut self.test_case_doc_link,
            ReportField::TestCaseExecutionLink => &mut self.test_case_execution_link,
            ReportField::EvidenceDocLink => &mut self.evidence_doc_link,
            ReportField::RtmDocLink => &mut self.rtm_doc_link,
            ReportField::PreparedBy => &mut self.prepared_by,
            ReportField::TestedBy => &mut self.tested_by,
            ReportField::DevelopedBy => &mut self.developed_by,
            ReportField::DesignedBy => &mut self.designed_by,
            ReportField::ReviewedBy => &mut self.reviewed_by,
        }
    }

    /// Overlay user edits: set fields replace, non-empty lists replace
    /// wholesale. Builds are renumbered and re-derived afterwards.
    pub fn merge(&mut self, edits: ReportRecord) {
        for field in ReportField::ALL {
            if let Some(value) = edits.get(field) {
                self.set(field, value);
            }
        }
        if !edits.test_builds.is_empty() {
            self.test_builds = edits.test_builds;
        }
        if !edits.defects.is_empty() {
            self.defects = edits.defects;
        }
        self.normalize_builds();
    }

    /// Append an empty build numbered after the last one.
    pub fn add_test_build(&mut self) -> &mut TestBuild {
        let number = self.test_builds.len() as u32 + 1;
        self.test_builds.push(TestBuild::new(number));
        let last = self.test_builds.len() - 1;
        &mut self.test_builds[last]
    }

    /// Remove a build and close the gap in build numbers.
    pub fn remove_test_build(&mut self, index: usize) -> Option<TestBuild> {
        if index >= self.test_builds.len() {
            return None;
        }
        let removed = self.test_builds.remove(index);
        self.renumber_builds();
        Some(removed)
    }

    pub fn add_defect(&mut self, defect: Defect) {
        self.defects.push(defect);
    }

    pub fn remove_defect(&mut self, index: usize) -> Option<Defect> {
        (index < self.defects.len()).then(|| self.defects.remove(index))
    }

    /// Renumber builds 1..N and re-derive their percentages.
    pub fn normalize_builds(&mut self) {
        self.renumber_builds();
        for build in &mut self.test_builds {
            build.recompute();
        }
    }

    fn renumber_builds(&mut self) {
        for (i, build) in self.test_builds.iter_mut().enumerate() {
            build.build_number = i as u32 + 1;
        }
    }
}

/// Closed/open tally for one severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCount {
    pub total: usize,
    pub closed: usize,
    pub open: usize,
}

/// Severity-bucketed roll-up of a record's defects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefectSummary {
    pub critical: SeverityCount,
    pub high: SeverityCount,
    pub medium: SeverityCount,
    pub low: SeverityCount,
}

impl DefectSummary {
    pub fn get(&self, severity: Severity) -> &SeverityCount {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
        }
    }

    pub fn get_mut(&mut self, severity: Severity) -> &mut SeverityCount {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }
}

/// Execution totals across all builds plus defect counts.
///
/// `total_defects` / `open_defects` come from the defect list, not from the
/// builds' own `defects_found` counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub total_designed: u64,
    pub total_executed: u64,
    pub total_passed: u64,
    pub total_failed: u64,
    /// Whole percent, 0 when nothing was executed
    pub pass_rate: u32,
    pub total_defects: usize,
    pub open_defects: usize,
}
