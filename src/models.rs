use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything extracted from one fetched page. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub open_graph: OpenGraphTags,
    pub twitter_card: String,
    pub headings: Vec<Heading>,
    pub images: Vec<Image>,
    pub body_text: String,
    pub word_count: usize,
    pub links: Vec<String>,
    pub internal_links: Vec<String>,
    pub structured_data: Vec<serde_json::Value>,
}

impl PageSnapshot {
    pub fn h1_texts(&self) -> impl Iterator<Item = &str> {
        self.headings
            .iter()
            .filter(|h| h.level == 1)
            .map(|h| h.text.as_str())
    }

    pub fn h1_count(&self) -> usize {
        self.h1_texts().count()
    }

    pub fn images_missing_alt(&self) -> usize {
        self.images.iter().filter(|img| img.alt.is_empty()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenGraphTags {
    pub title: String,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueSeverity::Critical => "CRITICAL",
            IssueSeverity::Warning => "WARNING",
            IssueSeverity::Info => "INFO",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueAction {
    /// A mechanical replacement can be synthesized
    AutoFix,
    /// Needs an editorial decision
    Escalate,
}

impl fmt::Display for IssueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueAction::AutoFix => f.write_str("auto-fix"),
            IssueAction::Escalate => f.write_str("escalate"),
        }
    }
}

/// The fixed rule catalog, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingTitle,
    TitleLength,
    MissingDescription,
    DescriptionLength,
    H1Count,
    HeadingHierarchy,
    ImagesMissingAlt,
    MissingOpenGraph,
    MissingCanonical,
    ThinContent,
    MissingSchema,
    MissingTwitterCard,
}

impl IssueType {
    pub const CATALOG: [IssueType; 12] = [
        IssueType::MissingTitle,
        IssueType::TitleLength,
        IssueType::MissingDescription,
        IssueType::DescriptionLength,
        IssueType::H1Count,
        IssueType::HeadingHierarchy,
        IssueType::ImagesMissingAlt,
        IssueType::MissingOpenGraph,
        IssueType::MissingCanonical,
        IssueType::ThinContent,
        IssueType::MissingSchema,
        IssueType::MissingTwitterCard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IssueType::MissingTitle => "Missing Title",
            IssueType::TitleLength => "Title Length",
            IssueType::MissingDescription => "Missing Description",
            IssueType::DescriptionLength => "Description Length",
            IssueType::H1Count => "Missing/Multiple H1",
            IssueType::HeadingHierarchy => "Broken Heading Hierarchy",
            IssueType::ImagesMissingAlt => "Images Missing Alt",
            IssueType::MissingOpenGraph => "Missing Open Graph",
            IssueType::MissingCanonical => "Missing Canonical",
            IssueType::ThinContent => "Thin Content",
            IssueType::MissingSchema => "Missing Schema",
            IssueType::MissingTwitterCard => "Missing Twitter Card",
        }
    }

    pub fn severity(self) -> IssueSeverity {
        match self {
            IssueType::MissingTitle | IssueType::MissingDescription | IssueType::H1Count => {
                IssueSeverity::Critical
            }
            IssueType::MissingCanonical
            | IssueType::MissingSchema
            | IssueType::MissingTwitterCard => IssueSeverity::Info,
            _ => IssueSeverity::Warning,
        }
    }

    pub fn action(self) -> IssueAction {
        match self {
            IssueType::H1Count | IssueType::HeadingHierarchy | IssueType::ThinContent => {
                IssueAction::Escalate
            }
            _ => IssueAction::AutoFix,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoIssue {
    /// Position within this audit, 0-based
    pub id: usize,
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub action: IssueAction,
    pub element: String,
    pub current: String,
    pub suggested: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipPriority {
    High,
    Medium,
    Info,
}

impl fmt::Display for TipPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipPriority::High => f.write_str("HIGH"),
            TipPriority::Medium => f.write_str("MEDIUM"),
            TipPriority::Info => f.write_str("INFO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingTip {
    pub priority: TipPriority,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub count: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub phrase: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedTagSet {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub phrases: Vec<String>,
    pub canonical: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub schema: String,
    pub html: String,
    pub tips: Vec<RankingTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub url: String,
    pub issues: Vec<SeoIssue>,
    pub score: u8,
    pub snapshot: PageSnapshot,
    pub tags: OptimizedTagSet,
    pub audited_at: DateTime<Utc>,
}

impl AuditResult {
    pub fn count_action(&self, action: IssueAction) -> usize {
        self.issues.iter().filter(|i| i.action == action).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub avg_score: u8,
    pub total_issues: usize,
    pub auto_fixed: usize,
    pub escalated: usize,
    /// Wall-clock seconds, one decimal
    pub elapsed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub pages: Vec<AuditResult>,
    pub metrics: RunMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDiff {
    pub field: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub url: String,
    pub hash: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    Idle,
    BaselinePending,
    Watching,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MonitorEvent {
    BaselineEstablished {
        url: String,
        hash: String,
    },
    NoChange {
        url: String,
        checked_at: DateTime<Utc>,
    },
    Changed {
        url: String,
        diffs: Vec<ContentDiff>,
        audit: Box<AuditResult>,
        checked_at: DateTime<Utc>,
    },
    Error {
        url: String,
        message: String,
    },
    Stopped {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchedulerEvent {
    RunStarted {
        url: String,
    },
    Completed(Box<RunEntry>),
    Scheduled {
        next_run_at: DateTime<Utc>,
    },
    Error {
        url: String,
        message: String,
    },
    Stopped,
}
