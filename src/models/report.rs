use serde::{Deserialize, Serialize};
use validator::Validate;

use super::vulnerability::SeverityBreakdown;

pub const DEFAULT_REPORT_TITLE: &str = "Smart Contract Security Analysis Report";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTemplate {
    #[default]
    Professional,
    Detailed,
    Concise,
}

impl ReportTemplate {
    pub const ALL: [ReportTemplate; 3] = [
        ReportTemplate::Professional,
        ReportTemplate::Detailed,
        ReportTemplate::Concise,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ReportTemplate::Professional => "professional",
            ReportTemplate::Detailed => "detailed",
            ReportTemplate::Concise => "concise",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportTemplate::Professional => "Professional",
            ReportTemplate::Detailed => "Detailed Technical",
            ReportTemplate::Concise => "Concise",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportTemplate::Professional => {
                "Comprehensive professional bug bounty report with all sections"
            }
            ReportTemplate::Detailed => {
                "In-depth technical analysis with extended vulnerability details"
            }
            ReportTemplate::Concise => "Brief summary report focusing on key findings and actions",
        }
    }
}

/// Report settings held by the report view until the user submits them.
///
/// `selected_vulnerabilities` keeps the order ids were selected in; the
/// analysis API filters the job's findings by membership only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReportConfig {
    #[validate(length(min = 1, max = 200, message = "Report title must be 1-200 characters"))]
    #[serde(default = "default_title")]
    pub title: String,
    #[validate(length(max = 120))]
    #[serde(default)]
    pub researcher: String,
    #[validate(length(max = 120))]
    #[serde(default)]
    pub target_program: String,
    #[serde(default)]
    pub template: ReportTemplate,
    #[serde(default)]
    pub selected_vulnerabilities: Vec<String>,
}

fn default_title() -> String {
    DEFAULT_REPORT_TITLE.to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            researcher: String::new(),
            target_program: String::new(),
            template: ReportTemplate::default(),
            selected_vulnerabilities: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Default settings with every given id selected.
    pub fn with_all_selected<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        for id in ids {
            let id = id.into();
            if !config.is_selected(&id) {
                config.selected_vulnerabilities.push(id);
            }
        }
        config
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_vulnerabilities.iter().any(|s| s == id)
    }

    /// Flip membership of `id`, leaving every other id untouched.
    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_selected(id) {
            self.selected_vulnerabilities.retain(|s| s != id);
            false
        } else {
            self.selected_vulnerabilities.push(id.to_string());
            true
        }
    }

    /// Generation needs at least one selected finding.
    pub fn can_submit(&self) -> bool {
        !self.selected_vulnerabilities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default, alias = "total")]
    pub total_vulnerabilities: u32,
    #[serde(default)]
    pub severity_breakdown: SeverityBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_id: String,
    pub markdown: String,
    pub summary: ReportSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    #[default]
    Markdown,
    Pdf,
}

impl DownloadFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Markdown => "md",
            DownloadFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DownloadFormat::Markdown => "text/markdown; charset=utf-8",
            DownloadFormat::Pdf => "application/pdf",
        }
    }
}

/// Base filename (no extension) the analysis API is asked to use.
pub fn report_file_stem(job_id: &str) -> String {
    format!("security_report_{}", job_id)
}
