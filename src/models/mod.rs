// Data model shared by the client, poller and views

use serde::{Deserialize, Deserializer};

pub mod analysis;
pub mod job;
pub mod report;
pub mod vulnerability;

pub use analysis::{
    AnalysisRequest, AnalysisResults, ContractFile, RepositoryInfo, RepositoryValidation,
    ResultsSummary, StartedAnalysis,
};
pub use job::{JobSnapshot, JobStatus, PIPELINE_STAGES};
pub use report::{DownloadFormat, GeneratedReport, ReportConfig, ReportSummary, ReportTemplate};
pub use vulnerability::{Severity, SeverityBreakdown, Vulnerability};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
