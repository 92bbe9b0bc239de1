use serde::{Deserialize, Serialize};

use super::vulnerability::{SeverityBreakdown, Vulnerability};

/// A Solidity source file submitted inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFile {
    pub name: String,
    pub content: String,
}

impl ContractFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisRequest {
    Github { github_url: String },
    Files { files: Vec<ContractFile> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartedAnalysis {
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub files_analyzed: u32,
    #[serde(default)]
    pub vulnerabilities_found: u32,
    #[serde(default)]
    pub severity_breakdown: SeverityBreakdown,
}

/// `GET /api/results/{id}` payload for a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(default)]
    pub summary: ResultsSummary,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Outcome of `POST /api/github/validate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RepositoryValidation {
    Valid {
        repository: Option<RepositoryInfo>,
        solidity_files: u32,
        files: Vec<String>,
    },
    Invalid {
        message: String,
    },
}

impl RepositoryValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, RepositoryValidation::Valid { .. })
    }
}

/// Raw validation body. Invalid repositories come back with a 4xx status
/// and `valid: false`, so this is decoded regardless of status.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ValidationBody {
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub repository: Option<RepositoryInfo>,
    #[serde(default)]
    pub solidity_files: Option<u32>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub files: Vec<serde_json::Value>,
}

impl ValidationBody {
    /// File entries may be bare paths or objects with a `path`/`name`.
    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|entry| match entry {
                serde_json::Value::String(path) => Some(path.clone()),
                serde_json::Value::Object(map) => map
                    .get("path")
                    .or_else(|| map.get("name"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_request_serializes_either_shape() {
        let github = AnalysisRequest::Github {
            github_url: "https://github.com/a/b".into(),
        };
        assert_eq!(
            serde_json::to_value(&github).unwrap(),
            serde_json::json!({ "github_url": "https://github.com/a/b" })
        );

        let files = AnalysisRequest::Files {
            files: vec![ContractFile::new("Token.sol", "contract T {}")],
        };
        assert_eq!(
            serde_json::to_value(&files).unwrap(),
            serde_json::json!({ "files": [{ "name": "Token.sol", "content": "contract T {}" }] })
        );
    }

    #[test]
    fn results_decode_with_breakdown() {
        let results: AnalysisResults = serde_json::from_str(
            r#"{
                "job_id": "abc",
                "summary": {
                    "total_files": 3,
                    "files_analyzed": 3,
                    "vulnerabilities_found": 1,
                    "severity_breakdown": {"critical": 0, "high": 1, "medium": 0, "low": 0, "info": 0}
                },
                "vulnerabilities": [{"id": "v1", "name": "Reentrancy", "severity": "high"}]
            }"#,
        )
        .unwrap();
        assert_eq!(results.summary.total_files, 3);
        assert_eq!(results.summary.severity_breakdown.high, 1);
        assert_eq!(results.vulnerabilities.len(), 1);
        assert!(results.overall_assessment.is_none());
    }

    #[test]
    fn validation_body_collects_paths_from_mixed_entries() {
        let body: ValidationBody = serde_json::from_str(
            r#"{"valid": true, "files": ["a.sol", {"path": "src/b.sol"}, {"name": "c.sol"}, 4]}"#,
        )
        .unwrap();
        assert_eq!(body.file_paths(), vec!["a.sol", "src/b.sol", "c.sol"]);
    }
}
