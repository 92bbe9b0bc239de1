// Input checks that run before anything is sent to the analysis API

use crate::models::ContractFile;

/// Default cap on files per upload batch.
pub const MAX_UPLOAD_FILES: usize = 20;

pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".sol", ".solidity"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Please enter a GitHub repository URL")]
    EmptyUrl,

    #[error("Please upload only Solidity (.sol) files")]
    InvalidFiles { rejected: Vec<String> },

    #[error("Maximum {max} files allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("Please select at least one Solidity file")]
    NoFiles,

    #[error("Job id is required")]
    EmptyJobId,

    #[error("Job id may only contain letters, digits, '-' and '_'")]
    InvalidJobId,
}

impl IntakeError {
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::EmptyUrl => "EMPTY_URL",
            IntakeError::InvalidFiles { .. } => "INVALID_FILES",
            IntakeError::TooManyFiles { .. } => "TOO_MANY_FILES",
            IntakeError::NoFiles => "NO_FILES",
            IntakeError::EmptyJobId => "EMPTY_JOB_ID",
            IntakeError::InvalidJobId => "INVALID_JOB_ID",
        }
    }
}

/// Trim a repository URL, refusing blank input.
pub fn repository_url(raw: &str) -> Result<&str, IntakeError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(IntakeError::EmptyUrl);
    }
    Ok(url)
}

/// Longest job id accepted from a path or from the analysis API.
pub const MAX_JOB_ID_LEN: usize = 128;

/// Trim a job id and check it is `[A-Za-z0-9_-]+`.
///
/// Checked ids are safe as one URL path segment and inside a quoted
/// header parameter, so no further escaping is applied to them.
pub fn job_id(raw: &str) -> Result<&str, IntakeError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(IntakeError::EmptyJobId);
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.len() > MAX_JOB_ID_LEN || !id.chars().all(allowed) {
        return Err(IntakeError::InvalidJobId);
    }
    Ok(id)
}

/// Bare filename with a Solidity extension and a non-empty stem.
pub fn is_solidity_file_name(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return false;
    }
    ACCEPTED_EXTENSIONS
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext))
}

/// Accept an upload batch as a whole or not at all.
///
/// One bad filename rejects every file, and so does a batch larger than
/// `max_files`.
pub fn accept_upload(
    files: Vec<ContractFile>,
    max_files: usize,
) -> Result<Vec<ContractFile>, IntakeError> {
    if files.is_empty() {
        return Err(IntakeError::NoFiles);
    }

    let rejected: Vec<String> = files
        .iter()
        .filter(|f| !is_solidity_file_name(&f.name))
        .map(|f| f.name.clone())
        .collect();
    if !rejected.is_empty() {
        tracing::debug!(?rejected, "Upload batch has non-Solidity files");
        return Err(IntakeError::InvalidFiles { rejected });
    }

    if files.len() > max_files {
        return Err(IntakeError::TooManyFiles {
            count: files.len(),
            max: max_files,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(names: &[&str]) -> Vec<ContractFile> {
        names
            .iter()
            .map(|n| ContractFile::new(*n, "pragma solidity ^0.8.0;"))
            .collect()
    }

    #[test]
    fn accepts_sol_and_solidity_files() {
        let accepted = accept_upload(batch(&["Token.sol", "Vault.solidity"]), MAX_UPLOAD_FILES)
            .unwrap();
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn one_bad_name_rejects_the_whole_batch() {
        let err = accept_upload(
            batch(&["Token.sol", "README.md", "Vault.sol"]),
            MAX_UPLOAD_FILES,
        )
        .unwrap_err();
        assert_eq!(
            err,
            IntakeError::InvalidFiles {
                rejected: vec!["README.md".to_string()]
            }
        );
        assert_eq!(err.code(), "INVALID_FILES");
    }

    #[test]
    fn more_than_twenty_files_is_refused() {
        let names: Vec<String> = (0..21).map(|i| format!("C{i}.sol")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let err = accept_upload(batch(&names), MAX_UPLOAD_FILES).unwrap_err();
        assert_eq!(err, IntakeError::TooManyFiles { count: 21, max: 20 });

        assert!(accept_upload(batch(&names[..20]), MAX_UPLOAD_FILES).is_ok());
    }

    #[test]
    fn empty_batch_is_refused() {
        assert_eq!(
            accept_upload(Vec::new(), MAX_UPLOAD_FILES).unwrap_err(),
            IntakeError::NoFiles
        );
    }

    #[test]
    fn filenames_must_be_bare_with_a_stem() {
        assert!(is_solidity_file_name("A.sol"));
        assert!(!is_solidity_file_name(".sol"));
        assert!(!is_solidity_file_name("contracts/A.sol"));
        assert!(!is_solidity_file_name("..\\A.sol"));
        assert!(!is_solidity_file_name("A.sol.bak"));
        assert!(!is_solidity_file_name("A.SOL"));
    }

    #[test]
    fn repository_url_trims_and_rejects_blank() {
        assert_eq!(repository_url("  https://github.com/a/b "), Ok("https://github.com/a/b"));
        assert_eq!(repository_url("   "), Err(IntakeError::EmptyUrl));
    }

    #[test]
    fn job_ids_are_single_safe_segments() {
        assert_eq!(job_id(" 3f2a-77_b "), Ok("3f2a-77_b"));
        assert_eq!(job_id("  "), Err(IntakeError::EmptyJobId));

        for bad in [".", "..", "a/b", "a\"; filename=\"x", "a b", "caf\u{e9}"] {
            assert_eq!(job_id(bad), Err(IntakeError::InvalidJobId), "{bad:?}");
        }
        assert_eq!(
            job_id(&"a".repeat(MAX_JOB_ID_LEN + 1)),
            Err(IntakeError::InvalidJobId)
        );
        assert_eq!(IntakeError::InvalidJobId.code(), "INVALID_JOB_ID");
    }
}
