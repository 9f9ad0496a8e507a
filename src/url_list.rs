use std::fs;
use std::path::{Path, PathBuf};

use crate::models::TrackedUrl;
use crate::utils::error::{AppError, Result};

/// A line from the URL file that was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    pub line_number: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlList {
    pub accepted: Vec<TrackedUrl>,
    pub rejected: Vec<RejectedLine>,
}

impl UrlList {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Newline-delimited URL file, re-read at the start of every run.
#[derive(Debug, Clone)]
pub struct UrlListSource {
    path: PathBuf,
}

impl UrlListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, approved_schemes: &[String]) -> Result<UrlList> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Configuration(format!("Cannot read URL list {}: {}", self.path.display(), e))
        })?;

        let list = parse_url_list(&contents, approved_schemes);
        for rejected in &list.rejected {
            tracing::warn!(
                file = %self.path.display(),
                line = rejected.line_number,
                "Skipping '{}': {}",
                rejected.content,
                rejected.reason
            );
        }

        Ok(list)
    }
}

/// Accepts each non-blank, non-`#` line that starts with `<scheme>://` for an
/// approved scheme and parses as an absolute URL. Duplicates are kept.
pub fn parse_url_list(contents: &str, approved_schemes: &[String]) -> UrlList {
    let mut list = UrlList::default();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match accept_line(line, approved_schemes) {
            Ok(url) => list.accepted.push(url),
            Err(reason) => list.rejected.push(RejectedLine {
                line_number: index + 1,
                content: line.to_string(),
                reason,
            }),
        }
    }

    list
}

fn accept_line(line: &str, approved_schemes: &[String]) -> std::result::Result<TrackedUrl, String> {
    let approved = approved_schemes.iter().any(|scheme| {
        let prefix = format!("{}://", scheme);
        line.len() > prefix.len()
            && line
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&prefix))
    });
    if !approved {
        return Err(format!("scheme not in approved list {:?}", approved_schemes));
    }

    TrackedUrl::parse(line).map_err(|e| e.to_string())
}
