//! Output location resolution under the configured upload directory.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::conf::{C_ENV_UPLOAD_DIR, C_ENV_UPLOAD_URL, C_UPLOAD_URL_DEFAULT};
use crate::error::{RowbookError, RowbookResult};
use crate::spec::{SpecUploadLocation, SpecXlsxOutput};

impl SpecUploadLocation {
    pub fn new(dir: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url: url.into(),
        }
    }

    /// Read the upload location from `ROWBOOK_UPLOAD_DIR` / `ROWBOOK_UPLOAD_URL`.
    pub fn from_env() -> RowbookResult<Self> {
        let dir = env::var_os(C_ENV_UPLOAD_DIR)
            .filter(|val| !val.is_empty())
            .ok_or(RowbookError::MissingUploadDir)?;
        let url = env::var(C_ENV_UPLOAD_URL).unwrap_or_else(|_| C_UPLOAD_URL_DEFAULT.to_string());
        Ok(Self::new(dir, url))
    }
}

/// Resolve `file_path` (relative to the upload directory) into a path and URL.
///
/// Parent directories are created. Absolute paths and `..` components are rejected.
pub fn resolve_output(
    location: &SpecUploadLocation,
    file_path: impl AsRef<Path>,
) -> RowbookResult<SpecXlsxOutput> {
    let path_rel = file_path.as_ref();
    let l_parts = derive_relative_parts(path_rel)?;

    let mut path_out = location.dir.clone();
    for c_part in &l_parts {
        path_out.push(c_part);
    }
    if let Some(path_parent) = path_out.parent() {
        fs::create_dir_all(path_parent)?;
    }

    let url = format!("{}/{}", location.url.trim_end_matches('/'), l_parts.join("/"));
    log::debug!("Resolved output {} -> {}", path_out.display(), url);

    Ok(SpecXlsxOutput {
        path: path_out,
        url,
    })
}

fn derive_relative_parts(path_rel: &Path) -> RowbookResult<Vec<String>> {
    let mut l_parts = Vec::new();
    for component in path_rel.components() {
        match component {
            Component::Normal(c_part) => l_parts.push(c_part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(RowbookError::InvalidPath(path_rel.to_path_buf()));
            }
        }
    }
    if l_parts.is_empty() {
        return Err(RowbookError::InvalidPath(path_rel.to_path_buf()));
    }
    Ok(l_parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_output_joins_path_and_url() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let location = SpecUploadLocation::new(tmp.path(), "https://example.org/upload/");

        let output = resolve_output(&location, "report/2024/users.xlsx").expect("resolve");
        assert_eq!(output.path, tmp.path().join("report").join("2024").join("users.xlsx"));
        assert_eq!(output.url, "https://example.org/upload/report/2024/users.xlsx");
        assert!(tmp.path().join("report/2024").is_dir());
    }

    #[test]
    fn test_resolve_output_skips_current_dir_components() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let location = SpecUploadLocation::new(tmp.path(), "/upload");

        let output = resolve_output(&location, "./a.xlsx").expect("resolve");
        assert_eq!(output.url, "/upload/a.xlsx");
    }

    #[test]
    fn test_resolve_output_rejects_escaping_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let location = SpecUploadLocation::new(tmp.path(), "/upload");

        for c_path in ["../evil.xlsx", "/etc/evil.xlsx", "a/../../b.xlsx", ""] {
            let err = resolve_output(&location, c_path).unwrap_err();
            assert!(matches!(err, RowbookError::InvalidPath(_)), "{c_path}");
        }
    }
}
