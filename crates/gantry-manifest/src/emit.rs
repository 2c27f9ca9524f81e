//! Manifest emission
//!
//! Serializes a bundle to YAML and writes every destination atomically
//! through same-directory temp files. All documents are rendered before
//! the first byte lands, so a failing render leaves every destination
//! untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::archive::StagedArchive;
use crate::bundle::ManifestBundle;
use crate::error::{Error, Result};
use crate::request::ManifestRequest;

/// Directory where a write destined for `path` is staged
pub(crate) fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `content` to `path` through a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let mut staged = NamedTempFile::new_in(staging_dir(path))?;
    staged.write_all(content)?;
    staged.persist(path).map_err(|e| Error::Io(e.error))?;
    tracing::debug!(path = %path.display(), "wrote file");
    Ok(())
}

/// Render the Job and output PVC as one multi-document YAML string.
pub fn combined_yaml(bundle: &ManifestBundle) -> Result<String> {
    let job = serde_yaml::to_string(&bundle.job)?;
    let pvc = serde_yaml::to_string(&bundle.output_pvc)?;
    Ok(format!("{job}---\n{pvc}"))
}

/// Render the input PVC as its own document, when one was planned.
pub fn input_pvc_yaml(bundle: &ManifestBundle) -> Result<Option<String>> {
    bundle
        .input_pvc
        .as_ref()
        .map(|pvc| serde_yaml::to_string(pvc).map_err(Error::from))
        .transpose()
}

/// Paths written during one emission
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmitReport {
    /// Job manifest path, `None` when it went to stdout
    pub manifest_path: Option<PathBuf>,
    /// Input PVC manifest path
    pub input_pvc_path: Option<PathBuf>,
    /// Input archive path
    pub archive_path: Option<PathBuf>,
}

/// Emit every artifact for a request.
///
/// Write order: staged archive first, then the input PVC manifest, then
/// the job manifest to its file or to stdout.
pub fn emit(
    request: &ManifestRequest,
    bundle: &ManifestBundle,
    archive: Option<StagedArchive>,
) -> Result<EmitReport> {
    let combined = combined_yaml(bundle)?;
    let input_pvc = input_pvc_yaml(bundle)?;

    let mut report = EmitReport::default();
    if let Some(staged) = archive {
        report.archive_path = Some(staged.persist()?);
    }
    if let Some(yaml) = input_pvc {
        let destination = request.input_pvc_destination();
        write_atomic(&destination, yaml.as_bytes())?;
        report.input_pvc_path = Some(destination);
    }
    match &request.output_path {
        Some(path) => {
            write_atomic(path, combined.as_bytes())?;
            report.manifest_path = Some(path.clone());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(combined.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(report)
}
