//! Manifest request resolution
//!
//! Merges a project declaration with caller overrides into a fully
//! resolved [`ManifestRequest`]. Every defaultable field is settled here
//! so downstream composition never consults the overrides again.

use std::path::PathBuf;

use crate::declaration::ProjectDeclaration;
use crate::error::{Error, Result};

/// Storage size applied when neither PVC size is overridden
const DEFAULT_PVC_SIZE: &str = "1Gi";

/// Caller-supplied overrides, all optional
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// Container image reference
    pub image: Option<String>,
    /// Job name
    pub job_name: Option<String>,
    /// Input PVC storage size
    pub input_size: Option<String>,
    /// Output PVC storage size
    pub output_size: Option<String>,
    /// Job manifest destination (stdout when unset)
    pub output_path: Option<PathBuf>,
    /// Input PVC manifest destination
    pub pvc_output_path: Option<PathBuf>,
    /// Input archive destination
    pub archive_path: Option<PathBuf>,
}

/// Fully resolved request, ready for composition
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestRequest {
    /// Container image reference
    pub image: String,
    /// Job name, a valid DNS-1123 label
    pub job_name: String,
    /// Input PVC storage size
    pub input_size: String,
    /// Output PVC storage size
    pub output_size: String,
    /// Job manifest destination (stdout when unset)
    pub output_path: Option<PathBuf>,
    /// Input PVC manifest destination override
    pub pvc_output_path: Option<PathBuf>,
    /// Input archive destination override
    pub archive_path: Option<PathBuf>,
    /// Validated project declaration
    pub declaration: ProjectDeclaration,
}

impl ManifestRequest {
    /// Resolve a declaration plus overrides into a request.
    ///
    /// Validates the declaration, fills every default, and rejects job
    /// names that are not valid DNS-1123 labels.
    pub fn resolve(declaration: ProjectDeclaration, overrides: Overrides) -> Result<Self> {
        declaration.validate()?;

        let image = overrides
            .image
            .unwrap_or_else(|| declaration.default_image());
        let job_name = match overrides.job_name {
            Some(name) => name,
            None => job_name_from_image(&image),
        };
        validate_dns_label(&job_name)?;

        Ok(Self {
            image,
            job_name,
            input_size: overrides
                .input_size
                .unwrap_or_else(|| DEFAULT_PVC_SIZE.to_string()),
            output_size: overrides
                .output_size
                .unwrap_or_else(|| DEFAULT_PVC_SIZE.to_string()),
            output_path: overrides.output_path,
            pvc_output_path: overrides.pvc_output_path,
            archive_path: overrides.archive_path,
            declaration,
        })
    }

    /// Whether the project declares any input data
    pub fn has_inputs(&self) -> bool {
        !self.declaration.inputs.is_empty()
    }

    /// Destination for the input PVC manifest
    pub fn input_pvc_destination(&self) -> PathBuf {
        self.pvc_output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}-input-pvc.yaml", self.job_name)))
    }

    /// Destination for the input archive
    pub fn archive_destination(&self) -> PathBuf {
        self.archive_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}-inputs.tgz", self.job_name)))
    }
}

/// Derive a job name from an image reference.
///
/// Strips any digest, then any tag, then takes the final path segment:
/// `registry.example.com/team/model:v2` becomes `model`.
fn job_name_from_image(image: &str) -> String {
    let reference = match image.find('@') {
        Some(at) => &image[..at],
        None => image,
    };
    let repository = match (reference.rfind(':'), reference.rfind('/')) {
        (Some(colon), Some(slash)) if colon > slash => &reference[..colon],
        (Some(colon), None) => &reference[..colon],
        _ => reference,
    };
    repository
        .rsplit('/')
        .next()
        .unwrap_or(repository)
        .to_string()
}

/// Validate that a name is a DNS-1123 label.
pub fn validate_dns_label(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if valid {
        return Ok(());
    }
    Err(Error::validation(format!(
        "job name {name:?} is not a valid DNS-1123 label \
         (lowercase alphanumerics and '-', at most 63 chars, \
         must start and end alphanumeric)"
    )))
}
