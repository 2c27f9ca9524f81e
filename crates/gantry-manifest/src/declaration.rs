//! Project declaration consumed by the synthesis pipeline
//!
//! A declaration is produced by a loader at the CLI boundary (project
//! metadata is parsed and validated there) and is immutable from the
//! resolver onward.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// GPU request carried by a project declaration
///
/// Two schemes exist across project revisions: whole-device counts scheduled
/// as `nvidia.com/gpu`, and MIG partitions scheduled as
/// `nvidia.com/mig-<profile>`. Exactly one is active per declaration; the
/// loader maps the source value (integer vs. string) onto the variant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum GpuSpec {
    /// Whole-device count
    Count(u32),
    /// MIG partition profile, e.g. "1g.10gb"
    MigProfile(String),
}

impl GpuSpec {
    /// Validate the GPU request
    pub fn validate(&self) -> Result<()> {
        match self {
            GpuSpec::Count(_) => Ok(()),
            GpuSpec::MigProfile(profile) => {
                if profile.trim().is_empty() {
                    Err(Error::validation(
                        "gpu profile must be a non-empty string",
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

}

/// Validated project declaration
///
/// `inputs` and `env_file` are relative to `root`; `inputs` entries are
/// excluded from the image build and delivered via the input archive
/// instead.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ProjectDeclaration {
    /// Project name, used to derive the default image reference
    pub name: String,
    /// Absolute project root
    pub root: PathBuf,
    /// Container process command line
    pub entrypoint: String,
    /// OS packages installed during the image build, order preserved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub os_dependencies: Vec<String>,
    /// Dataset paths archived separately from the image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<PathBuf>,
    /// KEY=VALUE file injected as container environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,
    /// GPU request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuSpec>,
    /// Storage request in Gi used by submission-style sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<u32>,
}

impl ProjectDeclaration {
    /// Validate the declaration
    pub fn validate(&self) -> Result<()> {
        if self.entrypoint.trim().is_empty() {
            return Err(Error::validation("entrypoint must be a non-empty string"));
        }
        if let Some(gpu) = &self.gpu {
            gpu.validate()?;
        }
        Ok(())
    }

    /// Opinionated default image reference for the project
    ///
    /// Lowercases the project name, collapses runs of characters outside
    /// `[a-z0-9_.-]` into `-`, and falls back to the root directory name
    /// when nothing survives.
    pub fn default_image(&self) -> String {
        let base = sanitize_image_base(&self.name);
        let base = if base.is_empty() {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        } else {
            base
        };
        format!("gantry/{base}:latest")
    }

    /// Split the entrypoint into the container command vector
    pub fn command(&self) -> Vec<String> {
        self.entrypoint
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

fn sanitize_image_base(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-') {
            out.push(c);
            pending_dash = false;
        } else if !pending_dash {
            out.push('-');
            pending_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(name: &str, entrypoint: &str) -> ProjectDeclaration {
        ProjectDeclaration {
            name: name.to_string(),
            root: PathBuf::from("/projects/demo"),
            entrypoint: entrypoint.to_string(),
            os_dependencies: Vec::new(),
            inputs: Vec::new(),
            env_file: None,
            gpu: None,
            storage: None,
        }
    }

    #[test]
    fn gpu_blank_profile_fails_validation() {
        let err = GpuSpec::MigProfile("  ".to_string()).validate().unwrap_err();
        assert!(err.to_string().contains("gpu profile"));
        assert!(GpuSpec::Count(0).validate().is_ok());
    }

    #[test]
    fn gpu_deserializes_from_count_or_profile() {
        let count: GpuSpec = serde_yaml::from_str("2").unwrap();
        assert_eq!(count, GpuSpec::Count(2));

        let profile: GpuSpec = serde_yaml::from_str("\"1g.10gb\"").unwrap();
        assert_eq!(profile, GpuSpec::MigProfile("1g.10gb".to_string()));
    }

    #[test]
    fn empty_entrypoint_fails_validation() {
        let err = declaration("demo", "   ").validate().unwrap_err();
        assert!(err.to_string().contains("entrypoint"));
    }

    #[test]
    fn default_image_sanitizes_project_name() {
        let decl = declaration("My Demo Project!", "python main.py");
        assert_eq!(decl.default_image(), "gantry/my-demo-project:latest");
    }

    #[test]
    fn default_image_keeps_allowed_punctuation() {
        let decl = declaration("data_pipeline.v2", "python main.py");
        assert_eq!(decl.default_image(), "gantry/data_pipeline.v2:latest");
    }

    #[test]
    fn default_image_falls_back_to_root_directory() {
        let mut decl = declaration("!!!", "python main.py");
        decl.root = PathBuf::from("/projects/Fallback");
        assert_eq!(decl.default_image(), "gantry/fallback:latest");
    }

    #[test]
    fn command_splits_entrypoint_on_whitespace() {
        let decl = declaration("demo", "python -m app.main");
        assert_eq!(decl.command(), vec!["python", "-m", "app.main"]);
    }
}
