//! Project file loading
//!
//! Reads `gantry.toml` from a project directory and lowers it into a
//! validated [`ProjectDeclaration`]. TOML stays at this boundary; the
//! synthesis crate never sees it.

use std::path::{Path, PathBuf};

use gantry_manifest::{GpuSpec, ProjectDeclaration};
use serde::Deserialize;

use crate::{Error, Result};

/// File name looked up inside the project directory
pub const PROJECT_FILE: &str = "gantry.toml";

/// Raw on-disk shape of the project file
#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    project: ProjectTable,
    job: Option<JobTable>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectTable {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobTable {
    entrypoint: Option<String>,
    #[serde(default)]
    os_dependencies: Vec<String>,
    /// Integer count or MIG profile string
    gpu: Option<toml::Value>,
    #[serde(default)]
    inputs: Vec<String>,
    env_file: Option<String>,
    storage: Option<u32>,
}

/// Load and validate the declaration for a project directory.
pub fn load_project(project_dir: &Path) -> Result<ProjectDeclaration> {
    let root = project_dir.canonicalize().map_err(|e| {
        Error::project_config(format!(
            "cannot resolve project directory {}: {e}",
            project_dir.display()
        ))
    })?;
    let path = root.join(PROJECT_FILE);
    if !path.exists() {
        return Err(Error::project_config(format!(
            "no {PROJECT_FILE} found at {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(&path)?;
    let file: ProjectFile = toml::from_str(&contents)
        .map_err(|e| Error::project_config(format!("failed to parse {}: {e}", path.display())))?;

    let job = file.job.ok_or_else(|| {
        Error::project_config(format!("{} is missing the [job] section", path.display()))
    })?;
    let entrypoint = job
        .entrypoint
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            Error::project_config(format!(
                "{} must define a non-empty 'entrypoint' string",
                path.display()
            ))
        })?;

    let gpu = job.gpu.map(parse_gpu).transpose()?;

    let mut inputs = Vec::with_capacity(job.inputs.len());
    for input in job.inputs {
        let input = PathBuf::from(input);
        let resolved = root.join(&input);
        if !resolved.exists() {
            return Err(Error::project_config(format!(
                "input path declared at {} does not exist",
                resolved.display()
            )));
        }
        inputs.push(input);
    }

    let name = file
        .project
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        });

    let declaration = ProjectDeclaration {
        name,
        root,
        entrypoint,
        os_dependencies: job
            .os_dependencies
            .into_iter()
            .map(|dep| dep.trim().to_string())
            .collect(),
        inputs,
        env_file: job.env_file.map(PathBuf::from),
        gpu,
        storage: job.storage,
    };
    declaration.validate()?;
    Ok(declaration)
}

/// Lower the declared `gpu` value onto a [`GpuSpec`].
///
/// An integer is a whole-device count; a string is a MIG profile.
fn parse_gpu(value: toml::Value) -> Result<GpuSpec> {
    match value {
        toml::Value::Integer(count) => u32::try_from(count).map(GpuSpec::Count).map_err(|_| {
            Error::project_config(format!(
                "gpu must be a non-negative integer count or a profile string, got {count}"
            ))
        }),
        toml::Value::String(profile) => {
            let profile = profile.trim().to_string();
            if profile.is_empty() {
                return Err(Error::project_config(
                    "gpu profile must be a non-empty string",
                ));
            }
            Ok(GpuSpec::MigProfile(profile))
        }
        other => Err(Error::project_config(format!(
            "gpu must be a non-negative integer count or a profile string, got {}",
            other.type_str()
        ))),
    }
}
