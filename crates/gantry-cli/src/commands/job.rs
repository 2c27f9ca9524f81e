//! Job command - synthesize batch manifests for a project
//!
//! Resolves the project declaration plus CLI overrides, archives declared
//! inputs, and emits the Job and PVC manifests.
//!
//! # Usage
//!
//! ```bash
//! # Print the job manifest to stdout
//! gantry job ./my-project
//!
//! # Write everything out with an explicit image
//! gantry job ./my-project --image ghcr.io/acme/train:v2 -o job.yaml
//! ```

use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use gantry_manifest::{archive, emit, synthesize, ManifestRequest, Overrides};

use crate::{project, Result};

/// Job command arguments
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Path to the project directory containing gantry.toml
    pub project_path: PathBuf,

    /// Container image reference (defaults to gantry/<project>:latest)
    #[arg(long)]
    pub image: Option<String>,

    /// Job name (defaults to the image basename)
    #[arg(long)]
    pub job_name: Option<String>,

    /// Input PVC storage size (defaults to 1Gi)
    #[arg(long)]
    pub input_size: Option<String>,

    /// Output PVC storage size (defaults to 1Gi)
    #[arg(long)]
    pub output_size: Option<String>,

    /// Write the job manifest to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input PVC manifest destination (defaults to <job>-input-pvc.yaml)
    #[arg(long)]
    pub pvc_output: Option<PathBuf>,

    /// Input archive destination (defaults to <job>-inputs.tgz)
    #[arg(long)]
    pub archive: Option<PathBuf>,
}

/// Run the job command.
pub async fn run(args: JobArgs) -> Result<()> {
    let declaration = project::load_project(&args.project_path)?;
    let overrides = Overrides {
        image: args.image,
        job_name: args.job_name,
        input_size: args.input_size,
        output_size: args.output_size,
        output_path: args.output,
        pvc_output_path: args.pvc_output,
        archive_path: args.archive,
    };
    let request = ManifestRequest::resolve(declaration, overrides)?;
    debug!(job = %request.job_name, image = %request.image, "resolved manifest request");

    // Archive the inputs while the manifests are composed
    let archive_task = request.has_inputs().then(|| {
        let root = request.declaration.root.clone();
        let inputs = request.declaration.inputs.clone();
        let destination = request.archive_destination();
        tokio::task::spawn_blocking(move || archive::build_archive(&root, &inputs, &destination))
    });

    let bundle = synthesize(&request)?;

    let staged = match archive_task {
        Some(task) => Some(task.await.map_err(std::io::Error::other)??),
        None => None,
    };

    let report = emit::emit(&request, &bundle, staged)?;
    if let Some(path) = &report.input_pvc_path {
        eprintln!("Input PVC manifest written to {}", path.display());
    }
    if let Some(path) = &report.archive_path {
        eprintln!("Input archive written to {}", path.display());
    }
    if let Some(path) = &report.manifest_path {
        eprintln!("Job manifest written to {}", path.display());
    }
    Ok(())
}
