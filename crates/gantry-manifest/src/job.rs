//! Job manifest compilation
//!
//! Renders a resolved request, its planned claims, and its composed
//! resources into a batch Job that runs the project entrypoint once,
//! with no retries.

use crate::error::{Error, Result};
use crate::k8s::{
    Container, Job, JobSpec, ObjectMeta, PodSecurityContext, PodSpec, PodTemplateSpec,
    ResourceRequirements, Volume, VolumeMount,
};
use crate::pvc::PlannedClaims;
use crate::request::{validate_dns_label, ManifestRequest};
use crate::resources::ComposedResources;

/// Where the input claim is mounted, read-only
pub const INPUT_MOUNT_PATH: &str = "/opt/input";
/// Where the output claim is mounted, writable
pub const OUTPUT_MOUNT_PATH: &str = "/opt/output";

/// GID owning mounted volumes so the workload can write its output
const OUTPUT_FS_GROUP: i64 = 1000;

/// Compile the Job manifest.
pub fn compile_job(
    request: &ManifestRequest,
    claims: &PlannedClaims,
    resources: &ComposedResources,
) -> Result<Job> {
    validate_dns_label(&request.job_name)?;
    for (key, value) in &resources.limits {
        if *value < 0 {
            return Err(Error::validation(format!(
                "resource {key} has negative quantity {value}"
            )));
        }
    }

    let mut volumes = Vec::new();
    let mut volume_mounts = Vec::new();
    if let Some(input) = &claims.input {
        volumes.push(Volume::from_pvc("input", &input.name));
        volume_mounts.push(VolumeMount {
            name: "input".to_string(),
            mount_path: INPUT_MOUNT_PATH.to_string(),
            read_only: Some(true),
        });
    }
    volumes.push(Volume::from_pvc("output", &claims.output.name));
    volume_mounts.push(VolumeMount {
        name: "output".to_string(),
        mount_path: OUTPUT_MOUNT_PATH.to_string(),
        read_only: None,
    });

    let container = Container {
        name: request.job_name.clone(),
        image: request.image.clone(),
        command: Some(request.declaration.command()),
        env: resources.env.clone(),
        resources: (!resources.limits.is_empty()).then(|| ResourceRequirements {
            limits: resources.limits.clone(),
        }),
        volume_mounts,
    };

    let template_metadata = (!resources.annotations.is_empty()).then(|| ObjectMeta {
        name: None,
        annotations: resources.annotations.clone(),
    });

    Ok(Job {
        api_version: "batch/v1".to_string(),
        kind: "Job".to_string(),
        metadata: ObjectMeta::named(&request.job_name),
        spec: JobSpec {
            backoff_limit: 0,
            template: PodTemplateSpec {
                metadata: template_metadata,
                spec: PodSpec {
                    containers: vec![container],
                    restart_policy: "Never".to_string(),
                    security_context: Some(PodSecurityContext {
                        fs_group: Some(OUTPUT_FS_GROUP),
                    }),
                    volumes,
                },
            },
        },
    })
}
