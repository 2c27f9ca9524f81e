//! End-to-end manifest synthesis

use crate::error::Result;
use crate::job::compile_job;
use crate::k8s::{Job, PersistentVolumeClaim};
use crate::pvc::plan_claims;
use crate::request::ManifestRequest;
use crate::resources::compose;

/// Every manifest produced for one request
#[derive(Clone, Debug)]
pub struct ManifestBundle {
    /// The batch Job
    pub job: Job,
    /// Claim backing the output mount
    pub output_pvc: PersistentVolumeClaim,
    /// Claim backing the input mount, when inputs are declared
    pub input_pvc: Option<PersistentVolumeClaim>,
}

/// Synthesize the full manifest bundle for a resolved request.
///
/// Composes runtime resources, plans the claims, and compiles the Job.
/// Pure except for reading the declared env file; nothing is written.
pub fn synthesize(request: &ManifestRequest) -> Result<ManifestBundle> {
    let resources = compose(&request.declaration)?;
    let claims = plan_claims(request);
    let job = compile_job(request, &claims, &resources)?;
    Ok(ManifestBundle {
        job,
        output_pvc: claims.output.compile(),
        input_pvc: claims.input.as_ref().map(|plan| plan.compile()),
    })
}
