//! Persistent volume claim planning
//!
//! Plans the storage claims a job needs before any manifest is rendered:
//! always one output claim, plus an input claim when the project declares
//! input data.

use crate::k8s::{ObjectMeta, PersistentVolumeClaim, PvcResources, PvcSpec, PvcStorage};
use crate::request::ManifestRequest;

/// Access mode requested for every claim
const ACCESS_MODE: &str = "ReadWriteOnce";

/// A single planned claim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PvcPlan {
    /// Claim name
    pub name: String,
    /// Requested storage size
    pub storage: String,
}

impl PvcPlan {
    /// Render the plan as a PersistentVolumeClaim manifest.
    pub fn compile(&self) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            api_version: "v1".to_string(),
            kind: "PersistentVolumeClaim".to_string(),
            metadata: ObjectMeta::named(&self.name),
            spec: PvcSpec {
                access_modes: vec![ACCESS_MODE.to_string()],
                resources: PvcResources {
                    requests: PvcStorage {
                        storage: self.storage.clone(),
                    },
                },
            },
        }
    }
}

/// The set of claims planned for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedClaims {
    /// Output claim, always present
    pub output: PvcPlan,
    /// Input claim, present only when the project declares inputs
    pub input: Option<PvcPlan>,
}

/// Plan the claims for a resolved request.
pub fn plan_claims(request: &ManifestRequest) -> PlannedClaims {
    PlannedClaims {
        output: PvcPlan {
            name: format!("{}-output", request.job_name),
            storage: request.output_size.clone(),
        },
        input: request.has_inputs().then(|| PvcPlan {
            name: format!("{}-input", request.job_name),
            storage: request.input_size.clone(),
        }),
    }
}
