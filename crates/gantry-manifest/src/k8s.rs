//! Kubernetes resource types for manifest synthesis
//!
//! Hand-rolled subset of the batch Job and PersistentVolumeClaim schemas.
//! Optional fields carry `skip_serializing_if` so absent sections vanish
//! from the emitted YAML instead of serializing as nulls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Metadata
// =============================================================================

/// Object metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name (absent on pod template metadata)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            annotations: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// Kubernetes batch Job
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// API version (batch/v1)
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Job spec
    pub spec: JobSpec,
}

/// Job spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Retries before the job is marked failed
    pub backoff_limit: i32,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Pod template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Template metadata, omitted when there are no annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers
    pub containers: Vec<Container>,
    /// Restart policy
    pub restart_policy: String,
    /// Pod security context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<PodSecurityContext>,
    /// Pod volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// Pod-level security context
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    /// GID applied to mounted volumes so files are group-writable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_group: Option<i64>,
}

// =============================================================================
// Container
// =============================================================================

/// Container spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image
    pub image: String,
    /// Command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Volume mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Environment variable with a literal value
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EnvVar {
    /// Create an env var with a literal value
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Resource requirements
///
/// Quantities are plain integers: the only schedulable resources composed
/// here are GPU device and MIG partition counts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Limits keyed by resource name
    pub limits: BTreeMap<String, i64>,
}

// =============================================================================
// Volumes
// =============================================================================

/// Volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Volume name
    pub name: String,
    /// PVC source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PvcVolumeSource>,
}

impl Volume {
    /// Create a Volume backed by a PVC
    pub fn from_pvc(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persistent_volume_claim: Some(PvcVolumeSource {
                claim_name: claim_name.into(),
            }),
        }
    }
}

/// PVC volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcVolumeSource {
    /// PVC claim name
    pub claim_name: String,
}

/// Volume mount
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Volume name
    pub name: String,
    /// Mount path
    pub mount_path: String,
    /// Read only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

// =============================================================================
// PersistentVolumeClaim
// =============================================================================

/// Kubernetes PersistentVolumeClaim
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    /// API version (v1)
    pub api_version: String,
    /// Resource kind (PersistentVolumeClaim)
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// PVC spec
    pub spec: PvcSpec,
}

/// PVC spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcSpec {
    /// Access modes
    pub access_modes: Vec<String>,
    /// Resource requirements
    pub resources: PvcResources,
}

/// PVC resource requirements
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcResources {
    /// Storage requests
    pub requests: PvcStorage,
}

/// PVC storage request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcStorage {
    /// Storage size (e.g., "1Gi")
    pub storage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_literal_serializes_name_and_value() {
        let yaml = serde_yaml::to_string(&EnvVar::literal("FOO", "bar")).unwrap();
        assert_eq!(yaml, "name: FOO\nvalue: bar\n");
    }

    #[test]
    fn volume_from_pvc_sets_claim_name() {
        let volume = Volume::from_pvc("input", "demo-input");
        let yaml = serde_yaml::to_string(&volume).unwrap();
        assert!(yaml.contains("claimName: demo-input"));
    }

    #[test]
    fn optional_mount_fields_are_omitted() {
        let mount = VolumeMount {
            name: "output".to_string(),
            mount_path: "/opt/output".to_string(),
            read_only: None,
        };
        let yaml = serde_yaml::to_string(&mount).unwrap();
        assert!(yaml.contains("mountPath: /opt/output"));
        assert!(!yaml.contains("readOnly"));
    }
}
