//! Manifest and archive synthesis for gantry projects.
//!
//! Resolves a project declaration plus caller overrides into Kubernetes
//! batch Job and PersistentVolumeClaim manifests and a deterministic
//! tarball of declared input data. Nothing here talks to a cluster: the
//! outputs are YAML text and files on disk.

pub mod archive;
pub mod bundle;
pub mod declaration;
pub mod emit;
pub mod error;
pub mod job;
pub mod k8s;
pub mod pvc;
pub mod request;
pub mod resources;

pub use bundle::{synthesize, ManifestBundle};
pub use declaration::{GpuSpec, ProjectDeclaration};
pub use error::{Error, Result};
pub use request::{ManifestRequest, Overrides};
