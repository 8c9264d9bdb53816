//! Modelos neutrales (Artifact, Fingerprint, ExecutionContext, ...)

pub mod artifact;
pub mod context;
pub mod fingerprint;
pub mod typed_artifact;

pub use artifact::{Artifact, ArtifactKind};
pub use context::ExecutionContext;
pub use fingerprint::TaskFingerprintInput;
pub use typed_artifact::{ArtifactDecodeError, ArtifactSpec, TypedArtifact};
