//! Canonical serialization and ed25519 signature verification for
//! submitted JobSpecs.

mod signature;

pub use signature::{verify_jobspec_signature, SignatureError};

use crate::domain::JobSpec;
use serde::Serialize;

/// Fields of a JobSpec that are covered by its signature, in the exact
/// order they are serialized. Kept separate from [`JobSpec`] itself so
/// that adding an unsigned field (e.g. a server-side annotation) later
/// can't silently change what a signature covers.
#[derive(Serialize)]
struct SignedFields<'a> {
    id: &'a str,
    version: &'a str,
    benchmark: &'a crate::domain::BenchmarkDescriptor,
    constraints: &'a crate::domain::JobConstraints,
    questions: &'a [String],
    models: &'a [String],
    metadata: &'a crate::domain::JobMetadata,
}

/// Produces the canonical byte serialization a JobSpec's signature is
/// computed over. Uses JSON with sorted map keys implicit in
/// [`serde_json`]'s default struct field ordering (declaration order),
/// so this function, not the wire format, is the source of truth for
/// what a signature covers.
pub fn canonical_bytes(spec: &JobSpec) -> Vec<u8> {
    let signed = SignedFields {
        id: &spec.id,
        version: &spec.version,
        benchmark: &spec.benchmark,
        constraints: &spec.constraints,
        questions: &spec.questions,
        models: &spec.models,
        metadata: &spec.metadata,
    };
    serde_json::to_vec(&signed).expect("SignedFields contains no non-serializable types")
}
