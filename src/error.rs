use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

/// Crate-wide error taxonomy for the proof lifecycle.
///
/// Every lifecycle operation surfaces one of these kinds rather than a
/// generic failure, so callers can distinguish a retryable read from a
/// witness that will never satisfy the circuit.
#[derive(Debug, Error)]
pub enum ProverError {
    /// Key, witness, or contract file could not be read or written.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed witness/constraints JSON or corrupt key bytes.
    #[error("malformed input: {0}")]
    Serialization(String),

    /// The witness does not satisfy the compiled circuit.
    #[error("witness does not satisfy the circuit: {0}")]
    Constraint(String),

    /// A freshly generated proof failed self-verification. Implies a bug
    /// in circuit construction or mismatched key material, never a
    /// transient fault; the proof is discarded before reaching the caller.
    #[error("generated proof failed self-verification")]
    ProofIntegrity,

    /// Groth16 key generation failed.
    #[error("groth16 setup failed: {0}")]
    Setup(String),

    /// Unrecognized field selector; rejected before any work begins.
    #[error("unsupported field selector: {0:?}")]
    UnsupportedField(String),

    /// Constraint synthesis failed below the lifecycle layer.
    #[error("constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl From<serde_json::Error> for ProverError {
    fn from(err: serde_json::Error) -> Self {
        ProverError::Serialization(err.to_string())
    }
}

impl From<ark_serialize::SerializationError> for ProverError {
    fn from(err: ark_serialize::SerializationError) -> Self {
        ProverError::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for ProverError {
    fn from(err: hex::FromHexError) -> Self {
        ProverError::Serialization(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, ProverError>;
