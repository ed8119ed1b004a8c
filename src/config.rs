//! Process configuration for both service and command mode.
//!
//! Binaries translate their flags into the environment contract below, so
//! subprocess-style invocations (container entrypoints, test harnesses)
//! configure the prover the same way the CLI does.

use std::env;
use std::path::PathBuf;

use crate::error::{ProverError, Result};
use crate::fields::FieldKind;

/// Environment variable names shared with upstream tooling.
pub const ENV_FIELD: &str = "FIELD";
pub const ENV_PK_PATH: &str = "PK_PATH";
pub const ENV_VK_PATH: &str = "VK_PATH";
pub const ENV_WITNESS_JSON: &str = "WITNESS_JSON";
pub const ENV_CONSTRAINTS_JSON: &str = "CONSTRAINTS_JSON";
pub const ENV_PROOF_PATH: &str = "PROOF_PATH";
pub const ENV_SOLIDITY_PATH: &str = "SOLIDITY_PATH";
pub const ENV_GROTH16: &str = "GROTH16";

/// Resolved configuration for one prover process.
#[derive(Debug, Clone)]
pub struct ProverConfig {
    pub field: FieldKind,
    pub pk_path: PathBuf,
    pub vk_path: PathBuf,
    pub constraints_path: PathBuf,
    pub witness_path: PathBuf,
    pub proof_path: PathBuf,
    pub solidity_path: PathBuf,
    /// Groth16 is currently the only supported backend; the flag is kept
    /// for wire compatibility with callers that pass it explicitly.
    pub groth16: bool,
}

impl ProverConfig {
    /// Build a configuration from the environment contract. Unset path
    /// variables fall back to the conventional `./data` layout.
    pub fn from_env() -> Result<Self> {
        let field = env::var(ENV_FIELD)
            .map_err(|_| ProverError::UnsupportedField("FIELD not set".into()))?
            .parse()?;
        Ok(Self {
            field,
            pk_path: path_or(ENV_PK_PATH, "./data/vm_pk"),
            vk_path: path_or(ENV_VK_PATH, "./data/vm_vk"),
            constraints_path: path_or(ENV_CONSTRAINTS_JSON, "./data/constraints.json"),
            witness_path: path_or(ENV_WITNESS_JSON, "./data/groth16_witness.json"),
            proof_path: path_or(ENV_PROOF_PATH, "./data/proof.data"),
            solidity_path: path_or(ENV_SOLIDITY_PATH, "./data/vm_verifier.sol"),
            groth16: env::var(ENV_GROTH16).map(|v| v == "1").unwrap_or(true),
        })
    }
}

fn path_or(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}
