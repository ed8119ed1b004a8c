//! Proof lifecycle: setup, load, solve, prove, export.
//!
//! All key material lives in one [`ProverService`] constructed by `load`
//! or `setup`; the readiness barrier is the constructor returning. After
//! that the artifacts are read-only, so handlers share the service with
//! no further locking.

pub mod encoder;
pub mod keys;
pub mod solidity;

use std::fs;
use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, Proof, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::circuit::{self, ConstraintProgram, WitnessInput, WrapperCircuit};
use crate::config::ProverConfig;
use crate::error::{ProverError, Result};
use crate::fields::FieldKind;

pub struct ProverService {
    field: FieldKind,
    pk: ProvingKey<Bn254>,
    program: Arc<ConstraintProgram>,
}

impl ProverService {
    /// Load persisted artifacts. The proving key and the constraint
    /// program are read concurrently; both must succeed before a service
    /// exists, so nothing can serve with partial key material.
    pub fn load(cfg: &ProverConfig) -> Result<Self> {
        info!(field = %cfg.field, "loading prover artifacts");
        let (pk, program) = rayon::join(
            || {
                info!("start load pk");
                let pk = keys::read_proving_key(&cfg.pk_path);
                info!("end load pk");
                pk
            },
            || {
                info!("start load constraints");
                let program = circuit::read_program(&cfg.constraints_path);
                info!("end load constraints");
                program
            },
        );
        Ok(Self { field: cfg.field, pk: pk?, program: program? })
    }

    pub fn from_parts(
        field: FieldKind,
        pk: ProvingKey<Bn254>,
        program: Arc<ConstraintProgram>,
    ) -> Self {
        Self { field, pk, program }
    }

    pub fn field(&self) -> FieldKind {
        self.field
    }

    /// Check constraint satisfaction without producing a proof.
    pub fn solve(&self, witness: &WitnessInput) -> Result<()> {
        solve(self.field, self.program.clone(), witness)
    }

    /// Solve, prove, and self-verify. A proof that fails verification
    /// against our own key material never reaches the caller.
    pub fn prove(&self, witness: &WitnessInput) -> Result<(Proof<Bn254>, Vec<Fr>)> {
        self.solve(witness)?;
        let public_inputs = witness.public_inputs()?;
        let assignment = WrapperCircuit::new(self.field, self.program.clone(), witness.clone());

        let mut rng = StdRng::from_entropy();
        let proof = Groth16::<Bn254>::prove(&self.pk, assignment, &mut rng)?;

        let pvk = prepare_verifying_key(&self.pk.vk);
        let verified = Groth16::<Bn254>::verify_with_processed_vk(&pvk, &public_inputs, &proof)?;
        if !verified {
            error!("generated proof failed self-verification; discarding");
            return Err(ProverError::ProofIntegrity);
        }
        Ok((proof, public_inputs))
    }

    /// Prove and serialize for the verifier contract.
    pub fn prove_onchain(&self, witness: &WitnessInput) -> Result<String> {
        let (proof, public_inputs) = self.prove(witness)?;
        Ok(encoder::encode_proof(&proof, &public_inputs))
    }
}

/// Bind the witness to the circuit and check every constraint.
pub fn solve(
    field: FieldKind,
    program: Arc<ConstraintProgram>,
    witness: &WitnessInput,
) -> Result<()> {
    let assignment = WrapperCircuit::new(field, program, witness.clone());
    assignment.check()?;

    let cs = ConstraintSystem::<Fr>::new_ref();
    assignment.generate_constraints(cs.clone())?;
    if !cs.is_satisfied()? {
        let unsatisfied = cs.which_is_unsatisfied()?.unwrap_or_default();
        return Err(ProverError::Constraint(unsatisfied));
    }
    info!(constraints = cs.num_constraints(), "solved with success");
    Ok(())
}

/// Compile, generate keys, fail-fast on a sample proof, and persist.
pub fn setup(cfg: &ProverConfig) -> Result<ProverService> {
    let program = circuit::read_program(&cfg.constraints_path)?;
    let witness = circuit::read_witness(&cfg.witness_path)?;
    solve(cfg.field, program.clone(), &witness)?;

    let circuit = WrapperCircuit::new(cfg.field, program.clone(), witness.clone());
    let mut rng = StdRng::from_entropy();
    let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit.clone(), &mut rng)
        .map_err(|e| ProverError::Setup(e.to_string()))?;

    // Prove the sample witness and verify it before persisting anything,
    // so broken key material is caught here and not on chain.
    let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng)
        .map_err(|e| ProverError::Setup(e.to_string()))?;
    let pvk = prepare_verifying_key(&vk);
    let verified =
        Groth16::<Bn254>::verify_with_processed_vk(&pvk, &witness.public_inputs()?, &proof)
            .map_err(|e| ProverError::Setup(e.to_string()))?;
    if !verified {
        return Err(ProverError::Setup("sample proof failed verification".into()));
    }

    keys::write_proving_key(&cfg.pk_path, &pk)?;
    keys::write_verifying_key(&cfg.vk_path, &vk)?;
    info!("setup complete, keys persisted");
    Ok(ProverService::from_parts(cfg.field, pk, program))
}

/// Command-mode prove: overlap the proving-key read with witness and
/// program parsing, join, then prove and write the encoded proof.
pub fn prove_cmd(cfg: &ProverConfig) -> Result<String> {
    let (pk, parsed) = rayon::join(
        || keys::read_proving_key(&cfg.pk_path),
        || -> Result<(Arc<ConstraintProgram>, WitnessInput)> {
            let program = circuit::read_program(&cfg.constraints_path)?;
            let witness = circuit::read_witness(&cfg.witness_path)?;
            Ok((program, witness))
        },
    );
    let (program, witness) = parsed?;
    let service = ProverService::from_parts(cfg.field, pk?, program);

    let encoded = service.prove_onchain(&witness)?;
    fs::write(&cfg.proof_path, &encoded)?;
    info!(path = %cfg.proof_path.display(), "proof written successfully");
    Ok(encoded)
}

/// Render the persisted verifying key as a Solidity verifier contract.
pub fn export_solidity(cfg: &ProverConfig) -> Result<()> {
    let vk = keys::read_verifying_key(&cfg.vk_path)?;
    let source = solidity::render_verifier(&vk);
    fs::write(&cfg.solidity_path, source)?;
    info!(path = %cfg.solidity_path.display(), "verifier contract exported");
    Ok(())
}
