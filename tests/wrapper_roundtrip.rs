//! End-to-end lifecycle: setup, load, prove, self-verify, encode, export.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, Groth16, ProvingKey};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::rngs::StdRng;
use rand::SeedableRng;

use evm_prover::prover::{self, encoder, keys};
use evm_prover::{
    Constraint, FieldKind, ProverConfig, ProverError, ProverService, WitnessInput, WrapperCircuit,
};

fn gate(opcode: &str, args: &[&str]) -> Constraint {
    Constraint {
        opcode: opcode.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

/// Small wrapper program: two felt operations plus the public commitments.
fn sample_program() -> Vec<Constraint> {
    vec![
        gate("WitnessV", &["vk", "0"]),
        gate("WitnessV", &["digest", "1"]),
        gate("WitnessF", &["x0", "0"]),
        gate("WitnessF", &["x1", "1"]),
        gate("AddF", &["sum", "x0", "x1"]),
        gate("MulF", &["prod", "x0", "x1"]),
        gate("WitnessF", &["want_sum", "2"]),
        gate("WitnessF", &["want_prod", "3"]),
        gate("AssertEqF", &["sum", "want_sum"]),
        gate("AssertEqF", &["prod", "want_prod"]),
        gate("CommitVkeyHash", &["vk"]),
        gate("CommitCommittedValuesDigest", &["digest"]),
    ]
}

fn sample_witness(kind: FieldKind) -> WitnessInput {
    let p = u64::from(kind.spec().prime);
    let x0 = p - 9;
    let x1 = 31u64;
    WitnessInput {
        vars: vec!["31337".into(), "271828".into()],
        felts: vec![
            x0.to_string(),
            x1.to_string(),
            ((x0 + x1) % p).to_string(),
            (u128::from(x0) * u128::from(x1) % u128::from(p)).to_string(),
        ],
        exts: vec![],
        vkey_hash: "31337".into(),
        committed_values_digest: "271828".into(),
    }
}

fn config_in(dir: &Path, field: FieldKind) -> ProverConfig {
    ProverConfig {
        field,
        pk_path: dir.join("vm_pk"),
        vk_path: dir.join("vm_vk"),
        constraints_path: dir.join("constraints.json"),
        witness_path: dir.join("groth16_witness.json"),
        proof_path: dir.join("proof.data"),
        solidity_path: dir.join("vm_verifier.sol"),
        groth16: true,
    }
}

fn write_inputs(cfg: &ProverConfig, witness: &WitnessInput) {
    fs::write(
        &cfg.constraints_path,
        serde_json::to_vec(&sample_program()).unwrap(),
    )
    .unwrap();
    fs::write(&cfg.witness_path, serde_json::to_vec(witness).unwrap()).unwrap();
}

#[test]
fn setup_prove_verify_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path(), FieldKind::BabyBear);
    let witness = sample_witness(cfg.field);
    write_inputs(&cfg, &witness);

    // Setup persists keys after a fail-fast sample proof.
    prover::setup(&cfg).unwrap();

    // The service only exists once both artifact reads succeed.
    let service = ProverService::load(&cfg).unwrap();
    let encoded = service.prove_onchain(&witness).unwrap();

    // The encoded proof decodes to points that verify under the
    // persisted verifying key, with the public inputs intact.
    let (proof, publics) = encoder::decode_proof(&encoded).unwrap();
    assert_eq!(publics, witness.public_inputs().unwrap());

    let vk = keys::read_verifying_key(&cfg.vk_path).unwrap();
    let pvk = prepare_verifying_key(&vk);
    assert!(Groth16::<Bn254>::verify_with_processed_vk(&pvk, &publics, &proof).unwrap());

    prover::export_solidity(&cfg).unwrap();
    let contract = fs::read_to_string(&cfg.solidity_path).unwrap();
    assert!(contract.contains("function verifyProof"));
    assert!(contract.contains("uint256[2] calldata input"));
}

#[test]
fn prove_cmd_writes_proof_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_in(dir.path(), FieldKind::KoalaBear);
    let witness = sample_witness(cfg.field);
    write_inputs(&cfg, &witness);

    prover::setup(&cfg).unwrap();
    let encoded = prover::prove_cmd(&cfg).unwrap();

    let stored = fs::read_to_string(&cfg.proof_path).unwrap();
    assert_eq!(stored, encoded);
    let (proof_words, input_words) = encoder::contract_inputs(&stored).unwrap();
    assert_eq!(proof_words.len(), 8);
    assert_eq!(input_words.len(), 2);
}

#[test]
fn tampered_witness_fails_solve() {
    let witness = sample_witness(FieldKind::BabyBear);
    let program = Arc::new(sample_program());

    // Baseline satisfies.
    prover::solve(FieldKind::BabyBear, program.clone(), &witness).unwrap();

    // One digit off in a private felt breaks an equality constraint.
    let mut tampered = witness.clone();
    tampered.felts[3] = {
        let mut v: u128 = tampered.felts[3].parse().unwrap();
        v = (v + 1) % u128::from(FieldKind::BabyBear.spec().prime);
        v.to_string()
    };
    assert!(matches!(
        prover::solve(FieldKind::BabyBear, program.clone(), &tampered),
        Err(ProverError::Constraint(_))
    ));

    // One digit off in a committed var breaks the public binding.
    let mut tampered = witness;
    tampered.vars[0] = "31338".into();
    assert!(matches!(
        prover::solve(FieldKind::BabyBear, program, &tampered),
        Err(ProverError::Constraint(_))
    ));
}

#[test]
fn mismatched_verifying_key_never_surfaces_a_proof() {
    let witness = sample_witness(FieldKind::BabyBear);
    let program = Arc::new(sample_program());
    let circuit = WrapperCircuit::new(FieldKind::BabyBear, program.clone(), witness.clone());

    let mut rng = StdRng::seed_from_u64(12345);
    let (pk_a, _) = Groth16::<Bn254>::circuit_specific_setup(circuit.clone(), &mut rng).unwrap();
    let (_, vk_b) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng).unwrap();

    // Same circuit, different toxic waste: proofs under pk_a must not
    // verify under vk_b, and the self-verification gate has to catch it.
    let spliced = ProvingKey::<Bn254> { vk: vk_b, ..pk_a };
    let service = ProverService::from_parts(FieldKind::BabyBear, spliced, program);
    assert!(matches!(
        service.prove(&witness),
        Err(ProverError::ProofIntegrity)
    ));
}

#[test]
fn hex_wrapped_witness_decodes_exactly() {
    let witness = sample_witness(FieldKind::KoalaBear);
    let hex_payload = hex::encode(serde_json::to_vec(&witness).unwrap());
    let decoded = WitnessInput::from_hex(&hex_payload).unwrap();
    assert_eq!(decoded.vkey_hash, witness.vkey_hash);
    assert_eq!(decoded.felts, witness.felts);

    assert!(matches!(
        WitnessInput::from_hex("zz-not-hex"),
        Err(ProverError::Serialization(_))
    ));
}
