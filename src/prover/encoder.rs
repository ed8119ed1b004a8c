//! On-chain proof encoding.
//!
//! The verifier contract takes its calldata as a fixed sequence of 32-byte
//! big-endian words: `A.x, A.y, B.x.c1, B.x.c0, B.y.c1, B.y.c0, C.x, C.y`
//! followed by the public inputs in witness order. No length prefix, no
//! tags; correctness rests entirely on field count and order.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::Proof;
use num_bigint::BigUint;

use crate::error::{ProverError, Result};

/// Serialize a proof plus its public inputs into the comma-separated hex
/// string the verifier contract expects.
pub fn encode_proof(proof: &Proof<Bn254>, public_inputs: &[Fr]) -> String {
    let mut words: Vec<String> = Vec::with_capacity(8 + public_inputs.len());
    words.push(hex_word(&fq_int(&proof.a.x)));
    words.push(hex_word(&fq_int(&proof.a.y)));
    words.push(hex_word(&fq_int(&proof.b.x.c1)));
    words.push(hex_word(&fq_int(&proof.b.x.c0)));
    words.push(hex_word(&fq_int(&proof.b.y.c1)));
    words.push(hex_word(&fq_int(&proof.b.y.c0)));
    words.push(hex_word(&fq_int(&proof.c.x)));
    words.push(hex_word(&fq_int(&proof.c.y)));
    for value in public_inputs {
        words.push(hex_word(&value.into_bigint().into()));
    }
    words.join(",")
}

/// Recover the proof points and public inputs from an encoded string.
pub fn decode_proof(encoded: &str) -> Result<(Proof<Bn254>, Vec<Fr>)> {
    let words = parse_words(encoded)?;
    if words.len() < 8 {
        return Err(ProverError::Serialization(format!(
            "proof string holds {} words, expected at least 8",
            words.len()
        )));
    }

    let a = G1Affine::new_unchecked(Fq::from(words[0].clone()), Fq::from(words[1].clone()));
    let b = G2Affine::new_unchecked(
        Fq2::new(Fq::from(words[3].clone()), Fq::from(words[2].clone())),
        Fq2::new(Fq::from(words[5].clone()), Fq::from(words[4].clone())),
    );
    let c = G1Affine::new_unchecked(Fq::from(words[6].clone()), Fq::from(words[7].clone()));

    let public_inputs = words[8..].iter().map(|w| Fr::from(w.clone())).collect();
    Ok((Proof { a, b, c }, public_inputs))
}

/// Split a stored proof string into the `(proof[8], publicInputs)` calldata
/// pair the contract entry point takes.
pub fn contract_inputs(encoded: &str) -> Result<([String; 8], Vec<String>)> {
    let words: Vec<&str> = encoded.split(',').collect();
    if words.len() < 8 {
        return Err(ProverError::Serialization(
            "proof string too short for calldata split".into(),
        ));
    }
    let proof: [String; 8] = std::array::from_fn(|i| words[i].to_string());
    let inputs = words[8..].iter().map(|w| w.to_string()).collect();
    Ok((proof, inputs))
}

fn parse_words(encoded: &str) -> Result<Vec<BigUint>> {
    encoded
        .split(',')
        .map(|word| {
            let digits = word.strip_prefix("0x").ok_or_else(|| {
                ProverError::Serialization(format!("word {word:?} missing 0x prefix"))
            })?;
            if digits.len() != 64 {
                return Err(ProverError::Serialization(format!(
                    "word {word:?} is not 32 bytes"
                )));
            }
            Ok(BigUint::from_bytes_be(&hex::decode(digits)?))
        })
        .collect()
}

fn fq_int(v: &Fq) -> BigUint {
    v.into_bigint().into()
}

/// 0x-prefixed, zero-padded 32-byte big-endian hex.
fn hex_word(v: &BigUint) -> String {
    let bytes = v.to_bytes_be();
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    format!("0x{}", hex::encode(padded))
}
