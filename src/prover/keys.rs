//! Proving/verifying-key file IO.
//!
//! Key files are trusted local artifacts produced by our own setup, so
//! reads take the fast path: uncompressed bytes with curve validation
//! skipped. Writes stay uncompressed to match.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Compress, Validate};

use crate::error::Result;

pub fn read_proving_key(path: &Path) -> Result<ProvingKey<Bn254>> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(ProvingKey::deserialize_with_mode(&mut reader, Compress::No, Validate::No)?)
}

pub fn read_verifying_key(path: &Path) -> Result<VerifyingKey<Bn254>> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(VerifyingKey::deserialize_with_mode(&mut reader, Compress::No, Validate::No)?)
}

pub fn write_proving_key(path: &Path, pk: &ProvingKey<Bn254>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    pk.serialize_with_mode(&mut writer, Compress::No)?;
    Ok(())
}

pub fn write_verifying_key(path: &Path, vk: &VerifyingKey<Bn254>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    vk.serialize_with_mode(&mut writer, Compress::No)?;
    Ok(())
}
