use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use evm_prover::{server, FieldKind, ProverConfig, ProverService};

/// HTTP proving service: loads key material, then serves /ready and
/// /prove until killed.
#[derive(Parser, Debug)]
#[command(name = "prover-server")]
struct Args {
    /// HTTP JSON listening port.
    #[arg(long, default_value_t = 9099)]
    httpport: u16,
    /// Field selector: kb or bb.
    #[arg(long, default_value = "kb")]
    field: String,
    /// Path of the proving key.
    #[arg(long, default_value = "./data/vm_pk")]
    pk: PathBuf,
    /// Path of the constraint program.
    #[arg(long, default_value = "./data/constraints.json")]
    ccs: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let field: FieldKind = args.field.parse()?;
    tracing::info!(%field, "use field");

    let cfg = ProverConfig {
        field,
        pk_path: args.pk,
        vk_path: PathBuf::new(),
        constraints_path: args.ccs,
        witness_path: PathBuf::new(),
        proof_path: PathBuf::new(),
        solidity_path: PathBuf::new(),
        groth16: true,
    };

    // A failed load aborts the process; serving without full key material
    // is never acceptable.
    let service = Arc::new(ProverService::load(&cfg).context("failed to load prover artifacts")?);
    server::serve(service, args.httpport).await?;
    Ok(())
}
