use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use evm_prover::config::{
    ENV_CONSTRAINTS_JSON, ENV_FIELD, ENV_GROTH16, ENV_PK_PATH, ENV_PROOF_PATH,
    ENV_SOLIDITY_PATH, ENV_VK_PATH, ENV_WITNESS_JSON,
};
use evm_prover::{prover, ProverConfig};

/// Command-mode driver: setup, solve, prove, and Solidity export.
///
/// Flags are bridged into the environment contract so nested invocations
/// (containers, test harnesses) see the same configuration.
#[derive(Parser, Debug)]
#[command(name = "proverctl")]
struct Args {
    /// Command: prove (default), setup, solve, setupAndProve, exportSolidity.
    #[arg(long, default_value = "prove")]
    cmd: String,
    /// Field for proving: babybear or koalabear.
    #[arg(long, default_value = "babybear")]
    field: String,
    /// Path of the proving key.
    #[arg(long, default_value = "./data/vm_pk")]
    pk: PathBuf,
    /// Path of the verifying key.
    #[arg(long, default_value = "./data/vm_vk")]
    vk: PathBuf,
    /// Path of the witness JSON file.
    #[arg(long, default_value = "./data/groth16_witness.json")]
    witness: PathBuf,
    /// Path of the constraint program JSON file.
    #[arg(long, default_value = "./data/constraints.json")]
    constraints: PathBuf,
    /// Path of the proof output.
    #[arg(long, default_value = "./data/proof.data")]
    proof: PathBuf,
    /// Path of the exported verifier contract.
    #[arg(long, default_value = "./data/vm_verifier.sol")]
    sol: PathBuf,
    /// Use the Groth16 backend (the only supported one).
    #[arg(long, default_value_t = true)]
    groth16: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    env::set_var(ENV_FIELD, &args.field);
    env::set_var(ENV_PK_PATH, &args.pk);
    env::set_var(ENV_VK_PATH, &args.vk);
    env::set_var(ENV_WITNESS_JSON, &args.witness);
    env::set_var(ENV_CONSTRAINTS_JSON, &args.constraints);
    env::set_var(ENV_PROOF_PATH, &args.proof);
    env::set_var(ENV_SOLIDITY_PATH, &args.sol);
    if args.groth16 {
        env::set_var(ENV_GROTH16, "1");
    }

    let cfg = ProverConfig::from_env()?;

    match args.cmd.as_str() {
        "setup" => {
            prover::setup(&cfg).context("fail to setup")?;
            prover::export_solidity(&cfg).context("fail to export solidity")?;
        }
        "solve" => {
            let program = evm_prover::circuit::read_program(&cfg.constraints_path)?;
            let witness = evm_prover::circuit::read_witness(&cfg.witness_path)?;
            prover::solve(cfg.field, program, &witness).context("fail to solve")?;
        }
        "prove" => {
            prover::prove_cmd(&cfg).context("fail to prove")?;
        }
        "setupAndProve" => {
            prover::setup(&cfg).context("fail to setup")?;
            prover::export_solidity(&cfg).context("fail to export solidity")?;
            prover::prove_cmd(&cfg).context("fail to prove")?;
        }
        "exportSolidity" => {
            prover::export_solidity(&cfg).context("fail to export solidity")?;
        }
        other => bail!("unknown command: {other}"),
    }
    Ok(())
}
