//! Slurm command synthesis for benchmark workloads.
//!
//! A [`TestRun`] of a [`TestDefinition`] is turned into the `srun` command
//! that launches it ([`generate_srun_command`]) and into an `sbatch` script
//! wrapping that command ([`write_sbatch_script`]). Each workload kind has a
//! [`CommandGenStrategy`]; [`strategy_for`] picks it by kind tag.

pub mod args;
pub mod env;
pub mod error;
pub mod model;
pub mod prefix;
pub mod sbatch;
pub mod strategy;
pub mod tokens;

pub use args::{map_args, ArgField, ArgValue, CmdArgs, Flag};
pub use env::{merge, merged_run_env, EnvSource, EnvValue};
pub use error::{GenError, Result};
pub use model::{ContainerImage, SystemContext, TestDefinition, TestParams, TestRun, WorkloadKind};
pub use prefix::build_launch_prefix;
pub use sbatch::{
    render_sbatch_script, sbatch_script_path, write_sbatch_script, DirectiveFormatter,
    SlurmDirectives, SBATCH_SCRIPT_NAME,
};
pub use strategy::nccl::NcclCmdArgs;
pub use strategy::sleep::SleepCmdArgs;
pub use strategy::ucc::UccCmdArgs;
pub use strategy::{generate_srun_command, strategy_for, CommandGenStrategy};
pub use tokens::CommandTokens;

/// Compose the command for `run` with the strategy of its kind, write the
/// batch script and return the submission command.
pub fn gen_exec_command(system: &SystemContext, run: &TestRun) -> Result<String> {
    let strategy = strategy_for(run.kind());
    let command = generate_srun_command(strategy.as_ref(), system, run)?;
    write_sbatch_script(system, run, &command, &SlurmDirectives)
}
