//! Per-workload command generation.
//!
//! A strategy knows how one workload kind is launched. Every strategy yields
//! two token sequences, the `srun` prefix and the workload command, and
//! [`generate_srun_command`] concatenates them in that order.

pub mod nccl;
pub mod sleep;
pub mod ucc;

use crate::error::{GenError, Result};
use crate::model::{SystemContext, TestRun, WorkloadKind};
use crate::prefix::build_launch_prefix;
use crate::tokens::CommandTokens;
use tracing::debug;

pub use nccl::NcclTestStrategy;
pub use sleep::SleepStrategy;
pub use ucc::UccTestStrategy;

pub trait CommandGenStrategy: Send + Sync {
    fn kind(&self) -> WorkloadKind;

    /// Scheduler invocation preceding the workload command.
    fn launch_prefix(&self, system: &SystemContext, run: &TestRun) -> Result<CommandTokens> {
        ensure_kind(self.kind(), run)?;
        build_launch_prefix(system, run)
    }

    /// The workload's own executable, arguments and extra suffix.
    fn test_command(&self, system: &SystemContext, run: &TestRun) -> Result<CommandTokens>;
}

/// Full command for `run`: `launch_prefix` followed by `test_command`.
pub fn generate_srun_command(
    strategy: &dyn CommandGenStrategy,
    system: &SystemContext,
    run: &TestRun,
) -> Result<CommandTokens> {
    let mut command = strategy.launch_prefix(system, run)?;
    command.append(strategy.test_command(system, run)?);
    debug!(run = %run.name, kind = %strategy.kind(), command = %command, "generated srun command");
    Ok(command)
}

pub fn strategy_for(kind: WorkloadKind) -> Box<dyn CommandGenStrategy> {
    match kind {
        WorkloadKind::Sleep => Box::new(SleepStrategy),
        WorkloadKind::NcclTest => Box::new(NcclTestStrategy),
        WorkloadKind::UccTest => Box::new(UccTestStrategy),
    }
}

fn ensure_kind(expected: WorkloadKind, run: &TestRun) -> Result<()> {
    let actual = run.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(GenError::ConfigurationMismatch { expected, actual })
    }
}

/// Push the run's combined extra arguments as one trailing token.
fn append_extra_cmd_args(command: &mut CommandTokens, run: &TestRun) {
    command.push(run.combined_extra_cmd_args());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestDefinition;
    use crate::strategy::nccl::NcclCmdArgs;
    use crate::strategy::sleep::SleepCmdArgs;
    use crate::strategy::ucc::UccCmdArgs;
    use std::sync::Arc;

    fn run_for(params: crate::model::TestParams) -> TestRun {
        TestRun::new("r", Arc::new(TestDefinition::new("t", params)), "/tmp/out")
    }

    #[test]
    fn strategy_for_matches_kind() {
        for kind in WorkloadKind::ALL {
            assert_eq!(strategy_for(kind).kind(), kind);
        }
    }

    #[test]
    fn every_strategy_rejects_foreign_definitions() {
        let runs = [
            run_for(SleepCmdArgs::default().into()),
            run_for(NcclCmdArgs::new("all_reduce_perf").into()),
            run_for(UccCmdArgs::new("allreduce").into()),
        ];
        let system = SystemContext::new("cluster", "pmix");
        for kind in WorkloadKind::ALL {
            let strategy = strategy_for(kind);
            for run in &runs {
                let result = generate_srun_command(strategy.as_ref(), &system, run);
                if run.kind() == kind {
                    assert!(result.is_ok(), "{} should accept its own kind", kind);
                } else {
                    match result {
                        Err(GenError::ConfigurationMismatch { expected, actual }) => {
                            assert_eq!(expected, kind);
                            assert_eq!(actual, run.kind());
                        }
                        other => panic!("expected mismatch, got {:?}", other),
                    }
                }
            }
        }
    }

    #[test]
    fn sleep_strategy_on_nccl_definition_reports_both_kinds() {
        let run = run_for(NcclCmdArgs::new("all_reduce_perf").into());
        let system = SystemContext::new("cluster", "pmix");
        let err = SleepStrategy
            .test_command(&system, &run)
            .expect_err("mismatch");
        let msg = err.to_string();
        assert!(msg.contains("sleep"), "{}", msg);
        assert!(msg.contains("nccl_test"), "{}", msg);
        assert!(SleepStrategy.launch_prefix(&system, &run).is_err());
    }

    #[test]
    fn generation_is_idempotent() {
        let system = SystemContext::new("cluster", "pmix")
            .with_env_var("NCCL_TOPO_FILE", "/a/b.xml")
            .with_env_var("DOCKER_NCCL_TOPO_FILE", "/in/b.xml")
            .with_extra_srun_args("--exclusive");
        let run = run_for(NcclCmdArgs::new("all_gather_perf").into()).with_extra_cmd_args("--extra 1");
        let strategy = strategy_for(run.kind());
        let first = generate_srun_command(strategy.as_ref(), &system, &run).expect("first");
        let second = generate_srun_command(strategy.as_ref(), &system, &run).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.join(), second.join());
    }

    #[test]
    fn prefix_precedes_payload_and_suffix_is_last() {
        let system = SystemContext::new("cluster", "pmix").with_extra_srun_args("--exclusive");
        let run = run_for(SleepCmdArgs { seconds: 7 }.into()).with_extra_cmd_args("&& hostname");
        let command = generate_srun_command(&SleepStrategy, &system, &run).expect("command");
        assert_eq!(
            command,
            ["srun", "--mpi=pmix", "--exclusive", "sleep", "7", "&& hostname"]
        );
    }
}
