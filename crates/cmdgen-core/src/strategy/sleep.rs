use super::{append_extra_cmd_args, CommandGenStrategy};
use crate::args::{checked_args, map_args, ArgField, CmdArgs};
use crate::error::Result;
use crate::model::{SystemContext, TestParams, TestRun, WorkloadKind};
use crate::tokens::CommandTokens;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepCmdArgs {
    #[serde(default = "default_seconds")]
    pub seconds: u64,
}

fn default_seconds() -> u64 {
    5
}

impl Default for SleepCmdArgs {
    fn default() -> Self {
        Self {
            seconds: default_seconds(),
        }
    }
}

impl CmdArgs for SleepCmdArgs {
    const KIND: WorkloadKind = WorkloadKind::Sleep;

    fn extract(params: &TestParams) -> Option<&Self> {
        match params {
            TestParams::Sleep(args) => Some(args),
            _ => None,
        }
    }

    fn fields(&self) -> Vec<ArgField> {
        vec![ArgField::positional("seconds", self.seconds)]
    }
}

/// Idle workload: `sleep <seconds>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepStrategy;

impl CommandGenStrategy for SleepStrategy {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Sleep
    }

    fn test_command(&self, _system: &SystemContext, run: &TestRun) -> Result<CommandTokens> {
        let args: &SleepCmdArgs = checked_args(&run.test)?;
        let mut command = CommandTokens::new();
        command.push("sleep");
        command.extend(map_args(args)?);
        append_extra_cmd_args(&mut command, run);
        Ok(command)
    }
}
