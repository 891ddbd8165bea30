use super::{append_extra_cmd_args, CommandGenStrategy};
use crate::args::{checked_args, map_args, ArgField, CmdArgs};
use crate::error::Result;
use crate::model::{SystemContext, TestParams, TestRun, WorkloadKind};
use crate::tokens::CommandTokens;
use serde::{Deserialize, Serialize};

pub const UCC_PERFTEST: &str = "/opt/hpcx/ucc/bin/ucc_perftest";

/// Always appended after the mapped arguments: CUDA memory, full report.
const FIXED_FLAGS: [&str; 2] = ["-m cuda", "-F"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UccCmdArgs {
    #[serde(default)]
    pub collective: Option<String>,
    #[serde(default = "default_b")]
    pub b: u64,
    #[serde(default = "default_e")]
    pub e: String,
}

fn default_b() -> u64 {
    1
}

fn default_e() -> String {
    "8M".to_string()
}

impl UccCmdArgs {
    pub fn new(collective: impl Into<String>) -> Self {
        Self {
            collective: Some(collective.into()),
            ..Self::default()
        }
    }
}

impl Default for UccCmdArgs {
    fn default() -> Self {
        Self {
            collective: None,
            b: default_b(),
            e: default_e(),
        }
    }
}

impl CmdArgs for UccCmdArgs {
    const KIND: WorkloadKind = WorkloadKind::UccTest;

    fn extract(params: &TestParams) -> Option<&Self> {
        match params {
            TestParams::UccTest(args) => Some(args),
            _ => None,
        }
    }

    fn fields(&self) -> Vec<ArgField> {
        vec![
            ArgField::short("collective", 'c', self.collective.as_ref()),
            ArgField::short("b", 'b', self.b),
            ArgField::short("e", 'e', &self.e),
        ]
    }
}

/// UCC collective micro-benchmark (`ucc_perftest`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UccTestStrategy;

impl CommandGenStrategy for UccTestStrategy {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::UccTest
    }

    fn test_command(&self, _system: &SystemContext, run: &TestRun) -> Result<CommandTokens> {
        let args: &UccCmdArgs = checked_args(&run.test)?;
        let mut command = CommandTokens::new();
        command.push(UCC_PERFTEST);
        command.extend(map_args(args)?);
        command.extend(FIXED_FLAGS);
        append_extra_cmd_args(&mut command, run);
        Ok(command)
    }
}
