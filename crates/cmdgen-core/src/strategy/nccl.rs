use super::{append_extra_cmd_args, CommandGenStrategy};
use crate::args::{checked_args, map_args, required, ArgField, CmdArgs};
use crate::error::Result;
use crate::model::{SystemContext, TestParams, TestRun, WorkloadKind};
use crate::tokens::CommandTokens;
use serde::{Deserialize, Serialize};

/// Directory holding the `nccl-tests` binaries inside the container.
pub const NCCL_TESTS_BIN_DIR: &str = "/usr/local/bin";

/// Arguments of the `nccl-tests` performance binaries.
///
/// `subtest_name` selects the binary (`all_reduce_perf`, `all_gather_perf`,
/// ...). The remaining fields map one-to-one onto the binary's long options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcclCmdArgs {
    pub subtest_name: Option<String>,
    pub nthreads: u32,
    pub ngpus: u32,
    pub minbytes: String,
    pub maxbytes: String,
    pub stepbytes: String,
    pub op: String,
    pub datatype: String,
    pub root: u32,
    pub iters: u32,
    pub warmup_iters: u32,
    pub agg_iters: u32,
    pub average: u32,
    pub parallel_init: u32,
    pub check: u32,
    pub blocking: u32,
    pub cudagraph: u32,
}

impl Default for NcclCmdArgs {
    fn default() -> Self {
        Self {
            subtest_name: None,
            nthreads: 1,
            ngpus: 1,
            minbytes: "32M".to_string(),
            maxbytes: "32M".to_string(),
            stepbytes: "1M".to_string(),
            op: "sum".to_string(),
            datatype: "float".to_string(),
            root: 0,
            iters: 20,
            warmup_iters: 5,
            agg_iters: 1,
            average: 1,
            parallel_init: 0,
            check: 1,
            blocking: 0,
            cudagraph: 0,
        }
    }
}

impl NcclCmdArgs {
    pub fn new(subtest_name: impl Into<String>) -> Self {
        Self {
            subtest_name: Some(subtest_name.into()),
            ..Self::default()
        }
    }
}

impl CmdArgs for NcclCmdArgs {
    const KIND: WorkloadKind = WorkloadKind::NcclTest;

    fn extract(params: &TestParams) -> Option<&Self> {
        match params {
            TestParams::NcclTest(args) => Some(args),
            _ => None,
        }
    }

    fn fields(&self) -> Vec<ArgField> {
        vec![
            ArgField::long("nthreads", self.nthreads),
            ArgField::long("ngpus", self.ngpus),
            ArgField::long("minbytes", &self.minbytes),
            ArgField::long("maxbytes", &self.maxbytes),
            ArgField::long("stepbytes", &self.stepbytes),
            ArgField::long("op", &self.op),
            ArgField::long("datatype", &self.datatype),
            ArgField::long("root", self.root),
            ArgField::long("iters", self.iters),
            ArgField::long("warmup_iters", self.warmup_iters),
            ArgField::long("agg_iters", self.agg_iters),
            ArgField::long("average", self.average),
            ArgField::long("parallel_init", self.parallel_init),
            ArgField::long("check", self.check),
            ArgField::long("blocking", self.blocking),
            ArgField::long("cudagraph", self.cudagraph),
        ]
    }
}

/// NCCL collective-communication benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct NcclTestStrategy;

impl CommandGenStrategy for NcclTestStrategy {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::NcclTest
    }

    fn test_command(&self, _system: &SystemContext, run: &TestRun) -> Result<CommandTokens> {
        let args: &NcclCmdArgs = checked_args(&run.test)?;
        let subtest = required(self.kind(), "subtest_name", args.subtest_name.as_deref())?;
        let mut command = CommandTokens::new();
        command.push(format!("{}/{}", NCCL_TESTS_BIN_DIR, subtest));
        command.extend(map_args(args)?);
        append_extra_cmd_args(&mut command, run);
        Ok(command)
    }
}
