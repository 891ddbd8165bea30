use crate::env::EnvValue;
use crate::strategy::nccl::NcclCmdArgs;
use crate::strategy::sleep::SleepCmdArgs;
use crate::strategy::ucc::UccCmdArgs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Category of workload a test definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Sleep,
    NcclTest,
    UccTest,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Sleep,
        WorkloadKind::NcclTest,
        WorkloadKind::UccTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Sleep => "sleep",
            WorkloadKind::NcclTest => "nccl_test",
            WorkloadKind::UccTest => "ucc_test",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag plus the parameter object for that kind.
///
/// Serialized adjacently tagged so a definition file reads
/// `kind: nccl_test` followed by a `cmd_args:` mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cmd_args", rename_all = "snake_case")]
pub enum TestParams {
    Sleep(SleepCmdArgs),
    NcclTest(NcclCmdArgs),
    UccTest(UccCmdArgs),
}

impl TestParams {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            TestParams::Sleep(_) => WorkloadKind::Sleep,
            TestParams::NcclTest(_) => WorkloadKind::NcclTest,
            TestParams::UccTest(_) => WorkloadKind::UccTest,
        }
    }
}

impl From<SleepCmdArgs> for TestParams {
    fn from(args: SleepCmdArgs) -> Self {
        TestParams::Sleep(args)
    }
}

impl From<NcclCmdArgs> for TestParams {
    fn from(args: NcclCmdArgs) -> Self {
        TestParams::NcclTest(args)
    }
}

impl From<UccCmdArgs> for TestParams {
    fn from(args: UccCmdArgs) -> Self {
        TestParams::UccTest(args)
    }
}

/// Container image a workload runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub url: String,
    /// Local copy of the image (e.g. an imported squashfs file), preferred over `url`.
    #[serde(default)]
    pub installed_path: Option<PathBuf>,
}

impl ContainerImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            installed_path: None,
        }
    }

    pub fn with_installed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.installed_path = Some(path.into());
        self
    }

    /// The reference handed to `--container-image`.
    pub fn reference(&self) -> String {
        match &self.installed_path {
            Some(path) => path.display().to_string(),
            None => self.url.clone(),
        }
    }
}

/// Cluster-wide settings shared by every run of a generation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    pub name: String,
    #[serde(default = "default_mpi")]
    pub mpi: String,
    #[serde(default)]
    pub global_env_vars: BTreeMap<String, EnvValue>,
    #[serde(default)]
    pub extra_srun_args: Option<String>,
    #[serde(default)]
    pub default_partition: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub gpus_per_node: Option<u32>,
    #[serde(default)]
    pub ntasks_per_node: Option<u32>,
}

fn default_mpi() -> String {
    "pmix".to_string()
}

impl SystemContext {
    pub fn new(name: impl Into<String>, mpi: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mpi: mpi.into(),
            global_env_vars: BTreeMap::new(),
            extra_srun_args: None,
            default_partition: None,
            account: None,
            gpus_per_node: None,
            ntasks_per_node: None,
        }
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.global_env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_srun_args(mut self, args: impl Into<String>) -> Self {
        self.extra_srun_args = Some(args.into());
        self
    }
}

/// Immutable description of what to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub params: TestParams,
    #[serde(default)]
    pub container_image: Option<ContainerImage>,
    #[serde(default)]
    pub extra_env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub extra_cmd_args: String,
}

impl TestDefinition {
    pub fn new(name: impl Into<String>, params: impl Into<TestParams>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: params.into(),
            container_image: None,
            extra_env_vars: BTreeMap::new(),
            extra_cmd_args: String::new(),
        }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.params.kind()
    }

    pub fn with_container_image(mut self, image: ContainerImage) -> Self {
        self.container_image = Some(image);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_cmd_args(mut self, args: impl Into<String>) -> Self {
        self.extra_cmd_args = args.into();
        self
    }
}

/// One scheduled execution of a test definition.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub name: String,
    pub test: Arc<TestDefinition>,
    pub num_nodes: u32,
    pub nodes: Vec<String>,
    pub output_path: PathBuf,
    pub extra_env_vars: BTreeMap<String, String>,
    pub extra_cmd_args: String,
    pub time_limit: Option<String>,
}

impl TestRun {
    pub fn new(
        name: impl Into<String>,
        test: Arc<TestDefinition>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            test,
            num_nodes: 1,
            nodes: Vec::new(),
            output_path: output_path.into(),
            extra_env_vars: BTreeMap::new(),
            extra_cmd_args: String::new(),
            time_limit: None,
        }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.test.kind()
    }

    pub fn with_num_nodes(mut self, num_nodes: u32) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_cmd_args(mut self, args: impl Into<String>) -> Self {
        self.extra_cmd_args = args.into();
        self
    }

    pub fn with_time_limit(mut self, limit: impl Into<String>) -> Self {
        self.time_limit = Some(limit.into());
        self
    }

    /// Raw suffix for the workload command: the definition's extra args
    /// followed by the run's. Blank parts are skipped; kept parts are verbatim.
    pub fn combined_extra_cmd_args(&self) -> String {
        [self.test.extra_cmd_args.as_str(), self.extra_cmd_args.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
