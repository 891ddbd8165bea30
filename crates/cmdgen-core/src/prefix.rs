use crate::env::merged_run_env;
use crate::error::{GenError, Result};
use crate::model::{SystemContext, TestRun};
use crate::tokens::CommandTokens;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LAUNCHER: &str = "srun";

/// Host-side topology file for the interconnect library.
pub const TOPO_FILE_VAR: &str = "NCCL_TOPO_FILE";
/// Where the workload expects the topology file inside the container.
pub const CONTAINER_TOPO_FILE_VAR: &str = "DOCKER_NCCL_TOPO_FILE";

/// `srun` invocation shared by every workload kind: launcher, MPI flag,
/// container image, topology-file mount, then the system's raw extra args.
///
/// A blank MPI identifier or image reference is an `UnformattableValue`.
pub fn build_launch_prefix(system: &SystemContext, run: &TestRun) -> Result<CommandTokens> {
    let mut prefix = CommandTokens::new();
    prefix.push(LAUNCHER);
    prefix.push(format!("--mpi={}", non_blank(&system.mpi, run, "mpi")?));

    if let Some(image) = &run.test.container_image {
        let reference = image.reference();
        prefix.push(format!(
            "--container-image={}",
            non_blank(&reference, run, "container_image")?
        ));
    }

    if let Some(mounts) = topology_mount(system, run) {
        prefix.push(format!("--container-mounts={}", mounts));
    }

    if let Some(extra) = &system.extra_srun_args {
        prefix.push(extra.as_str());
    }

    Ok(prefix)
}

fn non_blank<'a>(value: &'a str, run: &TestRun, field: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(GenError::UnformattableValue {
            kind: run.kind(),
            field,
        });
    }
    Ok(value)
}

/// `<absolute host path>:<container path>` when both topology variables are set.
/// A blank value counts as unset.
fn topology_mount(system: &SystemContext, run: &TestRun) -> Option<String> {
    let env = merged_run_env(system, run);
    let lookup = |key: &str| env.get(key).filter(|v| !v.trim().is_empty());
    match (lookup(TOPO_FILE_VAR), lookup(CONTAINER_TOPO_FILE_VAR)) {
        (Some(host), Some(container)) => {
            let host = resolve_host_path(Path::new(host));
            Some(format!("{}:{}", host.display(), container))
        }
        (None, None) => None,
        (host, container) => {
            debug!(
                run = %run.name,
                host_set = host.is_some(),
                container_set = container.is_some(),
                "topology file mount needs both {} and {}; skipping",
                TOPO_FILE_VAR,
                CONTAINER_TOPO_FILE_VAR
            );
            None
        }
    }
}

/// Canonical path if the file exists, otherwise the lexically absolute path.
fn resolve_host_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerImage, TestDefinition};
    use crate::strategy::nccl::NcclCmdArgs;
    use crate::strategy::sleep::SleepCmdArgs;
    use std::sync::Arc;

    fn sleep_run() -> TestRun {
        TestRun::new(
            "sleep_run",
            Arc::new(TestDefinition::new("sleep", SleepCmdArgs::default())),
            "/tmp/out",
        )
    }

    #[test]
    fn bare_prefix_is_launcher_and_mpi() {
        let system = SystemContext::new("cluster", "pmix");
        let prefix = build_launch_prefix(&system, &sleep_run()).expect("prefix");
        assert_eq!(prefix, ["srun", "--mpi=pmix"]);
    }

    #[test]
    fn prefix_order_is_image_mount_then_extra_args() {
        let system = SystemContext::new("cluster", "pmi2")
            .with_env_var(TOPO_FILE_VAR, "/a/b.xml")
            .with_extra_srun_args("--reservation foo --exclusive");
        let tdef = TestDefinition::new("nccl", NcclCmdArgs::new("all_reduce_perf"))
            .with_container_image(ContainerImage::new("nvcr.io#nvidia/pytorch:24.02-py3"));
        let run = TestRun::new("r", Arc::new(tdef), "/tmp/out")
            .with_env_var(CONTAINER_TOPO_FILE_VAR, "/in/b.xml");
        let prefix = build_launch_prefix(&system, &run).expect("prefix");
        assert_eq!(
            prefix,
            [
                "srun",
                "--mpi=pmi2",
                "--container-image=nvcr.io#nvidia/pytorch:24.02-py3",
                "--container-mounts=/a/b.xml:/in/b.xml",
                "--reservation foo --exclusive",
            ]
        );
    }

    #[test]
    fn half_configured_topology_mount_is_skipped() {
        let system = SystemContext::new("cluster", "pmix").with_env_var(TOPO_FILE_VAR, "/a/b.xml");
        let prefix = build_launch_prefix(&system, &sleep_run()).expect("prefix");
        assert!(prefix.iter().all(|t| !t.starts_with("--container-mounts")));

        let run = sleep_run().with_env_var(CONTAINER_TOPO_FILE_VAR, "/in/b.xml");
        let system = SystemContext::new("cluster", "pmix");
        let prefix = build_launch_prefix(&system, &run).expect("prefix");
        assert_eq!(prefix, ["srun", "--mpi=pmix"]);
    }

    #[test]
    fn relative_topology_file_is_made_absolute() {
        let system = SystemContext::new("cluster", "pmix")
            .with_env_var(TOPO_FILE_VAR, "topo/does_not_exist.xml")
            .with_env_var(CONTAINER_TOPO_FILE_VAR, "/in/topo.xml");
        let prefix = build_launch_prefix(&system, &sleep_run()).expect("prefix");
        let mount = prefix
            .iter()
            .find_map(|t| t.strip_prefix("--container-mounts="))
            .expect("mount token");
        let (host, container) = mount.rsplit_once(':').expect("host:container");
        assert!(Path::new(host).is_absolute(), "host path not absolute: {}", host);
        assert!(host.ends_with("topo/does_not_exist.xml"));
        assert_eq!(container, "/in/topo.xml");
    }

    #[test]
    fn blank_topology_value_counts_as_unset() {
        let system = SystemContext::new("cluster", "pmix")
            .with_env_var(TOPO_FILE_VAR, "/a/b.xml")
            .with_env_var(CONTAINER_TOPO_FILE_VAR, "");
        let prefix = build_launch_prefix(&system, &sleep_run()).expect("prefix");
        assert_eq!(prefix, ["srun", "--mpi=pmix"]);

        let run = sleep_run().with_env_var(TOPO_FILE_VAR, " ");
        let system = SystemContext::new("cluster", "pmix")
            .with_env_var(TOPO_FILE_VAR, "/a/b.xml")
            .with_env_var(CONTAINER_TOPO_FILE_VAR, "/in/b.xml");
        let prefix = build_launch_prefix(&system, &run).expect("prefix");
        assert_eq!(prefix, ["srun", "--mpi=pmix"]);
    }

    #[test]
    fn blank_mpi_is_unformattable() {
        let system = SystemContext::new("cluster", "");
        let err = build_launch_prefix(&system, &sleep_run()).expect_err("blank mpi");
        assert!(matches!(
            err,
            GenError::UnformattableValue { field: "mpi", .. }
        ));
    }

    #[test]
    fn blank_container_image_is_unformattable() {
        let tdef = TestDefinition::new("nccl", NcclCmdArgs::new("all_reduce_perf"))
            .with_container_image(ContainerImage::new(""));
        let run = TestRun::new("r", Arc::new(tdef), "/tmp/out");
        let err = build_launch_prefix(&SystemContext::new("cluster", "pmix"), &run)
            .expect_err("blank image");
        match err {
            GenError::UnformattableValue { kind, field } => {
                assert_eq!(kind, crate::model::WorkloadKind::NcclTest);
                assert_eq!(field, "container_image");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn blank_extra_srun_args_add_no_token() {
        let system = SystemContext::new("cluster", "pmix").with_extra_srun_args("  ");
        let prefix = build_launch_prefix(&system, &sleep_run()).expect("prefix");
        assert_eq!(prefix.len(), 2);
    }
}
