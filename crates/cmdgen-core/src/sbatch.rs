//! Batch submission scripts.
//!
//! A script is scheduler directives, one `export` per merged environment
//! variable, a blank line and the launch command. It is written to
//! `<output_path>/cmdgen_sbatch_script.sh` and submitted with `sbatch`.

use crate::env::merged_run_env;
use crate::error::Result;
use crate::model::{SystemContext, TestRun};
use crate::tokens::CommandTokens;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

pub const SBATCH_SCRIPT_NAME: &str = "cmdgen_sbatch_script.sh";
pub const SUBMIT_COMMAND: &str = "sbatch";

/// Produces the scheduler directive lines heading a batch script.
pub trait DirectiveFormatter {
    fn directives(&self, system: &SystemContext, run: &TestRun) -> Vec<String>;
}

/// `#SBATCH` directives for a Slurm cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlurmDirectives;

impl DirectiveFormatter for SlurmDirectives {
    fn directives(&self, system: &SystemContext, run: &TestRun) -> Vec<String> {
        let job_name = if run.name.is_empty() {
            &run.test.name
        } else {
            &run.name
        };
        let mut lines = vec![
            "#!/bin/bash".to_string(),
            format!("#SBATCH --job-name={}", job_name),
        ];
        if run.nodes.is_empty() {
            lines.push(format!("#SBATCH -N {}", run.num_nodes));
        } else {
            lines.push(format!("#SBATCH --nodelist={}", run.nodes.join(",")));
        }
        lines.push(format!(
            "#SBATCH --output={}",
            run.output_path.join("stdout.txt").display()
        ));
        lines.push(format!(
            "#SBATCH --error={}",
            run.output_path.join("stderr.txt").display()
        ));
        if let Some(partition) = &system.default_partition {
            lines.push(format!("#SBATCH --partition={}", partition));
        }
        if let Some(account) = &system.account {
            lines.push(format!("#SBATCH --account={}", account));
        }
        if let Some(gpus) = system.gpus_per_node {
            lines.push(format!("#SBATCH --gpus-per-node={}", gpus));
        }
        if let Some(ntasks) = system.ntasks_per_node {
            lines.push(format!("#SBATCH --ntasks-per-node={}", ntasks));
        }
        if let Some(limit) = &run.time_limit {
            lines.push(format!("#SBATCH --time={}", limit));
        }
        lines
    }
}

pub fn sbatch_script_path(run: &TestRun) -> PathBuf {
    run.output_path.join(SBATCH_SCRIPT_NAME)
}

/// Script lines without writing anything.
pub fn render_sbatch_script(
    system: &SystemContext,
    run: &TestRun,
    command: &CommandTokens,
    formatter: &dyn DirectiveFormatter,
) -> Vec<String> {
    let mut lines = formatter.directives(system, run);
    for (key, value) in merged_run_env(system, run) {
        lines.push(format!("export {}={}", key, value));
    }
    lines.push(String::new());
    lines.push(command.join());
    lines
}

/// Write the script for `run` and return the command that submits it.
///
/// The output directory must already exist; an existing script is
/// overwritten. I/O failures are returned as they come from the OS.
pub fn write_sbatch_script(
    system: &SystemContext,
    run: &TestRun,
    command: &CommandTokens,
    formatter: &dyn DirectiveFormatter,
) -> Result<String> {
    let lines = render_sbatch_script(system, run, command, formatter);
    let path = sbatch_script_path(run);
    let mut file = fs::File::create(&path)?;
    file.write_all(lines.join("\n").as_bytes())?;
    debug!(run = %run.name, path = %path.display(), lines = lines.len(), "wrote sbatch script");
    Ok(format!("{} {}", SUBMIT_COMMAND, path.display()))
}
