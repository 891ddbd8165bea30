use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cmdgen_core::{SystemContext, TestDefinition, TestRun, WorkloadKind};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cmdgen", version, about = "Slurm command generator for benchmark workloads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// System description (YAML or JSON)
    #[arg(long)]
    system: PathBuf,
    /// Test definition (YAML or JSON)
    #[arg(long)]
    test: PathBuf,
    #[arg(long)]
    output_dir: PathBuf,
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = 1)]
    nodes: u32,
    #[arg(long = "node")]
    node_list: Vec<String>,
    #[arg(long = "env")]
    env_values: Vec<String>,
    #[arg(long)]
    extra_args: Option<String>,
    #[arg(long)]
    time_limit: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported workload kinds
    Kinds {
        #[arg(long)]
        json: bool,
    },
    /// Print the srun command for a test run
    Command(RunArgs),
    /// Write the sbatch script for a test run and print the submission command
    Sbatch(RunArgs),
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(cli.command);
    match result {
        Ok(Some(payload)) => {
            emit_json(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            if json_mode {
                emit_json(&json_error("command_failed", format!("{:#}", err), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::Kinds { json } => {
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "kinds",
                    "kinds": WorkloadKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
                })));
            }
            for kind in WorkloadKind::ALL {
                println!("{}", kind);
            }
        }
        Commands::Command(args) => {
            let json = args.json;
            let (system, run) = load_run(&args)?;
            let strategy = cmdgen_core::strategy_for(run.kind());
            let command = cmdgen_core::generate_srun_command(strategy.as_ref(), &system, &run)?;
            let srun = command.join();
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "command",
                    "run": run_to_json(&run),
                    "tokens": command.as_slice(),
                    "srun": srun,
                })));
            }
            println!("{}", srun);
        }
        Commands::Sbatch(args) => {
            let json = args.json;
            let (system, run) = load_run(&args)?;
            let submit = cmdgen_core::gen_exec_command(&system, &run).with_context(|| {
                format!(
                    "failed to write sbatch script under {}",
                    run.output_path.display()
                )
            })?;
            let script = cmdgen_core::sbatch_script_path(&run);
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "sbatch",
                    "run": run_to_json(&run),
                    "script": script.display().to_string(),
                    "submit": submit,
                })));
            }
            println!("script: {}", script.display());
            println!("submit: {}", submit);
        }
    }
    Ok(None)
}

fn load_run(args: &RunArgs) -> Result<(SystemContext, TestRun)> {
    let system: SystemContext = load_yaml(&args.system)?;
    let tdef: TestDefinition = load_yaml(&args.test)?;
    let name = args.name.clone().unwrap_or_else(|| tdef.name.clone());
    let mut run = TestRun::new(name, Arc::new(tdef), &args.output_dir)
        .with_num_nodes(args.nodes)
        .with_nodes(args.node_list.clone());
    for (key, value) in parse_env_values(&args.env_values)? {
        run = run.with_env_var(key, value);
    }
    if let Some(extra) = &args.extra_args {
        run = run.with_extra_cmd_args(extra.as_str());
    }
    if let Some(limit) = &args.time_limit {
        run = run.with_time_limit(limit.as_str());
    }
    debug!(
        system = %system.name,
        kind = %run.kind(),
        output = %run.output_path.display(),
        "loaded test run"
    );
    Ok((system, run))
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_env_values(values: &[String]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for raw in values {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!(format!("invalid --env '{}': expected KEY=VALUE", raw)))?;
        if key.trim().is_empty() {
            return Err(anyhow::anyhow!(format!(
                "invalid --env '{}': key cannot be empty",
                raw
            )));
        }
        out.insert(key.to_string(), value.to_string());
    }
    Ok(out)
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Kinds { json } => *json,
        Commands::Command(args) | Commands::Sbatch(args) => args.json,
    }
}

fn run_to_json(run: &TestRun) -> Value {
    json!({
        "name": run.name,
        "test": run.test.name,
        "kind": run.kind().as_str(),
        "num_nodes": run.num_nodes,
        "nodes": run.nodes,
        "output_path": run.output_path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_values_splits_on_first_equals() {
        let parsed = parse_env_values(&["A=1".to_string(), "B=x=y".to_string()]).expect("parse");
        assert_eq!(parsed["A"], "1");
        assert_eq!(parsed["B"], "x=y");
    }

    #[test]
    fn parse_env_values_rejects_malformed_pairs() {
        assert!(parse_env_values(&["NOEQUALS".to_string()]).is_err());
        assert!(parse_env_values(&["=value".to_string()]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    fn conf_path(rel: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../conf")
            .join(rel)
    }

    fn run_args(test: &str) -> RunArgs {
        RunArgs {
            system: conf_path("system.yaml"),
            test: conf_path(test),
            output_dir: PathBuf::from("/tmp/cmdgen-out"),
            name: None,
            nodes: 2,
            node_list: Vec::new(),
            env_values: vec!["NCCL_DEBUG=WARN".to_string()],
            extra_args: None,
            time_limit: None,
            json: false,
        }
    }

    #[test]
    fn sample_configs_compose_commands() {
        for test in [
            "tests/sleep.yaml",
            "tests/nccl_all_reduce.yaml",
            "tests/ucc_allgather.yaml",
        ] {
            let (system, run) = load_run(&run_args(test)).expect("load sample config");
            assert_eq!(run.num_nodes, 2);
            assert_eq!(run.name, run.test.name);
            let strategy = cmdgen_core::strategy_for(run.kind());
            let command = cmdgen_core::generate_srun_command(strategy.as_ref(), &system, &run)
                .expect("compose");
            assert_eq!(command.as_slice()[0], "srun");
            assert_eq!(command.as_slice()[1], "--mpi=pmix");
        }
    }

    #[test]
    fn cli_env_overrides_definition_env() {
        let (system, run) = load_run(&run_args("tests/nccl_all_reduce.yaml")).expect("load");
        let env = cmdgen_core::merged_run_env(&system, &run);
        assert_eq!(env["NCCL_DEBUG"], "WARN");
        assert_eq!(env["NCCL_IB_GID_INDEX"], "3");
    }

    #[test]
    fn json_error_envelope_shape() {
        let value = json_error("command_failed", "boom".to_string(), json!({}));
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["error"]["code"], "command_failed");
        assert_eq!(value["error"]["message"], "boom");
    }
}
