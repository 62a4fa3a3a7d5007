use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::classifier::extract_data_type;
use crate::config::{Config, OutputFormat};
use crate::executor::interpolation::stringify;
use crate::executor::types::Value;
use crate::executor::ExpressionEvaluator;
use crate::logging::init_logging;
use crate::variables::VariableDefinition;

#[derive(Parser, Debug)]
#[command(name = "wfexpr")]
#[command(about = "Evaluate and classify sandboxed workflow expressions", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides ./wfexpr.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (overrides config file and env vars)
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a single expression (without the surrounding braces)
    Eval {
        expression: String,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Interpolate every `{{ }}` span of a template
    Render {
        template: String,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Infer the data type of a field value without evaluating it
    Classify {
        field: String,

        /// JSON array of variable definitions
        #[arg(long)]
        variables: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
pub struct DataArgs {
    /// JSON object mapping node titles to their outputs
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// JSON document exposed as `$json`
    #[arg(long = "json-data")]
    pub json_data: Option<PathBuf>,

    /// JSON document exposed as `$input`
    #[arg(long)]
    pub input: Option<PathBuf>,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with explicit arguments (first entry is the program name)
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging);

    let output = execute(cli.command, &config, cli.output.unwrap_or(config.cli.output))?;
    println!("{}", output);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let builder = match path {
        Some(path) => Config::builder().file(path),
        None => Config::builder(),
    };
    Ok(builder.load()?)
}

/// Run one command and return what should be printed
pub fn execute(command: Commands, config: &Config, output: OutputFormat) -> Result<String> {
    match command {
        Commands::Eval { expression, data } => {
            let evaluator = build_evaluator(&data, config)?;
            let value = evaluator.evaluate(&expression)?;
            Ok(match output {
                OutputFormat::Plain => stringify(&value),
                OutputFormat::Json => json!({ "result": value.to_json() }).to_string(),
            })
        }

        Commands::Render { template, data } => {
            let evaluator = build_evaluator(&data, config)?;
            let rendered = evaluator.process_string(&template)?;
            Ok(match output {
                OutputFormat::Plain => rendered,
                OutputFormat::Json => json!({ "result": rendered }).to_string(),
            })
        }

        Commands::Classify { field, variables } => {
            let variables = match variables.as_ref().or(config.cli.variables.as_ref()) {
                Some(path) => read_json::<Vec<VariableDefinition>>(path)?,
                None => Vec::new(),
            };
            let data_type = extract_data_type(&field, &variables);
            Ok(match output {
                OutputFormat::Plain => data_type.map(|t| t.to_string()).unwrap_or_default(),
                OutputFormat::Json => json!({ "dataType": data_type }).to_string(),
            })
        }

        Commands::Config => {
            let text = toml::to_string(config).context("Failed to serialize configuration")?;
            Ok(text.trim_end().to_string())
        }
    }
}

fn build_evaluator(data: &DataArgs, config: &Config) -> Result<ExpressionEvaluator> {
    let mut evaluator = ExpressionEvaluator::new();

    if let Some(path) = data.context.as_ref().or(config.cli.context.as_ref()) {
        evaluator.set_context(read_json::<Value>(path)?)?;
    }
    if let Some(path) = &data.json_data {
        evaluator.set_current_node_data(read_json::<Value>(path)?);
    }
    if let Some(path) = &data.input {
        evaluator.set_input_data(read_json::<Value>(path)?);
    }

    Ok(evaluator)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("wfexpr").chain(args.iter().copied())).unwrap()
    }

    fn run(args: &[&str]) -> Result<String> {
        let cli = parse(args);
        let output = cli.output.unwrap_or_default();
        execute(cli.command, &Config::default(), output)
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = parse(&["eval", "1 + 1", "--output", "json", "--config", "x.toml"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Eval { ref expression, .. } if expression == "1 + 1"));
    }

    #[test]
    fn test_eval_with_context() {
        let context = json_file(r#"{"User": {"name": "Ann", "tags": ["a", "b"]}}"#);
        let path = context.path().to_str().unwrap();

        assert_eq!(run(&["eval", "$('User').name", "--context", path]).unwrap(), "Ann");
        assert_eq!(
            run(&["eval", "$('User').tags", "--context", path, "--output", "json"]).unwrap(),
            r#"{"result":["a","b"]}"#
        );
    }

    #[test]
    fn test_render_with_json_and_input() {
        let json_data = json_file(r#"{"title": "Report"}"#);
        let input = json_file(r#"{"count": 3}"#);
        let output = run(&[
            "render",
            "{{ $json.title }} x{{ $input.count }}",
            "--json-data",
            json_data.path().to_str().unwrap(),
            "--input",
            input.path().to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(output, "Report x3");
    }

    #[test]
    fn test_eval_errors_propagate() {
        let err = run(&["eval", "process"]).unwrap_err();
        let fault = err.downcast_ref::<ExpressionError>().unwrap();
        assert!(fault.is_security());

        let err = run(&["eval", "1", "--context", "/definitely/not/here.json"]).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn test_classify() {
        let variables = json_file(
            r#"[{"key": "$('Form').age", "name": "Age", "type": "number"}]"#,
        );
        let path = variables.path().to_str().unwrap();

        assert_eq!(run(&["classify", "{{ $('Form').age }}", "--variables", path]).unwrap(), "NUMBER");
        assert_eq!(
            run(&["classify", "{{ $('Form').age > 1 }}", "--output", "json"]).unwrap(),
            r#"{"dataType":"BOOLEAN"}"#
        );
        assert_eq!(run(&["classify", "plain"]).unwrap(), "");
    }

    #[test]
    fn test_run_from_args_with_config_file() {
        let mut config = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        config
            .write_all(b"[logging]\nlevel = \"warn\"\n\n[cli]\noutput = \"json\"\n")
            .unwrap();
        let config_path = config.path().to_str().unwrap().to_string();
        let context = json_file(r#"{"Form": {"total": 4}}"#);

        let args = |command: &[&str]| -> Vec<String> {
            ["wfexpr", "--config", config_path.as_str()]
                .iter()
                .chain(command)
                .map(|s| s.to_string())
                .collect()
        };
        run_cli_from_args(args(&["eval", "1 + 1"])).unwrap();
        run_cli_from_args(args(&[
            "render",
            "total={{ $('Form').total }}",
            "--context",
            context.path().to_str().unwrap(),
        ]))
        .unwrap();

        let err = run_cli_from_args(args(&["eval", "process"])).unwrap_err();
        assert!(err.downcast_ref::<ExpressionError>().unwrap().is_security());
    }

    #[test]
    fn test_run_from_args_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let args = vec![
            "wfexpr".to_string(),
            "--config".to_string(),
            missing.to_str().unwrap().to_string(),
            "eval".to_string(),
            "1".to_string(),
        ];
        let err = run_cli_from_args(args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::config::ConfigError>(),
            Some(crate::config::ConfigError::NotFound(path)) if *path == missing
        ));
    }

    #[test]
    fn test_config_command() {
        let output = run(&["config"]).unwrap();
        assert!(output.contains("[logging]"));
        assert!(output.contains("[cli]"));
    }
}
