mod config;
mod output;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use threatscry_core::input::ModelInput;
use threatscry_core::types::all_value_sets;
use threatscry_core::{analyze, load_model_file, AnalysisOptions, ParsedModel, RiskRule, RuleRegistry};
use threatscry_plugin::raa::{apply_scores, calculate};
use threatscry_plugin::{PluginRule, PluginRunner, RaaPlugin, DEFAULT_TIMEOUT};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "threatscry")]
#[command(about = "Find risks in architecture threat models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a model file and write the JSON reports
    Analyze(AnalyzeArgs),

    /// List the built-in risk rules
    ListRiskRules,

    /// Describe one built-in risk rule
    ExplainRiskRule {
        /// Risk category id, e.g. `unencrypted-asset`
        id: String,
    },

    /// List the accepted values of every enumerated model field
    ListTypes,

    /// Print the JSON schema of the model file format
    Schema,

    /// Write a commented threatscry.toml into the current directory
    Init {
        /// Output directory to put into the file
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// RAA plugin to put into the file
        #[arg(long, value_name = "PLUGIN")]
        raa_plugin: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Model YAML file
    #[arg(short, long, value_name = "FILE")]
    model: PathBuf,

    /// Directory for risks.json, technical-assets.json and stats.json
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Comma separated risk rule ids not to execute
    #[arg(long, value_name = "IDS")]
    skip_risk_rules: Option<String>,

    /// Do not fail on risk tracking entries that match no risk
    #[arg(long)]
    ignore_orphaned_risk_tracking: bool,

    /// Additional risk rule executable (repeatable)
    #[arg(long = "custom-risk-rules-plugin", value_name = "PLUGIN")]
    custom_risk_rules_plugins: Vec<String>,

    /// Executable computing relative attacker attractiveness
    #[arg(long, value_name = "PLUGIN")]
    raa_plugin: Option<String>,

    /// Seconds a single plugin call may take
    #[arg(long, value_name = "SECS")]
    plugin_timeout: Option<u64>,
}

/// Analyze settings after merging the config file with the flags.
#[derive(Debug)]
struct Settings {
    output: PathBuf,
    options: AnalysisOptions,
    custom_risk_rules_plugins: Vec<String>,
    raa_plugin: Option<String>,
    plugin_timeout: Duration,
}

impl Settings {
    fn merge(config: Config, args: &AnalyzeArgs) -> Self {
        let skip_risk_rules = match &args.skip_risk_rules {
            Some(list) => AnalysisOptions::skip_list(list),
            None => config.skip_risk_rules,
        };
        let mut custom_risk_rules_plugins = config.custom_risk_rules_plugins;
        custom_risk_rules_plugins.extend(args.custom_risk_rules_plugins.iter().cloned());
        Settings {
            output: args
                .output
                .clone()
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from("threatscry-output")),
            options: AnalysisOptions {
                skip_risk_rules,
                ignore_orphaned_risk_tracking: args.ignore_orphaned_risk_tracking
                    || config.ignore_orphaned_risk_tracking,
            },
            custom_risk_rules_plugins,
            raa_plugin: args.raa_plugin.clone().or(config.raa_plugin),
            plugin_timeout: args
                .plugin_timeout
                .or(config.plugin_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => {
            let config = Config::discover(cli.config.as_deref())?;
            run_analyze(Settings::merge(config, &args), &args.model)
        }
        Commands::ListRiskRules => list_risk_rules(),
        Commands::ExplainRiskRule { id } => explain_risk_rule(&id),
        Commands::ListTypes => list_types(),
        Commands::Schema => print_schema(),
        Commands::Init {
            output,
            raa_plugin,
            force,
        } => init(output.as_deref(), raa_plugin.as_deref(), force),
    }
}

fn run_analyze(settings: Settings, model_path: &Path) -> Result<()> {
    let mut model = load_model_file(model_path)
        .with_context(|| format!("loading model {}", model_path.display()))?;
    apply_attractiveness(&mut model, &settings)?;

    let mut registry = RuleRegistry::builtin();
    for spec in &settings.custom_risk_rules_plugins {
        let runner = PluginRunner::locate(spec)?.with_timeout(settings.plugin_timeout);
        let rule = PluginRule::load(runner).with_context(|| format!("loading risk rule plugin {spec}"))?;
        registry.register(Box::new(rule))?;
    }

    let report = analyze(model, registry, &settings.options)?;
    output::write_reports(&settings.output, &report)?;
    println!(
        "{} risks in {} categories written to {}",
        report.risks.len(),
        report.risks_by_category.len(),
        settings.output.display()
    );
    Ok(())
}

fn apply_attractiveness(model: &mut ParsedModel, settings: &Settings) -> Result<()> {
    let summary = match &settings.raa_plugin {
        Some(spec) => {
            let runner = PluginRunner::locate(spec)?.with_timeout(settings.plugin_timeout);
            RaaPlugin::new(runner)
                .apply(model)
                .with_context(|| format!("running RAA plugin {spec}"))?
        }
        None => {
            let result = calculate(model);
            apply_scores(model, &result, "builtin")?;
            result.summary
        }
    };
    info!(summary = %summary, "relative attacker attractiveness");
    Ok(())
}

fn list_risk_rules() -> Result<()> {
    let registry = RuleRegistry::builtin();
    let mut stdout = std::io::stdout().lock();
    for rule in registry.rules() {
        let category = rule.category();
        writeln!(stdout, "{} --> {}", category.id, category.title)?;
    }
    Ok(())
}

fn explain_risk_rule(id: &str) -> Result<()> {
    let registry = RuleRegistry::builtin();
    let Some(rule) = registry.get(id) else {
        bail!("unknown risk rule: {id}");
    };
    print_category(rule)
}

fn print_category(rule: &dyn RiskRule) -> Result<()> {
    let category = rule.category();
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{} ({})", category.title, category.id)?;
    writeln!(stdout)?;
    for (label, text) in [
        ("Description", &category.description),
        ("Impact", &category.impact),
        ("Detection", &category.detection_logic),
        ("Rating", &category.risk_assessment),
        ("False positives", &category.false_positives),
        ("Mitigation", &category.mitigation),
        ("Check", &category.check),
        ("ASVS", &category.asvs),
        ("Cheat sheet", &category.cheat_sheet),
    ] {
        if !text.is_empty() {
            writeln!(stdout, "{label}: {text}")?;
        }
    }
    writeln!(stdout, "Function: {}", category.function)?;
    writeln!(stdout, "STRIDE: {}", category.stride)?;
    if category.cwe > 0 {
        writeln!(stdout, "CWE: {}", category.cwe)?;
    }
    let tags = rule.supported_tags();
    if !tags.is_empty() {
        writeln!(stdout, "Tags: {}", tags.join(", "))?;
    }
    Ok(())
}

fn list_types() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for (name, values) in all_value_sets() {
        writeln!(stdout, "{name}:")?;
        for (value, description) in values {
            writeln!(stdout, "  {value}: {description}")?;
        }
    }
    Ok(())
}

fn print_schema() -> Result<()> {
    let schema = schemars::schema_for!(ModelInput);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn init(output: Option<&Path>, raa_plugin: Option<&str>, force: bool) -> Result<()> {
    let path = PathBuf::from(config::FILE_NAME);
    if path.exists() && !force {
        bail!("{} already exists, use --force to overwrite it", path.display());
    }
    std::fs::write(&path, config::template(output, raa_plugin)?)
        .with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(line).unwrap();
        match cli.command {
            Commands::Analyze(args) => args,
            _ => unreachable!("not an analyze command"),
        }
    }

    #[test]
    fn flags_override_config_values() {
        let config = Config {
            output: Some(PathBuf::from("from-config")),
            skip_risk_rules: vec!["missing-vault".to_string()],
            raa_plugin: Some("config-raa".to_string()),
            plugin_timeout_secs: Some(5),
            custom_risk_rules_plugins: vec!["config-rule".to_string()],
            ..Config::default()
        };
        let settings = Settings::merge(
            config,
            &args(&[
                "threatscry",
                "analyze",
                "--model",
                "m.yaml",
                "--output",
                "out",
                "--skip-risk-rules",
                "ldap-injection,xml-external-entity",
                "--custom-risk-rules-plugin",
                "flag-rule",
            ]),
        );
        assert_eq!(settings.output, PathBuf::from("out"));
        assert_eq!(
            settings.options.skip_risk_rules,
            vec!["ldap-injection", "xml-external-entity"]
        );
        assert_eq!(settings.raa_plugin.as_deref(), Some("config-raa"));
        assert_eq!(settings.plugin_timeout, Duration::from_secs(5));
        assert_eq!(settings.custom_risk_rules_plugins, vec!["config-rule", "flag-rule"]);
    }

    #[test]
    fn defaults_without_config() {
        let settings = Settings::merge(Config::default(), &args(&["threatscry", "analyze", "-m", "m.yaml"]));
        assert_eq!(settings.output, PathBuf::from("threatscry-output"));
        assert!(settings.options.skip_risk_rules.is_empty());
        assert!(!settings.options.ignore_orphaned_risk_tracking);
        assert_eq!(settings.plugin_timeout, DEFAULT_TIMEOUT);
    }
}
