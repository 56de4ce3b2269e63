//! Wire format shared by the engine and plugin executables.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use threatscry_core::{AnalysisContext, ParsedModel, Risk, RiskCategory, RiskRule};

pub const GET_INFO: &str = "--get-info";
pub const GENERATE_RISKS: &str = "--generate-risks";

/// Answer of `<plugin> --get-info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginInfo {
    pub id: String,
    pub category: RiskCategory,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Answer of an RAA plugin: a score per technical asset id plus report text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RaaResult {
    #[serde(default)]
    pub summary: String,
    pub scores: BTreeMap<String, f64>,
}

/// Plugin side of the rule contract: dispatch on the first argument and speak
/// JSON over stdin/stdout. Returns the process exit code.
pub fn serve_rule(rule: &dyn RiskRule, args: &[String]) -> i32 {
    let result = match args.first().map(String::as_str) {
        Some(GET_INFO) => write_info(rule),
        Some(GENERATE_RISKS) => write_risks(rule),
        _ => {
            eprintln!("usage: {GET_INFO} | {GENERATE_RISKS} < model.json");
            return 2;
        }
    };
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn write_info(rule: &dyn RiskRule) -> Result<(), Box<dyn std::error::Error>> {
    let category = rule.category();
    let info = PluginInfo {
        id: category.id.clone(),
        category,
        tags: rule.supported_tags(),
    };
    write_json(&info)
}

fn write_risks(rule: &dyn RiskRule) -> Result<(), Box<dyn std::error::Error>> {
    let model = read_model()?;
    let ctx = AnalysisContext::new(model);
    let risks: Vec<Risk> = rule.generate_risks(&ctx)?;
    write_json(&risks)
}

/// Read the parsed model JSON the engine writes to a plugin's stdin.
pub fn read_model() -> Result<ParsedModel, Box<dyn std::error::Error>> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(ParsedModel::from_json(&text)?)
}

pub fn write_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
