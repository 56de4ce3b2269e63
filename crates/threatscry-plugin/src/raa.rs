//! Relative attacker attractiveness.
//!
//! Every technical asset gets a score in percent relative to the most and
//! least attractive asset of the model. Rules read it from
//! `TechnicalAsset::raa` to decide how much an unguarded path matters.

use std::collections::BTreeMap;

use threatscry_core::model::TechnicalAsset;
use threatscry_core::technology::Technology;
use threatscry_core::types::TechnicalAssetType;
use threatscry_core::ParsedModel;
use tracing::{debug, info};

use crate::contract::RaaResult;
use crate::error::PluginError;
use crate::runner::PluginRunner;

pub const SUMMARY: &str = "For each technical asset the Relative Attacker Attractiveness (RAA) value was \
calculated in percent. The higher the RAA, the more interesting it is for an attacker to compromise the \
asset. The calculation factors in the sensitivity ratings and quantities of the data processed, stored and \
transferred by the asset, as well as its type and technology. Assets that serve as a stepping stone to more \
attractive neighbours are scored higher as well.";

/// Score every technical asset of `model`.
pub fn calculate(model: &ParsedModel) -> RaaResult {
    let raw: BTreeMap<&str, f64> = model
        .technical_assets
        .values()
        .map(|asset| (asset.id.as_str(), attractiveness(model, asset)))
        .collect();
    let scale = Scale::over(raw.values().copied());

    let scores = model
        .technical_assets
        .values()
        .map(|asset| {
            let own = raw[asset.id.as_str()];
            let pivot = if asset.out_of_scope {
                0.0
            } else {
                pivot_bonus(asset, own, &raw, &scale)
            };
            let score = scale.relative(own + pivot).min(100.0);
            debug!(asset = %asset.id, raw = own, pivot, score, "raa");
            (asset.id.clone(), score)
        })
        .collect();

    RaaResult {
        summary: SUMMARY.to_string(),
        scores,
    }
}

fn attractiveness(model: &ParsedModel, asset: &TechnicalAsset) -> f64 {
    if asset.out_of_scope {
        return 0.0;
    }
    let mut score = asset.confidentiality.attractiveness_for_asset()
        + asset.integrity.attractiveness_for_asset()
        + asset.availability.attractiveness_for_asset();

    for data in asset
        .data_assets_processed
        .iter()
        .chain(&asset.data_assets_stored)
        .filter_map(|id| model.data_asset(id))
    {
        let factor = data.quantity.factor();
        score += data.confidentiality.attractiveness_for_processed_or_stored_data() * factor;
        score += data.integrity.attractiveness_for_processed_or_stored_data() * factor;
        score += data.availability.attractiveness_for_processed_or_stored_data();
    }

    for data in asset
        .communication_links
        .iter()
        .flat_map(|link| link.data_assets_sent.iter().chain(&link.data_assets_received))
        .filter_map(|id| model.data_asset(id))
    {
        let factor = data.quantity.factor();
        score += data.confidentiality.attractiveness_for_transferred_data() * factor;
        score += data.integrity.attractiveness_for_transferred_data() * factor;
        score += data.availability.attractiveness_for_transferred_data();
    }

    score * multiplier(asset)
}

fn multiplier(asset: &TechnicalAsset) -> f64 {
    let mut factor = match asset.technology {
        Technology::LoadBalancer | Technology::ReverseProxy => 1.0 / 5.5,
        Technology::Monitoring => 1.0 / 5.0,
        Technology::ContainerPlatform => 5.0,
        Technology::Vault => 2.0,
        Technology::BuildPipeline
        | Technology::SourcecodeRepository
        | Technology::ArtifactRegistry => 2.0,
        Technology::IdentityProvider
        | Technology::IdentityStoreDatabase
        | Technology::IdentityStoreLdap => 2.5,
        _ => 1.0,
    };
    // Identity stores already carry their own boost.
    let identity = matches!(
        asset.technology,
        Technology::IdentityProvider | Technology::IdentityStoreDatabase | Technology::IdentityStoreLdap
    );
    if asset.kind == TechnicalAssetType::Datastore && !identity {
        factor *= 2.0;
    }
    if asset.multi_tenant {
        factor *= 1.5;
    }
    factor
}

/// Bonus for assets that lead to more attractive neighbours: a third of the
/// largest relative gain over the outgoing links.
fn pivot_bonus(asset: &TechnicalAsset, own: f64, raw: &BTreeMap<&str, f64>, scale: &Scale) -> f64 {
    let own_relative = scale.relative(own);
    asset
        .communication_links
        .iter()
        .filter_map(|link| raw.get(link.target_id.as_str()))
        .map(|target| (scale.relative(*target) - own_relative) / 3.0)
        .filter(|gain| *gain > 0.0)
        .fold(0.0, f64::max)
}

struct Scale {
    min: f64,
    spread: f64,
}

impl Scale {
    fn over(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::MAX, f64::MIN), |(min, max), value| {
            (min.min(value), max.max(value))
        });
        if min < max {
            Scale {
                min,
                spread: max - min,
            }
        } else {
            let min = if min == f64::MAX { 0.0 } else { min };
            Scale { min, spread: 1.0 }
        }
    }

    fn relative(&self, value: f64) -> f64 {
        let percent = (value - self.min) / self.spread * 100.0;
        if percent <= 0.0 {
            1.0
        } else {
            percent
        }
    }
}

/// Write `result` into the model. Unknown asset ids and scores outside
/// `0..=100` are rejected before anything is changed.
pub fn apply_scores(model: &mut ParsedModel, result: &RaaResult, plugin: &str) -> Result<(), PluginError> {
    for (asset, score) in &result.scores {
        if !model.technical_assets.contains_key(asset) {
            return Err(PluginError::UnknownAsset {
                plugin: plugin.to_string(),
                asset: asset.clone(),
            });
        }
        if !(0.0..=100.0).contains(score) {
            return Err(PluginError::ScoreOutOfRange {
                plugin: plugin.to_string(),
                asset: asset.clone(),
                score: *score,
            });
        }
    }
    for (asset, score) in &result.scores {
        if let Some(asset) = model.technical_assets.get_mut(asset) {
            asset.raa = *score;
        }
    }
    model.reindex();
    Ok(())
}

/// An RAA calculator running as an external executable.
#[derive(Debug)]
pub struct RaaPlugin {
    runner: PluginRunner,
}

impl RaaPlugin {
    pub fn new(runner: PluginRunner) -> Self {
        RaaPlugin { runner }
    }

    pub fn score(&self, model: &ParsedModel) -> Result<RaaResult, PluginError> {
        let input = serde_json::to_vec(model).map_err(|source| PluginError::Serialize {
            plugin: self.runner.name().to_string(),
            source,
        })?;
        self.runner.call_json(&[], &input)
    }

    /// Score the model and store the result on its technical assets.
    /// Returns the plugin's report text.
    pub fn apply(&self, model: &mut ParsedModel) -> Result<String, PluginError> {
        let result = self.score(model)?;
        apply_scores(model, &result, self.runner.name())?;
        info!(plugin = %self.runner.name(), assets = result.scores.len(), "applied attacker attractiveness");
        Ok(result.summary)
    }
}

#[cfg(test)]
mod tests {
    use threatscry_core::parse_model;

    use super::*;

    const MODEL: &str = r#"
title: RAA
date: 2024-01-01
business_criticality: important
data_assets:
  Customers:
    id: customers
    usage: business
    quantity: very-many
    confidentiality: strictly-confidential
    integrity: critical
    availability: important
technical_assets:
  Proxy:
    id: proxy
    type: process
    usage: business
    size: system
    technology: reverse-proxy
    machine: virtual
    encryption: none
    confidentiality: internal
    integrity: operational
    availability: important
    communication_links:
      Forward:
        target: shop
        protocol: https
        authentication: none
        authorization: none
        usage: business
  Shop:
    id: shop
    type: process
    usage: business
    size: application
    technology: web-application
    machine: container
    encryption: none
    confidentiality: confidential
    integrity: critical
    availability: important
    data_assets_processed: [customers]
    communication_links:
      Query:
        target: db
        protocol: jdbc-encrypted
        authentication: credentials
        authorization: technical-user
        usage: business
        data_assets_sent: [customers]
  Database:
    id: db
    type: datastore
    usage: business
    size: component
    technology: database
    machine: virtual
    encryption: transparent
    confidentiality: strictly-confidential
    integrity: critical
    availability: important
    data_assets_stored: [customers]
  Legacy:
    id: legacy
    type: process
    usage: business
    size: system
    technology: mainframe
    machine: physical
    out_of_scope: true
    justification_out_of_scope: decommissioned next quarter
    encryption: none
    confidentiality: strictly-confidential
    integrity: mission-critical
    availability: mission-critical
"#;

    #[test]
    fn datastore_is_most_attractive_and_scores_stay_in_range() {
        let model = parse_model(MODEL).unwrap();
        let result = calculate(&model);
        assert_eq!(result.scores.len(), 4);
        assert_eq!(result.scores["db"], 100.0);
        assert!(result.scores.values().all(|score| (0.0..=100.0).contains(score)));
        assert!(result.scores["shop"] > result.scores["proxy"]);
        assert!(result.summary.contains("Relative Attacker Attractiveness"));
    }

    #[test]
    fn out_of_scope_asset_gets_the_floor() {
        let model = parse_model(MODEL).unwrap();
        let result = calculate(&model);
        assert_eq!(result.scores["legacy"], 1.0);
    }

    #[test]
    fn proxy_profits_from_its_more_attractive_target() {
        let mut model = parse_model(MODEL).unwrap();
        let with_link = calculate(&model).scores["proxy"];
        if let Some(proxy) = model.technical_assets.get_mut("proxy") {
            proxy.communication_links.clear();
        }
        model.reindex();
        let without_link = calculate(&model).scores["proxy"];
        assert!(with_link > without_link);
    }

    #[test]
    fn datastore_boost_stacks_with_technology_factor() {
        let mut model = parse_model(MODEL).unwrap();
        let db = model.technical_assets.get_mut("db").unwrap();
        assert_eq!(multiplier(db), 2.0);

        db.technology = Technology::Vault;
        assert_eq!(multiplier(db), 4.0);

        db.technology = Technology::IdentityStoreDatabase;
        assert_eq!(multiplier(db), 2.5);

        db.technology = Technology::ReverseProxy;
        db.multi_tenant = true;
        assert!((multiplier(db) - 2.0 / 5.5 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn scores_are_written_to_the_assets() {
        let mut model = parse_model(MODEL).unwrap();
        let result = calculate(&model);
        apply_scores(&mut model, &result, "builtin").unwrap();
        assert_eq!(model.technical_asset("db").map(|asset| asset.raa), Some(100.0));
        assert_eq!(
            model.communication_link("shop>query").map(|link| link.target_id.as_str()),
            Some("db")
        );
    }

    #[test]
    fn invalid_scores_leave_the_model_untouched() {
        let mut model = parse_model(MODEL).unwrap();
        let mut result = RaaResult::default();
        result.scores.insert("shop".to_string(), 40.0);
        result.scores.insert("ghost".to_string(), 10.0);
        let err = apply_scores(&mut model, &result, "custom").unwrap_err();
        assert!(matches!(err, PluginError::UnknownAsset { ref asset, .. } if asset == "ghost"));
        assert_eq!(model.technical_asset("shop").map(|asset| asset.raa), Some(0.0));

        let mut result = RaaResult::default();
        result.scores.insert("shop".to_string(), 140.0);
        let err = apply_scores(&mut model, &result, "custom").unwrap_err();
        assert!(matches!(err, PluginError::ScoreOutOfRange { score, .. } if score == 140.0));
    }
}
