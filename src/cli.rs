// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Printing the tap protocol of a mode
//! - Listing catalog products
//! - Replaying recorded scenarios through the full pipeline

use std::path::{Path, PathBuf};
use will_it_fit::catalog::{self, Product};
use will_it_fit::measurement::{Dimension, PartialMeasurement};
use will_it_fit::sensing::Scenario;
use will_it_fit::session::{self, SamplingState};
use will_it_fit::{AppResult, Config, MeasurementMode, ProtocolStep};

/// Config from an explicit path, or the default location
pub fn load_config(path: Option<&Path>) -> AppResult<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    Ok(config)
}

fn products_for(config: &Config, catalog: Option<PathBuf>) -> Vec<Product> {
    let path = catalog.or_else(|| config.catalog_path.clone());
    catalog::load_or_default(path.as_deref())
}

/// Print the ordered steps of a mode
pub fn print_steps(mode: MeasurementMode) -> AppResult<()> {
    println!("{}:", mode.display_name());
    println!();

    let steps = ProtocolStep::steps(mode);
    if steps.is_empty() {
        println!("  No taps needed, place the product model directly.");
        return Ok(());
    }

    for (index, step) in steps.iter().enumerate() {
        let surface = if step.requires_plane() {
            " (needs detected plane)"
        } else {
            ""
        };
        println!("  {}. {}{}", index + 1, step.instruction(), surface);
    }

    Ok(())
}

/// List catalog products
pub fn list_products(config: &Config, catalog: Option<PathBuf>) -> AppResult<()> {
    let products = products_for(config, catalog);

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    println!("Available products:");
    println!();
    for product in &products {
        let mut flags = Vec::new();
        if product.allow_rotate {
            flags.push("rotatable");
        }
        if product.can_mount_on_wall() {
            flags.push("wall mount");
        }

        println!("  [{}] {}", product.id, product.name);
        if flags.is_empty() {
            println!("      {}, {}", product.category, product.dimensions_text());
        } else {
            println!(
                "      {}, {} ({})",
                product.category,
                product.dimensions_text(),
                flags.join(", ")
            );
        }
    }

    Ok(())
}

/// Replay a scenario file and print each tap and the verdict
pub fn replay(
    config: &Config,
    scenario_path: &Path,
    product_id: Option<String>,
    catalog: Option<PathBuf>,
) -> AppResult<()> {
    let scenario = Scenario::load(scenario_path)?;
    if scenario.taps.is_empty() && !ProtocolStep::steps(scenario.mode).is_empty() {
        return Err("Scenario has no taps".into());
    }
    let products = products_for(config, catalog);

    let product = match product_id.or_else(|| scenario.product.clone()) {
        Some(id) => Some(catalog::find_product(&products, &id)?.clone()),
        None => None,
    };

    println!(
        "Replaying {} ({}, {} taps)",
        scenario_path.display(),
        scenario.mode.display_name(),
        scenario.taps.len()
    );
    if let Some(product) = &product {
        println!("Product: {} ({})", product.name, product.dimensions_text());
    }
    println!();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let report = runtime.block_on(session::replay_scenario(&scenario, product, config));

    for (index, tap) in report.taps.iter().enumerate() {
        let outcome = match &tap.result {
            Err(e) => format!("refused: {}", e),
            Ok(snapshot) => match (&snapshot.sampling, &snapshot.flow.consistency_error) {
                (SamplingState::Failed(reason), _) => format!("failed: {}", reason),
                (_, Some(error)) => format!("rejected: {}", error),
                _ => "ok".to_string(),
            },
        };
        println!("  {}. {} ... {}", index + 1, tap.step.instruction(), outcome);
    }
    println!();

    let state = &report.final_state;
    print_measurement(&state.flow.measurement);

    match &state.verdict {
        Some(verdict) => {
            println!();
            println!("{}: {}", verdict.title(), verdict.reason());
            if state.rotation_hint {
                println!("Hint: turn the product on its side to get it through.");
            }
        }
        None if state.flow.is_complete => println!("No product selected, no verdict."),
        None => println!("Incomplete: {}", state.instruction),
    }

    Ok(())
}

fn print_measurement(measurement: &PartialMeasurement) {
    let dimensions: &[Dimension] = match measurement {
        PartialMeasurement::Door(_) => &[Dimension::Width, Dimension::Height],
        PartialMeasurement::Space(_) => &[Dimension::Width, Dimension::Depth, Dimension::Height],
        PartialMeasurement::Empty => &[],
    };

    for dimension in dimensions {
        match measurement.get(*dimension) {
            Some(result) => println!(
                "  {:<7} {} {} ({} confidence, {:.0}%)",
                dimension.to_string(),
                result.formatted_value(),
                result.formatted_uncertainty(),
                result.quality.display_name(),
                result.confidence * 100.0
            ),
            None => println!("  {:<7} -", dimension.to_string()),
        }
    }
}

/// Print the effective configuration as JSON
pub fn print_config(config: &Config) -> AppResult<()> {
    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("{}", config.to_json()?);
    Ok(())
}
