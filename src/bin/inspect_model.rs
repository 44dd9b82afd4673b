//! Utility to inspect model artifacts and print their structure.
//!
//! Usage: `inspect-model [ARTIFACT ...]`. Without arguments every disease
//! artifact under `MODEL_DIR` (default `models`) is inspected. JSON and
//! UBJSON (`.json`, `.ubj`, `.xgb`) models are read; a legacy binary `.xgb`
//! is reported with the `save_model` call that converts it.

use disease_risk_api::disease::Disease;
use disease_risk_api::features::feature_names;
use disease_risk_api::registry::{load_artifact, locate_artifact};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Main entry point for the model inspection utility.
///
/// Exits non-zero if any artifact fails to load.
fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    let targets: Vec<(Option<Disease>, anyhow::Result<PathBuf>)> = if args.is_empty() {
        let model_dir = PathBuf::from(env::var("MODEL_DIR").unwrap_or_else(|_| "models".into()));
        Disease::ALL
            .into_iter()
            .map(|d| (Some(d), locate_artifact(&model_dir, d)))
            .collect()
    } else {
        args.into_iter().map(|p| (None, Ok(p))).collect()
    };

    let mut failures = 0;
    for (disease, path) in targets {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                println!("- {}\n  ! {:#}\n", disease.map(|d| d.slug()).unwrap_or("?"), e);
                failures += 1;
                continue;
            }
        };
        println!("- {}", path.display());
        match load_artifact(&path) {
            Ok((model, sha256)) => {
                println!("  objective: {}", model.objective().name());
                println!(
                    "  trees: {} ({} used for prediction)",
                    model.num_trees(),
                    model.active_trees()
                );
                println!("  features: {}", model.num_features());
                if let Some(version) = model.version() {
                    println!("  written by: xgboost {}", version);
                }
                if !model.feature_names().is_empty() {
                    println!("  feature names: {}", model.feature_names().join(", "));
                }
                if let Some(disease) = disease {
                    let expected = feature_names(disease).len();
                    if expected != model.num_features() {
                        println!(
                            "  ! {} schema has {} features; the service will refuse this model",
                            disease, expected
                        );
                        failures += 1;
                    }
                }
                println!("  sha256: {}", sha256);
            }
            Err(e) => {
                println!("  ! {:#}", e);
                failures += 1;
            }
        }
        println!();
    }

    if failures > 0 {
        anyhow::bail!("{} artifact(s) failed inspection", failures);
    }
    Ok(())
}
