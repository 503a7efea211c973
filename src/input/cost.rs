//! Code for reading the direct cost package table from a CSV file.
//!
//! The table holds one row per technology line item; line items are summed into a single package
//! cost per (option, engine, cost step). The seed volume factor is a property of the package, so
//! it must agree across a package's line items.
use crate::direct_cost::{CostPackage, DirectCostInputs};
use crate::input::read_vec_from_csv;
use crate::vehicle::{EngineKey, FuelType, OptionID, OptionMap, RegClassID};
use crate::year::ModelYear;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const DIRECT_COSTS_FILE_NAME: &str = "direct_costs.csv";

/// A technology line item retrieved from the direct costs CSV file
#[derive(PartialEq, Debug, Deserialize)]
struct DirectCostRaw {
    option_id: OptionID,
    reg_class_id: RegClassID,
    fuel_type: FuelType,
    cost_step: ModelYear,
    technology: String,
    cost_per_veh: f64,
    seed_volume_factor: f64,
}

/// Read direct cost packages from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `options` - The declared regulatory options
///
/// # Returns
///
/// Package costs keyed by (option, engine, cost step), or an error.
pub fn read_direct_costs(model_dir: &Path, options: &OptionMap) -> Result<DirectCostInputs> {
    let file_path = model_dir.join(DIRECT_COSTS_FILE_NAME);
    let line_items = read_vec_from_csv::<DirectCostRaw>(&file_path)?;
    read_direct_costs_from_iter(line_items.into_iter(), options)
}

fn read_direct_costs_from_iter<I>(iter: I, options: &OptionMap) -> Result<DirectCostInputs>
where
    I: Iterator<Item = DirectCostRaw>,
{
    let mut inputs = DirectCostInputs::new();
    for line_item in iter {
        ensure!(
            options.contains_key(&line_item.option_id),
            "Unknown option ID {} in direct cost inputs",
            line_item.option_id
        );

        let engine = EngineKey {
            reg_class: line_item.reg_class_id,
            fuel_type: line_item.fuel_type,
        };
        let key = (line_item.option_id, engine, line_item.cost_step);
        let package = inputs.entry(key).or_insert(CostPackage {
            pkg_cost: 0.0,
            seed_volume_factor: line_item.seed_volume_factor,
        });
        ensure!(
            package.seed_volume_factor == line_item.seed_volume_factor,
            "Inconsistent seed volume factor for technology {} at cost step {}",
            line_item.technology,
            line_item.cost_step
        );
        package.pkg_cost += line_item.cost_per_veh;
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::options;

    fn line_item(option: &str, step: u32, technology: &str, cost: f64) -> DirectCostRaw {
        DirectCostRaw {
            option_id: option.into(),
            reg_class_id: "HHD8".into(),
            fuel_type: FuelType::Diesel,
            cost_step: ModelYear(step),
            technology: technology.to_string(),
            cost_per_veh: cost,
            seed_volume_factor: 0.1,
        }
    }

    #[test]
    fn test_line_items_summed_per_package() {
        let items = [
            line_item("proposal", 2027, "closed crankcase", 400.0),
            line_item("proposal", 2027, "cylinder deactivation", 600.0),
            line_item("proposal", 2028, "larger catalyst", 250.0),
        ];
        let inputs = read_direct_costs_from_iter(items.into_iter(), &options()).unwrap();
        assert_eq!(inputs.len(), 2);

        let engine = EngineKey {
            reg_class: "HHD8".into(),
            fuel_type: FuelType::Diesel,
        };
        let package = &inputs[&("proposal".into(), engine, ModelYear(2027))];
        assert_eq!(package.pkg_cost, 1000.0);
        assert_eq!(package.seed_volume_factor, 0.1);
    }

    #[test]
    fn test_inconsistent_seed_volume_factor_is_error() {
        let mut second = line_item("proposal", 2027, "cylinder deactivation", 600.0);
        second.seed_volume_factor = 0.2;
        let items = [line_item("proposal", 2027, "closed crankcase", 400.0), second];
        assert!(read_direct_costs_from_iter(items.into_iter(), &options()).is_err());
    }

    #[test]
    fn test_unknown_option_is_error() {
        let items = [line_item("final-rule", 2027, "closed crankcase", 400.0)];
        assert!(read_direct_costs_from_iter(items.into_iter(), &options()).is_err());
    }
}
