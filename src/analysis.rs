//! The staged analysis pipeline.
//!
//! Stages run strictly in order on the in-memory record table: fleet seeding, direct costs,
//! indirect costs, operating costs (DEF, fuel, repair), emission damages, discounting, and
//! finally option deltas and summaries. Component caches live for exactly one run.
use crate::def_cost::DefCostModel;
use crate::delta::{self, SummaryRow};
use crate::direct_cost::DirectCostModel;
use crate::finance;
use crate::fleet::{FleetRecord, Pollutant};
use crate::fuel_cost::FuelCostModel;
use crate::markup::IndirectCostModel;
use crate::model::Model;
use crate::records::{CostRecords, RecordKey, metric};
use crate::repair::{EstimatedAge, EstimatedAgeKey, RepairCostModel};
use crate::utils::safe_div;
use crate::vehicle::{EngineKey, FuelType, OptionID};
use crate::year::{Age, ModelYear};
use anyhow::{Result, ensure};
use log::info;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// The complete result of one analysis run
pub struct AnalysisOutput {
    /// Absolute cost records, nominal and discounted
    pub records: CostRecords,
    /// Delta records for each action option against the no-action baseline
    pub deltas: CostRecords,
    /// The annual summary table
    pub summary: Vec<SummaryRow>,
    /// The derived warranty/useful-life estimated-age records
    pub estimated_ages: HashMap<EstimatedAgeKey, EstimatedAge>,
}

/// Run the analysis pipeline over a loaded model.
///
/// # Arguments
///
/// * `model` - The model to analyse
pub fn run(model: &Model) -> Result<AnalysisOutput> {
    let mut records = CostRecords::new();
    seed_inventory(&mut records, model);
    info!("Seeded {} records from the fleet projection", records.len());

    let mut direct = DirectCostModel::new(
        &model.direct_cost_inputs,
        model.parameters.learning.rate,
        model.baseline.clone(),
    );
    apply_direct_costs(model, &mut direct, &mut records)?;
    info!("Computed learning-curve direct costs");

    let mut markups = IndirectCostModel::new(
        &model.markup_inputs,
        &model.provision_schedule,
        model.parameters.markups.base_year,
    );
    apply_indirect_costs(model, &mut markups, &mut records)?;
    info!("Applied indirect cost markups");

    let mut repair = RepairCostModel::new(
        &model.repair_params,
        &model.provision_schedule,
        model.parameters.repair.typical_vmt_age_threshold,
    );
    apply_def_costs(model, &mut records)?;
    apply_fuel_costs(model, &mut records)?;
    apply_repair_costs(model, &mut repair, &mut direct, &mut records)?;
    info!("Computed DEF, fuel and emission-repair operating costs");

    apply_damage_costs(model, &mut records)?;
    accumulate_cost_totals(&mut records);

    let rates = model.social_rates();
    let discounting = &model.parameters.discounting;
    finance::discount_records(
        &mut records,
        &rates,
        discounting.cost_accrual,
        discounting.discount_to_year,
    )?;
    info!("Discounted records at {} and {}", rates[0], rates[1]);

    let deltas = delta::compute_option_deltas(&records, &model.baseline)?;
    let summary = delta::summarise(
        &records,
        &deltas,
        &model.baseline,
        discounting.cost_accrual,
        discounting.discount_to_year,
    );
    info!("Computed option deltas and summary tables");

    Ok(AnalysisOutput {
        records,
        deltas,
        summary,
        estimated_ages: repair.estimated_ages().clone(),
    })
}

/// The nominal record key for a fleet record
fn nominal_key(record: &FleetRecord) -> RecordKey {
    RecordKey::nominal(record.vehicle(), record.model_year, record.age)
}

/// Seed the record table with population, activity and inventory metrics
fn seed_inventory(records: &mut CostRecords, model: &Model) {
    for record in model.fleet.iter() {
        let key = nominal_key(record);
        records.set(&key, metric::VPOP.into(), record.vpop);
        records.set(&key, metric::VMT.into(), record.vmt);
        records.set(&key, metric::GALLONS.into(), record.gallons);
        for pollutant in Pollutant::iter() {
            records.set(&key, metric::tons(pollutant), record.tons(pollutant));
        }
    }
}

/// Compute per-vehicle and total direct costs for every sales-year (age 0) record
fn apply_direct_costs(
    model: &Model,
    direct: &mut DirectCostModel,
    records: &mut CostRecords,
) -> Result<()> {
    for record in model.fleet.iter() {
        if record.age != Age(0) {
            continue;
        }
        let per_vehicle = direct.per_vehicle_cost(
            &model.fleet,
            &record.option_id,
            &record.vehicle().engine(),
            record.model_year,
        )?;

        let key = nominal_key(record);
        records.set(&key, metric::avg_per_veh(metric::DIRECT_COST), per_vehicle);
        records.set(&key, metric::DIRECT_COST.into(), per_vehicle * record.vpop);
    }

    Ok(())
}

/// Compute indirect and tech costs for every sales-year record.
///
/// Tech cost is only defined at age 0: the sale-year cost is not re-derived as the vehicle ages.
fn apply_indirect_costs(
    model: &Model,
    markups: &mut IndirectCostModel,
    records: &mut CostRecords,
) -> Result<()> {
    for record in model.fleet.iter() {
        if record.age != Age(0) {
            continue;
        }
        let key = nominal_key(record);
        let direct_per_vehicle = records.value(&key, "DirectCost_AvgPerVeh")?;
        let indirect =
            markups.per_vehicle_cost(&record.vehicle().engine(), record.model_year, direct_per_vehicle)?;

        for (factor, value) in &indirect.by_factor {
            let name = format!("{}_{factor}", metric::INDIRECT_COST);
            records.set(&key, metric::avg_per_veh(&name), *value);
            records.set(&key, name.into(), value * record.vpop);
        }
        records.set(
            &key,
            metric::avg_per_veh(metric::INDIRECT_COST),
            indirect.total,
        );
        records.set(
            &key,
            metric::INDIRECT_COST.into(),
            indirect.total * record.vpop,
        );

        let tech_per_vehicle = direct_per_vehicle + indirect.total;
        records.set(&key, metric::avg_per_veh(metric::TECH_COST), tech_per_vehicle);
        records.set(&key, metric::TECH_COST.into(), tech_per_vehicle * record.vpop);
    }

    Ok(())
}

/// Compute DEF consumption and cost for diesel records at every age
fn apply_def_costs(model: &Model, records: &mut CostRecords) -> Result<()> {
    let def = DefCostModel::new(
        &model.def_inputs,
        model.parameters.def.gallons_per_ton_nox_reduction,
    );

    for record in model.fleet.iter() {
        if record.fuel_type != FuelType::Diesel {
            continue;
        }

        let nox_reduction = if record.option_id == model.baseline {
            0.0
        } else {
            let no_action = model.fleet.no_action_counterpart(record, &model.baseline)?;
            no_action.tons(Pollutant::Nox) - record.tons(Pollutant::Nox)
        };

        let doserate = def.base_doserate(&record.reg_class_id, record.model_year)?;
        let gallons = def.gallons(record.gallons, doserate, nox_reduction);
        let cost = def.price(record.calendar_year)? * gallons;

        let key = nominal_key(record);
        records.set(&key, metric::DEF_GALLONS.into(), gallons);
        records.set(&key, metric::DEF_COST.into(), cost);
        records.set(
            &key,
            metric::avg_per_veh(metric::DEF_COST),
            safe_div(cost, record.vpop),
        );
        records.set(
            &key,
            metric::avg_per_mile(metric::DEF_COST),
            safe_div(cost, record.vmt),
        );
    }

    Ok(())
}

/// Compute retail and pre-tax fuel costs at every age.
///
/// Retail drives the owner-facing averages; the pre-tax series feeds program totals.
fn apply_fuel_costs(model: &Model, records: &mut CostRecords) -> Result<()> {
    let fuel = FuelCostModel::new(&model.fuel_prices, model.parameters.fuel.orvr_ml_per_gram);

    for record in model.fleet.iter() {
        let thc_reduction =
            if record.fuel_type == FuelType::Gasoline && record.option_id != model.baseline {
                let no_action = model.fleet.no_action_counterpart(record, &model.baseline)?;
                no_action.tons(Pollutant::Thc) - record.tons(Pollutant::Thc)
            } else {
                0.0
            };

        let costs = fuel.costs(
            record.fuel_type,
            record.calendar_year,
            record.gallons,
            thc_reduction,
        )?;

        let key = nominal_key(record);
        records.set(&key, metric::GALLONS_PAID_FOR.into(), costs.gallons_paid_for);
        records.set(&key, metric::FUEL_COST_RETAIL.into(), costs.retail);
        records.set(&key, metric::FUEL_COST_PRETAX.into(), costs.pretax);
        records.set(
            &key,
            metric::avg_per_veh(metric::FUEL_COST_RETAIL),
            safe_div(costs.retail, record.vpop),
        );
        records.set(
            &key,
            metric::avg_per_mile(metric::FUEL_COST_RETAIL),
            safe_div(costs.retail, record.vmt),
        );
    }

    Ok(())
}

/// Compute emission-repair costs at every age
fn apply_repair_costs(
    model: &Model,
    repair: &mut RepairCostModel,
    direct: &mut DirectCostModel,
    records: &mut CostRecords,
) -> Result<()> {
    let reference_engine = EngineKey {
        reg_class: model.repair_params.reference_reg_class.clone(),
        fuel_type: model.repair_params.reference_fuel_type,
    };

    // Direct-cost scalers are shared by all ages of a (option, engine, model year) unit
    let mut scalers: HashMap<(OptionID, EngineKey, ModelYear), f64> = HashMap::new();
    for record in model.fleet.iter() {
        let engine = record.vehicle().engine();
        let scaler_key = (record.option_id.clone(), engine.clone(), record.model_year);
        let scaler = match scalers.get(&scaler_key) {
            Some(&scaler) => scaler,
            None => {
                let own = direct.per_vehicle_cost(
                    &model.fleet,
                    &record.option_id,
                    &engine,
                    record.model_year,
                )?;
                let reference = direct.per_vehicle_cost(
                    &model.fleet,
                    &record.option_id,
                    &reference_engine,
                    record.model_year,
                )?;
                ensure!(
                    reference != 0.0,
                    "Reference vehicle {reference_engine} has zero direct cost in MY {}",
                    record.model_year
                );
                let scaler = own / reference;
                scalers.insert(scaler_key, scaler);
                scaler
            }
        };

        let cost_per_mile = repair.cost_per_mile(
            &model.fleet,
            &record.vehicle(),
            record.model_year,
            record.age,
            scaler,
        )?;
        let per_vehicle = cost_per_mile * safe_div(record.vmt, record.vpop);

        let key = nominal_key(record);
        records.set(&key, metric::avg_per_mile(metric::REPAIR_COST), cost_per_mile);
        records.set(&key, metric::avg_per_veh(metric::REPAIR_COST), per_vehicle);
        records.set(&key, metric::REPAIR_COST.into(), per_vehicle * record.vpop);
    }

    Ok(())
}

/// Value pollutant inventories with the configured damage valuations
fn apply_damage_costs(model: &Model, records: &mut CostRecords) -> Result<()> {
    for record in model.fleet.iter() {
        let key = nominal_key(record);
        for (pollutant, criteria_rate) in model.damage_inputs.valuations() {
            let cost_per_ton =
                model
                    .damage_inputs
                    .cost_per_ton(pollutant, criteria_rate, record.calendar_year)?;
            records.set(
                &key,
                metric::damage_cost(pollutant, criteria_rate),
                record.tons(pollutant) * cost_per_ton,
            );
        }
    }

    Ok(())
}

/// Roll up operating and total cost metrics on every record.
///
/// Program totals use the pre-tax fuel series; the retail series is owner-facing only.
fn accumulate_cost_totals(records: &mut CostRecords) {
    for (_, bag) in records.iter_mut() {
        let def = bag.get(metric::DEF_COST).copied().unwrap_or(0.0);
        let fuel = bag.get(metric::FUEL_COST_PRETAX).copied().unwrap_or(0.0);
        let repair = bag.get(metric::REPAIR_COST).copied().unwrap_or(0.0);
        let tech = bag.get(metric::TECH_COST).copied().unwrap_or(0.0);

        let operating = def + fuel + repair;
        bag.insert(metric::OPERATING_COST.into(), operating);
        bag.insert(metric::TOTAL_COST.into(), tech + operating);
    }
}
