//! Types identifying regulatory classes of vehicle.
//!
//! The pipeline is keyed on two granularities: a [`VehicleKey`] identifies a class of vehicle for
//! population and activity purposes, while an [`EngineKey`] (regulatory class plus fuel type)
//! identifies the granularity at which manufacturing cost and warranty/useful-life provisions
//! attach, because those are shared across source types using the same engine.
use crate::id::define_id_type;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt::Display;

define_id_type! {OptionID}
define_id_type! {SourceTypeID}
define_id_type! {RegClassID}

/// A map of [`RegulatoryOption`]s, keyed by option ID
pub type OptionMap = IndexMap<OptionID, RegulatoryOption>;

/// A regulatory option under analysis
#[derive(Debug, Deserialize, PartialEq)]
pub struct RegulatoryOption {
    /// A unique identifier for the option (e.g. "proposal")
    pub id: OptionID,
    /// A human-readable description (e.g. "Proposed 2027 standards")
    pub description: String,
    /// Whether this option is the no-action baseline or a regulatory action
    pub kind: OptionKind,
}

/// Whether an option is the no-action baseline or a regulatory action
#[derive(Clone, Copy, PartialEq, Debug, DeserializeLabeledStringEnum, SerializeLabeledStringEnum)]
pub enum OptionKind {
    /// The no-action baseline against which actions are compared
    #[string = "no-action"]
    NoAction,
    /// A regulatory action option
    #[string = "action"]
    Action,
}

/// The fuel a vehicle runs on.
///
/// This is a closed set rather than an ID because component applicability is keyed on it: DEF
/// consumption applies to diesel vehicles only and the ORVR fuel-gallons adjustment to gasoline
/// vehicles only.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum FuelType {
    /// Diesel-fuelled; consumes DEF
    #[string = "diesel"]
    Diesel,
    /// Gasoline-fuelled; subject to the ORVR adjustment
    #[string = "gasoline"]
    Gasoline,
    /// Compressed natural gas
    #[string = "cng"]
    Cng,
}

/// Identifies a regulatory class of vehicle within one option
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VehicleKey {
    /// The regulatory option this vehicle belongs to
    pub option: OptionID,
    /// The source type (e.g. "long-haul")
    pub source_type: SourceTypeID,
    /// The regulatory class (e.g. "HHD8")
    pub reg_class: RegClassID,
    /// The fuel type
    pub fuel_type: FuelType,
}

impl VehicleKey {
    /// The engine-level key for this vehicle
    pub fn engine(&self) -> EngineKey {
        EngineKey {
            reg_class: self.reg_class.clone(),
            fuel_type: self.fuel_type,
        }
    }

    /// The same vehicle under a different regulatory option
    pub fn with_option(&self, option: &OptionID) -> VehicleKey {
        VehicleKey {
            option: option.clone(),
            ..self.clone()
        }
    }
}

impl Display for VehicleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.option, self.source_type, self.reg_class, self.fuel_type
        )
    }
}

/// Identifies a regulatory class/engine: the granularity at which manufacturing cost and
/// warranty/useful-life provisions attach
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EngineKey {
    /// The regulatory class
    pub reg_class: RegClassID,
    /// The fuel type
    pub fuel_type: FuelType,
}

impl Display for EngineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reg_class, self.fuel_type)
    }
}
