//! Common types used across the engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Time-of-use period of an access tariff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::P1,
        Period::P2,
        Period::P3,
        Period::P4,
        Period::P5,
        Period::P6,
    ];
}

/// One optional value per period (energy in kWh, power in kW, or a price)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p4: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p5: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p6: Option<f64>,
}

impl PeriodValues {
    pub fn get(&self, period: Period) -> Option<f64> {
        match period {
            Period::P1 => self.p1,
            Period::P2 => self.p2,
            Period::P3 => self.p3,
            Period::P4 => self.p4,
            Period::P5 => self.p5,
            Period::P6 => self.p6,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Period, Option<f64>)> + '_ {
        Period::ALL.into_iter().map(move |period| (period, self.get(period)))
    }

    /// Largest present value, 0 when every period is absent
    pub fn max(&self) -> f64 {
        self.iter()
            .filter_map(|(_, value)| value)
            .fold(0.0, f64::max)
    }

    /// Sum of the present values
    pub fn sum(&self) -> f64 {
        self.iter().filter_map(|(_, value)| value).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, value)| value.is_none())
    }
}

/// Metered consumption and contracted power of one client supply point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionProfile {
    /// Free-form client or supply point label
    #[serde(default)]
    pub label: Option<String>,
    /// Annual energy consumption in kWh
    pub annual_consumption_kwh: f64,
    /// Consumed energy per period in kWh
    #[serde(default)]
    pub energy_kwh: PeriodValues,
    /// Contracted power per period in kW
    #[serde(default)]
    pub power_kw: PeriodValues,
    /// Access tariff code, e.g. "2.0TD"
    pub access_tariff: String,
    /// Current bill total, the baseline for savings
    pub current_bill: f64,
}

/// Fees supplied by the caller at calculation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeOverrides {
    /// Energy fee in €/kWh
    #[serde(default)]
    pub energy: Option<f64>,
    /// Power fee in €/kW
    #[serde(default)]
    pub power: Option<f64>,
}

impl FeeOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    /// Fees set in `updates` replace these; unset ones are kept
    pub fn updated_with(self, updates: &FeeOverrides) -> Self {
        Self {
            energy: updates.energy.or(self.energy),
            power: updates.power.or(self.power),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retailer {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Fixed,
    Indexed,
    Hybrid,
}

/// Metric a tariff's eligibility range is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeType {
    /// Annual energy consumption (kWh)
    #[serde(rename = "E")]
    Energy,
    /// Maximum contracted power across periods (kW)
    #[serde(rename = "P")]
    Power,
}

/// Eligibility range; `to == None` is unbounded above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRange {
    #[serde(rename = "type")]
    pub range_type: RangeType,
    pub from: f64,
    #[serde(default)]
    pub to: Option<f64>,
}

/// Percentage discounts on the energy and power terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Discounts {
    #[serde(default)]
    pub energy_percent: Option<f64>,
    #[serde(default)]
    pub power_percent: Option<f64>,
}

/// Fee built into a catalog offer, each amount with its own clamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltInFee {
    /// Whether the catalog row declares a fee at all
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub energy_min: Option<f64>,
    #[serde(default)]
    pub energy_max: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub power_min: Option<f64>,
    #[serde(default)]
    pub power_max: Option<f64>,
}

/// A tariff offer from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffOffer {
    pub id: i64,
    pub retailer_id: i64,
    pub name: String,
    pub access_tariff: String,
    pub offer_type: OfferType,
    /// Energy prices in €/kWh
    #[serde(default)]
    pub energy_price: PeriodValues,
    /// Power prices in €/kW·year
    #[serde(default)]
    pub power_price: PeriodValues,
    #[serde(default)]
    pub discounts: Discounts,
    /// Flat management fee added to the base amount
    #[serde(default)]
    pub management_fee: Option<f64>,
    #[serde(default)]
    pub fee: BuiltInFee,
    pub range: EligibilityRange,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool { true }

/// Projected bill of one tariff for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub tariff_id: i64,
    pub retailer_id: i64,
    pub offer_name: String,
    pub energy_cost: f64,
    pub power_cost: f64,
    pub management_fee: f64,
    pub base_amount: f64,
    pub electricity_tax: f64,
    pub vat: f64,
    pub total: f64,
    /// Current bill minus total; negative when the offer is more expensive
    pub savings: f64,
    /// Clamped energy fee actually applied, if any
    pub applied_energy_fee: Option<f64>,
    /// Clamped power fee actually applied, if any
    pub applied_power_fee: Option<f64>,
    /// Attached by the comparison when a consultant is known
    #[serde(default)]
    pub commission: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub profile_id: Option<i64>,
}

/// Which request attributes a commission rule matches on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleScope {
    /// A retailer's named offer, optionally restricted to one access tariff
    Offer {
        retailer_id: i64,
        offer_name: String,
        #[serde(default)]
        access_tariff: Option<String>,
    },
    AccessTariff {
        access_tariff: String,
    },
    Retailer {
        retailer_id: i64,
    },
}

/// Shares of the applied fees paid out by a fee-based rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeShare {
    #[serde(default)]
    pub energy_percent: Option<f64>,
    #[serde(default)]
    pub power_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub scope: RuleScope,
    pub percentage: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Present when the rule pays a share of the fees instead of the bill
    #[serde(default)]
    pub fee_share: Option<FeeShare>,
}

/// Commercial profile a consultant is assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialProfile {
    pub id: i64,
    pub name: String,
    /// Percentage applied when no rule matches
    pub default_percentage: f64,
    #[serde(default)]
    pub rules: Vec<CommissionRule>,
}

/// One version of the system-wide base commission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalCommission {
    #[serde(default)]
    pub id: Option<i64>,
    pub percentage: f64,
    pub activated_on: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Rule level a commission was resolved at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    #[serde(rename = "offer")]
    Offer,
    #[serde(rename = "tariff")]
    Tariff,
    #[serde(rename = "comercializadora")]
    Retailer,
    #[serde(rename = "total")]
    ProfileDefault,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Offer => "offer",
            MatchKind::Tariff => "tariff",
            MatchKind::Retailer => "comercializadora",
            MatchKind::ProfileDefault => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "offer" => Some(MatchKind::Offer),
            "tariff" => Some(MatchKind::Tariff),
            "comercializadora" => Some(MatchKind::Retailer),
            "total" => Some(MatchKind::ProfileDefault),
            _ => None,
        }
    }
}

/// Inputs of the fee-based commission formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeInputs {
    /// Sum of contracted power across all periods (kW)
    pub contracted_power_sum: f64,
    /// Power fee in €/kW
    pub power_fee: f64,
    /// Annual consumption (kWh)
    pub annual_consumption: f64,
    /// Energy fee in €/kWh
    pub energy_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRequest {
    pub retailer_id: i64,
    pub offer_name: String,
    pub access_tariff: String,
    pub annual_bill: f64,
    #[serde(default)]
    pub fee_inputs: Option<FeeInputs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionResult {
    pub kind: MatchKind,
    /// Percentage of the matched rule (or profile default)
    pub percentage: f64,
    /// Principal commission percentage in force
    pub principal_percentage: f64,
    pub amount: f64,
    pub fee_based: bool,
    pub explanation: String,
}
