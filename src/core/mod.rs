//! Core module - Data records, configuration, and error types

mod config;
mod error;
mod types;

pub use config::{ComparisonConfig, Config, GeneralConfig, StorageConfig};
pub use error::{Error, Result};
pub use types::{
    BuiltInFee, CommercialProfile, CommissionRequest, CommissionResult, CommissionRule,
    ConsumptionProfile, Consultant, CostResult, Discounts, EligibilityRange, FeeInputs,
    FeeOverrides, FeeShare, MatchKind, OfferType, Period, PeriodValues, PrincipalCommission,
    RangeType, Retailer, RuleScope, TariffOffer,
};
