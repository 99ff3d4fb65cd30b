//! Tariff eligibility filter
//!
//! A tariff is a candidate for a profile when it is active, shares the
//! profile's access tariff, and the profile's metric falls within the
//! tariff's range. Both bounds are inclusive; a missing upper bound is
//! unbounded.

use crate::core::{ConsumptionProfile, EligibilityRange, RangeType, TariffOffer};

/// Check whether `tariff` may be offered for `profile`
pub fn is_eligible(tariff: &TariffOffer, profile: &ConsumptionProfile) -> bool {
    tariff.active
        && tariff.access_tariff == profile.access_tariff
        && metric_in_range(&tariff.range, metric_for(tariff.range.range_type, profile))
}

/// The profile value a range type is measured against
pub fn metric_for(range_type: RangeType, profile: &ConsumptionProfile) -> f64 {
    match range_type {
        RangeType::Energy => profile.annual_consumption_kwh,
        RangeType::Power => profile.power_kw.max(),
    }
}

pub fn metric_in_range(range: &EligibilityRange, metric: f64) -> bool {
    metric >= range.from && range.to.map_or(true, |to| metric <= to)
}
