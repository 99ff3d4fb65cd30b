//! Tariff cost calculator
//!
//! Projects the bill of one tariff offer for one consumption profile:
//! - Energy term: per-period kWh x €/kWh, plus the energy fee over the
//!   annual consumption, then the energy discount on that combined amount
//! - Power term: per-period kW x €/kW·year, plus the power fee over the
//!   highest contracted power, then the power discount
//! - Base amount: energy + power + management fee
//! - Electricity tax on the base, VAT on base + tax

use crate::core::{ConsumptionProfile, CostResult, Error, FeeOverrides, PeriodValues, Result, TariffOffer};

/// Spanish electricity tax rate, applied to the base amount
pub const ELECTRICITY_TAX_RATE: f64 = 0.0511269632;

/// VAT rate, applied to base amount plus electricity tax
pub const VAT_RATE: f64 = 0.21;

/// Compute the projected bill of `tariff` for `profile`.
///
/// Fees in `overrides` take precedence over the tariff's built-in fee and
/// apply even when the catalog row declares no fee. The tariff's min/max
/// clamps still bound whichever fee is used.
pub fn compute_cost(
    profile: &ConsumptionProfile,
    tariff: &TariffOffer,
    overrides: &FeeOverrides,
) -> Result<CostResult> {
    if tariff.energy_price.is_empty() && tariff.power_price.is_empty() {
        return Err(Error::InvalidTariff(format!(
            "tariff {} ({}) has no energy or power prices",
            tariff.id, tariff.name
        )));
    }

    let fee = &tariff.fee;

    let energy_fee = overrides
        .energy
        .or(if fee.enabled { fee.energy } else { None })
        .map(|value| clamp(value, fee.energy_min, fee.energy_max));
    let mut energy_cost = period_sum(&profile.energy_kwh, &tariff.energy_price);
    if let Some(energy_fee) = energy_fee {
        energy_cost += profile.annual_consumption_kwh * energy_fee;
    }
    // Discount covers the fee too
    if let Some(discount) = tariff.discounts.energy_percent {
        energy_cost -= energy_cost * discount / 100.0;
    }

    let power_fee = overrides
        .power
        .or(if fee.enabled { fee.power } else { None })
        .map(|value| clamp(value, fee.power_min, fee.power_max));
    let mut power_cost = period_sum(&profile.power_kw, &tariff.power_price);
    if let Some(power_fee) = power_fee {
        power_cost += profile.power_kw.max() * power_fee;
    }
    if let Some(discount) = tariff.discounts.power_percent {
        power_cost -= power_cost * discount / 100.0;
    }

    let management_fee = tariff.management_fee.unwrap_or(0.0);
    let base_amount = energy_cost + power_cost + management_fee;
    let electricity_tax = base_amount * ELECTRICITY_TAX_RATE;
    let vat = (base_amount + electricity_tax) * VAT_RATE;
    let total = base_amount + electricity_tax + vat;

    Ok(CostResult {
        tariff_id: tariff.id,
        retailer_id: tariff.retailer_id,
        offer_name: tariff.name.clone(),
        energy_cost,
        power_cost,
        management_fee,
        base_amount,
        electricity_tax,
        vat,
        total,
        savings: profile.current_bill - total,
        applied_energy_fee: energy_fee,
        applied_power_fee: power_fee,
        commission: None,
    })
}

/// Sum of quantity x price over periods where both are present and the quantity is positive
fn period_sum(quantities: &PeriodValues, prices: &PeriodValues) -> f64 {
    quantities
        .iter()
        .filter_map(|(period, quantity)| match (quantity, prices.get(period)) {
            (Some(quantity), Some(price)) if quantity > 0.0 => Some(quantity * price),
            _ => None,
        })
        .sum()
}

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut value = value;
    if let Some(min) = min {
        value = value.max(min);
    }
    if let Some(max) = max {
        value = value.min(max);
    }
    value
}
