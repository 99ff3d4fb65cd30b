//! Tariff comparison
//!
//! Runs the cost calculator over every eligible catalog tariff for one
//! consumption profile, optionally attaches the consultant's commission to
//! each result, and sorts the results cheapest first. A tariff that fails to
//! price is logged and left out; it never aborts the batch.

use crate::catalog::Catalog;
use crate::commission::CommissionResolver;
use crate::core::{
    CommissionRequest, CommissionResult, ConsumptionProfile, Consultant, CostResult, Error,
    FeeInputs, FeeOverrides, Result, TariffOffer,
};
use crate::db::Database;
use crate::eligibility::is_eligible;
use crate::i18n::I18n;
use crate::pricing::compute_cost;
use serde::{Deserialize, Serialize};

/// A comparison request: who is being compared, and with which fees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub profile: ConsumptionProfile,
    #[serde(default)]
    pub fee_overrides: FeeOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonOptions<'a> {
    /// Attach this consultant's commission to each result
    pub consultant: Option<&'a Consultant>,
    /// Keep only the N cheapest results
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub request: ComparisonRequest,
    /// Results sorted by ascending total
    pub results: Vec<CostResult>,
    pub ineligible: usize,
    pub failed: usize,
}

impl Comparison {
    pub fn cheapest(&self) -> Option<&CostResult> {
        self.results.first()
    }
}

/// Commission resolved for a registered sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleCommission {
    pub consultant_id: i64,
    pub tariff_id: i64,
    pub annual_bill: f64,
    pub commission: CommissionResult,
}

/// Compare every catalog tariff against `request`
pub fn compare(
    request: &ComparisonRequest,
    catalog: &Catalog,
    options: &ComparisonOptions<'_>,
    i18n: &I18n,
) -> Comparison {
    let profile = &request.profile;
    let resolver = CommissionResolver::new(
        &catalog.profiles,
        &catalog.principal_commissions,
        &catalog.retailers,
        i18n,
    );

    let mut ineligible = 0;
    let mut failed = 0;
    let mut results = Vec::new();

    for tariff in &catalog.tariffs {
        if !is_eligible(tariff, profile) {
            log::debug!("Tariff {} ({}) not eligible", tariff.id, tariff.name);
            ineligible += 1;
            continue;
        }

        let mut result = match compute_cost(profile, tariff, &request.fee_overrides) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Skipping tariff {}: {}", tariff.id, e);
                failed += 1;
                continue;
            }
        };

        if let Some(consultant) = options.consultant {
            let commission_request = commission_request(profile, tariff, &result);
            match resolver.resolve(consultant, &commission_request) {
                Ok(commission) => result.commission = Some(commission.amount),
                Err(e) => log::warn!(
                    "Commission unavailable for tariff {} and consultant {}: {}",
                    tariff.id,
                    consultant.id,
                    e
                ),
            }
        }

        results.push(result);
    }

    // Stable: equal totals keep catalog order
    results.sort_by(|a, b| a.total.total_cmp(&b.total));

    if let Some(max) = options.max_results {
        results.truncate(max);
    }

    log::info!(
        "Compared {} tariffs for {}: {} results, {} ineligible, {} failed",
        catalog.tariffs.len(),
        profile.access_tariff,
        results.len(),
        ineligible,
        failed
    );

    Comparison {
        request: request.clone(),
        results,
        ineligible,
        failed,
    }
}

/// Recalculate a stored comparison with `overrides` applied over its stored fees.
///
/// The stored request and results are replaced by the new ones.
pub fn recalculate(
    db: &Database,
    comparison_id: i64,
    overrides: &FeeOverrides,
    catalog: &Catalog,
    options: &ComparisonOptions<'_>,
    i18n: &I18n,
) -> Result<Comparison> {
    let stored = db
        .get_comparison(comparison_id)?
        .ok_or(Error::UnknownComparison(comparison_id))?;

    let mut request = stored.request;
    request.fee_overrides = request.fee_overrides.updated_with(overrides);

    let comparison = compare(&request, catalog, options, i18n);
    db.update_comparison(comparison_id, &comparison)?;

    Ok(comparison)
}

/// Resolve the commission for selling `tariff_id` to the compared client.
///
/// Unlike `compare`, a missing profile or principal commission is an error:
/// the sale cannot be registered without it.
pub fn register_sale(
    request: &ComparisonRequest,
    consultant: &Consultant,
    tariff_id: i64,
    catalog: &Catalog,
    i18n: &I18n,
) -> Result<SaleCommission> {
    let tariff = catalog.tariff(tariff_id).ok_or(Error::UnknownTariff(tariff_id))?;
    let result = compute_cost(&request.profile, tariff, &request.fee_overrides)?;

    let resolver = CommissionResolver::new(
        &catalog.profiles,
        &catalog.principal_commissions,
        &catalog.retailers,
        i18n,
    );
    let commission = resolver.resolve(
        consultant,
        &commission_request(&request.profile, tariff, &result),
    )?;

    log::info!(
        "Sale of tariff {} by consultant {}: commission {:.2} ({})",
        tariff_id,
        consultant.id,
        commission.amount,
        commission.kind.as_str()
    );

    Ok(SaleCommission {
        consultant_id: consultant.id,
        tariff_id,
        annual_bill: result.total,
        commission,
    })
}

/// Commission request for a priced tariff, fee inputs taken from the fees the calculator applied
fn commission_request(
    profile: &ConsumptionProfile,
    tariff: &TariffOffer,
    result: &CostResult,
) -> CommissionRequest {
    let fee_inputs = if result.applied_energy_fee.is_some() || result.applied_power_fee.is_some() {
        Some(FeeInputs {
            contracted_power_sum: profile.power_kw.sum(),
            power_fee: result.applied_power_fee.unwrap_or(0.0),
            annual_consumption: profile.annual_consumption_kwh,
            energy_fee: result.applied_energy_fee.unwrap_or(0.0),
        })
    } else {
        None
    };

    CommissionRequest {
        retailer_id: tariff.retailer_id,
        offer_name: tariff.name.clone(),
        access_tariff: tariff.access_tariff.clone(),
        annual_bill: result.total,
        fee_inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        BuiltInFee, CommercialProfile, CommissionRule, Discounts, EligibilityRange, FeeShare,
        MatchKind, OfferType, PeriodValues, PrincipalCommission, RangeType, Retailer, RuleScope,
    };
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn tariff(id: i64, name: &str, p1_price: f64) -> TariffOffer {
        TariffOffer {
            id,
            retailer_id: 1,
            name: name.to_string(),
            access_tariff: "2.0TD".to_string(),
            offer_type: OfferType::Fixed,
            energy_price: PeriodValues { p1: Some(p1_price), ..Default::default() },
            power_price: PeriodValues { p1: Some(30.0), ..Default::default() },
            discounts: Discounts::default(),
            management_fee: None,
            fee: BuiltInFee::default(),
            range: EligibilityRange { range_type: RangeType::Energy, from: 0.0, to: None },
            active: true,
        }
    }

    fn catalog() -> Catalog {
        let mut out_of_range = tariff(4, "Grandes Consumos", 0.05);
        out_of_range.range.from = 50_000.0;
        let mut no_prices = tariff(5, "Sin Precios", 0.0);
        no_prices.energy_price = PeriodValues::default();
        no_prices.power_price = PeriodValues::default();

        Catalog {
            retailers: vec![Retailer { id: 1, name: "Iberluz".to_string() }],
            tariffs: vec![
                tariff(1, "Cara", 0.25),
                tariff(2, "Barata", 0.10),
                tariff(3, "Media", 0.15),
                out_of_range,
                no_prices,
            ],
            profiles: vec![CommercialProfile {
                id: 1,
                name: "Senior".to_string(),
                default_percentage: 50.0,
                rules: Vec::new(),
            }],
            consultants: vec![Consultant { id: 7, name: "Marta".to_string(), profile_id: Some(1) }],
            principal_commissions: vec![PrincipalCommission {
                id: None,
                percentage: 10.0,
                activated_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                active: true,
            }],
        }
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            profile: ConsumptionProfile {
                label: None,
                annual_consumption_kwh: 3000.0,
                energy_kwh: PeriodValues { p1: Some(3000.0), ..Default::default() },
                power_kw: PeriodValues { p1: Some(4.0), p2: Some(4.0), ..Default::default() },
                access_tariff: "2.0TD".to_string(),
                current_bill: 900.0,
            },
            fee_overrides: FeeOverrides::none(),
        }
    }

    #[test]
    fn test_results_sorted_cheapest_first() {
        let comparison = compare(&request(), &catalog(), &ComparisonOptions::default(), &I18n::new("en"));

        let ids: Vec<i64> = comparison.results.iter().map(|r| r.tariff_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(comparison.cheapest().map(|r| r.tariff_id), Some(2));
        assert!(comparison.results.iter().all(|r| r.commission.is_none()));
    }

    #[test]
    fn test_failures_and_ineligible_are_isolated() {
        let comparison = compare(&request(), &catalog(), &ComparisonOptions::default(), &I18n::new("en"));

        assert_eq!(comparison.results.len(), 3);
        assert_eq!(comparison.ineligible, 1);
        assert_eq!(comparison.failed, 1);
    }

    #[test]
    fn test_max_results_truncates_after_sorting() {
        let options = ComparisonOptions { consultant: None, max_results: Some(1) };
        let comparison = compare(&request(), &catalog(), &options, &I18n::new("en"));

        assert_eq!(comparison.results.len(), 1);
        assert_eq!(comparison.results[0].tariff_id, 2);
    }

    #[test]
    fn test_commission_attached_per_result() {
        let catalog = catalog();
        let consultant = catalog.consultant(7).unwrap();
        let options = ComparisonOptions { consultant: Some(consultant), max_results: None };

        let comparison = compare(&request(), &catalog, &options, &I18n::new("en"));
        for result in &comparison.results {
            // 10% principal x 50% profile default
            let expected = result.total * 0.05;
            assert!((result.commission.unwrap() - expected).abs() < EPS);
        }
    }

    #[test]
    fn test_commission_failure_keeps_result() {
        let mut catalog = catalog();
        catalog.principal_commissions.clear();
        let consultant = catalog.consultant(7).cloned().unwrap();
        let options = ComparisonOptions { consultant: Some(&consultant), max_results: None };

        let comparison = compare(&request(), &catalog, &options, &I18n::new("en"));
        assert_eq!(comparison.results.len(), 3);
        assert!(comparison.results.iter().all(|r| r.commission.is_none()));
    }

    #[test]
    fn test_register_sale_uses_applied_fees() {
        let mut catalog = catalog();
        catalog.tariffs[1].fee = BuiltInFee { enabled: true, energy: Some(0.01), power: Some(2.0), ..Default::default() };
        catalog.profiles[0].rules.push(CommissionRule {
            scope: RuleScope::Offer { retailer_id: 1, offer_name: "Barata".to_string(), access_tariff: None },
            percentage: 60.0,
            active: true,
            fee_share: Some(FeeShare { energy_percent: Some(50.0), power_percent: Some(50.0) }),
        });
        let consultant = catalog.consultant(7).cloned().unwrap();

        let sale = register_sale(&request(), &consultant, 2, &catalog, &I18n::new("en")).unwrap();
        assert_eq!(sale.commission.kind, MatchKind::Offer);
        assert!(sale.commission.fee_based);
        // Power sum 8 kW x 2 x 50% + 3000 kWh x 0.01 x 50%
        assert!((sale.commission.amount - (8.0 + 15.0)).abs() < EPS);
    }

    #[test]
    fn test_register_sale_without_profile_fails() {
        let catalog = catalog();
        let consultant = Consultant { id: 8, name: "Luis".to_string(), profile_id: None };

        let result = register_sale(&request(), &consultant, 2, &catalog, &I18n::new("en"));
        assert!(matches!(result, Err(Error::NoProfile { consultant_id: 8 })));
    }

    #[test]
    fn test_sample_files_compare() {
        let catalog = Catalog::from_toml(include_str!("../../demos/catalog.toml")).unwrap();
        let request: ComparisonRequest = toml::from_str(include_str!("../../demos/profile.toml")).unwrap();
        let options = ComparisonOptions { consultant: catalog.consultant(1), max_results: None };

        let comparison = compare(&request, &catalog, &options, &I18n::new("es"));
        // The 3.0TD offer does not apply to a 2.0TD supply
        assert_eq!(comparison.results.len(), 3);
        assert_eq!(comparison.ineligible, 1);
        assert!(comparison.results.windows(2).all(|w| w[0].total <= w[1].total));
        assert!(comparison.results.iter().all(|r| r.commission.is_some()));
    }

    #[test]
    fn test_recalculate_replaces_stored_results() {
        let db = Database::open_in_memory().unwrap();
        let mut catalog = catalog();
        catalog.tariffs[0].fee = BuiltInFee { enabled: true, energy: Some(0.03), ..Default::default() };
        let options = ComparisonOptions::default();
        let i18n = I18n::new("en");

        let mut request = request();
        request.fee_overrides.power = Some(1.0);
        let id = db.save_comparison(&compare(&request, &catalog, &options, &i18n)).unwrap();
        let before = db.get_results(id).unwrap();

        let overrides = FeeOverrides { energy: Some(0.01), power: None };
        let comparison = recalculate(&db, id, &overrides, &catalog, &options, &i18n).unwrap();

        // Stored power override kept, new energy override layered on top
        let stored = db.get_comparison(id).unwrap().unwrap();
        assert_eq!(stored.request.fee_overrides, FeeOverrides { energy: Some(0.01), power: Some(1.0) });

        // Catalog fee 0.03 on "Cara" is replaced by the 0.01 override
        assert_eq!(before.iter().find(|r| r.tariff_id == 1).unwrap().applied_energy_fee, Some(0.03));
        let after = db.get_results(id).unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(after, comparison.results);
        for result in &after {
            assert_eq!(result.applied_energy_fee, Some(0.01));
            let old = before.iter().find(|r| r.tariff_id == result.tariff_id).unwrap();
            assert!((result.total - old.total).abs() > EPS);
        }
    }

    #[test]
    fn test_recalculate_unknown_comparison() {
        let db = Database::open_in_memory().unwrap();
        let result = recalculate(
            &db,
            42,
            &FeeOverrides::none(),
            &catalog(),
            &ComparisonOptions::default(),
            &I18n::new("en"),
        );
        assert!(matches!(result, Err(Error::UnknownComparison(42))));
    }

    #[test]
    fn test_register_sale_unknown_tariff() {
        let catalog = catalog();
        let consultant = catalog.consultant(7).cloned().unwrap();

        let result = register_sale(&request(), &consultant, 99, &catalog, &I18n::new("en"));
        assert!(matches!(result, Err(Error::UnknownTariff(99))));
    }
}
