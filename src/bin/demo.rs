//! Tariff Comparator - Demo CLI
//!
//! Runs a comparison over a small built-in catalog, attaches commissions,
//! registers a sale, and stores everything in an in-memory database.

use chrono::NaiveDate;

use tariff_comparator_lib::catalog::Catalog;
use tariff_comparator_lib::comparison::{compare, register_sale, ComparisonOptions, ComparisonRequest};
use tariff_comparator_lib::core::{
    BuiltInFee, CommercialProfile, CommissionRule, ConsumptionProfile, Consultant, Discounts,
    EligibilityRange, FeeOverrides, FeeShare, OfferType, PeriodValues, PrincipalCommission,
    RangeType, Retailer, RuleScope, TariffOffer,
};
use tariff_comparator_lib::db::Database;
use tariff_comparator_lib::i18n::I18n;
use tariff_comparator_lib::pricing::{ELECTRICITY_TAX_RATE, VAT_RATE};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("==============================================");
    println!("   Tariff Comparator - Demo");
    println!("==============================================\n");

    let catalog = sample_catalog();
    let i18n = I18n::new("es");
    let request = ComparisonRequest {
        profile: ConsumptionProfile {
            label: Some("Panader\u{00ED}a L\u{00F3}pez".to_string()),
            annual_consumption_kwh: 4200.0,
            energy_kwh: PeriodValues { p1: Some(1100.0), p2: Some(1200.0), p3: Some(1900.0), ..Default::default() },
            power_kw: PeriodValues { p1: Some(5.75), p2: Some(5.75), ..Default::default() },
            access_tariff: "2.0TD".to_string(),
            current_bill: 1150.0,
        },
        fee_overrides: FeeOverrides::none(),
    };

    println!("[1/3] Comparing {} tariffs...", catalog.tariffs.len());
    println!("      Electricity tax: {:.8}  VAT: {:.0}%\n", ELECTRICITY_TAX_RATE, VAT_RATE * 100.0);

    let consultant = &catalog.consultants[0];
    let options = ComparisonOptions { consultant: Some(consultant), max_results: None };
    let comparison = compare(&request, &catalog, &options, &i18n);

    println!("----------------------------------------------------------");
    println!("  Offer                 |  Total   |  Savings | Commission");
    println!("----------------------------------------------------------");
    for result in &comparison.results {
        println!(
            "  {:<21} | {:>8.2} | {:>8.2} | {:>8}",
            result.offer_name,
            result.total,
            result.savings,
            result.commission.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "-".to_string())
        );
    }
    println!("----------------------------------------------------------");
    println!("  Ineligible: {}  Failed: {}\n", comparison.ineligible, comparison.failed);

    println!("[2/3] Registering sale of the cheapest offer...");
    let cheapest = match comparison.cheapest() {
        Some(result) => result.tariff_id,
        None => {
            println!("      No eligible tariff");
            return;
        }
    };
    let sale = match register_sale(&request, consultant, cheapest, &catalog, &i18n) {
        Ok(sale) => sale,
        Err(e) => {
            println!("      {}: {}", i18n.get("commission.unavailable"), e);
            return;
        }
    };
    println!("      {:.2} \u{20AC}  {}\n", sale.commission.amount, sale.commission.explanation);

    println!("[3/3] Storing in SQLite (in memory)...");
    match Database::open_in_memory() {
        Ok(db) => {
            let stored = db
                .save_comparison(&comparison)
                .and_then(|id| db.record_sale(&sale).map(|sale_id| (id, sale_id)));
            match stored {
                Ok((id, sale_id)) => println!("      Comparison #{}  Sale #{}", id, sale_id),
                Err(e) => println!("      Warning: could not store results: {}", e),
            }
        }
        Err(e) => println!("      Warning: could not open database: {}", e),
    }

    println!("\n==============================================\n");
}

fn tariff(id: i64, retailer_id: i64, name: &str, energy: [f64; 3], power: [f64; 2]) -> TariffOffer {
    TariffOffer {
        id,
        retailer_id,
        name: name.to_string(),
        access_tariff: "2.0TD".to_string(),
        offer_type: OfferType::Fixed,
        energy_price: PeriodValues { p1: Some(energy[0]), p2: Some(energy[1]), p3: Some(energy[2]), ..Default::default() },
        power_price: PeriodValues { p1: Some(power[0]), p2: Some(power[1]), ..Default::default() },
        discounts: Discounts::default(),
        management_fee: None,
        fee: BuiltInFee::default(),
        range: EligibilityRange { range_type: RangeType::Power, from: 0.0, to: Some(15.0) },
        active: true,
    }
}

fn sample_catalog() -> Catalog {
    let mut discounted = tariff(2, 1, "Luz Ahorro", [0.19, 0.15, 0.12], [31.0, 1.9]);
    discounted.discounts.energy_percent = Some(8.0);
    discounted.fee = BuiltInFee { enabled: true, energy: Some(0.012), energy_max: Some(0.015), ..Default::default() };

    let mut indexed = tariff(3, 2, "Indexada PVPC+", [0.16, 0.13, 0.09], [27.5, 1.4]);
    indexed.offer_type = OfferType::Indexed;
    indexed.management_fee = Some(36.0);

    let mut business = tariff(4, 2, "Empresa 3.0", [0.14, 0.12, 0.10], [22.0, 11.0]);
    business.access_tariff = "3.0TD".to_string();
    business.range.from = 15.0;
    business.range.to = None;

    Catalog {
        retailers: vec![
            Retailer { id: 1, name: "Iberluz".to_string() },
            Retailer { id: 2, name: "Solaria Energ\u{00ED}a".to_string() },
        ],
        tariffs: vec![
            tariff(1, 1, "Luz Fija 24h", [0.21, 0.17, 0.13], [30.67, 1.42]),
            discounted,
            indexed,
            business,
        ],
        profiles: vec![CommercialProfile {
            id: 1,
            name: "Senior".to_string(),
            default_percentage: 40.0,
            rules: vec![
                CommissionRule {
                    scope: RuleScope::Offer { retailer_id: 1, offer_name: "Luz Ahorro".to_string(), access_tariff: None },
                    percentage: 60.0,
                    active: true,
                    fee_share: Some(FeeShare { energy_percent: Some(50.0), power_percent: None }),
                },
                CommissionRule {
                    scope: RuleScope::Retailer { retailer_id: 2 },
                    percentage: 45.0,
                    active: true,
                    fee_share: None,
                },
            ],
        }],
        consultants: vec![Consultant { id: 1, name: "Marta Ruiz".to_string(), profile_id: Some(1) }],
        principal_commissions: vec![PrincipalCommission {
            id: None,
            percentage: 20.0,
            activated_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            active: true,
        }],
    }
}
