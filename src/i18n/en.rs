//! English translations

use std::collections::HashMap;

pub fn get_translations() -> HashMap<String, String> {
    let mut t = HashMap::new();

    // Commission explanations
    t.insert("commission.kind.offer".into(), "Offer rule for '{offer}' ({percentage}%)".into());
    t.insert("commission.kind.tariff".into(), "Access tariff rule for {access_tariff} ({percentage}%)".into());
    t.insert("commission.kind.retailer".into(), "Retailer rule for {retailer} ({percentage}%)".into());
    t.insert("commission.kind.total".into(), "Default of profile '{profile}' ({percentage}%)".into());
    t.insert("commission.fee_based".into(), "{rule}, fee based: {power_percent}% of power fee and {energy_percent}% of energy fee".into());
    t.insert("commission.explanation".into(), "{rule}, over principal commission {principal}%".into());
    t.insert("commission.unavailable".into(), "Commission unavailable".into());

    // Comparison table
    t.insert("table.rank".into(), "#".into());
    t.insert("table.retailer".into(), "Retailer".into());
    t.insert("table.offer".into(), "Offer".into());
    t.insert("table.energy".into(), "Energy".into());
    t.insert("table.power".into(), "Power".into());
    t.insert("table.taxes".into(), "Taxes".into());
    t.insert("table.total".into(), "Total".into());
    t.insert("table.savings".into(), "Savings".into());
    t.insert("table.commission".into(), "Commission".into());
    t.insert("table.principal".into(), "%".into());
    t.insert("table.activated_on".into(), "Activated on".into());
    t.insert("table.active".into(), "Active".into());
    t.insert("table.tariff".into(), "Tariff".into());
    t.insert("table.yes".into(), "Yes".into());
    t.insert("table.no".into(), "No".into());

    // Summary
    t.insert("summary.eligible".into(), "Eligible tariffs".into());
    t.insert("summary.ineligible".into(), "Ineligible tariffs".into());
    t.insert("summary.failed".into(), "Failed calculations".into());
    t.insert("summary.saved".into(), "Saved as comparison".into());

    t
}
