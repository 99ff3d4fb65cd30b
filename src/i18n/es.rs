//! Spanish translations

use std::collections::HashMap;

pub fn get_translations() -> HashMap<String, String> {
    let mut t = HashMap::new();

    // Commission explanations
    t.insert("commission.kind.offer".into(), "Regla de oferta '{offer}' ({percentage}%)".into());
    t.insert("commission.kind.tariff".into(), "Regla de tarifa de acceso {access_tariff} ({percentage}%)".into());
    t.insert("commission.kind.retailer".into(), "Regla de comercializadora {retailer} ({percentage}%)".into());
    t.insert("commission.kind.total".into(), "Porcentaje por defecto del perfil '{profile}' ({percentage}%)".into());
    t.insert("commission.fee_based".into(), "{rule}, basada en fee: {power_percent}% del fee de potencia y {energy_percent}% del fee de energ\u{00ED}a".into());
    t.insert("commission.explanation".into(), "{rule}, sobre comisi\u{00F3}n principal {principal}%".into());
    t.insert("commission.unavailable".into(), "Comisi\u{00F3}n no disponible".into());

    // Comparison table
    t.insert("table.rank".into(), "#".into());
    t.insert("table.retailer".into(), "Comercializadora".into());
    t.insert("table.offer".into(), "Oferta".into());
    t.insert("table.energy".into(), "Energ\u{00ED}a".into());
    t.insert("table.power".into(), "Potencia".into());
    t.insert("table.taxes".into(), "Impuestos".into());
    t.insert("table.total".into(), "Total".into());
    t.insert("table.savings".into(), "Ahorro".into());
    t.insert("table.commission".into(), "Comisi\u{00F3}n".into());
    t.insert("table.principal".into(), "%".into());
    t.insert("table.activated_on".into(), "Activa desde".into());
    t.insert("table.active".into(), "Activa".into());
    t.insert("table.tariff".into(), "Tarifa".into());
    t.insert("table.yes".into(), "S\u{00ED}".into());
    t.insert("table.no".into(), "No".into());

    // Summary
    t.insert("summary.eligible".into(), "Tarifas elegibles".into());
    t.insert("summary.ineligible".into(), "Tarifas no elegibles".into());
    t.insert("summary.failed".into(), "C\u{00E1}lculos fallidos".into());
    t.insert("summary.saved".into(), "Guardado como comparativa".into());

    t
}
