//! Database module for persisting comparisons and commissions
//!
//! Uses SQLite for local storage of:
//! - Comparison requests and their per-tariff results
//! - Principal commission versions
//! - Commissions of registered sales

use crate::catalog::Catalog;
use crate::comparison::{Comparison, ComparisonRequest, SaleCommission};
use crate::core::{CommissionResult, CostResult, Error, MatchKind, PrincipalCommission, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database manager
pub struct Database {
    conn: Connection,
}

/// Comparison record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComparison {
    pub id: i64,
    pub created_at: i64,
    pub request: ComparisonRequest,
}

/// Sale commission record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSale {
    pub id: i64,
    pub created_at: i64,
    pub sale: SaleCommission,
}

impl Database {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.init_schema()?;

        Ok(db)
    }

    /// In-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Comparison requests
            CREATE TABLE IF NOT EXISTS comparisons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                label TEXT,
                access_tariff TEXT NOT NULL,
                annual_consumption_kwh REAL NOT NULL,
                current_bill REAL NOT NULL,
                request TEXT NOT NULL
            );

            -- One row per (comparison, tariff)
            CREATE TABLE IF NOT EXISTS comparison_results (
                comparison_id INTEGER NOT NULL REFERENCES comparisons(id),
                tariff_id INTEGER NOT NULL,
                retailer_id INTEGER NOT NULL,
                offer_name TEXT NOT NULL,
                energy_cost REAL NOT NULL,
                power_cost REAL NOT NULL,
                management_fee REAL NOT NULL,
                base_amount REAL NOT NULL,
                electricity_tax REAL NOT NULL,
                vat REAL NOT NULL,
                total REAL NOT NULL,
                savings REAL NOT NULL,
                applied_energy_fee REAL,
                applied_power_fee REAL,
                commission REAL,
                PRIMARY KEY (comparison_id, tariff_id)
            );

            -- Principal commission versions
            CREATE TABLE IF NOT EXISTS principal_commissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                percentage REAL NOT NULL,
                activated_on TEXT NOT NULL,
                active INTEGER NOT NULL
            );

            -- Commissions of registered sales
            CREATE TABLE IF NOT EXISTS sale_commissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                consultant_id INTEGER NOT NULL,
                tariff_id INTEGER NOT NULL,
                annual_bill REAL NOT NULL,
                kind TEXT NOT NULL,
                percentage REAL NOT NULL,
                principal_percentage REAL NOT NULL,
                amount REAL NOT NULL,
                fee_based INTEGER NOT NULL,
                explanation TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sales_consultant ON sale_commissions(consultant_id);
            "#,
        )?;

        Ok(())
    }

    // ===== Comparisons =====

    /// Store a comparison and its results, returning the comparison id
    pub fn save_comparison(&self, comparison: &Comparison) -> Result<i64> {
        let id = self.insert_comparison(&comparison.request)?;
        self.save_results(id, &comparison.results)?;
        Ok(id)
    }

    pub fn insert_comparison(&self, request: &ComparisonRequest) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let request_json =
            serde_json::to_string(request).map_err(|e| Error::Serialization(e.to_string()))?;
        let profile = &request.profile;

        self.conn.execute(
            "INSERT INTO comparisons (created_at, label, access_tariff, annual_consumption_kwh, current_bill, request)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                profile.label,
                profile.access_tariff,
                profile.annual_consumption_kwh,
                profile.current_bill,
                request_json
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Replace the results of a comparison; earlier results are dropped, never merged
    pub fn save_results(&self, comparison_id: i64, results: &[CostResult]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        replace_results(&tx, comparison_id, results)?;
        tx.commit()?;

        log::info!("Saved {} results for comparison {}", results.len(), comparison_id);
        Ok(results.len())
    }

    /// Store a recalculated comparison under an existing id: its request and results are replaced together
    pub fn update_comparison(&self, comparison_id: i64, comparison: &Comparison) -> Result<usize> {
        let request_json = serde_json::to_string(&comparison.request)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let profile = &comparison.request.profile;

        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE comparisons
             SET label = ?1, access_tariff = ?2, annual_consumption_kwh = ?3, current_bill = ?4, request = ?5
             WHERE id = ?6",
            params![
                profile.label,
                profile.access_tariff,
                profile.annual_consumption_kwh,
                profile.current_bill,
                request_json,
                comparison_id
            ],
        )?;
        if updated == 0 {
            return Err(Error::UnknownComparison(comparison_id));
        }
        replace_results(&tx, comparison_id, &comparison.results)?;
        tx.commit()?;

        log::info!(
            "Recalculated comparison {}: {} results",
            comparison_id,
            comparison.results.len()
        );
        Ok(comparison.results.len())
    }

    /// Get a stored comparison by ID
    pub fn get_comparison(&self, comparison_id: i64) -> Result<Option<StoredComparison>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at, request FROM comparisons WHERE id = ?1",
                params![comparison_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        match row {
            Some((id, created_at, request)) => {
                let request = serde_json::from_str(&request)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(StoredComparison { id, created_at, request }))
            }
            None => Ok(None),
        }
    }

    /// Get the results of a comparison, cheapest first
    pub fn get_results(&self, comparison_id: i64) -> Result<Vec<CostResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT tariff_id, retailer_id, offer_name, energy_cost, power_cost, management_fee,
                    base_amount, electricity_tax, vat, total, savings, applied_energy_fee,
                    applied_power_fee, commission
             FROM comparison_results
             WHERE comparison_id = ?1
             ORDER BY total ASC, tariff_id ASC",
        )?;

        let results = stmt
            .query_map(params![comparison_id], |row| {
                Ok(CostResult {
                    tariff_id: row.get(0)?,
                    retailer_id: row.get(1)?,
                    offer_name: row.get(2)?,
                    energy_cost: row.get(3)?,
                    power_cost: row.get(4)?,
                    management_fee: row.get(5)?,
                    base_amount: row.get(6)?,
                    electricity_tax: row.get(7)?,
                    vat: row.get(8)?,
                    total: row.get(9)?,
                    savings: row.get(10)?,
                    applied_energy_fee: row.get(11)?,
                    applied_power_fee: row.get(12)?,
                    commission: row.get(13)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    // ===== Principal commission =====

    pub fn insert_principal_commission(&self, record: &PrincipalCommission) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO principal_commissions (percentage, activated_on, active) VALUES (?1, ?2, ?3)",
            params![
                record.percentage,
                record.activated_on.format(DATE_FORMAT).to_string(),
                record.active
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_principal_commission_active(&self, id: i64, active: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE principal_commissions SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(updated > 0)
    }

    /// The active version with the most recent activation date
    pub fn active_principal_commission(&self) -> Result<Option<PrincipalCommission>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, percentage, activated_on, active FROM principal_commissions
                 WHERE active = 1 ORDER BY activated_on DESC, id DESC LIMIT 1",
                [],
                principal_from_row,
            )
            .optional()?;

        Ok(record)
    }

    /// All versions, most recent activation first
    pub fn principal_commission_history(&self) -> Result<Vec<PrincipalCommission>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, percentage, activated_on, active FROM principal_commissions
             ORDER BY activated_on DESC, id DESC",
        )?;

        let history = stmt
            .query_map([], principal_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(history)
    }

    /// Append the stored principal commission versions to `catalog`'s own history.
    ///
    /// Stored versions are appended oldest first, so on the same activation
    /// date the later insert wins.
    pub fn merge_principal_history(&self, catalog: &mut Catalog) -> Result<usize> {
        let history = self.principal_commission_history()?;
        let count = history.len();
        catalog.principal_commissions.extend(history.into_iter().rev());

        log::debug!("Merged {} stored principal commission versions", count);
        Ok(count)
    }

    // ===== Sales =====

    pub fn record_sale(&self, sale: &SaleCommission) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let commission = &sale.commission;

        self.conn.execute(
            "INSERT INTO sale_commissions (
                created_at, consultant_id, tariff_id, annual_bill, kind, percentage,
                principal_percentage, amount, fee_based, explanation
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                now,
                sale.consultant_id,
                sale.tariff_id,
                sale.annual_bill,
                commission.kind.as_str(),
                commission.percentage,
                commission.principal_percentage,
                commission.amount,
                commission.fee_based,
                commission.explanation
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn sale_commissions_for_consultant(&self, consultant_id: i64) -> Result<Vec<StoredSale>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, consultant_id, tariff_id, annual_bill, kind, percentage,
                    principal_percentage, amount, fee_based, explanation
             FROM sale_commissions
             WHERE consultant_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let sales = stmt
            .query_map(params![consultant_id], |row| {
                let kind: String = row.get(5)?;
                let kind = MatchKind::parse(&kind).ok_or_else(|| {
                    conversion_error(5, format!("unknown commission kind '{}'", kind))
                })?;

                Ok(StoredSale {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    sale: SaleCommission {
                        consultant_id: row.get(2)?,
                        tariff_id: row.get(3)?,
                        annual_bill: row.get(4)?,
                        commission: CommissionResult {
                            kind,
                            percentage: row.get(6)?,
                            principal_percentage: row.get(7)?,
                            amount: row.get(8)?,
                            fee_based: row.get(9)?,
                            explanation: row.get(10)?,
                        },
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sales)
    }
}

fn replace_results(conn: &Connection, comparison_id: i64, results: &[CostResult]) -> Result<()> {
    conn.execute(
        "DELETE FROM comparison_results WHERE comparison_id = ?1",
        params![comparison_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO comparison_results (
            comparison_id, tariff_id, retailer_id, offer_name, energy_cost, power_cost,
            management_fee, base_amount, electricity_tax, vat, total, savings,
            applied_energy_fee, applied_power_fee, commission
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;

    for result in results {
        stmt.execute(params![
            comparison_id,
            result.tariff_id,
            result.retailer_id,
            result.offer_name,
            result.energy_cost,
            result.power_cost,
            result.management_fee,
            result.base_amount,
            result.electricity_tax,
            result.vat,
            result.total,
            result.savings,
            result.applied_energy_fee,
            result.applied_power_fee,
            result.commission
        ])?;
    }

    Ok(())
}

fn principal_from_row(row: &Row<'_>) -> rusqlite::Result<PrincipalCommission> {
    let activated_on: String = row.get(2)?;
    let activated_on = NaiveDate::parse_from_str(&activated_on, DATE_FORMAT)
        .map_err(|e| conversion_error(2, e.to_string()))?;

    Ok(PrincipalCommission {
        id: Some(row.get(0)?),
        percentage: row.get(1)?,
        activated_on,
        active: row.get(3)?,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(Error::Serialization(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::active_principal;
    use crate::core::{ConsumptionProfile, FeeOverrides, PeriodValues};

    fn create_test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            profile: ConsumptionProfile {
                label: Some("Bar Manolo".to_string()),
                annual_consumption_kwh: 4200.0,
                energy_kwh: PeriodValues { p1: Some(1200.0), p2: Some(1000.0), p3: Some(2000.0), ..Default::default() },
                power_kw: PeriodValues { p1: Some(5.75), p2: Some(5.75), ..Default::default() },
                access_tariff: "2.0TD".to_string(),
                current_bill: 1100.0,
            },
            fee_overrides: FeeOverrides { energy: Some(0.01), power: None },
        }
    }

    fn result(tariff_id: i64, total: f64) -> CostResult {
        CostResult {
            tariff_id,
            retailer_id: 1,
            offer_name: format!("Oferta {}", tariff_id),
            energy_cost: total * 0.6,
            power_cost: total * 0.2,
            management_fee: 0.0,
            base_amount: total * 0.8,
            electricity_tax: 1.0,
            vat: 2.0,
            total,
            savings: 1100.0 - total,
            applied_energy_fee: Some(0.01),
            applied_power_fee: None,
            commission: Some(12.5),
        }
    }

    fn principal(percentage: f64, date: &str, active: bool) -> PrincipalCommission {
        PrincipalCommission {
            id: None,
            percentage,
            activated_on: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            active,
        }
    }

    #[test]
    fn test_save_and_get_comparison() {
        let db = create_test_db();
        let comparison = Comparison {
            request: request(),
            results: vec![result(2, 900.0), result(1, 1000.0)],
            ineligible: 0,
            failed: 0,
        };

        let id = db.save_comparison(&comparison).unwrap();

        let stored = db.get_comparison(id).unwrap().unwrap();
        assert_eq!(stored.request, request());
        assert_eq!(db.get_results(id).unwrap(), comparison.results);
        assert!(db.get_comparison(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_recalculation_replaces_results() {
        let db = create_test_db();
        let id = db.insert_comparison(&request()).unwrap();

        db.save_results(id, &[result(1, 1000.0), result(2, 900.0)]).unwrap();
        db.save_results(id, &[result(3, 800.0)]).unwrap();

        let results = db.get_results(id).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tariff_id, 3);
    }

    #[test]
    fn test_active_principal_commission() {
        let db = create_test_db();
        assert!(db.active_principal_commission().unwrap().is_none());

        db.insert_principal_commission(&principal(15.0, "2024-01-01", true)).unwrap();
        let newest = db.insert_principal_commission(&principal(20.0, "2024-06-01", true)).unwrap();
        db.insert_principal_commission(&principal(30.0, "2024-09-01", false)).unwrap();

        let active = db.active_principal_commission().unwrap().unwrap();
        assert_eq!(active.percentage, 20.0);
        assert_eq!(active.id, Some(newest));

        db.set_principal_commission_active(newest, false).unwrap();
        let active = db.active_principal_commission().unwrap().unwrap();
        assert_eq!(active.percentage, 15.0);

        assert_eq!(db.principal_commission_history().unwrap().len(), 3);
    }

    #[test]
    fn test_update_comparison_replaces_request_and_results() {
        let db = create_test_db();
        let id = db
            .save_comparison(&Comparison {
                request: request(),
                results: vec![result(1, 1000.0), result(2, 900.0)],
                ineligible: 0,
                failed: 0,
            })
            .unwrap();

        let mut recalculated = request();
        recalculated.fee_overrides.power = Some(2.5);
        let comparison = Comparison {
            request: recalculated.clone(),
            results: vec![result(2, 950.0)],
            ineligible: 1,
            failed: 0,
        };
        assert_eq!(db.update_comparison(id, &comparison).unwrap(), 1);

        assert_eq!(db.get_comparison(id).unwrap().unwrap().request, recalculated);
        assert_eq!(db.get_results(id).unwrap(), comparison.results);

        assert!(matches!(
            db.update_comparison(id + 1, &comparison),
            Err(Error::UnknownComparison(_))
        ));
    }

    #[test]
    fn test_stored_principals_join_catalog_history() {
        let db = create_test_db();
        let mut catalog = Catalog {
            principal_commissions: vec![principal(20.0, "2024-03-01", true)],
            ..Default::default()
        };

        db.insert_principal_commission(&principal(50.0, "2025-06-01", true)).unwrap();
        db.insert_principal_commission(&principal(55.0, "2025-06-01", true)).unwrap();
        db.insert_principal_commission(&principal(90.0, "2025-09-01", false)).unwrap();

        assert_eq!(db.merge_principal_history(&mut catalog).unwrap(), 3);
        assert_eq!(catalog.principal_commissions.len(), 4);

        // Same activation date: the later insert applies
        let active = active_principal(&catalog.principal_commissions).unwrap();
        assert_eq!(active.percentage, 55.0);
    }

    #[test]
    fn test_record_and_list_sales() {
        let db = create_test_db();
        let sale = SaleCommission {
            consultant_id: 7,
            tariff_id: 2,
            annual_bill: 950.0,
            commission: CommissionResult {
                kind: MatchKind::Retailer,
                percentage: 45.0,
                principal_percentage: 20.0,
                amount: 85.5,
                fee_based: false,
                explanation: "Retailer rule for Iberluz (45%), over principal commission 20%".to_string(),
            },
        };

        db.record_sale(&sale).unwrap();

        let sales = db.sale_commissions_for_consultant(7).unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].sale, sale);
        assert!(db.sale_commissions_for_consultant(8).unwrap().is_empty());
    }
}
