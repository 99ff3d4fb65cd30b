//! Tariff and commission catalog
//!
//! Retailers, tariff offers, commercial profiles, consultants and the
//! principal commission history, read from a TOML file. The engine only
//! ever reads from it.

use crate::core::{
    CommercialProfile, Consultant, Error, PrincipalCommission, Result, Retailer, TariffOffer,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub retailers: Vec<Retailer>,
    #[serde(default)]
    pub tariffs: Vec<TariffOffer>,
    #[serde(default)]
    pub profiles: Vec<CommercialProfile>,
    #[serde(default)]
    pub consultants: Vec<Consultant>,
    #[serde(default)]
    pub principal_commissions: Vec<PrincipalCommission>,
}

impl Catalog {
    /// Load and validate a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_toml(&content)?;

        log::info!(
            "Loaded catalog {}: {} retailers, {} tariffs, {} profiles",
            path.display(),
            catalog.retailers.len(),
            catalog.tariffs.len(),
            catalog.profiles.len()
        );

        Ok(catalog)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let retailer_ids: HashSet<i64> = self.retailers.iter().map(|r| r.id).collect();
        let mut tariff_ids = HashSet::new();

        for tariff in &self.tariffs {
            if !tariff_ids.insert(tariff.id) {
                return Err(Error::Config(format!("Duplicate tariff id {}", tariff.id)));
            }
            if !retailer_ids.contains(&tariff.retailer_id) {
                return Err(Error::Config(format!(
                    "Tariff {} refers to unknown retailer {}",
                    tariff.id, tariff.retailer_id
                )));
            }
        }

        Ok(())
    }

    pub fn retailer(&self, id: i64) -> Option<&Retailer> {
        self.retailers.iter().find(|r| r.id == id)
    }

    pub fn tariff(&self, id: i64) -> Option<&TariffOffer> {
        self.tariffs.iter().find(|t| t.id == id)
    }

    pub fn consultant(&self, id: i64) -> Option<&Consultant> {
        self.consultants.iter().find(|c| c.id == id)
    }

    pub fn profile(&self, id: i64) -> Option<&CommercialProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }
}
