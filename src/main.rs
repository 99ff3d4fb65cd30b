//! Tariff Comparator - Main entry point
//!
//! Command line front end: compares a client's consumption profile against
//! the tariff catalog, registers sales with their consultant commission,
//! and manages the principal commission history.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{presets, Cell, CellAlignment, Color, Table};
use std::path::{Path, PathBuf};

use tariff_comparator_lib::catalog::Catalog;
use tariff_comparator_lib::comparison::{
    compare, recalculate, register_sale, Comparison, ComparisonOptions, ComparisonRequest,
};
use tariff_comparator_lib::core::{Config, FeeOverrides, PrincipalCommission};
use tariff_comparator_lib::db::Database;
use tariff_comparator_lib::i18n::I18n;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[clap(long, env = "TARIFF_COMPARATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog file, overriding the configured one
    #[clap(long, env = "TARIFF_COMPARATOR_CATALOG")]
    catalog: Option<PathBuf>,

    /// Language for explanations and tables ("auto", "en", "es")
    #[clap(long)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a consumption profile against every eligible tariff.
    Compare {
        /// TOML file holding the profile and optional fee overrides
        #[clap(long)]
        profile: PathBuf,

        /// Attach this consultant's commission to each result
        #[clap(long)]
        consultant: Option<i64>,

        /// Energy fee override in €/kWh
        #[clap(long)]
        energy_fee: Option<f64>,

        /// Power fee override in €/kW
        #[clap(long)]
        power_fee: Option<f64>,

        /// Store the comparison and its results
        #[clap(long)]
        save: bool,

        /// Print JSON instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Recalculate a stored comparison, replacing its results.
    Recalculate {
        #[clap(long)]
        comparison: i64,

        /// Attach this consultant's commission to each result
        #[clap(long)]
        consultant: Option<i64>,

        /// Energy fee override in €/kWh
        #[clap(long)]
        energy_fee: Option<f64>,

        /// Power fee override in €/kW
        #[clap(long)]
        power_fee: Option<f64>,

        /// Print JSON instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Register a sale from a stored comparison and record its commission.
    Sale {
        #[clap(long)]
        comparison: i64,

        #[clap(long)]
        tariff: i64,

        #[clap(long)]
        consultant: i64,
    },

    /// Record a new principal commission version.
    Principal {
        #[clap(long)]
        percentage: f64,

        /// Activation date (YYYY-MM-DD), today when omitted
        #[clap(long)]
        activated_on: Option<NaiveDate>,
    },

    /// Deactivate a stored principal commission version.
    DeactivatePrincipal {
        #[clap(long)]
        id: i64,
    },

    /// List stored principal commission versions.
    History,

    /// List the recorded sale commissions of a consultant.
    Sales {
        #[clap(long)]
        consultant: i64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Starting Tariff Comparator v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    let i18n = I18n::new(args.language.as_deref().unwrap_or(&config.general.language));

    match args.command {
        Command::Compare { profile, consultant, energy_fee, power_fee, save, json } => {
            let mut catalog = load_catalog(&config, args.catalog.as_deref())?;

            // Commissions need the stored principal history even when nothing is saved
            let db = if save {
                Some(open_database(&config)?)
            } else if consultant.is_some() && config.comparison.attach_commissions {
                match open_database(&config) {
                    Ok(db) => Some(db),
                    Err(e) => {
                        log::warn!("Using the catalog's principal commissions only: {:#}", e);
                        None
                    }
                }
            } else {
                None
            };
            if let Some(db) = &db {
                db.merge_principal_history(&mut catalog)?;
            }

            let content = std::fs::read_to_string(&profile)
                .with_context(|| format!("failed to read profile {}", profile.display()))?;
            let mut request: ComparisonRequest = toml::from_str(&content)
                .with_context(|| format!("failed to parse profile {}", profile.display()))?;
            request.fee_overrides = request.fee_overrides.updated_with(&FeeOverrides {
                energy: energy_fee,
                power: power_fee,
            });

            let options = comparison_options(&catalog, &config, consultant)?;
            let comparison = compare(&request, &catalog, &options, &i18n);
            show_comparison(&comparison, &catalog, &config, &i18n, &options, json)?;

            if let Some(db) = db.as_ref().filter(|_| save) {
                let id = db.save_comparison(&comparison)?;
                println!("{}: {}", i18n.get("summary.saved"), id);
            }
        }

        Command::Recalculate { comparison, consultant, energy_fee, power_fee, json } => {
            let db = open_database(&config)?;
            let mut catalog = load_catalog(&config, args.catalog.as_deref())?;
            db.merge_principal_history(&mut catalog)?;

            let options = comparison_options(&catalog, &config, consultant)?;
            let overrides = FeeOverrides { energy: energy_fee, power: power_fee };
            let recalculated = recalculate(&db, comparison, &overrides, &catalog, &options, &i18n)?;
            show_comparison(&recalculated, &catalog, &config, &i18n, &options, json)?;
        }

        Command::Sale { comparison, tariff, consultant } => {
            let db = open_database(&config)?;
            let mut catalog = load_catalog(&config, args.catalog.as_deref())?;
            db.merge_principal_history(&mut catalog)?;

            let stored = db
                .get_comparison(comparison)?
                .with_context(|| format!("unknown comparison {}", comparison))?;
            if !db.get_results(comparison)?.iter().any(|result| result.tariff_id == tariff) {
                bail!("tariff {} is not among the results of comparison {}", tariff, comparison);
            }
            let consultant = catalog
                .consultant(consultant)
                .with_context(|| format!("unknown consultant {}", consultant))?;

            let sale = match register_sale(&stored.request, consultant, tariff, &catalog, &i18n) {
                Ok(sale) => sale,
                Err(e) => bail!("{}: {}", i18n.get("commission.unavailable"), e),
            };
            let id = db.record_sale(&sale)?;

            println!("#{} {:.2} {}", id, sale.commission.amount, config.comparison.currency_symbol);
            println!("{}", sale.commission.explanation);
        }

        Command::Principal { percentage, activated_on } => {
            let db = open_database(&config)?;
            let record = PrincipalCommission {
                id: None,
                percentage,
                activated_on: activated_on.unwrap_or_else(|| chrono::Local::now().date_naive()),
                active: true,
            };
            let id = db.insert_principal_commission(&record)?;
            log::info!("Principal commission {}% active from {} (#{})", percentage, record.activated_on, id);
            log_principal_in_force(&db)?;
        }

        Command::DeactivatePrincipal { id } => {
            let db = open_database(&config)?;
            if !db.set_principal_commission_active(id, false)? {
                bail!("unknown principal commission {}", id);
            }
            log::info!("Principal commission #{} deactivated", id);
            log_principal_in_force(&db)?;
        }

        Command::History => {
            let db = open_database(&config)?;
            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_header(vec![
                i18n.get("table.rank"),
                i18n.get("table.principal"),
                i18n.get("table.activated_on"),
                i18n.get("table.active"),
            ]);
            for record in db.principal_commission_history()? {
                let active = if record.active { i18n.get("table.yes") } else { i18n.get("table.no") };
                table.add_row(vec![
                    Cell::new(record.id.unwrap_or_default()),
                    Cell::new(record.percentage).set_alignment(CellAlignment::Right),
                    Cell::new(record.activated_on),
                    Cell::new(active),
                ]);
            }
            println!("{table}");
        }

        Command::Sales { consultant } => {
            let db = open_database(&config)?;
            for stored in db.sale_commissions_for_consultant(consultant)? {
                println!(
                    "#{} {} {} {:.2} {} - {}",
                    stored.id,
                    i18n.get("table.tariff"),
                    stored.sale.tariff_id,
                    stored.sale.commission.amount,
                    config.comparison.currency_symbol,
                    stored.sale.commission.explanation
                );
            }
        }
    }

    Ok(())
}

fn load_catalog(config: &Config, path: Option<&Path>) -> anyhow::Result<Catalog> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config.catalog_path()?,
    };
    Catalog::load(&path).with_context(|| format!("failed to load catalog {}", path.display()))
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = config.database_path()?;
    Database::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn comparison_options<'a>(
    catalog: &'a Catalog,
    config: &Config,
    consultant: Option<i64>,
) -> anyhow::Result<ComparisonOptions<'a>> {
    let consultant = match consultant {
        Some(id) => Some(catalog.consultant(id).with_context(|| format!("unknown consultant {}", id))?),
        None => None,
    };

    Ok(ComparisonOptions {
        consultant: consultant.filter(|_| config.comparison.attach_commissions),
        max_results: config.comparison.max_results,
    })
}

fn log_principal_in_force(db: &Database) -> anyhow::Result<()> {
    match db.active_principal_commission()? {
        Some(record) => log::info!(
            "Principal commission in force: {}% since {}",
            record.percentage,
            record.activated_on
        ),
        None => log::warn!("No stored principal commission is active"),
    }
    Ok(())
}

fn show_comparison(
    comparison: &Comparison,
    catalog: &Catalog,
    config: &Config,
    i18n: &I18n,
    options: &ComparisonOptions<'_>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(comparison)?);
    } else {
        print_comparison(comparison, catalog, config, i18n, options.consultant.is_some());
    }
    Ok(())
}

fn print_comparison(comparison: &Comparison, catalog: &Catalog, config: &Config, i18n: &I18n, with_commission: bool) {
    let currency = &config.comparison.currency_symbol;
    let money = |value: f64| format!("{:.2} {}", value, currency);

    let mut header = vec![
        i18n.get("table.rank"),
        i18n.get("table.retailer"),
        i18n.get("table.offer"),
        i18n.get("table.energy"),
        i18n.get("table.power"),
        i18n.get("table.taxes"),
        i18n.get("table.total"),
        i18n.get("table.savings"),
    ];
    if with_commission {
        header.push(i18n.get("table.commission"));
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(header);

    for (rank, result) in comparison.results.iter().enumerate() {
        let retailer = catalog
            .retailer(result.retailer_id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| result.retailer_id.to_string());

        let mut row = vec![
            Cell::new(rank + 1),
            Cell::new(retailer),
            Cell::new(&result.offer_name),
            Cell::new(money(result.energy_cost)).set_alignment(CellAlignment::Right),
            Cell::new(money(result.power_cost)).set_alignment(CellAlignment::Right),
            Cell::new(money(result.electricity_tax + result.vat)).set_alignment(CellAlignment::Right),
            Cell::new(money(result.total)).set_alignment(CellAlignment::Right),
            Cell::new(money(result.savings))
                .set_alignment(CellAlignment::Right)
                .fg(if result.savings >= 0.0 { Color::Green } else { Color::Red }),
        ];
        if with_commission {
            row.push(match result.commission {
                Some(amount) => Cell::new(money(amount)).set_alignment(CellAlignment::Right),
                None => Cell::new(i18n.get("commission.unavailable")).fg(Color::DarkYellow),
            });
        }
        table.add_row(row);
    }

    println!("{table}");
    println!("{}: {}", i18n.get("summary.eligible"), comparison.results.len());
    println!("{}: {}", i18n.get("summary.ineligible"), comparison.ineligible);
    println!("{}: {}", i18n.get("summary.failed"), comparison.failed);
}
