//! Tray Till - Vision-assisted canteen checkout
//!
//! Aggregates food detections into a priced cart, walks the operator
//! through review and payment, and exports a plain-text invoice.

mod catalog;
mod cart;
mod session;
mod checkout;
mod detect;
mod payment;
mod invoice;
mod storage;
mod config;
mod shared;
mod app;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::TrayTillApp;
use crate::catalog::Catalog;
use crate::checkout::{CheckoutReview, ConfirmationPrompt};
use crate::config::AppConfig;
use crate::detect::{ImageInput, StoredDetector};
use crate::payment::PaymentMethod;
use crate::session::ActiveOrder;
use crate::storage::history::HistoryLog;

/// Tray Till - vision-assisted canteen checkout
#[derive(Parser, Debug)]
#[command(name = "tray-till")]
#[command(about = "Turns food detections into a priced cart, payment and invoice")]
struct Args {
    /// Detection files to process, each a JSON array of {label, confidence}
    #[arg(
        value_name = "DETECTIONS",
        required_unless_present_any = ["list_catalog", "clear_history", "export_history"]
    )]
    inputs: Vec<PathBuf>,

    /// Catalog file to use instead of the configured one
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Adjust a line before checkout, as KEY=DELTA (repeatable)
    #[arg(long, value_name = "KEY=DELTA")]
    adjust: Vec<String>,

    /// Exclude a line from billing (repeatable)
    #[arg(long, value_name = "KEY")]
    exclude: Vec<String>,

    /// Payment method code to settle with (cash, momo, zalopay, vietqr)
    #[arg(long, value_name = "CODE")]
    pay: Option<String>,

    /// Wait for a phone-side confirmation instead of paying in-app
    #[arg(long, conflicts_with = "pay")]
    listen: bool,

    /// Answer yes to the checkout confirmation
    #[arg(long)]
    yes: bool,

    /// Settle without writing the invoice file
    #[arg(long)]
    skip_invoice: bool,

    /// Print the catalog and exit
    #[arg(long)]
    list_catalog: bool,

    /// Write the detection history to a file and exit
    #[arg(long, value_name = "FILE")]
    export_history: Option<PathBuf>,

    /// Clear the detection history and exit
    #[arg(long)]
    clear_history: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = load_or_create_config();
    let mut history = open_history(&config);

    // History maintenance modes
    if let Some(path) = &args.export_history {
        history
            .export(path)
            .with_context(|| format!("failed to export history to {:?}", path))?;
        println!("Exported {} record(s) to {:?}", history.len(), path);
        return Ok(());
    }
    if args.clear_history {
        history.clear();
        println!("Detection history cleared.");
        return Ok(());
    }

    let catalog = load_catalog(&config, args.catalog.as_deref());

    // List catalog mode
    if args.list_catalog {
        print_catalog(&catalog);
        return Ok(());
    }

    info!("Tray Till starting...");

    let mut till = TrayTillApp::new(config, catalog, history);

    let batch: Vec<ImageInput> = args.inputs.iter().cloned().map(ImageInput::Upload).collect();
    till.start_detection(Box::new(StoredDetector), batch);
    if !till.wait_for_detection() {
        if let Some(error) = till.runtime.read().last_error.clone() {
            bail!("detection failed: {}", error);
        }
        println!("Nothing detected.");
        return Ok(());
    }

    apply_adjustments(&mut till, &args)?;

    if let Some(order) = till.active_order() {
        print_order(order);
    }

    // Pre-payment review
    let mut prompt = ConsolePrompt {
        assume_yes: args.yes,
    };
    let confirmed = till
        .active_order()
        .map(|order| order.validate_checkout(&mut prompt))
        .unwrap_or(false);
    if !confirmed {
        println!("Checkout not confirmed; order stays open (unpaid).");
        return Ok(());
    }

    if args.listen {
        wait_for_phone_confirmation(&mut till)?;
    } else {
        let method = PaymentMethod::from_code(args.pay.as_deref().unwrap_or("cash"));
        if !till.confirm_payment(method) {
            bail!("payment was not accepted");
        }
    }

    // Settled; close the order out
    if args.skip_invoice {
        till.skip_invoice();
        println!("Paid. Invoice skipped.");
    } else {
        let path = till.export_invoice()?;
        println!("Invoice saved to {:?}", path);
    }

    info!("Tray Till shutdown complete");

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        } else {
            let config = AppConfig::default();
            match config::save_config(&config, &config_path) {
                Ok(()) => info!("Wrote default configuration to {:?}", config_path),
                Err(e) => warn!("Could not write default configuration: {:#}", e),
            }
            return config;
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Open the detection journal at its configured location.
fn open_history(config: &AppConfig) -> HistoryLog {
    let path = match storage::get_data_dir() {
        Ok(dir) => dir.join(&config.history.file_name),
        Err(e) => {
            warn!(
                "Data directory unavailable ({}); keeping history in the working directory",
                e
            );
            PathBuf::from(&config.history.file_name)
        }
    };
    HistoryLog::open(path, config.history.max_records)
}

/// Load the food catalog, honoring a command-line override.
fn load_catalog(config: &AppConfig, override_path: Option<&Path>) -> Catalog {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => storage::resolve_data_path(&config.catalog.data_file),
    };
    let catalog = match Catalog::load(&path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Catalog unavailable ({}); labels will price at zero", e);
            Catalog::default()
        }
    };
    if catalog.is_empty() {
        warn!("Catalog is empty; every detection will use the fallback entry");
    }
    catalog
}

/// Parse a KEY=DELTA adjustment. The delta accepts a leading sign.
fn parse_adjustment(raw: &str) -> Result<(String, i32)> {
    let (key, delta) = raw
        .split_once('=')
        .with_context(|| format!("invalid adjustment '{}', expected KEY=DELTA", raw))?;
    let delta: i32 = delta
        .trim()
        .parse()
        .with_context(|| format!("invalid delta in '{}'", raw))?;
    Ok((key.trim().to_string(), delta))
}

/// Apply `--adjust` and `--exclude` edits to the open order.
fn apply_adjustments(till: &mut TrayTillApp, args: &Args) -> Result<()> {
    let order = till
        .active_order_mut()
        .context("order missing after detection")?;
    for raw in &args.adjust {
        let (key, delta) = parse_adjustment(raw)?;
        if !order.change_quantity(&key, delta) {
            warn!("Adjustment '{}' had no effect", raw);
        }
    }
    for key in &args.exclude {
        if !order.exclude(key) {
            warn!("Exclusion of '{}' had no effect", key);
        }
    }
    Ok(())
}

/// Print the open order the way the operator sees it.
fn print_order(order: &ActiveOrder) {
    let session = order.session();
    println!();
    println!(
        "Order {} ({}) - {} detection(s)",
        session.id,
        session.status.as_str(),
        order.detections().len()
    );
    for item in order.cart().items() {
        let marker = if item.excluded { " [excluded]" } else { "" };
        println!(
            "  {:<25} x{:<3} {:>10}đ  (detected {}, conf {:.2}){}",
            item.display_name,
            item.quantity,
            item.line_total(),
            item.detected_qty,
            item.avg_confidence,
            marker
        );
    }
    let totals = order.totals();
    println!(
        "  Total: {} item(s), {}đ, {} kcal",
        totals.items, totals.price, totals.calories
    );
    println!();
}

/// Print every catalog entry, sorted by key.
fn print_catalog(catalog: &Catalog) {
    println!("Catalog ({} item(s)):", catalog.len());
    for (key, entry) in catalog.iter_sorted() {
        println!(
            "  {:<22} {:<22} {:>8}đ {:>6} kcal  {:>5.1}g P {:>5.1}g C {:>5.1}g F",
            key, entry.name_vi, entry.price, entry.calories, entry.protein, entry.carbs, entry.fat
        );
    }
}

/// Checkout confirmation over stdin.
struct ConsolePrompt {
    assume_yes: bool,
}

impl ConfirmationPrompt for ConsolePrompt {
    fn warn_empty_cart(&mut self) {
        println!("Giỏ hàng trống!");
    }

    fn confirm_review(&mut self, review: &CheckoutReview) -> bool {
        println!("{}", review.summary());
        if self.assume_yes {
            println!("(--yes)");
            return true;
        }
        print!("[y/N] ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim(), "y" | "Y")
    }
}

/// Advertise the confirmation page and block until the phone hits it.
fn wait_for_phone_confirmation(till: &mut TrayTillApp) -> Result<()> {
    till.start_payment_listener();
    let url = match till.runtime.read().payment_page_url.clone() {
        Some(url) => url,
        None => bail!("payment listener is unavailable; retry with --pay"),
    };
    println!(
        "Scan to pay: {}",
        payment::qr_content(Some(&url), &PaymentMethod::VietQr)
    );
    println!("Waiting for confirmation from the phone...");
    while till
        .active_order()
        .map(|order| order.session().is_unpaid())
        .unwrap_or(false)
    {
        till.pump_one(Duration::from_millis(500));
    }
    Ok(())
}
