use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, Backend, ClientSettings, DetailsMode, MaterialCatalog, Navigator, PollPolicy,
    RequestState, StaticCatalog, WorkerDetails,
};
use serde::Serialize;
use shared::{
    domain::{BudgetRange, EstimateId, MaterialId, PaymentMethod, WorkerId},
    protocol::{MaterialQuery, WorkerPreview, WorkerSearchRequest, DEFAULT_MAX_RESULTS},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "renocost", about = "Renovation cost estimator client")]
struct Cli {
    /// Serve materials from the bundled snapshot instead of the backend.
    #[arg(long, global = true)]
    offline: bool,
    /// Print raw JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for workers matching a project.
    Search {
        #[arg(long)]
        project_type: String,
        #[arg(long)]
        location: String,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        min_trust_score: Option<u32>,
        #[arg(long, value_enum)]
        budget: Option<Budget>,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
    },
    /// Public preview of one worker.
    Preview { worker_id: String },
    /// Unlocked contact details of one worker.
    Details { worker_id: String },
    /// Start a contact unlock payment.
    Unlock {
        worker_id: String,
        #[arg(long, value_enum)]
        method: Method,
    },
    UnlockStatus { worker_id: String },
    /// List materials, optionally filtered.
    Materials {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    History { material_id: String },
    /// Wait for an estimate to finish and print it.
    Estimate {
        estimate_id: String,
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Budget {
    Low,
    Medium,
    High,
}

impl From<Budget> for BudgetRange {
    fn from(value: Budget) -> Self {
        match value {
            Budget::Low => Self::Low,
            Budget::Medium => Self::Medium,
            Budget::High => Self::High,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    CreditCard,
    BankTransfer,
    Gopay,
    Qris,
}

impl From<Method> for PaymentMethod {
    fn from(value: Method) -> Self {
        match value {
            Method::CreditCard => Self::CreditCard,
            Method::BankTransfer => Self::BankTransfer,
            Method::Gopay => Self::Gopay,
            Method::Qris => Self::Qris,
        }
    }
}

/// A terminal cannot follow a redirect, so the gateway URL is printed.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, url: &str) {
        println!("Complete the payment at: {url}");
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings();
    init_tracing(
        settings
            .as_ref()
            .map(|settings| settings.log_level.as_str())
            .unwrap_or("info"),
    );

    let connect = || -> Result<(ClientSettings, Backend)> {
        let settings = settings
            .as_ref()
            .map_err(|err| anyhow!("{err}"))
            .context("loading client settings")?
            .clone();
        info!(
            api = %settings.api_base_url,
            environment = settings.environment.as_str(),
            "using backend"
        );
        let backend = Backend::connect(&settings).context("building HTTP client")?;
        Ok((settings, backend))
    };

    match cli.command {
        Command::Search {
            project_type,
            location,
            min_trust_score,
            budget,
            max_results,
        } => {
            let (_, backend) = connect()?;
            let mut request =
                WorkerSearchRequest::new(project_type, location).max_results(max_results);
            if let Some(score) = min_trust_score {
                request = request.min_trust_score(score);
            }
            if let Some(budget) = budget {
                request = request.budget_range(budget.into());
            }

            let search = backend.search();
            search.search(request).await;
            let response = resolved(search.state())?;
            emit(&response, cli.json, |response| {
                println!(
                    "Found {} workers, showing {} (unlock {} each)",
                    response.total_found,
                    response.showing,
                    idr(response.unlock_price_idr)
                );
                for worker in &response.workers {
                    print_preview(worker);
                }
            })?;
        }
        Command::Preview { worker_id } => {
            show_worker(&connect()?.1, DetailsMode::Preview, worker_id, cli.json).await?;
        }
        Command::Details { worker_id } => {
            show_worker(&connect()?.1, DetailsMode::Full, worker_id, cli.json).await?;
        }
        Command::Unlock { worker_id, method } => {
            let (settings, backend) = connect()?;
            let payments = backend.payments(Arc::new(TerminalNavigator), &settings);
            payments
                .initiate_unlock(&WorkerId::new(worker_id), method.into())
                .await;
            let response = resolved(payments.state())?;
            emit(&response, cli.json, |response| {
                println!(
                    "Transaction {} for {} expires at {}",
                    response.transaction_id,
                    idr(response.amount_idr),
                    response.expires_at
                );
            })?;
        }
        Command::UnlockStatus { worker_id } => {
            let (settings, backend) = connect()?;
            let payments = backend.payments(Arc::new(TerminalNavigator), &settings);
            let unlocked = payments
                .check_unlock_status(&WorkerId::new(worker_id.as_str()))
                .await;
            if cli.json {
                println!("{}", serde_json::json!({ "worker_id": worker_id, "unlocked": unlocked }));
            } else if unlocked {
                println!("{worker_id}: unlocked");
            } else {
                println!("{worker_id}: locked");
            }
        }
        Command::Materials { category, search } => {
            let catalog = catalog(cli.offline, connect)?;
            let query = MaterialQuery { category, search };
            let list = catalog
                .list(&query)
                .await
                .into_result()
                .context("listing materials")?;
            emit(&list, cli.json, |list| {
                for material in &list.materials {
                    println!(
                        "{:<28} {:<14} {:>14} / {:<6} ({}, {:.0}% confidence)",
                        material.id,
                        material.category,
                        idr(material.price_idr),
                        material.unit,
                        material.price_source,
                        material.confidence * 100.0
                    );
                }
                println!("{} materials", list.materials.len());
            })?;
        }
        Command::History { material_id } => {
            let catalog = catalog(cli.offline, connect)?;
            let history = catalog
                .history(&MaterialId::new(material_id))
                .await
                .into_result()
                .context("loading price history")?;
            emit(&history, cli.json, |history| {
                println!("Price history for {}", history.material_id);
                for point in &history.price_history {
                    println!("  {}  {:>14}  {}", point.date, idr(point.price_idr), point.source);
                }
            })?;
        }
        Command::Estimate {
            estimate_id,
            interval_secs,
            timeout_secs,
        } => {
            let (_, backend) = connect()?;
            let poller = backend.estimate_poller(PollPolicy {
                interval: Duration::from_secs(interval_secs.max(1)),
                timeout: Duration::from_secs(timeout_secs.max(1)),
            });
            let handle = poller.start(EstimateId::new(estimate_id));
            let mut events = handle.subscribe();
            let progress = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(state) => {
                            if let Some(status) = state.status {
                                eprintln!("[{status}] {}%", state.progress_percentage);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => debug!(skipped, "progress lagged"),
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            let done = handle.wait().await;
            if let Err(err) = progress.await {
                debug!(error = %err, "progress reporter ended abnormally");
            }
            if let Some(err) = done.error {
                return Err(anyhow!(err)).context(format!("estimate {}", done.estimate_id));
            }
            let estimate = done
                .result
                .ok_or_else(|| anyhow!("estimate poll ended without a result"))?;
            emit(&estimate, cli.json, |estimate| {
                println!("Estimate {} ({})", estimate.estimate_id, estimate.project_type);
                for item in &estimate.bom_items {
                    println!(
                        "  {:<32} {:>8.2} {:<6} {:>14}",
                        item.material_name,
                        item.quantity,
                        item.unit,
                        idr(item.total_price_idr)
                    );
                }
                println!("  materials {:>14}", idr(estimate.total_cost_idr));
                println!("  labor     {:>14}", idr(estimate.labor_cost_idr));
                println!("  total     {:>14}", idr(estimate.grand_total_idr));
            })?;
        }
    }

    Ok(())
}

fn catalog(
    offline: bool,
    connect: impl FnOnce() -> Result<(ClientSettings, Backend)>,
) -> Result<Arc<dyn MaterialCatalog>> {
    if offline {
        let catalog = StaticCatalog::embedded().context("bundled materials snapshot is invalid")?;
        return Ok(Arc::new(catalog));
    }
    Ok(connect()?.1.materials)
}

async fn show_worker(
    backend: &Backend,
    mode: DetailsMode,
    worker_id: String,
    json: bool,
) -> Result<()> {
    let details = backend.details(mode);
    details.set_worker_id(Some(WorkerId::new(worker_id))).await;
    match resolved(details.state())? {
        WorkerDetails::Preview(preview) => emit(&preview, json, print_preview),
        WorkerDetails::Full(full) => emit(&full, json, |full| {
            println!("{} ({})", full.business_name, full.id);
            println!(
                "  trust {} ({:?}), {} reviews",
                full.trust_score.total_score,
                full.trust_score.trust_level,
                full.trust_score.review_count
            );
            for (label, value) in [
                ("phone", &full.contact.phone),
                ("whatsapp", &full.contact.whatsapp),
                ("email", &full.contact.email),
                ("website", &full.contact.website),
            ] {
                if let Some(value) = value {
                    println!("  {label:<9}{value}");
                }
            }
            println!("  area     {}", full.location.area);
            if !full.negotiation_script.is_empty() {
                println!("  tip      {}", full.negotiation_script);
            }
        }),
    }
}

fn resolved<T>(state: RequestState<T>) -> Result<T> {
    match (state.data, state.error) {
        (_, Some(err)) => Err(err.into()),
        (Some(data), None) => Ok(data),
        (None, None) => bail!("request finished without data"),
    }
}

fn emit<T: Serialize>(value: &T, json: bool, render: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render(value);
    }
    Ok(())
}

fn print_preview(worker: &WorkerPreview) {
    println!(
        "{:<12} {:<32} trust {:>3}  {:<10} {}",
        worker.id,
        worker.preview_name,
        worker.trust_score.total_score,
        worker.location,
        worker
            .price_idr_per_day
            .map(|price| format!("{}/day", idr(price)))
            .unwrap_or_default()
    );
}

/// Rupiah with dot thousands separators, e.g. `Rp 1.250.000`.
fn idr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}
