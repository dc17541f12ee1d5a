use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dari_api::build_app;
use dari_core::catalog::governorate_label;
use dari_core::format::{format_price, format_relative_date};
use dari_core::models::{ListingCategory, ListingStatus, ListingType, ProCategory};
use dari_core::validate::{ListingFilters, ProFilters};
use dari_core::Locale;
use dari_observability::{init_tracing, AppMetrics};
use dari_services::MarketplaceService;
use dari_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "dari")]
#[command(about = "Dari marketplace CLI")]
struct Cli {
    #[arg(long, default_value = "fr")]
    locale: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Serve {
        #[arg(long, env = "DARI_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },
    Seed,
    Listings {
        #[command(subcommand)]
        command: ListingsCommand,
    },
    Pros {
        #[command(subcommand)]
        command: ProsCommand,
    },
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ListingsCommand {
    Search {
        #[arg(long)]
        listing_type: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        governorate: Option<String>,
        #[arg(long)]
        min_price: Option<i64>,
        #[arg(long)]
        max_price: Option<i64>,
        #[arg(long)]
        rooms: Option<i32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 12)]
        limit: u32,
    },
    Show {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum ProsCommand {
    Search {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        governorate: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    Queue {
        #[arg(long, default_value = "admin")]
        actor: String,
    },
    Moderate {
        id: String,
        #[arg(long)]
        status: String,
        #[arg(long, default_value = "admin")]
        actor: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("dari_cli");
    let cli = Cli::parse();

    let locale = Locale::from_optional_str(Some(&cli.locale));

    match cli.command {
        Command::Serve { bind } => {
            let app = build_app().await?;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            tracing::info!(bind = %bind, "dari marketplace api started");
            axum::serve(listener, app).await?;
        }
        command => run_command(command, locale).await?,
    }

    Ok(())
}

async fn run_command(command: Command, locale: Locale) -> Result<()> {
    let service = build_service().await?;

    match command {
        // serve is dispatched in main before a store is built
        Command::Serve { .. } => unreachable!(),
        Command::Seed => {
            let summary = service.seed_demo_data().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Listings { command } => match command {
            ListingsCommand::Search {
                listing_type,
                category,
                governorate,
                min_price,
                max_price,
                rooms,
                search,
                page,
                limit,
            } => {
                let filters = ListingFilters {
                    listing_type: parse_flag(listing_type.as_deref(), ListingType::parse, "--listing-type")?,
                    category: parse_flag(category.as_deref(), ListingCategory::parse, "--category")?,
                    governorate,
                    min_price,
                    max_price,
                    rooms,
                    search,
                    page,
                    limit,
                };

                let result = service.browse_listings(filters, locale).await?;
                for card in &result.data {
                    let marker = if card.featured { "★" } else { " " };
                    println!(
                        "{marker} {} — {} — {}, {} — {}",
                        card.display_title,
                        format_price(card.price, locale, &card.price_currency),
                        card.city,
                        governorate_label(&card.governorate, locale),
                        format_relative_date(card.created_at, chrono::Utc::now(), locale),
                    );
                }
                println!(
                    "\npage {}/{} ({} listings)",
                    result.pagination.page, result.pagination.total_pages, result.pagination.total
                );
            }
            ListingsCommand::Show { id } => {
                let detail = service.listing_detail(&id, locale).await?;
                println!("{}", serde_json::to_string_pretty(&detail)?);
            }
        },
        Command::Pros { command } => match command {
            ProsCommand::Search {
                category,
                governorate,
                search,
            } => {
                let filters = ProFilters {
                    category: parse_flag(category.as_deref(), ProCategory::parse, "--category")?,
                    governorate,
                    search,
                    ..ProFilters::default()
                };

                let result = service.list_pros(filters, locale).await?;
                for card in &result.data {
                    let badge = if card.verified { "✓" } else { " " };
                    println!(
                        "{badge} {} — {} — {:.1} ({} avis)",
                        card.display_business_name,
                        card.category_label,
                        card.rating,
                        card.reviews_count,
                    );
                }
            }
        },
        Command::Admin { command } => match command {
            AdminCommand::Queue { actor } => {
                let profile = service.get_profile(&actor).await?;
                let queue = service.moderation_queue(&profile).await?;
                for listing in &queue {
                    println!(
                        "{} — {} — {}",
                        listing.id,
                        listing.title_fr,
                        format_price(listing.price, locale, &listing.price_currency),
                    );
                }
                println!("\n{} listing(s) waiting for review", queue.len());
            }
            AdminCommand::Moderate { id, status, actor } => {
                let status =
                    ListingStatus::parse(&status).context("invalid --status value")?;
                let profile = service.get_profile(&actor).await?;
                let listing = service.moderate_listing(&profile, &id, status).await?;
                println!("{} -> {}", listing.id, listing.status.as_code());
            }
        },
    }

    Ok(())
}

fn parse_flag<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    flag: &'static str,
) -> Result<Option<T>> {
    raw.map(|value| parse(value).with_context(|| format!("invalid {flag} value")))
        .transpose()
}

async fn build_service() -> Result<MarketplaceService<Store>> {
    let store = if let Ok(database_url) = env::var("DARI_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    Ok(MarketplaceService::new(
        Arc::new(store),
        AppMetrics::shared(),
    ))
}
