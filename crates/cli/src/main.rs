//! TechMart CLI - Browse the catalog, manage the cart, administer products.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! techmart products list
//! techmart products show 7f1c0d2e-...
//!
//! # Cart (persisted between runs)
//! techmart cart add 7f1c0d2e-... --quantity 2
//! techmart cart set 7f1c0d2e-... 5
//! techmart cart show
//!
//! # Admin (needs SUPABASE_SERVICE_ROLE_KEY)
//! techmart admin create --name "USB-C charger" --price 12500 --image charger.png
//! techmart admin update 7f1c0d2e-... --price 11000
//! techmart admin delete 7f1c0d2e-...
//! ```
//!
//! # Commands
//!
//! - `products` - List and show products
//! - `cart` - Inspect and change the saved cart
//! - `admin` - Create, update and delete products

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use techmart_core::{Price, ProductId};
use techmart_storefront::{AppError, StorefrontConfig};

mod commands;
mod render;

/// Largest quantity a single `cart add` may add.
const MAX_ADD_QUANTITY: u32 = 10;

#[derive(Parser)]
#[command(name = "techmart")]
#[command(author, version, about = "TechMart storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage products (service-role key required)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List all products, newest first
    List,
    /// Show one product
    Show {
        /// Product id
        id: ProductId,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        id: ProductId,

        /// How many to add (1-10)
        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_ADD_QUANTITY))
        )]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        id: ProductId,
    },
    /// Set a line's quantity (0 or less removes it)
    Set {
        /// Product id
        id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a product
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Price in major currency units (e.g. 12500 or 999.99)
        #[arg(short, long)]
        price: Price,

        /// Product description
        #[arg(short, long)]
        description: Option<String>,

        /// Image file to upload (repeatable)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
    },
    /// Update a product; omitted fields are unchanged
    Update {
        /// Product id
        id: ProductId,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New price
        #[arg(short, long)]
        price: Option<Price>,

        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,

        /// Image file to upload and append (repeatable)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,
    },
    /// Delete a product
    Delete {
        /// Product id
        id: ProductId,
    },
}

fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is loaded first so Sentry can be initialized before tracing
    let config = StorefrontConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "techmart_storefront=info,techmart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(AppError::from(e)),
    };

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.capture();
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "error: {}", e.user_message());
            if e.is_retryable() {
                let _ = writeln!(stderr, "Please try again.");
            }
            ExitCode::FAILURE
        }
    };

    // Flush pending Sentry events before exiting
    drop(sentry_guard);
    code
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), AppError> {
    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List => commands::products::list(config).await,
            ProductsAction::Show { id } => commands::products::show(config, &id).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(config).await,
            CartAction::Add { id, quantity } => commands::cart::add(config, &id, quantity).await,
            CartAction::Remove { id } => commands::cart::remove(config, &id).await,
            CartAction::Set { id, quantity } => commands::cart::set(config, &id, quantity).await,
            CartAction::Clear => commands::cart::clear(config).await,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                name,
                price,
                description,
                images,
            } => commands::admin::create(config, name, price, description, &images).await,
            AdminAction::Update {
                id,
                name,
                price,
                description,
                images,
            } => commands::admin::update(config, &id, name, price, description, &images).await,
            AdminAction::Delete { id } => commands::admin::delete(config, &id).await,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cart_add_defaults_to_one() {
        let cli = Cli::try_parse_from(["techmart", "cart", "add", "p1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Add { quantity: 1, .. }
            }
        ));
    }

    #[test]
    fn test_cart_add_quantity_range() {
        assert!(Cli::try_parse_from(["techmart", "cart", "add", "p1", "-q", "10"]).is_ok());
        assert!(Cli::try_parse_from(["techmart", "cart", "add", "p1", "-q", "0"]).is_err());
        assert!(Cli::try_parse_from(["techmart", "cart", "add", "p1", "-q", "11"]).is_err());
    }

    #[test]
    fn test_cart_set_accepts_negative() {
        let cli = Cli::try_parse_from(["techmart", "cart", "set", "p1", "-3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Set { quantity: -3, .. }
            }
        ));
    }

    #[test]
    fn test_admin_create_parses_price_and_images() {
        let cli = Cli::try_parse_from([
            "techmart", "admin", "create", "--name", "Charger", "--price", "12500.50", "--image",
            "a.png", "--image", "b.jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Admin {
                action: AdminAction::Create { price, images, .. },
            } => {
                assert_eq!(price, Price::parse("12500.5").unwrap());
                assert_eq!(images, [PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
            }
            _ => panic!("expected admin create"),
        }
    }

    #[test]
    fn test_admin_create_rejects_negative_price() {
        assert!(
            Cli::try_parse_from(["techmart", "admin", "create", "--name", "X", "--price", "-5"])
                .is_err()
        );
    }
}
