//! EasyBuy CLI - a terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! easybuy products --search ventilateur
//! easybuy product ventilateur-sur-pied
//!
//! # Fill the cart
//! easybuy cart add ventilateur-sur-pied -q 2
//! easybuy cart show
//!
//! # Sign in and order through WhatsApp
//! easybuy login -e awa@example.com -p secret
//! easybuy checkout --city 2
//! ```
//!
//! # Commands
//!
//! - `products`, `product`, `categories`, `cities` - Catalog
//! - `cart` - Show and edit the cart
//! - `login`, `register`, `logout`, `whoami` - Account
//! - `orders`, `order`, `checkout`, `cancel` - WhatsApp orders
//! - `support` - Chat link to customer support
//!
//! The cart and session live in the file named by `EASYBUY_STATE_FILE`, so
//! they survive between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easybuy_core::{CityId, OrderId, ProductId};
use easybuy_storefront::config::StorefrontConfig;
use easybuy_storefront::error::AppError;
use easybuy_storefront::navigation::MemoryNavigator;
use easybuy_storefront::notice::NoticeLog;
use easybuy_storefront::state::AppState;
use easybuy_storefront::storage::FileStore;

mod commands;

#[derive(Parser)]
#[command(name = "easybuy")]
#[command(author, version, about = "EasyBuy terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Category slug
        #[arg(short, long)]
        category: Option<String>,

        /// Minimum unit price
        #[arg(long)]
        min_price: Option<Decimal>,

        /// Maximum unit price
        #[arg(long)]
        max_price: Option<Decimal>,

        /// Only featured products
        #[arg(long)]
        featured: bool,

        /// Page number
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one product
    Product {
        /// Product slug
        slug: String,
    },
    /// List categories
    Categories,
    /// List delivery cities
    Cities,
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register(commands::account::RegisterArgs),
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your orders
    Orders,
    /// Order one product through WhatsApp
    Order {
        /// Product slug
        slug: String,

        /// Delivery city ID (see `cities`)
        #[arg(long)]
        city: CityId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Order the whole cart through WhatsApp
    Checkout {
        /// Delivery city ID (see `cities`)
        #[arg(long)]
        city: CityId,
    },
    /// Cancel an open order
    Cancel {
        /// Order ID
        id: OrderId,
    },
    /// Get a WhatsApp link to customer support
    Support {
        /// Message to prefill
        message: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product slug
        slug: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a product; 0 removes it
    Set {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
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

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => return commands::fail(&AppError::from(e)),
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to warnings only so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "easybuy_storefront=warn,easybuy=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let notices = Arc::new(NoticeLog::new());
    let store = Arc::new(FileStore::new(config.state_file.clone()));
    let state = match AppState::new(
        config,
        store,
        notices.clone(),
        Arc::new(MemoryNavigator::default()),
    ) {
        Ok(state) => state,
        Err(e) => return commands::fail(&AppError::from(e)),
    };

    state.session().start().await;

    let result = run(&state, cli).await;
    commands::print_notices(&notices.drain());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => commands::fail(&e),
    }
}

async fn run(state: &AppState, cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Products {
            search,
            category,
            min_price,
            max_price,
            featured,
            page,
        } => {
            let filters = easybuy_storefront::models::ProductFilters {
                category,
                min_price,
                max_price,
                search,
                is_featured: featured.then_some(true),
                page,
                ..Default::default()
            };
            commands::catalog::products(state, &filters).await?;
        }
        Commands::Product { slug } => commands::catalog::product(state, &slug).await?,
        Commands::Categories => commands::catalog::categories(state).await?,
        Commands::Cities => commands::catalog::cities(state).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state),
            CartAction::Add { slug, quantity } => {
                commands::cart::add(state, &slug, quantity).await?;
            }
            CartAction::Set { id, quantity } => commands::cart::set(state, id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(state, id),
            CartAction::Clear => commands::cart::clear(state),
        },
        Commands::Login { email, password } => {
            commands::account::login(state, email, password).await?;
        }
        Commands::Register(args) => commands::account::register(state, args).await?,
        Commands::Logout => commands::account::logout(state).await,
        Commands::Whoami => commands::account::whoami(state).await?,
        Commands::Orders => commands::orders::history(state).await?,
        Commands::Order {
            slug,
            city,
            quantity,
        } => commands::orders::order_product(state, &slug, city, quantity).await?,
        Commands::Checkout { city } => commands::orders::checkout(state, city).await?,
        Commands::Cancel { id } => commands::orders::cancel(state, id).await?,
        Commands::Support { message } => commands::orders::support(state, &message)?,
    }
    Ok(())
}
