//! ENF shop CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! enf-cli migrate
//!
//! # Create a customer or an administrator (password from ENF_PASSWORD)
//! enf-cli user create -e ada@example.com -f Ada -l Lovelace
//! ENF_PASSWORD=... enf-cli user create-superuser -e root@example.com
//!
//! # Load categories, products and sizes from YAML
//! enf-cli seed catalog data/catalog.yaml
//!
//! # Move an order through its lifecycle
//! enf-cli order status 42 shipped
//!
//! # Record the payment id a provider issued for an order
//! enf-cli order payment 42 stripe pi_3NqLx2
//!
//! # Delete carts untouched for 30 days
//! enf-cli cart purge --older-than-days 30
//! ```
//!
//! All commands read the database settings the storefront uses
//! (`DATABASE_URL` or the `POSTGRES_*` variables, `.env` honored).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use enf_core::{OrderId, OrderStatus, PaymentProvider};

mod commands;

#[derive(Parser)]
#[command(name = "enf-cli")]
#[command(author, version, about = "ENF shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage shop users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Maintain session carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

/// Account fields shared by both user commands.
#[derive(clap::Args)]
struct UserArgs {
    /// Email address (login identity)
    #[arg(short, long)]
    email: String,

    /// First name
    #[arg(short, long, default_value = "")]
    first_name: String,

    /// Last name
    #[arg(short, long, default_value = "")]
    last_name: String,

    /// Password; the account cannot log in without one
    #[arg(long, env = "ENF_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a customer account
    Create {
        #[command(flatten)]
        user: UserArgs,

        /// Grant staff access
        #[arg(long)]
        staff: bool,
    },
    /// Create an administrator (staff and superuser)
    CreateSuperuser {
        #[command(flatten)]
        user: UserArgs,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load categories, products, sizes and images from a YAML file
    Catalog {
        /// Path to the YAML file
        path: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Move an order to a new status
    Status {
        /// Order ID
        id: i64,

        /// New status (`pending`, `processing`, `shipped`, `delivered`, `cancelled`)
        status: OrderStatus,
    },
    /// Record the payment id a provider issued for an order
    Payment {
        /// Order ID
        id: i64,

        /// Payment provider (`stripe`, `heleket`)
        provider: PaymentProvider,

        /// Payment intent or payment id issued by the provider
        reference: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Delete carts that have not changed for a while
    Purge {
        /// Age in days after which a cart is deleted
        #[arg(long, default_value_t = 30)]
        older_than_days: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { user, staff } => {
                commands::users::create(&user.into(), staff).await?;
            }
            UserAction::CreateSuperuser { user } => {
                commands::users::create_superuser(&user.into()).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { path } => commands::seed::catalog(&path).await?,
        },
        Commands::Order { action } => match action {
            OrderAction::Status { id, status } => {
                commands::orders::set_status(OrderId::new(id), status).await?;
            }
            OrderAction::Payment {
                id,
                provider,
                reference,
            } => {
                commands::orders::attach_payment(OrderId::new(id), provider, &reference).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Purge { older_than_days } => {
                commands::carts::purge(older_than_days).await?;
            }
        },
    }
    Ok(())
}

impl From<UserArgs> for commands::users::NewAccount {
    fn from(args: UserArgs) -> Self {
        Self {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            password: args.password,
        }
    }
}
