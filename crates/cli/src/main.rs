//! Despacho CLI - order fulfillment through the carrier.
//!
//! # Usage
//!
//! ```bash
//! # Create a shipment (pre-postagem) for one order
//! despacho shipment create -o 1021
//!
//! # Cancel an order's shipments and remove its fulfillments
//! despacho shipment cancel -o 1021
//!
//! # Query pre-postagens at the carrier
//! despacho shipment query --status PREATENDIDO
//!
//! # Download the PDF labels for paid, unshipped orders
//! despacho labels --payment-status PAID --fulfillment-status NOT_FULFILLED
//!
//! # Address-quality report and bulk correction
//! despacho report addresses --created-after 2024-03-01T00:00:00Z
//! despacho addresses --numbers 1021,1022,1023
//!
//! # Replica store management
//! despacho replica init
//! despacho replica sync --payment-status PAID
//! ```
//!
//! # Commands
//!
//! - `shipment` - create/cancel/query pre-postagens, download declarations
//! - `fulfillment` - create/delete storefront fulfillment records
//! - `labels` - batch PDF label download
//! - `addresses` - bulk address-correction submission
//! - `report` - address-consistency and warehouse-pickup reports
//! - `replica` - replica store management

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::{CollectionArg, OrderSelection, ShipmentQueryArgs};

#[derive(Parser)]
#[command(name = "despacho")]
#[command(author, version, about = "Order fulfillment bridge for Correios-style shipping")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage carrier shipments (pre-postagens)
    Shipment {
        #[command(subcommand)]
        action: ShipmentAction,
    },
    /// Manage storefront fulfillment records
    Fulfillment {
        #[command(subcommand)]
        action: FulfillmentAction,
    },
    /// Download PDF labels for the selected orders' shipments
    Labels {
        #[command(flatten)]
        selection: OrderSelection,
    },
    /// Submit the selected orders to the bulk address-correction service
    Addresses {
        #[command(flatten)]
        selection: OrderSelection,
    },
    /// Data-quality and warehouse reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// Manage the order/shipment replica store
    Replica {
        #[command(subcommand)]
        action: ReplicaAction,
    },
}

#[derive(Subcommand)]
enum ShipmentAction {
    /// Create a pre-postagem for an order and record the fulfillment
    Create {
        /// Order number
        #[arg(short, long)]
        order: String,
    },
    /// Cancel an order's pre-postagens and delete its fulfillments
    Cancel {
        /// Order number
        #[arg(short, long)]
        order: String,
    },
    /// Query pre-postagens at the carrier
    Query {
        #[command(flatten)]
        query: ShipmentQueryArgs,
    },
    /// Download the HTML content declaration for an order
    Declaration {
        /// Order number
        #[arg(short, long)]
        order: String,
    },
}

#[derive(Subcommand)]
enum FulfillmentAction {
    /// Create a fulfillment for an existing tracking code
    Create {
        /// Order number
        #[arg(short, long)]
        order: String,

        /// Carrier tracking code
        #[arg(short, long)]
        tracking: String,
    },
    /// Delete one fulfillment (by id) or all of them
    Delete {
        /// Order number
        #[arg(short, long)]
        order: String,

        /// Fulfillment id; omit to delete all
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Orders whose street diverges from the carrier's postal database
    Addresses {
        #[command(flatten)]
        selection: OrderSelection,
    },
    /// Aggregated product quantities for warehouse pickup
    Pickup {
        #[command(flatten)]
        selection: OrderSelection,
    },
}

#[derive(Subcommand)]
enum ReplicaAction {
    /// Create the replica collections
    Init,
    /// Drop one replica collection
    Drop {
        /// Collection to drop
        #[arg(long, value_enum)]
        collection: CollectionArg,
    },
    /// List the documents of one replica collection
    List {
        /// Collection to list
        #[arg(long, value_enum)]
        collection: CollectionArg,
    },
    /// Mirror the selected orders into the replica store
    Sync {
        #[command(flatten)]
        selection: OrderSelection,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Shipment { action } => match action {
            ShipmentAction::Create { order } => commands::shipment::create(&order).await?,
            ShipmentAction::Cancel { order } => commands::shipment::cancel(&order).await?,
            ShipmentAction::Query { query } => commands::shipment::query(&query).await?,
            ShipmentAction::Declaration { order } => {
                commands::shipment::declaration(&order).await?;
            }
        },
        Commands::Fulfillment { action } => match action {
            FulfillmentAction::Create { order, tracking } => {
                commands::fulfillment::create(&order, &tracking).await?;
            }
            FulfillmentAction::Delete { order, id } => {
                commands::fulfillment::delete(&order, id.as_deref()).await?;
            }
        },
        Commands::Labels { selection } => commands::labels::download(&selection).await?,
        Commands::Addresses { selection } => commands::addresses::correct(&selection).await?,
        Commands::Report { kind } => match kind {
            ReportKind::Addresses { selection } => commands::report::addresses(&selection).await?,
            ReportKind::Pickup { selection } => commands::report::pickup(&selection).await?,
        },
        Commands::Replica { action } => match action {
            ReplicaAction::Init => commands::replica::init().await?,
            ReplicaAction::Drop { collection } => commands::replica::drop(collection).await?,
            ReplicaAction::List { collection } => commands::replica::list(collection).await?,
            ReplicaAction::Sync { selection } => commands::replica::sync(&selection).await?,
        },
    }
    Ok(())
}
