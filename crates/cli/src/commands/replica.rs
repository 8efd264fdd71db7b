//! Replica store management commands.
//!
//! # Usage
//!
//! ```bash
//! despacho replica init
//! despacho replica sync --payment-status PAID
//! despacho replica list --collection orders
//! despacho replica drop --collection shipments
//! ```

use despacho_fulfillment::replica::Collection;

use super::{CollectionArg, CommandError, OrderSelection, context, select_orders};

/// Create every replica collection.
pub async fn init() -> Result<(), CommandError> {
    let ctx = context().await?;

    for collection in Collection::all() {
        ctx.engine.replica().create_collection(collection).await?;
        tracing::info!("Collection {} ready", collection.table());
    }
    Ok(())
}

/// Drop one replica collection.
pub async fn drop(collection: CollectionArg) -> Result<(), CommandError> {
    let ctx = context().await?;
    let collection = Collection::from(collection);

    ctx.engine.replica().drop_collection(collection).await?;
    tracing::info!("Collection {} dropped", collection.table());
    Ok(())
}

/// List the documents of one replica collection.
pub async fn list(collection: CollectionArg) -> Result<(), CommandError> {
    let ctx = context().await?;

    let documents = ctx.engine.replica().list(collection.into()).await?;
    tracing::info!("{} document(s)", documents.len());

    print_documents(&documents);
    Ok(())
}

/// Mirror the selected orders into the replica store.
pub async fn sync(selection: &OrderSelection) -> Result<(), CommandError> {
    let ctx = context().await?;
    let page = select_orders(&ctx.engine, selection).await?;

    tracing::info!("Replicating orders: {}", page.number_summary());
    let summary = ctx.engine.replicate_orders(&page.orders).await?;

    tracing::info!(
        "{} applied, {} unchanged",
        summary.applied,
        summary.unchanged
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_documents(documents: &[despacho_fulfillment::replica::ReplicaDocument]) {
    println!("{:<40} {:<28}", "Id", "Last updated");
    for document in documents {
        println!("{:<40} {:<28}", document.id, document.last_updated.to_rfc3339());
    }
}
