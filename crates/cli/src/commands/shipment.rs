//! Shipment (pre-postagem) commands.
//!
//! # Usage
//!
//! ```bash
//! despacho shipment create -o 1021
//! despacho shipment cancel -o 1021
//! despacho shipment query --status PREATENDIDO --payment-mode A_FATURAR
//! despacho shipment declaration -o 1021
//! ```

use super::{CommandError, ShipmentQueryArgs, context};

/// Create a pre-postagem for an order and record the fulfillment.
pub async fn create(order_number: &str) -> Result<(), CommandError> {
    let ctx = context().await?;

    tracing::info!("Creating shipment for order {order_number}...");
    let record = ctx.engine.create_shipment(order_number).await?;

    tracing::info!(
        "Shipment created: object code {}",
        record.object_code.as_deref().unwrap_or("<none>")
    );
    Ok(())
}

/// Cancel an order's pre-postagens and delete its fulfillments.
pub async fn cancel(order_number: &str) -> Result<(), CommandError> {
    let ctx = context().await?;

    tracing::info!("Canceling shipments for order {order_number}...");
    let report = ctx.engine.cancel_shipment(order_number).await?;

    for object_code in &report.canceled {
        tracing::info!("Canceled {object_code}");
    }
    for failed in &report.failed {
        tracing::warn!("Cancel of {} failed: {}", failed.object_code, failed.error);
    }
    Ok(())
}

/// Query pre-postagens at the carrier and print one line per record.
pub async fn query(args: &ShipmentQueryArgs) -> Result<(), CommandError> {
    let query = args.to_query()?;
    let ctx = context().await?;

    let records = ctx.engine.shipments(&query).await?;
    tracing::info!("{} pre-postagens", records.len());

    print_records(&records);
    Ok(())
}

/// Download an order's HTML content declaration.
pub async fn declaration(order_number: &str) -> Result<(), CommandError> {
    let ctx = context().await?;

    match ctx.engine.download_content_declaration(order_number).await? {
        Some(path) => tracing::info!("Declaration written to {}", path.display()),
        None => tracing::warn!("No content declaration available for order {order_number}"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_records(records: &[despacho_fulfillment::carrier::ShipmentRecord]) {
    println!(
        "{:<40} {:<16} {:<12} {:<8}",
        "Id", "Object code", "Status", "Service"
    );
    for record in records {
        println!(
            "{:<40} {:<16} {:<12} {:<8}",
            record.id.as_deref().unwrap_or(""),
            record.object_code.as_deref().unwrap_or(""),
            record.status.map_or("", |status| status.as_str()),
            record.service_code.as_deref().unwrap_or(""),
        );
    }
}
