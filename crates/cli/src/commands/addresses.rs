//! Bulk address-correction command.
//!
//! # Usage
//!
//! ```bash
//! despacho addresses --numbers 1021,1022,1023
//! ```

use super::{CommandError, OrderSelection, context, select_orders};

/// Submit the selected orders to the address-correction service.
pub async fn correct(selection: &OrderSelection) -> Result<(), CommandError> {
    let ctx = context().await?;
    let page = select_orders(&ctx.engine, selection).await?;

    tracing::info!(
        "Submitting correction batches for orders: {}",
        page.number_summary()
    );

    let outcome = ctx.engine.correct_addresses(&page.orders).await?;

    tracing::info!("{} batch(es) submitted", outcome.artifacts.len());
    for skipped in &outcome.skipped {
        tracing::warn!("Order {} skipped: {}", skipped.number, skipped.reason);
    }
    Ok(())
}
