//! Storefront fulfillment commands.
//!
//! # Usage
//!
//! ```bash
//! despacho fulfillment create -o 1021 -t AA123456789BR
//! despacho fulfillment delete -o 1021
//! despacho fulfillment delete -o 1021 --id f1
//! ```

use super::{CommandError, context};

/// Create a fulfillment on an order for an existing tracking code.
pub async fn create(order_number: &str, tracking_number: &str) -> Result<(), CommandError> {
    let ctx = context().await?;

    ctx.engine
        .create_fulfillment(order_number, tracking_number)
        .await?;

    tracing::info!("Fulfillment recorded on order {order_number} for {tracking_number}");
    Ok(())
}

/// Delete one fulfillment (by id) or all of them from an order.
pub async fn delete(order_number: &str, fulfillment_id: Option<&str>) -> Result<(), CommandError> {
    let ctx = context().await?;

    let deleted = ctx
        .engine
        .delete_fulfillments(order_number, fulfillment_id)
        .await?;

    tracing::info!("{deleted} fulfillment(s) deleted from order {order_number}");
    Ok(())
}
