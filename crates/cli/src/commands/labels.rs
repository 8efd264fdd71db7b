//! Label download command.
//!
//! # Usage
//!
//! ```bash
//! despacho labels --payment-status PAID --fulfillment-status FULFILLED
//! despacho labels --numbers 1021,1022
//! ```

use super::{CommandError, OrderSelection, context, select_orders};

/// Request and download the PDF labels for the selected orders.
pub async fn download(selection: &OrderSelection) -> Result<(), CommandError> {
    let ctx = context().await?;
    let page = select_orders(&ctx.engine, selection).await?;

    tracing::info!(
        "Requesting labels for orders: {}",
        page.number_summary()
    );

    match ctx.engine.download_labels(&page.orders).await? {
        Some(path) => tracing::info!("Labels written to {}", path.display()),
        None => tracing::warn!("No labels available (nothing tracked, or generation not ready)"),
    }
    Ok(())
}
