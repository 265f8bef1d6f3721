use crate::session::error::{PlatformError, ReportError};
use crate::session::model::{ChannelKey, ReconciliationResult};
use crate::session::reporter::{ExportTable, HumanSummary, Reporter};
use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Summary(HumanSummary),
}

/// Platform reference to a delivered message or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryHandle(pub u64);

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, target: ChannelKey, message: Outbound) -> Result<DeliveryHandle, PlatformError>;

    /// Hands a materialized CSV payload to the platform.
    async fn export_artifact(
        &self,
        target: ChannelKey,
        payload: Vec<u8>,
        filename: &str,
    ) -> Result<DeliveryHandle, PlatformError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExportFailure {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Serializes `table` and sends it as a file. Empty tables never reach the
/// platform.
pub async fn deliver_export(
    delivery: &dyn Delivery,
    target: ChannelKey,
    table: &ExportTable,
    filename: &str,
) -> Result<DeliveryHandle, ExportFailure> {
    if table.is_empty() {
        return Err(ReportError::NoData.into());
    }
    let payload = table.to_csv()?;
    Ok(delivery.export_artifact(target, payload, filename).await?)
}

/// Delivers a summary for every closed session until the manager goes away.
/// Failures are logged and not retried.
pub async fn run_report_loop(
    mut results: mpsc::UnboundedReceiver<ReconciliationResult>,
    reporter: Reporter,
    delivery: impl Delivery,
) {
    while let Some(result) = results.recv().await {
        let summary = reporter.summarize(&result);
        match delivery.deliver(result.reply_to, Outbound::Summary(summary)).await {
            Ok(_) => tracing::info!(
                "Delivered results for session {} opened at {}",
                result.session_id,
                result.created_at
            ),
            Err(e) => tracing::error!("Failed to deliver results for session {}: {}", result.session_id, e),
        }
    }
    tracing::info!("Report loop stopped");
}
