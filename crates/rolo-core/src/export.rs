//! One-way export of approved cards to an external ledger.

use std::future::Future;

use crate::card::CardRecord;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receives cards created by the privileged submitter.
///
/// Pushes run on a background task spawned by the lifecycle manager, which
/// logs and drops failures. A slow or failing sink never delays or fails a
/// submission.
pub trait ExportSink: Send + Sync + 'static {
  fn push<'a>(
    &'a self,
    card: &'a CardRecord,
  ) -> impl Future<Output = Result<(), SinkError>> + Send + 'a;
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExport;

impl ExportSink for NoExport {
  async fn push(&self, _card: &CardRecord) -> Result<(), SinkError> { Ok(()) }
}

/// An optional sink; `None` behaves like [`NoExport`].
impl<T: ExportSink> ExportSink for Option<T> {
  async fn push(&self, card: &CardRecord) -> Result<(), SinkError> {
    match self {
      Some(sink) => sink.push(card).await,
      None => Ok(()),
    }
  }
}
