//! [`AccessReader`]: a scanner wired to the validation gateway at one
//! access point.
//!
//! Scan events are validated in the order they were emitted, one request at
//! a time, so verdicts are prepended in scan order.

use std::sync::Arc;

use sicae_core::{ApiError, api::AccessApi, domain::AccessEvent};
use sicae_scan::{CaptureBackend, Decoder, FrameSource, ScanEvent, ScanState, Scanner};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::warn;
use uuid::Uuid;

use crate::gateway::ValidationGateway;

/// Where validation requests from this reader claim to come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderContext {
  pub access_point_id: Option<Uuid>,
  pub source_ip:       Option<String>,
}

/// One scan and the server's answer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOutcome {
  pub scan:   ScanEvent,
  pub result: Result<AccessEvent, ApiError>,
}

pub struct AccessReader {
  scanner:  Scanner,
  outcomes: mpsc::UnboundedReceiver<ReaderOutcome>,
  worker:   Option<JoinHandle<()>>,
}

impl AccessReader {
  pub fn spawn<A, B, D>(
    gateway: Arc<ValidationGateway<A>>,
    source: FrameSource<B>,
    decoder: D,
    ctx: ReaderContext,
  ) -> Self
  where
    A: AccessApi + 'static,
    B: CaptureBackend + 'static,
    D: Decoder + 'static,
  {
    let (scan_tx, mut scans) = mpsc::unbounded_channel::<ScanEvent>();
    let (outcome_tx, outcomes) = mpsc::unbounded_channel();

    let scanner = Scanner::spawn(source, decoder, move |event| {
      let _ = scan_tx.send(event);
    });

    let worker = tokio::spawn(async move {
      while let Some(scan) = scans.recv().await {
        let result = gateway
          .validate(&scan.payload, ctx.access_point_id, ctx.source_ip.as_deref())
          .await;
        // Nobody listening is fine; the verdict is already in the snapshot.
        let _ = outcome_tx.send(ReaderOutcome { scan, result });
      }
    });

    Self { scanner, outcomes, worker: Some(worker) }
  }

  pub fn activate(&mut self) { self.scanner.activate(); }

  pub fn deactivate(&mut self) { self.scanner.deactivate(); }

  pub fn submit_manual(&self, text: impl Into<String>) { self.scanner.submit_manual(text); }

  pub fn state(&self) -> ScanState { self.scanner.state() }

  pub fn scanner(&self) -> &Scanner { &self.scanner }

  /// The next validated scan. `None` once the reader has shut down.
  pub async fn next_outcome(&mut self) -> Option<ReaderOutcome> { self.outcomes.recv().await }

  /// Stop scanning, wait for pending validations and release the camera.
  /// Returns the outcomes nobody collected yet.
  pub async fn shutdown(mut self) -> Vec<ReaderOutcome> {
    self.scanner.shutdown().await;
    if let Some(worker) = self.worker.take()
      && let Err(e) = worker.await
    {
      warn!("reader worker failed: {e}");
    }
    let mut rest = Vec::new();
    while let Ok(outcome) = self.outcomes.try_recv() {
      rest.push(outcome);
    }
    rest
  }
}
