//! Background chunk verification
//!
//! Verification of a chunk is CPU bound (one epoch hash per header plus the
//! retarget), so it runs on a dedicated thread. The caller submits
//! self-contained [`ChunkJob`]s on one channel and collects results, in
//! submission order, on another. A [`WorkerMessage::Stop`] sentinel ends the
//! loop.

use crate::core::{CheckpointTable, ConsensusParameters, HeaderWindow};
use crate::error::{Error, Result, VerifyError};
use crate::verify::{verify_chunk, ChunkSummary, PowHasher};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, info_span, warn};

/// Name given to the verification thread
pub const WORKER_THREAD_NAME: &str = "header-verifier";

/// Everything needed to verify one chunk, copied out of caller state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkJob {
    pub params: ConsensusParameters,
    pub window: HeaderWindow,
    pub dgw_window_size: u64,
    pub start_height: u64,
    #[serde(with = "hex_bytes")]
    pub raw: Vec<u8>,
    pub checkpoints: CheckpointTable,
}

impl ChunkJob {
    pub fn new(
        params: ConsensusParameters,
        window: HeaderWindow,
        start_height: u64,
        raw: Vec<u8>,
        checkpoints: CheckpointTable,
    ) -> Self {
        let dgw_window_size = params.dgw_window_size;
        Self {
            params,
            window,
            dgw_window_size,
            start_height,
            raw,
            checkpoints,
        }
    }

    pub fn with_window_size(mut self, dgw_window_size: u64) -> Self {
        self.dgw_window_size = dgw_window_size;
        self
    }

    /// Verify on the current thread
    pub fn run(self, hasher: &dyn PowHasher) -> ChunkResult {
        let ChunkJob {
            params,
            mut window,
            dgw_window_size,
            start_height,
            raw,
            checkpoints,
        } = self;
        let summary = verify_chunk(
            &params,
            hasher,
            &mut window,
            dgw_window_size,
            start_height,
            &raw,
            &checkpoints,
        )?;
        Ok(ChunkReport { summary, window })
    }
}

/// Successful verification, with the window grown by the chunk's headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub summary: ChunkSummary,
    pub window: HeaderWindow,
}

/// Per-job outcome sent back by the worker
pub type ChunkResult = std::result::Result<ChunkReport, VerifyError>;

/// Job channel message
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Verify(Box<ChunkJob>),
    Stop,
}

/// Handle to the verification thread
pub struct VerificationWorker {
    jobs: Sender<WorkerMessage>,
    results: Receiver<ChunkResult>,
    handle: Option<JoinHandle<()>>,
    pending: usize,
}

impl VerificationWorker {
    /// Start the verification thread
    pub fn spawn(hasher: Arc<dyn PowHasher>) -> Result<Self> {
        let (jobs_tx, jobs_rx) = unbounded();
        let (results_tx, results_rx) = unbounded();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(jobs_rx, results_tx, hasher))?;

        info!("Verification worker started");
        Ok(Self {
            jobs: jobs_tx,
            results: results_rx,
            handle: Some(handle),
            pending: 0,
        })
    }

    /// Queue a job without waiting
    pub fn submit(&mut self, job: ChunkJob) -> Result<()> {
        debug!(start_height = job.start_height, bytes = job.raw.len(), "Submitting chunk");
        self.jobs
            .send(WorkerMessage::Verify(Box::new(job)))
            .map_err(|e| Error::channel_send(e.to_string()))?;
        self.pending += 1;
        Ok(())
    }

    /// Block until the next result arrives
    pub fn await_result(&mut self) -> Result<ChunkResult> {
        let result = self
            .results
            .recv()
            .map_err(|e| Error::channel_recv(e.to_string()))?;
        self.pending = self.pending.saturating_sub(1);
        Ok(result)
    }

    /// Jobs submitted but not yet collected
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Send the stop sentinel and wait for the thread to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // the thread may already be gone; join reports how it ended
        let _ = self.jobs.send(WorkerMessage::Stop);
        handle
            .join()
            .map_err(|_| Error::worker("verification thread panicked"))?;
        info!("Verification worker stopped");
        Ok(())
    }
}

impl Drop for VerificationWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Verification worker did not stop cleanly: {}", e);
        }
    }
}

fn worker_loop(
    jobs: Receiver<WorkerMessage>,
    results: Sender<ChunkResult>,
    hasher: Arc<dyn PowHasher>,
) {
    let span = info_span!("verification_worker");
    let _guard = span.enter();

    for message in jobs.iter() {
        let job = match message {
            WorkerMessage::Verify(job) => job,
            WorkerMessage::Stop => break,
        };
        let result = (*job).run(hasher.as_ref());
        if results.send(result).is_err() {
            warn!("Result channel closed, stopping");
            break;
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
