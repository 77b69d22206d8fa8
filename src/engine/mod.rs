//! PipelineHandle: the pipeline running on a dedicated processing thread.
//!
//! The caller and the processing thread share no mutable state. Raw PCM goes
//! in through the lock-free buffer pool, cleaned audio comes back through an
//! SPSC sample ring, events fan out through a tokio broadcast channel and
//! threshold patches travel over a bounded mpsc queue. The thread owns the
//! `Pipeline` outright and hands back its final stats when joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::{future, Stream, StreamExt};
use rtrb::{Consumer, Producer, RingBuffer};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::{Pipeline, PipelineEvent, PipelineStats};
use crate::audio::{BufferPool, SampleReceiver, SampleSender};
use crate::config::{AppConfig, PipelineConfig, ThresholdPatch};
use crate::error::{log_config_error, PipelineError};
use crate::telemetry::{self, DiagnosticError};

/// Idle wait when no input buffer is queued
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Handle to a running processing thread
pub struct PipelineHandle {
    /// Shadow copy used to validate patches before they are queued
    config: PipelineConfig,
    sender: Option<SampleSender>,
    output: Consumer<f32>,
    events: broadcast::Sender<PipelineEvent>,
    commands: mpsc::Sender<ThresholdPatch>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<PipelineStats>>,
}

impl PipelineHandle {
    /// Validate the configuration, build the pipeline and start its thread
    pub fn spawn(config: AppConfig) -> Result<Self, PipelineError> {
        let pipeline = Pipeline::new(config.pipeline.clone())?;
        let engine = &config.engine;

        let (sender, receiver) =
            BufferPool::new(engine.buffer_pool_size.max(1), engine.buffer_size.max(1))
                .split_for_threads();
        let (output_producer, output) =
            RingBuffer::new(engine.output_capacity.max(1) * config.pipeline.hop_size);
        let (events, _) = broadcast::channel(engine.event_capacity.max(1));
        let (commands, command_rx) = mpsc::channel(engine.command_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let events = events.clone();
            let running = Arc::clone(&running);
            thread::spawn(move || {
                processing_loop(pipeline, receiver, output_producer, events, command_rx, running)
            })
        };

        tracing::info!(
            "[PipelineHandle] Spawned processing thread (pool {}x{}, output {} hops)",
            engine.buffer_pool_size,
            engine.buffer_size,
            engine.output_capacity
        );

        Ok(Self {
            config: config.pipeline,
            sender: Some(sender),
            output,
            events,
            commands,
            running,
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The thread is accepting input
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Queue one batch of raw samples
    ///
    /// # Errors
    /// * `NotRunning` - stopped, or the sender was taken with `take_sender`
    /// * `InputBackpressure` - the buffer pool is exhausted; the tail was dropped
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<(), PipelineError> {
        if !self.is_running() {
            return Err(PipelineError::NotRunning);
        }
        let sender = self.sender.as_mut().ok_or(PipelineError::NotRunning)?;

        let result = sender.send(samples);
        telemetry::hub().record_buffer_occupancy("input", sender.occupancy_percent());

        result.map_err(|dropped_samples| {
            telemetry::hub().record_error(
                DiagnosticError::InputBackpressure,
                format!("{} samples dropped", dropped_samples),
            );
            PipelineError::InputBackpressure { dropped_samples }
        })
    }

    /// Hand the input side to another producer, e.g. a capture callback
    ///
    /// Afterwards `push_samples` returns `NotRunning`. Dropping the taken
    /// sender ends the processing thread once queued input is drained.
    pub fn take_sender(&mut self) -> Option<SampleSender> {
        self.sender.take()
    }

    /// Move all available cleaned samples into `out`, returning how many
    pub fn pop_output(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.output.slots();
        out.reserve(available);
        let mut moved = 0;
        while let Ok(sample) = self.output.pop() {
            out.push(sample);
            moved += 1;
        }
        moved
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Events as an async stream; lagged receivers skip what they missed
    pub fn event_stream(&self) -> impl Stream<Item = PipelineEvent> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|item| {
            future::ready(match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::warn!("[PipelineHandle] Event stream lagged by {} events", missed);
                    None
                }
            })
        })
    }

    /// Queue a threshold patch for the processing thread
    ///
    /// The patch is validated here first, so an invalid patch is reported to
    /// the caller and never queued.
    pub fn update_thresholds(&mut self, patch: ThresholdPatch) -> Result<(), PipelineError> {
        if !self.is_running() {
            return Err(PipelineError::NotRunning);
        }

        let mut candidate = self.config.clone();
        candidate.apply_patch(&patch)?;

        self.commands.try_send(patch).map_err(|err| match err {
            TrySendError::Full(_) => PipelineError::CommandQueueFull,
            TrySendError::Closed(_) => PipelineError::NotRunning,
        })?;
        self.config = candidate;
        Ok(())
    }

    /// Stop accepting input, let the thread drain what is queued, and join it
    pub fn stop(mut self) -> Result<PipelineStats, PipelineError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PipelineStats, PipelineError> {
        self.running.store(false, Ordering::Release);
        self.sender = None;

        let worker = self.worker.take().ok_or(PipelineError::NotRunning)?;
        let stats = worker.join().map_err(|_| PipelineError::ThreadPanicked)?;
        tracing::info!(
            "[PipelineHandle] Stopped after {} frames",
            stats.frames_processed
        );
        Ok(stats)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.shutdown() {
                crate::error::log_pipeline_error(&err, "drop");
            }
        }
    }
}

fn processing_loop(
    mut pipeline: Pipeline,
    mut receiver: SampleReceiver,
    mut output: Producer<f32>,
    events: broadcast::Sender<PipelineEvent>,
    mut commands: mpsc::Receiver<ThresholdPatch>,
    running: Arc<AtomicBool>,
) -> PipelineStats {
    tracing::info!("[ProcessingThread] Started");

    let mut cleaned = Vec::with_capacity(pipeline.config().frame_size * 2);
    let mut pending = Vec::new();
    let mut overrun_samples = 0u64;

    loop {
        while let Ok(patch) = commands.try_recv() {
            if let Err(err) = pipeline.apply_patch(&patch) {
                log_config_error(&err, "processing_thread.apply_patch");
                telemetry::hub().record_error(DiagnosticError::CommandRejected, err.to_string());
            }
        }

        match receiver.recv() {
            Some(buffer) => {
                pipeline.process(&buffer, &mut cleaned, &mut pending);
                receiver.recycle(buffer);

                let mut lost = 0usize;
                for sample in cleaned.drain(..) {
                    if output.push(sample).is_err() {
                        lost += 1;
                    }
                }
                if lost > 0 {
                    overrun_samples += lost as u64;
                    telemetry::hub().record_error(
                        DiagnosticError::OutputOverrun,
                        format!("{} cleaned samples discarded", lost),
                    );
                }

                for event in pending.drain(..) {
                    // No subscribers is fine
                    let _ = events.send(event);
                }
            }
            None => {
                if !running.load(Ordering::Acquire) || receiver.is_closed() {
                    break;
                }
                thread::sleep(IDLE_SLEEP);
            }
        }
    }

    if overrun_samples > 0 {
        tracing::warn!(
            "[ProcessingThread] {} cleaned samples were never drained",
            overrun_samples
        );
    }
    tracing::info!("[ProcessingThread] Exiting");
    pipeline.dispose()
}
