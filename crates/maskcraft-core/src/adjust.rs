//! Color-adjustment pipeline plumbing.
//!
//! The adjustment math itself is a black box ([`Adjuster`]). This module
//! only keeps it off the input/render path and coalesces requests so at
//! most one is in flight and one is waiting.

use crate::error::EngineResult;
use crate::image_buffer::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named slider values (brightness, contrast, ...) passed to the adjuster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditValues(BTreeMap<String, f64>);

impl EditValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Depth-1 request coalescing: while a request is in flight, only the
/// most recent new request is kept.
#[derive(Debug, Clone)]
pub struct AdjustQueue<P> {
    busy: bool,
    pending: Option<P>,
}

impl<P> Default for AdjustQueue<P> {
    fn default() -> Self {
        Self {
            busy: false,
            pending: None,
        }
    }
}

impl<P> AdjustQueue<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a request. Returns it back if it should be dispatched now;
    /// otherwise it replaces any waiting request.
    pub fn request(&mut self, params: P) -> Option<P> {
        if self.busy {
            self.pending = Some(params);
            None
        } else {
            self.busy = true;
            Some(params)
        }
    }

    /// Mark the in-flight request done. Returns the waiting request, if
    /// any, which is then considered in flight.
    pub fn complete(&mut self) -> Option<P> {
        let next = self.pending.take();
        self.busy = next.is_some();
        next
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.busy = false;
        self.pending = None;
    }
}

/// Produces a processed image from the base image and edit values.
pub trait Adjuster: Send + 'static {
    fn adjust(&mut self, image: &ImageBuffer, values: &EditValues) -> EngineResult<ImageBuffer>;
}

impl<F> Adjuster for F
where
    F: FnMut(&ImageBuffer, &EditValues) -> EngineResult<ImageBuffer> + Send + 'static,
{
    fn adjust(&mut self, image: &ImageBuffer, values: &EditValues) -> EngineResult<ImageBuffer> {
        self(image, values)
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native_worker {
    use super::{AdjustQueue, Adjuster, EditValues};
    use crate::error::{EngineError, EngineResult};
    use crate::image_buffer::ImageBuffer;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};

    enum AdjustCommand {
        SetImage(ImageBuffer),
        Run(EditValues, u64),
        Shutdown,
    }

    struct AdjustResult {
        generation: u64,
        output: EngineResult<ImageBuffer>,
    }

    /// Runs an [`Adjuster`] on a background thread. Results are collected
    /// with [`poll`](Self::poll), which never blocks.
    pub struct AdjustWorker {
        cmd_tx: Sender<AdjustCommand>,
        result_rx: Receiver<AdjustResult>,
        queue: AdjustQueue<EditValues>,
        generation: u64,
        thread: Option<JoinHandle<()>>,
    }

    impl AdjustWorker {
        pub fn spawn<A: Adjuster>(mut adjuster: A) -> Self {
            let (cmd_tx, cmd_rx) = channel::<AdjustCommand>();
            let (result_tx, result_rx) = channel::<AdjustResult>();

            let handle = thread::spawn(move || {
                log::debug!("adjust worker started");
                let mut image: Option<ImageBuffer> = None;
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        AdjustCommand::SetImage(next) => image = Some(next),
                        AdjustCommand::Run(values, generation) => {
                            let output = match &image {
                                Some(img) => adjuster.adjust(img, &values),
                                None => Err(EngineError::NoImage),
                            };
                            if result_tx.send(AdjustResult { generation, output }).is_err() {
                                break;
                            }
                        }
                        AdjustCommand::Shutdown => break,
                    }
                }
                log::debug!("adjust worker stopped");
            });

            Self {
                cmd_tx,
                result_rx,
                queue: AdjustQueue::new(),
                generation: 0,
                thread: Some(handle),
            }
        }

        /// Replace the source image. Results for the previous image are dropped.
        pub fn set_image(&mut self, image: ImageBuffer) -> EngineResult<()> {
            self.generation += 1;
            self.queue.reset();
            self.send(AdjustCommand::SetImage(image))
        }

        /// Request an adjustment, coalescing with any in-flight request.
        pub fn request(&mut self, values: EditValues) -> EngineResult<()> {
            match self.queue.request(values) {
                Some(now) => self.send(AdjustCommand::Run(now, self.generation)),
                None => Ok(()),
            }
        }

        pub fn is_busy(&self) -> bool {
            self.queue.is_busy()
        }

        /// Drain finished work. Returns the newest processed image, if any.
        pub fn poll(&mut self) -> EngineResult<Option<ImageBuffer>> {
            let mut latest = None;
            loop {
                let result = match self.result_rx.try_recv() {
                    Ok(result) => result,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Err(EngineError::WorkerGone),
                };
                if result.generation != self.generation {
                    continue;
                }
                match result.output {
                    Ok(image) => latest = Some(image),
                    Err(e) => log::warn!("adjustment failed: {e}"),
                }
                if let Some(next) = self.queue.complete() {
                    self.send(AdjustCommand::Run(next, self.generation))?;
                }
            }
            Ok(latest)
        }

        fn send(&self, cmd: AdjustCommand) -> EngineResult<()> {
            self.cmd_tx.send(cmd).map_err(|_| EngineError::WorkerGone)
        }
    }

    impl Drop for AdjustWorker {
        fn drop(&mut self) {
            let _ = self.cmd_tx.send(AdjustCommand::Shutdown);
            if let Some(handle) = self.thread.take() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_worker::AdjustWorker;
