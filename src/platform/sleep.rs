//! Portable sleep-based alarm
//!
//! A dedicated worker thread waits on a command channel with a timeout equal
//! to the time left on the current arming. On timeout it fires with a single
//! compare-and-swap keyed by the arming generation, so a late wake-up from a
//! cancelled arming can never expire a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::traits::Alarm;
use crate::core::error::{HarnessError, HarnessResult};

/// Low bit of the shared state; the remaining bits are the arming generation
const FIRED: u64 = 1;

enum Command {
    Arm { generation: u64, at: Instant },
    Cancel,
}

/// Deadline alarm driven by a sleeping helper thread.
pub struct SleepAlarm {
    state: Arc<AtomicU64>,
    generation: u64,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl SleepAlarm {
    /// Spawn the alarm worker thread.
    pub fn new() -> HarnessResult<Self> {
        let state = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel();

        let worker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("deadline-alarm".into())
            .spawn(move || run_worker(worker_state, rx))
            .map_err(|e| HarnessError::Platform(format!("Failed to spawn alarm thread: {}", e)))?;

        Ok(Self {
            state,
            generation: 0,
            commands: Some(tx),
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> HarnessResult<()> {
        self.commands
            .as_ref()
            .and_then(|tx| tx.send(command).ok())
            .ok_or_else(|| HarnessError::Platform("alarm thread has exited".into()))
    }
}

impl Alarm for SleepAlarm {
    fn arm(&mut self, after: Duration) -> HarnessResult<()> {
        self.generation += 2;
        let generation = self.generation;
        self.state.store(generation, Ordering::SeqCst);

        if after.is_zero() {
            self.state.store(generation | FIRED, Ordering::SeqCst);
            return Ok(());
        }

        self.send(Command::Arm {
            generation,
            at: Instant::now() + after,
        })
    }

    fn cancel(&mut self) {
        let pending = self.generation;
        self.generation += 2;
        // Leaves a fired state untouched; otherwise moves to a generation the
        // worker does not know, so its compare-and-swap cannot succeed.
        let _ = self.state.compare_exchange(
            pending,
            self.generation,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let _ = self.send(Command::Cancel);
    }

    #[inline]
    fn expired(&self) -> bool {
        self.state.load(Ordering::SeqCst) & FIRED != 0
    }

    fn name(&self) -> &'static str {
        "sleep thread"
    }
}

impl Drop for SleepAlarm {
    fn drop(&mut self) {
        // Disconnecting the channel stops the worker.
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(state: Arc<AtomicU64>, commands: Receiver<Command>) {
    let mut pending: Option<(u64, Instant)> = None;

    loop {
        let command = match pending {
            Some((generation, at)) => {
                match commands.recv_timeout(at.saturating_duration_since(Instant::now())) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => {
                        let _ = state.compare_exchange(
                            generation,
                            generation | FIRED,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        );
                        pending = None;
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => return,
            },
        };

        match command {
            Command::Arm { generation, at } => pending = Some((generation, at)),
            Command::Cancel => pending = None,
        }
    }
}
