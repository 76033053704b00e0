//! Graceful shutdown handling for the headless runner.
//!
//! Ctrl+C (or any caller) requests shutdown; the run loop awaits [`ShutdownManager::requested`]
//! and then lets [`ShutdownManager::cleanup`] stop the population.

use crate::app::Simulation;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Manages graceful shutdown of a simulation run.
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
    exit_code: Arc<AtomicI32>,
}

/// Conventional status of a process ended by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            exit_code: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Spawns a task that requests shutdown on Ctrl+C. Needs a tokio runtime.
    pub fn install_ctrl_c_handler(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, initiating graceful shutdown...");
                handle.request_interrupt();
            }
        });
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        tracing::info!("Shutdown requested");
    }

    /// Shutdown on user interrupt; the process then exits with [`INTERRUPTED_EXIT_CODE`].
    pub fn request_interrupt(&self) {
        self.exit_code.store(INTERRUPTED_EXIT_CODE, Ordering::SeqCst);
        self.request_shutdown();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_shutdown_requested() {
                return;
            }
            notified.await;
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    /// Kills the run (recording its survivors) and waits for every cell task to finish.
    pub async fn cleanup(&self, simulation: &mut Simulation) {
        tracing::info!("Performing shutdown cleanup...");

        simulation.kill_all();
        simulation.shutdown().await;

        tracing::info!("Cleanup complete");
    }
}
