//! Thread management and CPU affinity
//!
//! Event processor threads are spawned through [`ThreadBuilder`], which names
//! them and optionally pins them to a CPU core.

use crate::disruptor::{DisruptorError, Result};
use core_affinity::CoreId;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Handle to a spawned processor thread
///
/// Dropping the handle joins the thread.
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    /// Get the thread name
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Wait for the thread to finish
    ///
    /// # Errors
    /// `DisruptorError::HandlerPanic` if the thread panicked
    pub fn join(mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                DisruptorError::HandlerPanic(format!("thread '{}' panicked", self.thread_name))
            }),
            None => Ok(()),
        }
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ManagedThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedThread")
            .field("thread_name", &self.thread_name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Thread builder with CPU affinity and naming support
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    name: Option<String>,
    affinity: Option<CoreId>,
}

impl ThreadBuilder {
    /// Create a new thread builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the thread to a CPU core
    ///
    /// # Errors
    /// `DisruptorError::InvalidConfig` if the core does not exist on this machine
    pub fn pin_at_core(mut self, core_id: usize) -> Result<Self> {
        let available_cores = get_available_cores();
        if !available_cores.contains(&core_id) {
            return Err(DisruptorError::InvalidConfig(format!(
                "CPU core {core_id} is not available, available cores: {available_cores:?}"
            )));
        }
        self.affinity = Some(CoreId { id: core_id });
        Ok(self)
    }

    /// Set thread name
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Spawn a thread with the configured settings
    ///
    /// # Errors
    /// `DisruptorError::ThreadSpawn` if the OS refuses to create the thread
    pub fn spawn<F>(self, f: F) -> Result<ManagedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = self.name.unwrap_or_else(|| "seqflow-processor".to_string());
        let affinity = self.affinity;

        let name = thread_name.clone();
        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                set_affinity_if_defined(affinity, &name);
                f();
            })
            .map_err(|e| DisruptorError::ThreadSpawn(e.to_string()))?;

        debug!(thread = %thread_name, "Spawned processor thread");
        Ok(ManagedThread::new(join_handle, thread_name))
    }
}

fn set_affinity_if_defined(affinity: Option<CoreId>, thread_name: &str) {
    if let Some(core_id) = affinity {
        if core_affinity::set_for_current(core_id) {
            debug!(thread = thread_name, core = core_id.id, "Pinned thread to CPU core");
        } else {
            warn!(thread = thread_name, core = core_id.id, "Could not pin thread to CPU core");
        }
    }
}

/// Get available CPU core IDs
pub fn get_available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .iter()
        .map(|core| core.id)
        .collect()
}
