use std::io;
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

/// A spawned worker process that can be killed from any thread.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    name: &'static str,
    child: Arc<Mutex<Child>>,
}

impl ProcessHandle {
    pub fn new(name: &'static str, child: Child) -> Self {
        Self {
            name,
            child: Arc::new(Mutex::new(child)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> u32 {
        self.child.lock().id()
    }

    /// Kills the process unless it already exited, then reaps it.
    pub fn kill(&self) {
        let mut child = self.child.lock();
        match child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(err) = child.kill() {
                    warn!("could not kill {} (pid {}): {err}", self.name, child.id());
                }
                let _ = child.wait();
            }
        }
    }

    pub fn wait(&self) -> io::Result<ExitStatus> {
        self.child.lock().wait()
    }
}

/// Shared cancellation of one stream: a flag every worker polls plus the
/// processes to kill.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    processes: Arc<Mutex<Vec<ProcessHandle>>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, process: ProcessHandle) {
        self.processes.lock().push(process);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let processes = std::mem::take(&mut *self.processes.lock());
        for process in processes {
            debug!("stopping {}", process.name());
            process.kill();
        }
    }
}
