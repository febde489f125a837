use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Memory each stress worker holds on to while running.
const STRESS_BUFFER_BYTES: usize = 16 * 1024 * 1024;

pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

struct OverloadRun {
    cancel_token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

/// Failure states this process can inflict on itself.
pub struct FrontendSimulation {
    healthy: AtomicBool,
    overload: Mutex<Option<OverloadRun>>,
    worker_count: usize,
    crash_delay: Duration,
    crashing: AtomicBool,
    exit: ExitHook,
}

impl FrontendSimulation {
    pub fn new(worker_count: usize, crash_delay: Duration) -> Self {
        Self::with_exit_hook(worker_count, crash_delay, Arc::new(|code: i32| std::process::exit(code)))
    }

    pub fn with_exit_hook(worker_count: usize, crash_delay: Duration, exit: ExitHook) -> Self {
        Self {
            healthy: AtomicBool::new(true),
            overload: Mutex::new(None),
            worker_count,
            crash_delay,
            crashing: AtomicBool::new(false),
            exit,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Flips the health flag and returns the new value.
    pub fn toggle_health(&self) -> bool {
        let healthy = !self.healthy.fetch_xor(true, Ordering::AcqRel);
        info!("Frontend health toggled: {}", if healthy { "HEALTHY" } else { "UNHEALTHY" });
        healthy
    }

    pub async fn is_overloaded(&self) -> bool {
        self.overload.lock().await.is_some()
    }

    /// Returns false if an overload was already running.
    pub async fn start_overload(&self) -> bool {
        let mut overload = self.overload.lock().await;
        if overload.is_some() {
            return false;
        }

        let cancel_token = CancellationToken::new();
        let workers = (0..self.worker_count)
            .map(|n| {
                let token = cancel_token.clone();
                std::thread::Builder::new()
                    .name(format!("overload-{}", n))
                    .spawn(move || stress(token))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Failed to spawn overload worker: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        info!("Frontend overload started with {} workers", workers.len());
        *overload = Some(OverloadRun { cancel_token, workers });
        true
    }

    /// Returns false if no overload was running.
    pub async fn stop_overload(&self) -> bool {
        let Some(run) = self.overload.lock().await.take() else {
            return false;
        };

        run.cancel_token.cancel();
        let workers = run.workers;
        let joined = tokio::task::spawn_blocking(move || {
            for worker in workers {
                let _ = worker.join();
            }
        })
        .await;
        if let Err(e) = joined {
            warn!("Overload workers did not shut down cleanly: {}", e);
        }

        info!("Frontend overload stopped");
        true
    }

    pub fn crash_delay(&self) -> Duration {
        self.crash_delay
    }

    pub fn is_crashing(&self) -> bool {
        self.crashing.load(Ordering::Acquire)
    }

    /// Marks the process as crashing. Returns false if a crash is already
    /// scheduled.
    pub fn begin_crash(&self) -> bool {
        !self.crashing.swap(true, Ordering::AcqRel)
    }

    pub fn exit_now(&self) {
        error!("Frontend crash simulation: exiting");
        (self.exit)(1);
    }
}

fn stress(cancel_token: CancellationToken) {
    let mut buffer = vec![0u8; STRESS_BUFFER_BYTES];
    let mut acc: u64 = 0;

    while !cancel_token.is_cancelled() {
        for (i, byte) in buffer.iter_mut().enumerate().step_by(4096) {
            acc = acc.wrapping_mul(6364136223846793005).wrapping_add(i as u64);
            *byte = (acc >> 56) as u8;
        }
        std::hint::black_box(&buffer);
    }
}
