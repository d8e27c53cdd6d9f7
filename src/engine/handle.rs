use crate::config::WheelConfig;
use crate::controller::DeviceFactory;
use crate::engine::error::EngineError;
use crate::engine::scheduler::TickScheduler;
use crate::engine::telemetry::TickSnapshot;
use crate::mapping::{ModeRouter, SinkSet};
use crate::output::{FocusOracle, KeyInjector, MouseInjector, VirtualGamepadDriver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Collaborators the engine thread takes ownership of
pub struct EngineIo {
    /// Opens the wheel. Runs on the engine thread.
    pub device: DeviceFactory,
    pub keys: Box<dyn KeyInjector>,
    pub mouse: Box<dyn MouseInjector>,
    /// `None` when no virtual pad driver is installed
    pub pad: Option<Box<dyn VirtualGamepadDriver>>,
    pub focus: Box<dyn FocusOracle>,
}

/// Owner of the engine thread.
///
/// The presentation side only talks to the engine through this handle: it can
/// replace the configuration between ticks, read the last tick and stop the loop.
/// Dropping the handle stops the engine.
#[derive(Debug)]
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    config_tx: watch::Sender<Arc<WheelConfig>>,
    snapshot_rx: watch::Receiver<TickSnapshot>,
}

impl EngineHandle {
    /// Opens the device and starts ticking on a dedicated thread.
    ///
    /// Blocks until the device is open. Fails with
    /// [`EngineError::DeviceUnavailable`] if it cannot be, in which case no
    /// loop is ever entered.
    pub fn start(config: WheelConfig, io: EngineIo) -> Result<Self, EngineError> {
        info!("Starting engine in {} mode", config.control_mode);

        let mode = config.control_mode;
        let (config_tx, config_rx) = watch::channel(Arc::new(config));
        let (snapshot_tx, snapshot_rx) = watch::channel(TickSnapshot {
            mode,
            ..TickSnapshot::default()
        });
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread_running = running.clone();
        let handle = std::thread::Builder::new()
            .name("wheelbridge-engine".into())
            .spawn(move || {
                let EngineIo {
                    device,
                    keys,
                    mouse,
                    pad,
                    focus,
                } = io;

                let device = match device() {
                    Ok(device) => {
                        let _ = ready_tx.send(Ok(device.info().clone()));
                        device
                    }
                    Err(e) => {
                        thread_running.store(false, Ordering::SeqCst);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let requested = config_rx.borrow().control_mode;
                let router = ModeRouter::new(SinkSet::new(keys, mouse, pad), requested);
                let stopped = TickScheduler::create(
                    device,
                    router,
                    focus,
                    config_rx,
                    snapshot_tx,
                    thread_running,
                )
                .start()
                .run_until_stopped()
                .drain();
                debug!("Engine thread done after {} ticks", stopped.stats().ticks);
            })
            .map_err(|e| EngineError::ThreadError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(info)) => {
                info!(
                    "Engine running on {} ({} axes, {} buttons, {} hats)",
                    info.name, info.axis_count, info.button_count, info.hat_count
                );
                Ok(Self {
                    running,
                    thread_handle: Some(handle),
                    config_tx,
                    snapshot_rx,
                })
            }
            Ok(Err(e)) => {
                error!("Engine not started: {}", e);
                let _ = handle.join();
                Err(EngineError::DeviceUnavailable(e))
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(EngineError::ThreadError(
                    "Engine thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Stops the loop and waits until every output is released. Idempotent.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.thread_handle.take() else {
            return Ok(());
        };

        info!("Stopping engine");
        handle
            .join()
            .map_err(|_| EngineError::ThreadError("Engine thread panicked".to_string()))?;
        info!("Engine stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self
                .thread_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Last published tick
    pub fn snapshot(&self) -> TickSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TickSnapshot> {
        debug!("New subscriber to engine snapshots");
        self.snapshot_rx.clone()
    }

    /// Replaces the configuration. The engine picks it up at the next tick.
    pub fn update_config(&self, config: WheelConfig) {
        info!("Applying new configuration ({} mode)", config.control_mode);
        self.config_tx.send_replace(Arc::new(config));
    }

    pub fn config(&self) -> Arc<WheelConfig> {
        self.config_tx.borrow().clone()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Engine did not stop cleanly: {}", e);
        }
    }
}
