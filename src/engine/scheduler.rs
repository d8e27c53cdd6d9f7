//! Fixed rate tick loop with compile-time lifecycle states
//!
//! # State Machine
//!
//! ```text
//! Ready ──► Running ──► Draining ──► Stopped
//!              │            │
//!         (tick loop)  (release_all)
//! ```
//!
//! # One tick
//!
//! ```text
//! config snapshot ──► DeviceSource::poll ──► EdgeTracker ──► focus check
//!                                                               │
//!                          TickSnapshot ◄── ModeRouter::route ◄─┘
//! ```
//!
//! A fault abandons the tick, is logged, and the loop backs off before the next
//! one. Nothing inside a tick can end the loop; only the running flag does.

use crate::config::WheelConfig;
use crate::controller::{DeviceSource, EdgeTracker};
use crate::engine::error::EngineError;
use crate::engine::telemetry::{TickSnapshot, TickStats};
use crate::mapping::conditioning::apply_deadzone;
use crate::mapping::router::pedal_values;
use crate::mapping::ModeRouter;
use crate::output::FocusOracle;
use statum::{machine, state};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum SchedulerState {
    Ready,    // Device and sinks attached, nothing sent yet
    Running,  // Ticking
    Draining, // Loop left, outputs still held
    Stopped,  // Everything released
}

#[machine]
pub struct TickScheduler<S: SchedulerState> {
    device: Box<dyn DeviceSource>,
    router: ModeRouter,
    edges: EdgeTracker,
    focus: Box<dyn FocusOracle>,
    config: watch::Receiver<Arc<WheelConfig>>,
    snapshots: watch::Sender<TickSnapshot>,
    running: Arc<AtomicBool>,
    stats: TickStats,
}

impl<S: SchedulerState> TickScheduler<S> {
    pub fn router(&self) -> &ModeRouter {
        &self.router
    }

    pub fn edges(&self) -> &EdgeTracker {
        &self.edges
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}

impl TickScheduler<Ready> {
    pub fn create(
        device: Box<dyn DeviceSource>,
        router: ModeRouter,
        focus: Box<dyn FocusOracle>,
        config: watch::Receiver<Arc<WheelConfig>>,
        snapshots: watch::Sender<TickSnapshot>,
        running: Arc<AtomicBool>,
    ) -> Self {
        debug!(
            "Creating tick scheduler for {} (mode {})",
            device.info().name,
            router.mode()
        );
        Self::new(
            device,
            router,
            EdgeTracker::new(),
            focus,
            config,
            snapshots,
            running,
            TickStats::new(Instant::now()),
        )
    }

    pub fn start(self) -> TickScheduler<Running> {
        info!("Tick scheduler running");
        self.transition()
    }
}

impl TickScheduler<Running> {
    /// Runs one tick against a single configuration snapshot.
    ///
    /// The snapshot is published even when the tick faults.
    pub fn tick_at(&mut self, now: Instant) -> Result<TickSnapshot, EngineError> {
        let config = self.config.borrow().clone();
        let frame = self.device.poll()?;
        let edges = self.edges.update(&frame);
        let focused = self.focus.is_target_focused();

        let routed = self.router.route(&frame, &edges, &config, focused, now);
        let (conditioned, fault) = match routed {
            Ok(value) => (value, None),
            Err(e) => (apply_deadzone(frame.steering, config.steering_deadzone), Some(e)),
        };

        let snapshot = TickSnapshot {
            tick: self.stats.ticks + 1,
            captured_at: Some(chrono::Local::now()),
            raw_steering: frame.steering,
            conditioned_steering: conditioned,
            pedals: pedal_values(&frame, &config),
            pressed_buttons: frame.pressed_buttons(),
            active_keys: self.router.sinks().keyboard.active_keys(),
            mode: self.router.mode(),
            focused,
            faulted: fault.is_some(),
        };
        self.snapshots.send_replace(snapshot.clone());

        match fault {
            Some(e) => Err(e.into()),
            None => Ok(snapshot),
        }
    }

    /// Ticks until the running flag is cleared
    pub fn run_until_stopped(mut self) -> TickScheduler<Draining> {
        info!("Entering tick loop");

        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            let (interval, backoff) = {
                let config = self.config.borrow();
                (
                    Duration::from_millis(config.tick_interval_ms),
                    Duration::from_millis(config.fault_backoff_ms),
                )
            };

            let pause = match self.tick_at(started) {
                Ok(_) => {
                    self.stats.record(false);
                    interval.saturating_sub(started.elapsed())
                }
                Err(e) => {
                    self.stats.record(true);
                    error!("Tick {} abandoned: {}", self.stats.ticks, e);
                    backoff
                }
            };
            self.stats.report_if_due(Instant::now());

            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        info!("Tick loop left after {} ticks", self.stats.ticks);
        self.transition()
    }

    /// Leaves the loop without waiting for the running flag
    pub fn halt(self) -> TickScheduler<Draining> {
        self.transition()
    }
}

impl TickScheduler<Draining> {
    /// Releases every sink. Failures are logged; the sinks' active sets are empty
    /// afterwards regardless.
    pub fn drain(mut self) -> TickScheduler<Stopped> {
        info!("Releasing all outputs");
        if let Err(e) = self.router.release_all() {
            warn!("Not every output could be released cleanly: {}", e);
        }

        self.snapshots.send_modify(|snapshot| {
            snapshot.active_keys.clear();
            snapshot.captured_at = Some(chrono::Local::now());
        });
        self.transition()
    }
}

impl TickScheduler<Stopped> {
    pub fn is_idle(&self) -> bool {
        self.router.sinks().is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{DeviceError, DeviceInfo, RawDeviceFrame};
    use crate::mapping::OutputMode;
    use crate::output::recording::{OutputLog, SharedFocus};
    use crate::output::KeyId;
    use std::collections::VecDeque;

    struct Scripted {
        info: DeviceInfo,
        frames: VecDeque<Result<RawDeviceFrame, DeviceError>>,
    }

    impl DeviceSource for Scripted {
        fn info(&self) -> &DeviceInfo {
            &self.info
        }

        fn poll(&mut self) -> Result<RawDeviceFrame, DeviceError> {
            self.frames
                .pop_front()
                .unwrap_or_else(|| Ok(RawDeviceFrame::default()))
        }
    }

    fn scheduler(
        frames: Vec<Result<RawDeviceFrame, DeviceError>>,
        focus: SharedFocus,
        mode: OutputMode,
    ) -> (TickScheduler<Running>, OutputLog, watch::Receiver<TickSnapshot>) {
        let log = OutputLog::new();
        let config = WheelConfig {
            control_mode: mode,
            ..WheelConfig::default()
        };
        let (_config_tx, config_rx) = watch::channel(Arc::new(config));
        let (snapshot_tx, snapshot_rx) = watch::channel(TickSnapshot::default());
        let device = Scripted {
            info: DeviceInfo {
                id: 0,
                name: "Logitech G29 Driving Force Racing Wheel".to_string(),
                axis_count: 4,
                button_count: 25,
                hat_count: 1,
            },
            frames: frames.into(),
        };
        let scheduler = TickScheduler::create(
            Box::new(device),
            ModeRouter::new(log.sinks(false), mode),
            Box::new(focus),
            config_rx,
            snapshot_tx,
            Arc::new(AtomicBool::new(true)),
        )
        .start();
        (scheduler, log, snapshot_rx)
    }

    #[test]
    fn tick_publishes_snapshot() {
        let frame = RawDeviceFrame::default()
            .with_steering(0.5)
            .with_pedals(-1.0, 1.0, 1.0)
            .with_button(3, true);
        let (mut scheduler, _log, snapshots) =
            scheduler(vec![Ok(frame)], SharedFocus::new(true), OutputMode::Keyboard);

        let snapshot = scheduler.tick_at(Instant::now()).unwrap();
        assert_eq!(snapshot.pressed_buttons, vec![3]);
        assert_eq!(snapshot.pedals.throttle, 1.0);
        assert!(snapshot.active_keys.contains(&KeyId::Char('w')));
        assert!((snapshot.conditioned_steering - 0.4737).abs() < 1e-3);
        assert_eq!(*snapshots.borrow(), snapshot);
    }

    #[test]
    fn unfocused_tick_still_tracks_edges() {
        let frame = RawDeviceFrame::default().with_button(0, true);
        let (mut scheduler, log, _snapshots) =
            scheduler(vec![Ok(frame)], SharedFocus::new(false), OutputMode::Keyboard);

        let snapshot = scheduler.tick_at(Instant::now()).unwrap();
        assert!(!snapshot.focused);
        assert!(log.is_empty());
        assert_eq!(
            scheduler.edges().state(crate::controller::InputId::Button(0)),
            Some(true)
        );
    }

    #[test]
    fn device_fault_abandons_only_that_tick() {
        let frames = vec![
            Err(DeviceError::PollError("usb hiccup".to_string())),
            Ok(RawDeviceFrame::default()),
        ];
        let (mut scheduler, _log, _snapshots) =
            scheduler(frames, SharedFocus::new(true), OutputMode::Keyboard);

        let now = Instant::now();
        assert!(matches!(
            scheduler.tick_at(now),
            Err(EngineError::DeviceFault(_))
        ));
        assert!(scheduler.tick_at(now).is_ok());
    }

    #[test]
    fn drain_releases_everything() {
        let frame = RawDeviceFrame::default().with_pedals(-1.0, -1.0, 1.0);
        let (mut scheduler, log, snapshots) =
            scheduler(vec![Ok(frame)], SharedFocus::new(true), OutputMode::Hybrid);
        scheduler.tick_at(Instant::now()).unwrap();
        assert_eq!(log.held_keys().len(), 2);

        let stopped = scheduler.halt().drain();
        assert!(stopped.is_idle());
        assert!(log.held_keys().is_empty());
        assert!(snapshots.borrow().active_keys.is_empty());
    }
}
