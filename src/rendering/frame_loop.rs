//! Continuous per-frame driver for the stage.
//!
//! One task per loop: wait for the next tick, read the clock, advance every
//! mixer and draw. The loop is cancelled through a watch channel and joined
//! on [`FrameLoop::stop`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::host::SceneHost;
use crate::world::StageContext;

const METRICS_WINDOW: usize = 60;
const DEFAULT_FPS: f32 = 60.0;

/// Monotonic delta clock with a rolling window of frame times.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
    frame_times: VecDeque<Duration>,
    frames: u64,
    elapsed: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
            frames: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Time since the previous call (or since creation). Never negative.
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last);
        self.last = now;

        self.frames += 1;
        self.elapsed += delta;
        self.frame_times.push_back(delta);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_front();
        }
        delta
    }

    pub fn metrics(&self) -> FrameMetrics {
        let mut metrics = FrameMetrics {
            frames: self.frames,
            elapsed: self.elapsed,
            ..FrameMetrics::default()
        };
        let extremes = (self.frame_times.iter().min(), self.frame_times.iter().max());
        let (Some(min), Some(max)) = extremes else {
            return metrics;
        };

        let total: Duration = self.frame_times.iter().sum();
        let avg = total / self.frame_times.len() as u32;
        metrics.avg_frame_time_ms = avg.as_secs_f32() * 1000.0;
        metrics.min_frame_time_ms = min.as_secs_f32() * 1000.0;
        metrics.max_frame_time_ms = max.as_secs_f32() * 1000.0;
        metrics.avg_fps = if avg.is_zero() { 0.0 } else { 1.0 / avg.as_secs_f32() };
        metrics
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMetrics {
    pub frames: u64,
    /// Sum of every delta handed to the mixers.
    pub elapsed: Duration,
    pub avg_frame_time_ms: f32,
    pub min_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    pub avg_fps: f32,
}

struct Running {
    task: JoinHandle<()>,
    cancel: watch::Sender<bool>,
}

/// Owns the render task. At most one task runs per loop.
pub struct FrameLoop {
    context: Arc<StageContext>,
    host: Arc<Mutex<Box<dyn SceneHost>>>,
    period: Duration,
    running: Option<Running>,
    metrics: watch::Receiver<FrameMetrics>,
    metrics_tx: watch::Sender<FrameMetrics>,
}

impl FrameLoop {
    pub fn new(context: Arc<StageContext>, host: Box<dyn SceneHost>, target_fps: f32) -> Self {
        let fps = if target_fps.is_finite() && target_fps > 0.0 {
            target_fps
        } else {
            DEFAULT_FPS
        };
        let (metrics_tx, metrics) = watch::channel(FrameMetrics::default());
        Self {
            context,
            host: Arc::new(Mutex::new(host)),
            period: Duration::from_secs_f64(1.0 / fps as f64),
            running: None,
            metrics,
            metrics_tx,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|running| !running.task.is_finished())
    }

    /// Metrics of the current (or last) run.
    pub fn metrics(&self) -> FrameMetrics {
        self.metrics.borrow().clone()
    }

    pub async fn resize(&self, width: u32, height: u32) {
        self.host.lock().await.resize(width, height);
    }

    /// Spawns the frame task. Returns false if one is already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Frame loop already running");
            return false;
        }

        let (cancel, mut cancelled) = watch::channel(false);
        let context = Arc::clone(&self.context);
        let host = Arc::clone(&self.host);
        let metrics = self.metrics_tx.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut clock = FrameClock::new();

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.wait_for(|stop| *stop) => break,
                    _ = ticker.tick() => {}
                }
                if *cancelled.borrow() {
                    break;
                }

                let delta = clock.delta();
                let mut guard = host.lock().await;
                context.tick(delta.as_secs_f32(), &mut **guard).await;
                drop(guard);
                metrics.send_replace(clock.metrics());
            }
            debug!("Frame task exiting after {} frames", clock.metrics().frames);
        });

        info!("Frame loop started at {:.1} fps", 1.0 / self.period.as_secs_f64());
        self.running = Some(Running { task, cancel });
        true
    }

    /// Cancels the frame task and waits for it. Returns false if nothing was running.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        running.cancel.send_replace(true);
        if let Err(e) = running.task.await {
            error!("Frame task ended abnormally: {}", e);
        }
        info!("Frame loop stopped");
        true
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.send_replace(true);
            running.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_delta_is_monotonic() {
        let mut clock = FrameClock::new();
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(clock.delta(), Duration::from_millis(20));
        assert_eq!(clock.delta(), Duration::ZERO);

        let metrics = clock.metrics();
        assert_eq!(metrics.frames, 2);
        assert_eq!(metrics.elapsed, Duration::from_millis(20));
        assert!((metrics.max_frame_time_ms - 20.0).abs() < 1e-3);
    }
}
