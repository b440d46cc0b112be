//! Background statistics sampler and input watchdog.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pocket_types::config::SystemConfig;

use crate::crash::CrashRecorder;
use crate::platform::SystemProbe;
use crate::stats::StatsHub;

/// Below this battery level the status LED blinks.
pub const LOW_BATTERY_PERCENT: f32 = 2.0;

pub const UNRESPONSIVE_MESSAGE: &str = "Application unresponsive";

const DISABLED: u64 = u64::MAX;

/// Input inactivity bound shared between the app and the monitor.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout_ms: Arc<AtomicU64>,
}

impl Watchdog {
    pub fn new(timeout: Option<Duration>) -> Self {
        let dog = Self {
            timeout_ms: Arc::new(AtomicU64::new(DISABLED)),
        };
        dog.set(timeout);
        dog
    }

    /// `None` disables the watchdog.
    pub fn set(&self, timeout: Option<Duration>) {
        let ms = timeout.map_or(DISABLED, |t| {
            u64::try_from(t.as_millis()).unwrap_or(DISABLED - 1)
        });
        self.timeout_ms.store(ms, Ordering::Relaxed);
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms.load(Ordering::Relaxed) {
            DISABLED => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn expired(&self, idle: Duration) -> bool {
        self.timeout().is_some_and(|t| idle > t)
    }
}

/// Periodic sampler. [`Monitor::step`] runs one period; [`Monitor::spawn`]
/// runs it forever on its own thread.
pub struct Monitor {
    probe: Arc<dyn SystemProbe>,
    stats: StatsHub,
    watchdog: Watchdog,
    crash: Arc<CrashRecorder>,
    time_jumped: Arc<AtomicBool>,
    grace: Duration,
    period: Duration,
    time_jump_secs: i64,
    led: bool,
    last_time: i64,
}

impl Monitor {
    pub fn new(
        probe: Arc<dyn SystemProbe>,
        stats: StatsHub,
        watchdog: Watchdog,
        crash: Arc<CrashRecorder>,
        config: &SystemConfig,
    ) -> Self {
        let last_time = probe.unix_time();
        Self {
            probe,
            stats,
            watchdog,
            crash,
            time_jumped: Arc::new(AtomicBool::new(false)),
            grace: config.startup_grace(),
            period: config.monitor_period(),
            time_jump_secs: config.time_jump_secs,
            led: false,
            last_time,
        }
    }

    /// Flag raised when the wall clock jumped. The main thread clears it
    /// after persisting the new time.
    pub fn time_jump_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.time_jumped)
    }

    /// Sample once. Aborts through the probe when the watchdog expired.
    pub fn step(&mut self) {
        let (counters, elapsed) = self.stats.take_counters(self.probe.uptime());
        let secs = elapsed.as_secs_f32();
        let battery = self.probe.battery();
        let memory = self.probe.memory();
        let stack = self.probe.stack_high_water();

        self.stats.update(|s| {
            match battery {
                Some(b) => {
                    s.battery_percent = b.percent;
                    s.battery_voltage = b.voltage;
                },
                None => {
                    s.battery_percent = 100.0;
                    s.battery_voltage = 0.0;
                },
            }
            if secs > 0.0 {
                s.busy_percent = (counters.busy_time.as_secs_f32() / secs * 100.0).min(100.0);
                s.skipped_fps = counters.skipped_frames as f32 / secs;
                s.total_fps = counters.total_frames as f32 / secs;
            }
            s.free_memory_int = memory.free_internal;
            s.free_memory_ext = memory.free_external;
            s.free_block_int = memory.largest_block_internal;
            s.free_block_ext = memory.largest_block_external;
            s.free_stack_main = stack;
        });
        let s = self.stats.snapshot();

        if s.battery_percent < LOW_BATTERY_PERCENT {
            self.led = !self.led;
            self.probe.set_led(self.led);
        } else if self.led {
            self.led = false;
            self.probe.set_led(false);
        }

        log::debug!(
            "STACK:{}, HEAP:{}+{}, BUSY:{:.2}%, FPS:{:.2} (SKIP:{}, PART:{}, FULL:{}), BATT:{:.2}",
            s.free_stack_main,
            s.free_memory_int / 1024,
            s.free_memory_ext / 1024,
            s.busy_percent,
            s.total_fps,
            counters.skipped_frames,
            counters.total_frames - counters.full_frames - counters.skipped_frames,
            counters.full_frames,
            s.battery_voltage
        );

        let idle = self.probe.gamepad_idle();
        if self.watchdog.expired(idle) {
            log::error!("no input polled for {:?}", idle);
            self.crash.record_panic(UNRESPONSIVE_MESSAGE, "");
            self.probe.abort();
        }

        let now = self.probe.unix_time();
        if (now - self.last_time).abs() > self.time_jump_secs {
            log::info!("wall clock jumped from {} to {}", self.last_time, now);
            self.time_jumped.store(true, Ordering::Relaxed);
        }
        self.last_time = now;
    }

    pub fn spawn(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sysmon".to_string())
            .spawn(move || {
                thread::sleep(self.grace);
                self.stats.reset(self.probe.uptime());
                self.last_time = self.probe.unix_time();
                loop {
                    thread::sleep(self.period);
                    self.step();
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultMemory, PanicTrace, RetainedRegion};
    use crate::logger::shared_log;
    use crate::test_utils::{MockProbe, PlatformExit, run_until_exit};
    use pocket_types::backend::DisplayCounters;
    use pocket_types::input::BatteryReading;

    struct Rig {
        monitor: Monitor,
        probe: Arc<MockProbe>,
        stats: StatsHub,
        watchdog: Watchdog,
        region: RetainedRegion,
    }

    fn rig() -> Rig {
        let probe = Arc::new(MockProbe::new());
        let stats = StatsHub::new();
        let watchdog = Watchdog::new(Some(Duration::from_secs(30)));
        let region = RetainedRegion::new();
        let crash = Arc::new(CrashRecorder::new(
            Box::new(region.clone()),
            shared_log(256),
            stats.clone(),
        ));
        let probe_dyn: Arc<dyn SystemProbe> = Arc::clone(&probe) as Arc<dyn SystemProbe>;
        let monitor = Monitor::new(
            probe_dyn,
            stats.clone(),
            watchdog.clone(),
            crash,
            &SystemConfig::default(),
        );
        Rig {
            monitor,
            probe,
            stats,
            watchdog,
            region,
        }
    }

    fn frames(n: u64) -> DisplayCounters {
        DisplayCounters {
            total_frames: n,
            full_frames: 0,
        }
    }

    #[test]
    fn watchdog_set_and_disable() {
        let dog = Watchdog::new(None);
        assert_eq!(dog.timeout(), None);
        assert!(!dog.expired(Duration::from_secs(3600)));
        dog.set(Some(Duration::from_secs(5)));
        assert!(dog.expired(Duration::from_secs(6)));
        assert!(!dog.expired(Duration::from_secs(5)));
    }

    #[test]
    fn watchdog_clones_share_timeout() {
        let dog = Watchdog::new(Some(Duration::from_secs(1)));
        let other = dog.clone();
        other.set(Some(Duration::from_secs(9)));
        assert_eq!(dog.timeout(), Some(Duration::from_secs(9)));
    }

    #[test]
    fn step_derives_rates() {
        let mut r = rig();
        r.stats.reset(Duration::ZERO);
        for i in 0..30 {
            // Every other frame reuses the display count, so half are skipped.
            r.stats.tick(frames(i / 2 + 1), Duration::from_millis(10));
        }
        r.probe.set_uptime(Duration::from_secs(1));
        r.monitor.step();

        let s = r.stats.snapshot();
        assert!((s.total_fps - 30.0).abs() < 0.01);
        assert!((s.skipped_fps - 15.0).abs() < 0.01);
        assert!((s.busy_percent - 30.0).abs() < 0.01);
        assert_eq!(s.free_stack_main, r.probe.stack_high_water());
    }

    #[test]
    fn busy_is_capped() {
        let mut r = rig();
        r.stats.tick(frames(1), Duration::from_secs(5));
        r.probe.set_uptime(Duration::from_secs(1));
        r.monitor.step();
        assert_eq!(r.stats.snapshot().busy_percent, 100.0);
    }

    #[test]
    fn low_battery_blinks_led() {
        let mut r = rig();
        r.probe.set_battery(Some(BatteryReading {
            percent: 1.0,
            voltage: 3.3,
        }));
        r.monitor.step();
        assert!(r.probe.led());
        r.monitor.step();
        assert!(!r.probe.led());
        r.monitor.step();
        assert!(r.probe.led());

        r.probe.set_battery(Some(BatteryReading {
            percent: 50.0,
            voltage: 3.9,
        }));
        r.monitor.step();
        assert!(!r.probe.led());
    }

    #[test]
    fn unreadable_battery_counts_as_full() {
        let mut r = rig();
        r.probe.set_battery(None);
        r.monitor.step();
        assert_eq!(r.stats.snapshot().battery_percent, 100.0);
        assert!(!r.probe.led());
    }

    #[test]
    fn idle_input_trips_watchdog() {
        let mut r = rig();
        r.probe.set_gamepad_idle(Duration::from_secs(31));
        let exit = run_until_exit(|| r.monitor.step());
        assert_eq!(exit, PlatformExit::Abort);

        let trace = PanicTrace::decode(&r.region.read()).unwrap();
        assert_eq!(trace.message, UNRESPONSIVE_MESSAGE);
    }

    #[test]
    fn relaxed_watchdog_tolerates_slow_io() {
        let mut r = rig();
        r.watchdog.set(Some(Duration::from_secs(60)));
        r.probe.set_gamepad_idle(Duration::from_secs(31));
        r.monitor.step();
        assert_eq!(r.probe.aborts(), 0);
    }

    #[test]
    fn clock_jump_raises_flag() {
        let mut r = rig();
        let flag = r.monitor.time_jump_flag();
        r.probe.set_unix_time(r.probe.unix_time() + 2);
        r.monitor.step();
        assert!(!flag.load(Ordering::Relaxed));

        r.probe.set_unix_time(r.probe.unix_time() + 3600);
        r.monitor.step();
        assert!(flag.load(Ordering::Relaxed));
    }
}
