//! Interval scheduling aligned to a fixed wall-clock phase.
//!
//! Times are durations since the Unix epoch. The phase offset is taken once
//! from the start time, so every snapshot after the first lands on
//! `k * interval + offset` no matter how long each cycle takes.

use anyhow::Result;
use std::convert::Infallible;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn from_nanos(nanos: u128) -> Duration {
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}

/// Returns the phase of `now` within `interval`.
pub fn phase_offset(now: Duration, interval: Duration) -> Duration {
    assert!(!interval.is_zero(), "interval must be non-zero");
    from_nanos(now.as_nanos() % interval.as_nanos())
}

/// Returns the first instant `k * interval + offset` strictly after `now`.
pub fn next_wake(now: Duration, interval: Duration, offset: Duration) -> Duration {
    assert!(offset < interval, "offset must lie within one interval");
    let (now, interval, offset) = (now.as_nanos(), interval.as_nanos(), offset.as_nanos());

    let slot = if now < offset {
        0
    } else {
        (now - offset) / interval + 1
    };
    from_nanos(slot * interval + offset)
}

/// Returns `target - now`, or `None` if `target` is in the past.
pub fn checked_duration_until(now: Duration, target: Duration) -> Option<Duration> {
    target.checked_sub(now)
}

/// Returns `target - now`.
///
/// # Panics
///
/// Panics if `now` is later than `target`.
pub fn duration_until(now: Duration, target: Duration) -> Duration {
    match checked_duration_until(now, target) {
        Some(duration) => duration,
        None => panic!("duration_until: {:?} is after {:?}", now, target),
    }
}

/// Source of wall-clock time and sleep.
pub trait Clock {
    /// Returns the current wall-clock time since the Unix epoch.
    fn now(&self) -> Duration;

    /// Suspends for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The system real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        let mut request = libc::timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as _,
        };
        let mut remaining = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        loop {
            // SAFETY: both pointers reference timespecs owned by this frame.
            if unsafe { libc::nanosleep(&request, &mut remaining) } == 0 {
                return;
            }

            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                trace!(
                    "Sleep interrupted, {}.{:09}s remaining",
                    remaining.tv_sec,
                    remaining.tv_nsec
                );
                request = remaining;
                continue;
            }

            warn!("nanosleep failed: {}", err);
            return;
        }
    }
}

/// Runs a cycle on every interval boundary.
#[derive(Debug)]
pub struct Scheduler<C: Clock = SystemClock> {
    interval: Duration,
    offset: Duration,
    clock: C,
}

impl Scheduler<SystemClock> {
    /// Creates a scheduler on the system clock, phased to the current time.
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    /// Creates a scheduler phased to `clock`'s current time.
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        let offset = phase_offset(clock.now(), interval);
        debug!(
            "Scheduling every {:?} at phase offset {:?}",
            interval, offset
        );
        Self {
            interval,
            offset,
            clock,
        }
    }

    /// Returns the snapshot interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the fixed phase offset.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Runs `cycle` once, then sleeps until the next boundary.
    ///
    /// Returns the boundary slept until.
    pub fn step<F>(&self, cycle: &mut F) -> Result<Duration>
    where
        F: FnMut() -> Result<()>,
    {
        cycle()?;

        let now = self.clock.now();
        let wake = next_wake(now, self.interval, self.offset);
        let delay = duration_until(now, wake);
        trace!("Sleeping {:?} until {:?}", delay, wake);
        self.clock.sleep(delay);
        Ok(wake)
    }

    /// Runs `cycle` on every boundary until it fails.
    pub fn run<F>(&self, mut cycle: F) -> Result<Infallible>
    where
        F: FnMut() -> Result<()>,
    {
        loop {
            self.step(&mut cycle)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    const fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// Clock that only moves when slept on or advanced by a cycle.
    struct FakeClock {
        now: Cell<Duration>,
    }

    impl FakeClock {
        fn at(now: Duration) -> Self {
            Self {
                now: Cell::new(now),
            }
        }

        fn time(&self) -> Duration {
            self.now.get()
        }

        fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for &FakeClock {
        fn now(&self) -> Duration {
            self.time()
        }

        fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }

    #[test]
    fn test_phase_offset() {
        assert_eq!(phase_offset(secs(1_000_012), secs(15)), secs(7));
        assert_eq!(phase_offset(secs(1_000_005), secs(15)), secs(0));
        assert_eq!(
            phase_offset(Duration::new(62, 250_000_000), secs(60)),
            Duration::new(2, 250_000_000)
        );
    }

    #[test]
    fn test_next_wake() {
        let offset = secs(7);
        assert_eq!(next_wake(secs(107), secs(15), offset), secs(112));
        assert_eq!(next_wake(secs(108), secs(15), offset), secs(112));
        assert_eq!(next_wake(secs(111), secs(15), offset), secs(112));
        assert_eq!(next_wake(secs(112), secs(15), offset), secs(127));
        assert_eq!(next_wake(secs(3), secs(15), offset), secs(7));
    }

    #[test]
    fn test_next_wake_on_boundary() {
        // Started exactly on a minute.
        let offset = phase_offset(secs(1_700_000_040), secs(15));
        assert_eq!(offset, Duration::ZERO);
        assert_eq!(
            next_wake(secs(1_700_000_040), secs(15), offset),
            secs(1_700_000_055)
        );
        assert_eq!(
            next_wake(Duration::new(1_700_000_041, 5), secs(15), offset),
            secs(1_700_000_055)
        );
    }

    #[test]
    fn test_next_wake_after_overrun() {
        // A cycle that outlasts its slot moves to the next grid point.
        assert_eq!(next_wake(secs(130), secs(15), secs(7)), secs(142));
    }

    #[test]
    fn test_duration_until() {
        let pairs = [
            (secs(0), secs(0)),
            (secs(10), secs(25)),
            (Duration::new(5, 900_000_000), Duration::new(6, 100_000_000)),
        ];
        for (a, b) in pairs {
            assert_eq!(a + duration_until(a, b), b);
        }
    }

    #[test]
    fn test_checked_duration_until_rejects_past() {
        let pairs = [
            (secs(1), secs(0)),
            (secs(25), secs(10)),
            (Duration::new(6, 1), Duration::new(6, 0)),
        ];
        for (a, b) in pairs {
            assert_eq!(checked_duration_until(a, b), None);
        }
    }

    #[test]
    #[should_panic(expected = "duration_until")]
    fn test_duration_until_panics_on_past() {
        duration_until(secs(25), secs(10));
    }

    #[test]
    fn test_wake_times_are_aligned() {
        let cases = [
            (Duration::new(1_700_000_007, 123_000_000), secs(15)),
            (secs(1_700_000_040), secs(15)),
            (Duration::new(999, 999_999_999), secs(60)),
            (secs(86_399), secs(1)),
        ];

        for (start, interval) in cases {
            let clock = FakeClock::at(start);
            let scheduler = Scheduler::with_clock(interval, &clock);
            let offset = scheduler.offset();
            assert_eq!(offset, phase_offset(start, interval));

            let mut runs = Vec::new();
            let mut jitter = 0u64;
            let mut cycle = || {
                runs.push(clock.time());
                // Cycles take varying time, always less than an interval.
                jitter = (jitter + 7) % 10;
                clock.advance(interval / 20 * jitter as u32);
                Ok(())
            };

            for _ in 0..5 {
                scheduler.step(&mut cycle).unwrap();
            }

            let expected: Vec<Duration> = (0..5u32).map(|k| start + interval * k).collect();
            assert_eq!(runs, expected);
            for run in &runs {
                assert_eq!(phase_offset(*run, interval), offset);
                assert!(*run >= start);
            }
        }
    }

    #[test]
    fn test_step_propagates_cycle_error() {
        let clock = FakeClock::at(secs(100));
        let scheduler = Scheduler::with_clock(secs(15), &clock);

        let mut cycle = || -> Result<()> { anyhow::bail!("sensor query failed") };
        assert!(scheduler.step(&mut cycle).is_err());
        assert_eq!(clock.time(), secs(100));
    }

    #[test]
    fn test_run_stops_on_error() {
        let clock = FakeClock::at(secs(100));
        let scheduler = Scheduler::with_clock(secs(10), &clock);
        let calls = RefCell::new(0);

        let err = scheduler
            .run(|| {
                *calls.borrow_mut() += 1;
                if *calls.borrow() == 3 {
                    anyhow::bail!("write failed");
                }
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "write failed");
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(clock.time(), secs(120));
    }

    #[test]
    fn test_system_clock_sleep() {
        let clock = SystemClock;
        let started = Instant::now();
        clock.sleep(Duration::from_millis(20));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    static SIGNALLED: AtomicBool = AtomicBool::new(false);

    extern "C" fn note_signal(_: libc::c_int) {
        SIGNALLED.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_system_clock_sleep_resumes_after_signal() {
        // No SA_RESTART, so the handler makes nanosleep fail with EINTR.
        // SAFETY: the action is fully initialised and the handler only
        // touches an atomic.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = note_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            assert_eq!(
                libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()),
                0
            );
        }

        // SAFETY: pthread_self has no preconditions.
        let sleeper = unsafe { libc::pthread_self() } as usize;
        let requested = Duration::from_millis(300);
        let started = Instant::now();

        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            // SAFETY: the target thread joins this one, so it is still alive.
            unsafe { libc::pthread_kill(sleeper as libc::pthread_t, libc::SIGUSR1) }
        });

        SystemClock.sleep(requested);
        let elapsed = started.elapsed();

        assert_eq!(interrupter.join().unwrap(), 0);
        assert!(SIGNALLED.load(Ordering::SeqCst));
        assert!(elapsed >= requested, "woke early after {:?}", elapsed);
        assert!(elapsed < requested * 2, "overslept by {:?}", elapsed);
    }
}
