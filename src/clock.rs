use std::time::Instant;

/// Jitter magnitudes below this return the configured duration unchanged.
const EASTER_EGG_EPSILON: f64 = 0.001;
const MIN_SAMPLED_DURATION: f64 = 1.0;

pub trait TimeSource {
    /// Seconds since the source's own epoch.
    fn now_secs(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    pub preset_duration: f64,
    pub soft_cut_duration: f64,
    pub hard_cut_duration: f64,
    /// Standard deviation of the per-preset duration jitter, in seconds.
    pub easter_egg: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            preset_duration: 30.0,
            soft_cut_duration: 3.0,
            hard_cut_duration: 60.0,
            easter_egg: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    start_time: f64,
    frame: i64,
    duration: f64,
}

impl Slot {
    fn progress(&self, now: f64) -> f64 {
        ((now - self.start_time) / self.duration).min(1.0)
    }
}

/// Scaled playback time plus the A/B preset slots used for cross-fades.
///
/// Slot A is the preset on screen. Slot B only carries meaning while
/// [`PlaybackClock::is_smoothing`] is true.
pub struct PlaybackClock<T: TimeSource = WallClock> {
    source: T,
    cfg: ClockConfig,
    rng: fastrand::Rng,
    current_time: f64,
    time_scale: f64,
    last_real_time: f64,
    seconds_since_last_frame: f64,
    slot_a: Slot,
    slot_b: Slot,
    smoothing: bool,
}

impl PlaybackClock<WallClock> {
    pub fn new(cfg: ClockConfig, rng: fastrand::Rng) -> Self {
        Self::with_source(WallClock::new(), cfg, rng)
    }
}

impl<T: TimeSource> PlaybackClock<T> {
    pub fn with_source(source: T, cfg: ClockConfig, rng: fastrand::Rng) -> Self {
        let idle = Slot {
            start_time: 0.0,
            frame: 0,
            duration: cfg.preset_duration,
        };
        Self {
            source,
            cfg,
            rng,
            current_time: 0.0,
            time_scale: 1.0,
            last_real_time: 0.0,
            seconds_since_last_frame: 0.0,
            slot_a: idle,
            slot_b: idle,
            smoothing: false,
        }
    }

    pub fn tick(&mut self) {
        let now = self.source.now_secs();
        if self.last_real_time == 0.0 {
            self.last_real_time = now;
        }
        let real_delta = now - self.last_real_time;
        self.last_real_time = now;

        self.seconds_since_last_frame = real_delta * self.time_scale;
        self.current_time += self.seconds_since_last_frame;

        // Both counters advance even when B is idle.
        self.slot_a.frame += 1;
        self.slot_b.frame += 1;
    }

    pub fn start_preset(&mut self) {
        self.smoothing = false;
        self.slot_a = self.fresh_slot();
    }

    pub fn start_smoothing(&mut self) {
        self.smoothing = true;
        self.slot_b = self.fresh_slot();
    }

    pub fn end_smoothing(&mut self) {
        self.smoothing = false;
        self.slot_a = self.slot_b;
    }

    pub fn can_hard_cut(&self) -> bool {
        (self.current_time - self.slot_a.start_time) > self.cfg.hard_cut_duration
    }

    /// Cross-fade progress of slot B. Not clamped: blend callers clamp to `[0, 1]`.
    pub fn smooth_ratio(&self) -> f64 {
        (self.current_time - self.slot_b.start_time) / self.cfg.soft_cut_duration
    }

    /// Only the upper bound is clamped; a slot started ahead of the current
    /// time reports a negative ratio.
    pub fn preset_progress_a(&self) -> f64 {
        if self.smoothing {
            return 1.0;
        }
        self.slot_a.progress(self.current_time)
    }

    pub fn preset_progress_b(&self) -> f64 {
        self.slot_b.progress(self.current_time)
    }

    pub fn sampled_duration(&mut self) -> f64 {
        if self.cfg.easter_egg < EASTER_EGG_EPSILON {
            return self.cfg.preset_duration;
        }
        let draw = self.cfg.preset_duration + self.cfg.easter_egg * standard_normal(&mut self.rng);
        draw.max(MIN_SAMPLED_DURATION)
    }

    pub fn is_smoothing(&self) -> bool {
        self.smoothing
    }

    pub fn running_time(&self) -> f64 {
        self.current_time
    }

    pub fn seconds_since_last_frame(&self) -> f64 {
        self.seconds_since_last_frame
    }

    pub fn preset_frame_a(&self) -> i64 {
        self.slot_a.frame
    }

    pub fn preset_frame_b(&self) -> i64 {
        self.slot_b.frame
    }

    pub fn preset_time_a(&self) -> f64 {
        self.slot_a.start_time
    }

    pub fn preset_time_b(&self) -> f64 {
        self.slot_b.start_time
    }

    pub fn preset_duration_a(&self) -> f64 {
        self.slot_a.duration
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    /// Takes effect the next time a slot restarts.
    pub fn set_preset_duration(&mut self, seconds: f64) {
        self.cfg.preset_duration = seconds;
    }

    pub fn set_easter_egg(&mut self, jitter: f64) {
        self.cfg.easter_egg = jitter;
    }

    pub fn config(&self) -> &ClockConfig {
        &self.cfg
    }

    fn fresh_slot(&mut self) -> Slot {
        Slot {
            start_time: self.current_time,
            frame: 1,
            duration: self.sampled_duration(),
        }
    }
}

// Box-Muller; `1.0 - f64()` keeps the log argument in (0, 1].
fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct ManualTime(Rc<Cell<f64>>);

    impl TimeSource for ManualTime {
        fn now_secs(&self) -> f64 {
            self.0.get()
        }
    }

    fn clock_at(start: f64, cfg: ClockConfig) -> (PlaybackClock<ManualTime>, Rc<Cell<f64>>) {
        let t = Rc::new(Cell::new(start));
        let clock = PlaybackClock::with_source(ManualTime(t.clone()), cfg, fastrand::Rng::with_seed(7));
        (clock, t)
    }

    #[test]
    fn first_tick_yields_zero_delta() {
        let (mut clock, _t) = clock_at(12.5, ClockConfig::default());
        clock.tick();
        assert_eq!(clock.seconds_since_last_frame(), 0.0);
        assert_eq!(clock.running_time(), 0.0);
    }

    #[test]
    fn tick_applies_time_scale() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.set_time_scale(0.5);
        t.set(3.0);
        clock.tick();
        assert!((clock.seconds_since_last_frame() - 1.0).abs() < 1e-12);
        assert!((clock.running_time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tick_advances_both_frame_counters() {
        let (mut clock, _t) = clock_at(1.0, ClockConfig::default());
        clock.start_preset();
        clock.tick();
        clock.tick();
        assert_eq!(clock.preset_frame_a(), 3);
        assert_eq!(clock.preset_frame_b(), 2);
    }

    #[test]
    fn end_smoothing_promotes_slot_b() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.start_preset();
        t.set(5.0);
        clock.tick();
        clock.start_smoothing();
        assert!(clock.is_smoothing());
        assert_eq!(clock.preset_progress_a(), 1.0);
        t.set(6.5);
        clock.tick();
        assert!((clock.smooth_ratio() - 0.5).abs() < 1e-12);

        clock.end_smoothing();
        assert!(!clock.is_smoothing());
        assert_eq!(clock.preset_time_a(), 4.0);
        assert_eq!(clock.preset_frame_a(), 2);
    }

    #[test]
    fn smooth_ratio_is_not_clamped() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.start_smoothing();
        t.set(10.0);
        clock.tick();
        assert!(clock.smooth_ratio() > 1.0);
    }

    #[test]
    fn progress_caps_at_one() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.start_preset();
        t.set(15.0);
        clock.tick();
        assert!((clock.preset_progress_a() - 14.0 / 30.0).abs() < 1e-12);
        t.set(1_000.0);
        clock.tick();
        assert_eq!(clock.preset_progress_a(), 1.0);
    }

    #[test]
    fn progress_b_caps_at_one() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.start_smoothing();
        t.set(16.0);
        clock.tick();
        assert!((clock.preset_progress_b() - 0.5).abs() < 1e-12);
        t.set(31.0);
        clock.tick();
        assert_eq!(clock.preset_progress_b(), 1.0);
        t.set(500.0);
        clock.tick();
        assert_eq!(clock.preset_progress_b(), 1.0);
    }

    #[test]
    fn progress_runs_negative_when_time_goes_backwards() {
        let (mut clock, t) = clock_at(1.0, ClockConfig::default());
        clock.tick();
        clock.start_preset();
        clock.set_time_scale(-1.0);
        t.set(16.0);
        clock.tick();
        assert!((clock.running_time() + 15.0).abs() < 1e-12);
        assert!((clock.preset_progress_a() + 0.5).abs() < 1e-12);
        assert!((clock.preset_progress_b() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn hard_cut_after_ceiling() {
        let cfg = ClockConfig {
            hard_cut_duration: 10.0,
            ..ClockConfig::default()
        };
        let (mut clock, t) = clock_at(1.0, cfg);
        clock.tick();
        clock.start_preset();
        t.set(11.0);
        clock.tick();
        assert!(!clock.can_hard_cut());
        t.set(11.5);
        clock.tick();
        assert!(clock.can_hard_cut());
    }

    #[test]
    fn zero_jitter_returns_configured_duration() {
        let (mut clock, _t) = clock_at(1.0, ClockConfig::default());
        for _ in 0..100 {
            assert_eq!(clock.sampled_duration(), 30.0);
        }
    }

    #[test]
    fn jittered_duration_is_floored() {
        let cfg = ClockConfig {
            preset_duration: 2.0,
            easter_egg: 50.0,
            ..ClockConfig::default()
        };
        let (mut clock, _t) = clock_at(1.0, cfg);
        let mut saw_floor = false;
        for _ in 0..2_000 {
            let d = clock.sampled_duration();
            assert!(d >= 1.0);
            saw_floor |= d == 1.0;
        }
        assert!(saw_floor);
    }
}
