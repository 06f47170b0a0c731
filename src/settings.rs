use thiserror::Error;

pub const MIN_TIME_SCALE: f64 = 0.01;
pub const MAX_TIME_SCALE: f64 = 2.0;
pub const SLOW_MOTION_SCALE: f64 = 0.1;

pub const MAX_BEAT_SENSITIVITY: f32 = 2.0;
const BEAT_SENSITIVITY_STEP: f32 = 0.1;

/// Seconds per preset for duration presets `1..=9`.
pub const DURATION_PRESETS: [f64; 9] = [5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0];

pub const RANDOM_DURATION_MIN: u32 = 5;
pub const RANDOM_DURATION_MAX: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("duration preset {0} is out of range (1-9)")]
    UnknownDurationPreset(u8),
}

/// Shell-level playback parameters, handed to the engine by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub time_scale: f64,
    pub beat_sensitivity: f32,
    pub preset_duration: f64,
    pub random_duration: bool,
    pub shuffle: bool,
    pub locked: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            beat_sensitivity: 1.0,
            preset_duration: 30.0,
            random_duration: false,
            shuffle: true,
            locked: false,
        }
    }
}

impl PlaybackSettings {
    pub fn time_scale_up(&mut self) -> f64 {
        let step = if self.time_scale <= 0.09 { 0.01 } else { 0.1 };
        self.time_scale = (self.time_scale + step).min(MAX_TIME_SCALE);
        self.time_scale
    }

    pub fn time_scale_down(&mut self) -> f64 {
        let step = if self.time_scale <= 0.1 { 0.01 } else { 0.1 };
        self.time_scale = (self.time_scale - step).max(MIN_TIME_SCALE);
        self.time_scale
    }

    pub fn toggle_slow_motion(&mut self) -> f64 {
        self.time_scale = if self.time_scale == 1.0 {
            SLOW_MOTION_SCALE
        } else {
            1.0
        };
        self.time_scale
    }

    pub fn beat_sensitivity_up(&mut self) -> f32 {
        self.beat_sensitivity = (self.beat_sensitivity + BEAT_SENSITIVITY_STEP).min(MAX_BEAT_SENSITIVITY);
        self.beat_sensitivity
    }

    pub fn beat_sensitivity_down(&mut self) -> f32 {
        self.beat_sensitivity = (self.beat_sensitivity - BEAT_SENSITIVITY_STEP).max(0.0);
        self.beat_sensitivity
    }

    /// Picking a fixed duration turns random-duration mode off.
    pub fn set_duration_preset(&mut self, key: u8) -> Result<f64, SettingsError> {
        let seconds = key
            .checked_sub(1)
            .and_then(|i| DURATION_PRESETS.get(i as usize))
            .copied()
            .ok_or(SettingsError::UnknownDurationPreset(key))?;
        self.random_duration = false;
        self.preset_duration = seconds;
        Ok(seconds)
    }

    /// 1-based key of the table entry nearest the current duration.
    pub fn duration_preset(&self) -> u8 {
        let mut best = 0usize;
        for (i, d) in DURATION_PRESETS.iter().enumerate() {
            if (d - self.preset_duration).abs() < (DURATION_PRESETS[best] - self.preset_duration).abs() {
                best = i;
            }
        }
        best as u8 + 1
    }

    pub fn step_duration(&mut self, longer: bool) -> f64 {
        let key = self.duration_preset();
        let next = if longer { (key + 1).min(9) } else { key.saturating_sub(1).max(1) };
        self.random_duration = false;
        self.preset_duration = DURATION_PRESETS[next as usize - 1];
        self.preset_duration
    }

    pub fn toggle_random_duration(&mut self) -> bool {
        self.random_duration = !self.random_duration;
        self.random_duration
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }
}

pub fn random_duration(rng: &mut fastrand::Rng) -> f64 {
    f64::from(rng.u32(RANDOM_DURATION_MIN..=RANDOM_DURATION_MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_scale_uses_fine_steps_near_zero() {
        let mut s = PlaybackSettings {
            time_scale: 0.05,
            ..PlaybackSettings::default()
        };
        assert!((s.time_scale_up() - 0.06).abs() < 1e-9);
        s.time_scale = 0.1;
        assert!((s.time_scale_down() - 0.09).abs() < 1e-9);
        s.time_scale = 0.5;
        assert!((s.time_scale_down() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn time_scale_is_bounded() {
        let mut s = PlaybackSettings::default();
        for _ in 0..50 {
            s.time_scale_up();
        }
        assert_eq!(s.time_scale, MAX_TIME_SCALE);
        for _ in 0..500 {
            s.time_scale_down();
        }
        assert_eq!(s.time_scale, MIN_TIME_SCALE);
    }

    #[test]
    fn slow_motion_toggles() {
        let mut s = PlaybackSettings::default();
        assert_eq!(s.toggle_slow_motion(), SLOW_MOTION_SCALE);
        assert_eq!(s.toggle_slow_motion(), 1.0);
    }

    #[test]
    fn beat_sensitivity_is_clamped() {
        let mut s = PlaybackSettings::default();
        for _ in 0..30 {
            s.beat_sensitivity_up();
        }
        assert_eq!(s.beat_sensitivity, MAX_BEAT_SENSITIVITY);
        for _ in 0..30 {
            s.beat_sensitivity_down();
        }
        assert_eq!(s.beat_sensitivity, 0.0);
    }

    #[test]
    fn duration_presets_disable_random_mode() {
        let mut s = PlaybackSettings::default();
        s.toggle_random_duration();
        assert_eq!(s.set_duration_preset(8), Ok(90.0));
        assert!(!s.random_duration);
        assert_eq!(s.set_duration_preset(0), Err(SettingsError::UnknownDurationPreset(0)));
        assert_eq!(s.set_duration_preset(10), Err(SettingsError::UnknownDurationPreset(10)));
    }

    #[test]
    fn stepping_durations_stays_in_table() {
        let mut s = PlaybackSettings::default();
        assert_eq!(s.duration_preset(), 5);
        assert_eq!(s.step_duration(true), 45.0);
        for _ in 0..12 {
            s.step_duration(false);
        }
        assert_eq!(s.preset_duration, 5.0);
    }

    #[test]
    fn random_durations_are_whole_seconds_in_range() {
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..1_000 {
            let d = random_duration(&mut rng);
            assert!((5.0..=120.0).contains(&d));
            assert_eq!(d.fract(), 0.0);
        }
    }
}
