use std::fmt;

use anyhow::Context;
use tracing::{info, warn};

use crate::clock::{PlaybackClock, TimeSource, WallClock};
use crate::playlist::DirectoryPlaylist;
use crate::ratings::{preset_file_name, RatingError, FAVORITE_RATING};
use crate::selector::{PlaylistView, PresetSelector};
use crate::settings::{random_duration, PlaybackSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Random,
    HistoryBack,
    HistoryForward,
    /// `0` clears the rating.
    Rate(u8),
    AddToFavorites,
    ToggleFavoritesOnly,
    ToggleShuffle,
    ToggleLock,
    SetDurationPreset(u8),
    DurationDown,
    DurationUp,
    ToggleRandomDuration,
    TimeScaleUp,
    TimeScaleDown,
    ToggleSlowMotion,
    BeatSensitivityUp,
    BeatSensitivityDown,
    TrashPreset,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    pub message: Option<String>,
    pub quit: bool,
}

impl Outcome {
    fn say(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            quit: false,
        }
    }

    fn quit() -> Self {
        Self {
            message: None,
            quit: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Switch {
    /// Manual or automatic move; recorded in history.
    Forward,
    /// Back/forward through history; not recorded.
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    Hard,
    Smooth,
}

/// Snapshot of what the control panel shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub preset: Option<String>,
    pub index: Option<u32>,
    pub total: u32,
    pub history: (usize, usize),
    pub rating: u8,
    pub favorites_only: bool,
    pub settings: PlaybackSettings,
    pub progress: f64,
    /// Blend factor in `[0, 1]` while cross-fading.
    pub blend: Option<f64>,
    pub running_time: f64,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.preset.as_deref().unwrap_or("No preset");
        write!(f, "{name}")?;
        if let Some(idx) = self.index {
            write!(f, " | {}/{}", idx + 1, self.total)?;
        }
        if self.history.1 > 0 {
            write!(f, " | H:{}/{}", self.history.0, self.history.1)?;
        }
        let stars: String = (1..=9u8)
            .map(|i| if i <= self.rating { '*' } else { '.' })
            .collect();
        write!(f, " | Rating: {stars}")?;
        if self.rating == FAVORITE_RATING {
            write!(f, " FAV")?;
        }
        let s = &self.settings;
        if s.random_duration {
            write!(f, " | Dur: RND")?;
        } else {
            write!(f, " | Dur: {:.0}s", s.preset_duration)?;
        }
        write!(
            f,
            " | Speed: {:.2}x | Beat: {:.1} | {:>3.0}%",
            s.time_scale,
            s.beat_sensitivity,
            self.progress.clamp(0.0, 1.0) * 100.0
        )?;
        if let Some(blend) = self.blend {
            write!(f, " | Fade: {:>3.0}%", blend * 100.0)?;
        }
        let mut modes = Vec::new();
        if s.shuffle {
            modes.push("Shuffle");
        }
        if s.locked {
            modes.push("Locked");
        }
        if self.favorites_only {
            modes.push("FavOnly");
        }
        if !modes.is_empty() {
            write!(f, " | {}", modes.join(" "))?;
        }
        Ok(())
    }
}

/// Routes [`Command`]s and per-frame updates to the playlist, the selector
/// and the clock.
pub struct Controller<T: TimeSource = WallClock> {
    playlist: DirectoryPlaylist,
    selector: PresetSelector,
    clock: PlaybackClock<T>,
    settings: PlaybackSettings,
    rng: fastrand::Rng,
}

impl<T: TimeSource> Controller<T> {
    pub fn new(
        playlist: DirectoryPlaylist,
        selector: PresetSelector,
        mut clock: PlaybackClock<T>,
        settings: PlaybackSettings,
        rng: fastrand::Rng,
    ) -> Self {
        clock.set_time_scale(settings.time_scale);
        clock.set_preset_duration(settings.preset_duration);
        let mut ctl = Self {
            playlist,
            selector,
            clock,
            settings,
            rng,
        };
        if let Some(pos) = ctl.playlist.position() {
            ctl.switch_to(pos, Switch::Forward, Cut::Hard);
        } else {
            ctl.clock.start_preset();
        }
        ctl
    }

    pub fn dispatch(&mut self, cmd: Command) -> anyhow::Result<Outcome> {
        let outcome = match cmd {
            Command::Next => self.advance(false, Cut::Hard),
            Command::Previous => self.step_back(),
            Command::Random => self.advance(true, Cut::Hard),
            Command::HistoryBack => match self.selector.go_back() {
                Some(idx) => {
                    self.switch_to(idx, Switch::History, Cut::Hard);
                    self.announce("history back")
                }
                None => Outcome::say("Already at start of history"),
            },
            Command::HistoryForward => match self.selector.go_forward() {
                Some(idx) => {
                    self.switch_to(idx, Switch::History, Cut::Hard);
                    self.announce("history forward")
                }
                None => self.advance(false, Cut::Hard),
            },
            Command::Rate(rating) => self.rate(rating)?,
            Command::AddToFavorites => self.rate(FAVORITE_RATING)?,
            Command::ToggleFavoritesOnly => {
                let on = self.selector.toggle_favorites_only();
                info!(favorites_only = on, "favorites-only mode");
                Outcome::say(format!("Favorites-only: {}", on_off(on)))
            }
            Command::ToggleShuffle => {
                let on = self.settings.toggle_shuffle();
                info!(shuffle = on, "shuffle");
                Outcome::say(format!("Shuffle: {}", on_off(on)))
            }
            Command::ToggleLock => {
                let on = self.settings.toggle_lock();
                info!(locked = on, "preset lock");
                Outcome::say(format!("Preset lock: {}", on_off(on)))
            }
            Command::SetDurationPreset(key) => {
                let secs = self
                    .settings
                    .set_duration_preset(key)
                    .context("set preset duration")?;
                self.apply_duration(secs)
            }
            Command::DurationDown => {
                let secs = self.settings.step_duration(false);
                self.apply_duration(secs)
            }
            Command::DurationUp => {
                let secs = self.settings.step_duration(true);
                self.apply_duration(secs)
            }
            Command::ToggleRandomDuration => {
                let on = self.settings.toggle_random_duration();
                info!(random_duration = on, "random duration mode");
                Outcome::say(format!("Random duration (5-120s): {}", on_off(on)))
            }
            Command::TimeScaleUp => {
                let scale = self.settings.time_scale_up();
                self.apply_time_scale(scale)
            }
            Command::TimeScaleDown => {
                let scale = self.settings.time_scale_down();
                self.apply_time_scale(scale)
            }
            Command::ToggleSlowMotion => {
                let scale = self.settings.toggle_slow_motion();
                self.apply_time_scale(scale)
            }
            Command::BeatSensitivityUp => {
                let v = self.settings.beat_sensitivity_up();
                Outcome::say(format!("Beat sensitivity: {v:.1}"))
            }
            Command::BeatSensitivityDown => {
                let v = self.settings.beat_sensitivity_down();
                Outcome::say(format!("Beat sensitivity: {v:.1}"))
            }
            Command::TrashPreset => self.trash()?,
            Command::Quit => Outcome::quit(),
        };
        Ok(outcome)
    }

    /// Advances the clock one frame and runs automatic transitions. Returns a
    /// message when the preset changed.
    pub fn update(&mut self) -> Option<String> {
        self.clock.tick();
        if self.clock.is_smoothing() {
            if self.clock.smooth_ratio() >= 1.0 {
                self.clock.end_smoothing();
            }
            return None;
        }
        if self.settings.locked || self.playlist.is_empty() {
            return None;
        }
        if self.clock.preset_progress_a() >= 1.0 {
            let cut = if self.clock.can_hard_cut() {
                Cut::Hard
            } else {
                Cut::Smooth
            };
            let outcome = self.advance(self.settings.shuffle, cut);
            if !self.clock.is_smoothing() && self.clock.preset_progress_a() >= 1.0 {
                // Nothing to switch to; wait another full duration before retrying.
                self.clock.start_preset();
            }
            return outcome.message;
        }
        None
    }

    pub fn status(&self) -> Status {
        let preset = self.playlist.current().map(|p| preset_file_name(p).to_string());
        let rating = self
            .playlist
            .current()
            .map(|p| self.selector.rating(p))
            .unwrap_or(0);
        Status {
            preset,
            index: self.playlist.position(),
            total: self.playlist.size(),
            history: self.selector.history_position(),
            rating,
            favorites_only: self.selector.favorites_only(),
            settings: self.settings.clone(),
            progress: self.clock.preset_progress_a(),
            blend: self
                .clock
                .is_smoothing()
                .then(|| self.clock.smooth_ratio().clamp(0.0, 1.0)),
            running_time: self.clock.running_time(),
        }
    }

    pub fn playlist(&self) -> &DirectoryPlaylist {
        &self.playlist
    }

    pub fn selector(&self) -> &PresetSelector {
        &self.selector
    }

    pub fn clock(&self) -> &PlaybackClock<T> {
        &self.clock
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    fn advance(&mut self, random: bool, cut: Cut) -> Outcome {
        if self.playlist.is_empty() {
            return Outcome::say("Playlist is empty");
        }
        let target = if random || self.settings.shuffle {
            self.selector.pick_random(&self.playlist)
        } else {
            self.step_sequential(true)
        };
        match target {
            Some(idx) => {
                self.switch_to(idx, Switch::Forward, cut);
                self.announce(if random { "random" } else { "next" })
            }
            None => Outcome::say("No favorites to choose from"),
        }
    }

    fn step_back(&mut self) -> Outcome {
        if self.playlist.is_empty() {
            return Outcome::say("Playlist is empty");
        }
        match self.step_sequential(false) {
            Some(idx) => {
                self.switch_to(idx, Switch::Forward, Cut::Hard);
                self.announce("previous")
            }
            None => Outcome::say("No favorites to choose from"),
        }
    }

    // Next/previous index in playlist order, honouring favorites-only mode.
    fn step_sequential(&mut self, forward: bool) -> Option<u32> {
        if !self.selector.favorites_only() {
            return if forward {
                self.playlist.next()
            } else {
                self.playlist.previous()
            };
        }
        let len = self.playlist.size();
        let start = self.playlist.position()?;
        (1..=len)
            .map(|step| {
                if forward {
                    (start + step) % len
                } else {
                    (start + len - step % len) % len
                }
            })
            .find(|&idx| {
                self.playlist
                    .item_at(idx)
                    .is_some_and(|p| self.selector.ratings().is_favorite(p))
            })
    }

    fn switch_to(&mut self, index: u32, switch: Switch, cut: Cut) {
        if !self.playlist.set_position(index) {
            warn!(index, "ignoring switch to index outside playlist");
            return;
        }
        if switch == Switch::Forward {
            self.selector.record_visit(index);
        }
        if self.settings.random_duration {
            let secs = random_duration(&mut self.rng);
            self.settings.preset_duration = secs;
            self.clock.set_preset_duration(secs);
            info!(seconds = secs, "random preset duration");
        }
        match cut {
            Cut::Hard => self.clock.start_preset(),
            Cut::Smooth => self.clock.start_smoothing(),
        }
    }

    fn announce(&self, how: &str) -> Outcome {
        let name = self
            .playlist
            .current()
            .map(preset_file_name)
            .unwrap_or("?");
        info!(preset = name, how, "displaying preset");
        Outcome::say(format!("{how}: {name}"))
    }

    fn rate(&mut self, rating: u8) -> anyhow::Result<Outcome> {
        let Some(preset) = self.playlist.current().map(str::to_string) else {
            return Ok(Outcome::say("No preset loaded"));
        };
        let name = preset_file_name(&preset).to_string();
        match self.selector.set_rating(&preset, rating) {
            Ok(()) => {}
            Err(RatingError::Io(err)) => {
                warn!(preset = %name, error = %err, "ratings not saved");
                return Ok(Outcome::say(format!("Rated {name} (not saved: {err})")));
            }
            Err(err) => return Err(err).with_context(|| format!("rate {name}")),
        }
        info!(preset = %name, rating, "rating updated");
        Ok(match rating {
            0 => Outcome::say(format!("Cleared rating for {name}")),
            FAVORITE_RATING => Outcome::say(format!("Favorite: {name}")),
            r => Outcome::say(format!("Rated {name}: {r}")),
        })
    }

    fn trash(&mut self) -> anyhow::Result<Outcome> {
        if self.playlist.is_empty() {
            return Ok(Outcome::say("No preset loaded"));
        }
        let dest = self.playlist.trash_current().context("move preset to deleted")?;
        // Indices shifted; the old history no longer points at the same presets.
        self.selector.clear_history();
        if let Some(pos) = self.playlist.position() {
            self.switch_to(pos, Switch::Forward, Cut::Hard);
        }
        info!(to = %dest.display(), "moved preset to deleted");
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Outcome::say(format!("Moved to deleted: {name}")))
    }

    fn apply_duration(&mut self, secs: f64) -> Outcome {
        self.clock.set_preset_duration(secs);
        info!(seconds = secs, "preset duration");
        Outcome::say(format!("Preset duration: {secs:.0}s"))
    }

    fn apply_time_scale(&mut self, scale: f64) -> Outcome {
        self.clock.set_time_scale(scale);
        info!(scale, "time scale");
        Outcome::say(format!("Time scale: {scale:.2}x"))
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "ON" } else { "OFF" }
}
