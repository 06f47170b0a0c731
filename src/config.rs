use std::path::PathBuf;

use clap::Parser;

use crate::clock::ClockConfig;
use crate::settings::PlaybackSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "preset-deck", version, about = "Preset navigation, rating and pacing shell for a visualizer engine")]
pub struct Config {
    /// Directory scanned recursively for `.milk` presets.
    #[arg(long)]
    pub presets: PathBuf,

    /// Ratings file; defaults to `<config dir>/preset_deck/ratings.txt`.
    #[arg(long)]
    pub ratings: Option<PathBuf>,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = 30.0)]
    pub preset_duration: f64,

    #[arg(long, default_value_t = 3.0)]
    pub soft_cut: f64,

    #[arg(long, default_value_t = 60.0)]
    pub hard_cut: f64,

    /// Standard deviation of per-preset duration jitter; 0 disables it.
    #[arg(long, default_value_t = 0.0)]
    pub easter_egg: f64,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub shuffle: bool,

    #[arg(long, default_value_t = false)]
    pub favorites_only: bool,

    #[arg(long, default_value_t = false)]
    pub random_duration: bool,

    /// Seed for every random draw; omitted means a fresh seed per run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// tracing filter directive, e.g. `info` or `preset_deck=debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write logs here instead of stderr while the shell owns the terminal.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            preset_duration: self.preset_duration.max(1.0),
            soft_cut_duration: self.soft_cut.max(0.1),
            hard_cut_duration: self.hard_cut.max(0.0),
            easter_egg: self.easter_egg.max(0.0),
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            preset_duration: self.preset_duration.max(1.0),
            random_duration: self.random_duration,
            shuffle: self.shuffle,
            ..PlaybackSettings::default()
        }
    }

    pub fn ratings_path(&self) -> Option<PathBuf> {
        self.ratings.clone().or_else(crate::ratings::ratings_storage_path)
    }

    /// Independent generator for one consumer; `stream` keeps seeded runs
    /// from handing every consumer the same sequence.
    pub fn rng(&self, stream: u64) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(stream)),
            None => fastrand::Rng::new(),
        }
    }
}
