use crate::clock::PlaybackClock;
use crate::config::Config;
use crate::control::{Command, Controller};
use crate::playlist::DirectoryPlaylist;
use crate::ratings::RatingStore;
use crate::selector::PresetSelector;
use crate::terminal::{draw_status, TerminalGuard};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const RNG_SELECTOR: u64 = 1;
const RNG_CLOCK: u64 = 2;
const RNG_CONTROLLER: u64 = 3;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let mut controller = build_controller(&cfg)?;
    let status = controller.status();
    info!(
        presets = status.total,
        rated = controller.selector().ratings().rated_count(),
        "preset deck ready"
    );

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    write!(out, "{}\r\n\r\n", help_line()).context("write help line")?;
    crossterm::queue!(out, crossterm::cursor::MoveToPreviousLine(1)).context("reserve status lines")?;

    let mut message = String::from("Ready");
    let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);

    loop {
        let frame_start = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            let Event::Key(k) = event::read()? else {
                continue;
            };
            if k.kind == KeyEventKind::Release {
                continue;
            }
            let Some(cmd) = command_for_key(k.code, k.modifiers) else {
                continue;
            };
            match controller.dispatch(cmd) {
                Ok(outcome) => {
                    if outcome.quit {
                        info!("quit requested");
                        return Ok(());
                    }
                    if let Some(text) = outcome.message {
                        message = text;
                    }
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), ?cmd, "command failed");
                    message = format!("error: {err:#}");
                }
            }
        }

        if let Some(text) = controller.update() {
            message = text;
        }

        draw_status(&mut out, &controller.status().to_string(), &message)?;

        let elapsed = frame_start.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

pub fn build_controller(cfg: &Config) -> anyhow::Result<Controller> {
    let playlist = DirectoryPlaylist::scan(&cfg.presets)
        .with_context(|| format!("scan presets in {}", cfg.presets.display()))?;

    let mut selector = PresetSelector::new(open_ratings(cfg.ratings_path()), cfg.rng(RNG_SELECTOR));
    selector.set_favorites_only(cfg.favorites_only);
    let clock = PlaybackClock::new(cfg.clock_config(), cfg.rng(RNG_CLOCK));

    Ok(Controller::new(
        playlist,
        selector,
        clock,
        cfg.playback_settings(),
        cfg.rng(RNG_CONTROLLER),
    ))
}

pub fn command_for_key(code: KeyCode, mods: KeyModifiers) -> Option<Command> {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return Some(Command::Quit);
    }

    let cmd = match code {
        KeyCode::Esc => Command::Quit,
        KeyCode::Right => Command::Next,
        KeyCode::Left => Command::Previous,
        KeyCode::Up => Command::TimeScaleUp,
        KeyCode::Down => Command::TimeScaleDown,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Command::Quit,
            'n' => Command::Next,
            'p' => Command::Previous,
            'r' => Command::Random,
            'b' => Command::HistoryBack,
            'w' => Command::HistoryForward,
            d @ '0'..='9' => Command::Rate(d as u8 - b'0'),
            'f' => Command::AddToFavorites,
            't' => Command::ToggleFavoritesOnly,
            'y' => Command::ToggleShuffle,
            'l' => Command::ToggleLock,
            ',' => Command::DurationDown,
            '.' => Command::DurationUp,
            'o' => Command::ToggleRandomDuration,
            '+' | '=' => Command::TimeScaleUp,
            '-' | '_' => Command::TimeScaleDown,
            's' => Command::ToggleSlowMotion,
            ']' => Command::BeatSensitivityUp,
            '[' => Command::BeatSensitivityDown,
            'd' => Command::TrashPreset,
            _ => return None,
        },
        _ => return None,
    };
    Some(cmd)
}

/// Unreadable ratings must not stop playback. The store keeps its path so
/// the next successful save rewrites the file.
fn open_ratings(path: Option<PathBuf>) -> RatingStore {
    let Some(path) = path else {
        warn!("no config directory; ratings will not be saved");
        return RatingStore::in_memory();
    };
    match RatingStore::open(&path) {
        Ok(store) => store,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ratings unreadable, starting empty");
            RatingStore::empty_at(path)
        }
    }
}

fn help_line() -> &'static str {
    "n/p/arrows nav | r random | b/w history | 1-9 rate, 0 clear | f fav | t fav-only | y shuffle | l lock | ,/. duration | o rnd-dur | +/- speed | s slow | [/] beat | d delete | q quit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_ratings() {
        assert_eq!(
            command_for_key(KeyCode::Char('7'), KeyModifiers::NONE),
            Some(Command::Rate(7))
        );
        assert_eq!(
            command_for_key(KeyCode::Char('0'), KeyModifiers::NONE),
            Some(Command::Rate(0))
        );
    }

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(
            command_for_key(KeyCode::Char('B'), KeyModifiers::SHIFT),
            Some(Command::HistoryBack)
        );
        assert_eq!(
            command_for_key(KeyCode::Char('w'), KeyModifiers::NONE),
            Some(Command::HistoryForward)
        );
    }

    #[test]
    fn unreadable_ratings_keep_their_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Reading a directory fails; the store must still remember where to save.
        let path = dir.path().join("ratings.txt");
        std::fs::create_dir(&path).expect("mkdir");
        let store = open_ratings(Some(path.clone()));
        assert_eq!(store.rated_count(), 0);
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn ctrl_c_quits_and_unknown_keys_are_ignored() {
        assert_eq!(
            command_for_key(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Command::Quit)
        );
        assert_eq!(command_for_key(KeyCode::Char('z'), KeyModifiers::NONE), None);
        assert_eq!(command_for_key(KeyCode::F(5), KeyModifiers::NONE), None);
    }
}
