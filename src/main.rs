use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = preset_deck::config::Config::parse();
    preset_deck::logging::init(&cfg.log_level, cfg.log_file.as_deref())?;
    preset_deck::app::run(cfg)
}
