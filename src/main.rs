use anyhow::Result;
use clap::Parser;
use wavestudio::logging::{self, LogSink};

fn main() -> Result<()> {
    let cfg = wavestudio::config::Config::parse();
    let sink = match &cfg.log_file {
        Some(path) => LogSink::File(path.clone()),
        None => LogSink::ErrorsOnly,
    };
    logging::init(&cfg.log_level, sink)?;

    if let Some(name) = cfg.save_preset.as_deref() {
        let path = cfg.visual.save_preset(name)?;
        println!("saved preset {:?} to {}", name.trim(), path.display());
        return Ok(());
    }
    if let Some(name) = cfg.delete_preset.as_deref() {
        if !cfg.visual.delete_preset(name)? {
            anyhow::bail!("no user preset named {:?}", name.trim());
        }
        println!("deleted preset {:?}", name.trim());
        return Ok(());
    }

    if cfg.list_devices {
        wavestudio::playback::list_output_devices()?;
        return Ok(());
    }

    wavestudio::app::run(cfg)
}
