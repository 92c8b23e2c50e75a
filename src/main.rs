use crate::app::App;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::scene::ScenePreset;
use clap::Parser;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod app;
mod camera;
mod config;
mod error;
mod output;
mod renderers;
mod scene;
mod time;
mod vulkan;

/// Renders the procedural ray tracing scene into numbered PNG frames.
#[derive(Parser, Debug)]
#[command(name = "rtengine", version)]
struct Cli {
    /// JSON render configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the frames are written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    frames: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Built in scene, ignored when the config describes its own
    #[arg(long)]
    preset: Option<ScenePreset>,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

impl Cli {
    fn apply(&self, config: &mut RenderConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(frames) = self.frames {
            config.frames = frames;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(preset) = self.preset {
            config.preset = preset;
        }
    }

    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.render_config()?;
    let mut app = App::new(config)?;
    app.run()
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = SimpleLogger::new().with_level(cli.log_level).env().init() {
        eprintln!("Failed to initialize logging: {}", err);
    }

    if let Err(err) = run(&cli) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn flags_override_the_config() {
        let cli = Cli::parse_from([
            "rtengine",
            "--output",
            "out",
            "--frames",
            "3",
            "--width",
            "64",
            "--preset",
            "metaballs",
        ]);
        let config = cli.render_config().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.frames, 3);
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 720);
        assert_eq!(config.preset, ScenePreset::Metaballs);
        assert_eq!(cli.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let cli = Cli::parse_from(["rtengine", "--frames", "0"]);
        assert!(matches!(cli.render_config(), Err(Error::Config(_))));
    }

    #[test]
    fn log_level_parses() {
        let cli = Cli::parse_from(["rtengine", "--log-level", "debug"]);
        assert_eq!(cli.log_level, log::LevelFilter::Debug);
    }
}
