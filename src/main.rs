//! # Lucero CLI
//!
//! Command-line interface for revision B smart LCD panels.
//!
//! ## Usage
//!
//! ```bash
//! # Detect the panel's sub-revision
//! lucero hello
//!
//! # Paint an image at (0, 0)
//! lucero image background.png
//!
//! # Paint at an offset with an explicit size
//! lucero image --x 10 --y 20 --width 100 --height 50 logo.png
//!
//! # Brightness, backplate colour, orientation
//! lucero brightness 40
//! lucero backlight 255 0 128
//! lucero orientation landscape
//!
//! # Use a JSON config file instead of a preset
//! lucero --config panel.json clear
//! ```

use clap::{Parser, Subcommand};
use image::Rgb;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lucero::{DeviceSession, DisplayConfig, LuceroError, Orientation};

/// Lucero - Smart LCD panel utility
#[derive(Parser, Debug)]
#[command(name = "lucero")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial device of the panel
    #[arg(long, default_value = "/dev/ttyACM0", global = true)]
    device: PathBuf,

    /// JSON display configuration (overrides --preset)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Built-in display preset
    #[arg(long, default_value = "turing-3.5", global = true)]
    preset: String,

    /// Apply configured orientation, brightness and backplate colour first
    #[arg(long, global = true)]
    init: bool,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Perform the HELLO handshake and report the sub-revision
    Hello,

    /// Paint the whole screen white
    Clear,

    /// Set brightness (0-100)
    Brightness { level: u8 },

    /// Set the backplate LED colour (flagship panels only)
    Backlight { r: u8, g: u8, b: u8 },

    /// Set orientation (portrait, landscape, reverse-portrait, reverse-landscape)
    Orientation { orientation: Orientation },

    /// Turn the screen on at the configured brightness
    On,

    /// Turn the screen off
    Off,

    /// Paint an image file
    Image {
        file: PathBuf,

        #[arg(long, default_value = "0")]
        x: u16,

        #[arg(long, default_value = "0")]
        y: u16,

        /// Width to paint (0 = image width)
        #[arg(long, default_value = "0")]
        width: u16,

        /// Height to paint (0 = image height)
        #[arg(long, default_value = "0")]
        height: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LuceroError> {
    let config = match &cli.config {
        Some(path) => DisplayConfig::load(path)?,
        None => DisplayConfig::preset(&cli.preset)?,
    };

    // Decode before touching the device so a bad file leaves the panel alone
    let image = match &cli.command {
        Commands::Image { file, .. } => Some(
            image::open(file)
                .map_err(|e| LuceroError::Image(format!("{}: {}", file.display(), e)))?
                .to_rgb8(),
        ),
        _ => None,
    };

    let mut session = DeviceSession::open(&cli.device, config)?;
    let report = session.hello()?;

    if cli.init {
        session.apply_defaults()?;
    }

    match cli.command {
        Commands::Hello => {
            println!("Sub-revision: {}", report.effective());
            if !report.is_recognized() {
                println!("Device not fully recognised:");
                for issue in &report.issues {
                    println!("  {}", issue);
                }
            }
        }
        Commands::Clear => session.clear()?,
        Commands::Brightness { level } => session.set_brightness(level)?,
        Commands::Backlight { r, g, b } => session.set_backplate_color(Rgb([r, g, b]))?,
        Commands::Orientation { orientation } => session.set_orientation(orientation)?,
        Commands::On => session.screen_on()?,
        Commands::Off => session.screen_off()?,
        Commands::Image {
            x,
            y,
            width,
            height,
            ..
        } => {
            if let Some(image) = &image {
                session.display_bitmap(image, x, y, width, height)?;
            }
        }
    }

    session.flush();
    Ok(())
}
