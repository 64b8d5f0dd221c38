use std::path::PathBuf;

use clap::builder::{styling::AnsiColor, Styles};
use clap::Parser;

const ABOUT: &str = "City weather forecast TUI";

const LONG_ABOUT: &str = "
TUI for looking up a multi-day forecast by city name.

Type a city and press Enter to search. Ctrl-S stores the current forecast to the remote
store, Ctrl-D downloads the sky image into the download directory. Esc quits.

Diagnostics are written to the log file; set RUST_LOG to change the level.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(long, env = "WX_API_URL", help = "Weather lookup endpoint")]
    pub api_url: Option<String>,

    #[arg(
        long,
        env = "WX_ORIGIN",
        help = "Base URL the store endpoint is resolved against"
    )]
    pub origin: Option<String>,

    #[arg(
        long,
        env = "WX_DOWNLOAD_DIR",
        default_value = ".",
        help = "Directory the sky image is saved into"
    )]
    pub download_dir: PathBuf,

    #[arg(
        long,
        env = "WX_LATEST_ONLY",
        help = "Ignore search responses superseded by a newer search"
    )]
    pub latest_only: bool,

    #[arg(
        long,
        env = "WX_LOG_FILE",
        default_value = "wxcity.log",
        help = "Where diagnostics are written"
    )]
    pub log_file: PathBuf,
}
