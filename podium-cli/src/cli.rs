use clap::{Args, Parser, Subcommand, ValueHint};
use podium_core::surface::{INITIAL_DETECTION_DELAY, SURFACE_POLL_INTERVAL};
use podium_core::SelectorTarget;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Presentation overlay pipeline for a web chat surface",
    long_about = None,
    name = "podium",
    disable_help_subcommand = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable debug logging for podium crates
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log directory. Defaults to $HOME/.podium/logs
    #[arg(long, global = true, env = "PODIUM_LOG_DIR", value_hint = ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,

    /// JSON file mapping selector targets to strategy lists, merged over the saved overrides
    #[arg(long, global = true, env = "PODIUM_SELECTORS", value_hint = ValueHint::FilePath)]
    pub selectors: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay recorded document snapshots through a presentation session
    Replay(ReplayArgs),
    /// Dump element info for every match of a selector target
    Inspect(InspectArgs),
    /// Show or change the saved presentation settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Snapshot files, in capture order
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub snapshots: Vec<PathBuf>,

    /// Enter presentation mode as soon as the chat is detected
    #[arg(long, default_value_t = false)]
    pub present: bool,

    /// Delay between two snapshots once the chat is detected
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Delay between two snapshots while the chat is not detected yet
    #[arg(long, default_value_t = SURFACE_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Delay before the first snapshot, while the chat application boots
    #[arg(long, default_value_t = INITIAL_DETECTION_DELAY.as_millis() as u64)]
    pub initial_delay_ms: u64,

    /// Flash cycles to run before the alert is dismissed; 0 leaves it flashing
    #[arg(long, default_value_t = 6)]
    pub flash_ticks: u32,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub snapshot: PathBuf,

    /// Selector target to resolve, e.g. container, text, reaction, message-list
    #[arg(long, default_value = "container")]
    pub target: SelectorTarget,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the saved settings
    Show,
    /// Change the saved settings and publish them to in-process sessions
    Set(ConfigSetArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSetArgs {
    #[arg(long)]
    pub max_messages: Option<usize>,

    #[arg(long)]
    pub alert_glyph: Option<String>,

    #[arg(long)]
    pub popup_alerts: Option<bool>,

    /// Message font size in pixels
    #[arg(long)]
    pub font_size: Option<u32>,

    #[arg(long)]
    pub inspection: Option<bool>,
}

impl ConfigSetArgs {
    pub fn is_empty(&self) -> bool {
        self.max_messages.is_none()
            && self.alert_glyph.is_none()
            && self.popup_alerts.is_none()
            && self.font_size.is_none()
            && self.inspection.is_none()
    }
}
