use clap::{Args, Parser, Subcommand};
use mipmap_config::GalleryLayout;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mipmap", version, about = "Keep size-normalized artifacts for a media library", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enumerate a directory of images and record what was found
    Scan {
        /// Directory to use as the media index
        directory: PathBuf,
    },
    /// Enumerate, then generate any artifacts missing at the current width
    Sync(SyncArgs),
    /// Enumerate, wipe the artifact cache, then regenerate every artifact
    Recalculate(SyncArgs),
    /// Wipe the artifact cache at every width
    Clear,
    /// Show the recorded enumeration and the number of cached artifacts
    Status,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Directory to use as the media index
    pub directory: PathBuf,

    /// Number of gallery columns (1, 2, 3, 5, 6 or 8)
    #[arg(long)]
    pub columns: Option<u8>,

    /// Gap between gallery cells (1, 2, 4, 8 or 12)
    #[arg(long)]
    pub gap: Option<u8>,

    /// Width of the gallery window
    #[arg(long)]
    pub window_width: Option<f64>,
}

impl SyncArgs {
    /// Apply any layout overrides given on the command line.
    pub fn layout(&self, configured: GalleryLayout) -> GalleryLayout {
        GalleryLayout {
            window_width: self.window_width.unwrap_or(configured.window_width),
            columns: self.columns.unwrap_or(configured.columns),
            gap: self.gap.unwrap_or(configured.gap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_overrides() {
        let cli = Cli::try_parse_from(["mipmap", "sync", "/photos", "--columns", "3", "-v"]).unwrap();
        assert!(cli.verbose);
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        let layout = args.layout(GalleryLayout::default());
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.gap, 1);
        assert_eq!(layout.window_width, 390.0);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["mipmap", "status", "--config", "mipmap.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("mipmap.yaml")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_scan_requires_directory() {
        assert!(Cli::try_parse_from(["mipmap", "scan"]).is_err());
    }
}
