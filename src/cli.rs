use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trophyvault")]
#[command(about = "Achievement schema and identity resolution for third-party platform titles", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Cache directory for schemas, crosswalks and extracted images.
    #[arg(long, global = true)]
    pub(crate) cache_root: Option<PathBuf>,

    /// Local platform installation directory.
    #[arg(long, global = true)]
    pub(crate) install_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve the achievement schema for a canonical appid.
    Schema {
        appid: String,
        /// API language name (english, french, ...).
        #[arg(long, default_value = "english")]
        lang: String,
        /// Output the narrowed record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Crosswalk a platform-native id to its canonical id.
    Resolve {
        foreign_id: String,
        /// Foreign source platform tag.
        #[arg(long, default_value = "gog")]
        platform: String,
        #[arg(long)]
        json: bool,
    },

    /// Scan an emulator save root and resolve every discovered title.
    Scan {
        #[arg(short, long)]
        root: PathBuf,
        /// Foreign source platform tag.
        #[arg(long, default_value = "gog")]
        platform: String,
        #[arg(long)]
        json: bool,
    },

    /// Print the local installation's configuration index.
    Index {
        #[arg(long)]
        json: bool,
    },
}
