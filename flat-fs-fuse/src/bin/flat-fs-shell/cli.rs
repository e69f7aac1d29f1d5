use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Interactive shell over a flat-fs image")]
pub struct Cli {
    /// Image file to mount on start
    #[arg(long, short)]
    pub image: Option<PathBuf>,

    /// Create the image with this many bytes before mounting
    #[arg(long, short, requires = "image")]
    pub create: Option<u64>,

    /// Format the image after mounting
    #[arg(long, short, requires = "image")]
    pub format: bool,

    /// Read commands from this file instead of stdin
    #[arg(long, short)]
    pub script: Option<PathBuf>,
}
