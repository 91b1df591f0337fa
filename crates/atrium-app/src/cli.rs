use clap::Parser;

/// Atrium — a desktop host for isolated web content surfaces.
#[derive(Parser, Debug)]
#[command(name = "atrium", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log directive override (e.g. "atrium=debug").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Check for updates on launch even if the config says not to.
    #[arg(long)]
    pub check_updates: bool,

    /// Move a file to the trash and exit.
    #[arg(long, value_name = "PATH")]
    pub trash: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
