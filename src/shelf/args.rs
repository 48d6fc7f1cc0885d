use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Catalogue web app for validated records", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Address to listen on (default: localhost:8080)
    #[arg(long, value_name = "HOST:PORT")]
    pub url: Option<String>,

    /// Data directory of the record store, or ":memory:"
    #[arg(long, alias = "dburi", value_name = "DIR")]
    pub dbds: Option<String>,

    /// Directory with templates and static files (default: web)
    #[arg(long, value_name = "DIR")]
    pub web_root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of request worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
