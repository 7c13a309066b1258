use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;

pub const USAGE: &str = "Usage: scenecraft [--config PATH] [--bind ADDR] [--media-dir DIR]";

#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<PathBuf>,    // -c/--config
    pub bind: Option<String>,       // -b/--bind
    pub media_dir: Option<PathBuf>, // --media-dir
    pub help: bool,                 // -h/--help
}

impl CliArgs {
    pub fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    pub fn parse_from(args: &[String]) -> Result<Self> {
        let mut result = CliArgs::default();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{arg} requires a value"))
            };
            match arg.as_str() {
                "-c" | "--config" => result.config = Some(PathBuf::from(value()?)),
                "-b" | "--bind" => result.bind = Some(value()?),
                "--media-dir" => result.media_dir = Some(PathBuf::from(value()?)),
                "-h" | "--help" => result.help = true,
                unknown => return Err(anyhow!("Unknown argument: {unknown}\n{USAGE}")),
            }
        }

        Ok(result)
    }
}
