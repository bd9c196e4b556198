use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};
use xcbump::{arguments::Arguments, bump};

fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let cwd = std::env::current_dir()?;
    let outcome = bump::run(&args, &cwd)?;

    match &outcome.version {
        Some(version) => info!("Version {} build {}", version, outcome.build),
        None => info!("Build {}", outcome.build),
    }
    if let Some(tag) = &outcome.tag {
        info!("Tagged {}", tag);
    }

    Ok(())
}
