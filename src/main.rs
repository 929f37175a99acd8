use std::error::Error;

use clap::Parser;
use log::info;

use people_scraper_lib::cli::{self, Args};
use people_scraper_lib::logger;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logger::init(logger::level_from_verbosity(args.verbose, args.quiet));
    info!("Starting People Scraper...");

    cli::run(args)?;
    Ok(())
}
