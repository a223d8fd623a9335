use anyhow::Result;
use clap::Parser;

mod cli;
mod logging;
mod output;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(args.verbose);
    args.run()
}
