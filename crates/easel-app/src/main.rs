//! Main application entry point.

use clap::Parser;
use easel_app::CliArgs;

fn main() {
    env_logger::init();
    let args = CliArgs::parse();
    log::info!("Starting easel");

    match pollster::block_on(easel_app::run(&args)) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
