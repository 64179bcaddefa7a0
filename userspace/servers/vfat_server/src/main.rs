mod config;
mod logger;

use std::error::Error;
use std::io;
use std::process::ExitCode;

use log::{error, info};
use vfat::MountContext;

use crate::config::Config;

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::init(config.log_level) {
        eprintln!("vfat_server: logger: {e}");
        return ExitCode::FAILURE;
    }
    match serve(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("vfat: {}: {}", config.device.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: &Config) -> Result<(), Box<dyn Error>> {
    let fs = MountContext::open(&config.device, config.mount_options()?)?;
    info!("vfat: serving {} on stdin", config.device.display());
    vfat::server::run(&fs, io::stdin().lock(), io::stdout().lock())?;
    info!("vfat: end of requests, unmounting");
    Ok(())
}
