// Copyright (C) 2025  Rafael Carvalho <contact@rafaelrc.com>

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as published by
// the Free Software Foundation.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// SPDX-License-Identifier: GPL-3.0-only

//! Run plugins that decide, by their exit code, whether system sleep/suspend should currently be
//! inhibited, and hold a system inhibitor for as long as they do

use std::{error::Error, process::ExitCode, sync::Arc};

use clap::Parser;
use log::LevelFilter;

mod duration;
mod error;
mod executor;
mod hold;
mod platform;
mod plugin;
mod runner;
mod settings;
mod status;
mod supervisor;

use error::PlatformError;
use executor::ProcessExecutor;
use plugin::Program;
use settings::{cli::Args, Settings};
use status::LogSink;
use supervisor::Supervisor;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            if logging_errors() {
                log::error!("{error}");
            } else {
                eprintln!("{error}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Whether error records currently reach the terminal. With logging turned off (`-q`, or
/// `verbosity: off` in the configuration) fatal errors still have to be shown.
fn logging_errors() -> bool {
    log::max_level() >= LevelFilter::Error
}

async fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Args::parse();

    // The logger lets everything through; the effective level is the global max level, which the
    // configuration file may still change.
    simplelog::TermLogger::init(
        LevelFilter::Trace,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    log::set_max_level(cli.get_log_level().unwrap_or(LevelFilter::Info));

    if let Some((sleep, command)) = cli.get_hold() {
        let code = hold::hold(sleep, command).await?;
        return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
    }

    let package_dir = platform::package_dir();

    if cli.package_dir {
        let package_dir = package_dir.ok_or(PlatformError::NoPackageDir)?;
        println!("{}", package_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    platform::check_sleep_support()?;

    let program_name = env!("CARGO_PKG_NAME");
    let program_path = platform::own_executable()?;
    let inhibitor = platform::locate_inhibitor(program_name).await?;

    let settings = Settings::new(&cli, package_dir.as_deref())?;
    if cli.get_log_level().is_none() {
        log::set_max_level(settings.get_verbosity());
    }

    let package_plugin_dir = platform::package_plugin_dir(package_dir.as_deref());
    let defaults = settings.get_defaults(settings.get_plugin_dir(package_plugin_dir.as_deref()));
    let program = Program {
        path: &program_path,
        name: program_name,
        inhibitor: &inhibitor,
    };

    // Every plugin is validated before the first one starts
    let plugins = plugin::build_all(settings.get_plugins()?, &defaults, &program)?;

    let mut supervisor = Supervisor::new(Arc::new(ProcessExecutor), Arc::new(LogSink));
    supervisor::shutdown_on_signals(supervisor.shutdown_handle())?;
    for plugin in plugins {
        supervisor.spawn(plugin);
    }
    supervisor.join().await;

    Ok(ExitCode::SUCCESS)
}
