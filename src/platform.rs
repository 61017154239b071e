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

//! Checks of what the running system provides: sleep support, the system inhibitor program and
//! the installed package directory

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use log::{debug, info};
use tokio::process::Command;

use crate::error::PlatformError;

/// Programs able to hold a sleep inhibitor for the lifetime of a child process. Some non-systemd
/// systems ship an emulator instead of `systemd-inhibit`; the first one found is used.
pub const INHIBITOR_PROGRAMS: &[&str] = &["elogind-inhibit", "systemd-inhibit"];

const POWER_STATE: &str = "/sys/power/state";

/// Fails unless the kernel reports at least one sleep state
pub fn check_sleep_support() -> Result<(), PlatformError> {
    check_sleep_support_at(Path::new(POWER_STATE))
}

fn check_sleep_support_at(path: &Path) -> Result<(), PlatformError> {
    match std::fs::read_to_string(path) {
        Ok(states) if !states.trim().is_empty() => {
            debug!(target: "platform", "Supported sleep states: {}", states.trim());
            Ok(())
        }
        _ => Err(PlatformError::NoSleepStates),
    }
}

/// Returns the name of the first available inhibitor program of [INHIBITOR_PROGRAMS]
pub async fn locate_inhibitor(program_name: &str) -> Result<String, PlatformError> {
    locate_inhibitor_from(INHIBITOR_PROGRAMS, program_name).await
}

async fn locate_inhibitor_from(
    candidates: &[&str],
    program_name: &str,
) -> Result<String, PlatformError> {
    for candidate in candidates {
        let output = Command::new(candidate)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let version = stdout.lines().next().unwrap_or_default().trim();
                info!(target: "platform", "{program_name} using {candidate}, {version}");
                return Ok(candidate.to_string());
            }
            Ok(output) => {
                debug!(target: "platform", "{candidate} --version exited with {}", output.status)
            }
            Err(error) => debug!(target: "platform", "{candidate} not usable: {error}"),
        }
    }

    Err(PlatformError::NoInhibitor(candidates.join(" or ")))
}

/// Directory holding the sample configuration and the stock plugins, searched in the XDG data
/// directories (`/usr/local/share`, `/usr/share`, ...)
pub fn package_dir() -> Option<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix(env!("CARGO_PKG_NAME")).ok()?;
    dirs.find_data_file(crate::settings::config_file_name())
        .or_else(|| dirs.find_data_file("plugins"))
        .and_then(|found| found.parent().map(Path::to_path_buf))
}

/// The `plugins` directory of the package dir, if there is one
pub fn package_plugin_dir(package_dir: Option<&Path>) -> Option<PathBuf> {
    package_dir
        .map(|dir| dir.join("plugins"))
        .filter(|dir| dir.is_dir())
}

/// Resolved path of the running executable, used to re-invoke it in hold mode
pub fn own_executable() -> Result<PathBuf, PlatformError> {
    std::env::current_exe()
        .and_then(|exe| exe.canonicalize())
        .map_err(PlatformError::OwnExecutable)
}
