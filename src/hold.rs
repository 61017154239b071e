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

//! Hold mode: the payload launched by the system inhibitor while a plugin is inhibiting.
//!
//! The inhibitor keeps its sleep lock for as long as this process lives, so the loop only ends
//! once the check stops returning [INHIBIT_CODE], and its exit code becomes ours.

use std::{error::Error, process::Stdio, time::Duration};

use log::debug;
use tokio::process::Command;

use crate::{executor::exit_code, runner::INHIBIT_CODE};

/// Runs `command` every `sleep` seconds until it exits with something other than
/// [INHIBIT_CODE], and returns that exit code.
///
/// The check stays in this process' group: the runner terminates the group on shutdown.
pub async fn hold(sleep: f64, command: &str) -> Result<i32, Box<dyn Error>> {
    let period = Duration::try_from_secs_f64(sleep)
        .map_err(|err| format!("Invalid hold period {sleep}: {err}"))?;
    let argv = shlex::split(command)
        .filter(|argv| !argv.is_empty())
        .ok_or_else(|| format!("Invalid hold command \"{command}\""))?;
    let (program, args) = argv.split_at(1);

    loop {
        tokio::time::sleep(period).await;

        let status = Command::new(&program[0])
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|err| format!("Could not run \"{command}\": {err}"))?;

        let code = exit_code(status);
        if code != INHIBIT_CODE {
            debug!(target: "hold", "{command} returned {code}, releasing inhibitor");
            return Ok(code);
        }
    }
}
