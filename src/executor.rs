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

//! Running plugin commands as child processes

use std::{
    io,
    os::unix::process::ExitStatusExt,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, warn};
use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use tokio::process::Command;

use crate::supervisor::{self, ShutdownReceiver};

/// How long a cancelled process group gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command ran to completion with this exit code
    Exited(i32),
    /// Shutdown was requested while the command was running; it has been terminated
    Cancelled,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs `command` (program followed by its arguments) to completion.
    ///
    /// Errors are only returned when the process could not be started.
    async fn execute(&self, command: &[String], shutdown: &mut ShutdownReceiver)
        -> io::Result<Outcome>;
}

/// Executor spawning real processes. Every command gets its own process group so that, on
/// shutdown, the whole tree below it (the system inhibitor and the hold loop it launched) is
/// terminated together and no inhibitor outlives this program.
#[derive(Debug, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(
        &self,
        command: &[String],
        shutdown: &mut ShutdownReceiver,
    ) -> io::Result<Outcome> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()?;

        tokio::select! {
            status = child.wait() => Ok(Outcome::Exited(exit_code(status?))),
            _ = supervisor::cancelled(shutdown) => {
                match child.id() {
                    Some(pid) => {
                        debug!(target: "executor", "Terminating process group {pid} ({program})");
                        if let Err(errno) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                            warn!(target: "executor", "Could not signal process group {pid}: {errno}");
                        }
                        if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
                            warn!(target: "executor", "{program} did not exit after SIGTERM, killing it");
                            child.kill().await?;
                        }
                    }
                    None => {
                        child.wait().await?;
                    }
                }
                Ok(Outcome::Cancelled)
            }
        }
    }
}

/// Exit code of a finished process. A process killed by a signal reports `128 + signal`, like a
/// shell does.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}
