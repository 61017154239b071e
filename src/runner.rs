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

//! Per plugin state machine.
//!
//! While idle the plain check command is run every poll period. When it exits with
//! [INHIBIT_CODE] the runner switches to the wrapped command instead: the system inhibitor holding
//! a sleep lock for as long as this program, re-invoked in hold mode, keeps seeing
//! [INHIBIT_CODE]. As soon as any other code comes back the runner is idle again.

use std::{ops::ControlFlow, sync::Arc};

use log::{debug, error};

use crate::{
    executor::{Executor, Outcome},
    plugin::PluginDescriptor,
    status::StatusSink,
    supervisor::{self, ShutdownReceiver},
};

/// Exit code with which a plugin asks for suspend to be inhibited
pub const INHIBIT_CODE: i32 = 254;

/// Last state announced for a plugin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunnerState {
    /// Nothing announced yet
    #[default]
    Unknown,
    Inhibiting,
    NotInhibiting,
}

enum Step {
    Exited(i32),
    Failed,
    Cancelled,
}

pub struct PluginRunner {
    plugin: PluginDescriptor,
    executor: Arc<dyn Executor>,
    status: Arc<dyn StatusSink>,
    state: RunnerState,
}

impl PluginRunner {
    pub fn new(
        plugin: PluginDescriptor,
        executor: Arc<dyn Executor>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            plugin,
            executor,
            status,
            state: RunnerState::Unknown,
        }
    }

    pub fn get_name(&self) -> &str {
        self.plugin.get_name()
    }

    /// Polls the plugin until shutdown is requested
    pub async fn run(mut self, mut shutdown: ShutdownReceiver) {
        loop {
            if self.poll(&mut shutdown).await.is_break() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.plugin.get_period()) => {}
                _ = supervisor::cancelled(&mut shutdown) => break,
            }
        }
        debug!(target: "runner", "{} stopped", self.plugin.get_name());
    }

    /// One idle poll, including the whole inhibiting episode it may start
    async fn poll(&mut self, shutdown: &mut ShutdownReceiver) -> ControlFlow<()> {
        let mut code = match self.execute(false, shutdown).await {
            Step::Exited(code) => code,
            Step::Failed => return ControlFlow::Continue(()),
            Step::Cancelled => return ControlFlow::Break(()),
        };

        while code == INHIBIT_CODE {
            self.announce(RunnerState::Inhibiting, code);

            code = match self.execute(true, shutdown).await {
                Step::Exited(code) => code,
                Step::Failed => return ControlFlow::Continue(()),
                Step::Cancelled => return ControlFlow::Break(()),
            };
        }

        self.announce(RunnerState::NotInhibiting, code);
        ControlFlow::Continue(())
    }

    async fn execute(&self, wrapped: bool, shutdown: &mut ShutdownReceiver) -> Step {
        let command = if wrapped {
            self.plugin.get_wrapped_command()
        } else {
            self.plugin.get_check_command()
        };

        match self.executor.execute(command, shutdown).await {
            Ok(Outcome::Exited(code)) => {
                debug!(target: "runner", "{} returned {code}", self.plugin.get_name());
                Step::Exited(code)
            }
            Ok(Outcome::Cancelled) => Step::Cancelled,
            Err(err) => {
                error!(
                    target: "runner",
                    "{}: could not run {}: {err}",
                    self.plugin.get_name(),
                    command.first().map(String::as_str).unwrap_or_default()
                );
                Step::Failed
            }
        }
    }

    /// Reports `state` unless it is the one already reported
    fn announce(&mut self, state: RunnerState, code: i32) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.status.report(
            self.plugin.get_name(),
            state == RunnerState::Inhibiting,
            code,
        );
    }
}
