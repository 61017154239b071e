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

//! Fan out of one runner task per plugin, and process wide shutdown

use std::{io, sync::Arc, thread};

use log::{debug, error, info};
use signal_hook::{consts::TERM_SIGNALS, iterator::Signals};
use tokio::{sync::watch, task::JoinSet};

use crate::{
    executor::Executor, plugin::PluginDescriptor, runner::PluginRunner, status::StatusSink,
};

pub type ShutdownReceiver = watch::Receiver<bool>;

/// Resolves once shutdown has been requested. Never resolves if the sending side is gone without
/// having requested it.
pub async fn cancelled(shutdown: &mut ShutdownReceiver) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Requests shutdown of every runner of a [Supervisor]
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

pub struct Supervisor {
    executor: Arc<dyn Executor>,
    status: Arc<dyn StatusSink>,
    shutdown: ShutdownHandle,
    runners: JoinSet<String>,
}

impl Supervisor {
    pub fn new(executor: Arc<dyn Executor>, status: Arc<dyn StatusSink>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            executor,
            status,
            shutdown: ShutdownHandle(Arc::new(shutdown)),
            runners: JoinSet::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Starts the runner task of `plugin`
    pub fn spawn(&mut self, plugin: PluginDescriptor) {
        debug!(
            target: "supervisor",
            "Starting {} [{}] every {:?}, {:?} while inhibiting, what: {}",
            plugin.get_name(),
            plugin.get_path().display(),
            plugin.get_period(),
            plugin.get_period_on(),
            plugin.get_what().unwrap_or("-")
        );
        let runner = PluginRunner::new(plugin, self.executor.clone(), self.status.clone());
        let shutdown = self.shutdown.0.subscribe();
        self.runners.spawn(async move {
            let name = runner.get_name().to_owned();
            runner.run(shutdown).await;
            name
        });
    }

    /// Waits for every runner. Runners only stop on shutdown, so without one this never returns.
    pub async fn join(mut self) {
        while let Some(result) = self.runners.join_next().await {
            match result {
                Ok(name) => debug!(target: "supervisor", "{name} stopped"),
                Err(err) if err.is_panic() => {
                    error!(target: "supervisor", "A plugin runner panicked: {err}")
                }
                Err(err) => error!(target: "supervisor", "A plugin runner failed: {err}"),
            }
        }
    }
}

/// Requests shutdown through `handle` whenever a termination signal arrives
pub fn shutdown_on_signals(handle: ShutdownHandle) -> io::Result<()> {
    let mut signals = Signals::new(TERM_SIGNALS)?;
    thread::Builder::new()
        .name("signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                info!(target: "supervisor", "Received signal {signal}, stopping plugins");
                handle.shutdown();
            }
        })?;
    Ok(())
}
