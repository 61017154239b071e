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

//! Error taxonomy. Everything here is fatal at startup; per-poll faults never reach this type and
//! are only logged by the runner that hit them.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid time string \"{0}\".")]
    InvalidTime(String),

    #[error("Time string \"{0}\" must not be negative.")]
    NegativeTime(String),

    #[error("Plugin #{0}: path must be defined")]
    MissingPath(usize),

    #[error("{name}: path \"{}\" is relative but could not determine distribution plugin dir", .path.display())]
    RelativePath { name: String, path: PathBuf },

    #[error("{name}: \"{}\" does not exist", .path.display())]
    PathNotFound { name: String, path: PathBuf },

    #[error("{name}: \"{}\" can not be used: {source}", .path.display())]
    PathUnusable {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{name}: could not parse args \"{args}\"")]
    InvalidArgs { name: String, args: String },

    #[error("Configuration file {} does not exist.{}", .path.display(), .hint.as_deref().map(|h| format!(" {h}")).unwrap_or_default())]
    MissingConfigFile { path: PathBuf, hint: Option<String> },

    #[error("No plugins configured")]
    NoPlugins,

    #[error("Configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("System does not support any sleep states, quitting.")]
    NoSleepStates,

    #[error("No systemd-inhibitor app installed from one of {0}.")]
    NoInhibitor(String),

    #[error("Could not determine package directory")]
    NoPackageDir,

    #[error("Could not resolve own executable path: {0}")]
    OwnExecutable(#[source] io::Error),
}
