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

//! CLI Args parsing and processing

use std::{fmt::Display, path::PathBuf};

use clap::{builder::PossibleValue, Parser, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Struct used to derive, parse and serialise CLI args. Only the fields that can also be given in
/// the configuration file are serialised, so that they override the file when merged.
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(author, version, about)]
pub struct Args {
    #[arg(short, long, value_name = "PATH", help = "Alternative configuration file")]
    #[serde(skip_serializing)]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR", help = "Alternative plugin dir")]
    #[serde(skip_serializing_if = "::std::option::Option::is_none")]
    pub plugin_dir: Option<PathBuf>,

    #[arg(
        short = 'P',
        long,
        help = "Just show directory where sample conf/service files, and default plugins can be found"
    )]
    #[serde(skip_serializing)]
    #[serde(default)]
    pub package_dir: bool,

    #[arg(
        short,
        long,
        ignore_case = true,
        default_value_if("quiet", true.to_string(), LogLevel(LevelFilter::Off).to_string()),
        help = "Log verbosity"
    )]
    #[serde(skip_serializing_if = "::std::option::Option::is_none")]
    verbosity: Option<LogLevel>,

    #[arg(
        short,
        long,
        conflicts_with = "verbosity",
        help = "Disables logging completely"
    )]
    #[serde(skip_serializing)]
    #[serde(default)]
    quiet: bool,

    // Hold mode. Only ever set by the command line the runner wraps with the system inhibitor.
    #[arg(short, long, value_name = "SECONDS", requires = "inhibit", hide = true)]
    #[serde(skip_serializing)]
    pub sleep: Option<f64>,

    #[arg(short, long, value_name = "COMMAND", requires = "sleep", hide = true)]
    #[serde(skip_serializing)]
    pub inhibit: Option<String>,
}

impl Args {
    pub fn get_log_level(&self) -> Option<LevelFilter> {
        self.verbosity.as_ref().map(|LogLevel(level)| *level)
    }

    /// Returns the hold mode parameters, when this process was started as the payload of a system
    /// inhibitor.
    pub fn get_hold(&self) -> Option<(f64, &str)> {
        match (self.sleep, self.inhibit.as_deref()) {
            (Some(sleep), Some(inhibit)) => Some((sleep, inhibit)),
            _ => None,
        }
    }
}

/// Wrapper type around [LevelFilter] to implement the trait [ValueEnum] for better CLI args
/// integration
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogLevel(LevelFilter);

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Self(LevelFilter::Off),
            Self(LevelFilter::Error),
            Self(LevelFilter::Warn),
            Self(LevelFilter::Info),
            Self(LevelFilter::Debug),
            Self(LevelFilter::Trace),
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.0.to_string()))
    }
}
