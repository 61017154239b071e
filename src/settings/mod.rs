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

//! Module responsible with the tool's configuration

use std::path::{Path, PathBuf};

use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use log::LevelFilter;
use serde::Deserialize;

use crate::{duration::TimeSpec, error::ConfigError};

pub mod cli;
use cli::Args;

/// Configuration file looked up when no `--config` is given
pub const DEFAULT_CONFIG_DIR: &str = "/etc";

/// One entry of the `plugins` list
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PluginConfig {
    pub path: Option<String>,
    pub name: Option<String>,
    pub args: Option<String>,
    pub period: Option<TimeSpec>,
    pub period_on: Option<TimeSpec>,
    pub what: Option<String>,
}

/// Struct that stores the settings that affect the tool behaviour
#[derive(Deserialize, Debug)]
pub struct Settings {
    #[serde(default)]
    plugins: Option<Vec<PluginConfig>>,

    #[serde(default = "default_period")]
    period: TimeSpec,

    #[serde(default)]
    period_on: Option<TimeSpec>,

    #[serde(default)]
    what: Option<String>,

    #[serde(default)]
    plugin_dir: Option<PathBuf>,

    #[serde(default = "default_verbosity")]
    verbosity: LevelFilter,
}

/// Values shared by every plugin unless the plugin overrides them
#[derive(Debug, Clone)]
pub struct PluginDefaults<'a> {
    pub period: &'a TimeSpec,
    /// Global `period_on`; each plugin falls back to its own period when unset
    pub period_on: Option<&'a TimeSpec>,
    pub what: Option<&'a str>,
    pub plugin_dir: Option<&'a Path>,
}

impl Settings {
    /// Loads the configuration file selected by `cli`, with the CLI values merged on top.
    ///
    /// `package_dir` is only used to tell the user where a template configuration can be found
    /// when the default file is missing.
    pub fn new(cli: &Args, package_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match cli.config {
            Some(ref p) => expand_home(p),
            None => default_config_path(),
        };

        if !config_path.is_file() {
            let hint = match (cli.config.as_ref(), package_dir) {
                (None, Some(dir)) => Some(format!(
                    "Copy {}/{} to {DEFAULT_CONFIG_DIR} and edit appropriately.",
                    dir.display(),
                    config_file_name()
                )),
                _ => None,
            };
            return Err(ConfigError::MissingConfigFile {
                path: config_path,
                hint,
            });
        }

        Self::from_figment(
            Figment::new()
                .merge(Yaml::file(&config_path))
                .merge(Serialized::defaults(cli)),
        )
        .map_err(|source| ConfigError::Parse {
            path: config_path,
            source: Box::new(source),
        })
    }

    fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    /// Returns the configured plugins. An absent or empty list is a fatal error.
    pub fn get_plugins(&self) -> Result<&[PluginConfig], ConfigError> {
        match self.plugins.as_deref() {
            Some(plugins) if !plugins.is_empty() => Ok(plugins),
            _ => Err(ConfigError::NoPlugins),
        }
    }

    /// Plugin dir from the CLI or configuration, falling back to `fallback` (the distribution
    /// plugin dir, when installed)
    pub fn get_plugin_dir<'a>(&'a self, fallback: Option<&'a Path>) -> Option<&'a Path> {
        self.plugin_dir.as_deref().or(fallback)
    }

    pub fn get_defaults<'a>(&'a self, plugin_dir: Option<&'a Path>) -> PluginDefaults<'a> {
        PluginDefaults {
            period: &self.period,
            period_on: self.period_on.as_ref(),
            what: self.what.as_deref(),
            plugin_dir,
        }
    }

    /// Returns the log verbosity set in the configuration file
    pub fn get_verbosity(&self) -> LevelFilter {
        self.verbosity
    }
}

pub fn config_file_name() -> String {
    format!("{}.conf", env!("CARGO_PKG_NAME"))
}

fn default_config_path() -> PathBuf {
    Path::new(DEFAULT_CONFIG_DIR).join(config_file_name())
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Default poll period, 5 minutes
fn default_period() -> TimeSpec {
    TimeSpec::from("5m")
}

/// Default log verbosity, set to [LevelFilter::Info] so plugin state changes are shown
fn default_verbosity() -> LevelFilter {
    LevelFilter::Info
}
