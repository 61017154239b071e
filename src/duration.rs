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

//! Conversion of human time strings ("30s", "5m", "2h" or a bare number of minutes) into seconds

use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A time value as written in the configuration file. YAML lets users write either `5` or `"5m"`,
/// so both forms are kept until they are converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Number(f64),
    Text(String),
}

impl TimeSpec {
    /// Converts the value to a [Duration]. Unsuffixed values are minutes.
    pub fn to_duration(&self) -> Result<Duration, ConfigError> {
        let (value, mult) = match self {
            TimeSpec::Number(n) => (*n, 60.0),
            TimeSpec::Text(text) => {
                let (prefix, mult) = split_unit(text);
                let value = prefix
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidTime(text.clone()))?;
                (value, mult)
            }
        };

        if !value.is_finite() {
            return Err(ConfigError::InvalidTime(self.to_string()));
        }
        if value < 0.0 {
            return Err(ConfigError::NegativeTime(self.to_string()));
        }

        Duration::try_from_secs_f64(value * mult)
            .map_err(|_| ConfigError::InvalidTime(self.to_string()))
    }
}

fn split_unit(text: &str) -> (&str, f64) {
    match text.char_indices().last() {
        Some((i, 's')) => (&text[..i], 1.0),
        Some((i, 'm')) => (&text[..i], 60.0),
        Some((i, 'h')) => (&text[..i], 3600.0),
        _ => (text, 60.0),
    }
}

impl Display for TimeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSpec::Number(n) => n.fmt(f),
            TimeSpec::Text(text) => text.fmt(f),
        }
    }
}

impl From<&str> for TimeSpec {
    fn from(value: &str) -> Self {
        TimeSpec::Text(value.to_owned())
    }
}

impl From<f64> for TimeSpec {
    fn from(value: f64) -> Self {
        TimeSpec::Number(value)
    }
}
