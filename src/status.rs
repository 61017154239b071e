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

//! Reporting of plugin state changes

use log::info;

/// Destination of the per plugin "is (not) inhibiting" lines. Shared by all runners, so every
/// implementation must write each line as a whole.
pub trait StatusSink: Send + Sync {
    fn report(&self, plugin: &str, inhibiting: bool, code: i32);
}

/// Writes status lines through the logger. The logger serialises records, so lines of different
/// plugins never interleave.
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, plugin: &str, inhibiting: bool, code: i32) {
        info!(target: "status", "{}", status_line(plugin, inhibiting, code));
    }
}

pub fn status_line(plugin: &str, inhibiting: bool, code: i32) -> String {
    let not = if inhibiting { "" } else { "not " };
    format!("{plugin} is {not}inhibiting suspend (return={code})")
}
