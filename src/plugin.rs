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

//! Per plugin configuration, resolved and validated once at startup

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use log::info;

use crate::{
    error::ConfigError,
    settings::{PluginConfig, PluginDefaults},
};

/// What the plugin descriptors need to know about this program to build the inhibitor command
#[derive(Debug, Clone, Copy)]
pub struct Program<'a> {
    /// Resolved path of this executable
    pub path: &'a Path,
    /// Name reported to the inhibitor as `--who`
    pub name: &'a str,
    /// System inhibitor program, see [crate::platform::INHIBITOR_PROGRAMS]
    pub inhibitor: &'a str,
}

/// Immutable description of a plugin. Consumed by exactly one
/// [PluginRunner](crate::runner::PluginRunner).
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    name: String,
    path: PathBuf,
    check_command: Vec<String>,
    wrapped_command: Vec<String>,
    period: Duration,
    period_on: Duration,
    what: Option<String>,
}

impl PluginDescriptor {
    /// Validates `conf` (the `index`th plugin, starting at 1) and resolves it against the
    /// configuration defaults.
    pub fn new(
        index: usize,
        conf: &PluginConfig,
        defaults: &PluginDefaults,
        program: &Program,
    ) -> Result<Self, ConfigError> {
        let path = match conf.path.as_deref() {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => return Err(ConfigError::MissingPath(index)),
        };

        let display_name = match conf.name {
            Some(ref name) => name.clone(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        };
        let name = format!("Plugin {display_name}");

        let path = if path.is_absolute() {
            path
        } else {
            match defaults.plugin_dir {
                Some(dir) => dir.join(path),
                None => return Err(ConfigError::RelativePath { name, path }),
            }
        };
        let path = std::path::absolute(&path).unwrap_or(path);

        let path = match path.canonicalize() {
            Ok(path) => path,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::PathNotFound { name, path })
            }
            Err(source) => return Err(ConfigError::PathUnusable { name, path, source }),
        };

        let period_spec = conf.period.as_ref().unwrap_or(defaults.period);
        let period = period_spec.to_duration()?;

        let mut period_on_spec = conf
            .period_on
            .as_ref()
            .or(defaults.period_on)
            .unwrap_or(period_spec);
        let mut period_on = period_on_spec.to_duration()?;
        if period_on > period {
            period_on = period;
            period_on_spec = period_spec;
        }

        let command = check_command_line(&path, conf.args.as_deref()).ok_or_else(|| {
            ConfigError::InvalidArgs {
                name: name.clone(),
                args: conf.args.clone().unwrap_or_default(),
            }
        })?;
        let check_command = shlex::split(&command).ok_or_else(|| ConfigError::InvalidArgs {
            name: name.clone(),
            args: conf.args.clone().unwrap_or_default(),
        })?;

        let what = conf
            .what
            .as_deref()
            .or(defaults.what)
            .filter(|what| !what.is_empty())
            .map(str::to_owned);

        let wrapped_command = wrapped_command_line(program, &name, what.as_deref(), period_on, command);

        info!(
            target: "plugin",
            "{name} [{}] configured @ {}/{}",
            path.display(),
            period_spec,
            period_on_spec
        );

        Ok(Self {
            name,
            path,
            check_command,
            wrapped_command,
            period,
            period_on,
            what,
        })
    }

    /// Log facing name, `Plugin <name>`
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    /// The plain check, run while idle
    pub fn get_check_command(&self) -> &[String] {
        &self.check_command
    }

    /// The check wrapped by the system inhibitor, run while inhibiting
    pub fn get_wrapped_command(&self) -> &[String] {
        &self.wrapped_command
    }

    pub fn get_period(&self) -> Duration {
        self.period
    }

    pub fn get_period_on(&self) -> Duration {
        self.period_on
    }

    pub fn get_what(&self) -> Option<&str> {
        self.what.as_deref()
    }
}

/// Builds the descriptor of every configured plugin, stopping at the first invalid one
pub fn build_all(
    plugins: &[PluginConfig],
    defaults: &PluginDefaults,
    program: &Program,
) -> Result<Vec<PluginDescriptor>, ConfigError> {
    plugins
        .iter()
        .enumerate()
        .map(|(index, conf)| PluginDescriptor::new(index + 1, conf, defaults, program))
        .collect()
}

/// The check command as a single shell-quoted string, as it is embedded in the hold mode
/// arguments and tokenized again there
fn check_command_line(path: &Path, args: Option<&str>) -> Option<String> {
    let path = path.to_string_lossy();
    let mut command = shlex::try_quote(&path).ok()?.into_owned();
    if let Some(args) = args.filter(|args| !args.trim().is_empty()) {
        command.push(' ');
        command.push_str(args);
    }
    Some(command)
}

fn wrapped_command_line(
    program: &Program,
    name: &str,
    what: Option<&str>,
    period_on: Duration,
    command: String,
) -> Vec<String> {
    let mut wrapped = vec![program.inhibitor.to_owned()];
    if let Some(what) = what {
        wrapped.push(format!("--what={what}"));
    }
    wrapped.extend([
        format!("--who={}", program.name),
        format!("--why={name}"),
        program.path.to_string_lossy().into_owned(),
        "-s".to_owned(),
        period_on.as_secs_f64().to_string(),
        "-i".to_owned(),
        command,
    ]);
    wrapped
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::duration::TimeSpec;

    const PERIOD: &str = "5m";

    fn program() -> Program<'static> {
        Program {
            path: Path::new("/usr/bin/sleep-inhibitor"),
            name: "sleep-inhibitor",
            inhibitor: "systemd-inhibit",
        }
    }

    struct Fixture {
        dir: TempDir,
        period: TimeSpec,
        period_on: TimeSpec,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("check-audio.sh"), "#!/bin/sh\nexit 254\n").unwrap();
            fs::create_dir(dir.path().join("with space")).unwrap();
            fs::write(dir.path().join("with space/check"), "#!/bin/sh\n").unwrap();
            Self {
                dir,
                period: TimeSpec::from(PERIOD),
                period_on: TimeSpec::from(PERIOD),
            }
        }

        fn defaults(&self) -> PluginDefaults<'_> {
            PluginDefaults {
                period: &self.period,
                period_on: Some(&self.period_on),
                what: None,
                plugin_dir: Some(self.dir.path()),
            }
        }

        fn build(&self, conf: PluginConfig) -> Result<PluginDescriptor, ConfigError> {
            self.build_with(conf, &self.defaults())
        }

        fn build_with(
            &self,
            conf: PluginConfig,
            defaults: &PluginDefaults,
        ) -> Result<PluginDescriptor, ConfigError> {
            PluginDescriptor::new(3, &conf, defaults, &program())
        }

        fn plugin_path(&self, name: &str) -> PathBuf {
            self.dir.path().canonicalize().unwrap().join(name)
        }
    }

    fn conf(path: &str) -> PluginConfig {
        PluginConfig {
            path: Some(path.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn relative_path_with_defaults() {
        let fixture = Fixture::new();
        let plugin = fixture.build(conf("check-audio.sh")).unwrap();
        let path = fixture.plugin_path("check-audio.sh");

        assert_eq!(plugin.get_name(), "Plugin check-audio");
        assert_eq!(plugin.get_path(), path);
        assert_eq!(plugin.get_check_command(), [path.to_string_lossy()]);
        assert_eq!(plugin.get_period(), Duration::from_secs(300));
        assert_eq!(plugin.get_period_on(), Duration::from_secs(300));
        assert_eq!(plugin.get_what(), None);
        assert_eq!(
            plugin.get_wrapped_command(),
            [
                "systemd-inhibit".to_owned(),
                "--who=sleep-inhibitor".to_owned(),
                "--why=Plugin check-audio".to_owned(),
                "/usr/bin/sleep-inhibitor".to_owned(),
                "-s".to_owned(),
                "300".to_owned(),
                "-i".to_owned(),
                path.to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn overrides() {
        let fixture = Fixture::new();
        let hour = TimeSpec::from("1h");
        let defaults = PluginDefaults {
            period: &hour,
            what: Some("sleep:idle"),
            ..fixture.defaults()
        };
        let plugin = fixture
            .build_with(
                PluginConfig {
                    path: Some(fixture.plugin_path("check-audio.sh").to_string_lossy().into()),
                    name: Some("audio".to_owned()),
                    args: Some("-t 'a b' --quiet".to_owned()),
                    period: Some(TimeSpec::Number(2.0)),
                    period_on: Some(TimeSpec::from("30s")),
                    what: Some("sleep".to_owned()),
                },
                &defaults,
            )
            .unwrap();
        let path = fixture.plugin_path("check-audio.sh").to_string_lossy().into_owned();

        assert_eq!(plugin.get_name(), "Plugin audio");
        assert_eq!(plugin.get_check_command(), [path.as_str(), "-t", "a b", "--quiet"]);
        assert_eq!(plugin.get_period(), Duration::from_secs(120));
        assert_eq!(plugin.get_period_on(), Duration::from_secs(30));
        assert_eq!(plugin.get_what(), Some("sleep"));

        let wrapped = plugin.get_wrapped_command();
        assert_eq!(wrapped[1], "--what=sleep");
        assert_eq!(wrapped[2], "--who=sleep-inhibitor");
        assert_eq!(wrapped[3], "--why=Plugin audio");
        assert_eq!(wrapped[5..7], ["-s", "30"]);
        assert_eq!(wrapped[8], format!("{path} -t 'a b' --quiet"));
    }

    #[test]
    fn global_what_is_used() {
        let fixture = Fixture::new();
        let defaults = PluginDefaults {
            what: Some("sleep:idle"),
            ..fixture.defaults()
        };
        let plugin = fixture.build_with(conf("check-audio.sh"), &defaults).unwrap();
        assert_eq!(plugin.get_what(), Some("sleep:idle"));
        assert_eq!(plugin.get_wrapped_command()[1], "--what=sleep:idle");
    }

    #[test]
    fn period_on_is_clamped() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("1m"));
        plugin_conf.period_on = Some(TimeSpec::from("2h"));

        let plugin = fixture.build(plugin_conf).unwrap();
        assert_eq!(plugin.get_period(), Duration::from_secs(60));
        assert_eq!(plugin.get_period_on(), Duration::from_secs(60));
        assert_eq!(plugin.get_wrapped_command()[5], "60");
    }

    #[test]
    fn zero_period() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("0"));

        let plugin = fixture.build(plugin_conf).unwrap();
        assert_eq!(plugin.get_period(), Duration::ZERO);
        assert_eq!(plugin.get_period_on(), Duration::ZERO);
    }

    #[test]
    fn path_with_space_survives_requoting() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("with space/check");
        plugin_conf.args = Some("-v".to_owned());

        let plugin = fixture.build(plugin_conf).unwrap();
        let command = plugin.get_wrapped_command().last().unwrap();
        assert_eq!(shlex::split(command).unwrap(), plugin.get_check_command());
        assert_eq!(plugin.get_check_command().len(), 2);
    }

    #[test]
    fn missing_path() {
        let fixture = Fixture::new();
        let err = fixture.build(PluginConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin #3: path must be defined");

        let err = fixture.build(conf("")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPath(3)));
    }

    #[test]
    fn relative_path_without_plugin_dir() {
        let fixture = Fixture::new();
        let defaults = PluginDefaults {
            plugin_dir: None,
            ..fixture.defaults()
        };
        let err = fixture.build_with(conf("check-audio.sh"), &defaults).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Plugin check-audio: path \"check-audio.sh\" is relative but could not determine \
             distribution plugin dir"
        );
    }

    #[test]
    fn nonexistent_path() {
        let fixture = Fixture::new();
        let err = fixture.build(conf("/nonexistent/check")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Plugin check: \"/nonexistent/check\" does not exist"
        );
    }

    #[test]
    fn invalid_period() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("5x"));

        let err = fixture.build(plugin_conf).unwrap_err();
        assert!(err.to_string().contains("\"5x\""));
    }

    #[test]
    fn unbalanced_quotes_in_args() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.args = Some("'unterminated".to_owned());

        assert!(matches!(
            fixture.build(plugin_conf),
            Err(ConfigError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn bad_plugin_aborts_all() {
        let fixture = Fixture::new();
        let plugins = [conf("check-audio.sh"), PluginConfig::default()];
        let err = build_all(&plugins, &fixture.defaults(), &program()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin #2: path must be defined");

        let mut bad_period = conf("check-audio.sh");
        bad_period.period = Some(TimeSpec::from("5x"));
        let plugins = [conf("check-audio.sh"), bad_period];
        let err = build_all(&plugins, &fixture.defaults(), &program()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid time string \"5x\".");

        let plugins = [conf("check-audio.sh"), conf("with space/check")];
        assert_eq!(build_all(&plugins, &fixture.defaults(), &program()).unwrap().len(), 2);
    }

    #[test]
    fn period_on_follows_own_period() {
        let fixture = Fixture::new();
        let defaults = PluginDefaults {
            period_on: None,
            ..fixture.defaults()
        };
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("10m"));

        let plugin = fixture.build_with(plugin_conf, &defaults).unwrap();
        assert_eq!(plugin.get_period(), Duration::from_secs(600));
        assert_eq!(plugin.get_period_on(), plugin.get_period());
        assert_eq!(plugin.get_wrapped_command()[4..6], ["-s", "600"]);
    }

    #[test]
    fn global_period_on_wins_over_own_period() {
        let fixture = Fixture::new();
        let thirty = TimeSpec::from("30s");
        let defaults = PluginDefaults {
            period_on: Some(&thirty),
            ..fixture.defaults()
        };
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("10m"));

        let plugin = fixture.build_with(plugin_conf, &defaults).unwrap();
        assert_eq!(plugin.get_period_on(), Duration::from_secs(30));
    }

    #[test]
    fn overflowing_period_fails_construction() {
        let fixture = Fixture::new();
        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period = Some(TimeSpec::from("1e20"));
        assert!(matches!(
            fixture.build(plugin_conf),
            Err(ConfigError::InvalidTime(ref s)) if s == "1e20"
        ));

        let mut plugin_conf = conf("check-audio.sh");
        plugin_conf.period_on = Some(TimeSpec::Number(1e20));
        assert!(matches!(
            fixture.build(plugin_conf),
            Err(ConfigError::InvalidTime(_))
        ));
    }

    #[test]
    fn unusable_path_is_not_reported_missing() {
        let fixture = Fixture::new();
        let err = fixture.build(conf("check-audio.sh/inner")).unwrap_err();
        assert!(matches!(err, ConfigError::PathUnusable { .. }), "{err}");
        assert!(!err.to_string().contains("does not exist"));
    }

    #[test]
    fn relative_plugin_dir_is_reported_absolute() {
        let fixture = Fixture::new();
        let defaults = PluginDefaults {
            plugin_dir: Some(Path::new("no-such-plugin-dir")),
            ..fixture.defaults()
        };
        let err = fixture.build_with(conf("check"), &defaults).unwrap_err();
        match err {
            ConfigError::PathNotFound { path, .. } => {
                assert!(path.is_absolute(), "{}", path.display());
                assert!(path.ends_with("no-such-plugin-dir/check"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
