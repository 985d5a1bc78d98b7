//! Injected configuration for the runner: the command-alias table and the
//! batch/interactive timeouts. These are host-supplied values rather than
//! something the core parses from a config file of its own.

use std::collections::HashMap;
use std::time::Duration;

use derive_builder::Builder;

/// Replaces the first token of a `$.`/`$!` command with a configured path
/// when present, leaving it verbatim otherwise.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.aliases.insert(name.into(), path.into());
    }

    pub fn resolve<'a>(&'a self, command: &'a str) -> &'a str {
        self.aliases
            .get(command)
            .map(|s| s.as_str())
            .unwrap_or(command)
    }
}

/// Host-supplied configuration for one run of the test suite.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(name = "finish"))]
pub struct RunnerConfig {
    #[builder(default)]
    pub alias_table: AliasTable,
    #[builder(default = "Duration::from_secs(30)")]
    pub shell_timeout: Duration,
    #[builder(default = "Duration::from_secs(10)")]
    pub expect_timeout: Duration,
    #[builder(default)]
    pub verbose: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfigBuilder::default()
            .finish()
            .expect("all RunnerConfig fields have defaults")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_known_command() {
        let mut table = AliasTable::new();
        table.insert("greet", "/usr/local/bin/greet");
        assert_eq!(table.resolve("greet"), "/usr/local/bin/greet");
        assert_eq!(table.resolve("echo"), "echo");
    }

    #[test]
    fn default_config_has_expected_timeouts() {
        let config = RunnerConfig::default();
        assert_eq!(config.shell_timeout, Duration::from_secs(30));
        assert_eq!(config.expect_timeout, Duration::from_secs(10));
        assert!(!config.verbose);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = RunnerConfigBuilder::default()
            .verbose(true)
            .shell_timeout(Duration::from_secs(5))
            .finish()
            .unwrap();
        assert!(config.verbose);
        assert_eq!(config.shell_timeout, Duration::from_secs(5));
    }
}
