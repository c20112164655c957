//! Kernel command line options.
//!
//! Recognised keys:
//! - `log=<error|warn|info|debug|trace>`
//! - `boot.debug=<on|off>`: raise the log level to `debug` unless `log=`
//!   names one explicitly.
//!
//! Unknown keys and malformed values are ignored.

use halcyon_lib::{KlogLevel, klog_set_level, klog_warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootConfig {
    pub log_level: Option<KlogLevel>,
    pub debug: bool,
}

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "on" | "1" | "true" | "yes" => Some(true),
        "off" | "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl BootConfig {
    pub fn parse(cmdline: &str) -> Self {
        let mut config = Self::default();
        for token in cmdline.split_ascii_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            match key {
                "log" => match KlogLevel::parse(value) {
                    Some(level) => config.log_level = Some(level),
                    None => klog_warn!("boot: ignoring log level '{}'", value),
                },
                "boot.debug" => {
                    if let Some(on) = parse_switch(value) {
                        config.debug = on;
                    }
                }
                _ => {}
            }
        }
        config
    }

    /// Level the command line asks for, if any.
    pub fn effective_level(&self) -> Option<KlogLevel> {
        match (self.log_level, self.debug) {
            (Some(level), _) => Some(level),
            (None, true) => Some(KlogLevel::Debug),
            (None, false) => None,
        }
    }

    pub fn apply(&self) {
        if let Some(level) = self.effective_level() {
            klog_set_level(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_line_changes_nothing() {
        let config = BootConfig::parse("");
        assert_eq!(config, BootConfig::default());
        assert_eq!(config.effective_level(), None);
    }

    #[test]
    fn reads_log_level() {
        let config = BootConfig::parse("quiet log=trace root=/dev/hd1");
        assert_eq!(config.log_level, Some(KlogLevel::Trace));
        assert!(!config.debug);
    }

    #[test]
    fn debug_switch_implies_debug_level() {
        let config = BootConfig::parse("boot.debug=on");
        assert_eq!(config.effective_level(), Some(KlogLevel::Debug));
        let config = BootConfig::parse("boot.debug=on log=warn");
        assert_eq!(config.effective_level(), Some(KlogLevel::Warn));
    }

    #[test]
    fn malformed_values_are_ignored() {
        let config = BootConfig::parse("log=loud boot.debug=maybe log");
        assert_eq!(config, BootConfig::default());
    }
}
