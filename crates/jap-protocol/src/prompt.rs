//! Prompt detection for line-oriented shells
//!
//! Neither the switch CLI nor the receiver shell frames its replies, so a
//! command is complete once the shell prompt shows up in the accumulated
//! output.

use std::sync::LazyLock;

use regex::bytes::Regex;

const SWITCH_PATTERN: &str = "[a-zA-Z0-9]#";
const ENDPOINT_PATTERN: &str = "#";

static SWITCH_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SWITCH_PATTERN).expect("switch prompt pattern"));
static ENDPOINT_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ENDPOINT_PATTERN).expect("endpoint prompt pattern"));

/// Prompt pattern that marks the end of a command's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Switch exec prompt: an ASCII letter or digit immediately followed by `#`
    ///
    /// Configuration-mode prompts such as `switch(config-if)#` do not match,
    /// so a multi-line configuration command is only complete once the
    /// switch is back at `switch#`.
    Switch,
    /// Receiver shell prompt: any `#`
    Endpoint,
}

impl Prompt {
    /// Regular expression source of the prompt
    pub fn pattern(&self) -> &'static str {
        match self {
            Prompt::Switch => SWITCH_PATTERN,
            Prompt::Endpoint => ENDPOINT_PATTERN,
        }
    }

    /// Compiled prompt pattern, matched against raw shell output
    pub fn regex(&self) -> &'static Regex {
        match self {
            Prompt::Switch => &*SWITCH_PROMPT,
            Prompt::Endpoint => &*ENDPOINT_PROMPT,
        }
    }

    /// Whether `text` contains the prompt
    pub fn matches(&self, text: &str) -> bool {
        self.matches_bytes(text.as_bytes())
    }

    /// Whether raw output contains the prompt
    ///
    /// The output is not required to be valid UTF-8.
    pub fn matches_bytes(&self, data: &[u8]) -> bool {
        self.regex().is_match(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_exec_prompt() {
        assert!(Prompt::Switch.matches("VLAN dump...\r\nswitch01#"));
        assert!(Prompt::Switch.matches("japluxul01# "));
    }

    #[test]
    fn test_switch_config_prompt_does_not_match() {
        assert!(!Prompt::Switch.matches("switch(config)#"));
        assert!(!Prompt::Switch.matches("switch(config-if)#"));
        assert!(!Prompt::Switch.matches("# comment"));
    }

    #[test]
    fn test_partial_output() {
        assert!(!Prompt::Switch.matches("VLAN  Name  Ports\r\n 11  TRANSMITTER_1"));
    }

    #[test]
    fn test_prompt_after_invalid_utf8() {
        assert!(Prompt::Switch.matches_bytes(b"\xff\xfe\r\nswitch01#"));
        assert!(!Prompt::Switch.matches_bytes(b"\xff#"));
    }

    #[test]
    fn test_endpoint_prompt() {
        assert!(Prompt::Endpoint.matches("/ # "));
        assert!(!Prompt::Endpoint.matches("eth0:stat Link encap"));
    }
}
