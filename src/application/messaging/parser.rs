//! Command parser - Turns admin messages into structured commands

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::sanitizer::{sanitize, strip_formatting};
use crate::application::errors::CommandError;

/// Slack channel link, e.g. `<#C0123ABCD|general>`
static CHANNEL_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<#[A-Z0-9]+(\|[^>]*)?>$").expect("valid channel link pattern")
});

/// `keyword ...` administration commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordCommand {
    List,
    Help,
    Add { keyword: String, reply: String },
    QuickAdd { keyword: String, channels: Vec<String> },
    Template { text: String },
    Delete { keyword: String },
    ConfigList,
    Config { key: String, value: String },
}

/// `modbot ...` bot-level controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Status,
    Enable(String),
    Disable(String),
    Help,
}

/// Parses command messages; anything else is left to keyword matching
pub struct CommandParser {
    keyword_prefix: String,
    admin_prefix: String,
}

impl CommandParser {
    pub fn new(keyword_prefix: impl Into<String>, admin_prefix: impl Into<String>) -> Self {
        Self {
            keyword_prefix: keyword_prefix.into().to_lowercase(),
            admin_prefix: admin_prefix.into().to_lowercase(),
        }
    }

    /// Whether the message is addressed to the keyword administration
    pub fn is_keyword_command(&self, text: &str) -> bool {
        first_word(text).as_deref() == Some(self.keyword_prefix.as_str())
    }

    pub fn is_admin_command(&self, text: &str) -> bool {
        first_word(text).as_deref() == Some(self.admin_prefix.as_str())
    }

    /// Parse a `keyword ...` message. Returns `None` when the message is not one.
    pub fn parse_keyword(&self, text: &str) -> Option<Result<KeywordCommand, CommandError>> {
        if !self.is_keyword_command(text) {
            return None;
        }

        let (head, _) = take_words(text, 2);
        let subcommand = head.get(1).map(|s| sanitize(s)).unwrap_or_default();

        let command = match subcommand.as_str() {
            "" | "list" => Ok(KeywordCommand::List),
            "add" => {
                let (args, rest) = take_words(text, 3);
                match args.get(2) {
                    Some(keyword) if !rest.is_empty() => Ok(KeywordCommand::Add {
                        keyword: strip_formatting(keyword),
                        reply: rest.to_string(),
                    }),
                    _ => Err(CommandError::InvalidArgs("usage: keyword add <keyword> <message>".to_string())),
                }
            }
            "quickadd" => {
                let (args, rest) = take_words(text, 3);
                match args.get(2) {
                    Some(keyword) if !rest.is_empty() => {
                        let channels: Vec<String> = rest
                            .split_whitespace()
                            .filter(|token| CHANNEL_LINK.is_match(token))
                            .map(str::to_string)
                            .collect();
                        if channels.is_empty() {
                            Err(CommandError::InvalidArgs("no channel link found".to_string()))
                        } else {
                            Ok(KeywordCommand::QuickAdd {
                                keyword: strip_formatting(keyword),
                                channels,
                            })
                        }
                    }
                    _ => Err(CommandError::InvalidArgs(
                        "usage: keyword quickadd <keyword> #channel...".to_string(),
                    )),
                }
            }
            "template" => {
                let (_, rest) = take_words(text, 2);
                if rest.is_empty() {
                    Err(CommandError::InvalidArgs("usage: keyword template <text>".to_string()))
                } else {
                    Ok(KeywordCommand::Template { text: rest.to_string() })
                }
            }
            "delete" => {
                let (args, _) = take_words(text, 3);
                match args.get(2) {
                    Some(keyword) => Ok(KeywordCommand::Delete {
                        keyword: strip_formatting(keyword),
                    }),
                    None => Err(CommandError::InvalidArgs("usage: keyword delete <keyword>".to_string())),
                }
            }
            "config" => {
                let (args, rest) = take_words(text, 3);
                match args.get(2) {
                    Some(key) if !rest.is_empty() => Ok(KeywordCommand::Config {
                        key: strip_formatting(key),
                        value: strip_formatting(rest),
                    }),
                    _ => Ok(KeywordCommand::ConfigList),
                }
            }
            _ => Ok(KeywordCommand::Help),
        };

        Some(command)
    }

    /// Parse a `modbot ...` message. Returns `None` when the message is not one.
    pub fn parse_admin(&self, text: &str) -> Option<AdminCommand> {
        if !self.is_admin_command(text) {
            return None;
        }

        let (args, _) = take_words(text, 3);
        let verb = args.get(1).map(|s| sanitize(s)).unwrap_or_default();
        let target = args.get(2).map(|s| strip_formatting(s));

        let command = match (verb.as_str(), target) {
            ("status", _) | ("", _) => AdminCommand::Status,
            ("enable", Some(name)) => AdminCommand::Enable(name),
            ("disable", Some(name)) => AdminCommand::Disable(name),
            _ => AdminCommand::Help,
        };
        Some(command)
    }
}

fn first_word(text: &str) -> Option<String> {
    text.split_whitespace().next().map(sanitize)
}

/// Split off the first `n` whitespace-separated words, returning them and the
/// untouched remainder (leading whitespace removed, inner newlines kept).
fn take_words(text: &str, n: usize) -> (Vec<&str>, &str) {
    let mut words = Vec::with_capacity(n);
    let mut rest = text.trim_start();
    while words.len() < n {
        if rest.is_empty() {
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        words.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (words, rest.trim_end())
}
