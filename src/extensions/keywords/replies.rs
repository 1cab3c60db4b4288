//! Texts the keyword extension answers admins with

use crate::domain::entities::{KeywordReply, KeywordSettings, KeywordsState, SettingKey};

pub const CONFIG_IN_PUBLIC: &str = "Hello!\n\
Please configure me here, not in public (I'm a bit shy...)";

pub const HELP: &str = "Keywords extension help (admin only!):\n\
\n\
- Type *keyword list* for the list of keywords\n\
- Type *keyword add* _new_keyword message to display_ to add new keywords\n\
- Type *keyword quickadd* _new_keyword_ #channel1 #channel2 to add new keywords by using the template\n\
- Type *keyword template* _text with {channels}_ to change the template\n\
- Type *keyword delete* _existing_keyword_ to delete a keyword\n\
- Type *keyword config* to change my behavior\n\
\n\
*Attention!* Actions are performed without confirmation";

pub const SAVE_FAILED: &str = "I couldn't save that change, please retry later.";
pub const TEMPLATE_CONFIRMATION: &str = "Thanks! I'll use this new template now";
pub const CONFIG_CONFIRMATION: &str = "Thanks! Configuration modified.";
pub const CONFIG_UNKNOWN_KEY: &str = "I don't know that parameter...";
pub const DELETE_MISSING: &str = "This keyword doesn't exist";

pub fn not_understood(detail: &str) -> String {
    format!("I didn't understand your request, could you retry?\n_{}_", detail)
}

pub fn add_confirmation(keyword: &str) -> String {
    format!("Thanks! I'll reply to {} now", keyword)
}

pub fn delete_confirmation(keyword: &str) -> String {
    format!("Thanks! I won't reply to {} anymore", keyword)
}

/// `keyword list` answer: literal rules with their text, template rules with their channels
pub fn keyword_list(state: &KeywordsState) -> String {
    let mut literal = Vec::new();
    let mut templated = Vec::new();

    for rule in &state.rules {
        let triggers = rule
            .triggers
            .iter()
            .map(|t| format!("*{}*", t))
            .collect::<Vec<_>>()
            .join(", ");
        match &rule.reply {
            KeywordReply::Text(text) => literal.push(format!("{} : {}", triggers, text)),
            KeywordReply::Channels(channels) => {
                templated.push(format!("{} : {}", triggers, channels.join(" ")))
            }
        }
    }

    let none = || "_none_".to_string();
    format!(
        "Here is the list of configured keywords\n\
         *Keywords without templates*\n{}\n\n\
         *Keywords that use the template*\n{}",
        if literal.is_empty() { none() } else { literal.join("\n") },
        if templated.is_empty() { none() } else { templated.join("\n") },
    )
}

/// `keyword config` answer
pub fn config_list(settings: &KeywordSettings) -> String {
    let keys = SettingKey::ALL
        .iter()
        .map(|key| {
            format!(
                "*{}* : {} Expected value: true or false. - Current value: {}",
                key.as_str(),
                key.description(),
                settings.get(*key)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Hello!\n\
         Welcome to the configuration page to change my behavior\n\n\
         Type *keyword config* _key_ _value_ to change a value\n\n\
         List of configuration keys:\n{}\n\n\
         _Note:_ Enabling both _reply_in_thread_ and _reply_in_ephemeral_ means users will receive 2 messages\n\n\
         *Attention!* Actions are performed without confirmation",
        keys
    )
}
