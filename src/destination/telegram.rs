use crate::error::{NotificationError, Result};
use crate::validation::validate_id;

/// Telegram chat reached through a bot.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramDestination {
    bot_token: String,
    chat_id: String,
}

impl TelegramDestination {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self> {
        // Bot tokens look like "123456:ABC-DEF"; the colon is the only separator allowed
        let (bot_id, secret) = bot_token.split_once(':').ok_or_else(|| {
            NotificationError::InvalidDestination("Invalid Telegram bot token".to_string())
        })?;
        validate_id(bot_id)?;
        validate_id(secret)?;

        if chat_id.trim().is_empty() {
            return Err(NotificationError::InvalidDestination(
                "chat id is null or empty".to_string(),
            ));
        }

        Ok(Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl std::fmt::Debug for TelegramDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramDestination")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_destination() {
        let dest = TelegramDestination::new("123456:ABC-def_ghi", "-100200300").unwrap();
        assert_eq!(dest.chat_id(), "-100200300");
        assert!(!format!("{:?}", dest).contains("ABC-def"));

        assert!(TelegramDestination::new("no-colon", "1").is_err());
        assert!(TelegramDestination::new("123:bad token", "1").is_err());
        assert!(TelegramDestination::new("123:abc", " ").is_err());
    }
}
