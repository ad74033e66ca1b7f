mod settings;

pub use settings::{
    CoreConfig, CounterConfig, HttpConfig, OtelConfig, RedisConfig, Settings, SmtpAccountCredentials,
    SmtpConfig, TelegramConfig, MINIMUM_EMAIL_SIZE_LIMIT,
};
