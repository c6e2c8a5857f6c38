use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use markoslav_core::{UserId, DEFAULT_PAGE_SIZE};

/// Users allowed to moderate captions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList(HashSet<UserId>);

impl AdminList {
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub admins: AdminList,
    pub debug: bool,
    /// Directory for the SQLite database.
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    pub font_path: PathBuf,
    /// Chance, in percent, of captioning a photo nobody asked about.
    pub random_reply_percent: u8,
    pub page_size: usize,
    pub port: u16,
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("BOT_TOKEN").context("BOT_TOKEN environment variable is required")?;

        let admins = parse_admin_list(
            &env::var("BOT_ADMIN_LIST").context("BOT_ADMIN_LIST environment variable is required")?,
        )
        .context("BOT_ADMIN_LIST must be a comma-separated list of user ids")?;

        let debug = env::var("BOT_DEBUG")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let font_path = env::var("FONT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/Lobster-Regular.ttf"));

        let random_reply_percent = parse_percent(
            &env::var("RANDOM_REPLY_PERCENT").unwrap_or_else(|_| "50".to_string()),
        )
        .context("RANDOM_REPLY_PERCENT must be a number between 0 and 100")?;

        let page_size = env::var("PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse::<usize>()
            .context("PAGE_SIZE must be a valid number")?;
        if page_size == 0 {
            bail!("PAGE_SIZE must be positive");
        }

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            bot_token,
            admins,
            debug,
            state_dir,
            font_path,
            random_reply_percent,
            page_size,
            port,
            api_base_url,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.state_dir.join("markoslav.db")
    }
}

/// Parse a comma-separated list of numeric user ids.
///
/// Blank entries are skipped, so trailing commas are fine.
pub fn parse_admin_list(value: &str) -> Result<AdminList> {
    let mut ids = Vec::new();
    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part
            .parse::<i64>()
            .with_context(|| format!("invalid user id: {part:?}"))?;
        ids.push(UserId(id));
    }
    Ok(AdminList::new(ids))
}

pub fn parse_percent(value: &str) -> Result<u8> {
    let percent = value
        .trim()
        .parse::<u8>()
        .with_context(|| format!("not a number: {value:?}"))?;
    if percent > 100 {
        bail!("{percent} is above 100");
    }
    Ok(percent)
}
