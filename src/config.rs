use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Signed-in user id. Falls back to READALONG_USER; unset means signed out.
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// Path to the local SQLite store (used when no backend URL is given).
    /// Falls back to READALONG_DATABASE, then `readalong.db`.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
    /// Base URL of a PostgREST-style backend. Falls back to READALONG_BACKEND_URL.
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
    /// API key sent to the backend. Falls back to READALONG_API_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,
    /// Bearer token of the signed-in user. Falls back to READALONG_ACCESS_TOKEN.
    #[arg(long, global = true)]
    pub access_token: Option<String>,
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug_log: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read a text along with word-by-word highlighting
    Karaoke(KaraokeArgs),
    /// Print the generated timing table as JSON
    Timing(TextArgs),
    /// Toggle a like on an article
    Like { article_id: String },
    /// Mark an article as read
    Read {
        article_id: String,
        /// Clear the mark again if the article is already read
        #[arg(long)]
        toggle: bool,
    },
    /// Toggle a favorite category
    Favorite { category: String },
    /// Print the signed-in user's likes, reads or favorites
    List { set: SetKind },
    /// Record an article view
    View { article_id: String, category: String },
    /// Print the most viewed categories
    TopCategories {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Admin procedures (requires the admin role)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Role management for the local store
    #[command(subcommand)]
    Role(RoleCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Likes,
    Reads,
    Favorites,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// List every user
    Users,
    /// Show favorites and read-category counts for a user
    Stats { user_id: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommand {
    /// Grant a role to a user
    Grant { user_id: String, role: String },
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false, id = "source")]
pub struct TextSource {
    /// Text to read
    #[arg(long)]
    pub text: Option<String>,
    /// File holding the text to read
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    #[command(flatten)]
    pub source: TextSource,
    /// Seconds before the first word starts
    #[arg(long, default_value_t = 0.0)]
    pub offset: f64,
    /// Seed for reproducible timings
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct KaraokeArgs {
    #[command(flatten)]
    pub text: TextArgs,
    /// Print each word to stdout as it becomes current (default is the full-screen UI)
    #[arg(long)]
    pub pipe: bool,
    /// Follow an MPRIS player (`auto` or a service name) instead of the built-in clock
    #[arg(long)]
    pub player: Option<String>,
    /// Blocklist for MPRIS player service names (comma-separated, case-insensitive)
    #[arg(
        long = "block",
        value_name = "SERVICE1,SERVICE2",
        value_delimiter = ','
    )]
    pub block: Vec<String>,
    /// Start with per-word highlighting disabled (toggle with `k`)
    #[arg(long = "no-highlight")]
    pub no_highlight: bool,
}

pub const DEFAULT_DATABASE: &str = "readalong.db";

impl Config {
    /// Fill unset options from the environment.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if self.user.is_none() {
            self.user = var("READALONG_USER");
        }
        if self.database.is_none() {
            self.database = var("READALONG_DATABASE").map(PathBuf::from);
        }
        if self.backend_url.is_none() {
            self.backend_url = var("READALONG_BACKEND_URL");
        }
        if self.api_key.is_none() {
            self.api_key = var("READALONG_API_KEY");
        }
        if self.access_token.is_none() {
            self.access_token = var("READALONG_ACCESS_TOKEN");
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn parses_karaoke_with_block_list() {
        let cfg = Config::try_parse_from([
            "readalong", "karaoke", "--text", "hi there", "--player", "auto", "--block",
            "firefox,chromium", "--seed", "7",
        ])
        .unwrap();
        let Command::Karaoke(args) = cfg.command else {
            panic!("expected karaoke");
        };
        assert_eq!(args.block, vec!["firefox", "chromium"]);
        assert_eq!(args.text.seed, Some(7));
        assert_eq!(args.player.as_deref(), Some("auto"));
    }

    #[test]
    fn text_and_file_are_exclusive() {
        assert!(Config::try_parse_from(["readalong", "timing"]).is_err());
        assert!(
            Config::try_parse_from(["readalong", "timing", "--text", "a", "--file", "b"]).is_err()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cfg = Config::try_parse_from(["readalong", "list", "likes", "--user", "u1"]).unwrap();
        assert_eq!(cfg.user.as_deref(), Some("u1"));
        assert!(matches!(cfg.command, Command::List { set: SetKind::Likes }));
    }

    #[test]
    fn env_fills_only_missing_values() {
        let cfg = Config::try_parse_from(["readalong", "--user", "cli", "top-categories"]).unwrap();
        let cfg = cfg.with_env_from(|key| match key {
            "READALONG_USER" => Some("env".into()),
            "READALONG_BACKEND_URL" => Some(" https://db.example ".into()),
            "READALONG_API_KEY" => Some("".into()),
            _ => None,
        });
        assert_eq!(cfg.user.as_deref(), Some("cli"));
        assert_eq!(cfg.backend_url.as_deref(), Some("https://db.example"));
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.database_path(), PathBuf::from(DEFAULT_DATABASE));
    }
}
