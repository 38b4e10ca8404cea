//! Subcommand handlers.

use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::admin::AdminClient;
use crate::config::{AdminCommand, Command, Config, KaraokeArgs, RoleCommand, SetKind, TextArgs};
use crate::event::ChannelSeeker;
use crate::karaoke::{KaraokeError, Seeker, TimingCache, WordTiming};
use crate::mpris::{MprisSeeker, find_player};
use crate::notify::ConsoleNotifier;
use crate::pool::{PlaybackSource, listen};
use crate::session::{Session, Subject};
use crate::store::{NewRow, RemoteStore, RestStore, SqliteStore, StoreError, Table};
use crate::timer::PlaybackClock;
use crate::toggle::{SetProfile, ToggleOutcome, ToggleSet};
use crate::views::ArticleViews;

type CmdResult = Result<(), Box<dyn Error + Send + Sync>>;

const LOCAL_POLL: Duration = Duration::from_millis(250);
const MPRIS_POLL: Duration = Duration::from_millis(1000);

pub async fn run(cfg: Config) -> CmdResult {
    match &cfg.command {
        Command::Karaoke(args) => karaoke(args).await,
        Command::Timing(args) => timing(args),
        Command::Like { article_id } => toggle(&cfg, SetProfile::likes(), article_id).await,
        Command::Read {
            article_id,
            toggle: true,
        } => toggle(&cfg, SetProfile::reads(), article_id).await,
        Command::Read {
            article_id,
            toggle: false,
        } => mark_read(&cfg, article_id).await,
        Command::Favorite { category } => toggle(&cfg, SetProfile::favorites(), category).await,
        Command::List { set } => list(&cfg, *set).await,
        Command::View {
            article_id,
            category,
        } => view(&cfg, article_id, category).await,
        Command::TopCategories { limit } => top_categories(&cfg, *limit).await,
        Command::Admin(cmd) => admin(&cfg, cmd).await,
        Command::Role(RoleCommand::Grant { user_id, role }) => grant_role(&cfg, user_id, role).await,
    }
}

/// REST backend when a URL is configured, otherwise the local SQLite file.
async fn open_store(cfg: &Config) -> Result<Arc<dyn RemoteStore>, StoreError> {
    if let Some(url) = &cfg.backend_url {
        tracing::debug!(url = %url, "Using REST backend");
        let store = RestStore::new(url.as_str(), cfg.api_key.clone().unwrap_or_default())
            .with_access_token(cfg.access_token.clone());
        return Ok(Arc::new(store));
    }
    let path = cfg.database_path();
    tracing::debug!(path = %path.display(), "Using local store");
    Ok(Arc::new(SqliteStore::open(&path).await?))
}

fn session(cfg: &Config) -> Session {
    Session::new(cfg.user.clone().map(Subject::new))
}

fn load_timings(args: &TextArgs) -> Result<Arc<Vec<WordTiming>>, KaraokeError> {
    let text = match (&args.source.text, &args.source.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    if text.split_whitespace().next().is_none() {
        return Err(KaraokeError::EmptyText);
    }
    let mut cache = match args.seed {
        Some(seed) => TimingCache::seeded(seed),
        None => TimingCache::new(),
    };
    Ok(cache.get_or_generate(&text, args.offset))
}

fn timing(args: &TextArgs) -> CmdResult {
    let timings = load_timings(args)?;
    println!("{}", serde_json::to_string_pretty(timings.as_ref())?);
    Ok(())
}

async fn karaoke(args: &KaraokeArgs) -> CmdResult {
    let timings = load_timings(&args.text)?;
    let (update_tx, update_rx) = mpsc::channel(32);
    let (player_tx, player_rx) = mpsc::channel(8);

    let (source, poll) = match &args.player {
        Some(requested) => {
            let service = find_player(requested, &args.block).await?;
            tracing::info!(service = %service, "Following MPRIS player");
            (PlaybackSource::Mpris(service), MPRIS_POLL)
        }
        None => {
            let mut clock = PlaybackClock::new(0.0);
            // The pipe has no keys to start playback with.
            if args.pipe {
                clock.play();
            }
            (PlaybackSource::Local(clock), LOCAL_POLL)
        }
    };
    let seeker: Box<dyn Seeker> = match &source {
        PlaybackSource::Mpris(service) => Box::new(MprisSeeker::new(service.as_str())),
        PlaybackSource::Local(_) => Box::new(ChannelSeeker::new(player_tx.clone())),
    };

    let loop_handle = tokio::spawn(listen(timings, source, update_tx, player_rx, poll));

    if args.pipe {
        let mut stdout = std::io::stdout();
        crate::ui::display_words_pipe(update_rx, &mut stdout).await?;
        let _ = player_tx.send(crate::event::PlayerEvent::Shutdown).await;
    } else {
        crate::ui::display_karaoke(update_rx, player_tx, seeker.as_ref(), !args.no_highlight).await?;
    }
    loop_handle.await?;
    Ok(())
}

async fn toggle(cfg: &Config, profile: SetProfile, item: &str) -> CmdResult {
    let set = ToggleSet::new(profile, open_store(cfg).await?, session(cfg), Arc::new(ConsoleNotifier));
    set.fetch_all().await?;
    let outcome = set.toggle(item).await?;
    let state = if outcome.is_member() { "on" } else { "off" };
    println!("{} {item}: {state}", set.profile().label);
    Ok(())
}

async fn mark_read(cfg: &Config, article_id: &str) -> CmdResult {
    let set = ToggleSet::new(SetProfile::reads(), open_store(cfg).await?, session(cfg), Arc::new(ConsoleNotifier));
    set.fetch_all().await?;
    let outcome = set.add(article_id).await?;
    if outcome == ToggleOutcome::Unchanged {
        tracing::debug!(article = article_id, "Already marked as read");
    }
    println!("{} {article_id}: on", set.profile().label);
    Ok(())
}

async fn list(cfg: &Config, kind: SetKind) -> CmdResult {
    let profile = match kind {
        SetKind::Likes => SetProfile::likes(),
        SetKind::Reads => SetProfile::reads(),
        SetKind::Favorites => SetProfile::favorites(),
    };
    let set = ToggleSet::new(profile, open_store(cfg).await?, session(cfg), Arc::new(ConsoleNotifier));
    set.refetch().await?;
    let mut out = std::io::stdout().lock();
    for item in set.items() {
        writeln!(out, "{item}")?;
    }
    Ok(())
}

async fn view(cfg: &Config, article_id: &str, category: &str) -> CmdResult {
    let views = ArticleViews::new(open_store(cfg).await?, session(cfg));
    match views.record_view(article_id, category) {
        // Wait so the process does not exit before the write lands.
        Some(handle) => handle.await?,
        None => tracing::info!("Not signed in, view not recorded"),
    }
    Ok(())
}

async fn top_categories(cfg: &Config, limit: Option<usize>) -> CmdResult {
    let views = ArticleViews::new(open_store(cfg).await?, session(cfg));
    let mut out = std::io::stdout().lock();
    for category in views.get_top_categories(limit).await? {
        writeln!(out, "{category}")?;
    }
    Ok(())
}

async fn admin(cfg: &Config, cmd: &AdminCommand) -> CmdResult {
    let client = AdminClient::new(open_store(cfg).await?, session(cfg));
    match cmd {
        AdminCommand::Users => {
            let users = client.all_users().await?;
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
        AdminCommand::Stats { user_id } => {
            let stats = client.user_stats(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

async fn grant_role(cfg: &Config, user_id: &str, role: &str) -> CmdResult {
    if cfg.backend_url.is_some() {
        return Err("roles can only be granted in the local store".into());
    }
    let store = SqliteStore::open(&cfg.database_path()).await?;
    match store.insert(Table::UserRoles, NewRow::new(user_id, role)).await {
        Ok(()) => println!("granted {role} to {user_id}"),
        Err(e) if e.is_conflict() => println!("{user_id} already has {role}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextSource;
    use clap::Parser;

    fn text_args(text: &str, seed: Option<u64>) -> TextArgs {
        TextArgs {
            source: TextSource {
                text: Some(text.to_string()),
                file: None,
            },
            offset: 1.0,
            seed,
        }
    }

    #[test]
    fn seeded_timings_are_reproducible() {
        let a = load_timings(&text_args("hi there", Some(9))).unwrap();
        let b = load_timings(&text_args("hi there", Some(9))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].start_time, 1.0);
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(matches!(
            load_timings(&text_args("  \n ", None)),
            Err(KaraokeError::EmptyText)
        ));
    }

    #[test]
    fn timings_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "once upon a time").unwrap();
        let args = TextArgs {
            source: TextSource {
                text: None,
                file: Some(path),
            },
            offset: 0.0,
            seed: None,
        };
        assert_eq!(load_timings(&args).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn commands_share_the_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.db");
        let db = db.to_str().unwrap();
        let cfg = |args: &[&str]| {
            let mut argv = vec!["readalong", "--database", db, "--user", "u1"];
            argv.extend_from_slice(args);
            Config::try_parse_from(argv).unwrap()
        };

        run(cfg(&["favorite", "tech"])).await.unwrap();
        run(cfg(&["view", "a1", "tech"])).await.unwrap();
        run(cfg(&["read", "a1"])).await.unwrap();
        run(cfg(&["read", "a1"])).await.unwrap();
        run(cfg(&["top-categories", "--limit", "1"])).await.unwrap();
        run(cfg(&["list", "reads"])).await.unwrap();
        run(cfg(&["role", "grant", "u1", "admin"])).await.unwrap();
        run(cfg(&["role", "grant", "u1", "admin"])).await.unwrap();

        let store = SqliteStore::open(std::path::Path::new(db)).await.unwrap();
        assert_eq!(store.select_keys(Table::Favorites, "u1").await.unwrap(), vec!["tech"]);
        assert_eq!(store.select_view_categories("u1").await.unwrap(), vec!["tech"]);
        // Marking as read twice keeps a single row.
        assert_eq!(store.select_keys(Table::ArticleReads, "u1").await.unwrap(), vec!["a1"]);

        run(cfg(&["read", "a1", "--toggle"])).await.unwrap();
        assert!(store.select_keys(Table::ArticleReads, "u1").await.unwrap().is_empty());
        run(cfg(&["admin", "stats", "u1"])).await.unwrap();
    }
}
