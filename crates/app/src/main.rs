use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Local;
use directories::ProjectDirs;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use txtreader_application::{AppContext, document_identity, is_text_document};
use txtreader_core::DocumentRecord;
use txtreader_storage::{RecordStore, STORE_FILE_NAME};
use txtreader_ui::{Ui, UiExit};

const STORE_ENV: &str = "TXTREADER_STORE";
const LOG_DIR_ENV: &str = "TXTREADER_LOG_DIR";
const LOG_FILTER_ENV: &str = "TXTREADER_LOG";
const LOG_FILE_NAME: &str = "txtreader.log";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dirs =
        ProjectDirs::from("dev", "txtreader", "txtreader").context("resolve project dirs")?;

    let log_dir = env_path(LOG_DIR_ENV).unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
    let _log_guard = init_logging(&log_dir)?;

    let store_path = env_path(STORE_ENV)
        .unwrap_or_else(|| project_dirs.config_dir().join(STORE_FILE_NAME));
    let store = RecordStore::new(store_path);
    info!(store = %store.path().display(), "starting");

    let (snapshot, load_err) = store.load_or_default();
    let mut ctx = AppContext::new(snapshot.config).with_records(snapshot.records);
    if let Some(err) = load_err {
        warn!(error = %err, "store unreadable; using defaults");
        ctx.notice = Some(format!("{err}; using defaults"));
    }

    let mut pending = std::env::args_os().nth(1).map(PathBuf::from);
    loop {
        if let Some(path) = pending.take() {
            open_document(&mut ctx, &path);
        }

        let mut ui = Ui::new(ctx);
        let outcome = ui.run()?;
        ctx = outcome.ctx;

        match outcome.exit {
            UiExit::Quit => {
                save_progress(&store, &mut ctx);
                if let Some(notice) = ctx.notice.take() {
                    eprintln!("{notice}");
                }
                break;
            }
            UiExit::Close => save_progress(&store, &mut ctx),
            UiExit::Open(path) => {
                save_progress(&store, &mut ctx);
                pending = Some(path);
            }
            UiExit::Forget(identity) => match store.delete(&identity) {
                Ok(_) => ctx.forget(&identity),
                Err(err) => {
                    warn!(error = %err, path = %identity, "delete failed");
                    ctx.notice = Some(format!("could not forget {identity}: {err}"));
                }
            },
        }
    }

    info!("exiting");
    Ok(())
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install tracing subscriber: {err}"))?;
    Ok(guard)
}

fn open_document(ctx: &mut AppContext, path: &Path) {
    if !is_text_document(path) {
        ctx.notice = Some(format!("not a .txt file: {}", path.display()));
        return;
    }

    let identity = document_identity(path);
    match txtreader_engine::read_lines(path) {
        Ok(lines) => {
            ctx.open_document(identity, lines);
        }
        Err(err) => {
            warn!(error = %err, "open failed");
            ctx.notice = Some(format!("{err}"));
        }
    }
}

/// Persists the open document's page together with the current config.
/// On failure the record is still kept in memory so the list stays right.
fn save_progress(store: &RecordStore, ctx: &mut AppContext) {
    let Some((identity, page)) = ctx.close_document() else {
        return;
    };

    match store.upsert(&identity, page, &ctx.config) {
        Ok(Some(record)) => ctx.remember(record),
        Ok(None) => {}
        Err(err) => {
            warn!(error = %err, path = %identity, "saving progress failed");
            ctx.notice = Some(format!("could not save progress: {err}"));
            ctx.remember(DocumentRecord::new(identity, page, Local::now().naive_local()));
        }
    }
}
