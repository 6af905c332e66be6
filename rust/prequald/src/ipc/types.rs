use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::config::Settings;
use crate::db;
use crate::verify::{HttpVerifier, VerificationApi, VerifyError};
use crate::wizard::{KeyValueStore, MemoryStore, Ticket, Wizard};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the main loop reacts to.
pub enum Event {
    Line(String),
    Verified {
        request_id: String,
        ticket: Ticket,
        outcome: Result<(), VerifyError>,
    },
    InputClosed,
}

pub enum Reply {
    Ready(serde_json::Value),
    /// Answered later from an [`Event::Verified`].
    Deferred,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Holds the wizard snapshot until a workspace is selected.
    pub scratch: MemoryStore,
    pub settings: Settings,
    pub wizard: Wizard,
    pub verifier: Arc<dyn VerificationApi>,
    pub events: Sender<Event>,
}

impl AppState {
    pub fn new(events: Sender<Event>) -> anyhow::Result<Self> {
        let settings = Settings::resolve(None)?;
        Ok(Self {
            workspace: None,
            db: None,
            scratch: MemoryStore::default(),
            wizard: Wizard::new(settings.wizard.animation()),
            verifier: Arc::new(HttpVerifier::new(settings.verification.clone())),
            settings,
            events,
        })
    }

    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        let settings = Settings::resolve(Some(&conn))?;
        self.db = Some(conn);
        self.workspace = Some(path.to_path_buf());
        self.install_settings(settings);
        info!(workspace = %path.to_string_lossy(), "workspace selected");
        Ok(())
    }

    /// Re-resolves settings and rebuilds whatever depends on them.
    pub fn apply_settings(&mut self) -> anyhow::Result<()> {
        let settings = Settings::resolve(self.db.as_ref())?;
        self.install_settings(settings);
        Ok(())
    }

    fn install_settings(&mut self, settings: Settings) {
        self.wizard.set_animation(settings.wizard.animation());
        if settings.verification != self.settings.verification {
            self.verifier = Arc::new(HttpVerifier::new(settings.verification.clone()));
        }
        self.settings = settings;
    }
}

/// The workspace database when one is open, otherwise the in-memory store.
pub fn store<'a>(
    db: &'a mut Option<Connection>,
    scratch: &'a mut MemoryStore,
) -> &'a mut dyn KeyValueStore {
    match db {
        Some(conn) => conn,
        None => scratch,
    }
}
