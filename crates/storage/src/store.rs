use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::{debug, info};

use pagelens_core::sanitize::generate_id;
use pagelens_core::{Config, Criterion, LookOutConfig, Paths, Result, Settings};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// What changed in the config document. Subscribers adopting an event
/// must be idempotent; external edits arrive as full reloads.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    Settings(Settings),
    LookOut(LookOutConfig),
    Reloaded(Config),
}

/// Single owner of the persisted config document. Every mutation goes
/// through here: update the in-memory snapshot, write the file,
/// broadcast the change.
pub struct ConfigStore {
    paths: Paths,
    state: RwLock<Config>,
    events: broadcast::Sender<ConfigEvent>,
}

impl ConfigStore {
    pub fn open(paths: Paths) -> Result<Self> {
        let config = Config::load_or_default(&paths)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(path = %paths.config_file().display(), "Config store opened");
        Ok(Self {
            paths,
            state: RwLock::new(config),
            events,
        })
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn config(&self) -> Config {
        self.state.read().unwrap().clone()
    }

    pub fn settings(&self) -> Settings {
        self.state.read().unwrap().settings.clone()
    }

    pub fn lookout(&self) -> LookOutConfig {
        self.state.read().unwrap().look_out_config.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    pub fn set_settings(&self, settings: Settings) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            state.settings = settings.clone();
        }
        self.persist()?;
        self.broadcast(ConfigEvent::Settings(settings));
        Ok(())
    }

    pub fn set_lookout(&self, lookout: LookOutConfig) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            state.look_out_config = lookout.clone();
        }
        self.persist()?;
        self.broadcast(ConfigEvent::LookOut(lookout));
        Ok(())
    }

    /// Applies an arbitrary edit to the whole document, persists it and
    /// broadcasts a full reload. Used by dotted-path config edits.
    pub fn mutate(&self, apply: impl FnOnce(&mut Config)) -> Result<Config> {
        let updated = {
            let mut state = self.state.write().unwrap();
            apply(&mut state);
            state.clone()
        };
        self.persist()?;
        self.broadcast(ConfigEvent::Reloaded(updated.clone()));
        Ok(updated)
    }

    /// Adds a criterion, assigning it a fresh id and creation time.
    /// Returns the assigned id.
    pub fn add_criterion(&self, mut criterion: Criterion) -> Result<String> {
        criterion.id = generate_id("criteria");
        criterion.created_at = Some(chrono::Utc::now());
        let id = criterion.id.clone();

        let lookout = {
            let mut state = self.state.write().unwrap();
            state.look_out_config.criteria.push(criterion);
            state.look_out_config.clone()
        };
        self.persist()?;
        self.broadcast(ConfigEvent::LookOut(lookout));
        Ok(id)
    }

    /// Removes a criterion by id. Returns whether anything was removed.
    pub fn remove_criterion(&self, id: &str) -> Result<bool> {
        let (removed, lookout) = {
            let mut state = self.state.write().unwrap();
            let before = state.look_out_config.criteria.len();
            state.look_out_config.criteria.retain(|c| c.id != id);
            (
                state.look_out_config.criteria.len() != before,
                state.look_out_config.clone(),
            )
        };
        if removed {
            self.persist()?;
            self.broadcast(ConfigEvent::LookOut(lookout));
        }
        Ok(removed)
    }

    /// Edits a criterion in place. Returns whether the id was found.
    pub fn update_criterion(&self, id: &str, edit: impl FnOnce(&mut Criterion)) -> Result<bool> {
        let (found, lookout) = {
            let mut state = self.state.write().unwrap();
            let found = match state
                .look_out_config
                .criteria
                .iter_mut()
                .find(|c| c.id == id)
            {
                Some(criterion) => {
                    edit(criterion);
                    true
                }
                None => false,
            };
            (found, state.look_out_config.clone())
        };
        if found {
            self.persist()?;
            self.broadcast(ConfigEvent::LookOut(lookout));
        }
        Ok(found)
    }

    pub fn set_lookout_enabled(&self, enabled: bool) -> Result<()> {
        let lookout = {
            let mut state = self.state.write().unwrap();
            state.look_out_config.enabled = enabled;
            state.look_out_config.clone()
        };
        self.persist()?;
        self.broadcast(ConfigEvent::LookOut(lookout));
        Ok(())
    }

    /// Re-reads the file after an external edit. A reload that parses to
    /// the same document as the current snapshot is dropped silently, so
    /// our own saves do not echo back as events.
    pub fn reload(&self) -> Result<()> {
        let path = self.paths.config_file();
        if !path.exists() {
            return Ok(());
        }
        let incoming = Config::load(&path)?;

        // Value comparison, not string comparison: map key order is not
        // stable across instances.
        let changed = {
            let current = self.state.read().unwrap();
            serde_json::to_value(&incoming)? != serde_json::to_value(&*current)?
        };
        if !changed {
            return Ok(());
        }

        debug!(path = %path.display(), "Adopting externally edited config");
        {
            let mut state = self.state.write().unwrap();
            *state = incoming.clone();
        }
        self.broadcast(ConfigEvent::Reloaded(incoming));
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let snapshot = self.state.read().unwrap().clone();
        snapshot.save(&self.paths.config_file())
    }

    fn broadcast(&self, event: ConfigEvent) {
        // Nobody listening is not an error.
        let _ = self.events.send(event);
    }
}
