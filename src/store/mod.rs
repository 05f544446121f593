//! Entity store: single source of truth for every collection.
//!
//! The store owns users, events, participation requests, the ban lists, the
//! maintenance flag and the session pointer. It is the only component that
//! mutates them; every mutation is written back to [`crate::storage`] before
//! the operation returns. Other open tabs converge by replacing whole
//! collections from foreign writes ([`Store::apply_change`]).

mod auth;
mod events;
mod moderation;
mod requests;

pub use requests::StatusTally;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use crate::config::Configuration;
use crate::crypto::PasswordManager;
use crate::error::Result;
use crate::guard::Viewer;
use crate::model::{BannedData, Event, ParticipationRequest, PixKeyType, User};
use crate::storage::{self, ChangeNotice, Storage};

/// Fixed identity of the seeded administrator record.
const ADMIN_ID: &str = "admin_root";
const ADMIN_NAME: &str = "Administrador Master";
const ADMIN_PHONE: &str = "99999999999";
const ADMIN_CPF: &str = "000.000.000-00";

#[derive(Default)]
struct State {
    users: Vec<User>,
    events: Vec<Event>,
    requests: Vec<ParticipationRequest>,
    current_user_id: Option<String>,
    banned: BannedData,
    maintenance: bool,
}

/// In-memory authoritative store for one tab, persisted after every
/// mutation.
pub struct Store {
    config: Arc<Configuration>,
    crypto: PasswordManager,
    storage: Storage,
    state: RwLock<State>,
}

impl Store {
    /// Open the store over `storage`, loading every collection with its
    /// documented default and seeding the administrator record.
    pub fn open(config: Arc<Configuration>, storage: Storage) -> Result<Self> {
        let crypto = PasswordManager::new(config.argon2.clone())?;

        let mut state = State {
            users: storage.get(storage::USERS_KEY, Vec::new()),
            events: storage.get(storage::EVENTS_KEY, Vec::new()),
            requests: storage.get(storage::REQUESTS_KEY, Vec::new()),
            current_user_id: storage.get(storage::SESSION_KEY, None),
            banned: storage.get(storage::BANNED_KEY, BannedData::default()),
            maintenance: storage.get(storage::MAINTENANCE_KEY, false),
        };

        seed_admin(&config, &crypto, &mut state.users)?;
        storage.set(storage::USERS_KEY, &state.users);

        Ok(Self {
            config,
            crypto,
            storage,
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_users(&self, state: &State) {
        self.storage.set(storage::USERS_KEY, &state.users);
    }

    fn persist_events(&self, state: &State) {
        self.storage.set(storage::EVENTS_KEY, &state.events);
    }

    fn persist_requests(&self, state: &State) {
        self.storage.set(storage::REQUESTS_KEY, &state.requests);
    }

    fn persist_session(&self, state: &State) {
        self.storage.set(storage::SESSION_KEY, &state.current_user_id);
    }

    fn persist_banned(&self, state: &State) {
        self.storage.set(storage::BANNED_KEY, &state.banned);
    }

    fn persist_maintenance(&self, state: &State) {
        self.storage.set(storage::MAINTENANCE_KEY, &state.maintenance);
    }

    /// User behind the session pointer, if any.
    pub fn current_user(&self) -> Option<User> {
        let state = self.read();
        let id = state.current_user_id.as_deref()?;
        state.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Whether the session belongs to the reserved administrator.
    pub fn is_admin(&self) -> bool {
        self.current_user().is_some_and(|u| {
            u.email.eq_ignore_ascii_case(&self.config.admin.email)
        })
    }

    /// Session facts consumed by [`crate::guard::resolve`].
    pub fn viewer(&self) -> Viewer {
        let state = self.read();
        let user = state
            .current_user_id
            .as_deref()
            .and_then(|id| state.users.iter().find(|u| u.id == id));

        Viewer {
            authenticated: user.is_some(),
            admin: user.is_some_and(|u| {
                u.email.eq_ignore_ascii_case(&self.config.admin.email)
            }),
            pix_complete: user.is_some_and(User::pix_complete),
            maintenance: state.maintenance,
        }
    }

    /// Subscribe to writes performed by any tab on the shared backend.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.storage.subscribe()
    }

    /// Apply a write observed on the notification bus.
    ///
    /// Writes from this tab are skipped (a tab is authoritative for its own
    /// writes); foreign writes replace the whole matching collection, last
    /// writer wins, no merge. An undecodable value is logged and dropped.
    pub fn apply_change(&self, notice: &ChangeNotice) {
        if notice.origin == self.storage.tab() {
            return;
        }

        let mut state = self.write();
        let raw = notice.value.as_str();
        let applied = match notice.key.as_str() {
            storage::USERS_KEY => {
                serde_json::from_str(raw).map(|v| state.users = v)
            },
            storage::EVENTS_KEY => {
                serde_json::from_str(raw).map(|v| state.events = v)
            },
            storage::REQUESTS_KEY => {
                serde_json::from_str(raw).map(|v| state.requests = v)
            },
            storage::SESSION_KEY => {
                serde_json::from_str(raw).map(|v| state.current_user_id = v)
            },
            storage::BANNED_KEY => {
                serde_json::from_str(raw).map(|v| state.banned = v)
            },
            storage::MAINTENANCE_KEY => {
                serde_json::from_str(raw).map(|v| state.maintenance = v)
            },
            _ => return,
        };

        if let Err(err) = applied {
            tracing::warn!(%err, key = %notice.key, "discarding undecodable foreign write");
        }
    }

    /// Reload every collection from storage, keeping the in-memory value
    /// where the read fails.
    pub fn reload(&self) {
        let mut state = self.write();
        state.users =
            self.storage.get(storage::USERS_KEY, state.users.clone());
        state.events =
            self.storage.get(storage::EVENTS_KEY, state.events.clone());
        state.requests =
            self.storage.get(storage::REQUESTS_KEY, state.requests.clone());
        state.current_user_id = self
            .storage
            .get(storage::SESSION_KEY, state.current_user_id.clone());
        state.banned =
            self.storage.get(storage::BANNED_KEY, state.banned.clone());
        state.maintenance =
            self.storage.get(storage::MAINTENANCE_KEY, state.maintenance);
    }
}

/// Normalize the users collection so exactly one record carries the
/// reserved administrator email, with the configured pix key and a fresh
/// hash of the configured credential, whatever was persisted before.
fn seed_admin(
    config: &Configuration,
    crypto: &PasswordManager,
    users: &mut Vec<User>,
) -> Result<()> {
    let email = &config.admin.email;

    let mut admin = users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email))
        .cloned()
        .unwrap_or_else(|| User {
            id: ADMIN_ID.to_owned(),
            name: ADMIN_NAME.to_owned(),
            email: email.clone(),
            phone: ADMIN_PHONE.to_owned(),
            cpf: Some(ADMIN_CPF.to_owned()),
            ..Default::default()
        });

    admin.password_hash = crypto.hash_password(&config.admin.password)?;
    admin.pix_key = Some(config.admin.pix_key.clone());
    admin.pix_key_type = Some(PixKeyType::Email);

    users.retain(|u| !u.email.eq_ignore_ascii_case(email));
    users.insert(0, admin);

    Ok(())
}
