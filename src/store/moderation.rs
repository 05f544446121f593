//! Ban lists, notifications and the maintenance flag.

use super::Store;
use crate::model::{self, User};

impl Store {
    /// Drop the user's pending notification.
    pub fn clear_user_notification(&self, user_id: &str) {
        let mut state = self.write();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.notification = None;
            self.persist_users(&state);
        }
    }

    /// Ban a user: flag the record and denylist their email, phone and cpf
    /// so the identity cannot re-register.
    pub fn ban_user(&self, user_id: &str) {
        let mut guard = self.write();
        let state = &mut *guard;

        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id)
        else {
            return;
        };
        user.is_banned = Some(true);

        let email = user.email.to_lowercase();
        if !state.banned.emails.contains(&email) {
            state.banned.emails.push(email);
        }
        if !state.banned.phones.contains(&user.phone) {
            state.banned.phones.push(user.phone.clone());
        }
        if let Some(cpf) = user.cpf.as_deref().map(model::digits_only)
            && !cpf.is_empty()
            && !state.banned.cpfs.contains(&cpf)
        {
            state.banned.cpfs.push(cpf);
        }

        self.persist_users(&guard);
        self.persist_banned(&guard);
        tracing::info!(user = %user_id, "user banned");
    }

    /// Lift a ban: clear the flag and prune the user's identity data from
    /// the denylists.
    pub fn unban_user(&self, user_id: &str) {
        let mut guard = self.write();
        let state = &mut *guard;

        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id)
        else {
            return;
        };
        user.is_banned = Some(false);

        let email = user.email.to_lowercase();
        let phone = user.phone.clone();
        let cpf = user.cpf.as_deref().map(model::digits_only);

        state.banned.emails.retain(|e| *e != email);
        state.banned.phones.retain(|p| *p != phone);
        if let Some(cpf) = cpf {
            state.banned.cpfs.retain(|c| *c != cpf);
        }

        self.persist_users(&guard);
        self.persist_banned(&guard);
        tracing::info!(user = %user_id, "user unbanned");
    }

    /// Users currently flagged as banned.
    pub fn banned_users(&self) -> Vec<User> {
        self.read()
            .users
            .iter()
            .filter(|u| u.banned())
            .cloned()
            .collect()
    }

    /// Current denylists.
    pub fn banned_data(&self) -> model::BannedData {
        self.read().banned.clone()
    }

    /// Flip the global maintenance flag, returning the new value.
    pub fn toggle_maintenance_mode(&self) -> bool {
        let mut state = self.write();
        state.maintenance = !state.maintenance;
        self.persist_maintenance(&state);

        tracing::info!(active = state.maintenance, "maintenance mode toggled");
        state.maintenance
    }

    pub fn maintenance_mode(&self) -> bool {
        self.read().maintenance
    }
}
