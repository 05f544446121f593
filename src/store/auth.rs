//! Session and profile operations.

use validator::Validate;

use super::Store;
use crate::error::{Result, StoreError};
use crate::model::{self, PixKeyType, User, UserPatch};

/// Registration input, validated before any state is touched.
#[derive(Debug, Validate)]
struct Registration {
    #[validate(length(min = 1))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    phone: String,
    #[validate(length(min = 6))]
    password: String,
}

impl Store {
    /// Authenticate `email` against its stored credential.
    ///
    /// Email matching is case-insensitive. A banned account fails with
    /// [`StoreError::AccountBanned`] and no session is established.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let mut state = self.write();

        let user = state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(StoreError::InvalidCredentials)?;

        if !self.crypto.verify_password(password, &user.password_hash) {
            return Err(StoreError::InvalidCredentials);
        }
        if user.banned() {
            return Err(StoreError::AccountBanned);
        }

        state.current_user_id = Some(user.id.clone());
        self.persist_session(&state);

        tracing::info!(user = %user.id, "session opened");
        Ok(user)
    }

    /// Create an account and establish its session.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<User> {
        Registration {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            password: password.to_owned(),
        }
        .validate()?;

        let mut state = self.write();

        if state.banned.contains_email(email)
            || state.banned.contains_phone(phone)
        {
            return Err(StoreError::BlockedIdentity);
        }
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::EmailInUse);
        }

        let user = User {
            id: model::id::generate("user"),
            name: name.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            password_hash: self.crypto.hash_password(password)?,
            ..Default::default()
        };

        state.users.push(user.clone());
        state.current_user_id = Some(user.id.clone());
        self.persist_users(&state);
        self.persist_session(&state);

        tracing::info!(user = %user.id, "account created");
        Ok(user)
    }

    /// Close the current session.
    pub fn logout(&self) {
        let mut state = self.write();
        state.current_user_id = None;
        self.persist_session(&state);
    }

    /// Merge `patch` into the matching user.
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<User> {
        let mut state = self.write();

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::UserNotFound)?;
        patch.apply(user);
        let updated = user.clone();

        self.persist_users(&state);
        Ok(updated)
    }

    /// Record the financial profile (pix key and cpf) of a user.
    ///
    /// The cpf is checked against the denylist in digits-only form.
    pub async fn add_user_pix(
        &self,
        user_id: &str,
        pix_key_type: PixKeyType,
        pix_key: &str,
        cpf: &str,
    ) -> Result<User> {
        {
            let state = self.read();
            if state.banned.contains_cpf(cpf) {
                return Err(StoreError::BlockedIdentity);
            }
        }

        self.update_user_profile(
            user_id,
            UserPatch {
                pix_key_type: Some(pix_key_type),
                pix_key: Some(pix_key.to_owned()),
                cpf: Some(cpf.to_owned()),
                ..Default::default()
            },
        )
        .await
    }

    /// Every user, admin first.
    pub fn users(&self) -> Vec<User> {
        self.read().users.clone()
    }

    /// Case-insensitive name/email/phone search, admin excluded.
    pub fn search_users(&self, query: &str) -> Vec<User> {
        let query = query.to_lowercase();
        self.read()
            .users
            .iter()
            .filter(|u| !u.email.eq_ignore_ascii_case(&self.config.admin.email))
            .filter(|u| {
                u.name.to_lowercase().contains(&query)
                    || u.email.to_lowercase().contains(&query)
                    || u.phone.contains(&query)
            })
            .cloned()
            .collect()
    }
}
