//! Participation request lifecycle.
//!
//! `pending → waiting_receipt → paid → completed`, forward only; `completed`
//! is terminal. Advancement is always operator- or user-initiated, nothing
//! expires on its own.

use super::{State, Store};
use crate::error::{Result, StoreError};
use crate::model::{self, ParticipationRequest, RequestStatus};

/// Request counts shown on the admin dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub pending: usize,
    /// Approved and somewhere inside the payout/payback cycle.
    pub in_cycle: usize,
    /// Paid back, awaiting the admin's receipt check.
    pub awaiting_check: usize,
    pub completed: usize,
}

impl Store {
    /// Open a participation request for `user_id` on `event_id`.
    ///
    /// Requires a completed financial profile (pix key and cpf), a live
    /// event and no other non-completed request by the same user for the
    /// same event. Snapshot fields are captured here and never updated.
    pub async fn create_request(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<ParticipationRequest> {
        let mut state = self.write();

        let user = state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(StoreError::IncompleteProfile)?;
        let (pix_key, cpf) = match (&user.pix_key, &user.cpf) {
            (Some(pix_key), Some(cpf)) => (pix_key.clone(), cpf.clone()),
            _ => return Err(StoreError::IncompleteProfile),
        };
        if user.banned() {
            return Err(StoreError::AccountBanned);
        }

        let event = state
            .events
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or(StoreError::EventNotFound)?;

        let duplicate = state.requests.iter().any(|r| {
            r.user_id == user_id
                && r.event_id == event_id
                && !r.status.is_terminal()
        });
        if duplicate {
            return Err(StoreError::DuplicateActiveRequest);
        }

        let request = ParticipationRequest {
            id: model::id::generate("req"),
            user_id: user_id.to_owned(),
            event_id: event_id.to_owned(),
            user_name: user.name,
            user_phone: user.phone,
            user_pix_key: pix_key,
            user_cpf: cpf,
            event_title: event.title,
            event_value: event.value,
            status: RequestStatus::Pending,
            created_at: chrono::Utc::now(),
        };
        state.requests.insert(0, request.clone());
        self.persist_requests(&state);

        tracing::info!(
            request = %request.id,
            user = %user_id,
            event = %event_id,
            "participation requested"
        );
        Ok(request)
    }

    /// Leave `message` as the user's single outstanding notification,
    /// overwriting any unread one, and optionally advance the named request.
    pub fn notify_user(
        &self,
        user_id: &str,
        request_id: &str,
        message: &str,
        next_status: Option<RequestStatus>,
    ) {
        let mut state = self.write();

        let notified =
            if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
                user.notification = Some(message.to_owned());
                true
            } else {
                tracing::warn!(user = %user_id, "notification for unknown user dropped");
                false
            };
        if notified {
            self.persist_users(&state);
        }

        if let Some(next) = next_status
            && advance(&mut state, request_id, next)
        {
            self.persist_requests(&state);
        }
    }

    /// User confirms the payback transfer: `waiting_receipt → paid`.
    ///
    /// From any other state the call is a no-op, so a double-click or a
    /// stale tab cannot move a request sideways.
    pub fn confirm_user_sendback(&self, request_id: &str) {
        let mut state = self.write();

        let from = state
            .requests
            .iter()
            .find(|r| r.id == request_id)
            .map(|r| r.status);
        if from != Some(RequestStatus::WaitingReceipt) {
            tracing::debug!(request = %request_id, ?from, "sendback confirmation ignored");
            return;
        }

        if advance(&mut state, request_id, RequestStatus::Paid) {
            self.persist_requests(&state);
        }
    }

    /// Admin confirms receipt: the request reaches terminal `completed`.
    pub fn confirm_admin_receipt(&self, request_id: &str) {
        let mut state = self.write();
        if advance(&mut state, request_id, RequestStatus::Completed) {
            self.persist_requests(&state);
        }
    }

    /// Every request, newest first.
    pub fn requests(&self) -> Vec<ParticipationRequest> {
        self.read().requests.clone()
    }

    /// Per-user history, newest first.
    pub fn requests_for_user(&self, user_id: &str) -> Vec<ParticipationRequest> {
        self.read()
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Admin queue filter.
    pub fn requests_with_status(
        &self,
        status: RequestStatus,
    ) -> Vec<ParticipationRequest> {
        self.read()
            .requests
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// Requests inside the payout cycle, the ones already paid back first:
    /// those are waiting on the admin's receipt check.
    pub fn review_queue(&self) -> Vec<ParticipationRequest> {
        let mut queue: Vec<_> = self
            .read()
            .requests
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    RequestStatus::WaitingReceipt | RequestStatus::Paid
                )
            })
            .cloned()
            .collect();
        queue.sort_by_key(|r| r.status != RequestStatus::Paid);
        queue
    }

    /// Request counts for the admin dashboard.
    pub fn status_tally(&self) -> StatusTally {
        let state = self.read();
        let mut tally = StatusTally::default();

        for request in &state.requests {
            match request.status {
                RequestStatus::Pending => tally.pending += 1,
                RequestStatus::WaitingReceipt => tally.in_cycle += 1,
                RequestStatus::Paid => {
                    tally.in_cycle += 1;
                    tally.awaiting_check += 1;
                },
                RequestStatus::Completed => tally.completed += 1,
            }
        }

        tally
    }
}

/// Forward-only transition. Backward or lateral moves are ignored.
fn advance(state: &mut State, request_id: &str, next: RequestStatus) -> bool {
    let Some(request) =
        state.requests.iter_mut().find(|r| r.id == request_id)
    else {
        tracing::warn!(request = %request_id, "transition for unknown request ignored");
        return false;
    };

    if next.rank() <= request.status.rank() {
        tracing::warn!(
            request = %request_id,
            from = ?request.status,
            to = ?next,
            "non-forward transition ignored"
        );
        return false;
    }

    request.status = next;
    true
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use super::*;
    use crate::model::{EventInput, PixKeyType};

    async fn store_with_ana_and_event() -> (Store, String, String) {
        let store = testing::open();
        let ana = store
            .register("Ana", "ana@x.com", "11999990000", "s3nha-forte")
            .await
            .unwrap();
        store
            .add_user_pix(&ana.id, PixKeyType::Email, "ana@x.com", "12345678901")
            .await
            .unwrap();
        store.add_or_update_event(EventInput {
            title: "Bônus".into(),
            value: "50.00".into(),
            ..Default::default()
        });
        let event_id = store.events().remove(0).id;
        (store, ana.id, event_id)
    }

    #[tokio::test]
    async fn test_create_requires_financial_profile() {
        let store = testing::open();
        let ana = store
            .register("Ana", "ana@x.com", "11999990000", "s3nha-forte")
            .await
            .unwrap();
        store.add_or_update_event(EventInput {
            title: "Bônus".into(),
            ..Default::default()
        });
        let event_id = store.events().remove(0).id;

        assert!(matches!(
            store.create_request(&ana.id, &event_id).await,
            Err(StoreError::IncompleteProfile)
        ));
        // an unknown user is indistinguishable from an incomplete one.
        assert!(matches!(
            store.create_request("user_missing", &event_id).await,
            Err(StoreError::IncompleteProfile)
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_banned_and_missing_event() {
        let (store, ana, _event) = store_with_ana_and_event().await;

        assert!(matches!(
            store.create_request(&ana, "event_missing").await,
            Err(StoreError::EventNotFound)
        ));

        store.ban_user(&ana);
        assert!(matches!(
            store.create_request(&ana, "event_missing").await,
            Err(StoreError::AccountBanned)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_guard_released_by_completion() {
        let (store, ana, event) = store_with_ana_and_event().await;

        let first = store.create_request(&ana, &event).await.unwrap();
        assert!(matches!(
            store.create_request(&ana, &event).await,
            Err(StoreError::DuplicateActiveRequest)
        ));

        store.notify_user(
            &ana,
            &first.id,
            "aprovado",
            Some(RequestStatus::WaitingReceipt),
        );
        assert!(matches!(
            store.create_request(&ana, &event).await,
            Err(StoreError::DuplicateActiveRequest)
        ));

        store.confirm_user_sendback(&first.id);
        store.confirm_admin_receipt(&first.id);
        assert!(store.create_request(&ana, &event).await.is_ok());
    }

    #[tokio::test]
    async fn test_lifecycle_never_moves_backward() {
        let (store, ana, event) = store_with_ana_and_event().await;
        let request = store.create_request(&ana, &event).await.unwrap();

        // sendback from pending is ignored.
        store.confirm_user_sendback(&request.id);
        assert_eq!(store.requests()[0].status, RequestStatus::Pending);

        store.notify_user(
            &ana,
            &request.id,
            "aprovado",
            Some(RequestStatus::WaitingReceipt),
        );
        // a stale notify cannot pull the request back to pending.
        store.notify_user(
            &ana,
            &request.id,
            "de novo",
            Some(RequestStatus::Pending),
        );
        assert_eq!(store.requests()[0].status, RequestStatus::WaitingReceipt);

        store.confirm_user_sendback(&request.id);
        // double click: second confirmation is a no-op.
        store.confirm_user_sendback(&request.id);
        assert_eq!(store.requests()[0].status, RequestStatus::Paid);

        store.confirm_admin_receipt(&request.id);
        store.confirm_admin_receipt(&request.id);
        assert_eq!(store.requests()[0].status, RequestStatus::Completed);
    }

    #[tokio::test]
    async fn test_notification_is_single_and_overwritten() {
        let (store, ana, event) = store_with_ana_and_event().await;
        let request = store.create_request(&ana, &event).await.unwrap();

        store.notify_user(&ana, &request.id, "primeira", None);
        store.notify_user(&ana, &request.id, "segunda", None);

        let user = store.current_user().unwrap();
        assert_eq!(user.notification.as_deref(), Some("segunda"));

        store.clear_user_notification(&ana);
        assert!(store.current_user().unwrap().notification.is_none());
    }

    #[tokio::test]
    async fn test_review_queue_and_tally() {
        let (store, ana, event) = store_with_ana_and_event().await;
        store.add_or_update_event(EventInput {
            title: "Outro".into(),
            value: "20.00".into(),
            ..Default::default()
        });
        let other = store.events().remove(0).id;

        let first = store.create_request(&ana, &event).await.unwrap();
        let second = store.create_request(&ana, &other).await.unwrap();

        store.notify_user(
            &ana,
            &first.id,
            "aprovado",
            Some(RequestStatus::WaitingReceipt),
        );
        store.notify_user(
            &ana,
            &second.id,
            "aprovado",
            Some(RequestStatus::WaitingReceipt),
        );
        store.confirm_user_sendback(&second.id);

        let queue = store.review_queue();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, second.id); // paid first.

        let tally = store.status_tally();
        assert_eq!(tally.pending, 0);
        assert_eq!(tally.in_cycle, 2);
        assert_eq!(tally.awaiting_check, 1);
        assert_eq!(tally.completed, 0);

        assert_eq!(
            store.requests_with_status(RequestStatus::Paid).len(),
            1
        );
        assert_eq!(store.requests_for_user(&ana).len(), 2);
    }
}
