//! Viewing lifecycle: creation, admin status changes, and their notifications

use chrono::Utc;
use realty_core::viewing::triggers_cancellation;
use realty_core::{NewViewing, Viewing, ViewingFilter, ViewingStatus};
use serde::Serialize;

use crate::authz::ensure_admin;
use crate::error::AppError;
use crate::notify::{dispatch_best_effort, CancellationNotice, ConfirmationNotice, Notifier};
use crate::store::{Store, User};

/// Result of a bulk status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    /// Number of ids submitted, including unknown ones
    pub count: usize,
    /// Number of ids that existed and were updated
    pub updated: usize,
}

/// Viewing operations over a store and a notifier
pub struct ViewingManager<'a, S, N> {
    store: &'a S,
    notifier: &'a N,
}

impl<'a, S, N> ViewingManager<'a, S, N>
where
    S: Store,
    N: Notifier,
{
    pub fn new(store: &'a S, notifier: &'a N) -> Self {
        Self { store, notifier }
    }

    /// Record a viewing request and confirm it to the visitor
    pub fn create(&self, caller: &User, input: NewViewing) -> Result<Viewing, AppError> {
        let draft = input.validate(Utc::now())?;

        let property = self
            .store
            .get_property(draft.property_id)?
            .ok_or(AppError::NotFound("Property"))?;

        let viewing = self.store.create_viewing(draft)?;
        tracing::info!(
            viewing_id = viewing.id,
            property_id = viewing.property_id,
            open_id = %caller.open_id,
            "Viewing scheduled"
        );

        let notice = ConfirmationNotice {
            visitor_email: viewing.visitor_email.clone(),
            visitor_name: viewing.visitor_name.clone(),
            property_label: property.label(),
            viewing_date: viewing.viewing_date,
            viewing_time: viewing.viewing_time.clone(),
            duration: viewing.duration,
        };
        dispatch_best_effort("confirmation", || self.notifier.send_confirmation(&notice));

        Ok(viewing)
    }

    /// The caller's own requests, matched by email
    pub fn list_mine(&self, caller: &User) -> Result<Vec<Viewing>, AppError> {
        match caller.email.as_deref() {
            Some(email) if !email.is_empty() => self.store.list_viewings_by_email(email),
            _ => Ok(Vec::new()),
        }
    }

    pub fn list_all(&self, caller: &User, filter: &ViewingFilter) -> Result<Vec<Viewing>, AppError> {
        ensure_admin(caller)?;
        self.store.list_viewings(filter)
    }

    pub fn update_status(
        &self,
        caller: &User,
        id: i64,
        status: ViewingStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<(), AppError> {
        ensure_admin(caller)?;
        self.apply_status(id, status, cancellation_reason)
    }

    /// Apply one status to many viewings. Unknown ids are skipped.
    pub fn bulk_update_status(
        &self,
        caller: &User,
        ids: &[i64],
        status: ViewingStatus,
    ) -> Result<BulkOutcome, AppError> {
        ensure_admin(caller)?;

        let mut updated = 0;
        for &id in ids {
            match self.apply_status(id, status, None) {
                Ok(()) => updated += 1,
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(viewing_id = id, "Skipping unknown viewing in bulk update");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(BulkOutcome {
            count: ids.len(),
            updated,
        })
    }

    /// Delete a viewing; unknown ids succeed
    pub fn delete(&self, caller: &User, id: i64) -> Result<(), AppError> {
        ensure_admin(caller)?;
        self.store.delete_viewing(id)?;
        tracing::info!(viewing_id = id, "Viewing deleted");
        Ok(())
    }

    fn apply_status(
        &self,
        id: i64,
        status: ViewingStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<(), AppError> {
        let viewing = self
            .store
            .get_viewing(id)?
            .ok_or(AppError::NotFound("Viewing"))?;

        if triggers_cancellation(viewing.status, status) {
            self.notify_cancellation(&viewing, cancellation_reason);
        }

        self.store
            .update_viewing_status(id, status, cancellation_reason)?;
        tracing::info!(
            viewing_id = id,
            from = viewing.status.as_str(),
            to = status.as_str(),
            "Viewing status changed"
        );
        Ok(())
    }

    fn notify_cancellation(&self, viewing: &Viewing, reason: Option<&str>) {
        let property_label = self
            .store
            .get_property(viewing.property_id)
            .ok()
            .flatten()
            .map(|p| p.label())
            .unwrap_or_else(|| format!("Property #{}", viewing.property_id));

        let notice = CancellationNotice {
            visitor_email: viewing.visitor_email.clone(),
            visitor_name: viewing.visitor_name.clone(),
            property_label,
            viewing_date: viewing.viewing_date,
            reason: reason.map(str::to_string),
        };
        dispatch_best_effort("cancellation", || self.notifier.send_cancellation(&notice));
    }
}
