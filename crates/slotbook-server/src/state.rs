//! Shared application state handed to every route.

use std::sync::Arc;

use tracing::{info, warn};

use slotbook_core::SyncSummary;
use slotbook_providers::Credential;

use crate::billing::BillingAggregator;
use crate::catalog::Catalog;
use crate::cursor::SyncCursorStore;
use crate::db::{Database, run_blocking};
use crate::error::{EngineError, EngineResult};
use crate::external::ExternalEventStore;
use crate::ledger::AppointmentLedger;
use crate::slots::{BookingPolicy, SlotRegistry};
use crate::workflow::{ConversionWorkflow, ProviderFactory};

/// Where a sync credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    Request,
    Stored,
    Config,
}

#[derive(Clone)]
pub struct AppState {
    pub slots: SlotRegistry,
    pub appointments: AppointmentLedger,
    pub billing: BillingAggregator,
    pub events: ExternalEventStore,
    pub catalog: Catalog,
    pub workflow: Arc<ConversionWorkflow>,
    pub cursor: SyncCursorStore,
    pub booking_policy: BookingPolicy,
    /// Used by sync when the request carries no credential and the stored
    /// one is missing or rejected.
    fallback_credential: Option<Credential>,
}

impl AppState {
    pub fn new(db: Database, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            slots: SlotRegistry::new(db.clone()),
            appointments: AppointmentLedger::new(db.clone()),
            billing: BillingAggregator::new(db.clone()),
            events: ExternalEventStore::new(db.clone()),
            catalog: Catalog::new(db.clone()),
            cursor: SyncCursorStore::new(db.clone()),
            workflow: Arc::new(ConversionWorkflow::new(db, providers)),
            booking_policy: BookingPolicy::default(),
            fallback_credential: None,
        }
    }

    pub fn with_booking_policy(mut self, policy: BookingPolicy) -> Self {
        self.booking_policy = policy;
        self.workflow = Arc::new((*self.workflow).clone().with_booking_policy(policy));
        self
    }

    pub fn with_fallback_credential(mut self, credential: Option<Credential>) -> Self {
        self.fallback_credential = credential.filter(|c| !c.is_empty());
        self
    }

    /// Syncs calendars with the best available credential.
    ///
    /// A bearer token from the request is the only one tried and is stored
    /// once it works. Without one, the stored credential is tried first; if
    /// the provider rejects it, it is forgotten and the configured one is
    /// tried before giving up.
    pub async fn sync(&self, bearer: Option<Credential>) -> EngineResult<SyncSummary> {
        let store = self.cursor.clone();
        let stored = run_blocking(move || Ok(store.load()?.credential)).await?;
        let candidates = self.candidates(bearer, stored);

        let mut rejected = None;
        for (source, credential) in candidates {
            match self.workflow.sync(&credential).await {
                Ok(summary) => {
                    if source == CredentialSource::Request {
                        let store = self.cursor.clone();
                        run_blocking(move || store.store_credential(&credential)).await?;
                        info!("stored calendar credential from request");
                    }
                    return Ok(summary);
                }
                Err(err) if err.needs_auth() => {
                    warn!(?source, error = %err, "calendar credential rejected");
                    if source == CredentialSource::Stored {
                        let store = self.cursor.clone();
                        run_blocking(move || store.clear_credential()).await?;
                    }
                    rejected = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(rejected.unwrap_or_else(|| {
            EngineError::UpstreamAuth("no calendar credential available".to_string())
        }))
    }

    fn candidates(
        &self,
        bearer: Option<Credential>,
        stored: Option<Credential>,
    ) -> Vec<(CredentialSource, Credential)> {
        if let Some(credential) = bearer.filter(|c| !c.is_empty()) {
            return vec![(CredentialSource::Request, credential)];
        }

        let mut candidates = Vec::new();
        if let Some(credential) = stored.filter(|c| !c.is_empty()) {
            candidates.push((CredentialSource::Stored, credential));
        }
        if let Some(credential) = &self.fallback_credential
            && candidates.iter().all(|(_, c)| c.access_token != credential.access_token)
        {
            candidates.push((CredentialSource::Config, credential.clone()));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotbook_providers::{
        CalendarInfo, CalendarProvider, MemoryProvider, ProviderError, ProviderResult,
    };

    use crate::db::temp_database;

    /// Accepts a single access token.
    struct OneToken(&'static str);

    impl ProviderFactory for OneToken {
        fn connect(&self, credential: &Credential) -> ProviderResult<Arc<dyn CalendarProvider>> {
            if credential.access_token != self.0 {
                return Err(ProviderError::authentication("token rejected"));
            }
            let provider =
                MemoryProvider::new().with_calendar(CalendarInfo::new("w", "Trabajo"), vec![]);
            Ok(Arc::new(provider))
        }
    }

    fn state(db: Database, accepted: &'static str) -> AppState {
        AppState::new(db, Arc::new(OneToken(accepted)))
    }

    fn stored(db: &Database) -> Option<Credential> {
        SyncCursorStore::new(db.clone()).load().unwrap().credential
    }

    #[tokio::test]
    async fn bearer_is_stored_only_when_accepted() {
        let (_dir, db) = temp_database();
        let state = state(db.clone(), "good");

        let err = state.sync(Credential::from_bearer("Bearer bad")).await.unwrap_err();
        assert!(err.needs_auth());
        assert_eq!(stored(&db), None);

        state.sync(Credential::from_bearer("Bearer good")).await.unwrap();
        assert_eq!(stored(&db), Some(Credential::new("good")));

        // The stored token now serves requests without a header.
        state.sync(None).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_stored_token_falls_back_to_config() {
        let (_dir, db) = temp_database();
        SyncCursorStore::new(db.clone())
            .store_credential(&Credential::new("expired"))
            .unwrap();
        let state = state(db.clone(), "configured")
            .with_fallback_credential(Some(Credential::new("configured")));

        state.sync(None).await.unwrap();
        assert_eq!(stored(&db), None);
        state.sync(None).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_stored_token_without_config_needs_auth() {
        let (_dir, db) = temp_database();
        SyncCursorStore::new(db.clone())
            .store_credential(&Credential::new("expired"))
            .unwrap();
        let state = state(db.clone(), "other");

        assert!(state.sync(None).await.unwrap_err().needs_auth());
        assert_eq!(stored(&db), None);
        assert!(state.sync(None).await.unwrap_err().needs_auth());
    }

    #[tokio::test]
    async fn no_credential_anywhere_needs_auth() {
        let (_dir, db) = temp_database();
        let err = state(db, "good").sync(None).await.unwrap_err();
        assert!(matches!(err, EngineError::UpstreamAuth(_)));
    }
}
