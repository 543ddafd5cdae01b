//! Settings form controller for the ERP credential.
//!
//! Owns the editable field values and walks `Loading → Idle → Submitting → Idle`.
//! The active tenant is handed in as a `watch` receiver so a tenant switch in
//! the dashboard shows up here as a changed value rather than a global event.

use std::fmt;

use serde_json::json;
use tokio::sync::watch;

use super::{ClientError, CredentialRequest, CredentialsApi};
use crate::models::{validate_payload, CredentialView, FieldError, TenantId};

pub const PASSWORD_KEEP_HINT: &str = "Leave blank to keep the current password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Toast shown to the user after a load, save or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Raw input values, as typed. `port` stays text until validation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub host: String,
    pub port: String,
    pub database_name: String,
    pub username: String,
    pub password: String,
}

impl FormFields {
    /// Pre-fill from a loaded record. The password input always starts empty.
    fn from_view(view: &CredentialView) -> Self {
        Self {
            host: view.host.clone(),
            port: view.port.to_string(),
            database_name: view.database_name.clone(),
            username: view.username.clone(),
            password: String::new(),
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        json!({
            "host": self.host,
            "port": self.port,
            "databaseName": self.database_name,
            "username": self.username,
            "password": self.password,
        })
    }
}

impl fmt::Debug for FormFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFields")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

pub struct CredentialForm<A> {
    api: A,
    tenant: watch::Receiver<Option<TenantId>>,
    state: watch::Sender<FormState>,
    fields: FormFields,
    loaded: Option<CredentialView>,
    field_errors: Vec<FieldError>,
    notification: Option<Notification>,
}

impl<A: CredentialsApi> CredentialForm<A> {
    /// A form in the `Loading` state. Call [`load`](Self::load) to fetch.
    pub fn new(api: A, tenant: watch::Receiver<Option<TenantId>>) -> Self {
        let (state, _) = watch::channel(FormState::Loading);
        Self {
            api,
            tenant,
            state,
            fields: FormFields::default(),
            loaded: None,
            field_errors: Vec::new(),
            notification: None,
        }
    }

    /// Create the form and fetch the current tenant's credential.
    pub async fn mount(api: A, tenant: watch::Receiver<Option<TenantId>>) -> Self {
        let mut form = Self::new(api, tenant);
        form.load().await;
        form
    }

    pub fn state(&self) -> FormState {
        *self.state.borrow()
    }

    /// Observe state transitions, e.g. to disable the submit button while saving.
    pub fn subscribe_state(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FormFields {
        &mut self.fields
    }

    pub fn loaded(&self) -> Option<&CredentialView> {
        self.loaded.as_ref()
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    /// Placeholder for the password input when a password is already stored.
    pub fn password_hint(&self) -> Option<&'static str> {
        self.loaded
            .as_ref()
            .filter(|v| v.has_password)
            .map(|_| PASSWORD_KEEP_HINT)
    }

    /// Whether the fields differ from the last loaded record.
    pub fn is_dirty(&self) -> bool {
        self.fields != self.snapshot()
    }

    /// Fetch the current tenant's credential and reset the fields to it.
    pub async fn load(&mut self) {
        self.state.send_replace(FormState::Loading);
        let tenant = self.tenant.borrow_and_update().clone();

        match tenant {
            None => {
                self.apply_loaded(None);
                self.notify(NotificationKind::Error, "No tenant selected");
            }
            Some(tenant) => match self.api.fetch(&tenant).await {
                Ok(view) => self.apply_loaded(view),
                Err(e) => {
                    tracing::warn!(tenant = %tenant, "loading ERP credentials failed: {}", e);
                    self.apply_loaded(None);
                    self.notify(NotificationKind::Error, load_failure_message(&e));
                }
            },
        }

        self.state.send_replace(FormState::Idle);
    }

    /// Reload if the active tenant changed since the last load.
    /// Returns whether a reload happened.
    pub async fn sync_tenant(&mut self) -> bool {
        if matches!(self.tenant.has_changed(), Ok(true)) {
            self.load().await;
            true
        } else {
            false
        }
    }

    /// Validate and save. Returns `true` when the service stored the record.
    ///
    /// Ignored unless the form is `Idle`. Invalid input never reaches the network.
    pub async fn submit(&mut self) -> bool {
        if self.state() != FormState::Idle {
            return false;
        }
        self.field_errors.clear();

        let input = match validate_payload(&self.fields.to_payload()) {
            Ok(input) => input,
            Err(errors) => {
                self.field_errors = errors;
                self.notify(NotificationKind::Error, "Please correct the highlighted fields");
                return false;
            }
        };

        let tenant = self.tenant.borrow().clone();
        let Some(tenant) = tenant else {
            self.notify(NotificationKind::Error, "No tenant selected");
            return false;
        };

        self.state.send_replace(FormState::Submitting);
        let result = self.api.save(&tenant, &CredentialRequest::from(&input)).await;
        self.state.send_replace(FormState::Idle);

        match result {
            Ok(outcome) => {
                self.apply_loaded(Some(outcome.credential));
                self.notify(NotificationKind::Success, outcome.message);
                true
            }
            Err(ClientError::Rejected {
                message, errors, ..
            }) => {
                self.field_errors = errors;
                self.notify(NotificationKind::Error, message);
                false
            }
            Err(e) => {
                tracing::warn!(tenant = %tenant, "saving ERP credentials failed: {}", e);
                self.notify(NotificationKind::Error, "Could not save ERP credentials");
                false
            }
        }
    }

    /// Delete the stored credential. Returns `true` on success.
    pub async fn delete(&mut self) -> bool {
        if self.state() != FormState::Idle {
            return false;
        }
        let tenant = self.tenant.borrow().clone();
        let Some(tenant) = tenant else {
            self.notify(NotificationKind::Error, "No tenant selected");
            return false;
        };

        self.state.send_replace(FormState::Submitting);
        let result = self.api.delete(&tenant).await;
        self.state.send_replace(FormState::Idle);

        match result {
            Ok(message) => {
                self.apply_loaded(None);
                self.notify(NotificationKind::Success, message);
                true
            }
            Err(e) => {
                tracing::warn!(tenant = %tenant, "deleting ERP credentials failed: {}", e);
                let message = match e {
                    ClientError::Rejected { message, .. } => message,
                    _ => "Could not delete ERP credentials".to_string(),
                };
                self.notify(NotificationKind::Error, message);
                false
            }
        }
    }

    /// Close the form: unsaved edits are discarded, nothing is persisted.
    pub fn close(&mut self) {
        self.fields = self.snapshot();
        self.field_errors.clear();
    }

    fn snapshot(&self) -> FormFields {
        self.loaded
            .as_ref()
            .map(FormFields::from_view)
            .unwrap_or_default()
    }

    fn apply_loaded(&mut self, view: Option<CredentialView>) {
        self.loaded = view;
        self.fields = self.snapshot();
        self.field_errors.clear();
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notification = Some(Notification {
            kind,
            message: message.into(),
        });
    }
}

fn load_failure_message(e: &ClientError) -> String {
    match e {
        ClientError::Rejected { message, .. } => message.clone(),
        _ => "Could not load ERP credentials".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::client::SaveOutcome;

    /// In-process fake of the settings API. Records the form state seen at
    /// each call and the bodies it was sent.
    #[derive(Clone, Default)]
    struct FakeApi {
        inner: Arc<Mutex<FakeInner>>,
    }

    #[derive(Default)]
    struct FakeInner {
        rows: Vec<(TenantId, CredentialView, String)>,
        sent_passwords: Vec<Option<String>>,
        calls: usize,
        fail_save: Option<ClientError>,
        observed: Vec<FormState>,
        state_rx: Option<watch::Receiver<FormState>>,
    }

    impl FakeApi {
        fn observe(&self) {
            let mut inner = self.inner.lock().unwrap();
            inner.calls += 1;
            if let Some(state) = inner.state_rx.as_ref().map(|rx| *rx.borrow()) {
                inner.observed.push(state);
            }
        }
    }

    #[async_trait]
    impl CredentialsApi for FakeApi {
        async fn fetch(&self, tenant: &TenantId) -> Result<Option<CredentialView>, ClientError> {
            self.observe();
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .rows
                .iter()
                .find(|(t, _, _)| t == tenant)
                .map(|(_, v, _)| v.clone()))
        }

        async fn save(
            &self,
            tenant: &TenantId,
            body: &CredentialRequest,
        ) -> Result<SaveOutcome, ClientError> {
            self.observe();
            let mut inner = self.inner.lock().unwrap();
            inner.sent_passwords.push(body.password.clone());
            if let Some(err) = inner.fail_save.take() {
                return Err(err);
            }

            let existing = inner.rows.iter().position(|(t, _, _)| t == tenant);
            let old_password = existing
                .map(|i| inner.rows[i].2.clone())
                .unwrap_or_default();
            let password = body.password.clone().unwrap_or(old_password);
            let now = Utc::now();
            let view = CredentialView {
                tenant_id: tenant.clone(),
                host: body.host.clone(),
                port: body.port,
                database_name: body.database_name.clone(),
                username: body.username.clone(),
                has_password: !password.is_empty(),
                created_at: now,
                updated_at: now,
            };
            if let Some(i) = existing {
                inner.rows.remove(i);
            }
            inner.rows.push((tenant.clone(), view.clone(), password));

            Ok(SaveOutcome {
                message: "ERP credentials saved".into(),
                credential: view,
            })
        }

        async fn delete(&self, tenant: &TenantId) -> Result<String, ClientError> {
            self.observe();
            self.inner.lock().unwrap().rows.retain(|(t, _, _)| t != tenant);
            Ok("ERP credentials deleted".into())
        }
    }

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    fn fill(form: &mut CredentialForm<FakeApi>, password: &str) {
        let f = form.fields_mut();
        f.host = "10.0.0.1".into();
        f.port = "3050".into();
        f.database_name = "DB.FDB".into();
        f.username = "SYSDBA".into();
        f.password = password.into();
    }

    #[tokio::test]
    async fn test_mount_without_record_is_idle_and_empty() {
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let form = CredentialForm::mount(FakeApi::default(), rx).await;

        assert_eq!(form.state(), FormState::Idle);
        assert!(form.loaded().is_none());
        assert_eq!(form.fields(), &FormFields::default());
        assert!(form.notification().is_none());
    }

    #[tokio::test]
    async fn test_new_form_starts_loading() {
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let form = CredentialForm::new(FakeApi::default(), rx);
        assert_eq!(form.state(), FormState::Loading);
    }

    #[tokio::test]
    async fn test_save_then_reload_prefills_without_password() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api.clone(), rx.clone()).await;

        fill(&mut form, "pw");
        assert!(form.submit().await);
        assert_eq!(
            form.notification().map(|n| n.kind),
            Some(NotificationKind::Success)
        );
        assert_eq!(form.fields().password, "");

        let reloaded = CredentialForm::mount(api, rx).await;
        assert_eq!(reloaded.fields().host, "10.0.0.1");
        assert_eq!(reloaded.fields().port, "3050");
        assert_eq!(reloaded.fields().password, "");
        assert_eq!(reloaded.password_hint(), Some(PASSWORD_KEEP_HINT));
    }

    #[tokio::test]
    async fn test_blank_password_is_not_sent() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api.clone(), rx).await;

        fill(&mut form, "pw");
        assert!(form.submit().await);
        fill(&mut form, "");
        assert!(form.submit().await);

        let inner = api.inner.lock().unwrap();
        assert_eq!(inner.sent_passwords, vec![Some("pw".to_string()), None]);
        assert!(inner.rows[0].1.has_password);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_api() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api.clone(), rx).await;
        let calls_after_mount = api.inner.lock().unwrap().calls;

        fill(&mut form, "");
        form.fields_mut().port = "abc".into();
        assert!(!form.submit().await);

        assert_eq!(api.inner.lock().unwrap().calls, calls_after_mount);
        assert_eq!(form.field_errors()[0].field, "port");
        assert_eq!(form.state(), FormState::Idle);
    }

    #[tokio::test]
    async fn test_request_runs_in_submitting_state() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api.clone(), rx).await;
        api.inner.lock().unwrap().state_rx = Some(form.subscribe_state());

        fill(&mut form, "pw");
        form.submit().await;
        form.delete().await;
        form.load().await;

        assert_eq!(
            api.inner.lock().unwrap().observed,
            vec![FormState::Submitting, FormState::Submitting, FormState::Loading]
        );
        assert_eq!(form.state(), FormState::Idle);
    }

    #[tokio::test]
    async fn test_server_rejection_surfaces_field_errors() {
        let api = FakeApi::default();
        api.inner.lock().unwrap().fail_save = Some(ClientError::Rejected {
            status: 400,
            message: "Invalid ERP credential data".into(),
            errors: vec![FieldError::new("host", "Host is required")],
        });
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api, rx).await;

        fill(&mut form, "pw");
        assert!(!form.submit().await);
        assert_eq!(form.field_errors()[0].field, "host");
        assert_eq!(
            form.notification(),
            Some(&Notification {
                kind: NotificationKind::Error,
                message: "Invalid ERP credential data".into(),
            })
        );
        // edits survive a failed save
        assert_eq!(form.fields().password, "pw");
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic_notification() {
        let api = FakeApi::default();
        api.inner.lock().unwrap().fail_save =
            Some(ClientError::MalformedResponse { status: 502 });
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api, rx).await;

        fill(&mut form, "pw");
        assert!(!form.submit().await);
        assert_eq!(
            form.take_notification().map(|n| n.message),
            Some("Could not save ERP credentials".to_string())
        );
        assert!(form.notification().is_none());
    }

    #[tokio::test]
    async fn test_close_discards_unsaved_edits() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api.clone(), rx).await;
        fill(&mut form, "pw");
        form.submit().await;

        form.fields_mut().host = "changed".into();
        form.fields_mut().password = "typed".into();
        assert!(form.is_dirty());

        form.close();
        assert!(!form.is_dirty());
        assert_eq!(form.fields().host, "10.0.0.1");
        assert_eq!(form.fields().password, "");
        assert_eq!(api.inner.lock().unwrap().rows[0].1.host, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_delete_clears_fields() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api, rx).await;
        fill(&mut form, "pw");
        form.submit().await;

        assert!(form.delete().await);
        assert!(form.loaded().is_none());
        assert_eq!(form.fields(), &FormFields::default());
        assert!(form.password_hint().is_none());
    }

    #[tokio::test]
    async fn test_tenant_switch_reloads() {
        let api = FakeApi::default();
        let (tx, rx) = watch::channel(Some(tenant("acme")));
        let mut form = CredentialForm::mount(api, rx).await;
        fill(&mut form, "pw");
        form.submit().await;

        assert!(!form.sync_tenant().await);

        tx.send(Some(tenant("globex"))).unwrap();
        assert!(form.sync_tenant().await);
        assert!(form.loaded().is_none());
        assert_eq!(form.fields().host, "");

        tx.send(Some(tenant("acme"))).unwrap();
        assert!(form.sync_tenant().await);
        assert_eq!(form.fields().host, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_no_tenant_blocks_requests() {
        let api = FakeApi::default();
        let (_tx, rx) = watch::channel(None);
        let mut form = CredentialForm::mount(api.clone(), rx).await;

        assert_eq!(
            form.notification().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
        fill(&mut form, "pw");
        assert!(!form.submit().await);
        assert!(!form.delete().await);
        assert_eq!(api.inner.lock().unwrap().calls, 0);
    }
}
