//! Password login with a soft one-device-per-account binding.
//!
//! ```text
//! Unbound ──first login──▶ Bound ──login──▶ Match     (proceeds)
//!    ▲                       │      └────▶ Mismatch  (rejected, audited)
//!    └──── admin reset ──────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fingerprint::Fingerprint;
use super::password::verify_password;
use crate::db::{AccountRepository, RepositoryError};
use crate::models::{Account, AccountSummary, LoginAttempt, NewLoginAttempt};

/// Shown to users whose device is rejected when no contact is configured.
pub const DEFAULT_CONTACT_HINT: &str = "a superstaff member";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Only an administrator reset clears this condition.
    #[error("this account is bound to another device; contact {contact_hint} to reset it")]
    DeviceMismatch { contact_hint: String },

    #[error("account not found")]
    AccountNotFound,

    /// The acting account authenticated but holds no administrator role.
    #[error("administrator role required")]
    Forbidden,

    #[error("remote operation failed: {0}")]
    Remote(String),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::AccountNotFound,
            other => Self::Remote(other.to_string()),
        }
    }
}

/// Result of comparing a presented fingerprint with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingCheck {
    /// Nothing stored yet; the presented fingerprint will be bound.
    FirstBind,
    Match,
    Mismatch,
}

impl BindingCheck {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::FirstBind => "hwid_bound",
            Self::Match => "hwid_match",
            Self::Mismatch => "hwid_mismatch",
        }
    }
}

/// Byte-for-byte comparison against the stored binding.
pub fn check_binding(stored: Option<&Fingerprint>, presented: &Fingerprint) -> BindingCheck {
    match stored {
        None => BindingCheck::FirstBind,
        Some(stored) if stored.as_str().as_bytes() == presented.as_str().as_bytes() => {
            BindingCheck::Match
        }
        Some(_) => BindingCheck::Mismatch,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub account: AccountSummary,
    pub binding: BindingCheck,
}

/// Login and fingerprint-reset operations over an account store.
pub struct DeviceBindingAuth<'a, R: ?Sized> {
    repo: &'a R,
    contact_hint: String,
}

impl<'a, R> DeviceBindingAuth<'a, R>
where
    R: AccountRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            contact_hint: DEFAULT_CONTACT_HINT.to_string(),
        }
    }

    /// Who to contact for a reset, carried by [`AuthError::DeviceMismatch`].
    pub fn with_contact_hint(mut self, hint: impl Into<String>) -> Self {
        self.contact_hint = hint.into();
        self
    }

    /// Authenticates with email and password, then enforces the device
    /// binding. Every attempt on an existing account is audited.
    ///
    /// # Errors
    /// * [`AuthError::AccountNotFound`] for an unknown email.
    /// * [`AuthError::InvalidCredentials`] for a wrong password.
    /// * [`AuthError::DeviceMismatch`] when a different fingerprint is bound,
    ///   including one bound by a concurrent first login that won the race.
    /// * [`AuthError::Remote`] when the store fails.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        fingerprint: &Fingerprint,
    ) -> Result<LoginOutcome, AuthError> {
        let account = self.repo.find_account_by_email(email).await?;

        if !verify_password(password, &account.password_hash) {
            self.audit(&account, fingerprint, false, "invalid_credentials")
                .await?;
            return Err(AuthError::InvalidCredentials);
        }

        let binding = self.settle_binding(&account, fingerprint).await?;
        if binding == BindingCheck::Mismatch {
            // The refusal stands even when it cannot be recorded.
            if let Err(e) = self
                .audit(&account, fingerprint, false, binding.reason())
                .await
            {
                warn!(account_id = account.id, error = %e, "failed to record refused login");
            }
            warn!(account_id = account.id, %fingerprint, "rejected login from unbound device");
            return Err(AuthError::DeviceMismatch {
                contact_hint: self.contact_hint.clone(),
            });
        }

        self.audit(&account, fingerprint, true, binding.reason())
            .await?;

        let mut summary = AccountSummary::from(&account);
        summary.has_hwid = true;
        summary.highest_role = self.repo.highest_role(account.id).await?;

        Ok(LoginOutcome {
            account: summary,
            binding,
        })
    }

    /// Clears `target_id`'s binding on behalf of an administrator who
    /// authenticates with email and password.
    ///
    /// # Errors
    /// * [`AuthError::InvalidCredentials`] when the administrator's email or
    ///   password is wrong.
    /// * [`AuthError::Forbidden`] when that account is not an administrator.
    /// * [`AuthError::AccountNotFound`] when `target_id` does not exist.
    pub async fn reset_fingerprint(
        &self,
        admin_email: &str,
        admin_password: &str,
        target_id: i64,
    ) -> Result<Account, AuthError> {
        let admin = self.require_admin(admin_email, admin_password).await?;

        let account = self.repo.reset_fingerprint(target_id).await?;
        info!(
            admin_id = admin.id,
            account_id = target_id,
            resets = account.hwid_reset_count,
            "reset device fingerprint"
        );
        Ok(account)
    }

    /// Redacted account listing, administrators only.
    pub async fn list_accounts(
        &self,
        admin_email: &str,
        admin_password: &str,
    ) -> Result<Vec<AccountSummary>, AuthError> {
        self.require_admin(admin_email, admin_password).await?;
        Ok(self.repo.list_accounts_safe().await?)
    }

    /// Login attempts for `account_id`, most recent first. Administrators only.
    pub async fn login_history(
        &self,
        admin_email: &str,
        admin_password: &str,
        account_id: i64,
    ) -> Result<Vec<LoginAttempt>, AuthError> {
        self.require_admin(admin_email, admin_password).await?;
        self.repo.get_account(account_id).await?;
        Ok(self.repo.list_login_attempts(account_id).await?)
    }

    /// Binds on first use. A bind that finds a fingerprint already stored
    /// re-reads the account and compares against what is there now.
    async fn settle_binding(
        &self,
        account: &Account,
        fingerprint: &Fingerprint,
    ) -> Result<BindingCheck, AuthError> {
        let mut stored = account.hwid.clone();
        loop {
            let check = check_binding(stored.as_ref(), fingerprint);
            if check != BindingCheck::FirstBind {
                return Ok(check);
            }
            if self.repo.bind_fingerprint(account.id, fingerprint).await? {
                info!(account_id = account.id, %fingerprint, "bound device fingerprint");
                return Ok(check);
            }
            debug!(account_id = account.id, "concurrent login bound a device first");
            stored = self.repo.get_account(account.id).await?.hwid;
        }
    }

    /// An unknown administrator email reads as bad credentials, not as a
    /// missing account.
    async fn require_admin(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let admin = match self.repo.find_account_by_email(email).await {
            Ok(account) => account,
            Err(RepositoryError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(other) => return Err(other.into()),
        };
        if !verify_password(password, &admin.password_hash) {
            warn!(account_id = admin.id, "administrator authentication failed");
            return Err(AuthError::InvalidCredentials);
        }
        match self.repo.highest_role(admin.id).await? {
            Some(role) if role.is_admin() => Ok(admin),
            _ => Err(AuthError::Forbidden),
        }
    }

    async fn audit(
        &self,
        account: &Account,
        fingerprint: &Fingerprint,
        success: bool,
        reason: &str,
    ) -> Result<(), AuthError> {
        self.repo
            .record_login_attempt(NewLoginAttempt {
                account_id: account.id,
                fingerprint: fingerprint.clone(),
                success,
                reason: reason.to_string(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::password::hash_password;
    use crate::models::{AppRole, NewAccount};

    /// In-memory account store for exercising the flow.
    #[derive(Default)]
    struct MemoryAccounts {
        accounts: Mutex<HashMap<i64, Account>>,
        roles: Mutex<HashMap<i64, Vec<AppRole>>>,
        attempts: Mutex<Vec<LoginAttempt>>,
        /// Bound just before the next bind lands, as a concurrent login would.
        bound_elsewhere: Mutex<Option<Fingerprint>>,
        fail_audit: AtomicBool,
    }

    #[async_trait]
    impl AccountRepository for MemoryAccounts {
        async fn create_account(&self, new: NewAccount) -> Result<Account, RepositoryError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = Account {
                id: accounts.len() as i64 + 1,
                email: new.email,
                display_name: new.display_name,
                password_hash: new.password_hash,
                hwid: None,
                hwid_reset_count: 0,
                last_hwid_reset: None,
                created_at: Utc::now(),
            };
            accounts.insert(account.id, account.clone());
            Ok(account)
        }
        async fn get_account(&self, id: i64) -> Result<Account, RepositoryError> {
            self.accounts.lock().unwrap().get(&id).cloned().ok_or(RepositoryError::NotFound)
        }
        async fn find_account_by_email(&self, email: &str) -> Result<Account, RepositoryError> {
            self.accounts
                .lock()
                .unwrap()
                .values()
                .find(|a| a.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }
        async fn bind_fingerprint(
            &self,
            account_id: i64,
            fingerprint: &Fingerprint,
        ) -> Result<bool, RepositoryError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts.get_mut(&account_id).ok_or(RepositoryError::NotFound)?;
            if let Some(other) = self.bound_elsewhere.lock().unwrap().take() {
                account.hwid = Some(other);
            }
            if account.hwid.is_some() {
                return Ok(false);
            }
            account.hwid = Some(fingerprint.clone());
            Ok(true)
        }
        async fn reset_fingerprint(&self, account_id: i64) -> Result<Account, RepositoryError> {
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts.get_mut(&account_id).ok_or(RepositoryError::NotFound)?;
            account.hwid = None;
            account.hwid_reset_count += 1;
            account.last_hwid_reset = Some(Utc::now());
            Ok(account.clone())
        }
        async fn list_accounts_safe(&self) -> Result<Vec<AccountSummary>, RepositoryError> {
            Ok(self.accounts.lock().unwrap().values().map(AccountSummary::from).collect())
        }
        async fn assign_role(&self, account_id: i64, role: AppRole) -> Result<(), RepositoryError> {
            self.roles.lock().unwrap().entry(account_id).or_default().push(role);
            Ok(())
        }
        async fn highest_role(&self, account_id: i64) -> Result<Option<AppRole>, RepositoryError> {
            Ok(self
                .roles
                .lock()
                .unwrap()
                .get(&account_id)
                .and_then(|roles| roles.iter().max().copied()))
        }
        async fn record_login_attempt(
            &self,
            attempt: NewLoginAttempt,
        ) -> Result<LoginAttempt, RepositoryError> {
            if self.fail_audit.load(Ordering::SeqCst) {
                return Err(RepositoryError::Database("disk I/O error".to_string()));
            }
            let mut attempts = self.attempts.lock().unwrap();
            let row = LoginAttempt {
                id: attempts.len() as i64 + 1,
                account_id: attempt.account_id,
                fingerprint: attempt.fingerprint,
                success: attempt.success,
                reason: attempt.reason,
                attempted_at: Utc::now(),
            };
            attempts.push(row.clone());
            Ok(row)
        }
        async fn list_login_attempts(
            &self,
            account_id: i64,
        ) -> Result<Vec<LoginAttempt>, RepositoryError> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|a| a.account_id == account_id)
                .cloned()
                .collect())
        }
    }

    fn fp(s: &str) -> Fingerprint {
        s.parse().unwrap()
    }

    async fn store_with_user() -> (MemoryAccounts, Account) {
        let store = MemoryAccounts::default();
        let account = store
            .create_account(NewAccount {
                email: "x@guild.test".to_string(),
                display_name: "X".to_string(),
                password_hash: hash_password("correct horse"),
            })
            .await
            .unwrap();
        (store, account)
    }

    async fn add_admin(store: &MemoryAccounts, role: AppRole) -> Account {
        let admin = store
            .create_account(NewAccount {
                email: "admin@guild.test".to_string(),
                display_name: "Admin".to_string(),
                password_hash: hash_password("admin"),
            })
            .await
            .unwrap();
        store.assign_role(admin.id, role).await.unwrap();
        admin
    }

    // =========================================================================
    // check_binding tests
    // =========================================================================

    #[test]
    fn unbound_account_binds_on_first_use() {
        assert_eq!(check_binding(None, &fp("ABC123")), BindingCheck::FirstBind);
    }

    #[test]
    fn identical_fingerprint_matches() {
        assert_eq!(check_binding(Some(&fp("ABC123")), &fp("ABC123")), BindingCheck::Match);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert_eq!(check_binding(Some(&fp("abc123")), &fp("ABC123")), BindingCheck::Mismatch);
    }

    #[test]
    fn surrounding_whitespace_is_a_different_device() {
        assert_eq!(check_binding(Some(&fp("ABC123")), &fp(" ABC123")), BindingCheck::Mismatch);
        assert_eq!(check_binding(Some(&fp("ABC123 ")), &fp("ABC123")), BindingCheck::Mismatch);
    }

    // =========================================================================
    // login flow tests
    // =========================================================================

    #[tokio::test]
    async fn first_login_binds_presented_fingerprint() {
        let (store, account) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store);

        let outcome = auth
            .login("x@guild.test", "correct horse", &fp("ABC123"))
            .await
            .unwrap();

        assert_eq!(outcome.binding, BindingCheck::FirstBind);
        assert!(outcome.account.has_hwid);
        let stored = store.get_account(account.id).await.unwrap();
        assert_eq!(stored.hwid, Some(fp("ABC123")));
    }

    #[tokio::test]
    async fn same_device_logs_in_again() {
        let (store, _) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store);
        auth.login("x@guild.test", "correct horse", &fp("ABC123")).await.unwrap();

        let outcome = auth
            .login("x@guild.test", "correct horse", &fp("ABC123"))
            .await
            .unwrap();

        assert_eq!(outcome.binding, BindingCheck::Match);
    }

    #[tokio::test]
    async fn other_device_is_rejected_and_audited() {
        let (store, account) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store).with_contact_hint("@superstaff");
        auth.login("x@guild.test", "correct horse", &fp("ABC123")).await.unwrap();

        let result = auth.login("x@guild.test", "correct horse", &fp("XYZ999")).await;

        assert_eq!(
            result,
            Err(AuthError::DeviceMismatch {
                contact_hint: "@superstaff".to_string()
            })
        );
        let attempts = store.list_login_attempts(account.id).await.unwrap();
        assert_eq!(attempts[0].fingerprint, fp("XYZ999"));
        assert!(!attempts[0].success);
        assert_eq!(attempts[0].reason, "hwid_mismatch");
        // The binding is untouched.
        let stored = store.get_account(account.id).await.unwrap();
        assert_eq!(stored.hwid, Some(fp("ABC123")));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (store, account) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store);

        let result = auth.login("x@guild.test", "wrong", &fp("ABC123")).await;

        assert_eq!(result, Err(AuthError::InvalidCredentials));
        // A failed password must not bind the device.
        assert_eq!(store.get_account(account.id).await.unwrap().hwid, None);
    }

    #[tokio::test]
    async fn unknown_email_is_account_not_found() {
        let (store, _) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store);

        let result = auth.login("nobody@guild.test", "x", &fp("ABC123")).await;

        assert_eq!(result, Err(AuthError::AccountNotFound));
    }

    #[tokio::test]
    async fn losing_first_bind_race_is_a_mismatch() {
        let (store, account) = store_with_user().await;
        *store.bound_elsewhere.lock().unwrap() = Some(fp("OTHER1"));
        let auth = DeviceBindingAuth::new(&store);

        let result = auth.login("x@guild.test", "correct horse", &fp("ABC123")).await;

        assert!(matches!(result, Err(AuthError::DeviceMismatch { .. })));
        assert_eq!(store.get_account(account.id).await.unwrap().hwid, Some(fp("OTHER1")));
        let attempts = store.list_login_attempts(account.id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].reason, "hwid_mismatch");
    }

    #[tokio::test]
    async fn losing_first_bind_race_to_same_device_matches() {
        let (store, account) = store_with_user().await;
        *store.bound_elsewhere.lock().unwrap() = Some(fp("ABC123"));
        let auth = DeviceBindingAuth::new(&store);

        let outcome = auth
            .login("x@guild.test", "correct horse", &fp("ABC123"))
            .await
            .unwrap();

        assert_eq!(outcome.binding, BindingCheck::Match);
        assert_eq!(store.get_account(account.id).await.unwrap().hwid, Some(fp("ABC123")));
    }

    #[tokio::test]
    async fn mismatch_is_reported_when_audit_fails() {
        let (store, _) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store).with_contact_hint("@superstaff");
        auth.login("x@guild.test", "correct horse", &fp("ABC123")).await.unwrap();
        store.fail_audit.store(true, Ordering::SeqCst);

        let result = auth.login("x@guild.test", "correct horse", &fp("XYZ999")).await;

        assert_eq!(
            result,
            Err(AuthError::DeviceMismatch {
                contact_hint: "@superstaff".to_string()
            })
        );
    }

    #[tokio::test]
    async fn admin_reset_allows_rebinding() {
        let (store, account) = store_with_user().await;
        add_admin(&store, AppRole::Superstaff).await;
        let auth = DeviceBindingAuth::new(&store);
        auth.login("x@guild.test", "correct horse", &fp("ABC123")).await.unwrap();

        let reset = auth
            .reset_fingerprint("admin@guild.test", "admin", account.id)
            .await
            .unwrap();
        assert_eq!(reset.hwid, None);
        assert_eq!(reset.hwid_reset_count, 1);
        assert!(reset.last_hwid_reset.is_some());

        let outcome = auth
            .login("x@guild.test", "correct horse", &fp("XYZ999"))
            .await
            .unwrap();
        assert_eq!(outcome.binding, BindingCheck::FirstBind);
        assert_eq!(store.get_account(account.id).await.unwrap().hwid, Some(fp("XYZ999")));
    }

    #[tokio::test]
    async fn admin_with_wrong_password_cannot_reset() {
        let (store, account) = store_with_user().await;
        add_admin(&store, AppRole::Superstaff).await;
        let auth = DeviceBindingAuth::new(&store);
        auth.login("x@guild.test", "correct horse", &fp("ABC123")).await.unwrap();

        let result = auth
            .reset_fingerprint("admin@guild.test", "letmein", account.id)
            .await;

        assert_eq!(result, Err(AuthError::InvalidCredentials));
        assert_eq!(store.get_account(account.id).await.unwrap().hwid, Some(fp("ABC123")));
    }

    #[tokio::test]
    async fn unknown_admin_email_is_invalid_credentials() {
        let (store, account) = store_with_user().await;
        let auth = DeviceBindingAuth::new(&store);

        let result = auth
            .reset_fingerprint("ghost@guild.test", "admin", account.id)
            .await;

        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn non_admin_cannot_reset() {
        let (store, account) = store_with_user().await;
        store.assign_role(account.id, AppRole::Staff).await.unwrap();
        let auth = DeviceBindingAuth::new(&store);

        let result = auth
            .reset_fingerprint("x@guild.test", "correct horse", account.id)
            .await;

        assert_eq!(result, Err(AuthError::Forbidden));
    }

    #[tokio::test]
    async fn reset_of_missing_account_is_not_found() {
        let (store, _) = store_with_user().await;
        add_admin(&store, AppRole::Superstaff).await;
        let auth = DeviceBindingAuth::new(&store);

        let result = auth.reset_fingerprint("admin@guild.test", "admin", 999).await;

        assert_eq!(result, Err(AuthError::AccountNotFound));
    }

    #[tokio::test]
    async fn login_history_requires_admin_credentials() {
        let (store, account) = store_with_user().await;
        add_admin(&store, AppRole::Superstaff).await;
        let auth = DeviceBindingAuth::new(&store);
        let _ = auth.login("x@guild.test", "wrong", &fp("ABC123")).await;

        let history = auth
            .login_history("admin@guild.test", "admin", account.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, "invalid_credentials");

        assert_eq!(
            auth.login_history("admin@guild.test", "nope", account.id).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.login_history("x@guild.test", "correct horse", account.id).await,
            Err(AuthError::Forbidden)
        );
    }
}
