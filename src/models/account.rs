use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use sea_orm::ActiveEnum;

use crate::entities::users;
use crate::services::clock::Clock;
use crate::services::credentials::CredentialService;
use crate::services::account_service::AccountError;

pub use crate::entities::users::AccountStatus;

pub const USERNAME_MIN_LENGTH: usize = 2;
pub const USERNAME_MAX_LENGTH: usize = 255;
pub const EMAIL_MAX_LENGTH: usize = 255;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$";

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

impl AccountStatus {
    /// Human-readable name for operator output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blocked => "Blocked",
            Self::Active => "Active",
            Self::WaitingConfirmation => "Waiting for confirmation",
        }
    }

    /// Parses a raw stored status code.
    pub fn from_code(code: i32) -> Result<Self, ValidationErrors> {
        Self::try_from_value(&code)
            .map_err(|_| ValidationErrors::single(Field::Status, "Status is invalid."))
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Account attributes that can carry validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Username,
    Email,
    Status,
    Password,
}

impl Field {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Username => "Username",
            Self::Email => "Email",
            Self::Status => "Status",
            Self::Password => "Password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Field-level validation failures collected across all rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join(" "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Which rule subset runs before a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Username, email and status.
    #[default]
    Full,
    /// Email only, for profile edits.
    Profile,
}

impl ValidationMode {
    #[must_use]
    pub const fn covers(self, field: Field) -> bool {
        match self {
            Self::Full => matches!(field, Field::Username | Field::Email | Field::Status),
            Self::Profile => matches!(field, Field::Email),
        }
    }
}

/// What an authentication layer needs from a logged-in principal.
pub trait Identity {
    fn id(&self) -> Option<i32>;

    fn auth_key(&self) -> &str;

    fn validate_auth_key(&self, candidate: &str) -> bool {
        self.auth_key() == candidate
    }
}

/// A user account. `id` and the timestamps are `None` until the store
/// has inserted the record.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Option<i32>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub auth_key: String,
    pub password_reset_token: Option<String>,
    pub email_confirm_token: Option<String>,
    pub status: AccountStatus,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// A fresh, unsaved account with the default `Active` status.
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: None,
            updated_at: None,
            username: username.into(),
            email: email.into(),
            password_hash: String::new(),
            auth_key: String::new(),
            password_reset_token: None,
            email_confirm_token: None,
            status: AccountStatus::default(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Hashes `password` and stores the hash. Argon2 is CPU heavy; async
    /// callers should go through the account service, which offloads it.
    pub fn set_password(
        &mut self,
        credentials: &dyn CredentialService,
        password: &str,
    ) -> Result<(), AccountError> {
        self.password_hash = credentials.hash_password(password)?;
        Ok(())
    }

    #[must_use]
    pub fn validate_password(&self, credentials: &dyn CredentialService, password: &str) -> bool {
        credentials.verify_password(password, &self.password_hash)
    }

    /// Generates the "remember me" key.
    pub fn generate_auth_key(&mut self, credentials: &dyn CredentialService) {
        self.auth_key = credentials.random_string();
    }

    pub fn generate_password_reset_token(
        &mut self,
        credentials: &dyn CredentialService,
        clock: &dyn Clock,
    ) {
        self.password_reset_token =
            Some(format!("{}_{}", credentials.random_string(), clock.now()));
    }

    pub fn remove_password_reset_token(&mut self) {
        self.password_reset_token = None;
    }

    pub fn generate_email_confirm_token(&mut self, credentials: &dyn CredentialService) {
        self.email_confirm_token = Some(credentials.random_string());
    }

    pub fn remove_email_confirm_token(&mut self) {
        self.email_confirm_token = None;
    }

    /// Checks that `token` was issued no more than `timeout` seconds before `now`.
    ///
    /// The issuance time is the integer after the last `_`. Empty tokens and
    /// tokens whose suffix does not parse are invalid.
    #[must_use]
    pub fn is_password_reset_token_valid(token: &str, timeout: i64, now: i64) -> bool {
        if token.is_empty() {
            return false;
        }

        let Some((_, suffix)) = token.rsplit_once('_') else {
            return false;
        };

        let Ok(issued_at) = suffix.parse::<i64>() else {
            return false;
        };

        issued_at.saturating_add(timeout) >= now
    }

    /// Runs the format rules selected by `mode`. Uniqueness needs the store
    /// and is checked by the account service on top of this.
    pub fn validate(&self, mode: ValidationMode) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if mode.covers(Field::Username) {
            validate_username(&self.username, &mut errors);
        }
        if mode.covers(Field::Email) {
            validate_email(&self.email, &mut errors);
        }

        errors.into_result()
    }
}

impl Identity for Account {
    fn id(&self) -> Option<i32> {
        self.id
    }

    fn auth_key(&self) -> &str {
        &self.auth_key
    }
}

fn validate_username(username: &str, errors: &mut ValidationErrors) {
    if username.trim().is_empty() {
        errors.add(Field::Username, "Username cannot be blank.");
        return;
    }

    static RE: OnceLock<Regex> = OnceLock::new();
    if !get_regex(&RE, r"^[A-Za-z0-9_-]+$").is_match(username) {
        errors.add(
            Field::Username,
            "Username may only contain letters, digits, hyphens and underscores.",
        );
    }

    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH {
        errors.add(
            Field::Username,
            format!("Username should contain at least {USERNAME_MIN_LENGTH} characters."),
        );
    } else if length > USERNAME_MAX_LENGTH {
        errors.add(
            Field::Username,
            format!("Username should contain at most {USERNAME_MAX_LENGTH} characters."),
        );
    }
}

fn validate_email(email: &str, errors: &mut ValidationErrors) {
    if email.trim().is_empty() {
        errors.add(Field::Email, "Email cannot be blank.");
        return;
    }

    if !is_valid_email(email) {
        errors.add(Field::Email, "Email is not a valid email address.");
    }

    if email.chars().count() > EMAIL_MAX_LENGTH {
        errors.add(
            Field::Email,
            format!("Email should contain at most {EMAIL_MAX_LENGTH} characters."),
        );
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, _domain)) = email.rsplit_once('@') else {
        return false;
    };

    static RE: OnceLock<Regex> = OnceLock::new();
    local.len() <= 64 && email.len() <= 254 && get_regex(&RE, EMAIL_PATTERN).is_match(email)
}

impl From<users::Model> for Account {
    fn from(model: users::Model) -> Self {
        Self {
            id: Some(model.id),
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            auth_key: model.auth_key,
            password_reset_token: model.password_reset_token,
            email_confirm_token: model.email_confirm_token,
            status: model.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;

    /// Plaintext "hashing" so tests don't pay for Argon2.
    struct FakeCredentials;

    impl CredentialService for FakeCredentials {
        fn hash_password(&self, password: &str) -> anyhow::Result<String> {
            Ok(format!("plain${password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> bool {
            hash.strip_prefix("plain$") == Some(password)
        }

        fn random_string(&self) -> String {
            uuid::Uuid::new_v4().simple().to_string()
        }
    }

    #[test]
    fn test_new_account_defaults_to_active() {
        let account = Account::new("alice", "alice@example.com");
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.is_new());
        assert!(account.password_reset_token.is_none());
        assert!(account.email_confirm_token.is_none());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AccountStatus::Blocked.to_value(), 0);
        assert_eq!(AccountStatus::Active.to_value(), 1);
        assert_eq!(AccountStatus::WaitingConfirmation.to_value(), 2);

        assert_eq!(AccountStatus::from_code(0).unwrap(), AccountStatus::Blocked);
        assert_eq!(AccountStatus::from_code(1).unwrap(), AccountStatus::Active);
        assert_eq!(
            AccountStatus::from_code(2).unwrap(),
            AccountStatus::WaitingConfirmation
        );

        let err = AccountStatus::from_code(7).unwrap_err();
        assert!(err.has(Field::Status));
        assert_eq!(
            err.for_field(Field::Status).collect::<Vec<_>>(),
            vec!["Status is invalid."]
        );
        assert!(AccountStatus::from_code(-1).is_err());
    }

    #[test]
    fn test_statuses_are_enumerable() {
        use sea_orm::Iterable;

        let labels: Vec<&str> = AccountStatus::iter().map(AccountStatus::label).collect();
        assert_eq!(labels, vec!["Blocked", "Active", "Waiting for confirmation"]);
    }

    #[test]
    fn test_validate_username() {
        assert!(Account::new("alice", "a@example.com").validate(ValidationMode::Full).is_ok());
        assert!(Account::new("al-ice_99", "a@example.com").validate(ValidationMode::Full).is_ok());
        assert!(Account::new("ab", "a@example.com").validate(ValidationMode::Full).is_ok());

        let blank = Account::new("", "a@example.com")
            .validate(ValidationMode::Full)
            .unwrap_err();
        assert_eq!(
            blank.for_field(Field::Username).collect::<Vec<_>>(),
            vec!["Username cannot be blank."]
        );

        assert!(Account::new("a", "a@example.com").validate(ValidationMode::Full).is_err());
        assert!(Account::new("bad name", "a@example.com").validate(ValidationMode::Full).is_err());
        assert!(Account::new("bad@name", "a@example.com").validate(ValidationMode::Full).is_err());
        assert!(Account::new("й".repeat(3), "a@example.com").validate(ValidationMode::Full).is_err());

        let long = "a".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(Account::new(long, "a@example.com").validate(ValidationMode::Full).is_err());
        let max = "a".repeat(USERNAME_MAX_LENGTH);
        assert!(Account::new(max, "a@example.com").validate(ValidationMode::Full).is_ok());
    }

    #[test]
    fn test_validate_email() {
        for email in ["a@example.com", "first.last+tag@sub.example.org", "x_y@a-b.io"] {
            assert!(
                Account::new("alice", email).validate(ValidationMode::Full).is_ok(),
                "{email} should be accepted"
            );
        }

        for email in ["", "plain", "a@", "@example.com", "a..b@example.com", "a@-x.com", "a b@c.com"] {
            let err = Account::new("alice", email)
                .validate(ValidationMode::Full)
                .unwrap_err();
            assert!(err.has(Field::Email), "{email} should be rejected");
        }

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(Account::new("alice", long_local).validate(ValidationMode::Full).is_err());
    }

    #[test]
    fn test_profile_mode_only_checks_email() {
        let account = Account::new("not valid!", "a@example.com");
        assert!(account.validate(ValidationMode::Full).is_err());
        assert!(account.validate(ValidationMode::Profile).is_ok());

        let account = Account::new("not valid!", "nope");
        let err = account.validate(ValidationMode::Profile).unwrap_err();
        assert!(err.has(Field::Email));
        assert!(!err.has(Field::Username));
    }

    #[test]
    fn test_all_field_errors_reported_together() {
        let err = Account::new("!", "nope").validate(ValidationMode::Full).unwrap_err();
        assert!(err.has(Field::Username));
        assert!(err.has(Field::Email));
        assert!(err.errors().len() >= 3);
    }

    #[test]
    fn test_password_reset_token_validity() {
        let now = 1_700_000_000;

        assert!(!Account::is_password_reset_token_valid("", 3600, now));
        assert!(Account::is_password_reset_token_valid(&format!("abc_{}", now - 10), 3600, now));
        assert!(!Account::is_password_reset_token_valid(&format!("abc_{}", now - 4000), 3600, now));
        assert!(Account::is_password_reset_token_valid(&format!("abc_{}", now - 3600), 3600, now));
    }

    #[test]
    fn test_malformed_reset_tokens_are_invalid() {
        let now = 1_700_000_000;

        assert!(!Account::is_password_reset_token_valid("no-underscore", 3600, now));
        assert!(!Account::is_password_reset_token_valid("abc_notanumber", 3600, now));
        assert!(!Account::is_password_reset_token_valid("abc_", 3600, now));
        assert!(!Account::is_password_reset_token_valid("abc_99999999999999999999999", 3600, now));
        assert!(Account::is_password_reset_token_valid(
            &format!("with_under_scores_{now}"),
            3600,
            now
        ));
    }

    #[test]
    fn test_generate_password_reset_token_embeds_clock_time() {
        let clock = ManualClock::new(1_234_567);
        let mut account = Account::new("alice", "a@example.com");

        account.generate_password_reset_token(&FakeCredentials, &clock);

        let token = account.password_reset_token.clone().unwrap();
        assert!(token.ends_with("_1234567"));
        assert!(Account::is_password_reset_token_valid(&token, 3600, clock.now()));

        account.remove_password_reset_token();
        assert!(account.password_reset_token.is_none());
    }

    #[test]
    fn test_email_confirm_token_lifecycle() {
        let mut account = Account::new("alice", "a@example.com");

        account.generate_email_confirm_token(&FakeCredentials);
        let first = account.email_confirm_token.clone().unwrap();
        assert!(!first.is_empty());

        account.generate_email_confirm_token(&FakeCredentials);
        assert_ne!(account.email_confirm_token.as_deref(), Some(first.as_str()));

        account.remove_email_confirm_token();
        assert!(account.email_confirm_token.is_none());
    }

    #[test]
    fn test_auth_key_identity() {
        let mut account = Account::new("alice", "a@example.com");
        account.generate_auth_key(&FakeCredentials);

        let key = account.auth_key().to_string();
        assert!(!key.is_empty());
        assert!(account.validate_auth_key(&key));
        assert!(!account.validate_auth_key("something-else"));
        assert!(!account.validate_auth_key(""));
    }

    #[test]
    fn test_password_round_trip() {
        let mut account = Account::new("alice", "a@example.com");
        account.set_password(&FakeCredentials, "hunter22").unwrap();

        assert!(account.validate_password(&FakeCredentials, "hunter22"));
        assert!(!account.validate_password(&FakeCredentials, "hunter22x"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut account = Account::new("alice", "a@example.com");
        account.set_password(&FakeCredentials, "hunter22").unwrap();
        account.generate_auth_key(&FakeCredentials);

        let debug = format!("{account:?}");
        assert!(!debug.contains("hunter22"));
        assert!(!debug.contains(&account.auth_key));
    }
}
