pub mod account;

pub use account::{Account, AccountStatus, Identity, ValidationErrors, ValidationMode};
