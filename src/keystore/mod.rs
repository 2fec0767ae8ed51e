//! Android signing keystore provisioning

pub mod interactive;
pub mod keytool;
pub mod persist;
pub mod request;

pub use interactive::{ProvisionOutcome, ProvisioningFlow, interactive_setup};
pub use keytool::{KeyGenerator, Keytool};
pub use persist::{PersistOutcome, persist_credentials};
pub use request::{
    CredentialRequest, KeyParameters, MIN_PASSWORD_LEN, PersistedCredentialRecord, RetryPolicy,
    Secret, Subject,
};
