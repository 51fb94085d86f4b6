pub mod credential_store;
pub mod firebase_identity;
pub mod rest_gateway;

pub use credential_store::{FileCredentialStore, MemoryCredentialStore};
pub use firebase_identity::FirebaseIdentityAdapter;
pub use rest_gateway::RestGatewayAdapter;
