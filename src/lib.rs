// Core modules
pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod model;
pub mod store;
pub mod types;


// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthError, AuthenticationGate, Principal, TokenIssuer};
pub use broadcast::{BroadcastHub, SubscriberId};
pub use config::{AppConfig, DEFAULT_PROVIDER_API_BASE, ProviderConfig};
pub use model::{Note, NoteDraft, NoteUpdate};
pub use store::NoteStore;
pub use types::{RedirectUri, Subject};
