pub mod federated;
pub mod identity;
pub mod profile;
pub mod session;

pub use federated::{FederatedProfile, FederatedProfileError};
pub use identity::{AuthProvider, Identity, Role};
pub use profile::{ProfileLookup, ProfileRecord, ProfileUpdate, SignupRequest};
pub use session::{Session, SessionRecord};
