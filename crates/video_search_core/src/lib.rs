pub mod domain;
pub mod ports;
pub mod presentation;

pub use domain::{
    AuthCheck, BearerToken, IndexingStatus, SearchHit, Session, SignedIn, UploadedVideo,
    UserIdentity, VideoId, VideoRecord, TOKEN_LIFETIME, TOKEN_REFRESH_INTERVAL,
};
pub use ports::{
    AuthChangeStream, CredentialStore, IdentityProvider, PortError, PortResult, VideoGateway,
};
pub use presentation::{status_badge, BadgeVariant, StatusBadge};
