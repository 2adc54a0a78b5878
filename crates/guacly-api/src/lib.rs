// guacly-api: Async Rust client for the Apache Guacamole REST API

pub mod dispatch;
pub mod error;
pub mod managers;
pub mod patch;
pub mod session;
pub mod templates;
pub mod totp;
pub mod transport;
pub mod tree;
pub mod validate;

pub use dispatch::{Reply, ResponseFormat};
pub use error::Error;
pub use managers::{
    ActiveConnections, ConnectionGroups, Connections, ROOT_GROUP, Schema, SharingProfiles,
    UserGroups, Users,
};
pub use patch::{ObjectPermission, ObjectTarget, PatchOp, PatchOperation, SystemPermission};
pub use session::{Credentials, Protocol, Session, SessionConfig};
pub use totp::{Clock, FixedClock, SystemClock};
pub use transport::{TlsMode, TransportConfig};
pub use tree::{MatchMode, NameMatcher, TreeNode};
pub use validate::validate_payload;
