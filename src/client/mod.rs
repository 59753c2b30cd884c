//! Client side of the marketplace: HTTP client, session state and the
//! listing draft that collects uploaded images before submission.

pub mod api;
pub mod draft;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use draft::{parse_tags, DraftError, ListingDraft};
pub use session::{Session, SessionEvent, SessionStore};
