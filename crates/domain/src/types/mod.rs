//! Domain types and models
//!
//! Only the fields the session and statistics views consume are modelled;
//! unknown response fields are ignored during deserialization.

pub mod period;
pub mod top;
pub mod user;

pub use period::{ItemKind, TimeRange};
pub use top::{AlbumRef, ArtistRef, Page, TopItem};
pub use user::{Followers, Image, UserProfile};
