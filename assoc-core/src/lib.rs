//! Assoc Core - Entity Types
//!
//! Pure data structures for the association store: typed ids, the object
//! and association type allow-lists, entities, the pagination cursor codec,
//! the page shape and the error taxonomy. This crate performs no I/O.

pub mod clock;
pub mod config;
pub mod cursor;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use cursor::{Cursor, CURSOR_DELIMITER};
pub use entities::{
    Association, AssociationItem, AssociationKey, AssociationPatch, CreatedObject,
    NewAssociation, Object, Page,
};
pub use enums::{AssociationStatus, AssociationType, ObjectType};
pub use error::{
    AssocError, AssocResult, ConflictError, NotFoundError, StorageError, ValidationError,
};
pub use identity::{truncate_to_micros, ObjectId, Timestamp};
pub use validation::{parse_id, parse_limit, parse_status, PayloadRegistry, PayloadRule};
