//! Record synchronization with the remote document service.
//!
//! ## Operations
//!
//! Every operation takes a [`CredentialProvider`](crate::CredentialProvider)
//! and makes at most one remote call:
//! 1. `list_records` - enumerate the collection by naming convention
//! 2. `create_record` - copy the template document under a new name
//! 3. `load_record` - read the schema's range and decode it
//! 4. `save_record` - encode editable values and write them in one call
//!
//! Credentials are checked before any call is made.

mod index;
mod store;

pub use index::{CollectionIndex, DEFAULT_PAGE_SIZE};
pub use store::{RecordStore, StoreConfig, DEFAULT_COLLECTION_LABEL, DEFAULT_TEMPLATE_ID};
