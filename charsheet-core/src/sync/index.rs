//! Discovery of the documents that make up a collection.

use crate::record::RecordHandle;
use crate::transport::{
    FileQuery, SheetsTransport, TransportError, SPREADSHEET_MIME_TYPE,
};

/// Default number of documents fetched by one enumeration.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Enumerates the collection's documents by naming convention.
///
/// A document belongs to the collection when its name contains the
/// collection label and it is a spreadsheet. Only one page is fetched.
#[derive(Debug, Clone)]
pub struct CollectionIndex {
    query: FileQuery,
}

impl CollectionIndex {
    pub fn new(label: impl Into<String>, page_size: u32) -> Self {
        Self {
            query: FileQuery {
                name_contains: label.into(),
                mime_type: SPREADSHEET_MIME_TYPE.to_string(),
                page_size,
            },
        }
    }

    /// The collection label matched against document names.
    pub fn label(&self) -> &str {
        &self.query.name_contains
    }

    pub fn query(&self) -> &FileQuery {
        &self.query
    }

    /// Handles for the collection's documents, in the order the remote
    /// reports them.
    pub async fn enumerate<T>(
        &self,
        transport: &T,
        token: &str,
    ) -> Result<Vec<RecordHandle>, TransportError>
    where
        T: SheetsTransport + ?Sized,
    {
        let files = transport.list_files(token, &self.query).await?;

        Ok(files
            .into_iter()
            .filter(|file| {
                let keep = self.query.matches(file);
                if !keep {
                    tracing::warn!(
                        "Ignoring '{}' ({}): outside collection '{}'",
                        file.name,
                        file.id,
                        self.label()
                    );
                }
                keep
            })
            .map(|file| RecordHandle::new(file.id, file.name))
            .collect())
    }
}
