use super::super::id::DocumentId;

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: i32,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: String,
    pub total_quantity: u32,
}

/// Metadata-only update; quantities change through borrow/return/restock.
#[derive(Debug, Clone)]
pub struct UpdateDocument {
    pub document_id: DocumentId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: i32,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub description: String,
}
