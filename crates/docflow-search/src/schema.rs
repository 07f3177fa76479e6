//! Tantivy schema for the search projection. `tenant_id` is indexed as an exact-match,
//! fast-capable field so every query can AND it in without a tokenizer pass.

use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

#[derive(Clone)]
pub struct Fields {
    pub tenant_id: Field,
    pub document_id: Field,
    pub folder_id: Field,
    pub name: Field,
    pub content_type: Field,
    pub text_content: Field,
    pub metadata: Field,
    pub created_at: Field,
}

pub fn build() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let tenant_id = builder.add_text_field("tenant_id", STRING | STORED | FAST);
    let document_id = builder.add_text_field("document_id", STRING | STORED);
    let folder_id = builder.add_text_field("folder_id", STRING | STORED);
    let name = builder.add_text_field("name", TEXT | STORED);
    let content_type = builder.add_text_field("content_type", STRING | STORED);
    let text_content = builder.add_text_field("text_content", TEXT);
    let metadata = builder.add_text_field("metadata", TEXT | STORED);
    let created_at = builder.add_date_field("created_at", INDEXED | STORED);
    let schema = builder.build();
    (
        schema,
        Fields {
            tenant_id,
            document_id,
            folder_id,
            name,
            content_type,
            text_content,
            metadata,
            created_at,
        },
    )
}
