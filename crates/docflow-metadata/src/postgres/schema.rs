// @generated by hand to match migrations/2024-01-01-000000_init/up.sql.

diesel::table! {
    documents (id) {
        id -> Bytea,
        tenant_id -> Bytea,
        folder_id -> Bytea,
        owner_id -> Bytea,
        name -> Text,
        content_type -> Text,
        size_bytes -> BigInt,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    document_versions (id) {
        id -> Bytea,
        document_id -> Bytea,
        version_number -> Integer,
        size_bytes -> BigInt,
        content_hash -> Text,
        status -> Text,
        storage_key -> Text,
        created_at -> Timestamptz,
        created_by -> Bytea,
    }
}

diesel::table! {
    document_metadata (document_id, key) {
        document_id -> Bytea,
        key -> Text,
        value -> Text,
    }
}

diesel::table! {
    permissions (id) {
        id -> BigInt,
        resource_type -> Text,
        resource_id -> Bytea,
        role_id -> Bytea,
        permission_type -> Text,
    }
}

diesel::table! {
    folders (id) {
        id -> Bytea,
        tenant_id -> Bytea,
        parent_id -> Nullable<Bytea>,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    events (id) {
        id -> Bytea,
        tenant_id -> Bytea,
        event_type -> Text,
        resource_id -> Bytea,
        payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    documents,
    document_versions,
    document_metadata,
    permissions,
    folders,
    events,
);
