diesel::table! {
    scan_tasks (task_id) {
        task_id -> Bytea,
        tenant_id -> Bytea,
        document_id -> Bytea,
        version_id -> Bytea,
        storage_key -> Text,
        attempt -> Integer,
        enqueued_at -> Timestamptz,
        visible_at -> Timestamptz,
    }
}

diesel::table! {
    scan_tasks_dead_letter (task_id) {
        task_id -> Bytea,
        tenant_id -> Bytea,
        document_id -> Bytea,
        version_id -> Bytea,
        storage_key -> Text,
        attempt -> Integer,
        enqueued_at -> Timestamptz,
        dead_lettered_at -> Timestamptz,
    }
}
