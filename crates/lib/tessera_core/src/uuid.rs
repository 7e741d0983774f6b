// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// PostgreSQL does not natively support UUIDv7 for auto-generation.
// Refresh-token rows are time-ordered (issuance order matters when
// auditing rotation chains), so their ids are generated app-side.
// Tables where time-ordering is irrelevant (users) continue to use
// PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
