//! Static collection/index schema for the local store

use crate::models::Collection;

/// A secondary index over one JSON field of a collection's documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Name used by `get_all_by_index`
    pub name: &'static str,
    /// JSON path of the indexed field
    pub key_path: &'static str,
}

impl IndexDef {
    const fn new(name: &'static str, key_path: &'static str) -> Self {
        Self { name, key_path }
    }
}

pub const BY_OWNER: &str = "by_owner";
pub const BY_SYNCED: &str = "by_synced";
pub const BY_DATE: &str = "by_date";
pub const BY_UPDATED: &str = "by_updated";
pub const BY_COLLECTION: &str = "by_collection";
pub const BY_LOCAL_ID: &str = "by_local_id";
pub const BY_ENQUEUED: &str = "by_enqueued";

const PROGRESS_INDICES: &[IndexDef] = &[
    IndexDef::new(BY_OWNER, "$.ownerId"),
    IndexDef::new(BY_SYNCED, "$.synced"),
    IndexDef::new(BY_UPDATED, "$.updatedAt"),
    IndexDef::new(BY_DATE, "$.date"),
];

const CRAVING_INDICES: &[IndexDef] = &[
    IndexDef::new(BY_OWNER, "$.ownerId"),
    IndexDef::new(BY_SYNCED, "$.synced"),
    IndexDef::new(BY_UPDATED, "$.updatedAt"),
    IndexDef::new(BY_DATE, "$.loggedAt"),
];

const TASK_INDICES: &[IndexDef] = &[
    IndexDef::new(BY_OWNER, "$.ownerId"),
    IndexDef::new(BY_SYNCED, "$.synced"),
    IndexDef::new(BY_UPDATED, "$.updatedAt"),
    IndexDef::new(BY_DATE, "$.dueDate"),
];

const CONSUMPTION_INDICES: &[IndexDef] = &[
    IndexDef::new(BY_OWNER, "$.ownerId"),
    IndexDef::new(BY_SYNCED, "$.synced"),
    IndexDef::new(BY_UPDATED, "$.updatedAt"),
    IndexDef::new(BY_DATE, "$.consumedAt"),
];

const SYNC_QUEUE_INDICES: &[IndexDef] = &[
    IndexDef::new(BY_COLLECTION, "$.collection"),
    IndexDef::new(BY_SYNCED, "$.synced"),
    IndexDef::new(BY_LOCAL_ID, "$.payload.localId"),
    IndexDef::new(BY_ENQUEUED, "$.enqueuedAt"),
];

/// Secondary indices declared for `collection`
pub const fn indices(collection: Collection) -> &'static [IndexDef] {
    match collection {
        Collection::Progress => PROGRESS_INDICES,
        Collection::Cravings => CRAVING_INDICES,
        Collection::Tasks => TASK_INDICES,
        Collection::Consumption => CONSUMPTION_INDICES,
        Collection::SyncQueue => SYNC_QUEUE_INDICES,
    }
}

/// Look up an index by name
pub fn find_index(collection: Collection, name: &str) -> Option<&'static IndexDef> {
    indices(collection).iter().find(|index| index.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_record_collection_has_query_indices() {
        for collection in Collection::RECORDS {
            for name in [BY_OWNER, BY_SYNCED, BY_DATE, BY_UPDATED] {
                assert!(
                    find_index(collection, name).is_some(),
                    "{collection} is missing {name}"
                );
            }
        }
    }

    #[test]
    fn test_sync_queue_indices() {
        assert_eq!(
            find_index(Collection::SyncQueue, BY_LOCAL_ID).map(|index| index.key_path),
            Some("$.payload.localId")
        );
        assert!(find_index(Collection::SyncQueue, BY_OWNER).is_none());
    }
}
