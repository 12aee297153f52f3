//! Key repository for the `group_one_time_pre_key_pair` table
//!
//! Write operations go through stored-procedure-like calls with no local
//! parsing or validation; the database owns the semantics.

use async_trait::async_trait;
use sqlx::{mysql::MySqlRow, MySql, MySqlPool, QueryBuilder, Row};

use crate::{models::GroupOneTimeKeyView, models::KeyRecord, Error, Result};

/// A group's keys need replenishing when fewer than this many remain
const REPLENISH_THRESHOLD: i64 = 100;

/// Store collaborator consumed by the message bridge.
///
/// Both operations are atomic from the caller's perspective; callers never
/// retry and report partial success to no one.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Bulk-insert uploaded key records (all-or-nothing)
    async fn insert_keys(&self, records: &[KeyRecord]) -> Result<()>;

    /// Delete keys by a raw comma-separated UUID list. The bus payload is
    /// decoded as UTF-8 on the way in (invalid sequences become U+FFFD);
    /// after that decode the list is handed to the database untouched and
    /// the stored procedure parses it.
    async fn delete_keys_by_uuids(&self, uuids_csv: &str) -> Result<()>;
}

/// Read side of the store, consumed by the HTTP endpoints
#[async_trait]
pub trait KeyReader: Send + Sync {
    /// Keys available for one group message, excluding the caller's own
    async fn get_group_one_time_keys(
        &self,
        group_chat_id: &str,
        user_id: i64,
    ) -> Result<Vec<GroupOneTimeKeyView>>;

    /// Group ids (of those given) whose remaining key count is below the
    /// replenish threshold
    async fn check_if_group_keys_needed(
        &self,
        group_chat_ids: &str,
        user_id: i64,
    ) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct KeyRepository {
    pool: MySqlPool,
}

impl KeyRepository {
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_view(row: &MySqlRow) -> Result<GroupOneTimeKeyView> {
        Ok(GroupOneTimeKeyView {
            user_id: row.try_get("user_id")?,
            group_chat_id: row.try_get("group_id")?,
            one_time_group_public_key: row.try_get("group_one_time_pre_key_pair_pbk")?,
            uuid: row.try_get("group_one_time_pre_key_pair_uuid")?,
        })
    }

    fn insert_query<'a>(records: &'a [KeyRecord]) -> QueryBuilder<'a, MySql> {
        let mut builder: QueryBuilder<'a, MySql> = QueryBuilder::new(
            "INSERT INTO group_one_time_pre_key_pair \
             (user_id, group_id, group_one_time_pre_key_pair_pbk, group_one_time_pre_key_pair_uuid) ",
        );
        builder.push_values(records, |mut b, record| {
            b.push_bind(record.user_id)
                .push_bind(&record.group_id)
                .push_bind(&record.public_key)
                .push_bind(&record.uuid);
        });
        builder
    }
}

#[async_trait]
impl KeyReader for KeyRepository {
    async fn get_group_one_time_keys(
        &self,
        group_chat_id: &str,
        user_id: i64,
    ) -> Result<Vec<GroupOneTimeKeyView>> {
        let rows = sqlx::query("CALL GetGroupOneTimeKeys(?, ?)")
            .bind(group_chat_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            let key = Self::row_to_view(&row)?;
            if key.user_id != user_id {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn check_if_group_keys_needed(
        &self,
        group_chat_ids: &str,
        user_id: i64,
    ) -> Result<Vec<String>> {
        let rows = sqlx::query("CALL CheckIfGroupKeysNeeded(?, ?)")
            .bind(group_chat_ids)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut group_ids = Vec::new();
        for row in rows {
            let group_keys: i64 = row.try_get("group_keys")?;
            if group_keys < REPLENISH_THRESHOLD {
                group_ids.push(row.try_get("group_id")?);
            }
        }
        Ok(group_ids)
    }
}

#[async_trait]
impl KeyStore for KeyRepository {
    async fn insert_keys(&self, records: &[KeyRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        Self::insert_query(records)
            .build()
            .execute(&self.pool)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn delete_keys_by_uuids(&self, uuids_csv: &str) -> Result<()> {
        sqlx::query("CALL DeleteGroupOneTimePublicKeysByUUID(?)")
            .bind(uuids_csv)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uuid: &str) -> KeyRecord {
        KeyRecord {
            user_id: 1,
            group_id: "g1".to_string(),
            public_key: b"AA==".to_vec(),
            uuid: uuid.to_string(),
        }
    }

    #[test]
    fn test_insert_query_binds_four_fields_per_record() {
        let records = vec![record("u1"), record("u2")];
        let sql = KeyRepository::insert_query(&records).into_sql();
        assert!(sql.starts_with("INSERT INTO group_one_time_pre_key_pair"));
        assert!(sql.contains(
            "(user_id, group_id, group_one_time_pre_key_pair_pbk, group_one_time_pre_key_pair_uuid)"
        ));
        // One placeholder group per record, four binds each
        assert_eq!(sql.matches("(?, ?, ?, ?)").count(), 2);
    }
}
