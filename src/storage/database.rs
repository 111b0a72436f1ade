// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Embedded attestation database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `attestations`: uid → serialized EasAttestation (JSON bytes)
//! - `attester_index`: composite key (attester|created_at|uid) → subject
//! - `subject_index`: composite key (subject|created_at|uid) → attester
//! - `schema_index`: composite key (schema|created_at|uid) → uid
//!
//! Composite keys embed the big-endian `created_at` so forward range scans
//! yield ascending creation order, which is the ordering contract of every
//! list query. Address and schema components are lowercased so lookups are
//! case-insensitive.
//!
//! Attestations are insert-only: no update or delete paths exist. A
//! duplicate uid is a conflict detected inside the write transaction, so a
//! race between two writers of the same uid leaves exactly one row.

use std::collections::BTreeSet;
use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::EasAttestation;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: uid → serialized EasAttestation (JSON bytes).
const ATTESTATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("attestations");

/// Index: (attester|created_at_be|uid) → subject (lowercase).
const ATTESTER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("attester_index");

/// Index: (subject|created_at_be|uid) → attester (stored casing).
const SUBJECT_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("subject_index");

/// Index: (schema|created_at_be|uid) → uid.
const SCHEMA_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("schema_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AttestationDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("attestation {0} already exists")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, AttestationDbError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key: `lowercase_component | created_at_be_bytes | uid`.
///
/// Plain big-endian timestamps make forward scans ascend in creation time
/// (oldest first), and the uid suffix makes keys unique and the order total.
fn make_index_key(component: &str, created_at: u64, uid: &str) -> Vec<u8> {
    let comp = component.to_lowercase();
    let mut key = Vec::with_capacity(comp.len() + 1 + 8 + 1 + uid.len());
    key.extend_from_slice(comp.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&created_at.to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(uid.as_bytes());
    key
}

/// Scan start for a component, beginning at `start_at` (inclusive).
fn make_start(component: &str, start_at: u64) -> Vec<u8> {
    let comp = component.to_lowercase();
    let mut key = Vec::with_capacity(comp.len() + 1 + 8);
    key.extend_from_slice(comp.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&start_at.to_be_bytes());
    key
}

/// Upper bound for a component scan (prefix with 0xFF bytes appended).
fn make_prefix_end(component: &str) -> Vec<u8> {
    let comp = component.to_lowercase();
    let mut end = Vec::with_capacity(comp.len() + 1 + 20);
    end.extend_from_slice(comp.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the uid suffix from a composite key, given the component the
/// scan was keyed on. Offset arithmetic, not separator search: the raw
/// timestamp bytes may contain the separator byte.
fn extract_uid(key: &[u8], component: &str) -> Option<String> {
    let offset = component.len() + 1 + 8 + 1;
    if key.len() <= offset {
        return None;
    }
    String::from_utf8(key[offset..].to_vec()).ok()
}

// =============================================================================
// AttestationDatabase
// =============================================================================

/// Embedded ACID attestation database.
pub struct AttestationDatabase {
    db: Database,
}

impl AttestationDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ATTESTATIONS)?;
            let _ = write_txn.open_table(ATTESTER_INDEX)?;
            let _ = write_txn.open_table(SUBJECT_INDEX)?;
            let _ = write_txn.open_table(SCHEMA_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap read probe for health checks.
    pub fn is_healthy(&self) -> bool {
        match self.db.begin_read() {
            Ok(txn) => txn.open_table(ATTESTATIONS).is_ok(),
            Err(_) => false,
        }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert an attestation and its index entries in one transaction.
    ///
    /// Returns `AlreadyExists` if the uid is taken; nothing is written in
    /// that case.
    pub fn insert(&self, att: &EasAttestation) -> DbResult<()> {
        let json = serde_json::to_vec(att)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut primary = write_txn.open_table(ATTESTATIONS)?;
            if primary.get(att.uid.as_str())?.is_some() {
                // Dropping the transaction without commit aborts it.
                return Err(AttestationDbError::AlreadyExists(att.uid.clone()));
            }
            primary.insert(att.uid.as_str(), json.as_slice())?;

            let subject_lower = att.subject.to_lowercase();
            let mut attester_idx = write_txn.open_table(ATTESTER_INDEX)?;
            attester_idx.insert(
                make_index_key(&att.attester, att.created_at, &att.uid).as_slice(),
                subject_lower.as_str(),
            )?;

            let mut subject_idx = write_txn.open_table(SUBJECT_INDEX)?;
            subject_idx.insert(
                make_index_key(&att.subject, att.created_at, &att.uid).as_slice(),
                att.attester.as_str(),
            )?;

            let mut schema_idx = write_txn.open_table(SCHEMA_INDEX)?;
            schema_idx.insert(
                make_index_key(&att.schema, att.created_at, &att.uid).as_slice(),
                att.uid.as_str(),
            )?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Point Lookups
    // =========================================================================

    fn load(&self, uid: &str) -> DbResult<Option<EasAttestation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ATTESTATIONS)?;
        match table.get(uid)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up by (attester, uid). `None` when the uid is absent or owned
    /// by a different attester.
    pub fn get_by_attester(&self, attester: &str, uid: &str) -> DbResult<Option<EasAttestation>> {
        Ok(self
            .load(uid)?
            .filter(|att| att.attester.eq_ignore_ascii_case(attester)))
    }

    /// Look up by (subject, uid).
    pub fn get_by_subject(&self, subject: &str, uid: &str) -> DbResult<Option<EasAttestation>> {
        Ok(self
            .load(uid)?
            .filter(|att| att.subject.eq_ignore_ascii_case(subject)))
    }

    /// Look up by (attester, uid) constrained to the payload's declared
    /// chain id, for the raw-data route.
    pub fn get_raw_by_attester(
        &self,
        attester: &str,
        uid: &str,
        chain: &str,
    ) -> DbResult<Option<EasAttestation>> {
        Ok(self
            .get_by_attester(attester, uid)?
            .filter(|att| att.raw_data.domain.chain_id.to_string() == chain))
    }

    // =========================================================================
    // List Queries
    // =========================================================================

    /// Generic ascending index scan with an optional per-record filter.
    fn scan_index(
        &self,
        table: TableDefinition<&[u8], &str>,
        component: &str,
        start_at: u64,
        max: usize,
        mut keep: impl FnMut(&EasAttestation, &str) -> bool,
    ) -> DbResult<Vec<EasAttestation>> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(table)?;
        let primary = read_txn.open_table(ATTESTATIONS)?;

        let start = make_start(component, start_at);
        let end = make_prefix_end(component);

        let mut results = Vec::new();
        for entry in idx_table.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            let key_bytes = entry.0.value().to_vec();
            let value = entry.1.value().to_string();

            let Some(uid) = extract_uid(&key_bytes, component) else {
                continue;
            };
            if let Some(raw) = primary.get(uid.as_str())? {
                let att: EasAttestation = serde_json::from_slice(raw.value())?;
                if keep(&att, &value) {
                    results.push(att);
                }
            }
            if results.len() >= max {
                break;
            }
        }
        Ok(results)
    }

    /// Attestations issued by `attester`, ascending by creation time.
    pub fn list_by_attester(
        &self,
        attester: &str,
        start_at: u64,
        max: usize,
    ) -> DbResult<Vec<EasAttestation>> {
        self.scan_index(ATTESTER_INDEX, attester, start_at, max, |_, _| true)
    }

    /// Attestations issued to `subject`, ascending by creation time.
    pub fn list_by_subject(
        &self,
        subject: &str,
        start_at: u64,
        max: usize,
    ) -> DbResult<Vec<EasAttestation>> {
        self.scan_index(SUBJECT_INDEX, subject, start_at, max, |_, _| true)
    }

    /// Attestations issued by `attester` to `subject`.
    pub fn list_by_attester_and_subject(
        &self,
        attester: &str,
        subject: &str,
        start_at: u64,
        max: usize,
    ) -> DbResult<Vec<EasAttestation>> {
        let subject_lower = subject.to_lowercase();
        self.scan_index(ATTESTER_INDEX, attester, start_at, max, |_, value| {
            value == subject_lower
        })
    }

    // =========================================================================
    // Decoded-Field Queries
    // =========================================================================

    /// First attestation of `schema` whose decoded `token` equals `token`
    /// (case-insensitive) and whose decoded `id` equals `id` (an empty `id`
    /// matches records without the field).
    pub fn find_by_decoded(
        &self,
        schema: &str,
        token: &str,
        id: &str,
    ) -> DbResult<Option<EasAttestation>> {
        let matches = self.scan_index(SCHEMA_INDEX, schema, 0, 1, |att, _| {
            let token_matches = att
                .decoded
                .get("token")
                .and_then(|v| v.as_str())
                .is_some_and(|v| v.eq_ignore_ascii_case(token));
            let id_matches = match att.decoded.get("id") {
                Some(serde_json::Value::String(v)) => v == id,
                Some(serde_json::Value::Null) | None => id.is_empty(),
                Some(_) => false,
            };
            token_matches && id_matches
        })?;
        Ok(matches.into_iter().next())
    }

    /// Identity attestations of the given type, ascending by creation time.
    pub fn list_id_attestations(
        &self,
        id_schema: &str,
        id_type: &str,
        start_at: u64,
        max: usize,
    ) -> DbResult<Vec<EasAttestation>> {
        self.scan_index(SCHEMA_INDEX, id_schema, start_at, max, |att, _| {
            att.decoded
                .get("idType")
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == id_type)
        })
    }

    /// Count identity attestations grouped by their decoded `idType`.
    pub fn id_type_counts(
        &self,
        id_schema: &str,
    ) -> DbResult<std::collections::BTreeMap<String, u64>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(SCHEMA_INDEX)?;
        let primary = read_txn.open_table(ATTESTATIONS)?;

        let start = make_start(id_schema, 0);
        let end = make_prefix_end(id_schema);

        let mut counts = std::collections::BTreeMap::new();
        for entry in idx_table.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            let uid = entry.1.value().to_string();
            if let Some(raw) = primary.get(uid.as_str())? {
                let att: EasAttestation = serde_json::from_slice(raw.value())?;
                if let Some(id_type) = att.decoded.get("idType").and_then(|v| v.as_str()) {
                    *counts.entry(id_type.to_string()).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    // =========================================================================
    // Issuers
    // =========================================================================

    /// Distinct attesters that issued to `subject`, sorted.
    pub fn distinct_attesters_for(&self, subject: &str) -> DbResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(SUBJECT_INDEX)?;

        let start = make_start(subject, 0);
        let end = make_prefix_end(subject);

        let mut attesters = BTreeSet::new();
        for entry in idx_table.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            attesters.insert(entry.1.value().to_string());
        }
        Ok(attesters.into_iter().collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eas::offchain::{
        AttestMessage, AttestationDomain, EcdsaSignature, OffchainAttestation,
    };
    use std::collections::BTreeMap;

    fn temp_db() -> (AttestationDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AttestationDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn sample(
        uid: &str,
        attester: &str,
        subject: &str,
        schema: &str,
        created_at: u64,
    ) -> EasAttestation {
        let mut decoded = serde_json::Map::new();
        decoded.insert("idType".into(), "email".into());
        decoded.insert("id".into(), "alice@example.org".into());
        EasAttestation {
            uid: uid.to_string(),
            attester: attester.to_string(),
            subject: subject.to_string(),
            schema: schema.to_string(),
            decoded,
            chain_id: "11155111".to_string(),
            raw_data: OffchainAttestation {
                uid: uid.to_string(),
                version: Some(1),
                domain: AttestationDomain {
                    name: "EAS Attestation".into(),
                    version: "1.2.0".into(),
                    chain_id: 11_155_111,
                    verifying_contract: None,
                },
                primary_type: "Attest".into(),
                types: BTreeMap::new(),
                message: AttestMessage {
                    version: 1,
                    schema: schema.to_string(),
                    recipient: subject.to_string(),
                    time: created_at,
                    expiration_time: 0,
                    revocable: true,
                    ref_uid:
                        "0x0000000000000000000000000000000000000000000000000000000000000000"
                            .into(),
                    data: "0x".into(),
                    nonce: Some(0),
                },
                signature: EcdsaSignature {
                    v: 28,
                    r: "0x0000000000000000000000000000000000000000000000000000000000000001"
                        .into(),
                    s: "0x0000000000000000000000000000000000000000000000000000000000000002"
                        .into(),
                },
            },
            created_at,
        }
    }

    #[test]
    fn insert_then_point_lookups() {
        let (db, _dir) = temp_db();
        db.insert(&sample("0xabc", "0x1", "0x2", "0xs", 100)).unwrap();

        let found = db.get_by_attester("0x1", "0xabc").unwrap().unwrap();
        assert_eq!(found.uid, "0xabc");
        assert_eq!(found.created_at, 100);

        // Wrong attester is not-found, not an error.
        assert!(db.get_by_attester("0x9", "0xabc").unwrap().is_none());
        assert!(db.get_by_subject("0x2", "0xabc").unwrap().is_some());
        assert!(db.get_by_subject("0x9", "0xabc").unwrap().is_none());
    }

    #[test]
    fn duplicate_uid_is_a_conflict_and_writes_nothing() {
        let (db, _dir) = temp_db();
        db.insert(&sample("0xabc", "0x1", "0x2", "0xs", 100)).unwrap();

        let err = db
            .insert(&sample("0xabc", "0x3", "0x4", "0xs", 200))
            .unwrap_err();
        assert!(matches!(err, AttestationDbError::AlreadyExists(_)));

        // The original row is untouched and no index rows leaked.
        let found = db.get_by_attester("0x1", "0xabc").unwrap().unwrap();
        assert_eq!(found.created_at, 100);
        assert!(db.list_by_attester("0x3", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn lists_ascend_in_created_at_and_honor_start_at() {
        let (db, _dir) = temp_db();
        db.insert(&sample("0xa", "0x1", "0x2", "0xs", 200)).unwrap();
        db.insert(&sample("0xb", "0x1", "0x2", "0xs", 100)).unwrap();
        db.insert(&sample("0xc", "0x1", "0x3", "0xs", 300)).unwrap();

        let all = db.list_by_attester("0x1", 0, 50).unwrap();
        let times: Vec<u64> = all.iter().map(|a| a.created_at).collect();
        assert_eq!(times, vec![100, 200, 300]);

        // startAt is an inclusive lower bound.
        let after = db.list_by_subject("0x2", 150, 50).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].uid, "0xa");

        let both = db.list_by_attester_and_subject("0x1", "0x2", 0, 50).unwrap();
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|a| a.subject == "0x2"));
    }

    #[test]
    fn list_respects_max_bound() {
        let (db, _dir) = temp_db();
        for i in 0..10u64 {
            db.insert(&sample(&format!("0x{i:02}"), "0x1", "0x2", "0xs", i))
                .unwrap();
        }
        let page = db.list_by_attester("0x1", 0, 3).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].created_at, 0);
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let (db, _dir) = temp_db();
        db.insert(&sample("0xabc", "0xAbCd", "0xDeF0", "0xS", 100))
            .unwrap();

        assert!(db.get_by_attester("0xABCD", "0xabc").unwrap().is_some());
        assert_eq!(db.list_by_subject("0xdef0", 0, 10).unwrap().len(), 1);
        assert_eq!(db.list_by_attester("0xabcd", 0, 10).unwrap().len(), 1);
    }

    #[test]
    fn find_by_decoded_matches_token_and_id() {
        let (db, _dir) = temp_db();
        let mut att = sample("0xoffer", "0x1", "0x2", "0xsell", 100);
        att.decoded = serde_json::Map::new();
        att.decoded.insert(
            "token".into(),
            "0x76568BEd5Acf1A5Cd888773C8cAe9ea2a9131A63".into(),
        );
        att.decoded.insert("id".into(), "42".into());
        db.insert(&att).unwrap();

        let found = db
            .find_by_decoded("0xsell", "0x76568bed5acf1a5cd888773c8cae9ea2a9131a63", "42")
            .unwrap();
        assert!(found.is_some());

        assert!(db.find_by_decoded("0xsell", "0x76568bed5acf1a5cd888773c8cae9ea2a9131a63", "43")
            .unwrap()
            .is_none());
        assert!(db.find_by_decoded("0xother", "0x76568bed5acf1a5cd888773c8cae9ea2a9131a63", "42")
            .unwrap()
            .is_none());
    }

    #[test]
    fn id_listings_filter_by_type_and_count() {
        let (db, _dir) = temp_db();
        let mut email = sample("0xe", "0x1", "0x2", "0xid", 100);
        email.decoded.insert("idType".into(), "email".into());
        db.insert(&email).unwrap();

        let mut discord = sample("0xd", "0x1", "0x3", "0xid", 200);
        discord.decoded.insert("idType".into(), "discord".into());
        db.insert(&discord).unwrap();

        let emails = db.list_id_attestations("0xid", "email", 0, 50).unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].uid, "0xe");

        let counts = db.id_type_counts("0xid").unwrap();
        assert_eq!(counts.get("email"), Some(&1));
        assert_eq!(counts.get("discord"), Some(&1));
    }

    #[test]
    fn distinct_attesters_deduplicates() {
        let (db, _dir) = temp_db();
        db.insert(&sample("0xa", "0x1", "0x2", "0xs", 100)).unwrap();
        db.insert(&sample("0xb", "0x1", "0x2", "0xs", 200)).unwrap();
        db.insert(&sample("0xc", "0x5", "0x2", "0xs", 300)).unwrap();

        let issuers = db.distinct_attesters_for("0x2").unwrap();
        assert_eq!(issuers, vec!["0x1".to_string(), "0x5".to_string()]);
        assert!(db.distinct_attesters_for("0x9").unwrap().is_empty());
    }
}
