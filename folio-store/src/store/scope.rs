//! Transaction scopes handed to store callbacks

use std::cell::RefCell;
use std::collections::BTreeSet;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use super::{Record, StorageError, StorageResult, TableName};

/// Read access to one consistent snapshot
///
/// Records which tables were read so reactive queries can track their
/// dependencies without declaring them.
pub struct ReadScope {
    txn: ReadTransaction,
    version: u64,
    touched: RefCell<BTreeSet<TableName>>,
}

impl ReadScope {
    pub(super) fn new(txn: ReadTransaction, version: u64) -> Self {
        Self {
            txn,
            version,
            touched: RefCell::new(BTreeSet::new()),
        }
    }

    pub(super) fn into_touched(self) -> BTreeSet<TableName> {
        self.touched.into_inner()
    }

    /// Commit version this snapshot observes
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get<R: Record>(&self, key: &str) -> StorageResult<Option<R>> {
        self.touched.borrow_mut().insert(R::TABLE);
        let table = self.txn.open_table(R::TABLE.definition())?;
        let record = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(record)
    }

    pub fn scan_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        self.touched.borrow_mut().insert(R::TABLE);
        let table = self.txn.open_table(R::TABLE.definition())?;
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}

/// Write access inside [`Storage::transaction`](super::Storage::transaction)
pub struct WriteScope<'a> {
    txn: &'a WriteTransaction,
    declared: &'a [TableName],
    touched: BTreeSet<TableName>,
}

impl<'a> WriteScope<'a> {
    pub(super) fn new(txn: &'a WriteTransaction, declared: &'a [TableName]) -> Self {
        Self {
            txn,
            declared,
            touched: BTreeSet::new(),
        }
    }

    pub(super) fn into_touched(self) -> BTreeSet<TableName> {
        self.touched
    }

    fn check(&self, table: TableName) -> StorageResult<()> {
        if self.declared.contains(&table) {
            Ok(())
        } else {
            Err(StorageError::UndeclaredTable(table))
        }
    }

    /// Read through the transaction (sees this transaction's own writes)
    pub fn get<R: Record>(&self, key: &str) -> StorageResult<Option<R>> {
        self.check(R::TABLE)?;
        let table = self.txn.open_table(R::TABLE.definition())?;
        let record = match table.get(key)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(record)
    }

    pub fn contains<R: Record>(&self, key: &str) -> StorageResult<bool> {
        self.check(R::TABLE)?;
        let table = self.txn.open_table(R::TABLE.definition())?;
        let exists = table.get(key)?.is_some();
        Ok(exists)
    }

    pub fn scan_all<R: Record>(&self) -> StorageResult<Vec<R>> {
        self.check(R::TABLE)?;
        let table = self.txn.open_table(R::TABLE.definition())?;
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Upsert
    pub fn put<R: Record>(&mut self, record: &R) -> StorageResult<()> {
        self.check(R::TABLE)?;
        let bytes = serde_json::to_vec(record)?;
        let mut table = self.txn.open_table(R::TABLE.definition())?;
        table.insert(record.key(), bytes.as_slice())?;
        self.touched.insert(R::TABLE);
        Ok(())
    }

    /// Returns whether the record existed
    pub fn delete<R: Record>(&mut self, key: &str) -> StorageResult<bool> {
        self.check(R::TABLE)?;
        let mut table = self.txn.open_table(R::TABLE.definition())?;
        let existed = table.remove(key)?.is_some();
        if existed {
            self.touched.insert(R::TABLE);
        }
        Ok(existed)
    }

    /// Remove every record of a table; returns how many were removed
    pub fn clear(&mut self, name: TableName) -> StorageResult<usize> {
        self.check(name)?;
        let mut table = self.txn.open_table(name.definition())?;
        let mut keys: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            keys.push(key.value().to_string());
        }
        for key in &keys {
            table.remove(key.as_str())?;
        }
        self.touched.insert(name);
        Ok(keys.len())
    }
}
