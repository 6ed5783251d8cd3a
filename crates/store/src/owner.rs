//! The table or group a storage description belongs to.

use std::sync::Arc;

use tessera_types::{Table, TableGroup, TableId};

/// Object whose rows a storage description packs.
#[derive(Debug, Clone)]
pub enum StorageOwner {
    /// A single table.
    Table(Arc<Table>),
    /// A table group and all its members.
    Group(Arc<TableGroup>),
}

impl StorageOwner {
    /// Id of the table, or of the group's root table.
    pub fn id(&self) -> TableId {
        match self {
            Self::Table(table) => table.id,
            Self::Group(group) => group.root_id(),
        }
    }

    /// Qualified table name, or the group name.
    pub fn name(&self) -> String {
        match self {
            Self::Table(table) => table.qualified_name(),
            Self::Group(group) => group.name().to_string(),
        }
    }

    /// Table with the given id, if the owner stores its rows. Tables
    /// detached from a group's root are not stored by it.
    pub fn table(&self, table_id: TableId) -> Option<&Arc<Table>> {
        match self {
            Self::Table(table) => (table.id == table_id).then_some(table),
            Self::Group(group) => group.member(table_id),
        }
    }

    /// The single table or the group's root table.
    pub fn root(&self) -> Option<&Arc<Table>> {
        match self {
            Self::Table(table) => Some(table),
            Self::Group(group) => group.root(),
        }
    }
}

impl From<Arc<Table>> for StorageOwner {
    fn from(table: Arc<Table>) -> Self {
        Self::Table(table)
    }
}

impl From<Arc<TableGroup>> for StorageOwner {
    fn from(group: Arc<TableGroup>) -> Self {
        Self::Group(group)
    }
}
