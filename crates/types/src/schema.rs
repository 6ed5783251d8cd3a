//! Tables and table groups.
//!
//! A [`TableGroup`] clusters a root table with its descendants through
//! parent-child [`Join`] edges so that related rows can share storage.
//! A table that is not part of any larger hierarchy is a group of one.

use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    column::Column,
    error::{DuplicateColumnSnafu, DuplicateTableSnafu, EmptyTableSnafu, SchemaError, UnknownTableSnafu},
    types::TableId,
};

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Numeric table id.
    pub id: TableId,
    /// Schema (database) name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Stable identity used by wire schemas.
    pub uuid: Uuid,
    /// Columns in declaration order, internal columns included.
    pub columns: Vec<Column>,
}

#[bon::bon]
impl Table {
    /// Creates a validated table definition.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the table has no columns, if two columns
    /// share a name or identity, or if a column type is invalid.
    #[builder]
    pub fn new(
        id: TableId,
        #[builder(into)] schema: String,
        #[builder(into)] name: String,
        #[builder(default = Uuid::new_v4())] uuid: Uuid,
        columns: Vec<Column>,
    ) -> Result<Self, SchemaError> {
        let table = Self { id, schema, name, uuid, columns };
        table.validate()?;
        Ok(table)
    }
}

impl Table {
    /// Checks the column list.
    ///
    /// # Errors
    ///
    /// See [`Table::new`].
    pub fn validate(&self) -> Result<(), SchemaError> {
        snafu::ensure!(!self.columns.is_empty(), EmptyTableSnafu { table: self.qualified_name() });

        let mut names = HashSet::with_capacity(self.columns.len());
        let mut uuids = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            column.column_type.validate()?;
            if !names.insert(column.name.as_str()) || !uuids.insert(column.uuid) {
                return DuplicateColumnSnafu {
                    table: self.qualified_name(),
                    column: column.name.clone(),
                }
                .fail();
            }
        }
        Ok(())
    }

    /// `schema.name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column with the given identity.
    pub fn position_of(&self, uuid: Uuid) -> Option<usize> {
        self.columns.iter().position(|c| c.uuid == uuid)
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Copy of this table with a new column list, as produced by ALTER TABLE.
    ///
    /// The table keeps its id and identity.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the new column list is invalid.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, SchemaError> {
        let table = Self { columns, ..self.clone() };
        table.validate()?;
        Ok(table)
    }
}

/// A parent-child edge in a table group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Join {
    /// Parent table.
    pub parent: TableId,
    /// Child table.
    pub child: TableId,
}

/// A root table and the descendants clustered with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    name: String,
    root: TableId,
    tables: BTreeMap<TableId, Arc<Table>>,
    joins: Vec<Join>,
}

impl TableGroup {
    /// Creates a group rooted at `root`.
    pub fn new(name: impl Into<String>, root: Arc<Table>) -> Self {
        let root_id = root.id;
        let mut tables = BTreeMap::new();
        tables.insert(root_id, root);
        Self { name: name.into(), root: root_id, tables, joins: Vec::new() }
    }

    /// Group of one table, named after it.
    pub fn single(table: Arc<Table>) -> Self {
        let name = table.qualified_name();
        Self::new(name, table)
    }

    /// Adds `child` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] if `parent` is not in the group
    /// and [`SchemaError::DuplicateTable`] if `child` already is.
    pub fn add_child(&mut self, parent: TableId, child: Arc<Table>) -> Result<(), SchemaError> {
        snafu::ensure!(
            self.tables.contains_key(&parent),
            UnknownTableSnafu { group: self.name.clone(), id: parent }
        );
        snafu::ensure!(
            !self.tables.contains_key(&child.id),
            DuplicateTableSnafu { group: self.name.clone(), id: child.id }
        );
        self.joins.push(Join { parent, child: child.id });
        self.tables.insert(child.id, child);
        Ok(())
    }

    /// Replaces a member's definition, as after ALTER TABLE.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] if the table is not a member.
    pub fn replace_table(&mut self, table: Arc<Table>) -> Result<(), SchemaError> {
        match self.tables.get_mut(&table.id) {
            Some(slot) => {
                *slot = table;
                Ok(())
            },
            None => UnknownTableSnafu { group: self.name.clone(), id: table.id }.fail(),
        }
    }

    /// Removes a table and every join that touches it.
    ///
    /// Descendants of the removed table stay registered but become
    /// unreachable, so they drop out of [`TableGroup::members`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] if the table is not a member or
    /// is the root.
    pub fn remove_table(&mut self, id: TableId) -> Result<Arc<Table>, SchemaError> {
        snafu::ensure!(id != self.root, UnknownTableSnafu { group: self.name.clone(), id });
        let table = self
            .tables
            .remove(&id)
            .ok_or_else(|| SchemaError::UnknownTable { group: self.name.clone(), id })?;
        self.joins.retain(|j| j.parent != id && j.child != id);
        Ok(table)
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root table id.
    pub fn root_id(&self) -> TableId {
        self.root
    }

    /// Root table.
    pub fn root(&self) -> Option<&Arc<Table>> {
        self.tables.get(&self.root)
    }

    /// Join edges.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Registered table by id.
    pub fn table(&self, id: TableId) -> Option<&Arc<Table>> {
        self.tables.get(&id)
    }

    /// Member table by identity. Registered tables that are no longer
    /// reachable from the root are not members.
    pub fn table_by_uuid(&self, uuid: Uuid) -> Option<&Arc<Table>> {
        self.tables.values().find(|t| t.uuid == uuid).filter(|t| self.is_member(t.id))
    }

    /// Member table by id.
    pub fn member(&self, id: TableId) -> Option<&Arc<Table>> {
        self.tables.get(&id).filter(|_| self.is_member(id))
    }

    /// Tables reachable from the root through join edges, root first, in
    /// breadth-first order.
    pub fn members(&self) -> Vec<Arc<Table>> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.root]);
        let mut members = Vec::with_capacity(self.tables.len());

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(table) = self.tables.get(&id) else { continue };
            members.push(Arc::clone(table));
            queue.extend(self.joins.iter().filter(|j| j.parent == id).map(|j| j.child));
        }
        members
    }

    /// Whether `id` is reachable from the root.
    pub fn is_member(&self, id: TableId) -> bool {
        self.members().iter().any(|t| t.id == id)
    }
}
