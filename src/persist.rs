// used for persistence
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, params};

use crate::attribute::{AclId, AttrId, AttrValue};
use crate::error::{AttrError, Result};
use crate::kind::AttrKind;
use crate::query::Predicate;

/// One attribute row, with the scalar payload already decoded. Container
/// rows carry no payload of their own; their children live in the entry
/// tables.
#[derive(Debug)]
pub struct AttrRow {
    pub version: i64,
    pub kind: AttrKind,
    pub acl: Option<AclId>,
    pub scalar: Option<AttrValue>,
}

// ------------- Persistence -------------
pub struct Persistor {
    connection: Connection,
}

impl Persistor {
    pub fn new(connection: Connection) -> Result<Persistor> {
        connection.execute_batch(
            "
            pragma foreign_keys = off;
            create table if not exists Kind (
                Kind_Identity integer not null,
                Kind text not null,
                constraint referenceable_Kind_Identity primary key (
                    Kind_Identity
                ),
                constraint unique_Kind unique (
                    Kind
                )
            );
            create table if not exists Attribute (
                Attribute_Identity integer not null,
                Attribute_Version integer not null,
                Kind_Identity integer not null,
                Attribute_Value blob null,
                Acl_Identity integer null,
                constraint Kind_of_Attribute foreign key (
                    Kind_Identity
                ) references Kind(Kind_Identity),
                constraint referenceable_Attribute_Identity primary key (
                    Attribute_Identity
                )
            );
            create table if not exists ListEntry (
                List_Identity integer not null,
                Entry_Index integer not null,
                Attribute_Identity integer not null,
                constraint ListEntry_in_List foreign key (
                    List_Identity
                ) references Attribute(Attribute_Identity),
                constraint ListEntry_holds_Attribute foreign key (
                    Attribute_Identity
                ) references Attribute(Attribute_Identity),
                constraint unique_ListEntry primary key (
                    List_Identity,
                    Entry_Index
                )
            );
            create table if not exists MapEntry (
                Map_Identity integer not null,
                Entry_Key text not null,
                Attribute_Identity integer not null,
                constraint MapEntry_in_Map foreign key (
                    Map_Identity
                ) references Attribute(Attribute_Identity),
                constraint MapEntry_holds_Attribute foreign key (
                    Attribute_Identity
                ) references Attribute(Attribute_Identity),
                constraint unique_MapEntry primary key (
                    Map_Identity,
                    Entry_Key
                )
            );
            create table if not exists GlobalEntry (
                Key_One text not null,
                Key_Two text not null,
                Key_Three text not null,
                Attribute_Identity integer not null,
                constraint GlobalEntry_holds_Attribute foreign key (
                    Attribute_Identity
                ) references Attribute(Attribute_Identity),
                constraint unique_GlobalEntry primary key (
                    Key_One,
                    Key_Two,
                    Key_Three
                )
            );
            ",
        )?;
        let persistor = Persistor { connection };
        // the kind set is closed, so the dimension table is seeded up front
        for kind in AttrKind::ALL {
            persistor.register_kind(kind)?;
        }
        Ok(persistor)
    }

    pub fn in_memory() -> Result<Persistor> {
        Persistor::new(Connection::open_in_memory()?)
    }

    pub fn open(path: &str) -> Result<Persistor> {
        Persistor::new(Connection::open(path)?)
    }

    fn register_kind(&self, kind: AttrKind) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                insert or ignore into Kind (
                    Kind_Identity,
                    Kind
                ) values (?, ?)
            ",
        )?;
        stmt.execute(params![kind, kind.name()])?;
        Ok(())
    }

    /// The highest identity ever persisted, for priming the id generator.
    pub fn max_attribute_identity(&self) -> Result<AttrId> {
        let mut stmt = self
            .connection
            .prepare_cached("select coalesce(max(Attribute_Identity), 0) from Attribute")?;
        Ok(stmt.query_row([], |row| row.get(0))?)
    }

    // ------------- Attribute rows -------------

    pub fn add_attribute(
        &self,
        id: AttrId,
        kind: AttrKind,
        value: &AttrValue,
        acl: Option<AclId>,
    ) -> Result<()> {
        let payload = scalar_payload(value);
        let mut stmt = self.connection.prepare_cached(
            "
                insert into Attribute (
                    Attribute_Identity,
                    Attribute_Version,
                    Kind_Identity,
                    Attribute_Value,
                    Acl_Identity
                ) values (?, 0, ?, ?, ?)
            ",
        )?;
        stmt.execute(params![id, kind, payload, acl])?;
        Ok(())
    }

    pub fn get_attribute(&self, id: AttrId) -> Result<Option<AttrRow>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Attribute_Version,
                       Kind_Identity,
                       Attribute_Value,
                       Acl_Identity
                    from Attribute
                    where Attribute_Identity = ?
            ",
        )?;
        let row = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, AttrKind>(1)?,
                    row.get::<_, SqlValue>(2)?,
                    row.get::<_, Option<AclId>>(3)?,
                ))
            })
            .optional()?;
        match row {
            None => Ok(None),
            Some((version, kind, value, acl)) => {
                let scalar = if kind.is_scalar() {
                    Some(decode_scalar(kind, ValueRef::from(&value))?)
                } else {
                    None
                };
                Ok(Some(AttrRow {
                    version,
                    kind,
                    acl,
                    scalar,
                }))
            }
        }
    }

    /// Guarded by the version counter: returns false when the expected
    /// version is stale and nothing was written.
    pub fn update_scalar(
        &self,
        id: AttrId,
        value: &AttrValue,
        expected_version: i64,
    ) -> Result<bool> {
        let payload = scalar_payload(value);
        let mut stmt = self.connection.prepare_cached(
            "
                update Attribute
                    set Attribute_Value = ?,
                        Attribute_Version = Attribute_Version + 1
                    where Attribute_Identity = ?
                    and Attribute_Version = ?
            ",
        )?;
        Ok(stmt.execute(params![payload, id, expected_version])? == 1)
    }

    pub fn touch_version(&self, id: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                update Attribute
                    set Attribute_Version = Attribute_Version + 1
                    where Attribute_Identity = ?
            ",
        )?;
        stmt.execute(params![id])?;
        Ok(())
    }

    pub fn remove_attribute(&self, id: AttrId) -> Result<bool> {
        let mut stmt = self
            .connection
            .prepare_cached("delete from Attribute where Attribute_Identity = ?")?;
        Ok(stmt.execute(params![id])? == 1)
    }

    // ------------- List entries -------------

    pub fn list_len(&self, list: AttrId) -> Result<usize> {
        let mut stmt = self
            .connection
            .prepare_cached("select count(*) from ListEntry where List_Identity = ?")?;
        let count: i64 = stmt.query_row(params![list], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn list_get(&self, list: AttrId, index: i64) -> Result<Option<AttrId>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Attribute_Identity
                    from ListEntry
                    where List_Identity = ?
                    and Entry_Index = ?
            ",
        )?;
        Ok(stmt
            .query_row(params![list, index], |row| row.get(0))
            .optional()?)
    }

    pub fn list_entries(&self, list: AttrId) -> Result<Vec<(i64, AttrId)>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Entry_Index, Attribute_Identity
                    from ListEntry
                    where List_Identity = ?
                    order by Entry_Index
            ",
        )?;
        let rows = stmt.query_map(params![list], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_list_entry(&self, list: AttrId, index: i64, attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                insert into ListEntry (
                    List_Identity,
                    Entry_Index,
                    Attribute_Identity
                ) values (?, ?, ?)
            ",
        )?;
        stmt.execute(params![list, index, attr])?;
        Ok(())
    }

    /// Moves one entry to a new index. The caller iterates high to low on
    /// insert and low to high on remove, so the target key is always vacant.
    pub fn rekey_list_entry(&self, list: AttrId, from: i64, to: i64) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                update ListEntry
                    set Entry_Index = ?
                    where List_Identity = ?
                    and Entry_Index = ?
            ",
        )?;
        stmt.execute(params![to, list, from])?;
        Ok(())
    }

    pub fn set_list_entry(&self, list: AttrId, index: i64, attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                update ListEntry
                    set Attribute_Identity = ?
                    where List_Identity = ?
                    and Entry_Index = ?
            ",
        )?;
        stmt.execute(params![attr, list, index])?;
        Ok(())
    }

    pub fn remove_list_entry(&self, list: AttrId, index: i64) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "
                delete from ListEntry
                    where List_Identity = ?
                    and Entry_Index = ?
            ",
        )?;
        Ok(stmt.execute(params![list, index])? == 1)
    }

    pub fn clear_list(&self, list: AttrId) -> Result<usize> {
        let mut stmt = self
            .connection
            .prepare_cached("delete from ListEntry where List_Identity = ?")?;
        Ok(stmt.execute(params![list])?)
    }

    // ------------- Map entries -------------

    pub fn map_len(&self, map: AttrId) -> Result<usize> {
        let mut stmt = self
            .connection
            .prepare_cached("select count(*) from MapEntry where Map_Identity = ?")?;
        let count: i64 = stmt.query_row(params![map], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn map_get(&self, map: AttrId, key: &str) -> Result<Option<AttrId>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Attribute_Identity
                    from MapEntry
                    where Map_Identity = ?
                    and Entry_Key = ?
            ",
        )?;
        Ok(stmt
            .query_row(params![map, key], |row| row.get(0))
            .optional()?)
    }

    pub fn map_entries(&self, map: AttrId) -> Result<Vec<(String, AttrId)>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Entry_Key, Attribute_Identity
                    from MapEntry
                    where Map_Identity = ?
            ",
        )?;
        let rows = stmt.query_map(params![map], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_map_entry(&self, map: AttrId, key: &str, attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                insert into MapEntry (
                    Map_Identity,
                    Entry_Key,
                    Attribute_Identity
                ) values (?, ?, ?)
            ",
        )?;
        stmt.execute(params![map, key, attr])?;
        Ok(())
    }

    pub fn set_map_entry(&self, map: AttrId, key: &str, attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                update MapEntry
                    set Attribute_Identity = ?
                    where Map_Identity = ?
                    and Entry_Key = ?
            ",
        )?;
        stmt.execute(params![attr, map, key])?;
        Ok(())
    }

    pub fn remove_map_entry(&self, map: AttrId, key: &str) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "
                delete from MapEntry
                    where Map_Identity = ?
                    and Entry_Key = ?
            ",
        )?;
        Ok(stmt.execute(params![map, key])? == 1)
    }

    pub fn clear_map(&self, map: AttrId) -> Result<usize> {
        let mut stmt = self
            .connection
            .prepare_cached("delete from MapEntry where Map_Identity = ?")?;
        Ok(stmt.execute(params![map])?)
    }

    /// Evaluates a rendered predicate over one map's entries. The expression
    /// is interpolated, the literals are bound as named parameters.
    pub fn find_map_entries(
        &self,
        map: AttrId,
        predicate: &Predicate,
    ) -> Result<Vec<(String, AttrId)>> {
        let sql = format!(
            "
                select Entry_Key, Attribute_Identity
                    from MapEntry
                    where Map_Identity = :map
                    and {}
            ",
            predicate.expression
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let names: Vec<String> = predicate
            .parameters
            .iter()
            .map(|(name, _)| format!(":{name}"))
            .collect();
        let mut bound: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(names.len() + 1);
        bound.push((":map", &map));
        for (position, (_, literal)) in predicate.parameters.iter().enumerate() {
            bound.push((names[position].as_str(), literal));
        }
        let rows = stmt.query_map(&bound[..], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------- Global entries -------------

    pub fn add_global_entry(&self, key: &[String; 3], attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                insert into GlobalEntry (
                    Key_One,
                    Key_Two,
                    Key_Three,
                    Attribute_Identity
                ) values (?, ?, ?, ?)
            ",
        )?;
        match stmt.execute(params![key[0], key[1], key[2], attr]) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AttrError::Duplicate(key.join("/")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_global_entry(&self, key: &[String; 3]) -> Result<Option<AttrId>> {
        let mut stmt = self.connection.prepare_cached(
            "
                select Attribute_Identity
                    from GlobalEntry
                    where Key_One = ?
                    and Key_Two = ?
                    and Key_Three = ?
            ",
        )?;
        Ok(stmt
            .query_row(params![key[0], key[1], key[2]], |row| row.get(0))
            .optional()?)
    }

    pub fn set_global_entry(&self, key: &[String; 3], attr: AttrId) -> Result<()> {
        let mut stmt = self.connection.prepare_cached(
            "
                update GlobalEntry
                    set Attribute_Identity = ?
                    where Key_One = ?
                    and Key_Two = ?
                    and Key_Three = ?
            ",
        )?;
        stmt.execute(params![attr, key[0], key[1], key[2]])?;
        Ok(())
    }

    pub fn remove_global_entry(&self, key: &[String; 3]) -> Result<bool> {
        let mut stmt = self.connection.prepare_cached(
            "
                delete from GlobalEntry
                    where Key_One = ?
                    and Key_Two = ?
                    and Key_Three = ?
            ",
        )?;
        Ok(stmt.execute(params![key[0], key[1], key[2]])? == 1)
    }

    pub fn global_count(&self) -> Result<usize> {
        let mut stmt = self
            .connection
            .prepare_cached("select count(*) from GlobalEntry")?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Maps a scalar onto the single ANY-typed value column. Containers store
/// null; their children live in the entry tables.
fn scalar_payload(value: &AttrValue) -> SqlValue {
    match value {
        AttrValue::Bool(b) => SqlValue::Integer(*b as i64),
        AttrValue::Byte(v) => SqlValue::Integer(*v as i64),
        AttrValue::Short(v) => SqlValue::Integer(*v as i64),
        AttrValue::Int(v) => SqlValue::Integer(*v as i64),
        AttrValue::Long(v) => SqlValue::Integer(*v),
        AttrValue::Float(v) => SqlValue::Real(*v as f64),
        AttrValue::Double(v) => SqlValue::Real(*v),
        AttrValue::Text(s) => SqlValue::Text(s.clone()),
        AttrValue::Blob(b) => SqlValue::Blob(b.clone()),
        AttrValue::List(_) | AttrValue::Map(_) => SqlValue::Null,
    }
}

/// Decodes the value column under the row's declared kind. A payload whose
/// storage class contradicts the declared kind is a conversion failure
/// naming the declared kind, the storage class and the raw value.
fn decode_scalar(kind: AttrKind, value: ValueRef<'_>) -> Result<AttrValue> {
    let mismatch = |value: ValueRef<'_>| AttrError::Conversion {
        requested: kind,
        actual: storage_class(value).to_owned(),
        rendered: describe(value),
    };
    let narrow = |raw: i64| AttrError::Corruption {
        message: format!("value {raw} does not fit a {kind} attribute"),
    };
    Ok(match kind {
        AttrKind::Bool => AttrValue::Bool(value.as_i64().map_err(|_| mismatch(value))? != 0),
        AttrKind::Byte => {
            let raw = value.as_i64().map_err(|_| mismatch(value))?;
            AttrValue::Byte(i8::try_from(raw).map_err(|_| narrow(raw))?)
        }
        AttrKind::Short => {
            let raw = value.as_i64().map_err(|_| mismatch(value))?;
            AttrValue::Short(i16::try_from(raw).map_err(|_| narrow(raw))?)
        }
        AttrKind::Int => {
            let raw = value.as_i64().map_err(|_| mismatch(value))?;
            AttrValue::Int(i32::try_from(raw).map_err(|_| narrow(raw))?)
        }
        AttrKind::Long => AttrValue::Long(value.as_i64().map_err(|_| mismatch(value))?),
        AttrKind::Float => {
            AttrValue::Float(value.as_f64().map_err(|_| mismatch(value))? as f32)
        }
        AttrKind::Double => AttrValue::Double(value.as_f64().map_err(|_| mismatch(value))?),
        AttrKind::Text => {
            AttrValue::Text(value.as_str().map_err(|_| mismatch(value))?.to_owned())
        }
        AttrKind::Blob => {
            AttrValue::Blob(value.as_blob().map_err(|_| mismatch(value))?.to_vec())
        }
        AttrKind::List | AttrKind::Map => {
            return Err(AttrError::Corruption {
                message: format!("{kind} attributes carry no scalar payload"),
            });
        }
    })
}

fn storage_class(value: ValueRef<'_>) -> &'static str {
    match value.data_type() {
        Type::Null => "Null",
        Type::Integer => "Integer",
        Type::Real => "Real",
        Type::Text => "Text",
        Type::Blob => "Blob",
    }
}

fn describe(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "null".to_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("{} bytes", b.len()),
    }
}
