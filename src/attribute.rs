// other keepers use HashMap keyed by string or identity
use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use seahash::SeaHasher;

// used to print out readable forms of an attribute
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::{AttrError, Result};
use crate::kind::AttrKind;

// ------------- Identity -------------
pub type AttrId = i64;

/// An opaque access-control-list reference. Carried on stored attributes and
/// copied by deep duplication, never interpreted by this crate.
pub type AclId = i64;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type KeyHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: AttrId = 0;

#[derive(Debug)]
pub struct IdGenerator {
    lower_bound: AttrId,
    released: Vec<AttrId>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            lower_bound: GENESIS,
            released: Vec::new(),
        }
    }
    // Identities are generated here, but a restored database already holds
    // rows with identities, so the generator must be told about them.
    pub fn retain(&mut self, id: AttrId) {
        if id > self.lower_bound {
            self.lower_bound = id;
        }
    }
    pub fn release(&mut self, id: AttrId) {
        self.released.push(id);
    }
    pub fn generate(&mut self) -> AttrId {
        self.released.pop().unwrap_or_else(|| {
            self.lower_bound += 1;
            self.lower_bound
        })
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Value form -------------
pub type ValueMap = HashMap<String, AttrValue, KeyHasher>;

/// The detached, in-memory form of an attribute.
///
/// A value-form attribute has no identity beyond object identity, is cheap to
/// create and discard, and nests arbitrarily. Its kind is fixed by the variant
/// it was constructed with; accessors of any other kind fail with
/// [`AttrError::Unsupported`] rather than returning a default.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<AttrValue>),
    Map(ValueMap),
}

macro_rules! scalar_accessors {
    ($($getter:ident, $setter:ident, $variant:ident, $ty:ty, $op:literal;)+) => {
        $(
            pub fn $getter(&self) -> Result<$ty> {
                match self {
                    AttrValue::$variant(v) => Ok(*v),
                    _ => Err(self.unsupported($op)),
                }
            }
            pub fn $setter(&mut self, value: $ty) -> Result<()> {
                match self {
                    AttrValue::$variant(v) => {
                        *v = value;
                        Ok(())
                    }
                    _ => Err(self.unsupported(concat!("set_", $op))),
                }
            }
        )+
    };
}

impl AttrValue {
    pub fn list() -> AttrValue {
        AttrValue::List(Vec::new())
    }

    pub fn map() -> AttrValue {
        AttrValue::Map(ValueMap::default())
    }

    /// Wraps any serializable payload as an opaque blob attribute.
    pub fn encode<T: Serialize>(value: &T) -> Result<AttrValue> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| AttrError::Serialization(e.to_string()))?;
        Ok(AttrValue::Blob(bytes))
    }

    /// Recovers a serializable payload from a blob attribute.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self.blob_value()?;
        serde_json::from_slice(bytes).map_err(|e| AttrError::Serialization(e.to_string()))
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Byte(_) => AttrKind::Byte,
            AttrValue::Short(_) => AttrKind::Short,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Long(_) => AttrKind::Long,
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::Double(_) => AttrKind::Double,
            AttrValue::Text(_) => AttrKind::Text,
            AttrValue::Blob(_) => AttrKind::Blob,
            AttrValue::List(_) => AttrKind::List,
            AttrValue::Map(_) => AttrKind::Map,
        }
    }

    fn unsupported(&self, op: &'static str) -> AttrError {
        AttrError::Unsupported {
            kind: self.kind(),
            op,
        }
    }

    scalar_accessors! {
        bool_value, set_bool_value, Bool, bool, "bool_value";
        byte_value, set_byte_value, Byte, i8, "byte_value";
        short_value, set_short_value, Short, i16, "short_value";
        int_value, set_int_value, Int, i32, "int_value";
        long_value, set_long_value, Long, i64, "long_value";
        float_value, set_float_value, Float, f32, "float_value";
        double_value, set_double_value, Double, f64, "double_value";
    }

    pub fn text_value(&self) -> Result<&str> {
        match self {
            AttrValue::Text(s) => Ok(s),
            _ => Err(self.unsupported("text_value")),
        }
    }

    pub fn set_text_value(&mut self, value: String) -> Result<()> {
        match self {
            AttrValue::Text(s) => {
                *s = value;
                Ok(())
            }
            _ => Err(self.unsupported("set_text_value")),
        }
    }

    pub fn blob_value(&self) -> Result<&[u8]> {
        match self {
            AttrValue::Blob(b) => Ok(b),
            _ => Err(self.unsupported("blob_value")),
        }
    }

    pub fn set_blob_value(&mut self, value: Vec<u8>) -> Result<()> {
        match self {
            AttrValue::Blob(b) => {
                *b = value;
                Ok(())
            }
            _ => Err(self.unsupported("set_blob_value")),
        }
    }

    // ------------- List and map accessors -------------

    /// Entry count; legal on lists and maps.
    pub fn len(&self) -> Result<usize> {
        match self {
            AttrValue::List(items) => Ok(items.len()),
            AttrValue::Map(entries) => Ok(entries.len()),
            _ => Err(self.unsupported("len")),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Removes every entry; legal on lists and maps.
    pub fn clear(&mut self) -> Result<()> {
        match self {
            AttrValue::List(items) => {
                items.clear();
                Ok(())
            }
            AttrValue::Map(entries) => {
                entries.clear();
                Ok(())
            }
            _ => Err(self.unsupported("clear")),
        }
    }

    pub fn get(&self, index: usize) -> Result<&AttrValue> {
        match self {
            AttrValue::List(items) => items.get(index).ok_or_else(|| {
                AttrError::InvalidArgument(format!(
                    "index {index} out of range for list of {}",
                    items.len()
                ))
            }),
            _ => Err(self.unsupported("get")),
        }
    }

    pub fn push(&mut self, value: AttrValue) -> Result<()> {
        match self {
            AttrValue::List(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(self.unsupported("push")),
        }
    }

    /// Inserts at `index`, shifting every entry at or after it up by one.
    /// `index` may equal the current length, which appends.
    pub fn insert(&mut self, index: usize, value: AttrValue) -> Result<()> {
        match self {
            AttrValue::List(items) => {
                if index > items.len() {
                    return Err(AttrError::InvalidArgument(format!(
                        "index {index} out of range for insert into list of {}",
                        items.len()
                    )));
                }
                items.insert(index, value);
                Ok(())
            }
            _ => Err(self.unsupported("insert")),
        }
    }

    /// Removes the entry at `index`, shifting every later entry down by one.
    pub fn remove(&mut self, index: usize) -> Result<AttrValue> {
        match self {
            AttrValue::List(items) => {
                if index >= items.len() {
                    return Err(AttrError::InvalidArgument(format!(
                        "index {index} out of range for list of {}",
                        items.len()
                    )));
                }
                Ok(items.remove(index))
            }
            _ => Err(self.unsupported("remove")),
        }
    }

    /// Replaces the entry at an existing `index`, returning the old entry.
    pub fn set(&mut self, index: usize, value: AttrValue) -> Result<AttrValue> {
        match self {
            AttrValue::List(items) => {
                let len = items.len();
                let slot = items.get_mut(index).ok_or_else(|| {
                    AttrError::InvalidArgument(format!(
                        "index {index} out of range for list of {len}"
                    ))
                })?;
                Ok(std::mem::replace(slot, value))
            }
            _ => Err(self.unsupported("set")),
        }
    }

    pub fn iter(&self) -> Result<std::slice::Iter<'_, AttrValue>> {
        match self {
            AttrValue::List(items) => Ok(items.iter()),
            _ => Err(self.unsupported("iter")),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Option<&AttrValue>> {
        match self {
            AttrValue::Map(entries) => Ok(entries.get(key)),
            _ => Err(self.unsupported("lookup")),
        }
    }

    /// Binds `value` at `key`, returning the attribute previously bound there.
    pub fn put(&mut self, key: impl Into<String>, value: AttrValue) -> Result<Option<AttrValue>> {
        match self {
            AttrValue::Map(entries) => Ok(entries.insert(key.into(), value)),
            _ => Err(self.unsupported("put")),
        }
    }

    /// Unbinds `key`; the key must currently be bound.
    pub fn remove_key(&mut self, key: &str) -> Result<AttrValue> {
        match self {
            AttrValue::Map(entries) => entries.remove(key).ok_or_else(|| {
                AttrError::InvalidArgument(format!("key '{key}' is not bound in the map"))
            }),
            _ => Err(self.unsupported("remove_key")),
        }
    }

    pub fn keys(&self) -> Result<Vec<&str>> {
        match self {
            AttrValue::Map(entries) => Ok(entries.keys().map(String::as_str).collect()),
            _ => Err(self.unsupported("keys")),
        }
    }

    pub fn values(&self) -> Result<Vec<&AttrValue>> {
        match self {
            AttrValue::Map(entries) => Ok(entries.values().collect()),
            _ => Err(self.unsupported("values")),
        }
    }

    pub fn entries(&self) -> Result<Vec<(&str, &AttrValue)>> {
        match self {
            AttrValue::Map(entries) => {
                Ok(entries.iter().map(|(k, v)| (k.as_str(), v)).collect())
            }
            _ => Err(self.unsupported("entries")),
        }
    }

    /// Projects the attribute onto plain JSON for generic consumption.
    /// Blobs become byte arrays; non-finite floats become null.
    pub fn raw(&self) -> Json {
        match self {
            AttrValue::Bool(b) => Json::Bool(*b),
            AttrValue::Byte(v) => Json::from(*v as i64),
            AttrValue::Short(v) => Json::from(*v as i64),
            AttrValue::Int(v) => Json::from(*v as i64),
            AttrValue::Long(v) => Json::from(*v),
            AttrValue::Float(v) => serde_json::Number::from_f64(*v as f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            AttrValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            AttrValue::Text(s) => Json::String(s.clone()),
            AttrValue::Blob(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            AttrValue::List(items) => Json::Array(items.iter().map(AttrValue::raw).collect()),
            AttrValue::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.raw()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Byte(v) => write!(f, "{}", v),
            AttrValue::Short(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Long(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Double(v) => write!(f, "{}", v),
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Blob(b) => write!(f, "{} bytes", b.len()),
            AttrValue::List(items) => {
                let mut s = String::new();
                for item in items {
                    s += &(item.to_string() + ",");
                }
                s.pop();
                write!(f, "[{}]", s)
            }
            AttrValue::Map(entries) => {
                let mut s = String::new();
                for (key, value) in entries {
                    s += &format!("{}: {},", key, value);
                }
                s.pop();
                write!(f, "{{{}}}", s)
            }
        }
    }
}

// ------------- Stored form -------------

/// The database-backed form of an attribute: a handle carrying a numeric
/// identity, an optimistic-locking version counter and the optional ACL
/// reference. Two stored attributes are equal iff their identities match.
///
/// Handles are only minted by the store (open/create/load), never directly,
/// so constructing one never performs I/O.
#[derive(Debug, Clone)]
pub struct StoredAttr {
    id: AttrId,
    version: i64,
    kind: AttrKind,
    acl: Option<AclId>,
}

impl StoredAttr {
    pub(crate) fn new(id: AttrId, version: i64, kind: AttrKind, acl: Option<AclId>) -> Self {
        Self {
            id,
            version,
            kind,
            acl,
        }
    }
    pub fn id(&self) -> AttrId {
        self.id
    }
    pub fn version(&self) -> i64 {
        self.version
    }
    pub fn kind(&self) -> AttrKind {
        self.kind
    }
    pub fn acl(&self) -> Option<AclId> {
        self.acl
    }
    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl PartialEq for StoredAttr {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for StoredAttr {}
impl Hash for StoredAttr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl fmt::Display for StoredAttr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::<{}>", self.id, self.kind)
    }
}

// ------------- Entry wrappers -------------

/// The logical key of a list entry: the owning list's identity and the
/// entry's position. Re-keying on insert/remove replaces this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListEntryKey {
    pub list: AttrId,
    pub index: i64,
}

/// The logical key of a map entry: the owning map's identity and the
/// entry's string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapEntryKey {
    pub map: AttrId,
    pub key: String,
}

/// A list entry pairs its structural key with the attribute currently bound
/// there. Equality and hashing go by the key alone.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub key: ListEntryKey,
    pub attr: StoredAttr,
}

impl PartialEq for ListEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for ListEntry {}
impl Hash for ListEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: MapEntryKey,
    pub attr: StoredAttr,
}

impl PartialEq for MapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for MapEntry {}
impl Hash for MapEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

// ------------- Dual form -------------

/// Either form of an attribute, for callers that hold one without caring
/// which. The conversion entry points live on [`crate::store::AttrStore`]:
/// asking for the form an instance already has returns it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(AttrValue),
    Stored(StoredAttr),
}

impl Attribute {
    pub fn kind(&self) -> AttrKind {
        match self {
            Attribute::Value(v) => v.kind(),
            Attribute::Stored(s) => s.kind(),
        }
    }
    pub fn is_stored(&self) -> bool {
        matches!(self, Attribute::Stored(_))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Attribute::Value(v) => write!(f, "{}", v),
            Attribute::Stored(s) => write!(f, "{}", s),
        }
    }
}
