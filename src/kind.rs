// used for persistence
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

// used to print out readable forms of a kind
use std::fmt;

/// The closed set of attribute kinds.
///
/// Every attribute carries exactly one kind for its whole lifetime, and the
/// kind alone decides which accessors are legal on it. Each kind has a stable
/// numeric code and a stable name, both of which end up in the database (the
/// code on every attribute row, the name in the `Kind` dimension table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Text,
    Blob,
    List,
    Map,
}

impl AttrKind {
    pub const ALL: [AttrKind; 11] = [
        AttrKind::Bool,
        AttrKind::Byte,
        AttrKind::Short,
        AttrKind::Int,
        AttrKind::Long,
        AttrKind::Float,
        AttrKind::Double,
        AttrKind::Text,
        AttrKind::Blob,
        AttrKind::List,
        AttrKind::Map,
    ];

    pub fn code(self) -> u8 {
        match self {
            AttrKind::Bool => 1,
            AttrKind::Byte => 2,
            AttrKind::Short => 3,
            AttrKind::Int => 4,
            AttrKind::Long => 5,
            AttrKind::Float => 6,
            AttrKind::Double => 7,
            AttrKind::Text => 8,
            AttrKind::Blob => 9,
            AttrKind::List => 10,
            AttrKind::Map => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AttrKind::Bool => "Bool",
            AttrKind::Byte => "Byte",
            AttrKind::Short => "Short",
            AttrKind::Int => "Int",
            AttrKind::Long => "Long",
            AttrKind::Float => "Float",
            AttrKind::Double => "Double",
            AttrKind::Text => "Text",
            AttrKind::Blob => "Blob",
            AttrKind::List => "List",
            AttrKind::Map => "Map",
        }
    }

    pub fn from_code(code: u8) -> Option<AttrKind> {
        match code {
            1 => Some(AttrKind::Bool),
            2 => Some(AttrKind::Byte),
            3 => Some(AttrKind::Short),
            4 => Some(AttrKind::Int),
            5 => Some(AttrKind::Long),
            6 => Some(AttrKind::Float),
            7 => Some(AttrKind::Double),
            8 => Some(AttrKind::Text),
            9 => Some(AttrKind::Blob),
            10 => Some(AttrKind::List),
            11 => Some(AttrKind::Map),
            _ => None,
        }
    }

    pub fn is_scalar(self) -> bool {
        !self.is_container()
    }

    pub fn is_container(self) -> bool {
        matches!(self, AttrKind::List | AttrKind::Map)
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ToSql for AttrKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code() as i64))
    }
}

impl FromSql for AttrKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        u8::try_from(code)
            .ok()
            .and_then(AttrKind::from_code)
            .ok_or(FromSqlError::OutOfRange(code))
    }
}
