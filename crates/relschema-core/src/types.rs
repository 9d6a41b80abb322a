//! Closed type unions used by the schema model: column types and default
//! expressions.

use serde::{Deserialize, Serialize};

/// Dialect-neutral column type. Carries the parameters a dialect cares
/// about (size, precision, scale, ...); unrecognized raw type strings fall
/// back to [`ColumnType::Unsupported`] rather than failing inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer {
        /// Storage width in bits, when known (8/16/32/64).
        width: Option<u16>,
        unsigned: bool,
    },
    Float {
        width: Option<u16>,
    },
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },
    String {
        max_length: Option<u32>,
        fixed: bool,
    },
    Binary {
        max_length: Option<u32>,
    },
    Boolean,
    Time {
        with_time_zone: bool,
        precision: Option<u16>,
    },
    Json {
        binary: bool,
    },
    Enum {
        values: Vec<String>,
    },
    Spatial {
        srid: Option<i32>,
    },
    Uuid,
    /// A raw type string the current dialect does not classify. Preserved
    /// verbatim so round-tripping through inspect/diff/plan never loses
    /// information about it.
    Unsupported(String),
}

impl ColumnType {
    /// Returns the raw SQLite-style category this type most closely maps
    /// to, for dialects (like SQLite) with a small set of storage classes.
    pub fn category_name(&self) -> &'static str {
        match self {
            ColumnType::Integer { .. } => "integer",
            ColumnType::Float { .. } => "float",
            ColumnType::Decimal { .. } => "decimal",
            ColumnType::String { .. } => "string",
            ColumnType::Binary { .. } => "binary",
            ColumnType::Boolean => "boolean",
            ColumnType::Time { .. } => "time",
            ColumnType::Json { .. } => "json",
            ColumnType::Enum { .. } => "enum",
            ColumnType::Spatial { .. } => "spatial",
            ColumnType::Uuid => "uuid",
            ColumnType::Unsupported(_) => "unsupported",
        }
    }
}

/// A column default expression. `RawExpr` is uninterpreted dialect SQL;
/// quoting-normalization for comparison is a dialect (`DiffDriver`)
/// responsibility, not something this type attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDefault {
    Literal(LiteralValue),
    RawExpr(String),
}

/// A literal default value, kept as a small closed union so equality is
/// well-defined without string-comparing dialect-specific quoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
    Bytes(Vec<u8>),
}

/// Thin wrapper giving `f64` the `PartialEq` relschema needs for default
/// comparison; NaN is never produced by an inspector so bitwise equality
/// is sufficient here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
