//! Canonical (dialect-neutral) column types.
//!
//! Every column in a [`SchemaAst`](crate::graph::SchemaAst) carries a
//! [`CanonicalType`]. Dialect SQL type strings are parsed into it with
//! [`sql_to_canonical`] and rendered back with [`canonical_to_sql`], so
//! two graphs built from different sources (entity metadata, database
//! introspection) can be compared structurally.
//!
//! ```text
//! "DECIMAL(10, 2)"  →  { category: decimal, precision: 10, scale: 2 }  →  "DECIMAL(10, 2)"
//! "bigint unsigned" →  { category: integer, size: big, unsigned }      →  "BIGINT UNSIGNED"
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::FieldOptions;
use crate::error::{Result, SchemaError};

/// Length assumed for string columns declared without one.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Broad family of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    /// Whole numbers.
    Integer,
    /// Approximate floating point numbers.
    Float,
    /// Exact numbers with precision and scale.
    Decimal,
    /// Character data.
    String,
    /// True/false.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// JSON documents.
    Json,
    /// 128-bit identifiers.
    Uuid,
    /// Binary data.
    Blob,
    /// Fixed-dimension float vectors (embeddings).
    Vector,
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Blob => "blob",
            Self::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// Storage-size variant of a type (`TINYINT`, `SMALLINT`, `BIGINT`, `LONGTEXT`...).
///
/// An absent size means the regular variant of the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSize {
    /// 8-bit integers, `TINYTEXT`, `TINYBLOB`.
    Tiny,
    /// 16-bit integers, `TEXT`.
    Small,
    /// 24-bit integers, `MEDIUMTEXT`, `MEDIUMBLOB`.
    Medium,
    /// 64-bit integers, double precision floats, `LONGTEXT`, `LONGBLOB`.
    Big,
}

/// SQL dialects the type renderer knows how to spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// MySQL.
    Mysql,
    /// MariaDB.
    Mariadb,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Returns the dialect name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Sqlite => "sqlite",
        }
    }

    const fn is_mysql_family(self) -> bool {
        matches!(self, Self::Mysql | Self::Mariadb)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "mariadb" => Ok(Self::Mariadb),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// A dialect-neutral description of a column's data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalType {
    /// Type family.
    pub category: TypeCategory,
    /// Size variant for integers, floats, text and blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<TypeSize>,
    /// Maximum length for strings/binaries, dimension count for vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Total digits for decimals, fractional second digits for temporal types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Digits after the decimal point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// MySQL-style `UNSIGNED` modifier.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    /// `WITH TIME ZONE` for times and timestamps.
    #[serde(default, skip_serializing_if = "is_false")]
    pub with_timezone: bool,
    /// Verbatim type text for types the parser did not recognize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl CanonicalType {
    /// Creates a type of the given category with no modifiers.
    #[must_use]
    pub fn new(category: TypeCategory) -> Self {
        Self {
            category,
            size: None,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            with_timezone: false,
            raw: None,
        }
    }

    /// Regular 32-bit integer.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(TypeCategory::Integer)
    }

    /// 64-bit integer.
    #[must_use]
    pub fn big_integer() -> Self {
        Self::integer().with_size(TypeSize::Big)
    }

    /// Variable-length string with an optional maximum length.
    #[must_use]
    pub fn string(length: Option<u32>) -> Self {
        Self {
            length,
            ..Self::new(TypeCategory::String)
        }
    }

    /// Unbounded text.
    #[must_use]
    pub fn text() -> Self {
        Self::new(TypeCategory::String).with_size(TypeSize::Small)
    }

    /// Exact decimal.
    #[must_use]
    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::new(TypeCategory::Decimal)
        }
    }

    /// Timestamp, optionally with time zone.
    #[must_use]
    pub fn timestamp(with_timezone: bool) -> Self {
        Self {
            with_timezone,
            ..Self::new(TypeCategory::Timestamp)
        }
    }

    /// Float vector with a fixed number of dimensions.
    #[must_use]
    pub fn vector(dimensions: u32) -> Self {
        Self {
            length: Some(dimensions),
            ..Self::new(TypeCategory::Vector)
        }
    }

    /// Sets the size variant.
    #[must_use]
    pub const fn with_size(mut self, size: TypeSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the length.
    #[must_use]
    pub const fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Marks the type as unsigned.
    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Renders the type for the given dialect.
    #[must_use]
    pub fn to_sql(&self, dialect: Dialect) -> String {
        canonical_to_sql(self, dialect)
    }
}

/// Host-language (TypeScript) type an entity field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostType {
    /// `string`
    String,
    /// `number`
    Number,
    /// `bigint`
    BigInt,
    /// `boolean`
    Boolean,
    /// `Date`
    Date,
    /// Plain object.
    Object,
    /// Array.
    Array,
    /// `Buffer` / `Uint8Array`.
    Buffer,
}

/// Default value for a column.
///
/// Deserializes from plain JSON scalars; SQL expressions are written as
/// `{"expression": "now()"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Boolean(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String literal default.
    String(String),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`, or any default read back
    /// from a database).
    Expression {
        /// Expression text.
        expression: String,
    },
}

impl DefaultValue {
    /// Creates an expression default.
    #[must_use]
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression {
            expression: expr.into(),
        }
    }

    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Boolean(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression { expression } => expression.clone(),
        }
    }

    /// Returns a comparison key that folds dialect spellings of the same
    /// default together.
    ///
    /// `now()`, `CURRENT_TIMESTAMP` and friends all become
    /// `CURRENT_TIMESTAMP`; quotes, redundant parentheses and PostgreSQL
    /// `::type` casts are stripped.
    #[must_use]
    pub fn normalized(&self) -> String {
        match self {
            Self::Null => String::from("null"),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => {
                normalize_default_text(&format!("'{}'", s.replace('\'', "''")), false)
            }
            Self::Expression { expression } => normalize_default_text(expression, true),
        }
    }
}

const NOW_TOKEN: &str = "CURRENT_TIMESTAMP";

fn now_regex() -> &'static Regex {
    static NOW: OnceLock<Regex> = OnceLock::new();
    NOW.get_or_init(|| {
        Regex::new(
            r"(?i)^(now|current_timestamp|localtimestamp|getdate|sysdate)\s*(\(\s*\d*\s*\))?$|^datetime\('now'\)$",
        )
        .expect("valid regex")
    })
}

/// Whether the opening paren at the start of `value` closes at its end.
fn is_wrapped_in_parens(value: &str) -> bool {
    if !value.starts_with('(') || !value.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == value.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Folds a default into a comparable form. A quoted literal that spells
/// `now` only folds to the timestamp token when `unquote_now` is set,
/// which is the case for expressions such as `datetime('now')`.
fn normalize_default_text(text: &str, unquote_now: bool) -> String {
    let mut value = text.trim().to_string();

    while is_wrapped_in_parens(&value) {
        value = value[1..value.len() - 1].trim().to_string();
    }

    if now_regex().is_match(&value) {
        return NOW_TOKEN.to_string();
    }

    // 'active'::character varying
    if let Some(pos) = value.rfind("::") {
        if !value[pos..].contains('\'') {
            value = value[..pos].trim().to_string();
        }
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value = value[1..value.len() - 1].replace("''", "'");
    }

    if unquote_now && now_regex().is_match(&value) {
        return NOW_TOKEN.to_string();
    }

    match value.to_ascii_lowercase().as_str() {
        "true" | "false" | "null" => value.to_ascii_lowercase(),
        _ => value,
    }
}

// ================================================================
// SQL text → canonical
// ================================================================

fn type_regex() -> &'static Regex {
    static TYPE: OnceLock<Regex> = OnceLock::new();
    TYPE.get_or_init(|| {
        Regex::new(
            r"^(?P<base>[a-z_][a-z0-9_]*(?: [a-z_][a-z0-9_]*)*?)\s*(?:\((?P<args>[^()]*)\))?(?:\s+(?P<rest>[a-z][a-z ]*))?$",
        )
        .expect("valid regex")
    })
}

fn invalid(input: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidType {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a dialect SQL type string into a [`CanonicalType`].
///
/// Parsing is case-insensitive. Length, precision and scale are read from
/// the parenthesized suffix and an `UNSIGNED` modifier is detected. Types
/// the parser does not know are kept verbatim in [`CanonicalType::raw`]
/// with a best-guess category.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidType`] for empty strings and unbalanced
/// parentheses.
#[allow(clippy::too_many_lines)]
pub fn sql_to_canonical(text: &str) -> Result<CanonicalType> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid(text, "empty type string"));
    }
    if trimmed.matches('(').count() != trimmed.matches(')').count() {
        return Err(invalid(text, "unbalanced parentheses"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    let mut unsigned = false;
    let mut words = Vec::new();
    for word in lowered.split_whitespace() {
        match word {
            "unsigned" => unsigned = true,
            "signed" | "zerofill" => {}
            other => words.push(other),
        }
    }
    let normalized = words.join(" ");

    let Some(caps) = type_regex().captures(&normalized) else {
        return Ok(unrecognized(trimmed, &normalized));
    };

    let base = caps.name("base").map_or("", |m| m.as_str().trim());
    let rest = caps.name("rest").map_or("", |m| m.as_str().trim());
    let name = if rest.is_empty() {
        base.to_string()
    } else {
        format!("{base} {rest}")
    };

    let mut args = Vec::new();
    if let Some(raw_args) = caps.name("args") {
        for arg in raw_args.as_str().split(',') {
            match arg.trim().parse::<u32>() {
                Ok(n) => args.push(n),
                Err(_) => return Ok(unrecognized(trimmed, &normalized)),
            }
        }
    }
    let first = args.first().copied();

    let mut ty = match name.as_str() {
        "tinyint" if first == Some(1) => CanonicalType::new(TypeCategory::Boolean),
        "tinyint" => CanonicalType::integer().with_size(TypeSize::Tiny),
        "smallint" | "int2" | "smallserial" | "serial2" => {
            CanonicalType::integer().with_size(TypeSize::Small)
        }
        "mediumint" => CanonicalType::integer().with_size(TypeSize::Medium),
        "int" | "integer" | "int4" | "serial" | "serial4" => CanonicalType::integer(),
        "bigint" | "int8" | "bigserial" | "serial8" => CanonicalType::big_integer(),
        "real" | "float4" => CanonicalType::new(TypeCategory::Float),
        "float" => match first {
            Some(p) if p > 24 => CanonicalType::new(TypeCategory::Float).with_size(TypeSize::Big),
            _ => CanonicalType::new(TypeCategory::Float),
        },
        "double" | "double precision" | "float8" => {
            CanonicalType::new(TypeCategory::Float).with_size(TypeSize::Big)
        }
        "decimal" | "numeric" | "dec" | "fixed" => CanonicalType {
            precision: first,
            scale: args.get(1).copied(),
            ..CanonicalType::new(TypeCategory::Decimal)
        },
        "varchar" | "character varying" | "nvarchar" | "varchar2" | "char" | "character"
        | "nchar" | "bpchar" => CanonicalType::string(first),
        "tinytext" => CanonicalType::new(TypeCategory::String).with_size(TypeSize::Tiny),
        "text" => CanonicalType::text(),
        "mediumtext" => CanonicalType::new(TypeCategory::String).with_size(TypeSize::Medium),
        "longtext" | "clob" => CanonicalType::new(TypeCategory::String).with_size(TypeSize::Big),
        "boolean" | "bool" => CanonicalType::new(TypeCategory::Boolean),
        "bit" if first.is_none() || first == Some(1) => CanonicalType::new(TypeCategory::Boolean),
        "date" => CanonicalType::new(TypeCategory::Date),
        "time" | "time without time zone" => CanonicalType {
            precision: first,
            ..CanonicalType::new(TypeCategory::Time)
        },
        "timetz" | "time with time zone" => CanonicalType {
            precision: first,
            with_timezone: true,
            ..CanonicalType::new(TypeCategory::Time)
        },
        "timestamp" | "datetime" | "timestamp without time zone" | "datetime2"
        | "smalldatetime" => CanonicalType {
            precision: first,
            ..CanonicalType::timestamp(false)
        },
        "timestamptz" | "timestamp with time zone" | "datetimeoffset" => CanonicalType {
            precision: first,
            ..CanonicalType::timestamp(true)
        },
        "json" | "jsonb" => CanonicalType::new(TypeCategory::Json),
        "uuid" | "uniqueidentifier" => CanonicalType::new(TypeCategory::Uuid),
        "blob" | "bytea" | "binary" | "varbinary" | "image" => CanonicalType {
            length: first,
            ..CanonicalType::new(TypeCategory::Blob)
        },
        "tinyblob" => CanonicalType::new(TypeCategory::Blob).with_size(TypeSize::Tiny),
        "mediumblob" => CanonicalType::new(TypeCategory::Blob).with_size(TypeSize::Medium),
        "longblob" => CanonicalType::new(TypeCategory::Blob).with_size(TypeSize::Big),
        "vector" => CanonicalType {
            length: first,
            ..CanonicalType::new(TypeCategory::Vector)
        },
        _ => return Ok(unrecognized(trimmed, &normalized)),
    };

    ty.unsigned = unsigned;
    Ok(ty)
}

/// Keeps an unknown type verbatim, guessing its category from keywords.
fn unrecognized(original: &str, normalized: &str) -> CanonicalType {
    // Only the type name counts; arguments may be enum labels.
    let base = normalized.split('(').next().unwrap_or(normalized).trim();
    let guess = |needles: &[&str]| needles.iter().any(|n| base.contains(n));
    let category = if matches!(base, "enum" | "set") {
        TypeCategory::String
    } else if guess(&["bool"]) {
        TypeCategory::Boolean
    } else if guess(&["json"]) {
        TypeCategory::Json
    } else if guess(&["timestamp", "datetime"]) {
        TypeCategory::Timestamp
    } else if guess(&["date"]) {
        TypeCategory::Date
    } else if guess(&["time", "interval"]) {
        TypeCategory::Time
    } else if guess(&["geometry", "geography", "point", "polygon"]) {
        TypeCategory::String
    } else if guess(&["int", "serial"]) {
        TypeCategory::Integer
    } else if guess(&["float", "double", "real"]) {
        TypeCategory::Float
    } else if guess(&["dec", "num", "money"]) {
        TypeCategory::Decimal
    } else if guess(&["blob", "binary", "bytea"]) {
        TypeCategory::Blob
    } else if guess(&["uuid", "guid"]) {
        TypeCategory::Uuid
    } else if guess(&["vector"]) {
        TypeCategory::Vector
    } else {
        TypeCategory::String
    };
    CanonicalType {
        raw: Some(original.to_string()),
        ..CanonicalType::new(category)
    }
}

// ================================================================
// canonical → SQL text
// ================================================================

/// Renders a [`CanonicalType`] as SQL for the given dialect.
///
/// Parsing the result with [`sql_to_canonical`] does not always give the
/// type back. MySQL renders `UUID` as `CHAR(36)`, which parses as a string.
/// Zoned timestamps lose their zone outside PostgreSQL, and SQLite stores
/// vectors as `BLOB`. Types carrying [`CanonicalType::raw`] are echoed
/// untranslated.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn canonical_to_sql(ty: &CanonicalType, dialect: Dialect) -> String {
    if let Some(raw) = &ty.raw {
        return raw.clone();
    }

    let mysql = dialect.is_mysql_family();
    let base = match ty.category {
        TypeCategory::Integer => match (dialect, ty.size) {
            (Dialect::Sqlite, _) => "INTEGER".to_string(),
            (_, Some(TypeSize::Tiny)) if mysql => "TINYINT".to_string(),
            (_, Some(TypeSize::Tiny) | Some(TypeSize::Small)) => "SMALLINT".to_string(),
            (_, Some(TypeSize::Medium)) if mysql => "MEDIUMINT".to_string(),
            (_, Some(TypeSize::Big)) => "BIGINT".to_string(),
            _ => "INTEGER".to_string(),
        },
        TypeCategory::Float => match (dialect, ty.size) {
            (Dialect::Sqlite, _) => "REAL".to_string(),
            (Dialect::Postgres, Some(TypeSize::Big)) => "DOUBLE PRECISION".to_string(),
            (_, Some(TypeSize::Big)) => "DOUBLE".to_string(),
            (Dialect::Postgres, _) => "REAL".to_string(),
            _ => "FLOAT".to_string(),
        },
        TypeCategory::Decimal => match (ty.precision, ty.scale) {
            (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
            (Some(p), None) => format!("DECIMAL({p})"),
            _ => "DECIMAL".to_string(),
        },
        TypeCategory::String => match (ty.length, ty.size) {
            (Some(len), _) => format!("VARCHAR({len})"),
            (None, Some(size)) if mysql => match size {
                TypeSize::Tiny => "TINYTEXT".to_string(),
                TypeSize::Small => "TEXT".to_string(),
                TypeSize::Medium => "MEDIUMTEXT".to_string(),
                TypeSize::Big => "LONGTEXT".to_string(),
            },
            (None, Some(_)) => "TEXT".to_string(),
            (None, None) if dialect == Dialect::Sqlite => "TEXT".to_string(),
            (None, None) => format!("VARCHAR({DEFAULT_STRING_LENGTH})"),
        },
        TypeCategory::Boolean => {
            if mysql {
                "TINYINT(1)".to_string()
            } else {
                "BOOLEAN".to_string()
            }
        }
        TypeCategory::Date => "DATE".to_string(),
        TypeCategory::Time => {
            let name = if ty.with_timezone && dialect == Dialect::Postgres {
                "TIMETZ"
            } else {
                "TIME"
            };
            with_fraction(name, ty.precision)
        }
        TypeCategory::Timestamp => {
            let name = match dialect {
                Dialect::Postgres if ty.with_timezone => "TIMESTAMPTZ",
                Dialect::Mysql | Dialect::Mariadb if !ty.with_timezone => "DATETIME",
                _ => "TIMESTAMP",
            };
            with_fraction(name, ty.precision)
        }
        TypeCategory::Json => {
            if dialect == Dialect::Postgres {
                "JSONB".to_string()
            } else {
                "JSON".to_string()
            }
        }
        TypeCategory::Uuid => {
            if mysql {
                "CHAR(36)".to_string()
            } else {
                "UUID".to_string()
            }
        }
        TypeCategory::Blob => match dialect {
            Dialect::Postgres => "BYTEA".to_string(),
            Dialect::Sqlite => "BLOB".to_string(),
            Dialect::Mysql | Dialect::Mariadb => match (ty.length, ty.size) {
                (Some(len), _) => format!("VARBINARY({len})"),
                (None, Some(TypeSize::Tiny)) => "TINYBLOB".to_string(),
                (None, Some(TypeSize::Medium)) => "MEDIUMBLOB".to_string(),
                (None, Some(TypeSize::Big)) => "LONGBLOB".to_string(),
                _ => "BLOB".to_string(),
            },
        },
        TypeCategory::Vector => match (dialect, ty.length) {
            (Dialect::Sqlite, _) => "BLOB".to_string(),
            (_, Some(dims)) => format!("VECTOR({dims})"),
            (_, None) => "VECTOR".to_string(),
        },
    };

    let numeric = matches!(
        ty.category,
        TypeCategory::Integer | TypeCategory::Float | TypeCategory::Decimal
    );
    if ty.unsigned && mysql && numeric {
        format!("{base} UNSIGNED")
    } else {
        base
    }
}

fn with_fraction(name: &str, precision: Option<u32>) -> String {
    match precision {
        Some(p) => format!("{name}({p})"),
        None => name.to_string(),
    }
}

/// Maps a canonical type to the TypeScript type an entity field would use.
#[must_use]
pub fn canonical_to_typescript(ty: &CanonicalType) -> &'static str {
    match ty.category {
        TypeCategory::Integer | TypeCategory::Float | TypeCategory::Decimal => "number",
        TypeCategory::String | TypeCategory::Uuid | TypeCategory::Time => "string",
        TypeCategory::Boolean => "boolean",
        TypeCategory::Date | TypeCategory::Timestamp => "Date",
        TypeCategory::Json => "unknown",
        TypeCategory::Blob => "Buffer",
        TypeCategory::Vector => "number[]",
    }
}

/// Infers a canonical type from an entity field's options.
///
/// An explicit `column_type` hint wins; length/precision/scale options are
/// layered on top of it. Otherwise precision plus scale means decimal, and
/// the host type decides the rest (numbers without precision become wide
/// integers, strings keep an unset length).
///
/// # Errors
///
/// Propagates [`SchemaError::InvalidType`] from a malformed `column_type`.
pub fn field_options_to_canonical(
    options: &FieldOptions,
    host_type: Option<HostType>,
) -> Result<CanonicalType> {
    let mut ty = if let Some(column_type) = &options.column_type {
        sql_to_canonical(column_type)?
    } else if options.precision.is_some() && options.scale.is_some() {
        CanonicalType::new(TypeCategory::Decimal)
    } else {
        match host_type {
            Some(HostType::Number) if options.precision.is_some() => {
                CanonicalType::new(TypeCategory::Decimal)
            }
            Some(HostType::Number | HostType::BigInt) => CanonicalType::big_integer(),
            Some(HostType::Boolean) => CanonicalType::new(TypeCategory::Boolean),
            Some(HostType::Date) => CanonicalType::timestamp(false),
            Some(HostType::Object | HostType::Array) => CanonicalType::new(TypeCategory::Json),
            Some(HostType::Buffer) => CanonicalType::new(TypeCategory::Blob),
            Some(HostType::String) | None => CanonicalType::string(None),
        }
    };

    if ty.raw.is_none() {
        if let Some(length) = options.length {
            ty.length = Some(length);
        }
        if let Some(precision) = options.precision {
            ty.precision = Some(precision);
        }
        if let Some(scale) = options.scale {
            ty.scale = Some(scale);
        }
        if options.unsigned {
            ty.unsigned = true;
        }
    }
    Ok(ty)
}

/// Structural equality of two canonical types.
///
/// Strings compare length (absent counts as 255) and text size, decimals
/// compare precision and scale, temporal types compare the time zone flag,
/// integers and floats compare size, and every category compares the
/// unsigned flag.
#[must_use]
pub fn are_types_equal(a: &CanonicalType, b: &CanonicalType) -> bool {
    if a.category != b.category || a.unsigned != b.unsigned {
        return false;
    }
    match (&a.raw, &b.raw) {
        (Some(x), Some(y)) => return x.eq_ignore_ascii_case(y),
        (None, None) => {}
        _ => return false,
    }
    match a.category {
        TypeCategory::String => {
            a.size == b.size
                && a.length.unwrap_or(DEFAULT_STRING_LENGTH)
                    == b.length.unwrap_or(DEFAULT_STRING_LENGTH)
        }
        TypeCategory::Decimal => a.precision == b.precision && a.scale == b.scale,
        TypeCategory::Timestamp | TypeCategory::Time => a.with_timezone == b.with_timezone,
        TypeCategory::Integer | TypeCategory::Float => a.size == b.size,
        TypeCategory::Vector => a.length == b.length,
        _ => true,
    }
}

/// Ordering used to compare integer/float widths; absent size is the
/// regular variant, which sits between medium and big.
fn size_rank(size: Option<TypeSize>) -> u8 {
    match size {
        Some(TypeSize::Tiny) => 1,
        Some(TypeSize::Small) => 2,
        Some(TypeSize::Medium) => 3,
        None => 4,
        Some(TypeSize::Big) => 5,
    }
}

const fn shrinks(from: Option<u32>, to: Option<u32>) -> bool {
    matches!((from, to), (Some(f), Some(t)) if t < f)
}

/// Returns `true` if changing a column from `from` to `to` can lose data.
///
/// A category change is always breaking. Within a category, a strictly
/// smaller size, length, precision or scale is breaking; growing never is.
#[must_use]
pub fn is_breaking_type_change(from: &CanonicalType, to: &CanonicalType) -> bool {
    if from.category != to.category {
        return true;
    }

    let size_shrinks = match from.category {
        TypeCategory::Integer | TypeCategory::Float => size_rank(to.size) < size_rank(from.size),
        _ => matches!((from.size, to.size), (Some(f), Some(t)) if t < f),
    };

    let length_shrinks = if from.category == TypeCategory::String {
        // Text variants carry a size but no length.
        let from_text = from.size.is_some() && from.length.is_none();
        let to_text = to.size.is_some() && to.length.is_none();
        match (from_text, to_text) {
            (true, false) => true,
            (false, true) | (true, true) => false,
            (false, false) => {
                to.length.unwrap_or(DEFAULT_STRING_LENGTH)
                    < from.length.unwrap_or(DEFAULT_STRING_LENGTH)
            }
        }
    } else {
        shrinks(from.length, to.length)
    };

    size_shrinks
        || length_shrinks
        || shrinks(from.precision, to.precision)
        || shrinks(from.scale, to.scale)
}
