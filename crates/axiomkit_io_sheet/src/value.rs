//! Cell values, declared value kinds and value transforms.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::RenderError;
use crate::schema::AnyRecord;

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Normalized value handed to a backend cell writer.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing/blank value.
    Empty,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Kind carried by the value itself; `Empty` reports `Any`.
    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::Empty => ValueKind::Any,
            CellValue::Bool(_) => ValueKind::Boolean,
            CellValue::Integer(_) => ValueKind::Integer,
            CellValue::Number(_) => ValueKind::Number,
            CellValue::Text(_) => ValueKind::Text,
            CellValue::Date(_) => ValueKind::Date,
            CellValue::DateTime(_) => ValueKind::DateTime,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Bool(_) => "boolean",
            CellValue::Integer(_) => "integer",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Date(_) => "date",
            CellValue::DateTime(_) => "datetime",
        }
    }

    /// Coerce the value into the representation written for `kind`.
    ///
    /// `Empty` stays empty for every writable kind. `Other` kinds have no
    /// writer at all.
    pub fn coerce_to(&self, kind: ValueKind) -> Result<CellValue, RenderError> {
        if let ValueKind::Other(_) = kind {
            return Err(RenderError::UnsupportedValueType { kind });
        }
        if self.is_empty() {
            return Ok(CellValue::Empty);
        }

        let value = match (kind, self) {
            (ValueKind::Any, _) => Some(self.clone()),
            (ValueKind::Text, CellValue::Text(_)) => Some(self.clone()),
            (ValueKind::Text, _) => Some(CellValue::Text(self.to_string())),
            (ValueKind::Integer, CellValue::Integer(_)) => Some(self.clone()),
            (ValueKind::Integer, CellValue::Number(n))
                if n.is_finite()
                    && n.fract() == 0.0
                    && *n >= i64::MIN as f64
                    && *n < i64::MAX as f64 =>
            {
                Some(CellValue::Integer(*n as i64))
            }
            (ValueKind::Number, CellValue::Number(_)) => Some(self.clone()),
            (ValueKind::Number, CellValue::Integer(i)) => Some(CellValue::Number(*i as f64)),
            (ValueKind::Boolean, CellValue::Bool(_)) => Some(self.clone()),
            (ValueKind::Date, CellValue::Date(_)) => Some(self.clone()),
            (ValueKind::DateTime, CellValue::DateTime(_)) => Some(self.clone()),
            (ValueKind::DateTime, CellValue::Date(d)) => {
                d.and_hms_opt(0, 0, 0).map(CellValue::DateTime)
            }
            _ => None,
        };

        value.ok_or(RenderError::ValueKindMismatch {
            expected: kind,
            found: self.variant_name(),
        })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

macro_rules! impl_cell_value_from {
    ($variant:ident: $($ty:ty),+ => $conv:expr) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    CellValue::$variant($conv(value))
                }
            }
        )+
    };
}

impl_cell_value_from!(Integer: i8, i16, i32, i64, u8, u16, u32 => i64::from);
impl_cell_value_from!(Number: f32, f64 => f64::from);
impl_cell_value_from!(Bool: bool => std::convert::identity);
impl_cell_value_from!(Text: String => std::convert::identity);
impl_cell_value_from!(Date: NaiveDate => std::convert::identity);
impl_cell_value_from!(DateTime: NaiveDateTime => std::convert::identity);

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<&String> for CellValue {
    fn from(value: &String) -> Self {
        CellValue::Text(value.clone())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueKind

/// Declared or written value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Write the value as it comes.
    Any,
    Text,
    Integer,
    Number,
    Boolean,
    Date,
    DateTime,
    /// A declared type without a cell writer.
    Other(&'static str),
}

impl ValueKind {
    /// Whether a slot of kind `self` accepts values declared as `other`.
    pub fn accepts(self, other: ValueKind) -> bool {
        match (self, other) {
            (ValueKind::Any, _) => true,
            (ValueKind::Number, ValueKind::Integer) => true,
            (ValueKind::DateTime, ValueKind::Date) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            ValueKind::Any => "any",
            ValueKind::Text => "text",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::DateTime => "datetime",
            ValueKind::Other(name) => name,
        };
        f.write_str(c_name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldValue

/// Value read from one record field through its accessor.
pub enum FieldValue<'a> {
    /// Single cell value.
    Scalar(CellValue),
    /// Multi-valued leaf; `None` is an absent collection.
    List(Option<Vec<CellValue>>),
    /// One-to-one nested record; `None` is an absent record.
    Record(Option<&'a AnyRecord>),
    /// One-to-many nested records; `None` is an absent collection.
    Records(Option<Vec<&'a AnyRecord>>),
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            FieldValue::List(v) => f.debug_tuple("List").field(v).finish(),
            FieldValue::Record(v) => f
                .debug_tuple("Record")
                .field(&v.map(|_| ".."))
                .finish(),
            FieldValue::Records(v) => f
                .debug_tuple("Records")
                .field(&v.as_ref().map(Vec::len))
                .finish(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueTransform

/// Pluggable value-to-renderable converter.
///
/// Instantiated once per implementing type and shared by every layout that
/// declares it, so implementations hold configuration only.
pub trait ValueTransform: Send + Sync {
    /// Kind the transform reads; must accept the field's declared kind.
    fn input_kind(&self) -> ValueKind;
    /// Kind written after conversion.
    fn output_kind(&self) -> ValueKind;
    /// Convert one non-empty value.
    fn convert(&self, value: &CellValue) -> Result<CellValue, RenderError>;
}

/// Render integers as text cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerToText;

impl ValueTransform for IntegerToText {
    fn input_kind(&self) -> ValueKind {
        ValueKind::Integer
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn convert(&self, value: &CellValue) -> Result<CellValue, RenderError> {
        match value {
            CellValue::Integer(i) => Ok(CellValue::Text(i.to_string())),
            other => Err(RenderError::ValueKindMismatch {
                expected: ValueKind::Integer,
                found: other.variant_name(),
            }),
        }
    }
}

/// Render any value through its display form.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayText;

impl ValueTransform for DisplayText {
    fn input_kind(&self) -> ValueKind {
        ValueKind::Any
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn convert(&self, value: &CellValue) -> Result<CellValue, RenderError> {
        Ok(CellValue::Text(value.to_string()))
    }
}

/// Render booleans as marks.
#[derive(Debug, Clone)]
pub struct BoolToMark {
    pub mark_true: String,
    pub mark_false: String,
}

impl Default for BoolToMark {
    fn default() -> Self {
        Self {
            mark_true: "Y".to_string(),
            mark_false: "N".to_string(),
        }
    }
}

impl ValueTransform for BoolToMark {
    fn input_kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn output_kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn convert(&self, value: &CellValue) -> Result<CellValue, RenderError> {
        match value {
            CellValue::Bool(true) => Ok(CellValue::Text(self.mark_true.clone())),
            CellValue::Bool(false) => Ok(CellValue::Text(self.mark_false.clone())),
            other => Err(RenderError::ValueKindMismatch {
                expected: ValueKind::Boolean,
                found: other.variant_name(),
            }),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
