//! Typed variable values and their wire representation.
//!
//! # Responsibility
//! - Define the closed set of variable types a settings file can hold.
//! - Convert values to and from the attribute text stored in XML.
//! - Bridge Rust primitives onto `Value` through `SettingValue`.
//!
//! # Invariants
//! - `VariableType::tag()` strings are stable and part of the file format.
//! - `Value::parse(kind, value.to_wire())` yields `value` again for every
//!   finite value (NaN compares by bit pattern only, not by `==`).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Closed set of variable types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Boolean,
    String,
    /// 32-bit signed.
    Integer,
    /// 64-bit signed.
    Long,
    Double,
    /// 8-bit signed.
    Byte,
    /// 16-bit signed.
    Short,
    UnsignedByte,
    UnsignedShort,
    UnsignedInteger,
    UnsignedLong,
}

impl VariableType {
    /// Every type in wire order. Grouped files list groups in this order.
    pub const ALL: [VariableType; 11] = [
        VariableType::Boolean,
        VariableType::String,
        VariableType::Integer,
        VariableType::Long,
        VariableType::Double,
        VariableType::Byte,
        VariableType::Short,
        VariableType::UnsignedByte,
        VariableType::UnsignedShort,
        VariableType::UnsignedInteger,
        VariableType::UnsignedLong,
    ];

    /// Stable lowercase tag written to the `type` attribute.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::UnsignedByte => "ubyte",
            Self::UnsignedShort => "ushort",
            Self::UnsignedInteger => "uinteger",
            Self::UnsignedLong => "ulong",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub(crate) fn order(self) -> usize {
        Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Byte(i8),
    Short(i16),
    UnsignedByte(u8),
    UnsignedShort(u16),
    UnsignedInteger(u32),
    UnsignedLong(u64),
}

impl Value {
    pub fn kind(&self) -> VariableType {
        match self {
            Self::Boolean(_) => VariableType::Boolean,
            Self::String(_) => VariableType::String,
            Self::Integer(_) => VariableType::Integer,
            Self::Long(_) => VariableType::Long,
            Self::Double(_) => VariableType::Double,
            Self::Byte(_) => VariableType::Byte,
            Self::Short(_) => VariableType::Short,
            Self::UnsignedByte(_) => VariableType::UnsignedByte,
            Self::UnsignedShort(_) => VariableType::UnsignedShort,
            Self::UnsignedInteger(_) => VariableType::UnsignedInteger,
            Self::UnsignedLong(_) => VariableType::UnsignedLong,
        }
    }

    /// Equality with doubles compared bit for bit, so `NaN` matches itself.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Double(left), Self::Double(right)) => left.to_bits() == right.to_bits(),
            _ => self == other,
        }
    }

    /// Text stored in the XML attribute (unescaped form).
    pub fn to_wire(&self) -> String {
        match self {
            Self::Boolean(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Long(value) => value.to_string(),
            // `{:?}` keeps a trailing `.0` so the text reads as a double.
            Self::Double(value) => format!("{value:?}"),
            Self::Byte(value) => value.to_string(),
            Self::Short(value) => value.to_string(),
            Self::UnsignedByte(value) => value.to_string(),
            Self::UnsignedShort(value) => value.to_string(),
            Self::UnsignedInteger(value) => value.to_string(),
            Self::UnsignedLong(value) => value.to_string(),
        }
    }

    /// Parses wire text as a value of `kind`.
    ///
    /// Numbers and booleans tolerate surrounding whitespace; strings are
    /// kept verbatim.
    pub fn parse(kind: VariableType, text: &str) -> Result<Self, ValueParseError> {
        let fail = || ValueParseError {
            kind,
            text: text.to_string(),
        };
        let trimmed = text.trim();

        let value = match kind {
            VariableType::String => Self::String(text.to_string()),
            VariableType::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Self::Boolean(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Self::Boolean(false)
                } else {
                    return Err(fail());
                }
            }
            VariableType::Integer => Self::Integer(trimmed.parse().map_err(|_| fail())?),
            VariableType::Long => Self::Long(trimmed.parse().map_err(|_| fail())?),
            VariableType::Double => Self::Double(trimmed.parse().map_err(|_| fail())?),
            VariableType::Byte => Self::Byte(trimmed.parse().map_err(|_| fail())?),
            VariableType::Short => Self::Short(trimmed.parse().map_err(|_| fail())?),
            VariableType::UnsignedByte => Self::UnsignedByte(trimmed.parse().map_err(|_| fail())?),
            VariableType::UnsignedShort => {
                Self::UnsignedShort(trimmed.parse().map_err(|_| fail())?)
            }
            VariableType::UnsignedInteger => {
                Self::UnsignedInteger(trimmed.parse().map_err(|_| fail())?)
            }
            VariableType::UnsignedLong => Self::UnsignedLong(trimmed.parse().map_err(|_| fail())?),
        };
        Ok(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Wire text that does not parse as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueParseError {
    pub kind: VariableType,
    pub text: String,
}

impl Display for ValueParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` is not a valid {} value", self.text, self.kind)
    }
}

impl Error for ValueParseError {}

/// Rust types that can be stored as a settings variable.
pub trait SettingValue: Sized {
    const KIND: VariableType;

    fn into_value(self) -> Value;

    /// Returns `None` when `value` holds a different type.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! setting_value {
    ($ty:ty, $variant:ident) => {
        impl SettingValue for $ty {
            const KIND: VariableType = VariableType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

setting_value!(bool, Boolean);
setting_value!(String, String);
setting_value!(i32, Integer);
setting_value!(i64, Long);
setting_value!(f64, Double);
setting_value!(i8, Byte);
setting_value!(i16, Short);
setting_value!(u8, UnsignedByte);
setting_value!(u16, UnsignedShort);
setting_value!(u32, UnsignedInteger);
setting_value!(u64, UnsignedLong);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingValue, Value, VariableType};

    #[test]
    fn tags_are_unique_and_resolve_back() {
        for kind in VariableType::ALL {
            assert_eq!(VariableType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(VariableType::from_tag("float"), None);
    }

    #[test]
    fn boolean_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(
            Value::parse(VariableType::Boolean, " TRUE ").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::parse(VariableType::Boolean, "False").unwrap(),
            Value::Boolean(false)
        );
        assert!(Value::parse(VariableType::Boolean, "1").is_err());
    }

    #[test]
    fn integral_parse_enforces_target_range() {
        assert!(Value::parse(VariableType::Byte, "127").is_ok());
        assert!(Value::parse(VariableType::Byte, "128").is_err());
        assert!(Value::parse(VariableType::UnsignedShort, "-1").is_err());
        assert_eq!(
            Value::parse(VariableType::UnsignedLong, "18446744073709551615").unwrap(),
            Value::UnsignedLong(u64::MAX)
        );
    }

    #[test]
    fn strings_are_kept_verbatim() {
        assert_eq!(
            Value::parse(VariableType::String, "  padded  ").unwrap(),
            Value::String("  padded  ".to_string())
        );
    }

    #[test]
    fn doubles_keep_a_fractional_marker() {
        assert_eq!(Value::Double(3.0).to_wire(), "3.0");
        assert_eq!(
            Value::parse(VariableType::Double, "0.1").unwrap(),
            Value::Double(0.1)
        );
        match Value::parse(VariableType::Double, "NaN").unwrap() {
            Value::Double(value) => assert!(value.is_nan()),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn setting_value_rejects_other_kinds() {
        assert_eq!(i32::from_value(&Value::Integer(4)), Some(4));
        assert_eq!(i32::from_value(&Value::Long(4)), None);
        assert_eq!(<String as SettingValue>::KIND, VariableType::String);
    }

    #[test]
    fn parse_error_mentions_type_and_text() {
        let err = Value::parse(VariableType::Integer, "abc").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("abc"));
        assert!(message.contains("integer"));
    }
}
