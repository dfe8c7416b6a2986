use std::fmt;
use std::sync::Arc;
use std::borrow::Cow;

use serde::{Serialize, Deserialize};

/// An insertion-ordered mapping: keys iterate in the order they were added.
pub type Dict<K = Arc<str>, V = Value> = indexmap::IndexMap<K, V>;

/// Represents any value a template can see.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Num),
    Float(Float),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn to_null(&self) -> Option<()> {
        match self {
            Value::Null => Some(()),
            _ => None
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn to_num(&self) -> Option<Num> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None
        }
    }

    pub fn into_str(self) -> Result<Arc<str>, Value> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn into_vec(self) -> Result<Arc<Vec<Value>>, Value> {
        match self {
            Value::Array(v) => Ok(v),
            _ => Err(self)
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(&**v),
            _ => None
        }
    }

    pub fn into_dict(self) -> Result<Arc<Dict>, Value> {
        match self {
            Value::Dict(v) => Ok(v),
            _ => Err(self)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }

    /// Truthiness as seen by `{{ if }}` conditions.
    ///
    /// `null`, `false`, `0`, `""`, `"0"` and empty arrays or dictionaries are
    /// falsy. Everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => n.to_i128() != Some(0),
            Value::Float(f) => f.0 != 0.0,
            Value::String(s) => !s.is_empty() && &**s != "0",
            Value::Array(a) => !a.is_empty(),
            Value::Dict(d) => !d.is_empty(),
        }
    }

    /// Numeric view of `self`, parsing strings if needed.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => n.to_i128().map(|n| n as f64),
            Value::Float(f) => Some(f.0),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(*b as u8 as f64),
            _ => None,
        }
    }

    /// Integer view of `self`, parsing strings if needed.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Num(n) => n.to_i128().and_then(|n| n.try_into().ok()),
            Value::Float(f) if f.0.fract() == 0.0 => Some(f.0 as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The string a template emits for `self`.
    ///
    /// ```rust
    /// use antlers::value::Value;
    ///
    /// assert_eq!(Value::Null.render(), "");
    /// assert_eq!(Value::from(true).render(), "true");
    /// assert_eq!(Value::from(vec!["a", "b"]).render(), "ab");
    /// assert_eq!(Value::from(-3i64).render(), "-3");
    /// ```
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::Num(n) => Cow::Owned(n.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::String(s) => Cow::Borrowed(&**s),
            Value::Array(items) => Cow::Owned(items.iter().map(|v| v.render()).collect()),
            Value::Dict(_) => Cow::Borrowed(""),
        }
    }

    /// Looks up one path segment: a dictionary key or an array index.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(dict) => dict.get(key),
            Value::Array(items) => items.get(key.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Looks up a dotted path such as `author.links.0.url`.
    ///
    /// ```rust
    /// use antlers::{dict, value::Value};
    ///
    /// let value = Value::from(dict! {
    ///     "author" => dict! { "links" => vec!["https://a.example"] },
    /// });
    ///
    /// assert_eq!(value.lookup("author.links.0").unwrap().render(), "https://a.example");
    /// assert!(value.lookup("author.name").is_none());
    /// ```
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(self);
        }

        path.split('.').try_fold(self, |value, key| value.get(key))
    }

    /// Sequence view used by loops: arrays as-is, dictionaries as their values.
    pub fn to_sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.to_vec()),
            Value::Dict(dict) => Some(dict.values().cloned().collect()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(std::borrow::Cow<'_, str> => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(Arc<Vec<Value>> => Value::Array);
impl_from_primitive!(Arc<Dict> => Value::Dict);
impl_from_primitive!(f32, f64 => Value::Float);
impl_from_primitive!(u8, u16, u32, u64, u128, usize => Value::Num);
impl_from_primitive!(i8, i16, i32, i64, i128, isize => Value::Num);

impl From<()> for Value  {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl<T> From<Vec<T>> for Value where Value: From<T> {
    fn from(value: Vec<T>) -> Self {
        value.into_iter()
            .map(Value::from)
            .collect()
    }
}

impl<K, V> From<Dict<K, V>> for Value where Arc<str>: From<K>, Value: From<V> {
    fn from(value: Dict<K, V>) -> Self {
        let dict = value.into_iter()
            .map(|(k, v)| (<Arc::<str>>::from(k), Value::from(v)))
            .collect::<Dict>();

        Value::Dict(Arc::new(dict))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let vec = iter.into_iter().collect::<Vec<Value>>();
        Value::Array(Arc::from(vec))
    }
}

/// A signed or unsigned integer value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Num {
    /// An 8-bit unsigned integer.
    U8(u8),
    /// A 16-bit unsigned integer.
    U16(u16),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A 128-bit unsigned integer.
    U128(u128),
    /// An unsigned integer of platform width.
    USize(usize),
    /// An 8-bit signed integer.
    I8(i8),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 128-bit signed integer.
    I128(i128),
    /// A signed integer of platform width.
    ISize(isize),
}

impl Num {
    /// Converts `self` into a `u128` if nonnegative or an `i128` otherwise.
    pub fn to_u128_lossy(self) -> Result<u128, i128> {
        Ok(match self {
            Num::U8(v) => v as u128,
            Num::U16(v) => v as u128,
            Num::U32(v) => v as u128,
            Num::U64(v) => v as u128,
            Num::U128(v) => v,
            Num::USize(v) => v as u128,
            Num::I8(v) if v >= 0 => v as u128,
            Num::I16(v) if v >= 0 => v as u128,
            Num::I32(v) if v >= 0 => v as u128,
            Num::I64(v) if v >= 0 => v as u128,
            Num::I128(v) if v >= 0 => v as u128,
            Num::ISize(v) if v >= 0 => v as u128,
            Num::I8(v) => return Err(v as i128),
            Num::I16(v) => return Err(v as i128),
            Num::I32(v) => return Err(v as i128),
            Num::I64(v) => return Err(v as i128),
            Num::I128(v) => return Err(v),
            Num::ISize(v) => return Err(v as i128),
        })
    }

    /// Converts `self` into an `i128` if it fits.
    pub fn to_i128(self) -> Option<i128> {
        match self.to_u128_lossy() {
            Ok(v) => v.try_into().ok(),
            Err(v) => Some(v),
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128_lossy() {
            Ok(v) => v.fmt(f),
            Err(v) => v.fmt(f),
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_u128_lossy(), other.to_u128_lossy()) {
            (Ok(a), Ok(b)) => a == b,
            (Err(a), Err(b)) => a == b,
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => false,
        }
    }
}

impl Eq for Num { }

impl std::hash::Hash for Num {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self.to_u128_lossy() {
            Ok(v) => v.hash(state),
            Err(v) => v.hash(state),
        }
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    /// ```rust
    /// use antlers::value::Num;
    ///
    /// assert!(Num::from(-1i8) < Num::from(0u8));
    /// assert!(Num::from(-0i8) == Num::from(0u8));
    /// assert!(Num::from(10i32) == Num::from(10u64));
    /// assert!(Num::from(5u32) > Num::from(-1i64));
    /// ```
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.to_u128_lossy(), other.to_u128_lossy()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Greater,
            (Err(_), Ok(_)) => std::cmp::Ordering::Less,
            (Err(a), Err(b)) => a.cmp(&b),
        }
    }
}

macro_rules! impl_from_for_num_value {
    ($($T:ty: $V:ident),* $(,)?) => ($(
        impl From<$T> for Num {
            fn from(value: $T) -> Num {
                Num::$V(value)
            }
        }
    )*)
}

impl_from_for_num_value! {
    u8: U8, u16: U16, u32: U32, u64: U64, u128: U128, usize: USize,
    i8: I8, i16: I16, i32: I32, i64: I64, i128: I128, isize: ISize,
}

/// A float that can live in an `Eq` value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Float(pub f64);

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Float(value)
    }
}

impl From<f32> for Float {
    fn from(value: f32) -> Self {
        Float(value as f64)
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for Float { }

impl std::hash::Hash for Float {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Float {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

macro_rules! impl_try_from_value {
    ($($T:ty),+ => | $v:ident | $e:expr) => {
        $(
            impl TryFrom<$crate::value::Value> for $T {
                type Error = Value;

                fn try_from($v: $crate::value::Value) -> Result<Self, Self::Error> {
                    (|| $e)()
                }
            }
        )+
    };
}

impl_try_from_value!(() => |v| v.to_null().ok_or(v));
impl_try_from_value!(bool => |v| v.to_bool().ok_or(v));
impl_try_from_value!(Arc<str> => |v| v.into_str());
impl_try_from_value!(Arc<Dict> => |v| v.into_dict());
impl_try_from_value!(Num => |v| v.to_num().ok_or(v));

impl_try_from_value!(u8, u16, u32, u64, u128, usize =>
    |v| v.to_num().and_then(|v| v.to_u128_lossy().ok()?.try_into().ok()).ok_or(v));

impl_try_from_value!(i8, i16, i32, i64, i128, isize =>
    |v| v.to_num().and_then(|v| v.to_i128()?.try_into().ok()).ok_or(v));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from(0u8).is_truthy());
        assert!(!Value::from(Vec::<Value>::new()).is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(Value::from(-1i32).is_truthy());
        assert!(Value::from(0.5).is_truthy());
    }

    #[test]
    fn deserializes_mixed_documents() {
        let value: Value = serde_json::from_str(r#"{"a": [1, -2, 2.5, "x", null, true]}"#).unwrap();
        let items = value.lookup("a").and_then(|v| v.as_slice()).unwrap();
        assert_eq!(items[0], Value::from(1u8));
        assert_eq!(items[1], Value::from(-2i64));
        assert_eq!(items[2], Value::from(2.5));
        assert_eq!(items[3], Value::from("x"));
        assert!(items[4].is_null());
        assert_eq!(items[5], Value::from(true));
    }

    #[test]
    fn dict_literals_nest() {
        let nav = vec![crate::dict! { "title" => "A" }, crate::dict! {}];
        let page = crate::dict! { "nav" => nav, "meta" => crate::dict! { "draft" => false } };

        assert_eq!(page.len(), 2);
        assert_eq!(Value::from(page.clone()).lookup("meta.draft"), Some(&Value::from(false)));
        let keys: Vec<_> = page.keys().map(|k| &**k).collect();
        assert_eq!(keys, ["nav", "meta"]);
    }

    #[test]
    fn sequences() {
        let dict = Value::from(crate::dict! { "a" => 1u8, "b" => 2u8 });
        assert_eq!(dict.to_sequence().unwrap(), vec![Value::from(1u8), Value::from(2u8)]);
        assert!(Value::from("x").to_sequence().is_none());
    }
}
