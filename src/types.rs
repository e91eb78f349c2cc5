//! Core types for spark-rx.
//!
//! These types define the foundation that everything builds on:
//! host property values that cross the host boundary, and the identity
//! wrapper that lets stores and projections detect change by reference.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

// =============================================================================
// Value - Host property value
// =============================================================================

/// A dynamically typed host property value.
///
/// Everything read from or written to a host element goes through `Value`.
/// `Null` and `Bool(false)` are "absent" values: hosts typically drop the
/// attribute instead of writing them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean property (`checked`, `disabled`, ...).
    Bool(bool),
    /// Numeric property.
    Number(f64),
    /// Text property (`value`, `class`, text content, ...).
    Text(String),
}

impl Value {
    /// Whether this value means "no attribute".
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
    }

    /// Text form used when a host stores the value as an attribute string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }

    /// Borrow as text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as a number. Text is parsed, so `"8"` reads as `8.0`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Render integral floats without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// PropertyValue - Typed view of a host property
// =============================================================================

/// A type that can travel through a control's value channel.
///
/// Converts to a [`Value`] when written onto a host element, and back when
/// read from one. A failed read-back (`None`) is skipped.
pub trait PropertyValue: Clone + PartialEq + 'static {
    /// Convert for writing onto the host.
    fn to_value(&self) -> Value;

    /// Convert a value read from the host.
    fn from_value(value: &Value) -> Option<Self>;
}

impl PropertyValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl PropertyValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(other.to_text()),
        }
    }
}

impl PropertyValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl PropertyValue for f64 {
    fn to_value(&self) -> Value {
        Value::Number(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

impl PropertyValue for i64 {
    fn to_value(&self) -> Value {
        Value::Number(*self as f64)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number().map(|n| n as i64)
    }
}

// =============================================================================
// Shared - Reference identity wrapper
// =============================================================================

/// Immutable shared value compared by reference.
///
/// Two `Shared` handles are equal only when they point at the same
/// allocation. Stores hold their state as `Shared<S>`, and state shapes keep
/// large sub-values (lists, nested records) as `Shared<T>`, so a field stream
/// re-emits only when the value was genuinely replaced.
///
/// ```ignore
/// let a = Shared::new(vec![1, 2]);
/// let b = a.clone();
/// assert_eq!(a, b);                       // same allocation
/// assert_ne!(a, Shared::new(vec![1, 2])); // equal contents, new value
/// ```
pub struct Shared<T: ?Sized>(Rc<T>);

impl<T> Shared<T> {
    /// Wrap a fresh value.
    pub fn new(value: T) -> Self {
        Shared(Rc::new(value))
    }
}

impl<T: Clone> Shared<T> {
    /// Clone the contents, apply `f`, and wrap the result as a new value.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Self {
        let mut next = (*self.0).clone();
        f(&mut next);
        Shared::new(next)
    }
}

impl<T: ?Sized> Shared<T> {
    /// Whether both handles point at the same allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> AsRef<T> for Shared<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> std::borrow::Borrow<T> for Shared<T> {
    fn borrow(&self) -> &T {
        &self.0
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Shared::new(T::default())
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// =============================================================================
// Tests
// =============================================================================
