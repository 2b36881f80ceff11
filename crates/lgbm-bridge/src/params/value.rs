//! Typed parameter values and their canonical wire text.
//!
//! Every field type that can appear in a parameter record implements
//! [`ParamValue`]. The canonical string is what the native engine receives;
//! it never contains whitespace or `=`.

use std::hash::Hasher;

// =============================================================================
// FieldKind
// =============================================================================

/// Semantic type of a parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int32,
    Int64,
    Double,
    Float,
    String,
    Bool,
    IntArray,
    DoubleArray,
    Enumeration,
}

// =============================================================================
// ParamValue
// =============================================================================

/// A value that can be written to and parsed from the flat wire format.
pub trait ParamValue: Clone + Sized {
    /// Semantic type tag for this value.
    const KIND: FieldKind;

    /// Borrowed view handed out by record getters.
    type View<'a>
    where
        Self: 'a;

    /// Borrow the value for a getter.
    fn view(&self) -> Self::View<'_>;

    /// Canonical wire text.
    fn to_wire(&self) -> String;

    /// Parse canonical wire text. Returns `None` on malformed input.
    fn from_wire(raw: &str) -> Option<Self>;

    /// Structural equality (element-wise for arrays).
    fn same(&self, other: &Self) -> bool;

    /// Feed the value into a combining hash, consistent with [`same`](Self::same).
    fn hash_value(&self, state: &mut dyn Hasher);
}

/// Returns true if `raw` can travel as a single wire value.
///
/// Used as the validator for every string field.
pub fn is_wire_safe(raw: &str) -> bool {
    !raw.chars().any(|c| c.is_whitespace() || c == '=')
}

impl ParamValue for i32 {
    const KIND: FieldKind = FieldKind::Int32;
    type View<'a> = i32;

    fn view(&self) -> i32 {
        *self
    }

    fn to_wire(&self) -> String {
        self.to_string()
    }

    fn from_wire(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_i32(*self);
    }
}

impl ParamValue for i64 {
    const KIND: FieldKind = FieldKind::Int64;
    type View<'a> = i64;

    fn view(&self) -> i64 {
        *self
    }

    fn to_wire(&self) -> String {
        self.to_string()
    }

    fn from_wire(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_i64(*self);
    }
}

/// Bit pattern used for hashing: `-0.0` and `0.0` collapse, all NaNs collapse.
fn canonical_f64_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Shortest round-trip text, with `-0.0` written as `0` so that values
/// which compare equal also encode equal.
fn double_text(v: f64) -> String {
    if v == 0.0 { "0".to_string() } else { v.to_string() }
}

fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl ParamValue for f64 {
    const KIND: FieldKind = FieldKind::Double;
    type View<'a> = f64;

    fn view(&self) -> f64 {
        *self
    }

    fn to_wire(&self) -> String {
        double_text(*self)
    }

    fn from_wire(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn same(&self, other: &Self) -> bool {
        same_f64(*self, *other)
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_u64(canonical_f64_bits(*self));
    }
}

impl ParamValue for f32 {
    const KIND: FieldKind = FieldKind::Float;
    type View<'a> = f32;

    fn view(&self) -> f32 {
        *self
    }

    fn to_wire(&self) -> String {
        if *self == 0.0 { "0".to_string() } else { self.to_string() }
    }

    fn from_wire(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    fn same(&self, other: &Self) -> bool {
        same_f64(f64::from(*self), f64::from(*other))
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_u64(canonical_f64_bits(f64::from(*self)));
    }
}

impl ParamValue for bool {
    const KIND: FieldKind = FieldKind::Bool;
    type View<'a> = bool;

    fn view(&self) -> bool {
        *self
    }

    fn to_wire(&self) -> String {
        if *self { "true".into() } else { "false".into() }
    }

    fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_u8(u8::from(*self));
    }
}

impl ParamValue for String {
    const KIND: FieldKind = FieldKind::String;
    type View<'a> = &'a str;

    fn view(&self) -> &str {
        self
    }

    fn to_wire(&self) -> String {
        self.clone()
    }

    fn from_wire(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write(self.as_bytes());
        state.write_u8(0xff);
    }
}

fn join_elements<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_elements<T: std::str::FromStr>(raw: &str) -> Option<Vec<T>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Vec::new());
    }
    raw.split(',').map(|s| s.trim().parse().ok()).collect()
}

impl ParamValue for Vec<i32> {
    const KIND: FieldKind = FieldKind::IntArray;
    type View<'a> = &'a [i32];

    fn view(&self) -> &[i32] {
        self
    }

    fn to_wire(&self) -> String {
        join_elements(self)
    }

    fn from_wire(raw: &str) -> Option<Self> {
        split_elements(raw)
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_usize(self.len());
        for v in self {
            state.write_i32(*v);
        }
    }
}

impl ParamValue for Vec<f64> {
    const KIND: FieldKind = FieldKind::DoubleArray;
    type View<'a> = &'a [f64];

    fn view(&self) -> &[f64] {
        self
    }

    fn to_wire(&self) -> String {
        self.iter().map(|v| double_text(*v)).collect::<Vec<_>>().join(",")
    }

    fn from_wire(raw: &str) -> Option<Self> {
        split_elements(raw)
    }

    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| same_f64(*a, *b))
    }

    fn hash_value(&self, state: &mut dyn Hasher) {
        state.write_usize(self.len());
        for v in self {
            state.write_u64(canonical_f64_bits(*v));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_use_shortest_round_trip_text() {
        for v in [0.1, 1.0, -2.5, 1e-7, 123456.789, 1e20, f64::MIN_POSITIVE] {
            let wire = v.to_wire();
            assert_eq!(f64::from_wire(&wire), Some(v), "wire text {wire}");
        }
        assert_eq!(1.0f64.to_wire(), "1");
        assert_eq!(0.05f64.to_wire(), "0.05");
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert!(ParamValue::same(&-0.0f64, &0.0f64));
        assert_eq!(canonical_f64_bits(-0.0), canonical_f64_bits(0.0));
    }

    #[test]
    fn negative_zero_encodes_as_zero() {
        assert_eq!((-0.0f64).to_wire(), "0");
        assert_eq!((-0.0f32).to_wire(), "0");
        assert_eq!(vec![-0.0f64, 1.5].to_wire(), "0,1.5");
        assert_eq!(f64::from_wire(&(-0.0f64).to_wire()), Some(0.0));
    }

    #[test]
    fn bools_are_words() {
        assert_eq!(true.to_wire(), "true");
        assert_eq!(false.to_wire(), "false");
        assert_eq!(bool::from_wire("1"), Some(true));
        assert_eq!(bool::from_wire("yes"), None);
    }

    #[test]
    fn arrays_are_comma_joined() {
        let v = vec![1, -1, 0];
        assert_eq!(v.to_wire(), "1,-1,0");
        assert_eq!(Vec::<i32>::from_wire("1,-1,0"), Some(v));
        assert_eq!(Vec::<i32>::from_wire(""), Some(vec![]));
        assert_eq!(Vec::<i32>::from_wire("1,x"), None);

        let d = vec![0.5, 2.0];
        assert_eq!(d.to_wire(), "0.5,2");
        assert_eq!(Vec::<f64>::from_wire("0.5,2"), Some(d));
    }

    #[test]
    fn wire_safety() {
        assert!(is_wire_safe("model.txt"));
        assert!(is_wire_safe(""));
        assert!(!is_wire_safe("my model.txt"));
        assert!(!is_wire_safe("a=b"));
        assert!(!is_wire_safe("tab\there"));
    }
}
