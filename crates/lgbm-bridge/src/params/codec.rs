//! Parameter codec: typed records to and from flat string maps.
//!
//! Each record type carries a field-descriptor table generated by
//! [`param_record!`]. The [`ParamCodec`] for a type is built once from that
//! table (wire names, writers, parsers, canonical default strings) and cached
//! for the life of the process.

use std::fmt;
use std::hash::Hash;

use super::value::FieldKind;
use super::{ParamError, ParamMap};

// =============================================================================
// Wire names
// =============================================================================

/// Derive the wire name of a field from its declared name.
///
/// Inserts `_` at lower-to-upper case boundaries and lower-cases the result,
/// so `MinDataInLeaf` and `min_data_in_leaf` both map to `min_data_in_leaf`.
pub fn wire_name(declared: &str) -> String {
    let mut out = String::with_capacity(declared.len() + 4);
    let mut prev: Option<char> = None;
    for c in declared.chars() {
        if c.is_ascii_uppercase() {
            if let Some(p) = prev
                && (p.is_ascii_lowercase() || p.is_ascii_digit())
            {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

// =============================================================================
// FieldSpec
// =============================================================================

/// Writer: typed field value to canonical wire text.
pub type FieldWriter<R> = fn(&R) -> String;

/// Parser + validated assignment of one field from raw wire text.
pub type FieldReader<R> = fn(&mut R, &str) -> Result<(), ParamError>;

/// Descriptor for one field of a parameter record.
pub struct FieldSpec<R> {
    declared: &'static str,
    kind: FieldKind,
    write: FieldWriter<R>,
    read: FieldReader<R>,
}

impl<R> FieldSpec<R> {
    pub fn new(
        declared: &'static str,
        kind: FieldKind,
        write: FieldWriter<R>,
        read: FieldReader<R>,
    ) -> Self {
        Self { declared, kind, write, read }
    }

    /// Name as declared on the record.
    pub fn declared(&self) -> &'static str {
        self.declared
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

impl<R> fmt::Debug for FieldSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("declared", &self.declared)
            .field("kind", &self.kind)
            .finish()
    }
}

// =============================================================================
// ParamRecord
// =============================================================================

/// A configuration record with a field-descriptor table.
///
/// Implemented by [`param_record!`]; the codec is built lazily on first use.
pub trait ParamRecord: Default + Clone + PartialEq + Eq + Hash + fmt::Debug + 'static {
    /// Human-readable record name used in diagnostics.
    const NAME: &'static str;

    /// The field-descriptor table, in declaration order.
    fn field_specs() -> Vec<FieldSpec<Self>>;

    /// The cached codec for this record type.
    fn codec() -> &'static ParamCodec<Self>;

    /// Encode non-default fields into a fresh map.
    fn encode(&self) -> ParamMap {
        Self::codec().encode(self)
    }

    /// Decode this record's keys out of `map`, removing the keys consumed.
    fn decode(map: &mut ParamMap) -> Result<Self, ParamError> {
        Self::codec().decode(map)
    }
}

// =============================================================================
// ParamCodec
// =============================================================================

struct CodecField<R> {
    wire: String,
    default_text: String,
    spec: FieldSpec<R>,
}

/// Bidirectional codec for one record type.
pub struct ParamCodec<R> {
    fields: Vec<CodecField<R>>,
}

impl<R: ParamRecord> ParamCodec<R> {
    /// Build the codec from the record's descriptor table.
    pub fn build() -> Self {
        let defaults = R::default();
        let fields: Vec<CodecField<R>> = R::field_specs()
            .into_iter()
            .map(|spec| CodecField {
                wire: wire_name(spec.declared),
                default_text: (spec.write)(&defaults),
                spec,
            })
            .collect();

        debug_assert!(
            {
                let mut names: Vec<&str> = fields.iter().map(|f| f.wire.as_str()).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate wire name in {}",
            R::NAME
        );

        Self { fields }
    }

    /// Wire names in declaration order.
    pub fn wire_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.wire.as_str())
    }

    /// Canonical default text for a wire name.
    pub fn default_text(&self, wire: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.wire == wire)
            .map(|f| f.default_text.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode every field whose canonical text differs from its default.
    pub fn encode(&self, record: &R) -> ParamMap {
        let mut map = ParamMap::new();
        self.encode_into(record, &mut map);
        map
    }

    /// Like [`encode`](Self::encode), but merges into an existing map.
    pub fn encode_into(&self, record: &R, map: &mut ParamMap) {
        for field in &self.fields {
            let text = (field.spec.write)(record);
            if text != field.default_text {
                map.insert(field.wire.clone(), text);
            }
        }
    }

    /// Decode a record, claiming and removing its keys from `map`.
    ///
    /// Keys that do not belong to this record are left untouched.
    pub fn decode(&self, map: &mut ParamMap) -> Result<R, ParamError> {
        let mut record = R::default();
        for field in &self.fields {
            if let Some(raw) = map.remove(&field.wire) {
                (field.spec.read)(&mut record, &raw)?;
            }
        }
        Ok(record)
    }
}

impl<R> fmt::Debug for ParamCodec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|c| (&c.wire, &c.default_text)))
            .finish()
    }
}

// =============================================================================
// param_record!
// =============================================================================

/// Declare a parameter record and its field-descriptor table.
///
/// Each field is declared as
/// `name / setter: Type = default [, check |v| predicate => "reason"];`.
/// The macro generates private fields, getters returning
/// [`ParamValue::View`](super::value::ParamValue::View), validating setters,
/// `Default`, structural `PartialEq`/`Eq`/`Hash`, and the [`ParamRecord`]
/// implementation.
macro_rules! param_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $label:literal {
            $(
                $(#[$fmeta:meta])*
                $field:ident / $setter:ident : $ty:ty = $default:expr
                    $(, check $check:expr => $reason:literal)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            $($field: $ty,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl $name {
            $(
                $(#[$fmeta])*
                pub fn $field(&self) -> <$ty as $crate::params::ParamValue>::View<'_> {
                    $crate::params::ParamValue::view(&self.$field)
                }

                #[doc = concat!("Set `", stringify!($field), "`, validating the new value.")]
                pub fn $setter(&mut self, value: $ty) -> Result<&mut Self, $crate::params::ParamError> {
                    $(
                        let check: fn(&$ty) -> bool = $check;
                        if !check(&value) {
                            return Err($crate::params::ParamError::Validation {
                                field: stringify!($field),
                                value: $crate::params::ParamValue::to_wire(&value),
                                reason: $reason,
                            });
                        }
                    )?
                    self.$field = value;
                    Ok(self)
                }
            )*
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                true $(&& $crate::params::ParamValue::same(&self.$field, &other.$field))*
            }
        }

        impl Eq for $name {}

        impl ::std::hash::Hash for $name {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                $($crate::params::ParamValue::hash_value(&self.$field, state);)*
            }
        }

        impl $crate::params::ParamRecord for $name {
            const NAME: &'static str = $label;

            fn field_specs() -> Vec<$crate::params::FieldSpec<Self>> {
                vec![
                    $(
                        $crate::params::FieldSpec::new(
                            stringify!($field),
                            <$ty as $crate::params::ParamValue>::KIND,
                            |record: &Self| $crate::params::ParamValue::to_wire(&record.$field),
                            |record: &mut Self, raw: &str| {
                                let value = <$ty as $crate::params::ParamValue>::from_wire(raw)
                                    .ok_or_else(|| $crate::params::ParamError::Decode {
                                        key: $crate::params::wire_name(stringify!($field)),
                                        raw: raw.to_string(),
                                    })?;
                                record.$setter(value).map(|_| ())
                            },
                        ),
                    )*
                ]
            }

            fn codec() -> &'static $crate::params::ParamCodec<Self> {
                static CODEC: ::std::sync::OnceLock<$crate::params::ParamCodec<$name>> =
                    ::std::sync::OnceLock::new();
                CODEC.get_or_init($crate::params::ParamCodec::build)
            }
        }
    };
}

pub(crate) use param_record;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    param_record! {
        /// Small record used to exercise the codec in isolation.
        pub struct Toy as "toy" {
            /// A bounded count.
            count / set_count: i32 = 3, check |v| *v >= 0 => "must be >= 0";
            ratio / set_ratio: f64 = 0.5, check |v| *v > 0.0 && *v <= 1.0 => "must be in (0, 1]";
            tags / set_tags: Vec<i32> = Vec::new();
            enabled / set_enabled: bool = false;
        }
    }

    #[test]
    fn wire_names_split_case_boundaries() {
        assert_eq!(wire_name("MinDataInLeaf"), "min_data_in_leaf");
        assert_eq!(wire_name("min_data_in_leaf"), "min_data_in_leaf");
        assert_eq!(wire_name("LambdaL1"), "lambda_l1");
        assert_eq!(wire_name("GpuUseDP"), "gpu_use_dp");
        assert_eq!(wire_name("Seed"), "seed");
    }

    #[test]
    fn encode_elides_defaults() {
        assert!(Toy::default().encode().is_empty());

        let mut toy = Toy::default();
        toy.set_count(7).unwrap().set_enabled(true).unwrap();
        let map = toy.encode();
        assert_eq!(map.len(), 2);
        assert_eq!(map["count"], "7");
        assert_eq!(map["enabled"], "true");
    }

    #[test]
    fn setting_default_value_is_elided() {
        let mut toy = Toy::default();
        toy.set_ratio(0.5).unwrap();
        assert!(toy.encode().is_empty());
    }

    #[test]
    fn decode_claims_only_its_keys() {
        let mut map = ParamMap::new();
        map.insert("count".into(), "9".into());
        map.insert("tags".into(), "1,2".into());
        map.insert("other".into(), "x".into());

        let toy = Toy::decode(&mut map).unwrap();
        assert_eq!(toy.count(), 9);
        assert_eq!(toy.tags(), &[1, 2]);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("other"));
    }

    #[test]
    fn decode_reports_key_and_raw_text() {
        let mut map = ParamMap::new();
        map.insert("ratio".into(), "half".into());
        let err = Toy::decode(&mut map).unwrap_err();
        assert_eq!(
            err,
            ParamError::Decode { key: "ratio".into(), raw: "half".into() }
        );
    }

    #[test]
    fn decode_applies_validation() {
        let mut map = ParamMap::new();
        map.insert("ratio".into(), "1.5".into());
        let err = Toy::decode(&mut map).unwrap_err();
        assert!(matches!(err, ParamError::Validation { field: "ratio", .. }));
    }

    #[test]
    fn setter_rejects_out_of_range() {
        let mut toy = Toy::default();
        let err = toy.set_count(-1).unwrap_err();
        assert!(matches!(err, ParamError::Validation { field: "count", .. }));
        assert_eq!(toy.count(), 3, "failed assignment must not modify the record");
    }

    #[test]
    fn codec_precomputes_defaults() {
        let codec = Toy::codec();
        assert_eq!(codec.len(), 4);
        assert_eq!(codec.default_text("ratio"), Some("0.5"));
        assert_eq!(codec.default_text("tags"), Some(""));
        assert_eq!(
            codec.wire_names().collect::<Vec<_>>(),
            ["count", "ratio", "tags", "enabled"]
        );
        assert!(std::ptr::eq(codec, Toy::codec()));
    }

    #[test]
    fn kinds_follow_field_types() {
        let kinds: Vec<FieldKind> = Toy::field_specs().iter().map(FieldSpec::kind).collect();
        assert_eq!(
            kinds,
            [FieldKind::Int32, FieldKind::Double, FieldKind::IntArray, FieldKind::Bool]
        );
        assert_eq!(<f64 as ParamValue>::KIND, FieldKind::Double);
    }
}
