//! Declarative generation of typed edge structs.

/// Declares a typed edge backed by an [`EdgeEntity`](crate::persist::EdgeEntity).
///
/// `Out => In` gives the direction: the edge starts at an `Out` vertex and
/// points at an `In` vertex. Field names are stored in camelCase.
///
/// ```
/// use graphpersist::graph_edge;
/// use graphpersist::persist::VertexRef;
///
/// graph_edge! {
///     pub struct Knows: VertexRef => VertexRef {
///         label = "knows";
///         since: i64,
///         note: Option<String>,
///     }
/// }
///
/// let mut knows = Knows::new(2020, None).unwrap();
/// assert!(knows.set_since(2021).unwrap());
/// ```
#[macro_export]
macro_rules! graph_edge {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $out:ty => $in:ty {
            label = $label:literal;
            $( $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field: $field_ty, )*
            __edge: $crate::persist::EdgeEntity<$in, $out>,
        }

        impl $name {
            pub const LABEL: &'static str = $label;

            fn __type_checks()
            where
                $( $field_ty: $crate::persist::GraphValue, )*
            {}

            /// New edge with a generated key. Initial field values are recorded as changes.
            pub fn new($( $field: $field_ty ),*) -> $crate::core::Result<Self> {
                Self::__from_edge($crate::persist::EdgeEntity::new($label) $(, $field)*)
            }

            /// New edge with a caller-supplied key.
            pub fn with_key(
                key: impl Into<String>
                $(, $field: $field_ty)*
            ) -> $crate::core::Result<Self> {
                Self::__from_edge($crate::persist::EdgeEntity::with_key($label, key)? $(, $field)*)
            }

            fn __from_edge(
                edge: $crate::persist::EdgeEntity<$in, $out>
                $(, $field: $field_ty)*
            ) -> $crate::core::Result<Self> {
                Self::__type_checks();
                let mut entity = Self {
                    $( $field, )*
                    __edge: edge,
                };
                $(
                    entity.__edge.write_property(
                        stringify!($field),
                        &$crate::core::Value::Null,
                        $crate::persist::GraphValue::to_value(&entity.$field),
                    )?;
                )*
                Ok(entity)
            }

            $(
                pub fn $field(&self) -> &$field_ty {
                    &self.$field
                }
            )*

            $crate::paste::paste! {
                $(
                    /// Writes the field; returns whether the change log changed.
                    pub fn [<set_ $field>](&mut self, value: $field_ty) -> $crate::core::Result<bool> {
                        let old = $crate::persist::GraphValue::to_value(&self.$field);
                        let recorded = self.__edge.write_property(
                            stringify!($field),
                            &old,
                            $crate::persist::GraphValue::to_value(&value),
                        )?;
                        self.$field = value;
                        Ok(recorded)
                    }
                )*
            }
        }

        impl $crate::persist::EdgeModel for $name {
            type In = $in;
            type Out = $out;

            fn edge_label() -> &'static str {
                $label
            }

            fn from_record(
                record: &$crate::persist::RawRecord,
                config: &$crate::connection::config::MapperConfig,
            ) -> $crate::core::Result<Self> {
                let mut edge = $crate::persist::EdgeEntity::<$in, $out>::unkeyed($label);
                edge.attach(config);
                edge.begin_load(record)?;
                let mut entity = Self {
                    $(
                        $field: $crate::persist::decode_property::<$field_ty>(
                            record,
                            &$crate::persist::to_camel_case(stringify!($field)),
                            config.timestamp_unit,
                        )?,
                    )*
                    __edge: edge,
                };
                entity.__edge.complete_load();
                Ok(entity)
            }

            fn edge(&self) -> &$crate::persist::EdgeEntity<$in, $out> {
                &self.__edge
            }

            fn edge_mut(&mut self) -> &mut $crate::persist::EdgeEntity<$in, $out> {
                &mut self.__edge
            }
        }
    };
}
