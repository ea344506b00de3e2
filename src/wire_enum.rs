//! Declarative helper for the protocol's SCREAMING_CASE string enums.
//!
//! Every enum the service sends can grow new values at any time, so each
//! generated type carries an `Unknown(String)` variant that preserves the raw
//! value. With the `strict-unknown` feature enabled, unrecognized values are a
//! deserialization error instead.

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this crate does not recognize, preserved verbatim.
            Unknown(String),
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// The literal string used on the wire.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Unknown(raw) => raw,
                }
            }

            /// Maps a wire string to its variant, falling back to `Unknown`.
            #[must_use]
            pub fn from_wire(raw: &str) -> Self {
                match raw {
                    $( $wire => Self::$variant, )+
                    other => Self::Unknown(other.to_string()),
                }
            }

            #[must_use]
            pub const fn is_unknown(&self) -> bool {
                matches!(self, Self::Unknown(_))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                let value = Self::from_wire(&raw);
                if value.is_unknown() {
                    #[cfg(feature = "strict-unknown")]
                    {
                        return Err(<D::Error as ::serde::de::Error>::custom(format!(
                            "unknown {} value '{}' (strict-unknown enabled)",
                            stringify!($name),
                            raw
                        )));
                    }
                    #[cfg(not(feature = "strict-unknown"))]
                    tracing::warn!(
                        "Encountered unknown {} '{}'. Preserving it in the Unknown variant.",
                        stringify!($name),
                        raw
                    );
                }
                Ok(value)
            }
        }
    };
}

pub(crate) use wire_enum;
