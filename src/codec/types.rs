//! Enumerations, bit sets and codec options

use tracing::debug;

use super::metrics::Metrics;
use super::primitive::Primitive;
use super::{Error, Result};

/// Handling of enumeration values outside the declared symbol table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EnumMode {
    /// Substitute the null sentinel
    #[default]
    Lenient,
    /// Fail with [`Error::UnknownEnumValue`]
    Strict,
}

/// Options shared by encoders and decoders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecOptions {
    /// Enumeration handling
    pub enum_mode: EnumMode,
}

impl CodecOptions {
    /// Lenient options (the default)
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            enum_mode: EnumMode::Lenient,
        }
    }

    /// Strict enumeration handling
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            enum_mode: EnumMode::Strict,
        }
    }
}

/// Closed set of named integer constants plus a null sentinel.
///
/// Usually declared with [`sbe_enum!`](crate::sbe_enum).
pub trait SbeEnum: Copy + PartialEq + Sized {
    /// Underlying wire type
    type Repr: Primitive;

    /// Enumeration name, used in errors and logs
    const NAME: &'static str;

    /// Wire value of the sentinel
    const NULL_VALUE: Self::Repr;

    /// Declared constant for `raw`, if any.
    fn from_repr(raw: Self::Repr) -> Option<Self>;

    /// Wire value, or `None` for the sentinel.
    fn to_repr(self) -> Option<Self::Repr>;

    /// The sentinel.
    fn null() -> Self;

    /// Whether this is the sentinel.
    fn is_null(self) -> bool {
        self.to_repr().is_none()
    }
}

/// Wire value for `value`.
///
/// The sentinel is rejected in strict mode and written as
/// [`SbeEnum::NULL_VALUE`] in lenient mode.
pub fn encode_enum<E: SbeEnum>(value: E, mode: EnumMode) -> Result<E::Repr> {
    match (value.to_repr(), mode) {
        (Some(raw), _) => Ok(raw),
        (None, EnumMode::Lenient) => Ok(E::NULL_VALUE),
        (None, EnumMode::Strict) => Err(Error::UnknownEnumValue {
            name: E::NAME.to_owned(),
            value: E::NULL_VALUE.to_raw_bits(),
        }),
    }
}

/// Symbol for wire value `raw`.
///
/// The null value always maps to the sentinel. Undeclared values map to the
/// sentinel in lenient mode and fail in strict mode.
pub fn decode_enum<E: SbeEnum>(raw: E::Repr, mode: EnumMode) -> Result<E> {
    if raw == E::NULL_VALUE {
        return Ok(E::null());
    }
    if let Some(value) = E::from_repr(raw) {
        return Ok(value);
    }
    match mode {
        EnumMode::Lenient => {
            debug!(
                enum_name = E::NAME,
                value = raw.to_raw_bits(),
                "undeclared enum value decoded as sentinel"
            );
            Metrics::record_enum_sentinel();
            Ok(E::null())
        }
        EnumMode::Strict => Err(Error::UnknownEnumValue {
            name: E::NAME.to_owned(),
            value: raw.to_raw_bits(),
        }),
    }
}

/// Integer whose bits carry independent named choices.
///
/// Usually declared with [`sbe_bitset!`](crate::sbe_bitset). Bits without a
/// name are reserved and survive a decode/encode round trip untouched.
pub trait BitSet: Copy + Sized {
    /// Underlying wire type
    type Repr: Primitive;

    /// Named choices and their masks
    const CHOICES: &'static [(&'static str, Self::Repr)];

    /// Set from raw wire bits.
    fn from_raw(raw: Self::Repr) -> Self;

    /// Raw wire bits, reserved bits included.
    fn raw(self) -> Self::Repr;

    /// Whether bit `index` is set, named or reserved.
    fn bit(self, index: u32) -> bool {
        index < 64 && (self.raw().to_raw_bits() >> index) & 1 == 1
    }
}

/// Declare an enumeration and implement [`SbeEnum`] for it.
///
/// A `NullValue` variant is added as the sentinel.
///
/// ```rust
/// blockwire::sbe_enum! {
///     /// Boost type
///     pub enum BoostType: u8 {
///         Turbo = b'T',
///         Nitrous = b'N',
///     }
///     null = 0;
/// }
///
/// use blockwire::SbeEnum;
/// assert_eq!(BoostType::from_repr(b'N'), Some(BoostType::Nitrous));
/// assert!(BoostType::from_repr(b'X').is_none());
/// ```
#[macro_export]
macro_rules! sbe_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
        null = $null:expr;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Sentinel for absent or undeclared values
            #[default]
            NullValue,
        }

        impl $crate::SbeEnum for $name {
            type Repr = $repr;

            const NAME: &'static str = stringify!($name);

            const NULL_VALUE: $repr = $null;

            fn from_repr(raw: $repr) -> ::core::option::Option<Self> {
                $(
                    if raw == $value {
                        return ::core::option::Option::Some(Self::$variant);
                    }
                )+
                ::core::option::Option::None
            }

            fn to_repr(self) -> ::core::option::Option<$repr> {
                match self {
                    $( Self::$variant => ::core::option::Option::Some($value), )+
                    Self::NullValue => ::core::option::Option::None,
                }
            }

            fn null() -> Self {
                Self::NullValue
            }
        }
    };
}

/// Declare a bit set and implement [`BitSet`] for it.
///
/// Each choice names one bit index.
///
/// ```rust
/// blockwire::sbe_bitset! {
///     /// Optional extras
///     pub struct Extras: u8 {
///         /// Sun roof
///         const SUN_ROOF = 0;
///         /// Sports pack
///         const SPORTS_PACK = 1;
///     }
/// }
///
/// let mut extras = Extras::from_bits(0b1000_0000);
/// extras.set(Extras::SPORTS_PACK, true);
/// assert!(extras.contains(Extras::SPORTS_PACK));
/// assert_eq!(extras.reserved_bits(), 0b1000_0000);
/// ```
#[macro_export]
macro_rules! sbe_bitset {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $repr:ty {
            $( $(#[$cmeta:meta])* const $choice:ident = $bit:expr; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name($repr);

        impl $name {
            $( $(#[$cmeta])* pub const $choice: $repr = 1 << $bit; )+

            /// Mask covering every named choice
            pub const NAMED_MASK: $repr = 0 $( | Self::$choice )+;

            /// Empty set
            #[must_use]
            pub const fn new() -> Self {
                Self(0)
            }

            /// Set from raw bits, reserved bits kept
            #[must_use]
            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// Raw bits
            #[must_use]
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Whether `choice` is set
            #[must_use]
            pub const fn contains(self, choice: $repr) -> bool {
                (self.0 & choice) != 0
            }

            /// Set or clear `choice`, leaving every other bit alone
            pub fn set(&mut self, choice: $repr, value: bool) -> &mut Self {
                if value {
                    self.0 |= choice;
                } else {
                    self.0 &= !choice;
                }
                self
            }

            /// Copy with `choice` set
            #[must_use]
            pub const fn with(mut self, choice: $repr) -> Self {
                self.0 |= choice;
                self
            }

            /// Clear every bit, reserved bits included
            pub fn clear(&mut self) -> &mut Self {
                self.0 = 0;
                self
            }

            /// Bits not covered by a named choice
            #[must_use]
            pub const fn reserved_bits(self) -> $repr {
                self.0 & !Self::NAMED_MASK
            }
        }

        impl $crate::BitSet for $name {
            type Repr = $repr;

            const CHOICES: &'static [(&'static str, $repr)] =
                &[ $( (stringify!($choice), $name::$choice), )+ ];

            fn from_raw(raw: $repr) -> Self {
                Self(raw)
            }

            fn raw(self) -> $repr {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                let mut first = true;
                for (name, mask) in <Self as $crate::BitSet>::CHOICES {
                    if self.contains(*mask) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        f.write_str(name)?;
                        first = false;
                    }
                }
                if first {
                    f.write_str("NONE")?;
                }
                Ok(())
            }
        }
    };
}
