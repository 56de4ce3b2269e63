/// Declares a closed value set with a canonical lowercase string per variant.
///
/// Ordinal order follows declaration order, so `PartialOrd`/`Ord` compare
/// ratings the way the model scales expect (`Public < Internal < ...`).
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $text:literal, $desc:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            schemars::JsonSchema,
        )]
        pub enum $name {
            $(
                #[doc = $desc]
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)+
                }
            }

            pub fn ordinal(self) -> usize {
                self as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| $crate::error::UnknownValue {
                        kind: stringify!($name),
                        value: trimmed.to_string(),
                    })
            }
        }
    };
}
