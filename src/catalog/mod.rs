// SPDX-License-Identifier: GPL-3.0-only

/// Declares a closed catalog enum whose variants map one-to-one onto the
/// remote resource keys.
macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $key:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every entry, in catalog order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The remote key for this entry
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $key, )+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::catalog::UnknownIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $key => Ok($name::$variant), )+
                    other => Err(crate::catalog::UnknownIdentifier(other.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let key = String::deserialize(deserializer)?;
                key.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub mod category;
pub mod data_file;
pub mod language;

pub use category::Category;
pub use data_file::DataFile;
pub use language::Language;

/// Returned when a key is not part of the compiled-in catalog
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown catalog identifier: {0}")]
pub struct UnknownIdentifier(pub String);

/// Check whether `id` names a known resource of `category`
pub fn is_valid(id: &str, category: Category) -> bool {
    match category {
        Category::LanguageFile => id.parse::<Language>().is_ok(),
        Category::DataFile => id.parse::<DataFile>().is_ok(),
    }
}

/// List every known resource of `category`, in catalog order
pub fn all_identifiers(category: Category) -> Vec<&'static str> {
    match category {
        Category::LanguageFile => Language::ALL.iter().map(|l| l.as_str()).collect(),
        Category::DataFile => DataFile::ALL.iter().map(|f| f.as_str()).collect(),
    }
}
