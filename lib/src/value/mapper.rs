use std::path::Path;

use crate::error::{ErrorDetail, Result, Chainable};

/// A textual data format that deserializes into values and configuration.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`.
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    fn read<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
        Ok(Self::from_str(input)?)
    }

    fn read_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let string = std::fs::read_to_string(path).chain(error! {
            "failed to open file for reading",
            "file path" => path.display()
        })?;

        Self::read(&string).chain_with(|| error! {
            "failed to deserialize file",
            "file path" => path.display()
        })
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::error::Error);

/// Picks a format from a file extension.
pub fn read_data_file(path: &Path) -> Result<crate::value::Value> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Toml::read_file(path),
        Some("json") => Json::read_file(path),
        _ => err! {
            "unsupported data file format",
            "file path" => path.display(),
            "expected" => "a `.toml` or `.json` file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn toml_and_json_agree() {
        let a: Value = Toml::read("title = \"Hi\"\ncount = 3\n").unwrap();
        let b: Value = Json::read(r#"{"title": "Hi", "count": 3}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reports_bad_input() {
        assert!(Json::read::<Value>("{").is_err());
    }
}
