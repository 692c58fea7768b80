//! Token validators for command arguments and options.
//!
//! Every argument and option declares an [`InputType`]. The dispatcher checks
//! each token against it before binding, and grammar strings spell it after a
//! colon (`<count:int>`). Besides the built-in types, applications may add
//! their own with [`register_input_type`].

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::error::{CommandError, CommandResult};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("number pattern is valid"));

static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^.+$").expect("string pattern is valid"));

static BOOLEAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[TFtfYNyn]|on|ON|off|OFF|Yes|YES|yes|No|NO|no|[Tt]rue|TRUE|[Ff]alse|FALSE)$",
    )
    .expect("boolean pattern is valid")
});

static CUSTOM: LazyLock<RwLock<HashMap<String, Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The type of a command argument or option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum InputType {
    /// Any non-empty token.
    #[default]
    String,
    /// Optionally signed decimal number, with an optional fractional part.
    Number,
    /// One of the accepted yes/no spellings (`true`, `off`, `Y`, ...).
    Boolean,
    /// A type added with [`register_input_type`], by lower-cased name.
    Custom(String),
}

impl InputType {
    /// Resolves a type name as written in a grammar string.
    ///
    /// Names are case-insensitive. An empty name means [`InputType::String`].
    pub fn parse(name: &str) -> CommandResult<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "" | "string" | "text" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Boolean),
            "number" | "int" | "integer" | "float" | "double" => Ok(Self::Number),
            _ if CUSTOM.read().contains_key(&lower) => Ok(Self::Custom(lower)),
            _ => Err(CommandError::format(format!("unknown input type '{name}'"))),
        }
    }

    /// Checks whether `token` is acceptable for this type.
    ///
    /// A custom type that has not been registered accepts nothing.
    pub fn validate(&self, token: &str) -> bool {
        match self {
            Self::String => STRING.is_match(token),
            Self::Number => NUMBER.is_match(token),
            Self::Boolean => BOOLEAN.is_match(token),
            Self::Custom(name) => CUSTOM
                .read()
                .get(name)
                .is_some_and(|re| re.is_match(token)),
        }
    }

    /// Canonical name, as written back into grammar strings.
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "bool",
            Self::Custom(name) => name,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }
}

impl Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Adds (or replaces) a custom input type.
///
/// The name must consist of word characters and must not shadow a built-in
/// type name.
pub fn register_input_type(name: &str, pattern: Regex) -> CommandResult<InputType> {
    let lower = name.to_ascii_lowercase();
    if lower.is_empty() || !lower.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(CommandError::format(format!("invalid input type name '{name}'")));
    }
    if matches!(
        lower.as_str(),
        "string" | "text" | "bool" | "boolean" | "number" | "int" | "integer" | "float" | "double"
    ) {
        return Err(CommandError::format(format!("input type '{name}' is built in")));
    }

    debug!(input_type = %lower, pattern = %pattern, "Registered input type");
    CUSTOM.write().insert(lower.clone(), pattern);
    Ok(InputType::Custom(lower))
}

/// Lenient integer conversion; anything unparsable is `0`.
///
/// Numbers with a fractional part are truncated.
pub fn parse_int(value: &str) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))
        .unwrap_or(0)
}

/// Lenient float conversion; anything unparsable is `0.0`.
pub fn parse_float(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}

/// Lenient boolean conversion; anything that is not a yes-spelling is `false`.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value,
        "T" | "TRUE" | "True" | "true" | "t" | "on" | "ON" | "Y" | "y" | "Yes" | "yes" | "YES"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(InputType::parse("").unwrap(), InputType::String);
        assert_eq!(InputType::parse("TEXT").unwrap(), InputType::String);
        assert_eq!(InputType::parse("Boolean").unwrap(), InputType::Boolean);
        for name in ["number", "int", "Integer", "float", "DOUBLE"] {
            assert_eq!(InputType::parse(name).unwrap(), InputType::Number);
        }
        assert!(matches!(
            InputType::parse("colour"),
            Err(CommandError::Format(_))
        ));
    }

    #[test]
    fn test_number_validation() {
        for ok in ["0", "20", "-3", "+7", "3.14", "-0.5"] {
            assert!(InputType::Number.validate(ok), "{ok}");
        }
        for bad in ["", "abc", "1.", ".5", "1e3", "12a", "--1"] {
            assert!(!InputType::Number.validate(bad), "{bad}");
        }
    }

    #[test]
    fn test_boolean_validation() {
        for ok in ["T", "f", "y", "N", "on", "OFF", "Yes", "no", "True", "false", "TRUE"] {
            assert!(InputType::Boolean.validate(ok), "{ok}");
        }
        for bad in ["", "1", "maybe", "tRuE", "yEs"] {
            assert!(!InputType::Boolean.validate(bad), "{bad}");
        }
    }

    #[test]
    fn test_validation_is_stable() {
        for token in ["42", "abc", "", "yes", "x y"] {
            for ty in [InputType::String, InputType::Number, InputType::Boolean] {
                let first = ty.validate(token);
                assert!((0..5).all(|_| ty.validate(token) == first));
            }
        }
    }

    #[test]
    fn test_custom_type() {
        let ty = register_input_type("Hex", Regex::new(r"^0x[0-9a-f]+$").unwrap()).unwrap();
        assert_eq!(ty, InputType::Custom("hex".into()));
        assert_eq!(InputType::parse("HEX").unwrap(), ty);
        assert!(ty.validate("0xff"));
        assert!(!ty.validate("ff"));
        assert_eq!(ty.to_string(), "hex");

        assert!(!InputType::Custom("never_registered".into()).validate("x"));
        assert!(register_input_type("int", Regex::new(".").unwrap()).is_err());
        assert!(register_input_type("bad name", Regex::new(".").unwrap()).is_err());
    }

    #[test]
    fn test_lenient_conversions() {
        assert_eq!(parse_int("20"), 20);
        assert_eq!(parse_int("-3.9"), -3);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_float("2.5"), 2.5);
        assert_eq!(parse_float("x"), 0.0);
        assert!(parse_bool("on"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("maybe"));
    }
}
