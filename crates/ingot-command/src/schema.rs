//! Declarative command schemas and the compact grammar that describes them.
//!
//! A command is written as its name followed by argument specs:
//!
//! ```text
//! dice [upper_bound:number]=6
//! echo <content:text>
//! remind <when:int> [what]=later
//! ```
//!
//! `<...>` marks a required argument and `[...]` an optional one. The type
//! after the colon is resolved by [`InputType::parse`] (omitted means
//! `string`), and `=default` supplies the value used when the argument is
//! absent. Options use a separate spec of the form `-o [name[:type]][=default]`.
//!
//! [`Schema::to_format`] writes a schema back in the same grammar; parsing the
//! output again yields an identical schema.

use std::fmt::{self, Display, Write as _};

use crate::error::{CommandError, CommandResult};
use crate::input::InputType;

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// One `<name:type>=default` or `[name:type]=default` spec.
struct FieldSpec {
    name: String,
    input_type: InputType,
    required: bool,
    default: String,
}

fn parse_field(spec: &str) -> CommandResult<FieldSpec> {
    let invalid = || CommandError::format(format!("invalid argument spec \"{spec}\""));

    let (required, close) = match spec.chars().next() {
        Some('<') => (true, '>'),
        Some('[') => (false, ']'),
        _ => return Err(invalid()),
    };
    let end = spec.find(close).ok_or_else(invalid)?;
    let inner = &spec[1..end];
    let rest = &spec[end + 1..];

    let default = match rest.strip_prefix('=') {
        Some(default) => default.to_string(),
        None if rest.is_empty() => String::new(),
        None => return Err(invalid()),
    };

    let (name, type_name) = inner.split_once(':').unwrap_or((inner, ""));
    if !is_word(name) {
        return Err(invalid());
    }
    let input_type = InputType::parse(type_name)?;

    Ok(FieldSpec {
        name: name.to_string(),
        input_type,
        required,
        default,
    })
}

fn write_field(
    out: &mut String,
    name: &str,
    input_type: &InputType,
    required: bool,
    default: &str,
) {
    let (open, close) = if required { ('<', '>') } else { ('[', ']') };
    out.push(open);
    out.push_str(name);
    if *input_type != InputType::String {
        let _ = write!(out, ":{input_type}");
    }
    out.push(close);
    if !default.is_empty() {
        let _ = write!(out, "={default}");
    }
}

// ============================================================================
// SchemaArgument / SchemaOption
// ============================================================================

/// A positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaArgument {
    pub name: String,
    pub input_type: InputType,
    pub required: bool,
    /// Value bound when an optional argument is absent. Empty means none.
    pub default: String,
}

impl SchemaArgument {
    pub fn required(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            required: true,
            default: String::new(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        input_type: InputType,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type,
            required: false,
            default: default.into(),
        }
    }
}

/// A named option, addressable as `--name` or `-s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOption {
    pub name: String,
    /// Short form without the dash. May be empty.
    pub short: String,
    pub input_type: InputType,
    pub required: bool,
    pub default: String,
}

impl SchemaOption {
    pub fn new(short: impl Into<String>, name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            short: short.into(),
            input_type,
            required: false,
            default: String::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Whether `key` (dashes already stripped) names this option.
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key)
            || (!self.short.is_empty() && self.short.eq_ignore_ascii_case(key))
    }

    /// Writes the option back as an option spec (`-o [name:type]=default`).
    pub fn to_format(&self) -> String {
        let mut out = format!("-{} ", self.short);
        write_field(
            &mut out,
            &self.name,
            &self.input_type,
            self.required,
            &self.default,
        );
        out
    }
}

impl Display for SchemaOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_format())
    }
}

// ============================================================================
// Schema
// ============================================================================

/// The declarative shape of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub arguments: Vec<SchemaArgument>,
    pub options: Vec<SchemaOption>,
    pub sub_commands: Vec<Schema>,
}

impl Schema {
    /// Creates an empty schema. The name must be a non-empty word.
    pub fn new(name: impl Into<String>) -> CommandResult<Self> {
        let name = name.into();
        if !is_word(&name) {
            return Err(CommandError::format(format!(
                "invalid command name \"{name}\""
            )));
        }
        Ok(Self {
            name,
            arguments: Vec::new(),
            options: Vec::new(),
            sub_commands: Vec::new(),
        })
    }

    /// Parses a grammar string such as `dice [upper_bound:number]=6`.
    pub fn parse(grammar: &str) -> CommandResult<Self> {
        let mut tokens = grammar.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| CommandError::format("empty command format"))?;
        let mut schema = Self::new(name)?;

        for token in tokens {
            let field = parse_field(token)?;
            schema.arguments.push(SchemaArgument {
                name: field.name,
                input_type: field.input_type,
                required: field.required,
                default: field.default,
            });
        }
        Ok(schema)
    }

    /// Parses an option spec such as `-o [output:text]=out.txt`.
    pub fn parse_option(spec: &str) -> CommandResult<SchemaOption> {
        let invalid = || CommandError::format(format!("invalid option \"{spec}\""));

        let mut tokens = spec.split_whitespace();
        let (Some(short), Some(field), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(invalid());
        };
        let short = short.strip_prefix('-').ok_or_else(invalid)?;
        if !is_word(short) {
            return Err(invalid());
        }
        let field = parse_field(field)?;

        Ok(SchemaOption {
            name: field.name,
            short: short.to_string(),
            input_type: field.input_type,
            required: field.required,
            default: field.default,
        })
    }

    /// Writes the schema back as a grammar string.
    pub fn to_format(&self) -> String {
        let mut out = self.name.clone();
        for arg in &self.arguments {
            out.push(' ');
            write_field(
                &mut out,
                &arg.name,
                &arg.input_type,
                arg.required,
                &arg.default,
            );
        }
        out
    }

    pub fn add_argument(&mut self, argument: SchemaArgument) -> &mut Self {
        self.arguments.push(argument);
        self
    }

    pub fn add_option(&mut self, option: SchemaOption) -> &mut Self {
        self.options.push(option);
        self
    }

    pub fn add_sub_command(&mut self, schema: Schema) -> &mut Self {
        self.sub_commands.push(schema);
        self
    }

    /// Case-insensitive name match.
    pub fn matches(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
    }

    /// Looks up an option by long or short name, ignoring case and leading
    /// dashes.
    pub fn find_option(&self, key: &str) -> Option<&SchemaOption> {
        let key = key.trim_start_matches('-');
        self.options.iter().find(|opt| opt.matches(key))
    }

    pub fn find_sub_command(&self, token: &str) -> Option<&Schema> {
        self.sub_commands.iter().find(|s| s.matches(token))
    }

    /// Multi-line usage text: the grammar line, then one line per option and
    /// sub-command.
    pub fn usage(&self) -> String {
        let mut out = self.to_format();
        for opt in &self.options {
            let _ = write!(out, "\n  {}", opt.to_format());
        }
        for sub in &self.sub_commands {
            let _ = write!(out, "\n  {} {}", self.name, sub.to_format());
        }
        out
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_format())
    }
}
