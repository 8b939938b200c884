//! Directive option validation.
//!
//! Options arrive as raw `name -> value` pairs (flags carry no value) and are
//! converted here, before any rendering starts. A conversion failure is a
//! directive error, not a render failure.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::domain::nodes::Align;

/// Raw options as written on the directive. Flags map to `None`.
pub type RawOptions = BTreeMap<String, Option<String>>;

const LENGTH_UNITS: [&str; 9] = ["em", "ex", "px", "in", "cm", "mm", "pt", "pc", "%"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option: \"{name}\"")]
    Unknown { name: String },
    #[error("invalid option value: (option: \"{name}\"; value: {value:?}) {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    #[error("invalid option value: (option: \"{name}\") argument required but none supplied")]
    MissingValue { name: String },
    #[error("invalid option value: (option: \"{name}\") no argument is allowed")]
    UnexpectedValue { name: String },
}

impl OptionError {
    fn invalid(name: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while converting a supplied value.
    pub fn is_value_error(&self) -> bool {
        matches!(self, OptionError::InvalidValue { .. })
    }
}

/// Split a command-line `name[=value]` argument into a raw option.
pub fn parse_option_arg(arg: &str) -> Result<(String, Option<String>), String> {
    let (name, value) = match arg.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.to_string())),
        None => (arg.trim(), None),
    };
    if name.is_empty() {
        return Err(format!("option `{arg}` has no name"));
    }
    Ok((name.to_string(), value))
}

/// Parse a nonnegative integer (`0` allowed).
pub fn nonnegative_int(value: &str) -> Result<u32, String> {
    let trimmed = value.trim();
    let parsed: i64 = trimmed
        .parse()
        .map_err(|_| format!("invalid literal for int(): {trimmed:?}"))?;
    if parsed < 0 {
        return Err("negative value; must be positive or zero".to_string());
    }
    u32::try_from(parsed).map_err(|_| format!("value {parsed} is too large"))
}

/// Parse a comma separated list of nonnegative integers into a sorted,
/// duplicate-free sequence.
pub fn nonnegative_int_list(value: &str) -> Result<Vec<u32>, String> {
    let mut numbers = BTreeSet::new();
    for token in value.trim().split(',') {
        numbers.insert(nonnegative_int(token)?);
    }
    Ok(numbers.into_iter().collect())
}

fn length_or_percentage_or_unitless(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let unit = LENGTH_UNITS
        .iter()
        .find(|unit| trimmed.ends_with(*unit))
        .copied()
        .unwrap_or("");
    let number = trimmed[..trimmed.len() - unit.len()].trim();

    match number.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(format!("{number}{unit}")),
        _ => Err(format!(
            "{trimmed:?} is not a valid length; valid units are {}",
            LENGTH_UNITS.join(", ")
        )),
    }
}

/// Lowercase identifier built from an arbitrary class name.
fn class_identifier(raw: &str) -> String {
    let mut id = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    id.trim_start_matches(|c: char| c.is_ascii_digit() || c == '-')
        .to_string()
}

fn flag(name: &str, value: &Option<String>) -> Result<bool, OptionError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(true),
        Some(_) => Err(OptionError::UnexpectedValue {
            name: name.to_string(),
        }),
    }
}

fn required<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, OptionError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| OptionError::MissingValue {
            name: name.to_string(),
        })
}

fn convert<T>(
    name: &str,
    value: &Option<String>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, OptionError> {
    let raw = required(name, value)?;
    parse(raw).map_err(|reason| OptionError::invalid(name, raw, reason))
}

/// Options accepted by the code directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeOptions {
    pub linenos: bool,
    pub linenostart: u32,
    pub linenostep: u32,
    pub lineanchors: bool,
    /// 1-based line numbers relative to the first content line.
    pub hl_lines: Vec<u32>,
}

impl Default for CodeOptions {
    fn default() -> Self {
        Self {
            linenos: false,
            linenostart: 1,
            linenostep: 1,
            lineanchors: false,
            hl_lines: Vec::new(),
        }
    }
}

impl CodeOptions {
    pub fn parse(raw: &RawOptions) -> Result<Self, OptionError> {
        let mut options = Self::default();
        for (name, value) in raw {
            match name.as_str() {
                "linenos" => options.linenos = flag(name, value)?,
                "linenostart" => options.linenostart = convert(name, value, nonnegative_int)?,
                "linenostep" => options.linenostep = convert(name, value, nonnegative_int)?,
                "lineanchors" => options.lineanchors = flag(name, value)?,
                "hl_lines" => options.hl_lines = convert(name, value, nonnegative_int_list)?,
                _ => {
                    return Err(OptionError::Unknown {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(options)
    }
}

/// Options accepted by the graph and uml directives, forwarded to the image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub alt: Option<String>,
    pub height: Option<String>,
    pub width: Option<String>,
    /// Percentage.
    pub scale: Option<u32>,
    pub align: Option<Align>,
    pub target: Option<String>,
    pub classes: Vec<String>,
    pub name: Option<String>,
}

impl ImageOptions {
    pub fn parse(raw: &RawOptions) -> Result<Self, OptionError> {
        let mut options = Self::default();
        for (name, value) in raw {
            match name.as_str() {
                "alt" => options.alt = Some(required(name, value)?.to_string()),
                "height" => {
                    options.height = Some(convert(name, value, length_or_percentage_or_unitless)?)
                }
                "width" => {
                    options.width = Some(convert(name, value, length_or_percentage_or_unitless)?)
                }
                "scale" => options.scale = Some(convert(name, value, nonnegative_int)?),
                "align" => {
                    options.align = Some(convert(name, value, |raw| {
                        Align::parse(raw).ok_or_else(|| {
                            format!(
                                "{raw:?} unknown; choose from \"top\", \"middle\", \"bottom\", \"left\", \"center\", or \"right\""
                            )
                        })
                    })?)
                }
                "target" => {
                    options.target =
                        Some(required(name, value)?.split_whitespace().collect::<String>())
                }
                "class" => {
                    options.classes = convert(name, value, |raw| {
                        let classes: Vec<String> = raw
                            .split_whitespace()
                            .map(|class| {
                                let id = class_identifier(class);
                                if id.is_empty() {
                                    Err(format!("cannot make {class:?} into a class name"))
                                } else {
                                    Ok(id)
                                }
                            })
                            .collect::<Result<_, _>>()?;
                        Ok(classes)
                    })?
                }
                "name" => {
                    options.name = Some(
                        required(name, value)?
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" "),
                    )
                }
                _ => {
                    return Err(OptionError::Unknown {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, Option<&str>)]) -> RawOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn hl_lines_are_sorted_and_deduplicated() {
        assert_eq!(nonnegative_int_list("3,1,3,2"), Ok(vec![1, 2, 3]));
        assert_eq!(nonnegative_int_list(" 5 , 0 "), Ok(vec![0, 5]));
    }

    #[test]
    fn hl_lines_rejects_negative_values() {
        let err = CodeOptions::parse(&raw(&[("hl_lines", Some("1,-2,3"))])).expect_err("negative");
        assert!(err.is_value_error());
        assert!(err.to_string().contains("negative value"));
    }

    #[test]
    fn integers_above_u32_range_are_too_large() {
        assert_eq!(nonnegative_int("4294967295"), Ok(u32::MAX));
        let err = nonnegative_int("4294967296").expect_err("out of range");
        assert_eq!(err, "value 4294967296 is too large");
    }

    #[test]
    fn hl_lines_rejects_non_numeric_tokens() {
        for input in ["1,two", "1,,2", ""] {
            let err = CodeOptions::parse(&raw(&[("hl_lines", Some(input))]));
            assert!(err.is_err(), "{input:?} should be rejected");
        }
        let err =
            CodeOptions::parse(&raw(&[("hl_lines", Some("1,x"))])).expect_err("non-numeric");
        assert!(err.is_value_error());
    }

    #[test]
    fn code_options_defaults() {
        let options = CodeOptions::parse(&RawOptions::new()).expect("defaults");
        assert_eq!(options, CodeOptions::default());
        assert_eq!(options.linenostart, 1);
        assert_eq!(options.linenostep, 1);
    }

    #[test]
    fn code_options_parse_all_recognised_names() {
        let options = CodeOptions::parse(&raw(&[
            ("linenos", None),
            ("linenostart", Some("10")),
            ("linenostep", Some("5")),
            ("lineanchors", None),
            ("hl_lines", Some("2,1")),
        ]))
        .expect("valid options");

        assert!(options.linenos);
        assert!(options.lineanchors);
        assert_eq!(options.linenostart, 10);
        assert_eq!(options.linenostep, 5);
        assert_eq!(options.hl_lines, vec![1, 2]);
    }

    #[test]
    fn flags_refuse_values_and_unknown_names_fail() {
        assert_eq!(
            CodeOptions::parse(&raw(&[("linenos", Some("yes"))])),
            Err(OptionError::UnexpectedValue {
                name: "linenos".into()
            })
        );
        assert_eq!(
            CodeOptions::parse(&raw(&[("emphasize", None)])),
            Err(OptionError::Unknown {
                name: "emphasize".into()
            })
        );
        assert_eq!(
            CodeOptions::parse(&raw(&[("linenostart", None)])),
            Err(OptionError::MissingValue {
                name: "linenostart".into()
            })
        );
    }

    #[test]
    fn image_options_validate_values() {
        let options = ImageOptions::parse(&raw(&[
            ("alt", Some("Login flow")),
            ("width", Some("80%")),
            ("height", Some("120px")),
            ("scale", Some("50")),
            ("align", Some("left")),
            ("class", Some("Wide Diagram_Box")),
            ("target", Some("https://example.com/ login")),
        ]))
        .expect("valid image options");

        assert_eq!(options.alt.as_deref(), Some("Login flow"));
        assert_eq!(options.width.as_deref(), Some("80%"));
        assert_eq!(options.height.as_deref(), Some("120px"));
        assert_eq!(options.scale, Some(50));
        assert_eq!(options.align, Some(Align::Left));
        assert_eq!(options.classes, vec!["wide", "diagram-box"]);
        assert_eq!(options.target.as_deref(), Some("https://example.com/login"));
    }

    #[test]
    fn image_options_reject_bad_values() {
        assert!(ImageOptions::parse(&raw(&[("align", Some("justify"))])).is_err());
        assert!(ImageOptions::parse(&raw(&[("width", Some("wide"))])).is_err());
        assert!(ImageOptions::parse(&raw(&[("scale", Some("-5"))])).is_err());
        assert!(ImageOptions::parse(&raw(&[("linenos", None)])).is_err());
    }

    #[test]
    fn option_args_split_on_first_equals() {
        assert_eq!(
            parse_option_arg("hl_lines=1,2"),
            Ok(("hl_lines".to_string(), Some("1,2".to_string())))
        );
        assert_eq!(parse_option_arg("linenos"), Ok(("linenos".to_string(), None)));
        assert_eq!(
            parse_option_arg("alt=a=b"),
            Ok(("alt".to_string(), Some("a=b".to_string())))
        );
        assert!(parse_option_arg("=1").is_err());
    }
}
