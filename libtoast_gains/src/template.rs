use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::error::TemplateError;

/// Delimiter of SLURM script templates, which are full of shell `$` expansions
pub const AT_DELIMITER: char = '@';
/// Delimiter of INI templates
pub const DOLLAR_DELIMITER: char = '$';

/// A value that can be substituted into a template.
///
/// Floats are rendered the way Python prints them (`60.0`, `3.38e-05`), so that the
/// generated files match the ones the pipeline has always used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", python_float_repr(*x)),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&Path> for TemplateValue {
    fn from(value: &Path) -> Self {
        Self::Str(value.to_string_lossy().into_owned())
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TemplateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Flat mapping from placeholder name to value
pub type TemplateParams = BTreeMap<String, TemplateValue>;

/// Format a float like Python's `repr`: shortest round-trip digits, always with a
/// decimal point or an exponent, exponent notation outside `1e-4 <= |x| < 1e16`.
pub fn python_float_repr(x: f64) -> String {
    if x.is_nan() {
        return String::from("nan");
    }
    if x.is_infinite() {
        return String::from(if x > 0.0 { "inf" } else { "-inf" });
    }
    if x == 0.0 {
        return String::from(if x.is_sign_negative() { "-0.0" } else { "0.0" });
    }

    let sci = format!("{x:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }

    let fixed = format!("{x}");
    if fixed.contains('.') {
        fixed
    } else {
        format!("{fixed}.0")
    }
}

/// Length in bytes of the identifier at the start of `text`, 0 if there is none
fn identifier_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
            1 + bytes[1..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count()
        }
        _ => 0,
    }
}

/// A text template with named placeholders.
///
/// With delimiter `@`:
///
/// - `@name` and `@{name}` are replaced by the value of `name`
/// - `@@` produces a literal `@`
/// - any other use of `@` is an error
///
/// Names are ASCII identifiers. Every placeholder must have a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    delimiter: char,
}

impl Template {
    pub fn new(text: impl Into<String>, delimiter: char) -> Self {
        Self {
            text: text.into(),
            delimiter,
        }
    }

    pub fn from_file(path: &Path, delimiter: char) -> Result<Self, std::io::Error> {
        Ok(Self::new(std::fs::read_to_string(path)?, delimiter))
    }

    /// Render the template, replacing every placeholder with its value
    pub fn substitute(&self, params: &TemplateParams) -> Result<String, TemplateError> {
        let delim_len = self.delimiter.len_utf8();
        let mut rendered = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        let mut consumed = 0;

        while let Some(pos) = rest.find(self.delimiter) {
            rendered.push_str(&rest[..pos]);
            let after = &rest[pos + delim_len..];

            let advance = if after.starts_with(self.delimiter) {
                rendered.push(self.delimiter);
                delim_len * 2
            } else if let Some(inner) = after.strip_prefix('{') {
                let len = identifier_len(inner);
                if len == 0 || !inner[len..].starts_with('}') {
                    return Err(self.invalid_at(consumed + pos));
                }
                rendered.push_str(&lookup(params, &inner[..len])?);
                delim_len + len + 2
            } else {
                let len = identifier_len(after);
                if len == 0 {
                    return Err(self.invalid_at(consumed + pos));
                }
                rendered.push_str(&lookup(params, &after[..len])?);
                delim_len + len
            };

            rest = &rest[pos + advance..];
            consumed += pos + advance;
        }
        rendered.push_str(rest);

        Ok(rendered)
    }

    fn invalid_at(&self, offset: usize) -> TemplateError {
        let before = &self.text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        let column = before[line_start..].chars().count() + 1;
        TemplateError::InvalidPlaceholder { line, column }
    }
}

fn lookup(params: &TemplateParams, name: &str) -> Result<String, TemplateError> {
    params
        .get(name)
        .map(|value| value.to_string())
        .ok_or_else(|| TemplateError::MissingKey(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, TemplateValue)]) -> TemplateParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_at_substitution() {
        let template = Template::new(
            "path = @{outdir}/out_000\nlength = @baseline_length_s\nsrun -n $((@{nodes} * 16))",
            AT_DELIMITER,
        );
        let rendered = template
            .substitute(&params(&[
                ("outdir", TemplateValue::from("/scratch/case")),
                ("baseline_length_s", TemplateValue::from(50.0)),
                ("nodes", TemplateValue::from(13)),
            ]))
            .unwrap();
        assert_eq!(
            rendered,
            "path = /scratch/case/out_000\nlength = 50.0\nsrun -n $((13 * 16))"
        );
    }

    #[test]
    fn test_escape_and_identifier_boundary() {
        let template = Template::new("$$HOME ${det}_x $det.ini $det-$fsky", DOLLAR_DELIMITER);
        let rendered = template
            .substitute(&params(&[
                ("det", TemplateValue::from("0A")),
                ("det_x", TemplateValue::from("wrong")),
                ("fsky", TemplateValue::from(0.8)),
            ]))
            .unwrap();
        assert_eq!(rendered, "$HOME 0A_x 0A.ini 0A-0.8");
    }

    #[test]
    fn test_missing_key() {
        let template = Template::new("mask = @{galactic_mask}", AT_DELIMITER);
        assert_eq!(
            template.substitute(&TemplateParams::new()),
            Err(TemplateError::MissingKey(String::from("galactic_mask")))
        );
    }

    #[test]
    fn test_invalid_placeholder() {
        let template = Template::new("line one\nab $(mktemp)", DOLLAR_DELIMITER);
        assert_eq!(
            template.substitute(&TemplateParams::new()),
            Err(TemplateError::InvalidPlaceholder { line: 2, column: 4 })
        );

        let template = Template::new("@{1abc}", AT_DELIMITER);
        assert!(matches!(
            template.substitute(&TemplateParams::new()),
            Err(TemplateError::InvalidPlaceholder { line: 1, column: 1 })
        ));
    }

    #[test]
    fn test_no_placeholders() {
        let text = "#!/bin/sh\n#SBATCH -q regular\n";
        let template = Template::new(text, AT_DELIMITER);
        assert_eq!(template.substitute(&TemplateParams::new()).unwrap(), text);
    }

    #[test]
    fn test_python_float_repr() {
        assert_eq!(python_float_repr(60.0), "60.0");
        assert_eq!(python_float_repr(0.8), "0.8");
        assert_eq!(python_float_repr(33.8e-6), "3.38e-05");
        assert_eq!(python_float_repr(1e-15), "1e-15");
        assert_eq!(python_float_repr(0.0001), "0.0001");
        assert_eq!(python_float_repr(1e16), "1e+16");
        assert_eq!(python_float_repr(-2.5), "-2.5");
        assert_eq!(python_float_repr(0.0), "0.0");
    }
}
