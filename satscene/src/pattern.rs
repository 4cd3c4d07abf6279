//! Bidirectional filename templates.
//!
//! A template such as
//! `SV{band}_{platform}_d{start_time:%Y%m%d_t%H%M%S}_b{orbit:05d}.h5`
//! can both generate a filesystem glob (filling in the fields that are known)
//! and parse a concrete filename back into an [`Info`] mapping.
//!
//! Supported field specs:
//! - `{name}` - free text, never crosses a path separator
//! - `{name:4s}` - fixed-width text
//! - `{name:d}`, `{name:5d}`, `{name:05d}` - integers (space or zero padded)
//! - `{name:%Y%m%d}` - timestamps; directives `%Y %y %m %d %H %M %S %j %%`
//!
//! A literal `*` or `?` in the template behaves as a glob wildcard on both
//! sides.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

use crate::info::{Info, InfoValue};

/// Errors raised while compiling or applying a template.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatternError {
    /// A `{` has no matching `}`.
    #[error("unclosed field starting at byte {0}")]
    UnclosedField(usize),

    /// A field name is empty or not an identifier.
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    /// The format spec after `:` is not understood.
    #[error("unsupported format spec '{spec}' for field '{field}'")]
    UnsupportedSpec { field: String, spec: String },

    /// A time format uses a directive without a fixed width.
    #[error("unsupported time directive '%{0}'")]
    UnsupportedDirective(char),

    /// The generated expression failed to compile.
    #[error("failed to compile template: {0}")]
    Compile(String),

    /// The filename does not have the template's shape.
    #[error("'{0}' does not match the template")]
    NoMatch(String),

    /// A captured value could not be converted to the field's type.
    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}

/// Date assigned to timestamps parsed from time-only formats.
pub fn time_only_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1900, 1, 1)
}

#[derive(Debug, Clone, PartialEq)]
enum FieldKind {
    Text { width: Option<usize> },
    Int { width: Option<usize>, zero_pad: bool },
    Time { format: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A compiled filename template.
#[derive(Debug, Clone)]
pub struct PatternTemplate {
    template: String,
    segments: Vec<Segment>,
    regex: Regex,
    file_glob: glob::Pattern,
}

impl PatternTemplate {
    /// Compile a template string.
    pub fn new(template: &str) -> Result<Self, PatternError> {
        let template = template.trim();
        let segments = split_segments(template)?;
        let regex = build_regex(&segments)?;
        let file_glob = glob::Pattern::new(basename(&globify_segments(&segments, &Info::new())))
            .map_err(|e| PatternError::Compile(e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            segments,
            regex,
            file_glob,
        })
    }

    /// The source template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the fields in template order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(f) if seen.insert(f.name.as_str()) => Some(f.name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Build a glob expression, substituting the fields present in `info`.
    ///
    /// Fixed-width fields that are unknown become runs of `?`, the rest `*`.
    pub fn globify(&self, info: &Info) -> String {
        globify_segments(&self.segments, info)
    }

    /// Whether the basename of `filename` matches the basename of the
    /// template's unconstrained glob.
    pub fn matches(&self, filename: &Path) -> bool {
        filename
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.file_glob.matches(name))
    }

    /// Parse the metadata encoded in `filename`.
    ///
    /// The template is matched against the trailing path components, so a
    /// template without directories applies to the basename.
    pub fn parse(&self, filename: &str) -> Result<Info, PatternError> {
        let captures = self
            .regex
            .captures(filename)
            .ok_or_else(|| PatternError::NoMatch(filename.to_string()))?;

        let mut info = Info::new();
        for segment in &self.segments {
            let Segment::Field(field) = segment else {
                continue;
            };
            if info.contains_key(&field.name) {
                continue;
            }
            if let Some(m) = captures.name(&field.name) {
                info.insert(field.name.clone(), field.convert(m.as_str())?);
            }
        }
        Ok(info)
    }
}

impl fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)
    }
}

impl Field {
    fn parse(body: &str) -> Result<Self, PatternError> {
        let (name, spec) = match body.split_once(':') {
            Some((name, spec)) => (name.trim(), spec.trim()),
            None => (body.trim(), ""),
        };

        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(PatternError::InvalidFieldName(name.to_string()));
        }

        let unsupported = || PatternError::UnsupportedSpec {
            field: name.to_string(),
            spec: spec.to_string(),
        };

        let kind = if spec.is_empty() {
            FieldKind::Text { width: None }
        } else if spec.contains('%') {
            // Validate directives up front.
            time_regex(spec)?;
            FieldKind::Time {
                format: spec.to_string(),
            }
        } else {
            if !spec.is_ascii() {
                return Err(unsupported());
            }
            let (digits, ty) = spec.split_at(spec.len() - 1);
            let zero_pad = digits.starts_with('0');
            let width = if digits.is_empty() {
                None
            } else {
                Some(digits.parse::<usize>().map_err(|_| unsupported())?)
            }
            .filter(|w| *w > 0);

            match ty {
                "d" => FieldKind::Int { width, zero_pad },
                "s" => FieldKind::Text { width },
                _ => return Err(unsupported()),
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }

    fn regex(&self) -> Result<String, PatternError> {
        Ok(match &self.kind {
            FieldKind::Text { width: None } => r"[^/]+?".to_string(),
            FieldKind::Text { width: Some(w) } => format!(r"[^/]{{{}}}", w),
            FieldKind::Int { width: None, .. } => r"\d+".to_string(),
            FieldKind::Int {
                width: Some(w),
                zero_pad: true,
            } => format!(r"\d{{{}}}", w),
            FieldKind::Int {
                width: Some(w),
                zero_pad: false,
            } => format!(r"[ \d]{{{}}}", w),
            FieldKind::Time { format } => time_regex(format)?,
        })
    }

    fn convert(&self, raw: &str) -> Result<InfoValue, PatternError> {
        let invalid = || PatternError::InvalidValue {
            field: self.name.clone(),
            value: raw.to_string(),
        };

        match &self.kind {
            FieldKind::Text { .. } => Ok(InfoValue::Text(raw.to_string())),
            FieldKind::Int { .. } => raw
                .trim()
                .parse::<i64>()
                .map(InfoValue::Int)
                .map_err(|_| invalid()),
            FieldKind::Time { format } => parse_time(raw, format)
                .map(InfoValue::Time)
                .ok_or_else(invalid),
        }
    }

    fn format_value(&self, value: &InfoValue) -> String {
        match (&self.kind, value) {
            (FieldKind::Time { format }, InfoValue::Time(t)) => t.format(format).to_string(),
            (
                FieldKind::Int {
                    width: Some(w),
                    zero_pad: true,
                },
                InfoValue::Int(i),
            ) => format!("{:0width$}", i, width = *w),
            (
                FieldKind::Int {
                    width: Some(w),
                    zero_pad: false,
                },
                InfoValue::Int(i),
            ) => format!("{:width$}", i, width = *w),
            (_, other) => other.to_string(),
        }
    }

    fn wildcard(&self) -> String {
        match &self.kind {
            FieldKind::Text { width: Some(w) } | FieldKind::Int { width: Some(w), .. } => {
                "?".repeat(*w)
            }
            FieldKind::Time { format } => time_wildcard(format),
            _ => "*".to_string(),
        }
    }
}

fn split_segments(template: &str) -> Result<Vec<Segment>, PatternError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices();

    while let Some((pos, c)) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut body = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }
        if !closed {
            return Err(PatternError::UnclosedField(pos));
        }
        segments.push(Segment::Field(Field::parse(&body)?));
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn build_regex(segments: &[Segment]) -> Result<Regex, PatternError> {
    let mut expr = String::from("(?:^|/)");
    let mut seen = HashSet::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => expr.push_str(&literal_regex(text)),
            Segment::Field(field) => {
                let body = field.regex()?;
                if seen.insert(field.name.as_str()) {
                    expr.push_str(&format!("(?P<{}>{})", field.name, body));
                } else {
                    expr.push_str(&format!("(?:{})", body));
                }
            }
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| PatternError::Compile(e.to_string()))
}

fn globify_segments(segments: &[Segment], info: &Info) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(field) => match info.get(&field.name) {
                Some(value) => out.push_str(&glob::Pattern::escape(&field.format_value(value))),
                None => out.push_str(&field.wildcard()),
            },
        }
    }
    out
}

fn literal_regex(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

/// Width of a fixed-width strftime directive.
fn directive_width(directive: char) -> Option<usize> {
    match directive {
        'Y' => Some(4),
        'j' => Some(3),
        'y' | 'm' | 'd' | 'H' | 'M' | 'S' => Some(2),
        _ => None,
    }
}

/// Walk a strftime format, mapping directives and literals.
fn walk_time_format(
    format: &str,
    mut on_directive: impl FnMut(usize, &mut String),
    mut on_literal: impl FnMut(char, &mut String),
) -> Result<String, PatternError> {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            on_literal(c, &mut out);
            continue;
        }
        match chars.next() {
            Some('%') => on_literal('%', &mut out),
            Some(d) => match directive_width(d) {
                Some(width) => on_directive(width, &mut out),
                None => return Err(PatternError::UnsupportedDirective(d)),
            },
            None => return Err(PatternError::UnsupportedDirective('%')),
        }
    }
    Ok(out)
}

fn time_regex(format: &str) -> Result<String, PatternError> {
    walk_time_format(
        format,
        |width, out| out.push_str(&format!(r"\d{{{}}}", width)),
        |c, out| out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
    )
}

fn time_wildcard(format: &str) -> String {
    // Formats were validated at compile time.
    walk_time_format(
        format,
        |width, out| out.push_str(&"?".repeat(width)),
        |c, out| out.push(c),
    )
    .unwrap_or_else(|_| "*".to_string())
}

fn parse_time(raw: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = NaiveTime::parse_from_str(raw, format).ok()?;
    time_only_date().map(|d| d.and_time(time))
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::keys;

    const SDR: &str = "SV{band}_{platform}_d{start_time:%Y%m%d_t%H%M%S}{tenth:1d}_e{end_time:%H%M%S}{end_tenth:1d}_b{orbit:05d}_c{creation}_cspp_dev.h5";
    const SDR_FILE: &str = "SVM05_npp_d20150311_t1125112_e1126354_b17451_c20150311113329464787_cspp_dev.h5";

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_viirs_sdr_filename() {
        let pattern = PatternTemplate::new(SDR).unwrap();
        let info = pattern.parse(SDR_FILE).unwrap();

        assert_eq!(info.text("band"), Some("M05"));
        assert_eq!(info.text(keys::PLATFORM), Some("npp"));
        assert_eq!(info.time(keys::START_TIME), Some(dt(2015, 3, 11, 11, 25, 11)));
        assert_eq!(info.time(keys::END_TIME), Some(dt(1900, 1, 1, 11, 26, 35)));
        assert_eq!(info.get("orbit").and_then(InfoValue::as_int), Some(17451));
    }

    #[test]
    fn test_parse_uses_basename_of_full_path() {
        let pattern = PatternTemplate::new(SDR).unwrap();
        let path = format!("/data/viirs/2015/03/11/SDR/{}", SDR_FILE);
        let info = pattern.parse(&path).unwrap();
        assert_eq!(info.text("band"), Some("M05"));
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        let pattern = PatternTemplate::new(SDR).unwrap();
        let err = pattern.parse("GMTCO_npp.h5").unwrap_err();
        assert!(matches!(err, PatternError::NoMatch(_)));
    }

    #[test]
    fn test_globify_without_metadata() {
        let pattern = PatternTemplate::new("hrpt_{platform}_{start_time:%Y%m%d_%H%M}_{orbit:05d}.l1b").unwrap();
        assert_eq!(pattern.globify(&Info::new()), "hrpt_*_????????_????_?????.l1b");
    }

    #[test]
    fn test_globify_substitutes_known_fields() {
        let pattern = PatternTemplate::new("hrpt_{platform}_{start_time:%Y%m%d_%H%M}_{orbit:05d}.l1b").unwrap();
        let info = Info::new()
            .with(keys::PLATFORM, "noaa19")
            .with(keys::START_TIME, dt(2015, 4, 20, 5, 36, 0))
            .with("orbit", 42i64);
        assert_eq!(pattern.globify(&info), "hrpt_noaa19_20150420_0536_00042.l1b");
    }

    #[test]
    fn test_matches_compares_basenames() {
        let pattern = PatternTemplate::new(SDR).unwrap();
        assert!(pattern.matches(Path::new(&format!("/some/dir/{}", SDR_FILE))));
        assert!(!pattern.matches(Path::new("/some/dir/GDNBO_npp_d20150311.h5")));
    }

    #[test]
    fn test_metadata_round_trips_through_template() {
        let pattern = PatternTemplate::new("{platform}_{start_time:%Y%j%H%M}.dat").unwrap();
        let info = Info::new()
            .with(keys::PLATFORM, "metop-b")
            .with(keys::START_TIME, dt(2016, 2, 29, 23, 59, 0));

        let name = pattern.globify(&info);
        assert_eq!(name, "metop-b_20160602359.dat");
        assert_eq!(pattern.parse(&name).unwrap(), info);
    }

    #[test]
    fn test_repeated_field_is_parsed_once() {
        let pattern = PatternTemplate::new("{platform}/{platform}_{band}.h5").unwrap();
        let info = pattern.parse("/archive/npp/npp_I04.h5").unwrap();
        assert_eq!(info.text(keys::PLATFORM), Some("npp"));
        assert_eq!(info.text("band"), Some("I04"));
        assert_eq!(pattern.fields(), vec!["platform", "band"]);
    }

    #[test]
    fn test_literal_wildcards() {
        let pattern = PatternTemplate::new("GITCO_{platform}_*.h5").unwrap();
        assert!(pattern.matches(Path::new("GITCO_npp_d2015_whatever.h5")));
        assert_eq!(
            pattern.parse("GITCO_npp_d2015.h5").unwrap().text(keys::PLATFORM),
            Some("npp")
        );
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            PatternTemplate::new("abc_{platform").unwrap_err(),
            PatternError::UnclosedField(4)
        );
        assert!(matches!(
            PatternTemplate::new("{1bad}").unwrap_err(),
            PatternError::InvalidFieldName(_)
        ));
        assert!(matches!(
            PatternTemplate::new("{t:%Y%f}").unwrap_err(),
            PatternError::UnsupportedDirective('f')
        ));
        assert!(matches!(
            PatternTemplate::new("{x:5z}").unwrap_err(),
            PatternError::UnsupportedSpec { .. }
        ));
    }

    #[test]
    fn test_invalid_captured_time() {
        let pattern = PatternTemplate::new("f_{start_time:%Y%m%d}.h5").unwrap();
        let err = pattern.parse("f_20151399.h5").unwrap_err();
        assert!(matches!(err, PatternError::InvalidValue { .. }));
    }
}
