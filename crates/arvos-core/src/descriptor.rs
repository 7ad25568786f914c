//! Placement descriptor parsing
//!
//! A descriptor is newline-delimited text. After trimming, empty lines and lines
//! starting with `#` or `//` are skipped; every other line is one of:
//!
//! ```text
//! ShowInfo
//! DEL,<tag>
//! ABS,<tag>,<name>,<lat>,<lon>,<alt>
//! REL,<tag>,<name>,<xOffset>,<zOffset>,<alt>
//! ```
//!
//! Parsing stops at the first bad line. [`lines`] yields lines lazily so
//! a caller can act on each one before the next is looked at.

use tracing::debug;

/// Errors produced while parsing a descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("line '{line}', bad command: {token}")]
    UnknownCommand { line: String, token: String },

    #[error("line '{line}', bad field count {count} for command: {token}")]
    FieldCount {
        line: String,
        token: String,
        count: usize,
    },

    #[error("line '{line}', bad {field}: {value}")]
    BadNumber {
        line: String,
        field: &'static str,
        value: String,
    },
}

/// A single placement instruction
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementCommand {
    /// Destroy the scene object carrying `tag`
    Remove { tag: String },
    /// Place a copy of the `tag` template at a geographic coordinate
    Absolute {
        tag: String,
        name: String,
        latitude: f64,
        longitude: f64,
        altitude: f32,
    },
    /// Place a copy of the `tag` template at a fixed offset from the scene origin
    Relative {
        tag: String,
        name: String,
        x_offset: f32,
        z_offset: f32,
        altitude: f32,
    },
}

/// A parsed command together with the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorEntry {
    pub line: String,
    pub command: PlacementCommand,
}

/// One meaningful descriptor line
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorLine {
    ShowInfo,
    Entry(DescriptorEntry),
}

/// The result of parsing a whole descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub show_info: bool,
    pub entries: Vec<DescriptorEntry>,
}

impl Descriptor {
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        parse(text)
    }
}

/// Parse descriptor text, failing on the first malformed line
pub fn parse(text: &str) -> Result<Descriptor, DescriptorError> {
    let mut descriptor = Descriptor::default();
    for line in lines(text) {
        match line? {
            DescriptorLine::ShowInfo => descriptor.show_info = true,
            DescriptorLine::Entry(entry) => descriptor.entries.push(entry),
        }
    }
    Ok(descriptor)
}

/// Lazily parse descriptor text one line at a time.
///
/// Skipped lines yield nothing; a malformed line yields its error when it is
/// reached, so callers acting on each line see failures in document order.
pub fn lines(text: &str) -> impl Iterator<Item = Result<DescriptorLine, DescriptorError>> + '_ {
    text.lines().filter_map(|raw| parse_line(raw).transpose())
}

/// Parse a single raw line; `None` for blank lines and comments
pub fn parse_line(raw: &str) -> Result<Option<DescriptorLine>, DescriptorError> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let token = fields[0];

    let command = match (token, fields.len()) {
        ("ShowInfo", 1) => return Ok(Some(DescriptorLine::ShowInfo)),
        ("DEL", 2) => PlacementCommand::Remove {
            tag: fields[1].to_string(),
        },
        ("ABS", 6) => PlacementCommand::Absolute {
            tag: fields[1].to_string(),
            name: fields[2].to_string(),
            latitude: number(line, "lat", fields[3])?,
            longitude: number(line, "lon", fields[4])?,
            altitude: number(line, "alt", fields[5])? as f32,
        },
        ("REL", 6) => PlacementCommand::Relative {
            tag: fields[1].to_string(),
            name: fields[2].to_string(),
            x_offset: number(line, "x", fields[3])? as f32,
            z_offset: number(line, "z", fields[4])? as f32,
            altitude: number(line, "alt", fields[5])? as f32,
        },
        ("ShowInfo" | "DEL" | "ABS" | "REL", count) => {
            return Err(DescriptorError::FieldCount {
                line: line.to_string(),
                token: token.to_string(),
                count,
            });
        }
        _ => {
            return Err(DescriptorError::UnknownCommand {
                line: line.to_string(),
                token: token.to_string(),
            });
        }
    };

    debug!(line, "parsed descriptor line");
    Ok(Some(DescriptorLine::Entry(DescriptorEntry {
        line: line.to_string(),
        command,
    })))
}

fn number(line: &str, field: &'static str, value: &str) -> Result<f64, DescriptorError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DescriptorError::BadNumber {
            line: line.to_string(),
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_line() {
        let d = parse("ABS,Foo,Bar,10.0,20.0,5.0").unwrap();
        assert!(!d.show_info);
        assert_eq!(d.entries.len(), 1);
        assert_eq!(
            d.entries[0].command,
            PlacementCommand::Absolute {
                tag: "Foo".into(),
                name: "Bar".into(),
                latitude: 10.0,
                longitude: 20.0,
                altitude: 5.0,
            }
        );
        assert_eq!(d.entries[0].line, "ABS,Foo,Bar,10.0,20.0,5.0");
    }

    #[test]
    fn test_relative_line() {
        let d = parse("REL,Foo,Bar,1,2,3").unwrap();
        assert_eq!(
            d.entries[0].command,
            PlacementCommand::Relative {
                tag: "Foo".into(),
                name: "Bar".into(),
                x_offset: 1.0,
                z_offset: 2.0,
                altitude: 3.0,
            }
        );
    }

    #[test]
    fn test_bad_latitude_names_field() {
        let err = parse("ABS,Foo,Bar,x,20.0,5.0").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::BadNumber {
                line: "ABS,Foo,Bar,x,20.0,5.0".into(),
                field: "lat",
                value: "x".into(),
            }
        );
        assert_eq!(err.to_string(), "line 'ABS,Foo,Bar,x,20.0,5.0', bad lat: x");
    }

    #[test]
    fn test_bad_relative_fields() {
        let err = parse("REL,Foo,Bar,1,zz,3").unwrap_err();
        assert!(matches!(err, DescriptorError::BadNumber { field: "z", .. }));

        let err = parse("REL,Foo,Bar,1,2,NaN").unwrap_err();
        assert!(matches!(err, DescriptorError::BadNumber { field: "alt", .. }));
    }

    #[test]
    fn test_comments_blank_lines_and_show_info() {
        let text = "\n# a comment\n   // another\n  ShowInfo  \r\nDEL,Template\n\n";
        let d = parse(text).unwrap();
        assert!(d.show_info);
        assert_eq!(
            d.entries,
            vec![DescriptorEntry {
                line: "DEL,Template".into(),
                command: PlacementCommand::Remove {
                    tag: "Template".into()
                },
            }]
        );
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse("ABS,Foo,Bar,10.0,20.0").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::FieldCount {
                line: "ABS,Foo,Bar,10.0,20.0".into(),
                token: "ABS".into(),
                count: 5,
            }
        );
        assert!(matches!(
            parse("DEL").unwrap_err(),
            DescriptorError::FieldCount { count: 1, .. }
        ));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("MOVE,Foo").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::UnknownCommand {
                line: "MOVE,Foo".into(),
                token: "MOVE".into(),
            }
        );
        // The legacy four-field form is no longer accepted
        assert!(parse("Foo,Bar,1,2").is_err());
    }

    #[test]
    fn test_stops_at_first_error() {
        let text = "REL,A,a,1,1,0\nBOGUS\nREL,B,b,2,2,0\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn test_preserves_order() {
        let text = "REL,A,a,1,1,0\nDEL,A\nABS,B,b,0,0,1\n";
        let d = parse(text).unwrap();
        let tags: Vec<&str> = d
            .entries
            .iter()
            .map(|e| match &e.command {
                PlacementCommand::Remove { tag }
                | PlacementCommand::Absolute { tag, .. }
                | PlacementCommand::Relative { tag, .. } => tag.as_str(),
            })
            .collect();
        assert_eq!(tags, vec!["A", "A", "B"]);
    }

    #[test]
    fn test_lines_yield_entries_before_a_later_error() {
        let mut it = lines("DEL,Missing\n\nBOGUS\nREL,A,a,1,1,0\n");
        assert!(matches!(
            it.next(),
            Some(Ok(DescriptorLine::Entry(DescriptorEntry {
                command: PlacementCommand::Remove { .. },
                ..
            })))
        ));
        assert!(matches!(
            it.next(),
            Some(Err(DescriptorError::UnknownCommand { .. }))
        ));
    }

    #[test]
    fn test_parse_line_skips_comments() {
        assert_eq!(parse_line("  # note").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line(" ShowInfo ").unwrap(), Some(DescriptorLine::ShowInfo));
    }
}
