//! Line-oriented instance files.
//!
//! ```text
//! n
//! k
//! x y demand eligible   (n lines, integers, eligible is 0 or 1)
//! ```
//!
//! Blank lines are ignored anywhere in the file.

use std::path::Path;

use thiserror::Error;

use crate::encoder::EncodingError;
use crate::instance::{Instance, Location};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of file: expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("Invalid {field} at line {line}: {found:?}")]
    InvalidNumber {
        field: &'static str,
        found: String,
        line: usize,
    },
    #[error("Expected 4 fields (x y demand eligible) at line {line}, found {found}")]
    FieldCount { found: usize, line: usize },
    #[error("Invalid eligibility flag at line {line}: expected 0 or 1, found {found:?}")]
    InvalidEligibility { found: String, line: usize },
    #[error("Expected {expected} location lines, found {found}")]
    LocationCount { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(String),
}

/// Raw contents of an instance file, before distances are computed
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFile {
    /// Required number of centers (`k`)
    pub centers: usize,
    pub locations: Vec<Location>,
}

impl InstanceFile {
    pub fn into_instance(self, name: impl Into<String>) -> Result<Instance, EncodingError> {
        Instance::new(name, self.locations, self.centers)
    }
}

pub struct Parser<'a> {
    /// Non-blank lines with their 1-based line numbers
    records: std::vec::IntoIter<(usize, &'a str)>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let records: Vec<(usize, &'a str)> = source
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();
        Self {
            records: records.into_iter(),
        }
    }

    pub fn parse(source: &str) -> Result<InstanceFile, ParseError> {
        Parser::new(source).parse_instance()
    }

    pub fn parse_file(path: impl AsRef<Path>) -> Result<InstanceFile, ParseError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ParseError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&source)
    }

    fn parse_instance(&mut self) -> Result<InstanceFile, ParseError> {
        let count = self.parse_header("location count")?;
        let centers = self.parse_header("center count")?;

        // The header is untrusted; never size an allocation from it
        let mut locations = Vec::with_capacity(count.min(self.records.len()));
        while locations.len() < count {
            let Some((line, text)) = self.records.next() else {
                return Err(ParseError::LocationCount {
                    expected: count,
                    found: locations.len(),
                });
            };
            locations.push(parse_location(line, text)?);
        }

        let extra = self.records.len();
        if extra > 0 {
            return Err(ParseError::LocationCount {
                expected: count,
                found: count + extra,
            });
        }

        Ok(InstanceFile { centers, locations })
    }

    fn parse_header(&mut self, field: &'static str) -> Result<usize, ParseError> {
        let (line, text) = self.records.next().ok_or_else(|| ParseError::UnexpectedEof {
            expected: field.to_string(),
        })?;
        text.parse().map_err(|_| ParseError::InvalidNumber {
            field,
            found: text.to_string(),
            line,
        })
    }
}

fn parse_location(line: usize, text: &str) -> Result<Location, ParseError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [x, y, demand, eligible] = fields[..] else {
        return Err(ParseError::FieldCount {
            found: fields.len(),
            line,
        });
    };

    let eligible = match eligible {
        "0" => false,
        "1" => true,
        other => {
            return Err(ParseError::InvalidEligibility {
                found: other.to_string(),
                line,
            });
        }
    };

    Ok(Location::new(
        parse_integer("x coordinate", x, line)?,
        parse_integer("y coordinate", y, line)?,
        parse_integer("demand", demand, line)?,
        eligible,
    ))
}

fn parse_integer(field: &'static str, text: &str, line: usize) -> Result<f64, ParseError> {
    text.parse::<i64>()
        .map(|v| v as f64)
        .map_err(|_| ParseError::InvalidNumber {
            field,
            found: text.to_string(),
            line,
        })
}
