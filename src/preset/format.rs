// Paramorph
// Copyright (C) 2021  Wesley Merkel
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The plain text preset file format.
//!
//! A preset file contains a header line with the preset's optional index, one line per parameter
//! value, and a terminating `::` line:
//!
//! ```text
//! ::1
//! /Position/X f -0.304725
//! /Position/Y f 0.525912
//! /Size/Scale f 2.057627
//! ::
//! ```
//!
//! Each value line holds the parameter's address, a type tag and the value. The format is meant to
//! be edited by hand, so the decoder skips blank lines and accepts any amount of whitespace
//! between fields.

use std::fmt;
use thiserror::Error;

/// A decoded preset: a label, an optional index and a list of address/value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub label: String,
    pub index: Option<i32>,
    pub values: Vec<(String, f32)>,
}

impl Preset {
    /// Decodes the contents of a preset file. The label is not part of the file contents; it comes
    /// from the file name.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first problem found. Nothing after the terminator is
    /// examined.
    pub fn parse(label: impl Into<String>, text: &str) -> Result<Preset, ParseError> {
        let mut lines = numbered_lines(text);

        let (line, header) = lines.next().ok_or(ParseError::MissingHeader { line: 1 })?;
        let index = parse_header(line, header)?;

        let mut values = Vec::new();
        for (line, content) in lines {
            if content == TERMINATOR {
                return Ok(Preset {
                    label: label.into(),
                    index,
                    values,
                });
            }
            values.push(parse_value(line, content)?);
        }
        Err(ParseError::MissingTerminator)
    }

    /// Reads only the index from the header of a preset file.
    pub fn parse_index(text: &str) -> Result<Option<i32>, ParseError> {
        let (line, header) = numbered_lines(text)
            .next()
            .ok_or(ParseError::MissingHeader { line: 1 })?;
        parse_header(line, header)
    }
}

impl fmt::Display for Preset {
    /// Encodes the preset in the file format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => writeln!(f, "{}{}", TERMINATOR, index)?,
            None => writeln!(f, "{}", TERMINATOR)?,
        }
        for (address, value) in self.values.iter() {
            writeln!(f, "{} {} {:?}", address, FLOAT_TAG, value)?;
        }
        writeln!(f, "{}", TERMINATOR)
    }
}

/// The error returned when a preset file cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: expected a header starting with \"::\"")]
    MissingHeader { line: usize },
    #[error("line {line}: invalid preset index {text:?}")]
    BadIndex { line: usize, text: String },
    #[error("line {line}: expected \"<address> <type> <value>\", found {text:?}")]
    BadLine { line: usize, text: String },
    #[error("line {line}: unsupported type tag {tag:?}")]
    BadTypeTag { line: usize, tag: String },
    #[error("line {line}: invalid value {text:?}")]
    BadValue { line: usize, text: String },
    #[error("missing \"::\" terminator")]
    MissingTerminator,
}

const TERMINATOR: &str = "::";
const FLOAT_TAG: &str = "f";

// Yields 1-based line numbers with trimmed contents, skipping blank lines.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_header(line: usize, header: &str) -> Result<Option<i32>, ParseError> {
    if !header.starts_with(TERMINATOR) {
        return Err(ParseError::MissingHeader { line });
    }
    let index = header[TERMINATOR.len()..].trim();
    if index.is_empty() {
        return Ok(None);
    }
    index.parse().map(Some).map_err(|_| ParseError::BadIndex {
        line,
        text: index.to_owned(),
    })
}

fn parse_value(line: usize, content: &str) -> Result<(String, f32), ParseError> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    let (address, tag, value) = match fields.as_slice() {
        [address, tag, value] if address.starts_with('/') => (*address, *tag, *value),
        _ => {
            return Err(ParseError::BadLine {
                line,
                text: content.to_owned(),
            })
        }
    };
    let bad_value = || ParseError::BadValue {
        line,
        text: value.to_owned(),
    };
    let value = match tag {
        "f" | "d" => value.parse::<f32>().map_err(|_| bad_value())?,
        "i" => value.parse::<i32>().map_err(|_| bad_value())? as f32,
        _ => {
            return Err(ParseError::BadTypeTag {
                line,
                tag: tag.to_owned(),
            })
        }
    };
    if !value.is_finite() {
        return Err(bad_value());
    }
    Ok((address.to_owned(), value))
}
