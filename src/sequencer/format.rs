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

//! The plain text sequence file format.
//!
//! Each line of a sequence file is a step: the preset label, the morph time and the wait time in
//! seconds, separated by colons. A line containing only `::` ends the sequence.
//!
//! ```text
//! 1:0.0:3.0
//! 2:4.0:2.0
//! 3:1.0:1.0
//! ::
//! ```
//!
//! The two times are split off from the right, so labels may contain colons themselves.

use std::{fmt, time::Duration};
use thiserror::Error;

/// One preset recall in a [`Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The label of the preset to recall.
    pub preset: String,
    /// How long the morph to the preset takes.
    pub morph_time: Duration,
    /// How long to hold the preset after the morph completes.
    pub wait_time: Duration,
}

impl Step {
    pub fn new(preset: impl Into<String>, morph_time: Duration, wait_time: Duration) -> Step {
        Step {
            preset: preset.into(),
            morph_time,
            wait_time,
        }
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Sequence {
    /// Decodes the contents of a sequence file. The name comes from the file name.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for the first malformed line, or
    /// [`ParseError::MissingTerminator`] if the file does not end with `::`.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Sequence, ParseError> {
        let mut steps = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == TERMINATOR {
                return Ok(Sequence {
                    name: name.into(),
                    steps,
                });
            }
            steps.push(parse_step(i + 1, line)?);
        }
        Err(ParseError::MissingTerminator)
    }

    /// The total time the sequence takes to play. Saturates at [`Duration::MAX`].
    pub fn duration(&self) -> Duration {
        self.steps.iter().fold(Duration::ZERO, |total, step| {
            total
                .saturating_add(step.morph_time)
                .saturating_add(step.wait_time)
        })
    }
}

impl fmt::Display for Sequence {
    /// Encodes the sequence in the file format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in self.steps.iter() {
            writeln!(
                f,
                "{}:{:?}:{:?}",
                step.preset,
                step.morph_time.as_secs_f64(),
                step.wait_time.as_secs_f64()
            )?;
        }
        writeln!(f, "{}", TERMINATOR)
    }
}

/// The error returned when a sequence file cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: expected \"<preset>:<morph time>:<wait time>\", found {text:?}")]
    BadLine { line: usize, text: String },
    #[error("line {line}: invalid time {text:?}")]
    BadTime { line: usize, text: String },
    #[error("missing \"::\" terminator")]
    MissingTerminator,
}

const TERMINATOR: &str = "::";

fn parse_step(line: usize, content: &str) -> Result<Step, ParseError> {
    let mut fields = content.rsplitn(3, ':');
    let (wait, morph, preset) = match (fields.next(), fields.next(), fields.next()) {
        (Some(wait), Some(morph), Some(preset)) if !preset.trim().is_empty() => {
            (wait, morph, preset.trim())
        }
        _ => {
            return Err(ParseError::BadLine {
                line,
                text: content.to_owned(),
            })
        }
    };
    Ok(Step {
        preset: preset.to_owned(),
        morph_time: parse_seconds(line, morph)?,
        wait_time: parse_seconds(line, wait)?,
    })
}

fn parse_seconds(line: usize, text: &str) -> Result<Duration, ParseError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ParseError::BadTime {
            line,
            text: text.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secs(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_parse() {
        let text = "1:0.0:3.0\n2:4.0:2.0\n3:1.0:1.0\n::\n";
        let sequence = Sequence::parse("demo", text).unwrap();
        assert_eq!(
            sequence,
            Sequence {
                name: "demo".into(),
                steps: vec![
                    Step::new("1", secs(0.0), secs(3.0)),
                    Step::new("2", secs(4.0), secs(2.0)),
                    Step::new("3", secs(1.0), secs(1.0)),
                ],
            }
        );
        assert_eq!(sequence.duration(), secs(11.0));
    }

    #[test]
    fn test_parse_stops_at_terminator() {
        let text = "\nintro : 0.5 : 1\n\nscene:with:colons:2:0\n::\nignored:x:y\n";
        assert_eq!(
            Sequence::parse("s", text).unwrap().steps,
            vec![
                Step::new("intro", secs(0.5), secs(1.0)),
                Step::new("scene:with:colons", secs(2.0), secs(0.0)),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        let cases = vec![
            ("1:0:1\n", ParseError::MissingTerminator),
            ("", ParseError::MissingTerminator),
            (
                "1:0\n::\n",
                ParseError::BadLine {
                    line: 1,
                    text: "1:0".into(),
                },
            ),
            (
                ":0:1\n::\n",
                ParseError::BadLine {
                    line: 1,
                    text: ":0:1".into(),
                },
            ),
            (
                "1:0:1\n2:fast:1\n::\n",
                ParseError::BadTime {
                    line: 2,
                    text: "fast".into(),
                },
            ),
            (
                "1:0:-1\n::\n",
                ParseError::BadTime {
                    line: 1,
                    text: "-1".into(),
                },
            ),
            (
                "1:inf:1\n::\n",
                ParseError::BadTime {
                    line: 1,
                    text: "inf".into(),
                },
            ),
            (
                "1:1e30:1\n::\n",
                ParseError::BadTime {
                    line: 1,
                    text: "1e30".into(),
                },
            ),
            (
                "1:NaN:1\n::\n",
                ParseError::BadTime {
                    line: 1,
                    text: "NaN".into(),
                },
            ),
        ];
        for (text, expected) in cases {
            assert_eq!(Sequence::parse("s", text), Err(expected), "{:?}", text);
        }
    }

    #[test]
    fn test_duration_saturates() {
        let sequence = Sequence {
            name: "long".into(),
            steps: vec![
                Step::new("1", Duration::MAX, secs(1.0)),
                Step::new("2", secs(1.0), Duration::MAX),
            ],
        };
        assert_eq!(sequence.duration(), Duration::MAX);
    }

    #[test]
    fn test_encode() {
        let sequence = Sequence {
            name: "demo".into(),
            steps: vec![
                Step::new("1", secs(0.0), secs(3.0)),
                Step::new("2", secs(0.25), secs(2.0)),
            ],
        };
        assert_eq!(sequence.to_string(), "1:0.0:3.0\n2:0.25:2.0\n::\n");
        assert_eq!(Sequence::parse("demo", &sequence.to_string()), Ok(sequence));
    }
}
