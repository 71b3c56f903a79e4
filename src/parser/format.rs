//! Log format detection and the parser interface shared by every vendor.

use super::hotspot::HotSpotLogParser;
use super::j9::J9LogParser;
use super::zing::{classify_line, ZingLineKind, ZingLogParser};
use crate::model::JitModel;
use crate::utils::config::FORMAT_DETECTION_LINES;
use crate::utils::diagnostics::Diagnostics;
use crate::utils::error::ParseError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// JIT log dialects understood by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    HotSpot,
    J9,
    Zing,
}

impl LogFormat {
    /// Guess the format from the first lines of a log
    ///
    /// Returns `None` when no line carries a recognisable shape.
    pub fn detect<S: AsRef<str>>(first_lines: &[S]) -> Option<LogFormat> {
        for line in first_lines.iter().take(FORMAT_DETECTION_LINES) {
            let line = line.as_ref().trim_start();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('<') {
                return Some(LogFormat::HotSpot);
            }
            if super::j9::is_j9_compile_line(line) {
                return Some(LogFormat::J9);
            }
            if classify_line(line) != ZingLineKind::Other {
                return Some(LogFormat::Zing);
            }
        }
        None
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogFormat::HotSpot => "hotspot",
            LogFormat::J9 => "j9",
            LogFormat::Zing => "zing",
        }
    }

    /// Fresh streaming parser for this format
    pub fn parser(&self) -> Box<dyn JitLogParser> {
        match self {
            LogFormat::HotSpot => Box::new(HotSpotLogParser::new()),
            LogFormat::J9 => Box::new(J9LogParser::new()),
            LogFormat::Zing => Box::new(ZingLogParser::new()),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LogFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hotspot" | "openjdk" => Ok(LogFormat::HotSpot),
            "j9" | "openj9" => Ok(LogFormat::J9),
            "zing" | "prime" => Ok(LogFormat::Zing),
            other => Err(ParseError::InvalidFormat(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

/// A push-driven parser for one log source
///
/// Lines arrive one at a time in file order. Each call does a bounded amount
/// of work and never blocks, so a caller may tail a log that is still being
/// written.
pub trait JitLogParser {
    fn format(&self) -> LogFormat;

    /// Feed one raw line, applying any resulting events to `model`
    fn process_line(&mut self, line: &str, model: &mut JitModel, diagnostics: &mut Diagnostics);

    /// Called once when the source is exhausted
    fn finish(&mut self, _model: &mut JitModel, _diagnostics: &mut Diagnostics) {}
}

/// Drive a parser over a whole sequence of lines
///
/// **Public** - convenience entry point for callers that already hold the log
///
/// Line numbers (1-based) are recorded on diagnostics as lines are fed.
pub fn parse_lines<I, S>(
    parser: &mut dyn JitLogParser,
    lines: I,
    model: &mut JitModel,
    diagnostics: &mut Diagnostics,
) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut count = 0;
    for (idx, line) in lines.into_iter().enumerate() {
        diagnostics.set_line(idx + 1);
        parser.process_line(line.as_ref(), model, diagnostics);
        count += 1;
    }
    parser.finish(model, diagnostics);
    debug!("Fed {} lines to the {} parser", count, parser.format());
    info!(
        "Parsed {} members with {} compilations",
        model.member_count(),
        model.compilation_count()
    );
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hotspot() {
        let lines = ["<?xml version='1.0' encoding='UTF-8'?>", "<hotspot_log>"];
        assert_eq!(LogFormat::detect(&lines), Some(LogFormat::HotSpot));
    }

    #[test]
    fn test_detect_j9() {
        let lines = [
            "#INFO:  StartTime: Jan 01 00:00:00 2024",
            "+ (cold) java/lang/Double.longBitsToDouble(J)D @ 00007F6BE4A00034-00007F6BE4A00064 OrdinaryMethod - Q_SZ=0 bcsz=3 JNI",
        ];
        assert_eq!(LogFormat::detect(&lines), Some(LogFormat::J9));
    }

    #[test]
    fn test_detect_zing() {
        let lines = ["   1.234: 17   2  java.lang.String::hashCode()I (60) (55 bytes)"];
        assert_eq!(LogFormat::detect(&lines), Some(LogFormat::Zing));
    }

    #[test]
    fn test_detect_nothing() {
        let lines = ["hello", "", "world"];
        assert_eq!(LogFormat::detect(&lines), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("HotSpot".parse::<LogFormat>().unwrap(), LogFormat::HotSpot);
        assert_eq!("prime".parse::<LogFormat>().unwrap(), LogFormat::Zing);
        assert!("graal".parse::<LogFormat>().is_err());
    }
}
