use std::{fs, path::Path};

use beatmap_schema::Beatmap;

mod error;
mod parser;


pub use error::{LoadError, ParseWarning, WarningKind};

/// A parsed beatmap together with every line that had to be skipped or
/// defaulted along the way.
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub beatmap: Beatmap,
    pub warnings: Vec<ParseWarning>,
}

/// Parses beatmap text. Malformed lines are logged and skipped; this never fails.
pub fn parse_beatmap(src: &str) -> Beatmap {
    parse_with_report(src).beatmap
}

pub fn parse_with_report(src: &str) -> ParseReport {
    parser::parse_document(src)
}

pub fn load_beatmap(path: impl AsRef<Path>) -> Result<Beatmap, LoadError> {
    load_with_report(path).map(|report| report.beatmap)
}

pub fn load_with_report(path: impl AsRef<Path>) -> Result<ParseReport, LoadError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|source| {
        log::error!("beatmap file not readable: {} ({source})", path.display());
        LoadError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(parse_with_report(&src))
}
