//! Parses the CPU revision literal (`r<release>p<part>`) found in SVD's
//! `<cpu><revision>` element.

use thiserror::Error;

/// A decoded `r<release>p<part>` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub release: u32,
    pub part: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevisionError {
    #[error("malformed revision literal {0:?}")]
    Malformed(String),
    #[error("invalid digits in revision literal {0:?}")]
    InvalidDigit(String),
}

/// Parses `text` as `r<release>p<part>`, e.g. `"r1p2"` → `{release: 1, part: 2}`.
pub fn parse(text: &str) -> Result<Revision, RevisionError> {
    let rest = text
        .strip_prefix('r')
        .ok_or_else(|| RevisionError::Malformed(text.to_string()))?;
    let p_at = rest
        .find('p')
        .ok_or_else(|| RevisionError::Malformed(text.to_string()))?;
    let (release_str, after_release) = rest.split_at(p_at);
    let part_str = &after_release[1..];

    let release = release_str
        .parse()
        .map_err(|_| RevisionError::InvalidDigit(release_str.to_string()))?;
    let part = part_str
        .parse()
        .map_err(|_| RevisionError::InvalidDigit(part_str.to_string()))?;
    Ok(Revision { release, part })
}
