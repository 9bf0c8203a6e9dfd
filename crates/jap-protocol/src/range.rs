//! Port range expressions
//!
//! Both switch vendors print VLAN membership as comma separated lists of
//! single ports and inclusive `low-high` runs, e.g. `11,13-15,20`.

use crate::error::ParseError;

/// Expand a range expression into the port numbers it names, in document order
///
/// Runs expand in ascending order. A run whose upper bound is below its lower
/// bound yields no ports. Whitespace around entries is ignored; empty entries
/// (such as the one produced by a trailing comma) are skipped.
pub fn expand_range(expr: &str) -> Result<Vec<u16>, ParseError> {
    let mut ports = Vec::new();

    for entry in expr.split(',').map(str::trim) {
        if entry.is_empty() {
            continue;
        }

        match entry.split_once('-') {
            None => ports.push(parse_port(entry)?),
            Some((low, high)) => {
                let low = parse_port(low.trim())?;
                let high = parse_port(high.trim())?;
                ports.extend(low..=high);
            }
        }
    }

    Ok(ports)
}

fn parse_port(s: &str) -> Result<u16, ParseError> {
    s.parse::<u16>()
        .map_err(|_| ParseError::InvalidPortRange(s.to_string()))
}
