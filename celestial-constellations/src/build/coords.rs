//! Coordinate normalization for boundary vertices.
//!
//! Boundary files carry right ascension as space-separated sexagesimal hours
//! (`"05 34 31.94"`) and declination as plain decimal degrees (`"+22.0145"`).
//! Both are normalized to degrees rounded to six decimal places, so the same
//! input text always yields the same stored value.

use crate::error::{CatalogError, CatalogResult};

/// Decimal places kept on every normalized coordinate.
pub const COORDINATE_PRECISION: usize = 6;

const DEGREES_PER_HOUR: f64 = 15.0;

/// Parse `"H M S"` right ascension into degrees in `[0, 360)` for valid input.
///
/// Computes `15 × (h + m/60 + s/3600)` rounded to six decimals.
///
/// # Errors
/// [`CatalogError::MalformedCoordinate`] unless the text splits into exactly
/// three finite, non-negative numbers.
pub fn parse_right_ascension(text: &str) -> CatalogResult<f64> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [h, m, s] = parts.as_slice() else {
        return Err(CatalogError::malformed_coordinate(
            text,
            &format!(
                "expected 3 sexagesimal components (hours minutes seconds), found {}",
                parts.len()
            ),
        ));
    };

    let hours = sexagesimal_component(text, h, "hours")?;
    let minutes = sexagesimal_component(text, m, "minutes")?;
    let seconds = sexagesimal_component(text, s, "seconds")?;

    Ok(round6(
        DEGREES_PER_HOUR * (hours + minutes / 60.0 + seconds / 3600.0),
    ))
}

/// Parse decimal-degree declination text, rounded to six decimals.
///
/// # Errors
/// [`CatalogError::MalformedCoordinate`] on non-numeric or non-finite input.
pub fn parse_declination(text: &str) -> CatalogResult<f64> {
    let value: f64 = text.trim().parse().map_err(|_| {
        CatalogError::malformed_coordinate(text, "declination is not a decimal number")
    })?;
    if !value.is_finite() {
        return Err(CatalogError::malformed_coordinate(
            text,
            "declination is not finite",
        ));
    }
    Ok(round6(value))
}

fn sexagesimal_component(input: &str, part: &str, label: &str) -> CatalogResult<f64> {
    let value: f64 = part.parse().map_err(|_| {
        CatalogError::malformed_coordinate(input, &format!("{} '{}' is not a number", label, part))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(CatalogError::malformed_coordinate(
            input,
            &format!("{} must be a finite non-negative number", label),
        ));
    }
    Ok(value)
}

/// Round to `places` decimal places.
///
/// Rounds the exact binary value of `value` with ties to even, via correctly
/// rounded decimal formatting. Scaling by `10^places` first rounds the
/// product instead, which differs on 7-decimal boundary data.
pub fn round_to(value: f64, places: usize) -> f64 {
    let rounded = format!("{:.*}", places, value)
        .parse::<f64>()
        .unwrap_or(value);
    // Avoid emitting -0.0 for values that round to zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[inline]
pub fn round6(value: f64) -> f64 {
    round_to(value, COORDINATE_PRECISION)
}
