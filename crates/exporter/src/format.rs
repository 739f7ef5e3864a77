//! Text formats shared by the pose table and focal file

/// Scientific notation with 18 fractional digits and a signed, two-digit
/// exponent, e.g. `1.500000000000000000e+00`.
pub fn sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let raw = format!("{value:.18e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// One pose table row: values joined by single spaces
pub fn pose_line(row: &[f64]) -> String {
    row.iter().map(|v| sci(*v)).collect::<Vec<_>>().join(" ")
}
