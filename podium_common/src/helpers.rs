/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Round a floating-point score to two decimal places. Final scores are stored and compared at
/// this precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::round2;

    #[test]
    fn round2_is_bankers_free() {
        assert_eq!(round2(8.0 / 3.0), 2.67);
        assert_eq!(round2(8.125), 8.13);
        assert_eq!(round2(9.0), 9.0);
    }
}
