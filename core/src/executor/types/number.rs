//! Number formatting and parsing with JavaScript semantics
//!
//! Expressions observe numbers through their string forms (interpolation,
//! `toFixed`, `$string`), so these follow the ECMAScript algorithms rather
//! than Rust's `Display` output.

/// Enough fractional digits to print any `f64` exactly
const EXACT_DIGITS: usize = 1100;

/// Decimal digits and exponent of the shortest round-tripping form.
///
/// Returns `(digits, exponent)` where the value is `0.d1d2d3... * 10^(exponent + 1)`
/// in the sense of `d1.d2d3... * 10^exponent`.
fn shortest_digits(x: f64) -> (String, i32) {
    split_exponential(&format!("{:e}", x.abs()))
}

/// Splits Rust's `{:e}` output (`1.2345e-7`) into digits and exponent
fn split_exponential(formatted: &str) -> (String, i32) {
    let (mantissa, exp) = formatted.split_once('e').unwrap_or((formatted, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    (digits, exp.parse().unwrap_or(0))
}

/// `Number.prototype.toString()` with radix 10
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let sign = if x < 0.0 { "-" } else { "" };
    let (digits, exp) = shortest_digits(x);
    let k = digits.len() as i32;
    let n = exp + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        exponential_form(&digits, n - 1)
    };
    format!("{}{}", sign, body)
}

fn exponential_form(digits: &str, exp: i32) -> String {
    let exp_sign = if exp < 0 { "-" } else { "+" };
    if digits.len() > 1 {
        format!("{}.{}e{}{}", &digits[..1], &digits[1..], exp_sign, exp.abs())
    } else {
        format!("{}e{}{}", digits, exp_sign, exp.abs())
    }
}

/// `ToNumber` applied to a string
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            if rest.is_empty() {
                return f64::NAN;
            }
            return rest.chars().try_fold(0.0, |acc, c| {
                c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
            })
            .unwrap_or(f64::NAN);
        }
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    // Rust also accepts "inf" and "nan", which are not numeric literals here
    let well_formed = !unsigned.is_empty()
        && unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && unsigned.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.');
    if !well_formed {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

/// `ToIntegerOrInfinity`
pub fn to_integer_or_infinity(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.trunc()
    }
}

/// Rounds a digit string up by one unit in the last place.
/// Returns true when the carry produced an extra leading digit.
fn increment_digits(digits: &mut Vec<u8>) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return false;
        }
    }
    digits.insert(0, b'1');
    true
}

/// `Number.prototype.toFixed`
pub fn to_fixed(x: f64, fraction_digits: f64) -> Result<String, String> {
    let f = to_integer_or_infinity(fraction_digits);
    if !(0.0..=100.0).contains(&f) {
        return Err("toFixed() digits argument must be between 0 and 100".to_string());
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Ok(format_number(x));
    }
    let f = f as usize;

    let exact = format!("{:.*}", EXACT_DIGITS, x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((&exact, ""));
    let mut digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes().take(f)).collect();
    // Ties round away from zero ("let n be the larger")
    if frac_part.as_bytes().get(f).is_some_and(|d| *d >= b'5') {
        increment_digits(&mut digits);
    }

    let split = digits.len() - f;
    let int_digits = String::from_utf8_lossy(&digits[..split]).into_owned();
    let mut out = if x < 0.0 { "-".to_string() } else { String::new() };
    out.push_str(&int_digits);
    if f > 0 {
        out.push('.');
        out.push_str(&String::from_utf8_lossy(&digits[split..]));
    }
    Ok(out)
}

/// Significant digits of |x| rounded to `precision` places, with the
/// decimal exponent of the first digit. Ties round up.
fn round_significant(x: f64, precision: usize) -> (Vec<u8>, i32) {
    let exact = format!("{:.*e}", EXACT_DIGITS, x.abs());
    let (all_digits, mut exp) = split_exponential(&exact);
    let bytes = all_digits.as_bytes();
    let mut digits: Vec<u8> = bytes.iter().take(precision).copied().collect();
    if bytes.get(precision).is_some_and(|d| *d >= b'5') && increment_digits(&mut digits) {
        digits.pop();
        exp += 1;
    }
    (digits, exp)
}

/// `Number.prototype.toPrecision`
pub fn to_precision(x: f64, precision: Option<f64>) -> Result<String, String> {
    let Some(precision) = precision else {
        return Ok(format_number(x));
    };
    let p = to_integer_or_infinity(precision);
    if !x.is_finite() {
        return Ok(format_number(x));
    }
    if !(1.0..=100.0).contains(&p) {
        return Err("toPrecision() argument must be between 1 and 100".to_string());
    }
    let p = p as usize;
    let sign = if x < 0.0 { "-" } else { "" };

    if x == 0.0 {
        return Ok(if p > 1 {
            format!("0.{}", "0".repeat(p - 1))
        } else {
            "0".to_string()
        });
    }

    let (digits, e) = round_significant(x, p);
    let digits = String::from_utf8_lossy(&digits).into_owned();
    let body = if e < -6 || e >= p as i32 {
        exponential_form(&digits, e)
    } else if e == p as i32 - 1 {
        digits
    } else if e >= 0 {
        let split = (e + 1) as usize;
        format!("{}.{}", &digits[..split], &digits[split..])
    } else {
        format!("0.{}{}", "0".repeat((-(e + 1)) as usize), digits)
    };
    Ok(format!("{}{}", sign, body))
}

/// `Number.prototype.toExponential`
pub fn to_exponential(x: f64, fraction_digits: Option<f64>) -> Result<String, String> {
    let f = fraction_digits.map(to_integer_or_infinity);
    if !x.is_finite() {
        return Ok(format_number(x));
    }
    if let Some(f) = f {
        if !(0.0..=100.0).contains(&f) {
            return Err("toExponential() argument must be between 0 and 100".to_string());
        }
    }
    let sign = if x < 0.0 { "-" } else { "" };

    let (digits, e) = match f {
        _ if x == 0.0 => {
            let zeros = f.map(|f| f as usize).unwrap_or(0);
            ("0".repeat(zeros + 1), 0)
        }
        Some(f) => {
            let (digits, e) = round_significant(x, f as usize + 1);
            (String::from_utf8_lossy(&digits).into_owned(), e)
        }
        None => shortest_digits(x),
    };
    Ok(format!("{}{}", sign, exponential_form(&digits, e)))
}

/// `Number.prototype.toString(radix)`
pub fn to_radix_string(x: f64, radix: Option<f64>) -> Result<String, String> {
    let radix = radix.map(to_integer_or_infinity).unwrap_or(10.0);
    if !(2.0..=36.0).contains(&radix) {
        return Err("toString() radix must be between 2 and 36".to_string());
    }
    if radix == 10.0 || !x.is_finite() {
        return Ok(format_number(x));
    }
    let radix = radix as u32;
    let sign = if x < 0.0 { "-" } else { "" };
    let magnitude = x.abs();

    let mut int_part = magnitude.trunc();
    let mut int_digits = Vec::new();
    loop {
        let digit = (int_part % radix as f64) as u32;
        int_digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        int_part = (int_part / radix as f64).trunc();
        if int_part < 1.0 {
            break;
        }
    }
    let mut out: String = int_digits.into_iter().rev().collect();

    let mut frac = magnitude.fract();
    if frac > 0.0 {
        out.push('.');
        // 52 fractional digits cover the mantissa in base 2
        for _ in 0..52 {
            frac *= radix as f64;
            let digit = frac.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            frac -= digit as f64;
            if frac == 0.0 {
                break;
            }
        }
    }
    Ok(format!("{}{}", sign, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_canonical_forms() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(123456789.0), "123456789");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(-1.5e-10), "-1.5e-10");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("  12.5 "), 12.5);
        assert_eq!(parse_number("0x1f"), 31.0);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(parse_number(".5"), 0.5);
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("nan").is_nan());
        assert!(parse_number("12px").is_nan());
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(110.0, 2.0).unwrap(), "110.00");
        assert_eq!(to_fixed(109.985, 2.0).unwrap(), "109.98");
        assert_eq!(to_fixed(2.5, 0.0).unwrap(), "3");
        assert_eq!(to_fixed(-2.5, 0.0).unwrap(), "-3");
        assert_eq!(to_fixed(1.005, 2.0).unwrap(), "1.00");
        assert_eq!(to_fixed(0.000001, 3.0).unwrap(), "0.000");
        assert_eq!(to_fixed(99.995, 1.0).unwrap(), "100.0");
        assert_eq!(to_fixed(1e21, 2.0).unwrap(), "1e+21");
        assert!(to_fixed(1.0, 101.0).is_err());
    }

    #[test]
    fn test_to_precision() {
        assert_eq!(to_precision(123.456, Some(4.0)).unwrap(), "123.5");
        assert_eq!(to_precision(0.000123, Some(2.0)).unwrap(), "0.00012");
        assert_eq!(to_precision(123456.0, Some(2.0)).unwrap(), "1.2e+5");
        assert_eq!(to_precision(99.99, Some(3.0)).unwrap(), "100");
        assert_eq!(to_precision(0.0, Some(3.0)).unwrap(), "0.00");
        assert_eq!(to_precision(1.5, None).unwrap(), "1.5");
        assert!(to_precision(1.0, Some(0.0)).is_err());
    }

    #[test]
    fn test_to_exponential() {
        assert_eq!(to_exponential(123456.0, Some(2.0)).unwrap(), "1.23e+5");
        assert_eq!(to_exponential(0.00015, None).unwrap(), "1.5e-4");
        assert_eq!(to_exponential(5.0, None).unwrap(), "5e+0");
        assert_eq!(to_exponential(0.0, Some(2.0)).unwrap(), "0.00e+0");
    }

    #[test]
    fn test_to_radix_string() {
        assert_eq!(to_radix_string(255.0, Some(16.0)).unwrap(), "ff");
        assert_eq!(to_radix_string(-10.0, Some(2.0)).unwrap(), "-1010");
        assert_eq!(to_radix_string(0.5, Some(2.0)).unwrap(), "0.1");
        assert_eq!(to_radix_string(42.0, None).unwrap(), "42");
        assert!(to_radix_string(1.0, Some(1.0)).is_err());
    }
}
