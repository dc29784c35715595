//! Parsing des quantités de ressources Kubernetes (`16Gi`, `1024Ki`, `129e6`, `100m`...)
//!
//! L'API renvoie la mémoire sous forme texte ; on la ramène en octets entiers.
//! Une valeur fractionnaire est arrondie à l'octet supérieur.

use crate::error::{MonitorError, MonitorResult};

/// Décimales conservées sous l'unité finale ; au-delà on tronque et on arrondit
/// vers le haut (reste < 0,2 octet même pour `Ei`)
const MAX_FRACTION_DIGITS: usize = 19;

/// Convertit une quantité Kubernetes en nombre d'octets
pub fn parse_bytes(raw: &str) -> MonitorResult<i64> {
    let invalid = || MonitorError::Quantity(raw.to_string());
    let text = raw.trim();

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        Some(_) => (false, text),
        None => return Err(invalid()),
    };

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    // mantisse entière + nombre de décimales
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let (binary_mult, decimal_exp) = suffix_scale(suffix).ok_or_else(invalid)?;

    // décimales trop fines pour l'i128 : un reste non nul force l'arrondi
    let keep = MAX_FRACTION_DIGITS + decimal_exp.max(0) as usize;
    let (frac_part, truncated) = if frac_part.len() > keep {
        let (kept, dropped) = frac_part.split_at(keep);
        (kept, dropped.bytes().any(|b| b != b'0'))
    } else {
        (frac_part, false)
    };
    let frac_digits = frac_part.len() as u32;
    let digits = format!("{int_part}{frac_part}");
    let mantissa: i128 = digits.parse().map_err(|_| invalid())?;

    let mut numerator = mantissa.checked_mul(binary_mult).ok_or_else(invalid)?;
    let mut denominator: i128 = 10i128.pow(frac_digits);
    if decimal_exp >= 0 {
        let scale = 10i128.checked_pow(decimal_exp as u32).ok_or_else(invalid)?;
        numerator = numerator.checked_mul(scale).ok_or_else(invalid)?;
    } else {
        let scale = 10i128.checked_pow((-decimal_exp) as u32).ok_or_else(invalid)?;
        denominator = denominator.checked_mul(scale).ok_or_else(invalid)?;
    }

    // arrondi vers le haut, comme Quantity.Value()
    let mut bytes = numerator / denominator;
    if truncated || numerator % denominator != 0 {
        bytes += 1;
    }
    if negative {
        bytes = -bytes;
    }
    i64::try_from(bytes).map_err(|_| invalid())
}

/// Retourne (multiplicateur binaire, exposant décimal) pour un suffixe
fn suffix_scale(suffix: &str) -> Option<(i128, i32)> {
    let scale = match suffix {
        "" => (1, 0),
        "Ki" => (1 << 10, 0),
        "Mi" => (1 << 20, 0),
        "Gi" => (1 << 30, 0),
        "Ti" => (1 << 40, 0),
        "Pi" => (1 << 50, 0),
        "Ei" => (1 << 60, 0),
        "n" => (1, -9),
        "u" => (1, -6),
        "m" => (1, -3),
        "k" => (1, 3),
        "M" => (1, 6),
        "G" => (1, 9),
        "T" => (1, 12),
        "P" => (1, 15),
        "E" => (1, 18),
        other => {
            let exp = other.strip_prefix(['e', 'E'])?;
            (1, exp.parse::<i32>().ok().filter(|e| e.abs() <= 30)?)
        }
    };
    Some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_suffixes() {
        assert_eq!(parse_bytes("16Gi").unwrap(), 16 * 1024 * 1024 * 1024);
        assert_eq!(parse_bytes("1024Ki").unwrap(), 1024 * 1024);
        assert_eq!(parse_bytes("512Mi").unwrap(), 512 * 1024 * 1024);
    }

    #[test]
    fn test_decimal_forms() {
        assert_eq!(parse_bytes("1G").unwrap(), 1_000_000_000);
        assert_eq!(parse_bytes("128974848").unwrap(), 128_974_848);
        assert_eq!(parse_bytes("129e6").unwrap(), 129_000_000);
        assert_eq!(parse_bytes("1.5Gi").unwrap(), 1_610_612_736);
        assert_eq!(parse_bytes("0").unwrap(), 0);
    }

    #[test]
    fn test_fractions_round_up() {
        assert_eq!(parse_bytes("100m").unwrap(), 1);
        assert_eq!(parse_bytes("1500m").unwrap(), 2);
        assert_eq!(parse_bytes("0.1").unwrap(), 1);
    }

    #[test]
    fn test_signed() {
        assert_eq!(parse_bytes("-1Ki").unwrap(), -1024);
        assert_eq!(parse_bytes("+2k").unwrap(), 2000);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_bytes("").is_err());
        assert!(parse_bytes("abc").is_err());
        assert!(parse_bytes("12Xi").is_err());
        assert!(parse_bytes(".").is_err());
        assert!(parse_bytes("1.2.3").is_err());
        assert!(parse_bytes("99999999999Ei").is_err());
        assert!(parse_bytes("1.00000000000000000000.5").is_err());
    }

    #[test]
    fn test_long_fraction_truncated_round_up() {
        assert_eq!(parse_bytes("0.12345678901234567890123").unwrap(), 1);
        assert_eq!(parse_bytes("1.00000000000000000001Ki").unwrap(), 1025);
        assert_eq!(parse_bytes("2.000000000000000000000000").unwrap(), 2);
        assert_eq!(parse_bytes("0.0000000000000000001e30").unwrap(), 100_000_000_000);
        assert_eq!(parse_bytes("-1.0000000000000000000001").unwrap(), -2);
        assert_eq!(parse_bytes("1.5000000000000000000000Gi").unwrap(), 1_610_612_736);
    }
}
