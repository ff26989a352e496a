//! Physical unit recognition and unit algebra.
//!
//! The lexer turns `220 V` into a single [`UnitLiteral`] token when a
//! recognised unit follows a numeric literal with at most one intervening
//! space. The recognised set is closed and enumerated in [`is_recognized`];
//! it is matched longest-first so `m/s²` wins over `m`.
//!
//! The type checker reuses this module for unit algebra on arithmetic:
//! `m · m` squares to `m²`, `m / m` cancels, and an empty unit absorbs into
//! the other operand.

/// A numeric value paired with a recognised physical unit.
///
/// Equality is structural; the value compares bit-exactly so unit literals
/// can participate in constant-pool style de-duplication.
#[derive(Debug, Clone)]
pub struct UnitLiteral {
    pub value: f64,
    pub unit: String,
}

impl UnitLiteral {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl PartialEq for UnitLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.value.to_bits() == other.value.to_bits() && self.unit == other.unit
    }
}

impl Eq for UnitLiteral {}

impl std::fmt::Display for UnitLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// The closed set of unit spellings the lexer recognises.
///
/// Electrical, time, length, mass, temperature, force, pressure, energy,
/// information, angular, area, volume, speed, acceleration, and the SI base
/// units. Anything else after a number is an identifier, not a unit.
pub fn is_recognized(unit: &str) -> bool {
    matches!(
        unit,
        // Electrical
        "V" | "A" | "Ω" | "W" | "Wh" | "kWh" | "VA" | "VAR" | "F" | "H" | "S"
            | "mV" | "kV" | "mA" | "kA" | "mW" | "kW" | "MW" | "µF" | "mH" | "µH"
            | "Hz" | "kHz" | "MHz" | "GHz" | "THz"
        // Time
            | "s" | "ms" | "µs" | "ns" | "ps" | "min" | "h" | "d"
        // Length
            | "m" | "mm" | "cm" | "km" | "µm" | "nm" | "pm" | "in" | "ft" | "yd" | "mi"
        // Mass
            | "g" | "kg" | "mg" | "µg" | "t" | "lb" | "oz"
        // Temperature
            | "K" | "°C" | "°F" | "°R"
        // Force
            | "N" | "kN" | "lbf"
        // Pressure
            | "Pa" | "kPa" | "MPa" | "GPa" | "bar" | "mbar" | "atm" | "psi" | "Torr"
        // Energy
            | "J" | "kJ" | "MJ" | "cal" | "kcal" | "eV" | "keV" | "MeV" | "GeV"
        // Information
            | "bit" | "B" | "KB" | "MB" | "GB" | "TB" | "PB" | "Kbit" | "Mbit" | "Gbit"
        // Angular
            | "rad" | "deg" | "°" | "grad" | "arcmin" | "arcsec"
        // Area
            | "m²" | "cm²" | "mm²" | "km²" | "ft²" | "in²"
        // Volume
            | "m³" | "cm³" | "mm³" | "L" | "mL" | "gal" | "qt" | "pt" | "fl oz"
        // Speed
            | "m/s" | "km/h" | "mph" | "ft/s" | "knot"
        // Acceleration
            | "m/s²"
        // SI base
            | "mol" | "cd" | "lm" | "lx"
    )
}

/// The longest recognised unit length, in characters.
///
/// Bounds the lexer's look-ahead window (`arcmin` and `arcsec` at six).
pub const MAX_UNIT_CHARS: usize = 6;

/// The product of two unit strings.
///
/// `u · u` canonicalises to `u²` (and `u² · u` to `u³`); an empty unit
/// absorbs into the other operand; anything else joins with `·`.
pub fn unit_mul(a: &str, b: &str) -> String {
    if a.is_empty() {
        return b.to_string();
    }
    if b.is_empty() {
        return a.to_string();
    }
    if a == b {
        return format!("{a}²");
    }
    if let Some(base) = a.strip_suffix('²') {
        if base == b {
            return format!("{base}³");
        }
    }
    if let Some(base) = b.strip_suffix('²') {
        if base == a {
            return format!("{base}³");
        }
    }
    format!("{a}·{b}")
}

/// The quotient of two unit strings.
///
/// `u / u` cancels to the empty unit; dividing by the empty unit is a
/// no-op; a dimensionless numerator renders as `1/u`.
pub fn unit_div(a: &str, b: &str) -> String {
    if b.is_empty() {
        return a.to_string();
    }
    if a == b {
        return String::new();
    }
    if a.is_empty() {
        return format!("1/{b}");
    }
    format!("{a}/{b}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_units_are_recognized() {
        for unit in ["V", "kWh", "µs", "°C", "m/s²", "fl oz", "mol"] {
            assert!(is_recognized(unit), "{unit} should be recognised");
        }
    }

    #[test]
    fn near_misses_are_not_units() {
        for text in ["Volts", "sec", "meters", "KG", "v"] {
            assert!(!is_recognized(text), "{text} should not be recognised");
        }
    }

    #[test]
    fn squaring_a_unit() {
        assert_eq!(unit_mul("m", "m"), "m²");
        assert_eq!(unit_mul("m²", "m"), "m³");
        assert_eq!(unit_mul("m", "s"), "m·s");
    }

    #[test]
    fn empty_unit_absorbs() {
        assert_eq!(unit_mul("", "kg"), "kg");
        assert_eq!(unit_mul("kg", ""), "kg");
    }

    #[test]
    fn division_cancels_equal_units() {
        assert_eq!(unit_div("m", "m"), "");
        assert_eq!(unit_div("m", "s"), "m/s");
        assert_eq!(unit_div("", "s"), "1/s");
        assert_eq!(unit_div("m", ""), "m");
    }

    #[test]
    fn unit_literal_equality_is_bit_exact() {
        assert_eq!(UnitLiteral::new(220.0, "V"), UnitLiteral::new(220.0, "V"));
        assert_ne!(UnitLiteral::new(220.0, "V"), UnitLiteral::new(220.0, "A"));
        assert_ne!(UnitLiteral::new(0.0, "V"), UnitLiteral::new(-0.0, "V"));
    }
}
