//! Celsius to Fahrenheit/Kelvin conversion.

/// Offset used for Kelvin. Deliberately 273, not 273.15.
pub const KELVIN_OFFSET: f64 = 273.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    pub celsius: f64,
    pub fahrenheit: f64,
    pub kelvin: f64,
}

/// Derive all three scales from a Celsius reading, each rounded to one decimal.
pub fn convert(celsius: f64) -> Temperatures {
    Temperatures {
        celsius: round1(celsius),
        fahrenheit: round1(celsius * 1.8 + 32.0),
        kelvin: round1(celsius + KELVIN_OFFSET),
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freezing_point() {
        assert_eq!(
            convert(0.0),
            Temperatures { celsius: 0.0, fahrenheit: 32.0, kelvin: 273.0 }
        );
    }

    #[test]
    fn boiling_point() {
        assert_eq!(
            convert(100.0),
            Temperatures { celsius: 100.0, fahrenheit: 212.0, kelvin: 373.0 }
        );
    }

    #[test]
    fn scales_cross_at_minus_forty() {
        assert_eq!(
            convert(-40.0),
            Temperatures { celsius: -40.0, fahrenheit: -40.0, kelvin: 233.0 }
        );
    }

    #[test]
    fn kelvin_uses_integer_offset() {
        // 25 °C is reported as 298.0 K, not 298.15.
        assert_eq!(convert(25.0).kelvin, 298.0);
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(round1(98.45), 98.5);
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(-0.25), -0.3);
        assert_eq!(round1(-0.05), -0.1);
    }

    #[test]
    fn fahrenheit_half_step_rounds_up() {
        // 36.25 °C is exactly 97.25 °F.
        assert_eq!(convert(36.25).fahrenheit, 97.3);
    }

    #[test]
    fn each_scale_rounded_independently() {
        let t = convert(21.34);
        assert_eq!(t.celsius, 21.3);
        assert_eq!(t.fahrenheit, 70.4);
        assert_eq!(t.kelvin, 294.3);
    }
}
