use serde::{Deserialize, Serialize};

use crate::convert::Temperatures;

/// Body accepted by both the gateway and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepRequest {
    pub cep: String,
}

/// City and state resolved from a postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub celsius: f64,
}

/// Terminal payload returned to the caller on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub city: String,
    #[serde(rename = "temp_C")]
    pub temp_celsius: f64,
    #[serde(rename = "temp_F")]
    pub temp_fahrenheit: f64,
    #[serde(rename = "temp_K")]
    pub temp_kelvin: f64,
}

impl WeatherResult {
    pub fn new(city: impl Into<String>, temps: Temperatures) -> Self {
        Self {
            city: city.into(),
            temp_celsius: temps.celsius,
            temp_fahrenheit: temps.fahrenheit,
            temp_kelvin: temps.kelvin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert;

    #[test]
    fn weather_result_uses_scale_suffixed_keys() {
        let result = WeatherResult::new("São Paulo", convert(25.0));
        let json = serde_json::to_string(&result).unwrap();

        assert_eq!(json, r#"{"city":"São Paulo","temp_C":25.0,"temp_F":77.0,"temp_K":298.0}"#);
    }

    #[test]
    fn cep_request_ignores_unknown_fields() {
        let req: CepRequest = serde_json::from_str(r#"{"cep":"01001000","extra":1}"#).unwrap();
        assert_eq!(req.cep, "01001000");
    }
}
