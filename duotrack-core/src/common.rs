use serde::de::{self, Visitor};
use serde_with::DeserializeAs;

use crate::error::Result;

/// A wrapped [`reqwest::Client`] that always identifies itself.
/// Public geocoders (Nominatim in particular) refuse anonymous clients.
#[derive(Clone)]
pub struct Client(pub reqwest::Client);

impl Client {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self(
            reqwest::Client::builder()
                .user_agent(user_agent.to_string())
                .build()?,
        ))
    }
}

/// Accept a number either as a JSON number or as a string holding one.
/// Nominatim sends `"lat": "48.8566"`, Photon sends plain numbers.
pub struct NumberOrString;

impl<'de> DeserializeAs<'de, f64> for NumberOrString {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<f64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Helper;

        impl<'de> Visitor<'de> for Helper {
            type Value = f64;

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E> {
                Ok(v)
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(v as f64)
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(v as f64)
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.trim()
                    .parse()
                    .map_err(|_| E::custom(format!("`{}` is not a number", v)))
            }

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number, or a string containing one")
            }
        }

        deserializer.deserialize_any(Helper)
    }
}

/// Trim and collapse runs of whitespace, so "  cafe   de  flore " and "cafe de flore"
/// are the same query.
pub fn normalize_query<S: AsRef<str>>(s: S) -> String {
    s.as_ref().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_with::serde_as;

    use super::{normalize_query, NumberOrString};

    #[serde_as]
    #[derive(Deserialize)]
    struct Point {
        #[serde_as(as = "NumberOrString")]
        lat: f64,
    }

    #[test]
    fn test_number_or_string() {
        let a: Point = serde_json::from_str(r#"{ "lat": "48.8566" }"#).unwrap();
        let b: Point = serde_json::from_str(r#"{ "lat": 48.8566 }"#).unwrap();
        let c: Point = serde_json::from_str(r#"{ "lat": 48 }"#).unwrap();
        assert_eq!(a.lat, 48.8566);
        assert_eq!(b.lat, 48.8566);
        assert_eq!(c.lat, 48.0);
        assert!(serde_json::from_str::<Point>(r#"{ "lat": "north" }"#).is_err());
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  cafe   de\tflore "), "cafe de flore");
        assert_eq!(normalize_query("   "), "");
    }
}
