use async_trait::async_trait;
use duotrack_core::{
    common::{Client, NumberOrString},
    geo::{Candidate, Coordinates, Geocoder},
    Error, Result,
};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::debug;

/// OpenStreetMap's Nominatim search and reverse geocoding.
pub struct Nominatim {
    client: Client,
    base_url: String,
    limit: usize,
}

impl Nominatim {
    pub fn new(client: Client, base_url: &str, limit: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
struct RawPlace {
    #[serde(default)]
    name: Option<String>,
    display_name: String,
    #[serde_as(as = "NumberOrString")]
    lat: f64,
    #[serde_as(as = "NumberOrString")]
    lon: f64,
}

impl RawPlace {
    fn into_candidate(self) -> Result<Candidate> {
        let RawPlace {
            name,
            display_name,
            lat,
            lon,
        } = self;
        let name = name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| display_name.split(',').next().map(|s| s.trim().to_string()))
            .unwrap_or_default();
        Ok(Candidate {
            name,
            address: Some(display_name),
            coordinates: Coordinates::new(lat, lon)?,
            distance_m: None,
        })
    }
}

/// `/reverse` answers `{"error": "Unable to geocode"}` when there is nothing there.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReverse {
    Found(RawPlace),
    Missing { error: String },
}

fn parse_search(body: &str) -> Result<Vec<Candidate>> {
    let places: Vec<RawPlace> = serde_json::from_str(body)?;
    Ok(places
        .into_iter()
        .filter_map(|p| p.into_candidate().ok())
        .collect())
}

fn parse_reverse(body: &str) -> Result<Option<Candidate>> {
    match serde_json::from_str(body)? {
        RawReverse::Found(place) => Ok(Some(place.into_candidate()?)),
        RawReverse::Missing { error } => {
            debug!("nominatim reverse: {}", error);
            Ok(None)
        }
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let limit = self.limit.to_string();
        let res = self
            .client
            .0
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "jsonv2"), ("limit", limit.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Geocode(format!("nominatim answered {}", res.status())));
        }
        parse_search(&res.text().await?)
    }

    async fn reverse(&self, at: Coordinates) -> Result<Option<Candidate>> {
        let (lat, lon) = (at.lat.to_string(), at.lng.to_string());
        let res = self
            .client
            .0
            .get(format!("{}/reverse", self.base_url))
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "jsonv2")])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Geocode(format!("nominatim answered {}", res.status())));
        }
        parse_reverse(&res.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use duotrack_core::{common::Client, geo::Geocoder};

    use super::{parse_reverse, parse_search, Nominatim};

    #[test]
    fn test_parse_search() {
        let found = parse_search(
            r#"[
                {
                    "place_id": 88066702,
                    "lat": "48.8539",
                    "lon": "2.3325",
                    "name": "Café de Flore",
                    "display_name": "Café de Flore, 172, Boulevard Saint-Germain, Paris, France"
                },
                {
                    "lat": "48.8540",
                    "lon": "2.3330",
                    "name": "",
                    "display_name": "172, Boulevard Saint-Germain, Paris, France"
                },
                { "lat": "123.0", "lon": "0", "display_name": "broken" }
            ]"#,
        )
        .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Café de Flore");
        assert_eq!(found[0].coordinates.lat, 48.8539);
        assert_eq!(found[1].name, "172");
        assert!(found[1].address.as_ref().unwrap().contains("Saint-Germain"));
    }

    #[test]
    fn test_parse_reverse() {
        assert!(parse_reverse(r#"{ "error": "Unable to geocode" }"#)
            .unwrap()
            .is_none());
        let found = parse_reverse(
            r#"{ "lat": "51.5007", "lon": "-0.1246", "name": "Big Ben", "display_name": "Big Ben, London" }"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.name, "Big Ben");

        let unnamed = parse_reverse(
            r#"{ "lat": "51.5", "lon": "-0.12", "display_name": "10, Downing Street, London" }"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(unnamed.name, "10");
        assert_eq!(unnamed.address.as_deref(), Some("10, Downing Street, London"));
        assert!(parse_reverse("not json").is_err());
    }

    #[tokio::test]
    #[ignore = "talks to nominatim.openstreetmap.org"]
    async fn test_live_search() {
        let client = Client::new("duotrack-tests/0.1").unwrap();
        let nominatim = Nominatim::new(client, "https://nominatim.openstreetmap.org", 5);
        let found = nominatim.search("Eiffel Tower").await.unwrap();
        assert!((found[0].coordinates.lat - 48.858).abs() < 0.01);
    }
}
