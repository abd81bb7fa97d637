use async_trait::async_trait;
use duotrack_core::{
    common::Client,
    geo::{Candidate, Coordinates, Geocoder},
    Error, Result,
};
use serde::Deserialize;

/// Komoot's Photon geocoder. Same OpenStreetMap data as Nominatim, separate
/// rate limits, so it serves as the fallback.
pub struct Photon {
    client: Client,
    base_url: String,
    limit: usize,
}

impl Photon {
    pub fn new(client: Client, base_url: &str, limit: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    /* GeoJSON order: longitude first */
    coordinates: (f64, f64),
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Properties {
    name: Option<String>,
    housenumber: Option<String>,
    street: Option<String>,
    postcode: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl Properties {
    fn address(&self) -> Option<String> {
        let street = match (&self.housenumber, &self.street) {
            (Some(n), Some(s)) => Some(format!("{} {}", n, s)),
            (None, Some(s)) => Some(s.clone()),
            _ => None,
        };
        let parts: Vec<String> = vec![
            street,
            self.postcode.clone(),
            self.city.clone(),
            self.country.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl Feature {
    fn into_candidate(self) -> Option<Candidate> {
        let (lng, lat) = self.geometry.coordinates;
        let address = self.properties.address();
        let name = self
            .properties
            .name
            .clone()
            .or_else(|| address.clone())?;
        Some(Candidate {
            name,
            address,
            coordinates: Coordinates::new(lat, lng).ok()?,
            distance_m: None,
        })
    }
}

fn parse_features(body: &str) -> Result<Vec<Candidate>> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    Ok(collection
        .features
        .into_iter()
        .filter_map(Feature::into_candidate)
        .collect())
}

#[async_trait]
impl Geocoder for Photon {
    fn name(&self) -> &str {
        "photon"
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let limit = self.limit.to_string();
        let res = self
            .client
            .0
            .get(format!("{}/api/", self.base_url))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Geocode(format!("photon answered {}", res.status())));
        }
        parse_features(&res.text().await?)
    }

    async fn reverse(&self, at: Coordinates) -> Result<Option<Candidate>> {
        let (lat, lon) = (at.lat.to_string(), at.lng.to_string());
        let res = self
            .client
            .0
            .get(format!("{}/reverse", self.base_url))
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Geocode(format!("photon answered {}", res.status())));
        }
        Ok(parse_features(&res.text().await?)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::parse_features;

    #[test]
    fn test_parse_features() {
        let found = parse_features(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [13.3777, 52.5163] },
                        "properties": { "name": "Brandenburger Tor", "city": "Berlin", "country": "Deutschland" }
                    },
                    {
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [13.4, 52.5] },
                        "properties": { "housenumber": "1", "street": "Unter den Linden", "city": "Berlin" }
                    },
                    {
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
                        "properties": {}
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Brandenburger Tor");
        assert_eq!(found[0].coordinates.lat, 52.5163);
        assert_eq!(found[0].coordinates.lng, 13.3777);
        assert_eq!(found[0].address.as_deref(), Some("Berlin, Deutschland"));
        assert_eq!(found[1].name, "1 Unter den Linden, Berlin");
    }
}
