use async_trait::async_trait;
use duotrack_core::{
    common::Client,
    geo::{sort_by_distance, Candidate, Category, Coordinates, NearbySearch},
    Error, Result,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Nearby search against an Overpass API instance.
pub struct Overpass {
    client: Client,
    base_url: String,
    limit: usize,
}

impl Overpass {
    pub fn new(client: Client, base_url: &str, limit: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }
}

/// Every node, way and relation carrying the category's tag within `radius_m`,
/// ways and relations reduced to their centre point.
pub fn query(at: Coordinates, category: Category, radius_m: u32, limit: usize) -> String {
    let (key, value) = category.osm_tag();
    format!(
        r#"[out:json][timeout:25];nwr(around:{},{},{})["{}"="{}"]["name"];out center {};"#,
        radius_m, at.lat, at.lng, key, value, limit
    )
}

#[derive(Deserialize)]
struct Response {
    elements: Vec<Element>,
}

#[derive(Deserialize)]
struct Point {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct Element {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Point>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl Element {
    fn into_candidate(self) -> Option<Candidate> {
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(c)) => (c.lat, c.lon),
            _ => return None,
        };
        let name = self.tags.get("name")?.clone();
        let street = match (self.tags.get("addr:housenumber"), self.tags.get("addr:street")) {
            (Some(n), Some(s)) => Some(format!("{} {}", n, s)),
            (None, Some(s)) => Some(s.clone()),
            _ => None,
        };
        let address = match (street, self.tags.get("addr:city")) {
            (Some(s), Some(c)) => Some(format!("{}, {}", s, c)),
            (Some(s), None) => Some(s),
            (None, c) => c.cloned(),
        };
        Some(Candidate {
            name,
            address,
            coordinates: Coordinates::new(lat, lon).ok()?,
            distance_m: None,
        })
    }
}

fn parse_elements(body: &str, origin: &Coordinates) -> Result<Vec<Candidate>> {
    let response: Response = serde_json::from_str(body)?;
    let mut found: Vec<Candidate> = response
        .elements
        .into_iter()
        .filter_map(Element::into_candidate)
        .map(|c| c.with_distance_from(origin))
        .collect();
    sort_by_distance(&mut found);
    Ok(found)
}

#[async_trait]
impl NearbySearch for Overpass {
    async fn nearby(
        &self,
        at: Coordinates,
        category: Category,
        radius_m: u32,
    ) -> Result<Vec<Candidate>> {
        let data = query(at, category, radius_m, self.limit);
        debug!("overpass query: {}", data);
        let res = self
            .client
            .0
            .post(format!("{}/api/interpreter", self.base_url))
            .form(&[("data", data.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Geocode(format!("overpass answered {}", res.status())));
        }
        parse_elements(&res.text().await?, &at)
    }
}

#[cfg(test)]
mod tests {
    use duotrack_core::geo::{Category, Coordinates};

    use super::{parse_elements, query};

    #[test]
    fn test_query() {
        let at = Coordinates::new(48.85, 2.35).unwrap();
        assert_eq!(
            query(at, Category::Park, 500, 20),
            r#"[out:json][timeout:25];nwr(around:500,48.85,2.35)["leisure"="park"]["name"];out center 20;"#
        );
    }

    #[test]
    fn test_parse_elements() {
        let origin = Coordinates::new(48.8530, 2.3499).unwrap();
        let found = parse_elements(
            r#"{
                "elements": [
                    {
                        "type": "way", "id": 1,
                        "center": { "lat": 48.8462, "lon": 2.3372 },
                        "tags": { "leisure": "park", "name": "Jardin du Luxembourg" }
                    },
                    {
                        "type": "node", "id": 2, "lat": 48.8520, "lon": 2.3500,
                        "tags": {
                            "amenity": "cafe", "name": "Square Cafe",
                            "addr:housenumber": "3", "addr:street": "Rue Lagrange", "addr:city": "Paris"
                        }
                    },
                    { "type": "node", "id": 3, "lat": 48.0, "lon": 2.0, "tags": { "amenity": "cafe" } }
                ]
            }"#,
            &origin,
        )
        .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Square Cafe");
        assert_eq!(found[0].address.as_deref(), Some("3 Rue Lagrange, Paris"));
        assert!(found[0].distance_m.unwrap() < found[1].distance_m.unwrap());
        assert_eq!(found[1].coordinates.lat, 48.8462);
    }
}
