use async_trait::async_trait;
use duotrack_core::{
    common::Client,
    geo::{Coordinates, Locator},
    Error, Result,
};
use serde::Deserialize;

/// Rough location from the public IP address. Stands in for device
/// geolocation where there is no GPS to ask.
pub struct IpApi {
    client: Client,
    url: String,
}

impl IpApi {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct Response {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

fn parse(body: &str) -> Result<Coordinates> {
    let response: Response = serde_json::from_str(body)?;
    if response.error {
        return Err(Error::Geolocation(
            response.reason.unwrap_or_else(|| "ipapi error".to_string()),
        ));
    }
    match (response.latitude, response.longitude) {
        (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
        _ => Err(Error::Geolocation("ipapi returned no coordinates".to_string())),
    }
}

#[async_trait]
impl Locator for IpApi {
    fn name(&self) -> &str {
        "ipapi"
    }

    async fn locate(&self) -> Result<Coordinates> {
        let res = self.client.0.get(self.url.as_str()).send().await?;
        parse(&res.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use duotrack_core::Error;

    use super::parse;

    #[test]
    fn test_parse() {
        let at = parse(r#"{ "ip": "203.0.113.7", "city": "Lyon", "latitude": 45.75, "longitude": 4.85 }"#)
            .unwrap();
        assert_eq!((at.lat, at.lng), (45.75, 4.85));

        assert!(matches!(
            parse(r#"{ "error": true, "reason": "RateLimited" }"#),
            Err(Error::Geolocation(reason)) if reason == "RateLimited"
        ));
        assert!(matches!(parse(r#"{ "ip": "::1" }"#), Err(Error::Geolocation(_))));
    }
}
