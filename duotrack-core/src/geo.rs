use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{cmp::Ordering, convert::TryFrom, fmt::Display, str::FromStr};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = Error;
    fn try_from(raw: RawCoordinates) -> Result<Self> {
        Self::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !(lat.is_finite() && lng.is_finite()) || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(Error::invalid(format!(
                "({}, {}) is not a valid latitude/longitude",
                lat, lng
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Pull a coordinate pair out of pasted text.
    ///
    /// ## Example
    /// ```txt
    /// "48.8566, 2.3522"  -> (48.8566, 2.3522)
    /// "48.8566;2.3522"   -> (48.8566, 2.3522)
    /// "-33.86 151.21"    -> (-33.86, 151.21)
    /// "91, 0"            -> None
    /// "Cafe de Flore"    -> None
    /// ```
    pub fn parse<S: AsRef<str>>(s: S) -> Option<Self> {
        lazy_static! {
            static ref RE_PAIR: regex::Regex = regex::Regex::new(
                r"^\s*\(?\s*(-?\d{1,3}(?:\.\d+)?)\s*(?:[,;]\s*|\s+)(-?\d{1,3}(?:\.\d+)?)\s*\)?\s*$"
            )
            .unwrap();
        }

        let caps = RE_PAIR.captures(s.as_ref())?;
        let lat = caps.get(1)?.as_str().parse().ok()?;
        let lng = caps.get(2)?.as_str().parse().ok()?;
        Self::new(lat, lng).ok()
    }

    /// Great-circle distance in metres.
    pub fn distance_m(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

impl FromStr for Coordinates {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid(format!("`{}` is not a coordinate pair", s)))
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// One suggestion returned by a geocoder or nearby search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl Candidate {
    pub fn with_distance_from(mut self, origin: &Coordinates) -> Self {
        self.distance_m = Some(origin.distance_m(&self.coordinates));
        self
    }
}

/// Nearest first. Candidates without a distance keep their order, after the rest.
pub fn sort_by_distance(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match (a.distance_m, b.distance_m) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// The kinds of place a nearby search can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Category {
    Restaurant,
    Cafe,
    Bar,
    Park,
    Museum,
    Cinema,
    Viewpoint,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Restaurant,
        Category::Cafe,
        Category::Bar,
        Category::Park,
        Category::Museum,
        Category::Cinema,
        Category::Viewpoint,
    ];

    /// The OpenStreetMap `key=value` tag this category corresponds to.
    pub fn osm_tag(self) -> (&'static str, &'static str) {
        match self {
            Self::Restaurant => ("amenity", "restaurant"),
            Self::Cafe => ("amenity", "cafe"),
            Self::Bar => ("amenity", "bar"),
            Self::Park => ("leisure", "park"),
            Self::Museum => ("tourism", "museum"),
            Self::Cinema => ("amenity", "cinema"),
            Self::Viewpoint => ("tourism", "viewpoint"),
        }
    }
}

impl FromStr for Category {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.osm_tag().1 == wanted)
            .ok_or_else(|| Error::invalid(format!("unknown place category `{}`", s)))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.osm_tag().1)
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;

    /// Free-text search, best match first.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>>;

    async fn reverse(&self, at: Coordinates) -> Result<Option<Candidate>>;
}

#[async_trait]
pub trait NearbySearch: Send + Sync {
    async fn nearby(
        &self,
        at: Coordinates,
        category: Category,
        radius_m: u32,
    ) -> Result<Vec<Candidate>>;
}

/// Somewhere to get "where am I" from.
#[async_trait]
pub trait Locator: Send + Sync {
    fn name(&self) -> &str;

    async fn locate(&self) -> Result<Coordinates>;
}

/// A location that never changes, e.g. a configured home.
pub struct FixedLocator(pub Coordinates);

#[async_trait]
impl Locator for FixedLocator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn locate(&self) -> Result<Coordinates> {
        Ok(self.0)
    }
}

/// Asks each geocoder in turn, moving on when one fails or finds nothing.
pub struct FallbackGeocoder {
    geocoders: Vec<Box<dyn Geocoder>>,
}

impl FallbackGeocoder {
    pub fn new(geocoders: Vec<Box<dyn Geocoder>>) -> Self {
        Self { geocoders }
    }
}

#[async_trait]
impl Geocoder for FallbackGeocoder {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let mut failures = Vec::new();
        for geocoder in &self.geocoders {
            match geocoder.search(query).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => debug!("{} found nothing for {:?}", geocoder.name(), query),
                Err(e) => {
                    warn!("{} search failed: {}", geocoder.name(), e);
                    failures.push(format!("{}: {}", geocoder.name(), e));
                }
            }
        }
        if !self.geocoders.is_empty() && failures.len() == self.geocoders.len() {
            Err(Error::Geocode(failures.join("; ")))
        } else {
            Ok(Vec::new())
        }
    }

    async fn reverse(&self, at: Coordinates) -> Result<Option<Candidate>> {
        let mut failures = Vec::new();
        for geocoder in &self.geocoders {
            match geocoder.reverse(at).await {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => debug!("{} has no address at {}", geocoder.name(), at),
                Err(e) => {
                    warn!("{} reverse lookup failed: {}", geocoder.name(), e);
                    failures.push(format!("{}: {}", geocoder.name(), e));
                }
            }
        }
        if !self.geocoders.is_empty() && failures.len() == self.geocoders.len() {
            Err(Error::Geocode(failures.join("; ")))
        } else {
            Ok(None)
        }
    }
}

/// Asks each locator in turn until one answers.
pub struct FallbackLocator {
    locators: Vec<Box<dyn Locator>>,
}

impl FallbackLocator {
    pub fn new(locators: Vec<Box<dyn Locator>>) -> Self {
        Self { locators }
    }
}

#[async_trait]
impl Locator for FallbackLocator {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn locate(&self) -> Result<Coordinates> {
        for locator in &self.locators {
            match locator.locate().await {
                Ok(at) => {
                    debug!("located via {} at {}", locator.name(), at);
                    return Ok(at);
                }
                Err(e) => warn!("{} could not locate: {}", locator.name(), e),
            }
        }
        Err(Error::Geolocation("no location source answered".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{
        sort_by_distance, Candidate, Category, Coordinates, FallbackGeocoder, FallbackLocator,
        FixedLocator, Geocoder, Locator,
    };
    use crate::error::{Error, Result};

    fn candidate(name: &str, lat: f64, lng: f64) -> Candidate {
        Candidate {
            name: name.to_string(),
            address: None,
            coordinates: Coordinates::new(lat, lng).unwrap(),
            distance_m: None,
        }
    }

    struct Canned(Vec<Candidate>);
    struct Broken;

    #[async_trait]
    impl Geocoder for Canned {
        fn name(&self) -> &str {
            "canned"
        }
        async fn search(&self, _query: &str) -> Result<Vec<Candidate>> {
            Ok(self.0.clone())
        }
        async fn reverse(&self, _at: Coordinates) -> Result<Option<Candidate>> {
            Ok(self.0.first().cloned())
        }
    }

    #[async_trait]
    impl Geocoder for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn search(&self, _query: &str) -> Result<Vec<Candidate>> {
            Err(Error::Geocode("503".into()))
        }
        async fn reverse(&self, _at: Coordinates) -> Result<Option<Candidate>> {
            Err(Error::Geocode("503".into()))
        }
    }

    #[async_trait]
    impl Locator for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn locate(&self) -> Result<Coordinates> {
            Err(Error::Geolocation("denied".into()))
        }
    }

    #[test]
    fn test_parse() {
        let paris = Coordinates::parse("48.8566, 2.3522").unwrap();
        assert_eq!(paris, Coordinates { lat: 48.8566, lng: 2.3522 });
        assert_eq!(Coordinates::parse("48.8566;2.3522"), Some(paris));
        assert_eq!(Coordinates::parse("(48.8566 2.3522)"), Some(paris));
        assert_eq!(
            Coordinates::parse("-33.86 151.21"),
            Some(Coordinates { lat: -33.86, lng: 151.21 })
        );
        assert_eq!(Coordinates::parse("91, 0"), None);
        assert_eq!(Coordinates::parse("Cafe de Flore"), None);
        assert!("".parse::<Coordinates>().is_err());
    }

    #[test]
    fn test_decode_validates() {
        let paris: Coordinates =
            serde_json::from_str(r#"{ "lat": 48.8566, "lng": 2.3522 }"#).unwrap();
        assert_eq!(paris.lng, 2.3522);
        assert!(serde_json::from_str::<Coordinates>(r#"{ "lat": 500, "lng": 0 }"#).is_err());
        assert!(serde_json::from_str::<Coordinates>(r#"{ "lat": 0, "lng": -181 }"#).is_err());
    }

    #[test]
    fn test_distance() {
        let paris = Coordinates::new(48.8566, 2.3522).unwrap();
        let london = Coordinates::new(51.5074, -0.1278).unwrap();
        let d = paris.distance_m(&london);
        assert!(d > 340_000.0 && d < 347_000.0, "{}", d);
        assert_eq!(paris.distance_m(&paris), 0.0);
    }

    #[test]
    fn test_sort_by_distance() {
        let origin = Coordinates::new(0.0, 0.0).unwrap();
        let mut list = vec![
            candidate("far", 1.0, 1.0).with_distance_from(&origin),
            candidate("unknown", 5.0, 5.0),
            candidate("near", 0.1, 0.1).with_distance_from(&origin),
        ];
        sort_by_distance(&mut list);
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["near", "far", "unknown"]);
    }

    #[test]
    fn test_category() {
        assert_eq!("Cafe".parse::<Category>().unwrap(), Category::Cafe);
        assert_eq!(Category::Park.osm_tag(), ("leisure", "park"));
        assert!("casino".parse::<Category>().is_err());
    }

    #[tokio::test]
    async fn test_fallback_skips_empty_and_broken() {
        let geocoder = FallbackGeocoder::new(vec![
            Box::new(Broken),
            Box::new(Canned(vec![])),
            Box::new(Canned(vec![candidate("Louvre", 48.86, 2.33)])),
        ]);
        let found = geocoder.search("louvre").await.unwrap();
        assert_eq!(found[0].name, "Louvre");
        let at = Coordinates::new(48.86, 2.33).unwrap();
        assert_eq!(geocoder.reverse(at).await.unwrap().unwrap().name, "Louvre");
    }

    #[tokio::test]
    async fn test_fallback_errors_only_when_all_fail() {
        let all_broken = FallbackGeocoder::new(vec![Box::new(Broken), Box::new(Broken)]);
        assert!(matches!(
            all_broken.search("x").await,
            Err(Error::Geocode(_))
        ));

        let one_empty = FallbackGeocoder::new(vec![Box::new(Broken), Box::new(Canned(vec![]))]);
        assert!(one_empty.search("x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_locator() {
        let home = Coordinates::new(52.52, 13.405).unwrap();
        let locator = FallbackLocator::new(vec![Box::new(Broken), Box::new(FixedLocator(home))]);
        assert_eq!(locator.locate().await.unwrap(), home);

        let nowhere = FallbackLocator::new(vec![Box::new(Broken)]);
        assert!(matches!(nowhere.locate().await, Err(Error::Geolocation(_))));
    }
}
