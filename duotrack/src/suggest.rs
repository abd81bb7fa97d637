//! Location suggestions for the place form.
//!
//! Typing into the location field fires a lookup per keystroke; the
//! [`Debouncer`] drops all but the last one. Pasted coordinates skip the
//! search and go straight to a reverse lookup. Results are ranked by
//! distance from wherever the user currently is, when that can be found.
use duotrack_core::{
    common::{normalize_query, Client},
    debounce::Debouncer,
    geo::{
        sort_by_distance, Candidate, Category, Coordinates, FallbackGeocoder, FallbackLocator,
        FixedLocator, Geocoder, Locator, NearbySearch,
    },
    Error, Result,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    config::Config,
    modules::{ipapi::IpApi, nominatim::Nominatim, overpass::Overpass, photon::Photon},
};

pub struct LocationSuggester {
    geocoder: Box<dyn Geocoder>,
    nearby: Box<dyn NearbySearch>,
    locator: Box<dyn Locator>,
    debouncer: Debouncer,
    min_query_len: usize,
    radius_m: u32,
}

/// Where [`LocationSuggester::resolve`] got its coordinates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pasted,
    Geocoded,
    Device,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub coordinates: Coordinates,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Candidate>,
}

impl LocationSuggester {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        nearby: Box<dyn NearbySearch>,
        locator: Box<dyn Locator>,
        config: &Config,
    ) -> Self {
        Self {
            geocoder,
            nearby,
            locator,
            debouncer: Debouncer::new(config.debounce()),
            min_query_len: config.min_query_len,
            radius_m: config.nearby_radius_m,
        }
    }

    /// Nominatim falling back to Photon, Overpass for nearby places, the IP
    /// lookup falling back to the configured home.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::new(&config.user_agent)?;
        let geocoder = FallbackGeocoder::new(vec![
            Box::new(Nominatim::new(
                client.clone(),
                &config.nominatim_url,
                config.suggestion_limit,
            )),
            Box::new(Photon::new(
                client.clone(),
                &config.photon_url,
                config.suggestion_limit,
            )),
        ]);
        let mut locators: Vec<Box<dyn Locator>> =
            vec![Box::new(IpApi::new(client.clone(), &config.ipapi_url))];
        if let Some(home) = config.home {
            locators.push(Box::new(FixedLocator(home)));
        }
        Ok(Self::new(
            Box::new(geocoder),
            Box::new(Overpass::new(client, &config.overpass_url, config.suggestion_limit)),
            Box::new(FallbackLocator::new(locators)),
            config,
        ))
    }

    pub async fn locate(&self) -> Result<Coordinates> {
        self.locator.locate().await
    }

    pub async fn reverse(&self, at: Coordinates) -> Result<Option<Candidate>> {
        self.geocoder.reverse(at).await
    }

    async fn origin(&self) -> Option<Coordinates> {
        match self.locator.locate().await {
            Ok(at) => Some(at),
            Err(e) => {
                debug!("ranking without a location: {}", e);
                None
            }
        }
    }

    fn rank(candidates: Vec<Candidate>, origin: Option<Coordinates>) -> Vec<Candidate> {
        match origin {
            Some(origin) => {
                let mut ranked: Vec<Candidate> = candidates
                    .into_iter()
                    .map(|c| c.with_distance_from(&origin))
                    .collect();
                sort_by_distance(&mut ranked);
                ranked
            }
            None => candidates,
        }
    }

    /// Suggestions for what is typed so far.
    ///
    /// `Ok(None)` means a newer keystroke superseded this one and its result
    /// should be dropped. Queries shorter than the minimum length clear the list
    /// without a lookup.
    pub async fn suggest(&self, input: &str) -> Result<Option<Vec<Candidate>>> {
        let query = normalize_query(input);
        if query.chars().count() < self.min_query_len {
            self.debouncer.cancel();
            return Ok(Some(Vec::new()));
        }
        if !self.debouncer.settle().await {
            debug!("superseded: {:?}", query);
            return Ok(None);
        }

        let lookup = async {
            match Coordinates::parse(&query) {
                Some(at) => Ok(vec![self.describe(at).await]),
                None => self.geocoder.search(&query).await,
            }
        };
        let (candidates, origin) = futures::future::join(lookup, self.origin()).await;
        Ok(Some(Self::rank(candidates?, origin)))
    }

    /// A reverse lookup, or a bare coordinate label when nothing is known there.
    async fn describe(&self, at: Coordinates) -> Candidate {
        match self.geocoder.reverse(at).await {
            Ok(Some(found)) => Candidate {
                coordinates: at,
                ..found
            },
            Ok(None) | Err(_) => Candidate {
                name: at.to_string(),
                address: None,
                coordinates: at,
                distance_m: None,
            },
        }
    }

    /// Places of `category` around the user, nearest first.
    pub async fn nearby(&self, category: Category) -> Result<Vec<Candidate>> {
        let at = self.locator.locate().await?;
        self.nearby_at(at, category).await
    }

    pub async fn nearby_at(&self, at: Coordinates, category: Category) -> Result<Vec<Candidate>> {
        let found = self.nearby.nearby(at, category, self.radius_m).await?;
        Ok(Self::rank(found, Some(at)))
    }

    /// Coordinates for a place being saved: pasted coordinates, else the first
    /// geocoding match for the text, else the current location.
    pub async fn resolve(&self, input: &str) -> Result<Resolved> {
        let query = normalize_query(input);
        if let Some(at) = Coordinates::parse(&query) {
            return Ok(Resolved {
                coordinates: at,
                source: Source::Pasted,
                candidate: None,
            });
        }

        if !query.is_empty() {
            match self.geocoder.search(&query).await {
                Ok(found) => {
                    if let Some(first) = found.into_iter().next() {
                        return Ok(Resolved {
                            coordinates: first.coordinates,
                            source: Source::Geocoded,
                            candidate: Some(first),
                        });
                    }
                }
                Err(e) => debug!("geocoding {:?} failed, trying device location: {}", query, e),
            }
        }

        let at = self.locator.locate().await.map_err(|e| {
            Error::Geolocation(format!("nothing matched {:?} and {}", query, e))
        })?;
        Ok(Resolved {
            coordinates: at,
            source: Source::Device,
            candidate: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use duotrack_core::{
        geo::{Candidate, Category, Coordinates, FixedLocator, Geocoder, Locator, NearbySearch},
        Error, Result,
    };
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use super::{LocationSuggester, Source};
    use crate::config::Config;

    fn candidate(name: &str, lat: f64, lng: f64) -> Candidate {
        Candidate {
            name: name.to_string(),
            address: None,
            coordinates: Coordinates::new(lat, lng).unwrap(),
            distance_m: None,
        }
    }

    struct Canned {
        found: Vec<Candidate>,
        searches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Geocoder for Canned {
        fn name(&self) -> &str {
            "canned"
        }
        async fn search(&self, _query: &str) -> Result<Vec<Candidate>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(self.found.clone())
        }
        async fn reverse(&self, _at: Coordinates) -> Result<Option<Candidate>> {
            Ok(self.found.first().cloned())
        }
    }

    struct NoNearby;

    #[async_trait]
    impl NearbySearch for NoNearby {
        async fn nearby(&self, _: Coordinates, _: Category, _: u32) -> Result<Vec<Candidate>> {
            Ok(vec![candidate("far", 1.0, 1.0), candidate("near", 0.01, 0.01)])
        }
    }

    struct Lost;

    #[async_trait]
    impl Locator for Lost {
        fn name(&self) -> &str {
            "lost"
        }
        async fn locate(&self) -> Result<Coordinates> {
            Err(Error::Geolocation("denied".into()))
        }
    }

    fn build(
        found: Vec<Candidate>,
        locator: Box<dyn Locator>,
    ) -> (LocationSuggester, Arc<AtomicUsize>) {
        let searches = Arc::new(AtomicUsize::new(0));
        let config = Config {
            debounce_ms: 300,
            ..Config::default()
        };
        let suggester = LocationSuggester::new(
            Box::new(Canned {
                found,
                searches: searches.clone(),
            }),
            Box::new(NoNearby),
            locator,
            &config,
        );
        (suggester, searches)
    }

    fn origin() -> Box<dyn Locator> {
        Box::new(FixedLocator(Coordinates::new(0.0, 0.0).unwrap()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_skips_lookup() {
        let (suggester, searches) = build(vec![candidate("x", 0.0, 0.0)], origin());
        assert_eq!(suggester.suggest(" ca ").await.unwrap(), Some(vec![]));
        assert_eq!(searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_only_last_searches() {
        let (suggester, searches) = build(
            vec![candidate("far", 1.0, 1.0), candidate("near", 0.1, 0.1)],
            origin(),
        );
        let suggester = Arc::new(suggester);

        let early = tokio::spawn({
            let s = suggester.clone();
            async move { s.suggest("caf").await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let late = tokio::spawn({
            let s = suggester.clone();
            async move { s.suggest("cafe").await }
        });

        assert_eq!(early.await.unwrap().unwrap(), None);
        let found = late.await.unwrap().unwrap().unwrap();
        assert_eq!(searches.load(Ordering::SeqCst), 1);
        assert_eq!(found[0].name, "near");
        assert!(found[0].distance_m.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pasted_coordinates_reverse() {
        let (suggester, searches) =
            build(vec![candidate("Pont Neuf", 48.857, 2.341)], Box::new(Lost));
        let found = suggester.suggest("48.8575, 2.3413").await.unwrap().unwrap();
        assert_eq!(searches.load(Ordering::SeqCst), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Pont Neuf");
        assert_eq!(found[0].coordinates, Coordinates::new(48.8575, 2.3413).unwrap());
        assert_eq!(found[0].distance_m, None);
    }

    #[tokio::test]
    async fn test_resolve_sources() {
        let (suggester, _) = build(vec![candidate("Louvre", 48.8606, 2.3376)], origin());
        let pasted = suggester.resolve("1.5, 2.5").await.unwrap();
        assert_eq!(pasted.source, Source::Pasted);
        assert_eq!(pasted.coordinates.lng, 2.5);

        let geocoded = suggester.resolve("louvre").await.unwrap();
        assert_eq!(geocoded.source, Source::Geocoded);
        assert_eq!(geocoded.candidate.unwrap().name, "Louvre");

        let (nothing_found, _) = build(vec![], origin());
        let device = nothing_found.resolve("somewhere vague").await.unwrap();
        assert_eq!(device.source, Source::Device);
        assert_eq!(device.coordinates, Coordinates::new(0.0, 0.0).unwrap());

        let (lost, _) = build(vec![], Box::new(Lost));
        assert!(matches!(lost.resolve("nowhere").await, Err(Error::Geolocation(_))));
    }

    #[tokio::test]
    async fn test_nearby_ranked() {
        let (suggester, _) = build(vec![], origin());
        let found = suggester.nearby(Category::Cafe).await.unwrap();
        assert_eq!(found[0].name, "near");
        assert!(found[0].distance_m.unwrap() < found[1].distance_m.unwrap());

        let (lost, _) = build(vec![], Box::new(Lost));
        assert!(lost.nearby(Category::Cafe).await.is_err());
    }
}
