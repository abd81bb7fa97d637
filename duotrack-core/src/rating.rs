//! Half-star ratings.
//!
//! Every item carries one optional [`Rating`] per user. Tapping a star cycles
//! that user's value through the star's half value, its full value, and back to
//! no rating at all:
//!
//! ```txt
//! tap star 3 on an unrated item: None -> 2.5 -> 3.0 -> None
//! tap star 3 when rated 4.5:     4.5  -> 2.5
//! ```
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Display, str::FromStr};

use crate::{error::Error, users::UserId};

pub const MAX_STARS: u8 = 5;

/// A score in `{0.5, 1.0, ..., 5.0}`, kept as a count of half stars so that
/// equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: Rating = Rating(MAX_STARS * 2);

    pub fn value(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = Error;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let halves = value * 2.0;
        if !halves.is_finite() || halves.fract() != 0.0 {
            return Err(Error::invalid(format!(
                "rating {} is not a multiple of 0.5",
                value
            )));
        }
        if halves < 1.0 || halves > f64::from(Self::MAX.0) {
            return Err(Error::invalid(format!(
                "rating {} is outside 0.5..=5.0",
                value
            )));
        }
        Ok(Self(halves as u8))
    }
}

impl From<Rating> for f64 {
    fn from(r: Rating) -> f64 {
        r.value()
    }
}

impl FromStr for Rating {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("`{}` is not a number", s)))?;
        Self::try_from(value)
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

/// A star position, `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarIndex(u8);

impl StarIndex {
    pub fn all() -> impl Iterator<Item = StarIndex> {
        (1..=MAX_STARS).map(StarIndex)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The value a first tap on this star lands on, e.g. 2.5 for star 3.
    pub fn half(self) -> Rating {
        Rating(self.0 * 2 - 1)
    }

    /// The value a second tap on this star lands on, e.g. 3.0 for star 3.
    pub fn full(self) -> Rating {
        Rating(self.0 * 2)
    }
}

impl TryFrom<u8> for StarIndex {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_STARS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::invalid(format!(
                "star {} is outside 1..={}",
                value, MAX_STARS
            )))
        }
    }
}

impl From<StarIndex> for u8 {
    fn from(s: StarIndex) -> u8 {
        s.0
    }
}

impl FromStr for StarIndex {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("`{}` is not a star number", s)))?;
        Self::try_from(value)
    }
}

/// The next rating after a tap on `star`.
///
/// Half value becomes full value, full value clears the rating, anything else
/// (including no rating) lands on the star's half value.
pub fn cycle(current: Option<Rating>, star: StarIndex) -> Option<Rating> {
    match current {
        Some(r) if r == star.half() => Some(star.full()),
        Some(r) if r == star.full() => None,
        _ => Some(star.half()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillState {
    Full,
    Half,
    Empty,
}

/// How the star at `star` is drawn for `rating`.
pub fn fill_state(rating: Option<Rating>, star: StarIndex) -> FillState {
    match rating {
        Some(r) if r >= star.full() => FillState::Full,
        Some(r) if r >= star.half() => FillState::Half,
        _ => FillState::Empty,
    }
}

/// Fill states for stars `1..=5`, left to right.
pub fn stars(rating: Option<Rating>) -> Vec<FillState> {
    StarIndex::all().map(|s| fill_state(rating, s)).collect()
}

/// Each user's rating of one item. Both users are always present when serialized,
/// `null` standing for "not rated".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(rename = "Z", default)]
    pub z: Option<Rating>,
    #[serde(rename = "T", default)]
    pub t: Option<Rating>,
}

impl Ratings {
    pub fn get(&self, user: UserId) -> Option<Rating> {
        match user {
            UserId::Z => self.z,
            UserId::T => self.t,
        }
    }

    pub fn set(&mut self, user: UserId, rating: Option<Rating>) {
        match user {
            UserId::Z => self.z = rating,
            UserId::T => self.t = rating,
        }
    }

    /// A copy of this map with `user`'s rating advanced by a tap on `star`.
    pub fn tapped(&self, user: UserId, star: StarIndex) -> Self {
        let mut next = *self;
        next.set(user, cycle(self.get(user), star));
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, Option<Rating>)> + '_ {
        IntoIterator::into_iter(UserId::ALL).map(move |u| (u, self.get(u)))
    }

    /// Mean of the ratings that are present, `None` if nobody rated.
    pub fn average(&self) -> Option<f64> {
        average(self.iter().map(|(_, r)| r))
    }

    /// The average as shown next to the stars, one decimal place.
    pub fn average_text(&self) -> Option<String> {
        self.average().map(format_average)
    }
}

pub fn average<I: IntoIterator<Item = Option<Rating>>>(ratings: I) -> Option<f64> {
    let (sum, count) = ratings
        .into_iter()
        .flatten()
        .fold((0.0, 0u32), |(sum, count), r| (sum + r.value(), count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Round half away from zero to tenths, so 3.75 shows as "3.8".
pub fn format_average(avg: f64) -> String {
    format!("{:.1}", (avg * 10.0).round() / 10.0)
}
