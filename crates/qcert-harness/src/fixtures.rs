//! Random fixture records for the reference tables
//!
//! Generated values are never asserted on directly; checks only rely on the
//! structural properties documented on each builder.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use qcert_core::{Record, Value};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const MAKES: &[(&str, &[&str])] = &[
    ("Ford", &["Focus", "Fiesta", "Mustang", "Escape"]),
    ("Toyota", &["Corolla", "Camry", "Prius", "Tacoma"]),
    ("Dodge", &["Charger", "Durango", "Viper"]),
    ("Honda", &["Civic", "Accord", "Fit"]),
    ("Subaru", &["Outback", "Impreza", "Forester"]),
];

const FIRST_NAMES: &[&str] = &["Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances"];
const LAST_NAMES: &[&str] = &["Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen"];
const DEALER_NAMES: &[&str] = &["Main Street Motors", "Hilltop Auto", "Valley Cars", "Westside Autos"];

/// Source of random fixture records
#[derive(Debug, Clone)]
pub struct FixtureGenerator<R: Rng = StdRng> {
    rng: R,
}

impl FixtureGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Deterministic generator; equal seeds yield equal fixture streams
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> FixtureGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Integer in `[min, max]`; bounds may be given in either order
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    /// Float in `[min, max]` rounded to two decimal places
    pub fn decimal(&mut self, min: f64, max: f64) -> f64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let raw = self.rng.gen_range(lo..=hi);
        ((raw * 100.0).round() / 100.0).clamp(lo, hi)
    }

    pub fn alphanumeric(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    pub fn boolean(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Uniform timestamp between `a` and `b` at second resolution
    pub fn date_between(&mut self, a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let span = (hi - lo).num_seconds();
        lo + Duration::seconds(self.rng.gen_range(0..=span))
    }

    fn pick<'a>(&mut self, options: &'a [&'a str]) -> &'a str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn maybe(&mut self, include_optional: bool) -> bool {
        include_optional && self.boolean()
    }

    /// Car without `Id` or `DateCreated`; the adapter supplies both.
    ///
    /// With `include_optional` each nullable column is independently present
    /// half of the time. Fields in `overrides` replace generated ones.
    pub fn car(&mut self, include_optional: bool, overrides: Option<Record>) -> Record {
        let (make, models) = MAKES.choose(&mut self.rng).copied().unwrap_or(MAKES[0]);
        let mut car = Record::new()
            .with("Make", make)
            .with("Model", self.pick(models))
            .with("Year", self.int(1990, 2024))
            .with("Mileage", self.int(0, 250_000));

        if self.maybe(include_optional) {
            car.insert("MPGCity", self.decimal(10.0, 40.0));
        }
        if self.maybe(include_optional) {
            car.insert("MPGHwy", self.decimal(15.0, 50.0));
        }
        if self.maybe(include_optional) {
            let modified = self.date_between(ymd(2000, 1, 1), ymd(2024, 12, 31));
            car.insert("DateModified", modified);
        }
        apply_overrides(car, overrides)
    }

    /// Owner without `Id`; the battery registers a counter default for it.
    pub fn owner(&mut self, include_optional: bool, overrides: Option<Record>) -> Record {
        let mut owner = Record::new()
            .with("FirstName", self.pick(FIRST_NAMES))
            .with("LastName", self.pick(LAST_NAMES));
        if self.maybe(include_optional) {
            let born = self.date_between(ymd(1940, 1, 1), ymd(2005, 12, 31));
            owner.insert("DateOfBirth", born);
        }
        apply_overrides(owner, overrides)
    }

    /// Dealer without `Id`; the battery registers a token default for it.
    pub fn dealer(&mut self, _include_optional: bool, overrides: Option<Record>) -> Record {
        let dealer = Record::new().with("Name", self.pick(DEALER_NAMES));
        apply_overrides(dealer, overrides)
    }

    pub fn cars(&mut self, count: usize, include_optional: bool) -> Vec<Record> {
        (0..count).map(|_| self.car(include_optional, None)).collect()
    }
}

/// Association record linking two rows: `{name1: value1, name2: value2}`
pub fn cross_ref(
    name1: &str,
    value1: impl Into<Value>,
    name2: &str,
    value2: impl Into<Value>,
) -> Record {
    Record::new().with(name1, value1).with(name2, value2)
}

fn apply_overrides(mut record: Record, overrides: Option<Record>) -> Record {
    if let Some(overrides) = overrides {
        record.merge(&overrides);
    }
    record
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}
