use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CacheStore, FileCacheStore, LruCacheStore};
use crate::cities::{find_city, City};
use crate::config::Settings;
use crate::gemini::{parse_batch_response, BatchRecord, GeminiClient, TravelTimeQuery};
use crate::utils::estimate_travel_time;

/// City name to travel time in minutes
pub type TravelTimes = BTreeMap<String, u32>;

pub const DEFAULT_BATCH_SIZE: usize = 6;

/// Fetches, merges, estimates and caches travel times from a center city
pub struct TravelTimeProvider {
    query: Option<Arc<dyn TravelTimeQuery>>,
    cache: Arc<dyn CacheStore>,
    batch_size: usize,
}

impl TravelTimeProvider {
    pub fn new(query: Option<Arc<dyn TravelTimeQuery>>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            query,
            cache,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Provider with no query client; every value is estimated
    pub fn offline() -> Self {
        Self::new(None, Arc::new(LruCacheStore::default()))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let cache: Arc<dyn CacheStore> = match &settings.cache_dir {
            Some(dir) => Arc::new(FileCacheStore::new(dir)),
            None => Arc::new(LruCacheStore::new(settings.cache_capacity)),
        };

        let query: Option<Arc<dyn TravelTimeQuery>> = match &settings.api_key {
            Some(key) => Some(Arc::new(
                GeminiClient::new(key.clone())
                    .with_base_url(settings.api_base_url.clone())
                    .with_model(settings.model.clone())
                    .with_temperature(settings.temperature),
            )),
            None => {
                warn!("no API key configured, travel times will be estimated from distance");
                None
            }
        };

        Self::new(query, cache).with_batch_size(settings.batch_size)
    }

    pub fn has_query_client(&self) -> bool {
        self.query.is_some()
    }

    /// Travel times from `center` to every city in `cities`. Never fails: anything
    /// the query client could not supply is estimated from distance.
    pub async fn get_travel_times(&self, center: &str, cities: &[City]) -> TravelTimes {
        let key = cache_key(center);
        if let Some(cached) = self.read_cache(&key) {
            debug!(center, "loaded travel times from cache");
            return cached;
        }

        let center_city = cities
            .iter()
            .find(|city| city.name == center)
            .or_else(|| find_city(center));

        let data = match &self.query {
            Some(query) => self.fetch(query.as_ref(), center, center_city, cities).await,
            None => simulate_travel_times(center, center_city, cities),
        };

        match serde_json::to_string(&data) {
            Ok(serialized) => {
                if let Err(err) = self.cache.set(&key, serialized) {
                    warn!(center, error = %err, "cache write failed");
                }
            }
            Err(err) => warn!(center, error = %err, "could not serialize travel times"),
        }

        data
    }

    fn read_cache(&self, key: &str) -> Option<TravelTimes> {
        let raw = match self.cache.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<TravelTimes>(&raw) {
            Ok(parsed) if !parsed.is_empty() => Some(parsed),
            Ok(_) => None,
            Err(err) => {
                warn!(key, error = %err, "ignoring unreadable cache entry");
                None
            }
        }
    }

    async fn fetch(
        &self,
        query: &dyn TravelTimeQuery,
        center: &str,
        center_city: Option<&City>,
        cities: &[City],
    ) -> TravelTimes {
        let targets: Vec<String> = cities
            .iter()
            .filter(|city| city.name != center)
            .map(|city| city.name.clone())
            .collect();
        let batches: Vec<&[String]> = targets.chunks(self.batch_size).collect();

        debug!(
            center,
            cities = targets.len(),
            batches = batches.len(),
            "querying travel times"
        );

        // All batches run concurrently; merging waits for every one of them
        let results = join_all(
            batches
                .iter()
                .map(|batch| query_one_batch(query, center, batch)),
        )
        .await;

        let requested: HashSet<&str> = targets.iter().map(String::as_str).collect();
        let mut data = TravelTimes::new();
        for record in results.into_iter().flatten() {
            if requested.contains(record.city.as_str()) {
                data.insert(record.city, record.minutes);
            } else {
                debug!(center, city = %record.city, "dropping unrequested city from answer");
            }
        }

        for city in cities {
            if !data.contains_key(&city.name) {
                if city.name != center {
                    info!(center, city = %city.name, "missing data, using distance estimate");
                }
                data.insert(city.name.clone(), estimate_from(center_city, city));
            }
        }
        data.insert(center.to_string(), 0);

        data
    }
}

async fn query_one_batch(query: &dyn TravelTimeQuery, center: &str, batch: &[String]) -> Vec<BatchRecord> {
    let text = match query.query_batch(center, batch).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!(center, batch = ?batch, "empty answer for batch");
            return Vec::new();
        }
        Err(err) => {
            warn!(center, batch = ?batch, error = %err, "batch query failed");
            return Vec::new();
        }
    };

    match parse_batch_response(&text) {
        Ok(records) => records,
        Err(err) => {
            warn!(center, batch = ?batch, error = %err, "could not decode batch answer");
            Vec::new()
        }
    }
}

fn estimate_from(center_city: Option<&City>, target: &City) -> u32 {
    center_city.map_or(0, |center| estimate_travel_time(center, target))
}

// Function to build the whole mapping from distance estimates
fn simulate_travel_times(center: &str, center_city: Option<&City>, cities: &[City]) -> TravelTimes {
    let mut data: TravelTimes = cities
        .iter()
        .map(|city| (city.name.clone(), estimate_from(center_city, city)))
        .collect();
    data.insert(center.to_string(), 0);
    data
}
