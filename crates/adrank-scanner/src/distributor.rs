//! Round-robin distribution of cities over proxy lanes.

use adrank_core::City;

/// A proxy endpoint and the cities it will serve, in processing order.
///
/// An empty proxy means a direct connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLane {
    pub proxy: String,
    pub cities: Vec<City>,
}

impl ProxyLane {
    fn new(proxy: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
            cities: Vec::new(),
        }
    }
}

/// Assign `cities[i]` to `proxies[i % proxies.len()]`.
///
/// With no proxies every city lands in a single direct lane. Lanes come back
/// in proxy-list order; repeated proxy strings share one lane.
#[must_use]
pub fn distribute(cities: &[City], proxies: &[String]) -> Vec<ProxyLane> {
    if proxies.is_empty() {
        let mut lane = ProxyLane::new("");
        lane.cities = cities.to_vec();
        return vec![lane];
    }

    let mut lanes: Vec<ProxyLane> = Vec::with_capacity(proxies.len());
    // Lane index for every entry of `proxies`.
    let mut slot_of = Vec::with_capacity(proxies.len());
    for proxy in proxies {
        let slot = match lanes.iter().position(|lane| &lane.proxy == proxy) {
            Some(existing) => existing,
            None => {
                lanes.push(ProxyLane::new(proxy.clone()));
                lanes.len() - 1
            }
        };
        slot_of.push(slot);
    }

    for (index, city) in cities.iter().enumerate() {
        let slot = slot_of[index % proxies.len()];
        lanes[slot].cities.push(city.clone());
    }

    lanes
}
