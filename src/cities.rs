use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named point on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl City {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }
}

// Provincial-level capitals plus Taipei, Hong Kong and Macau
const CAPITALS: [(&str, f64, f64); 34] = [
    ("北京", 39.9042, 116.4074),
    ("上海", 31.2304, 121.4737),
    ("天津", 39.0842, 117.2009),
    ("重庆", 29.5630, 106.5516),
    ("石家庄", 38.0428, 114.5149),
    ("太原", 37.8706, 112.5489),
    ("呼和浩特", 40.8426, 111.7492),
    ("沈阳", 41.8057, 123.4315),
    ("长春", 43.8171, 125.3235),
    ("哈尔滨", 45.8038, 126.5350),
    ("南京", 32.0603, 118.7969),
    ("杭州", 30.2741, 120.1551),
    ("合肥", 31.8206, 117.2272),
    ("福州", 26.0745, 119.2965),
    ("南昌", 28.6820, 115.8579),
    ("济南", 36.6512, 117.1201),
    ("郑州", 34.7466, 113.6253),
    ("武汉", 30.5928, 114.3055),
    ("长沙", 28.2282, 112.9388),
    ("广州", 23.1291, 113.2644),
    ("南宁", 22.8170, 108.3665),
    ("海口", 20.0174, 110.3492),
    ("成都", 30.5728, 104.0668),
    ("贵阳", 26.6470, 106.6302),
    ("昆明", 24.8801, 102.8329),
    ("拉萨", 29.6525, 91.1721),
    ("西安", 34.3416, 108.9398),
    ("兰州", 36.0611, 103.8343),
    ("西宁", 36.6171, 101.7782),
    ("银川", 38.4872, 106.2309),
    ("乌鲁木齐", 43.8256, 87.6168),
    ("台北", 25.0330, 121.5654),
    ("香港", 22.3193, 114.1694),
    ("澳门", 22.1987, 113.5439),
];

pub const DEFAULT_CENTER: &str = "北京";

lazy_static::lazy_static! {
    static ref PROVINCIAL_CAPITALS: Vec<City> = CAPITALS
        .iter()
        .map(|&(name, lat, lng)| City::new(name, lat, lng))
        .collect();

    static ref CITY_INDEX: HashMap<&'static str, usize> = CAPITALS
        .iter()
        .enumerate()
        .map(|(i, &(name, _, _))| (name, i))
        .collect();
}

/// Every city in the registry, in display order
pub fn provincial_capitals() -> &'static [City] {
    &PROVINCIAL_CAPITALS
}

pub fn find_city(name: &str) -> Option<&'static City> {
    CITY_INDEX.get(name).map(|&i| &PROVINCIAL_CAPITALS[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_names_are_unique() {
        let names: HashSet<_> = provincial_capitals().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), provincial_capitals().len());
    }

    #[test]
    fn finds_default_center() {
        let beijing = find_city(DEFAULT_CENTER).expect("default center is registered");
        assert_eq!(beijing.lat, 39.9042);
        assert_eq!(beijing.lng, 116.4074);
        assert!(find_city("东京").is_none());
    }
}
