pub mod models;

pub use models::{AggregatedResult, AggregationPolicy, Series, SeriesPoint};

use crate::modules::source::RawReading;
use crate::shared::time::Instant;
use std::collections::{BTreeMap, HashMap};

struct DeviceBuffers {
    name: String,
    // one buffer per policy aspect, same order
    points: Vec<Vec<SeriesPoint>>,
}

fn passes_gate(reading: &RawReading, policy: &AggregationPolicy) -> bool {
    policy
        .require_non_null()
        .iter()
        .all(|aspect| reading.value(aspect).is_some())
}

/// Groups readings per device and aspect.
///
/// Readings are taken in source order. Each gate-passing reading adds exactly one
/// point to every requested aspect of its device, with the timestamp run through
/// `quantize`. A null value for a non-gating aspect still adds a (null) point.
/// Every aspect list comes out sorted by device name; the sort is stable.
pub fn aggregate<Q>(
    readings: &[RawReading],
    policy: &AggregationPolicy,
    quantize: Q,
) -> AggregatedResult
where
    Q: Fn(Instant) -> Instant,
{
    let aspects = policy.aspects();
    let mut devices: Vec<DeviceBuffers> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for reading in readings {
        if !passes_gate(reading, policy) {
            continue;
        }

        let name = reading.device_key();
        let slot = *index.entry(name).or_insert_with(|| {
            devices.push(DeviceBuffers {
                name: name.to_string(),
                points: vec![Vec::new(); aspects.len()],
            });
            devices.len() - 1
        });

        let timestamp = quantize(reading.timestamp);
        let device = &mut devices[slot];
        for (buffer, aspect) in device.points.iter_mut().zip(aspects) {
            buffer.push(SeriesPoint {
                label: device.name.clone(),
                timestamp,
                value: reading.value(aspect),
            });
        }
    }

    let mut per_aspect: Vec<Vec<Series>> = vec![Vec::with_capacity(devices.len()); aspects.len()];
    for device in devices {
        for (series_list, points) in per_aspect.iter_mut().zip(device.points) {
            series_list.push(Series {
                name: device.name.clone(),
                points,
            });
        }
    }

    let mut result = BTreeMap::new();
    for (aspect, mut series_list) in aspects.iter().zip(per_aspect) {
        series_list.sort_by(|a, b| a.name.cmp(&b.name));
        result.insert(aspect.clone(), series_list);
    }

    AggregatedResult { aspects: result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::time::{exact, quantizer};
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    fn at(s: &str) -> Instant {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn reading(
        device: &str,
        ts: &str,
        temperature: Option<f64>,
        humidity: Option<f64>,
    ) -> RawReading {
        RawReading {
            device_name: Some(device.to_string()),
            mac: None,
            timestamp: at(ts),
            temperature,
            humidity,
            battery: None,
            rssi: None,
        }
    }

    fn default_policy() -> AggregationPolicy {
        AggregationPolicy::new(["temperature", "humidity"], ["temperature"])
    }

    fn names(result: &AggregatedResult, aspect: &str) -> Vec<String> {
        result
            .aspect(aspect)
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn end_to_end_scenario() {
        let t0 = "2024-03-01T10:00:00Z";
        let t1 = "2024-03-01T10:05:00Z";
        let readings = vec![
            reading("A", t0, Some(10.0), Some(50.0)),
            reading("B", t0, None, Some(60.0)),
            reading("A", t1, Some(12.0), Some(52.0)),
        ];

        let result = aggregate(&readings, &default_policy(), exact);

        let temperature = result.aspect("temperature").unwrap();
        assert_eq!(temperature.len(), 1);
        assert_eq!(temperature[0].name, "A");
        let points: Vec<_> = temperature[0]
            .points
            .iter()
            .map(|p| (p.timestamp, p.value))
            .collect();
        assert_eq!(points, vec![(at(t0), Some(10.0)), (at(t1), Some(12.0))]);

        let humidity = result.aspect("humidity").unwrap();
        assert_eq!(humidity.len(), 1);
        assert_eq!(humidity[0].name, "A");
        let points: Vec<_> = humidity[0]
            .points
            .iter()
            .map(|p| (p.timestamp, p.value))
            .collect();
        assert_eq!(points, vec![(at(t0), Some(50.0)), (at(t1), Some(52.0))]);
        assert!(humidity[0].points.iter().all(|p| p.label == "A"));
    }

    #[test]
    fn null_temperature_drops_reading_from_every_aspect() {
        let readings = vec![
            reading("only-humidity", "2024-03-01T10:00:00Z", None, Some(61.0)),
            reading("only-humidity", "2024-03-01T10:01:00Z", None, Some(62.0)),
            reading("ok", "2024-03-01T10:02:00Z", Some(20.0), None),
        ];

        let result = aggregate(&readings, &default_policy(), exact);

        for aspect in ["temperature", "humidity"] {
            assert_eq!(names(&result, aspect), vec!["ok"]);
        }
    }

    #[test]
    fn null_non_gating_value_is_still_a_point() {
        let readings = vec![reading("a", "2024-03-01T10:00:00Z", Some(20.0), None)];

        let result = aggregate(&readings, &default_policy(), exact);

        let humidity = result.aspect("humidity").unwrap();
        assert_eq!(humidity[0].points.len(), 1);
        assert_eq!(humidity[0].points[0].value, None);
    }

    #[test]
    fn series_sorted_by_name_with_prefixes() {
        let ts = "2024-03-01T10:00:00Z";
        let readings = vec![
            reading("sensor-2", ts, Some(1.0), Some(1.0)),
            reading("sensor", ts, Some(1.0), Some(1.0)),
            reading("sensor-10", ts, Some(1.0), Some(1.0)),
            reading("Sensor", ts, Some(1.0), Some(1.0)),
            reading("sensor-1", ts, Some(1.0), Some(1.0)),
            reading("sensor", ts, Some(2.0), Some(2.0)),
        ];

        let result = aggregate(&readings, &default_policy(), exact);

        let expected = vec!["Sensor", "sensor", "sensor-1", "sensor-10", "sensor-2"];
        assert_eq!(names(&result, "temperature"), expected);
        assert_eq!(names(&result, "humidity"), expected);
    }

    #[test]
    fn equal_names_collapse_into_one_series_in_arrival_order() {
        let readings = vec![
            reading("x", "2024-03-01T10:00:00Z", Some(1.0), Some(10.0)),
            reading("y", "2024-03-01T10:01:00Z", Some(2.0), Some(20.0)),
            reading("x", "2024-03-01T10:02:00Z", Some(3.0), Some(30.0)),
        ];

        let result = aggregate(&readings, &default_policy(), exact);

        let temperature = result.aspect("temperature").unwrap();
        assert_eq!(names(&result, "temperature"), vec!["x", "y"]);
        let values: Vec<_> = temperature[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn every_aspect_has_same_devices_and_point_counts() {
        let readings = vec![
            reading("b", "2024-03-01T10:00:00Z", Some(1.0), Some(10.0)),
            reading("a", "2024-03-01T10:00:00Z", Some(1.0), None),
            reading("b", "2024-03-01T10:01:00Z", Some(1.0), Some(11.0)),
            reading("c", "2024-03-01T10:01:00Z", None, Some(11.0)),
            reading("a", "2024-03-01T10:02:00Z", Some(1.0), Some(12.0)),
            reading("b", "2024-03-01T10:02:00Z", Some(1.0), None),
        ];
        let policy = AggregationPolicy::new(["temperature", "humidity", "battery"], ["temperature"]);

        let result = aggregate(&readings, &policy, exact);

        let temperature = result.aspect("temperature").unwrap();
        for aspect in ["humidity", "battery"] {
            let other = result.aspect(aspect).unwrap();
            assert_eq!(other.len(), temperature.len());
            for (t, o) in temperature.iter().zip(other) {
                assert_eq!(t.name, o.name);
                assert_eq!(t.points.len(), o.points.len());
            }
        }
        let counts: Vec<_> = temperature.iter().map(|s| s.points.len()).collect();
        assert_eq!(counts, vec![2, 3]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let readings = vec![
            reading("b", "2024-03-01T10:00:10Z", Some(1.5), Some(10.0)),
            reading("a", "2024-03-01T10:00:40Z", Some(2.5), None),
            reading("b", "2024-03-01T10:01:20Z", Some(3.5), Some(11.0)),
        ];
        let quantize = quantizer(Duration::from_secs(60));

        let first = aggregate(&readings, &default_policy(), &quantize);
        let second = aggregate(&readings, &default_policy(), &quantize);

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn timestamps_are_quantized() {
        let readings = vec![
            reading("a", "2024-03-01T10:00:29Z", Some(1.0), Some(1.0)),
            reading("a", "2024-03-01T10:00:31Z", Some(2.0), Some(2.0)),
        ];

        let result = aggregate(&readings, &default_policy(), quantizer(Duration::from_secs(60)));

        let stamps: Vec<_> = result.aspect("humidity").unwrap()[0]
            .points
            .iter()
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(
            stamps,
            vec![at("2024-03-01T10:00:00Z"), at("2024-03-01T10:01:00Z")]
        );
    }

    #[test]
    fn missing_device_name_groups_by_mac_then_unknown() {
        let mut by_mac = reading("ignored", "2024-03-01T10:00:00Z", Some(1.0), Some(1.0));
        by_mac.device_name = None;
        by_mac.mac = Some(String::from("aa:bb:cc"));
        let mut anonymous = by_mac.clone();
        anonymous.mac = None;

        let result = aggregate(&[by_mac, anonymous], &default_policy(), exact);

        assert_eq!(names(&result, "temperature"), vec!["aa:bb:cc", "unknown"]);
    }

    #[test]
    fn empty_input_keeps_every_aspect_key() {
        let result = aggregate(&[], &default_policy(), exact);

        assert_eq!(result.aspect("temperature"), Some(&[][..]));
        assert_eq!(result.aspect("humidity"), Some(&[][..]));
        assert_eq!(result.device_count(), 0);
    }

    #[test]
    fn unknown_aspect_yields_null_points() {
        let readings = vec![reading("a", "2024-03-01T10:00:00Z", Some(1.0), Some(1.0))];
        let policy = AggregationPolicy::new(["temperature", "pressure"], ["temperature"]);

        let result = aggregate(&readings, &policy, exact);

        assert_eq!(result.aspect("pressure").unwrap()[0].points[0].value, None);
    }

    #[test]
    fn policy_ignores_duplicate_aspects() {
        let policy = AggregationPolicy::new(["humidity", "temperature", "humidity"], ["temperature"]);
        assert_eq!(policy.aspects(), &["humidity", "temperature"]);
    }
}
