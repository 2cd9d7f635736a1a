use std::{collections::BTreeMap, sync::Arc};

use crate::{
    progress::{CheckpointNode, SessionTracker, time_until},
    weather::{MetricId, WeatherSnapshotStore},
};

use super::{PropertyDump, PropertyRequest, PropertyValue, ValueKind};

/// Number of node intervals assumed by `CurrentNodeDurationMinutes`.
const NODE_INTERVALS: f64 = 5.0;

/// Computes property values from the latest session sample and weather snapshot.
///
/// Resolution never fails: a missing snapshot, node, metric or field resolves to
/// `0.0` for numeric properties and `""` for string properties.
#[derive(Clone)]
pub struct PropertyResolver {
    tracker: Arc<SessionTracker>,
    store: Arc<WeatherSnapshotStore>,
}

impl PropertyResolver {
    pub fn new(tracker: Arc<SessionTracker>, store: Arc<WeatherSnapshotStore>) -> Self {
        Self { tracker, store }
    }

    pub fn resolve_name(&self, name: &str) -> PropertyValue {
        self.resolve(&PropertyRequest::parse(name))
    }

    pub fn resolve(&self, request: &PropertyRequest) -> PropertyValue {
        let sample = self.tracker.sample();
        let length = self.store.session_length_minutes(sample.kind);

        match *request {
            PropertyRequest::SessionLength => PropertyValue::Integer(i64::from(length)),
            PropertyRequest::NodeDuration => {
                PropertyValue::Number(f64::from(length) / NODE_INTERVALS)
            }
            PropertyRequest::CurrentNodeName => PropertyValue::Text(sample.node.to_string()),
            PropertyRequest::TimeUntil(node) => {
                let time_left_minutes = sample.time_left.as_secs_f64() / 60.0;
                PropertyValue::Number(time_until(node, length, time_left_minutes))
            }
            PropertyRequest::CurrentNodeMetric(metric, kind) => {
                self.metric_value(sample.node, metric, kind)
            }
            PropertyRequest::NodeMetric(node, metric, kind) => self.metric_value(node, metric, kind),
            PropertyRequest::Unknown(kind) => kind.default_value(),
        }
    }

    fn metric_value(&self, node: CheckpointNode, metric: MetricId, kind: ValueKind) -> PropertyValue {
        let Some(snapshot) = self.store.current() else {
            return kind.default_value();
        };
        let Some(value) = snapshot.metric(node, metric) else {
            return kind.default_value();
        };

        match kind {
            ValueKind::Number => PropertyValue::Number(value.current_value.unwrap_or(0.0)),
            ValueKind::Text => PropertyValue::Text(value.string_value.clone().unwrap_or_default()),
        }
    }

    /// Resolves every entry of `properties`.
    pub fn dump<'a>(
        &self,
        properties: impl IntoIterator<Item = (&'a String, &'a PropertyRequest)>,
    ) -> PropertyDump {
        let sample = self.tracker.sample();
        PropertyDump {
            session_kind: sample.kind,
            current_node: sample.node,
            values: properties
                .into_iter()
                .map(|(name, request)| (name.clone(), self.resolve(request)))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        properties::registered_properties,
        session::SessionKind,
        weather::{MetricValue, SessionScheduleEntry, WeatherSnapshot},
    };
    use proptest::prelude::*;
    use std::{collections::HashMap, time::Duration};

    fn resolver() -> (PropertyResolver, Arc<SessionTracker>, Arc<WeatherSnapshotStore>) {
        let tracker = Arc::new(SessionTracker::new());
        let store = Arc::new(WeatherSnapshotStore::new());
        (
            PropertyResolver::new(Arc::clone(&tracker), Arc::clone(&store)),
            tracker,
            store,
        )
    }

    fn sample_snapshot() -> WeatherSnapshot {
        let mut node_50 = HashMap::new();
        node_50.insert(MetricId::Temperature, MetricValue::new(18.5, "18.5C"));
        node_50.insert(
            MetricId::Sky,
            MetricValue {
                current_value: None,
                string_value: None,
            },
        );
        let mut start = HashMap::new();
        start.insert(MetricId::RainChance, MetricValue::new(40.0, "40%"));
        WeatherSnapshot::new(HashMap::from([
            (CheckpointNode::Node50, node_50),
            (CheckpointNode::Start, start),
        ]))
    }

    #[test]
    fn test_never_fetched_properties_default() {
        let (resolver, _, _) = resolver();
        for (name, request) in registered_properties() {
            let value = resolver.resolve(&request);
            match request {
                PropertyRequest::SessionLength => assert_eq!(value, PropertyValue::Integer(0)),
                PropertyRequest::CurrentNodeName => {
                    assert_eq!(value, PropertyValue::Text("START".to_string()))
                }
                _ if name.ends_with("Str") => {
                    assert_eq!(value, PropertyValue::Text(String::new()), "{}", name)
                }
                _ => assert_eq!(value, PropertyValue::Number(0.0), "{}", name),
            }
        }
    }

    #[test]
    fn test_explicit_node_metric() {
        let (resolver, _, store) = resolver();
        store.replace(sample_snapshot());

        assert_eq!(
            resolver.resolve_name("NODE_50_WNV_TEMPERATURE"),
            PropertyValue::Number(18.5)
        );
        assert_eq!(
            resolver.resolve_name("NODE_50_WNV_TEMPERATUREStr"),
            PropertyValue::Text("18.5C".to_string())
        );
        assert_eq!(
            resolver.resolve_name("START_WNV_RAIN_CHANCEStr"),
            PropertyValue::Text("40%".to_string())
        );
    }

    #[test]
    fn test_null_and_missing_fields_default() {
        let (resolver, _, store) = resolver();
        store.replace(sample_snapshot());

        assert_eq!(resolver.resolve_name("NODE_50_WNV_SKY"), PropertyValue::Number(0.0));
        assert_eq!(
            resolver.resolve_name("NODE_50_WNV_SKYStr"),
            PropertyValue::Text(String::new())
        );
        assert_eq!(resolver.resolve_name("FINISH_WNV_SKY"), PropertyValue::Number(0.0));
        assert_eq!(
            resolver.resolve_name("NODE_50_WNV_FOGStr"),
            PropertyValue::Text(String::new())
        );
    }

    #[test]
    fn test_current_node_follows_session_progress() {
        let (resolver, tracker, store) = resolver();
        store.replace(sample_snapshot());
        store.record_schedule(SessionKind::Race, &[SessionScheduleEntry::new("Race", 60)]);

        tracker.update(SessionKind::Race, 60, Duration::from_secs(60 * 60));
        assert_eq!(
            resolver.resolve_name("CURRENTNODE_WNV_RAIN_CHANCE"),
            PropertyValue::Number(40.0)
        );
        assert_eq!(
            resolver.resolve_name("CurrentNodeName"),
            PropertyValue::Text("START".to_string())
        );

        tracker.update(SessionKind::Race, 60, Duration::from_secs(25 * 60));
        assert_eq!(
            resolver.resolve_name("CURRENTNODE_WNV_TEMPERATUREStr"),
            PropertyValue::Text("18.5C".to_string())
        );
        assert_eq!(
            resolver.resolve_name("CurrentNodeName"),
            PropertyValue::Text("NODE_50".to_string())
        );
    }

    #[test]
    fn test_session_derived_values() {
        let (resolver, tracker, store) = resolver();
        store.record_schedule(
            SessionKind::Qualify,
            &[
                SessionScheduleEntry::new("Practice", 90),
                SessionScheduleEntry::new("Qualifying", 20),
            ],
        );
        tracker.update(SessionKind::Qualify, 20, Duration::from_secs(15 * 60));

        assert_eq!(
            resolver.resolve_name("CurrentSessionLengthMinutes"),
            PropertyValue::Integer(20)
        );
        assert_eq!(
            resolver.resolve_name("CurrentNodeDurationMinutes"),
            PropertyValue::Number(4.0)
        );
        // 5 of 20 minutes elapsed, NODE_50 starts at minute 10
        assert_eq!(
            resolver.resolve_name("TimeUntil_NODE_50"),
            PropertyValue::Number(5.0)
        );
        assert_eq!(
            resolver.resolve_name("TimeUntil_NODE_25"),
            PropertyValue::Number(0.0)
        );
        assert_eq!(
            resolver.resolve_name("TimeUntil_FINISH"),
            PropertyValue::Number(15.0)
        );
    }

    #[test]
    fn test_dump_resolves_every_property() {
        let (resolver, _, store) = resolver();
        store.replace(sample_snapshot());
        let table: BTreeMap<String, PropertyRequest> = registered_properties().into_iter().collect();

        let dump = resolver.dump(&table);
        assert_eq!(dump.values.len(), table.len());
        assert_eq!(dump.current_node, CheckpointNode::Start);
        assert_eq!(
            dump.values.get("NODE_50_WNV_TEMPERATURE"),
            Some(&PropertyValue::Number(18.5))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_unfetched_resolution_is_total(name in "[A-Za-z_0-9]{0,40}") {
            let (resolver, _, _) = resolver();
            let value = resolver.resolve_name(&name);
            match PropertyRequest::parse(&name) {
                PropertyRequest::CurrentNodeName => {
                    prop_assert_eq!(value, PropertyValue::Text("START".to_string()))
                }
                PropertyRequest::SessionLength => prop_assert_eq!(value, PropertyValue::Integer(0)),
                _ if name.ends_with("Str") => prop_assert_eq!(value, PropertyValue::Text(String::new())),
                _ => prop_assert_eq!(value, PropertyValue::Number(0.0)),
            }
        }
    }
}
