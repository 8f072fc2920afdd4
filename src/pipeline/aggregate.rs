use crate::models::{AggregatedRecord, PassengerRecord};
use std::collections::BTreeMap;

/// Sum counts per (nationality, age bracket).
///
/// Output is sorted by key; callers should not rely on any particular order.
pub fn aggregate(records: Vec<PassengerRecord>) -> Vec<AggregatedRecord> {
    let mut groups: BTreeMap<(String, String), u64> = BTreeMap::new();

    for record in records {
        *groups
            .entry((record.nationality, record.age_bracket))
            .or_default() += record.count;
    }

    groups
        .into_iter()
        .map(|((nationality, age_bracket), count)| AggregatedRecord {
            count,
            nationality,
            age_bracket,
        })
        .collect()
}
