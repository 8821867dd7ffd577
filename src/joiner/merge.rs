//! Joiner classification and merging.
//!
//! Indexable joiners must form a contiguous prefix of the list; filtering
//! joiners form the suffix. The prefix is merged into one multi-key
//! [`IndexedJoiner`], the suffix into one [`JoinFilter`], so the engine
//! narrows candidates through an index before it ever runs a predicate.

use super::{describe_joiners, IndexedJoiner, JoinFilter, Joiner, JoinerType};
use crate::error::{PlanError, PlanResult};

/// Result of merging one joiner list.
#[derive(Debug, Clone, Default)]
pub struct MergedJoiners {
    pub indexed: Option<IndexedJoiner>,
    pub filter: Option<JoinFilter>,
}

impl MergedJoiners {
    pub fn is_empty(&self) -> bool {
        self.indexed.is_none() && self.filter.is_none()
    }

    /// Number of indexable mapping indices.
    pub fn indexed_len(&self) -> usize {
        self.indexed.as_ref().map_or(0, IndexedJoiner::len)
    }

    /// Number of filtering predicates.
    pub fn filter_len(&self) -> usize {
        self.filter.as_ref().map_or(0, JoinFilter::len)
    }
}

/// Partitions `joiners` into the indexable prefix and the filtering suffix.
///
/// Fails when a `None` joiner shares the list with any other joiner, or when
/// an indexable joiner follows a filtering one.
pub fn merge_joiners(joiners: &[Joiner]) -> PlanResult<MergedJoiners> {
    let mut first_filter: Option<usize> = None;
    let mut indexed: Option<IndexedJoiner> = None;
    let mut filter: Option<JoinFilter> = None;

    for (position, joiner) in joiners.iter().enumerate() {
        let (joiner_type, mapping) = match joiner {
            Joiner::None => {
                if joiners.len() > 1 {
                    return Err(PlanError::NoneJoinerNotAlone {
                        position,
                        joiners: describe_joiners(joiners),
                    });
                }
                indexed = Some(indexed.unwrap_or_default());
                continue;
            }
            Joiner::Filtering(predicate) => {
                if first_filter.is_none() {
                    first_filter = Some(position);
                }
                filter = Some(match filter {
                    None => JoinFilter::new(predicate.clone()),
                    Some(existing) => existing.and(predicate.clone()),
                });
                continue;
            }
            Joiner::Equal(mapping) => (JoinerType::Equal, mapping),
            Joiner::LessThan(mapping) => (JoinerType::LessThan, mapping),
            Joiner::LessThanOrEqual(mapping) => (JoinerType::LessThanOrEqual, mapping),
            Joiner::GreaterThan(mapping) => (JoinerType::GreaterThan, mapping),
            Joiner::GreaterThanOrEqual(mapping) => (JoinerType::GreaterThanOrEqual, mapping),
            Joiner::NotEqual(mapping) => (JoinerType::NotEqual, mapping),
        };
        if let Some(filter_position) = first_filter {
            return Err(PlanError::IndexingAfterFiltering {
                position,
                joiner: joiner.to_string(),
                filter_position,
                filter: joiners[filter_position].to_string(),
                joiners: describe_joiners(joiners),
            });
        }
        let mut single = IndexedJoiner::new();
        single.push(joiner_type, mapping.clone());
        indexed = Some(match indexed {
            None => single,
            Some(existing) => existing.merge(single),
        });
    }

    Ok(MergedJoiners { indexed, filter })
}
