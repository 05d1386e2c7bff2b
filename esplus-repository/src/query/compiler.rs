//! Condition list to boolean query compilation.

use esplus_shared::{ConditionEntry, ConditionList, GeoDirective, GroupMarker, SearchQuery};
use tracing::debug;

use super::dispatcher::QueryTypeDispatcher;
use super::fragment::{BoolQuery, Occur, QueryFragment};
use crate::errors::MapperError;

/// Compiles a flat condition list into a single boolean query.
///
/// The list is walked once, left to right. Groups are one level deep: an AND
/// group attaches to the outer query as a `must` clause and an OR group as a
/// `should` clause. An outer `OrChain` marker moves every later predicate into
/// the disjunction, including those inside later groups. A chain inside a
/// group only reaches the rest of that group, and also pulls in the
/// predicates between the group open and the chain marker.
pub struct QueryTreeCompiler;

/// The group currently being collected.
struct OpenGroup {
    open: GroupMarker,
    query: BoolQuery,
    chaining: bool,
}

impl QueryTreeCompiler {
    /// Compile a condition list and an optional geo directive.
    ///
    /// # Arguments
    ///
    /// * `conditions` - The condition list, left untouched
    /// * `geo` - Geo restriction, added as an unconditional filter
    ///
    /// # Returns
    ///
    /// * `Ok(BoolQuery)` - The compiled query; empty when there is nothing to match on
    /// * `Err(MapperError)` - If groups are unbalanced, nested or mismatched,
    ///   or a predicate is malformed
    pub fn compile(
        conditions: &ConditionList,
        geo: Option<&GeoDirective>,
    ) -> Result<BoolQuery, MapperError> {
        let mut entries = conditions.entries().to_vec();
        let mut outer = BoolQuery::new();
        let mut group: Option<OpenGroup> = None;
        let mut chaining = false;

        for position in 0..entries.len() {
            let marker = match &entries[position] {
                ConditionEntry::Marker(marker) => *marker,
                ConditionEntry::Predicates(batch) => {
                    let (target, chained) = match group.as_mut() {
                        Some(open) => (&mut open.query, chaining || open.chaining),
                        None => (&mut outer, chaining),
                    };
                    for predicate in batch {
                        let mut predicate = predicate.clone();
                        if chained {
                            predicate.reclassify_as_should();
                        }
                        let fragment = QueryTypeDispatcher::render(&predicate)?;
                        target.add(QueryTypeDispatcher::occur(&predicate), fragment);
                    }
                    continue;
                }
            };

            match marker {
                GroupMarker::AndGroupOpen | GroupMarker::OrGroupOpen => {
                    if group.is_some() {
                        return Err(MapperError::validation(format!(
                            "Nested group at position {}: groups cannot nest",
                            position
                        )));
                    }
                    Self::pull_into_chain(&mut entries, position, marker)?;
                    group = Some(OpenGroup {
                        open: marker,
                        query: BoolQuery::new(),
                        chaining: false,
                    });
                }
                GroupMarker::AndGroupClose | GroupMarker::OrGroupClose => {
                    let closed = group.take().ok_or_else(|| {
                        MapperError::validation(format!(
                            "{:?} at position {} has no matching open",
                            marker, position
                        ))
                    })?;
                    if closed.open.closing() != Some(marker) {
                        return Err(MapperError::validation(format!(
                            "{:?} at position {} does not close {:?}",
                            marker, position, closed.open
                        )));
                    }
                    if closed.query.is_empty() {
                        debug!(position, "Skipping empty group");
                        continue;
                    }
                    let occur = if marker == GroupMarker::AndGroupClose {
                        Occur::Must
                    } else {
                        Occur::Should
                    };
                    outer.add(occur, QueryFragment::Bool(closed.query));
                }
                GroupMarker::OrChain => match group.as_mut() {
                    Some(open) => open.chaining = true,
                    None => chaining = true,
                },
            }
        }

        if let Some(open) = group {
            return Err(MapperError::validation(format!(
                "{:?} is never closed",
                open.open
            )));
        }

        if let Some(geo) = geo {
            outer.add(Occur::Filter, geo_fragment(geo));
        }

        debug!(clauses = outer.clause_count(), "Compiled condition list");
        Ok(outer)
    }

    /// Compile the conditions and geo directive of a search query.
    pub fn compile_query(query: &SearchQuery) -> Result<BoolQuery, MapperError> {
        Self::compile(&query.conditions, query.geo.as_ref())
    }

    /// Look ahead from a group open to its close. If the group contains an
    /// `OrChain`, move the predicates before it into the disjunction.
    fn pull_into_chain(
        entries: &mut [ConditionEntry],
        open_at: usize,
        open: GroupMarker,
    ) -> Result<(), MapperError> {
        let expected = open.closing();
        let mut chain_at = None;
        let mut close_at = None;

        for (offset, entry) in entries[open_at + 1..].iter().enumerate() {
            let position = open_at + 1 + offset;
            match entry.as_marker() {
                Some(GroupMarker::OrChain) if chain_at.is_none() => chain_at = Some(position),
                Some(marker) if marker.is_open() => {
                    return Err(MapperError::validation(format!(
                        "Nested group at position {}: groups cannot nest",
                        position
                    )))
                }
                Some(marker) if marker.is_close() => {
                    if Some(marker) != expected {
                        return Err(MapperError::validation(format!(
                            "{:?} at position {} does not close {:?}",
                            marker, position, open
                        )));
                    }
                    close_at = Some(position);
                    break;
                }
                _ => {}
            }
        }

        if close_at.is_none() {
            return Err(MapperError::validation(format!(
                "{:?} at position {} is never closed",
                open, open_at
            )));
        }

        if let Some(chain_at) = chain_at {
            for entry in &mut entries[open_at + 1..chain_at] {
                if let ConditionEntry::Predicates(batch) = entry {
                    batch.iter_mut().for_each(|p| p.reclassify_as_should());
                }
            }
        }
        Ok(())
    }
}

fn geo_fragment(geo: &GeoDirective) -> QueryFragment {
    match geo.clone() {
        GeoDirective::BoundingBox {
            field,
            top_left,
            bottom_right,
            boost,
        } => QueryFragment::GeoBoundingBox {
            field,
            top_left,
            bottom_right,
            boost,
        },
        GeoDirective::Distance {
            field,
            center,
            distance,
            boost,
        } => QueryFragment::GeoDistance {
            field,
            center,
            distance,
            boost,
        },
        GeoDirective::Polygon {
            field,
            points,
            boost,
        } => QueryFragment::GeoPolygon {
            field,
            points,
            boost,
        },
        GeoDirective::Shape {
            field,
            shape,
            relation,
            boost,
        } => QueryFragment::GeoShape {
            field,
            shape,
            relation,
            boost,
        },
    }
}
