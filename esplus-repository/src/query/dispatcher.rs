//! Predicate to query fragment rendering.

use esplus_shared::{ClauseKind, FieldValuePredicate, OperatorKind, PredicateValue};
use serde_json::Value;

use super::fragment::{Occur, QueryFragment};
use crate::errors::MapperError;

/// Renders single predicates into backend query fragments.
///
/// Rendering is a pure function of the predicate; it never looks at the
/// surrounding condition list.
pub struct QueryTypeDispatcher;

impl QueryTypeDispatcher {
    /// Render one predicate.
    ///
    /// The fragment shape follows the predicate's effective kind: its
    /// original kind when it has been moved into a disjunction, its current
    /// kind otherwise.
    ///
    /// # Arguments
    ///
    /// * `predicate` - The predicate to render
    ///
    /// # Returns
    ///
    /// * `Ok(QueryFragment)` - The fragment, wrapped in `Not` for negated kinds
    /// * `Err(MapperError)` - If the value shape does not fit the kind
    pub fn render(predicate: &FieldValuePredicate) -> Result<QueryFragment, MapperError> {
        predicate.validate().map_err(MapperError::validation)?;

        let effective = Self::effective_kind(predicate);
        let field = predicate.field.clone();
        let boost = predicate.boost;

        let fragment = match effective {
            ClauseKind::Must | ClauseKind::Filter | ClauseKind::Should | ClauseKind::MustNot => {
                let fragment = Self::render_operator(predicate)?;
                if effective == ClauseKind::MustNot && predicate.is_reclassified() {
                    fragment.negate()
                } else {
                    fragment
                }
            }
            ClauseKind::Gt | ClauseKind::Lt | ClauseKind::Ge | ClauseKind::Le => {
                let value = Some(single_value(predicate)?);
                let (gt, gte, lt, lte) = match effective {
                    ClauseKind::Gt => (value, None, None, None),
                    ClauseKind::Ge => (None, value, None, None),
                    ClauseKind::Lt => (None, None, value, None),
                    _ => (None, None, None, value),
                };
                QueryFragment::Range {
                    field,
                    gt,
                    gte,
                    lt,
                    lte,
                    boost,
                }
            }
            ClauseKind::Between | ClauseKind::NotBetween => {
                let (low, high) = match &predicate.value {
                    PredicateValue::Bounds { low, high } => (low.clone(), high.clone()),
                    _ => return Err(shape_error(predicate)),
                };
                QueryFragment::Range {
                    field,
                    gt: None,
                    gte: Some(low),
                    lt: None,
                    lte: Some(high),
                    boost,
                }
            }
            ClauseKind::In | ClauseKind::NotIn => QueryFragment::Terms {
                field,
                values: many_values(predicate)?,
                boost,
            },
            ClauseKind::Exists | ClauseKind::NotExists => QueryFragment::Exists { field, boost },
            ClauseKind::LikeLeft => QueryFragment::Wildcard {
                field,
                pattern: format!("*{}", pattern_text(&single_value(predicate)?)),
                boost,
            },
            ClauseKind::LikeRight => QueryFragment::Wildcard {
                field,
                pattern: format!("{}*", pattern_text(&single_value(predicate)?)),
                boost,
            },
        };

        if effective.is_negated() {
            Ok(fragment.negate())
        } else {
            Ok(fragment)
        }
    }

    /// The boolean slot a predicate attaches under, from its current kind.
    pub fn occur(predicate: &FieldValuePredicate) -> Occur {
        match predicate.clause {
            ClauseKind::Filter => Occur::Filter,
            ClauseKind::Should => Occur::Should,
            ClauseKind::MustNot => Occur::MustNot,
            _ => Occur::Must,
        }
    }

    fn effective_kind(predicate: &FieldValuePredicate) -> ClauseKind {
        if predicate.is_reclassified() {
            predicate.original_clause
        } else {
            predicate.clause
        }
    }

    /// Render a predicate sitting directly in an occurrence slot, by operator.
    fn render_operator(predicate: &FieldValuePredicate) -> Result<QueryFragment, MapperError> {
        let field = predicate.field.clone();
        let boost = predicate.boost;

        Ok(match predicate.operator {
            OperatorKind::Eq => QueryFragment::Term {
                field,
                value: single_value(predicate)?,
                boost,
            },
            OperatorKind::Match => QueryFragment::Match {
                field,
                query: single_value(predicate)?,
                boost,
            },
            OperatorKind::Prefix => QueryFragment::Prefix {
                field,
                value: single_value(predicate)?,
                boost,
            },
            OperatorKind::Wildcard => QueryFragment::Wildcard {
                field,
                pattern: format!("*{}*", pattern_text(&single_value(predicate)?)),
                boost,
            },
            OperatorKind::Terms => QueryFragment::Terms {
                field,
                values: many_values(predicate)?,
                boost,
            },
            OperatorKind::Exists => QueryFragment::Exists { field, boost },
            OperatorKind::Range => {
                return Err(MapperError::validation(format!(
                    "Range on '{}' needs a comparison kind",
                    predicate.field
                )))
            }
        })
    }
}

fn single_value(predicate: &FieldValuePredicate) -> Result<Value, MapperError> {
    match &predicate.value {
        PredicateValue::Single(value) => Ok(value.clone()),
        _ => Err(shape_error(predicate)),
    }
}

fn many_values(predicate: &FieldValuePredicate) -> Result<Vec<Value>, MapperError> {
    match &predicate.value {
        PredicateValue::Many(values) if !values.is_empty() => Ok(values.clone()),
        PredicateValue::Single(Value::Array(values)) if !values.is_empty() => Ok(values.clone()),
        _ => Err(shape_error(predicate)),
    }
}

fn shape_error(predicate: &FieldValuePredicate) -> MapperError {
    MapperError::validation(format!(
        "Value of {:?} predicate on '{}' has the wrong shape",
        predicate.original_clause, predicate.field
    ))
}

/// Strings are used as-is in patterns; other scalars use their JSON text.
fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esplus_shared::ConditionList;
    use serde_json::json;

    fn only(list: ConditionList) -> FieldValuePredicate {
        match list.into_entries().into_iter().next() {
            Some(esplus_shared::ConditionEntry::Predicates(mut batch)) => batch.remove(0),
            other => panic!("expected a predicate batch, got {:?}", other),
        }
    }

    #[test]
    fn test_eq_renders_term() {
        let predicate = only(ConditionList::new().eq("gender", "male"));
        let fragment = QueryTypeDispatcher::render(&predicate).unwrap();
        assert_eq!(fragment.to_json(), json!({"term": {"gender": "male"}}));
        assert_eq!(QueryTypeDispatcher::occur(&predicate), Occur::Must);
    }

    #[test]
    fn test_ne_attaches_under_must_not() {
        let predicate = only(ConditionList::new().ne("status", "deleted"));
        let fragment = QueryTypeDispatcher::render(&predicate).unwrap();
        assert_eq!(fragment.to_json(), json!({"term": {"status": "deleted"}}));
        assert_eq!(QueryTypeDispatcher::occur(&predicate), Occur::MustNot);
    }

    #[test]
    fn test_reclassified_must_not_is_negated() {
        let mut predicate = only(ConditionList::new().ne("status", "deleted"));
        predicate.reclassify_as_should();
        let fragment = QueryTypeDispatcher::render(&predicate).unwrap();
        assert_eq!(
            fragment.to_json(),
            json!({"bool": {"must_not": [{"term": {"status": "deleted"}}]}})
        );
        assert_eq!(QueryTypeDispatcher::occur(&predicate), Occur::Should);
    }

    #[test]
    fn test_like_variants() {
        let like = only(ConditionList::new().like("name", "ja"));
        let left = only(ConditionList::new().like_left("name", "ja"));
        let right = only(ConditionList::new().like_right("name", "ja"));

        assert_eq!(
            QueryTypeDispatcher::render(&like).unwrap().to_json(),
            json!({"wildcard": {"name": "*ja*"}})
        );
        assert_eq!(
            QueryTypeDispatcher::render(&left).unwrap().to_json(),
            json!({"wildcard": {"name": "*ja"}})
        );
        assert_eq!(
            QueryTypeDispatcher::render(&right).unwrap().to_json(),
            json!({"wildcard": {"name": "ja*"}})
        );
    }

    #[test]
    fn test_comparisons_render_single_bound() {
        let gt = only(ConditionList::new().gt("age", 18));
        let le = only(ConditionList::new().le("age", 65));
        assert_eq!(
            QueryTypeDispatcher::render(&gt).unwrap().to_json(),
            json!({"range": {"age": {"gt": 18}}})
        );
        assert_eq!(
            QueryTypeDispatcher::render(&le).unwrap().to_json(),
            json!({"range": {"age": {"lte": 65}}})
        );
    }

    #[test]
    fn test_not_between_is_negated_range() {
        let predicate = only(ConditionList::new().not_between("age", 18, 30));
        let fragment = QueryTypeDispatcher::render(&predicate).unwrap();
        assert!(matches!(fragment, QueryFragment::Not(_)));
        assert_eq!(
            fragment.to_json(),
            json!({"bool": {"must_not": [{"range": {"age": {"gte": 18, "lte": 30}}}]}})
        );
    }

    #[test]
    fn test_in_and_not_exists() {
        let in_values = only(ConditionList::new().in_values("city", ["a", "b"]).boost(2.0));
        assert_eq!(
            QueryTypeDispatcher::render(&in_values).unwrap().to_json(),
            json!({"terms": {"city": ["a", "b"], "boost": 2.0}})
        );

        let missing = only(ConditionList::new().not_exists("email"));
        assert_eq!(
            QueryTypeDispatcher::render(&missing).unwrap(),
            QueryFragment::Exists {
                field: "email".to_string(),
                boost: None
            }
            .negate()
        );
    }

    #[test]
    fn test_boosted_match() {
        let predicate = only(ConditionList::new().matches("title", "rust").boost(3.0));
        assert_eq!(
            QueryTypeDispatcher::render(&predicate).unwrap().to_json(),
            json!({"match": {"title": {"query": "rust", "boost": 3.0}}})
        );
    }

    #[test]
    fn test_invalid_value_shape() {
        let predicate = FieldValuePredicate::new(
            "age",
            OperatorKind::Range,
            ClauseKind::Between,
            PredicateValue::Single(json!(1)),
        );
        let result = QueryTypeDispatcher::render(&predicate);
        assert!(matches!(result, Err(MapperError::ValidationError(_))));
    }
}
