//! Condition types for the query compiler.
//!
//! A [`ConditionList`] is a flat, ordered sequence of predicate batches
//! interleaved with grouping markers. It is the input consumed by the boolean
//! query compiler in the repository crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of backend query a predicate renders to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    /// Exact (non-analyzed) match.
    Eq,
    /// Analyzed full-text match.
    Match,
    Prefix,
    Wildcard,
    Range,
    Terms,
    Exists,
}

/// The boolean slot, or comparison variant, a predicate is attached under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClauseKind {
    Must,
    Filter,
    Should,
    MustNot,
    Gt,
    Lt,
    Ge,
    Le,
    Between,
    NotBetween,
    In,
    NotIn,
    Exists,
    NotExists,
    LikeLeft,
    LikeRight,
}

impl ClauseKind {
    /// Returns true for the kinds whose fragment is wrapped in a negation.
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            ClauseKind::NotBetween | ClauseKind::NotIn | ClauseKind::NotExists
        )
    }
}

/// The value(s) carried by a predicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PredicateValue {
    /// No value (presence checks).
    #[default]
    None,
    /// A single scalar value.
    Single(Value),
    /// A value set (membership checks).
    Many(Vec<Value>),
    /// Inclusive lower and upper bounds.
    Bounds { low: Value, high: Value },
}

/// One search condition: a field, how it is queried, and where it is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValuePredicate {
    pub field: String,
    pub operator: OperatorKind,
    /// The clause kind currently in effect. Rewritten to `Should` when the
    /// predicate joins a disjunction.
    pub clause: ClauseKind,
    /// The clause kind the predicate was created with. Never rewritten.
    pub original_clause: ClauseKind,
    #[serde(default)]
    pub value: PredicateValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
}

impl FieldValuePredicate {
    /// Create a predicate. `original_clause` starts out equal to `clause`.
    pub fn new(
        field: impl Into<String>,
        operator: OperatorKind,
        clause: ClauseKind,
        value: PredicateValue,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            clause,
            original_clause: clause,
            value,
            boost: None,
        }
    }

    /// Set the boost weight.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Move the predicate into the disjunction (`Should`) while keeping its
    /// original kind for rendering.
    pub fn reclassify_as_should(&mut self) {
        self.clause = ClauseKind::Should;
    }

    /// Returns true when the predicate has been moved into a disjunction.
    pub fn is_reclassified(&self) -> bool {
        self.clause == ClauseKind::Should && self.original_clause != ClauseKind::Should
    }

    /// Check the value shape against the clause kind.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.field.trim().is_empty() {
            return Err("Predicate field cannot be empty".to_string());
        }

        match (self.original_clause, &self.value) {
            (ClauseKind::Between | ClauseKind::NotBetween, PredicateValue::Bounds { .. }) => Ok(()),
            (ClauseKind::Between | ClauseKind::NotBetween, _) => Err(format!(
                "{:?} on '{}' requires both a low and a high value",
                self.original_clause, self.field
            )),
            (ClauseKind::In | ClauseKind::NotIn, PredicateValue::Many(values))
                if !values.is_empty() =>
            {
                Ok(())
            }
            (ClauseKind::In | ClauseKind::NotIn, _) => Err(format!(
                "{:?} on '{}' requires a non-empty value set",
                self.original_clause, self.field
            )),
            (ClauseKind::Exists | ClauseKind::NotExists, PredicateValue::None) => Ok(()),
            (ClauseKind::Exists | ClauseKind::NotExists, _) => Err(format!(
                "{:?} on '{}' does not take a value",
                self.original_clause, self.field
            )),
            // A terms or exists operator may sit directly in an occurrence slot.
            (_, PredicateValue::Many(values))
                if self.operator == OperatorKind::Terms && !values.is_empty() =>
            {
                Ok(())
            }
            (_, PredicateValue::None) if self.operator == OperatorKind::Exists => Ok(()),
            (_, PredicateValue::Single(_)) => Ok(()),
            _ => Err(format!(
                "{:?} on '{}' requires exactly one value",
                self.original_clause, self.field
            )),
        }
    }
}

/// Structural markers delimiting groups and disjunction chains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupMarker {
    AndGroupOpen,
    OrGroupOpen,
    AndGroupClose,
    OrGroupClose,
    OrChain,
}

impl GroupMarker {
    pub fn is_open(&self) -> bool {
        matches!(self, GroupMarker::AndGroupOpen | GroupMarker::OrGroupOpen)
    }

    pub fn is_close(&self) -> bool {
        matches!(self, GroupMarker::AndGroupClose | GroupMarker::OrGroupClose)
    }

    /// The close marker pairing with this open marker.
    pub fn closing(&self) -> Option<GroupMarker> {
        match self {
            GroupMarker::AndGroupOpen => Some(GroupMarker::AndGroupClose),
            GroupMarker::OrGroupOpen => Some(GroupMarker::OrGroupClose),
            _ => None,
        }
    }
}

/// One entry of a [`ConditionList`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionEntry {
    /// Predicates appended by one call, emitted as sibling fragments in order.
    Predicates(Vec<FieldValuePredicate>),
    Marker(GroupMarker),
}

impl ConditionEntry {
    pub fn as_marker(&self) -> Option<GroupMarker> {
        match self {
            ConditionEntry::Marker(marker) => Some(*marker),
            ConditionEntry::Predicates(_) => None,
        }
    }
}

/// Ordered sequence of predicate batches and grouping markers.
///
/// # Example
///
/// ```
/// use esplus_shared::ConditionList;
///
/// // gender = male AND (age = 30 OR age = 40)
/// let conditions = ConditionList::new()
///     .eq("gender", "male")
///     .and_group(|c| c.eq("age", 30).or().eq("age", 40));
/// assert_eq!(conditions.len(), 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct ConditionList {
    entries: Vec<ConditionEntry>,
}

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from raw entries.
    pub fn from_entries(entries: Vec<ConditionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ConditionEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a batch of predicates as a single entry.
    pub fn push_batch(mut self, predicates: Vec<FieldValuePredicate>) -> Self {
        self.entries.push(ConditionEntry::Predicates(predicates));
        self
    }

    /// Append a raw marker.
    pub fn push_marker(mut self, marker: GroupMarker) -> Self {
        self.entries.push(ConditionEntry::Marker(marker));
        self
    }

    fn push(self, predicate: FieldValuePredicate) -> Self {
        self.push_batch(vec![predicate])
    }

    fn single(
        self,
        field: impl Into<String>,
        operator: OperatorKind,
        clause: ClauseKind,
        value: impl Into<Value>,
    ) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            operator,
            clause,
            PredicateValue::Single(value.into()),
        ))
    }

    /// Set the boost of the most recently appended predicate.
    pub fn boost(mut self, boost: f32) -> Self {
        if let Some(predicate) = self.entries.iter_mut().rev().find_map(|entry| match entry {
            ConditionEntry::Predicates(batch) => batch.last_mut(),
            ConditionEntry::Marker(_) => None,
        }) {
            predicate.boost = Some(boost);
        }
        self
    }

    /// `field == value`, scored.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Eq, ClauseKind::Must, value)
    }

    /// `field != value`.
    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Eq, ClauseKind::MustNot, value)
    }

    /// `field == value` in filter context (not scored).
    pub fn filter(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Eq, ClauseKind::Filter, value)
    }

    /// `field == value` as an optional (should) clause.
    pub fn should(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Eq, ClauseKind::Should, value)
    }

    /// Exclude documents whose analyzed `field` matches `text`.
    pub fn must_not(self, field: impl Into<String>, text: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Match, ClauseKind::MustNot, text)
    }

    /// Analyzed full-text match.
    pub fn matches(self, field: impl Into<String>, text: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Match, ClauseKind::Must, text)
    }

    pub fn prefix(self, field: impl Into<String>, prefix: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Prefix, ClauseKind::Must, prefix)
    }

    /// `*value*`
    pub fn like(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Wildcard, ClauseKind::Must, value)
    }

    /// `*value`
    pub fn like_left(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Wildcard, ClauseKind::LikeLeft, value)
    }

    /// `value*`
    pub fn like_right(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Wildcard, ClauseKind::LikeRight, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Range, ClauseKind::Gt, value)
    }

    pub fn ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Range, ClauseKind::Ge, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Range, ClauseKind::Lt, value)
    }

    pub fn le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.single(field, OperatorKind::Range, ClauseKind::Le, value)
    }

    /// `low <= field <= high`
    pub fn between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Range,
            ClauseKind::Between,
            PredicateValue::Bounds {
                low: low.into(),
                high: high.into(),
            },
        ))
    }

    pub fn not_between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Range,
            ClauseKind::NotBetween,
            PredicateValue::Bounds {
                low: low.into(),
                high: high.into(),
            },
        ))
    }

    pub fn in_values<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Terms,
            ClauseKind::In,
            PredicateValue::Many(values.into_iter().map(Into::into).collect()),
        ))
    }

    pub fn not_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Terms,
            ClauseKind::NotIn,
            PredicateValue::Many(values.into_iter().map(Into::into).collect()),
        ))
    }

    /// The field is present (non-null).
    pub fn exists(self, field: impl Into<String>) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Exists,
            ClauseKind::Exists,
            PredicateValue::None,
        ))
    }

    /// The field is absent or null.
    pub fn not_exists(self, field: impl Into<String>) -> Self {
        self.push(FieldValuePredicate::new(
            field,
            OperatorKind::Exists,
            ClauseKind::NotExists,
            PredicateValue::None,
        ))
    }

    /// Everything appended after this point at the same level joins one disjunction.
    pub fn or(self) -> Self {
        self.push_marker(GroupMarker::OrChain)
    }

    /// Wrap the conditions added by `build` in an AND group.
    pub fn and_group(self, build: impl FnOnce(ConditionList) -> ConditionList) -> Self {
        self.group(GroupMarker::AndGroupOpen, build)
    }

    /// Wrap the conditions added by `build` in an OR group.
    pub fn or_group(self, build: impl FnOnce(ConditionList) -> ConditionList) -> Self {
        self.group(GroupMarker::OrGroupOpen, build)
    }

    fn group(
        mut self,
        open: GroupMarker,
        build: impl FnOnce(ConditionList) -> ConditionList,
    ) -> Self {
        let inner = build(ConditionList::new());
        self.entries.push(ConditionEntry::Marker(open));
        self.entries.extend(inner.entries);
        if let Some(close) = open.closing() {
            self.entries.push(ConditionEntry::Marker(close));
        }
        self
    }
}
