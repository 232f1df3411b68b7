//! Time and value predicates

use serde::{Deserialize, Serialize};
use tidal_core::Timestamp;

/// Predicate expression over one comparable domain.
///
/// Serialized externally tagged in snake case, e.g. `{"gt": 5}`,
/// `{"between": [1, 3]}`, `{"and": [{"gt_eq": 1}, {"not": {"eq": 2}}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate<T> {
    Eq(T),
    NotEq(T),
    Gt(T),
    GtEq(T),
    Lt(T),
    LtEq(T),
    /// Inclusive on both ends
    Between(T, T),
    In(Vec<T>),
    And(Box<Predicate<T>>, Box<Predicate<T>>),
    Or(Box<Predicate<T>>, Box<Predicate<T>>),
    Not(Box<Predicate<T>>),
}

impl<T: PartialOrd> Predicate<T> {
    /// Evaluate against one value
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Predicate::Eq(v) => value == v,
            Predicate::NotEq(v) => value != v,
            Predicate::Gt(v) => value > v,
            Predicate::GtEq(v) => value >= v,
            Predicate::Lt(v) => value < v,
            Predicate::LtEq(v) => value <= v,
            Predicate::Between(lo, hi) => value >= lo && value <= hi,
            Predicate::In(set) => set.iter().any(|v| v == value),
            Predicate::And(a, b) => a.matches(value) && b.matches(value),
            Predicate::Or(a, b) => a.matches(value) || b.matches(value),
            Predicate::Not(p) => !p.matches(value),
        }
    }
}

impl<T> Predicate<T> {
    pub fn and(self, other: Predicate<T>) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate<T>) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Convert every operand, failing on the first one that does not convert
    pub fn try_map<U, E>(self, f: &mut impl FnMut(T) -> Result<U, E>) -> Result<Predicate<U>, E> {
        Ok(match self {
            Predicate::Eq(v) => Predicate::Eq(f(v)?),
            Predicate::NotEq(v) => Predicate::NotEq(f(v)?),
            Predicate::Gt(v) => Predicate::Gt(f(v)?),
            Predicate::GtEq(v) => Predicate::GtEq(f(v)?),
            Predicate::Lt(v) => Predicate::Lt(f(v)?),
            Predicate::LtEq(v) => Predicate::LtEq(f(v)?),
            Predicate::Between(lo, hi) => Predicate::Between(f(lo)?, f(hi)?),
            Predicate::In(set) => {
                Predicate::In(set.into_iter().map(&mut *f).collect::<Result<_, E>>()?)
            }
            Predicate::And(a, b) => Predicate::And(Box::new(a.try_map(f)?), Box::new(b.try_map(f)?)),
            Predicate::Or(a, b) => Predicate::Or(Box::new(a.try_map(f)?), Box::new(b.try_map(f)?)),
            Predicate::Not(p) => Predicate::Not(Box::new(p.try_map(f)?)),
        })
    }
}

/// Optional time predicate plus optional value predicate.
///
/// An absent predicate accepts everything.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<T> {
    pub time: Option<Predicate<Timestamp>>,
    pub value: Option<Predicate<T>>,
}

impl<T: PartialOrd> Filter<T> {
    /// Filter accepting every point
    pub fn none() -> Self {
        Self {
            time: None,
            value: None,
        }
    }

    pub fn with_time(mut self, predicate: Predicate<Timestamp>) -> Self {
        self.time = Some(predicate);
        self
    }

    pub fn with_value(mut self, predicate: Predicate<T>) -> Self {
        self.value = Some(predicate);
        self
    }

    /// Time predicate only
    pub fn satisfies_time(&self, timestamp: Timestamp) -> bool {
        self.time.as_ref().map_or(true, |p| p.matches(&timestamp))
    }

    /// Time predicate AND value predicate
    pub fn satisfies(&self, timestamp: Timestamp, value: &T) -> bool {
        self.satisfies_time(timestamp) && self.value.as_ref().map_or(true, |p| p.matches(value))
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.value.is_none()
    }
}

impl<T: PartialOrd> Default for Filter<T> {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert!(Predicate::Eq(5).matches(&5));
        assert!(Predicate::NotEq(5).matches(&4));
        assert!(Predicate::Gt(5).matches(&6));
        assert!(!Predicate::Gt(5).matches(&5));
        assert!(Predicate::GtEq(5).matches(&5));
        assert!(Predicate::Lt(5).matches(&4));
        assert!(Predicate::LtEq(5).matches(&5));
    }

    #[test]
    fn test_between_inclusive() {
        let p = Predicate::Between(2, 4);
        assert!(p.matches(&2));
        assert!(p.matches(&4));
        assert!(!p.matches(&1));
        assert!(!p.matches(&5));
    }

    #[test]
    fn test_combinators() {
        let p = Predicate::GtEq(10).and(Predicate::Lt(20)).or(Predicate::Eq(0));
        assert!(p.matches(&0));
        assert!(p.matches(&15));
        assert!(!p.matches(&20));

        let not_in = Predicate::In(vec![1, 3]).negate();
        assert!(not_in.matches(&2));
        assert!(!not_in.matches(&3));
    }

    #[test]
    fn test_nan_fails_ordered_comparisons() {
        assert!(!Predicate::Gt(0.0).matches(&f64::NAN));
        assert!(!Predicate::LtEq(0.0).matches(&f64::NAN));
        assert!(Predicate::NotEq(0.0).matches(&f64::NAN));
    }

    #[test]
    fn test_text_and_bool_order() {
        assert!(Predicate::Gt(b"abc".to_vec()).matches(&b"abd".to_vec()));
        assert!(Predicate::Gt(false).matches(&true));
    }

    #[test]
    fn test_filter() {
        let filter = Filter::none()
            .with_time(Predicate::GtEq(10))
            .with_value(Predicate::Lt(100));
        assert!(filter.satisfies(10, &99));
        assert!(!filter.satisfies(9, &1));
        assert!(!filter.satisfies(10, &100));
        assert!(filter.satisfies_time(11));

        let empty: Filter<i32> = Filter::default();
        assert!(empty.is_empty());
        assert!(empty.satisfies(i64::MIN, &i32::MIN));
    }

    #[test]
    fn test_try_map() {
        let p = Predicate::Between(1_i64, 3).and(Predicate::In(vec![2, 3]));
        let mapped: Predicate<i32> = p
            .try_map(&mut |v| i32::try_from(v).map_err(|_| "overflow"))
            .unwrap();
        assert!(mapped.matches(&2));

        let err = Predicate::Eq(i64::MAX).try_map(&mut |v| i32::try_from(v).map_err(|_| "overflow"));
        assert_eq!(err, Err("overflow"));
    }

    #[test]
    fn test_json_shape() {
        let p: Predicate<i64> = serde_json::from_str(r#"{"and": [{"gt_eq": 1}, {"not": {"eq": 2}}]}"#).unwrap();
        assert!(p.matches(&1));
        assert!(!p.matches(&2));

        let between: Predicate<i64> = serde_json::from_str(r#"{"between": [1, 3]}"#).unwrap();
        assert_eq!(between, Predicate::Between(1, 3));
    }
}
