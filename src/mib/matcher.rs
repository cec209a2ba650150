//! OID instance matching.
//!
//! Every table column is served by a single variable whose name is a fixed
//! prefix; the instance is the one arc that follows it. [`match_instance`]
//! decides whether a request addresses a valid instance of that column (GET)
//! or which instance comes next (GETNEXT), and returns the concrete OID.
//!
//! Scalars use [`match_scalar`] instead, where the only instance is `.0`.

use std::cmp::Ordering;

use crate::oid::Oid;

/// Upper bound on line-indexed message instances.
pub const MAX_MSG_LINES: u32 = 1000;

/// How a request should be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// GET/SET: the request must name exactly one valid instance.
    Exact,
    /// GETNEXT: find the smallest instance strictly after the request.
    Next,
    /// Relaxed lookup: report which instance the request falls on, without
    /// requiring an exact length and without advancing.
    Probe,
}

impl MatchMode {
    pub fn from_exact(exact: bool) -> Self {
        if exact { Self::Exact } else { Self::Next }
    }
}

/// How many instances a column has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceBound {
    /// Instances `1..=n`.
    Limit(u32),
    /// Any positive instance.
    Unbounded,
}

impl InstanceBound {
    fn admits(self, instance: u32) -> bool {
        match self {
            Self::Limit(max) => instance <= max,
            Self::Unbounded => true,
        }
    }
}

impl From<usize> for InstanceBound {
    fn from(count: usize) -> Self {
        Self::Limit(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// Match `request` against the column `prefix`.
///
/// Returns `prefix.<instance>` on success. Instance `0`, an instance past
/// `bound`, or a request that sorts after the whole column is exhaustion
/// and yields `None`; the caller moves on to the next variable.
///
/// ```
/// use extsnmpd::mib::{InstanceBound, MatchMode, match_instance};
/// use extsnmpd::oid;
///
/// let column = oid!(1, 3, 6, 1, 4, 1, 2021, 8, 1, 2);
/// let bound = InstanceBound::Limit(3);
///
/// assert_eq!(
///     match_instance(&column, &column.child(2), MatchMode::Exact, bound),
///     Some(column.child(2))
/// );
/// assert_eq!(
///     match_instance(&column, &column.child(2), MatchMode::Next, bound),
///     Some(column.child(3))
/// );
/// assert_eq!(match_instance(&column, &column.child(3), MatchMode::Next, bound), None);
/// ```
pub fn match_instance(
    prefix: &Oid,
    request: &Oid,
    mode: MatchMode,
    bound: InstanceBound,
) -> Option<Oid> {
    let p = prefix.arcs();
    let r = request.arcs();

    let order = p
        .iter()
        .zip(r)
        .map(|(want, got)| got.cmp(want))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal);

    if order == Ordering::Greater {
        return None;
    }
    if mode == MatchMode::Exact && (order != Ordering::Equal || r.len() != p.len() + 1) {
        return None;
    }

    let instance = if order == Ordering::Less || r.len() <= p.len() {
        1
    } else {
        let requested = r[p.len()];
        match mode {
            MatchMode::Next => requested.checked_add(1)?,
            MatchMode::Exact | MatchMode::Probe => requested,
        }
    };

    if instance == 0 || !bound.admits(instance) {
        return None;
    }

    Some(prefix.child(instance))
}

/// Match `request` against the scalar `name`, whose only instance is `name.0`.
pub fn match_scalar(name: &Oid, request: &Oid, mode: MatchMode) -> Option<Oid> {
    let instance = name.child(0);
    let hit = match mode {
        MatchMode::Exact | MatchMode::Probe => *request == instance,
        MatchMode::Next => *request < instance,
    };
    hit.then_some(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn column() -> Oid {
        oid!(1, 3, 6, 1, 4, 1, 2021, 8, 1, 101)
    }

    #[test]
    fn exact_requires_single_instance_arc() {
        let c = column();
        let bound = InstanceBound::Limit(5);
        assert_eq!(match_instance(&c, &c, MatchMode::Exact, bound), None);
        assert_eq!(
            match_instance(&c, &c.child(1).child(0), MatchMode::Exact, bound),
            None
        );
        assert_eq!(
            match_instance(&c, &c.child(5), MatchMode::Exact, bound),
            Some(c.child(5))
        );
    }

    #[test]
    fn exact_rejects_zero_and_out_of_bound() {
        let c = column();
        let bound = InstanceBound::Limit(2);
        assert_eq!(match_instance(&c, &c.child(0), MatchMode::Exact, bound), None);
        assert_eq!(match_instance(&c, &c.child(3), MatchMode::Exact, bound), None);
        assert_eq!(
            match_instance(&c, &c.child(u32::MAX), MatchMode::Exact, InstanceBound::Unbounded),
            Some(c.child(u32::MAX))
        );
    }

    #[test]
    fn next_from_before_column_yields_first_instance() {
        let c = column();
        let bound = InstanceBound::Limit(1);
        assert_eq!(
            match_instance(&c, &oid!(1, 3, 6), MatchMode::Next, bound),
            Some(c.child(1))
        );
        assert_eq!(
            match_instance(&c, &oid!(1, 3, 6, 1, 4, 1, 2021, 8, 1, 3, 9), MatchMode::Next, bound),
            Some(c.child(1))
        );
        assert_eq!(match_instance(&c, &c, MatchMode::Next, bound), Some(c.child(1)));
        assert_eq!(match_instance(&c, &c.child(0), MatchMode::Next, bound), Some(c.child(1)));
    }

    #[test]
    fn next_past_deeper_request_advances() {
        let c = column();
        let bound = InstanceBound::Limit(MAX_MSG_LINES);
        assert_eq!(
            match_instance(&c, &c.child(3).child(7), MatchMode::Next, bound),
            Some(c.child(4))
        );
    }

    #[test]
    fn next_after_column_is_exhausted() {
        let c = column();
        let after = oid!(1, 3, 6, 1, 4, 1, 2021, 8, 1, 102);
        assert_eq!(
            match_instance(&c, &after, MatchMode::Next, InstanceBound::Unbounded),
            None
        );
        assert_eq!(match_instance(&c, &c.child(1), MatchMode::Next, InstanceBound::Limit(0)), None);
    }

    #[test]
    fn next_arc_overflow_is_exhaustion() {
        let c = column();
        assert_eq!(
            match_instance(&c, &c.child(u32::MAX), MatchMode::Next, InstanceBound::Unbounded),
            None
        );
    }

    #[test]
    fn probe_does_not_advance() {
        let c = column();
        assert_eq!(
            match_instance(&c, &c.child(4), MatchMode::Probe, InstanceBound::Unbounded),
            Some(c.child(4))
        );
        assert_eq!(
            match_instance(&c, &c.child(4).child(2), MatchMode::Probe, InstanceBound::Unbounded),
            Some(c.child(4))
        );
        assert_eq!(
            match_instance(&c, &c, MatchMode::Probe, InstanceBound::Unbounded),
            Some(c.child(1))
        );
    }

    #[test]
    fn scalar_matching() {
        let name = oid!(1, 3, 6, 1, 2, 1, 1, 5);
        let instance = name.child(0);
        assert_eq!(match_scalar(&name, &instance, MatchMode::Exact), Some(instance.clone()));
        assert_eq!(match_scalar(&name, &name, MatchMode::Exact), None);
        assert_eq!(match_scalar(&name, &name, MatchMode::Next), Some(instance.clone()));
        assert_eq!(match_scalar(&name, &instance, MatchMode::Next), None);
        assert_eq!(match_scalar(&name, &instance.child(1), MatchMode::Next), None);
    }
}
