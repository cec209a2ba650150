//! Subtrees and the sorted subtree table.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::extensible::{ExtensibleSchemas, ListKind, Registry};
use crate::oid::Oid;

use super::variable::Variable;

/// Where a subtree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeKind {
    /// Compiled into the agent.
    Static,
    /// Mounted at the OID of a general-list extensible entry.
    Relocated,
    /// Mounted at the OID of a `pass` registration.
    PassThrough,
}

/// A contiguous region of the MIB served by one variable list.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    base: Oid,
    variables: Arc<[Variable]>,
    kind: SubtreeKind,
}

impl Subtree {
    /// Create a subtree. `variables` must be ordered by suffix.
    pub fn new(base: Oid, variables: Arc<[Variable]>, kind: SubtreeKind) -> Self {
        debug_assert!(
            variables.windows(2).all(|w| w[0].suffix() < w[1].suffix()),
            "subtree variables out of order"
        );
        Self {
            base,
            variables,
            kind,
        }
    }

    pub fn base(&self) -> &Oid {
        &self.base
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The shared variable list, for comparing schema bindings.
    pub fn schema(&self) -> &Arc<[Variable]> {
        &self.variables
    }

    pub fn kind(&self) -> SubtreeKind {
        self.kind
    }

    /// Does `oid` fall inside this subtree's region?
    pub fn contains(&self, oid: &Oid) -> bool {
        oid.starts_with(&self.base)
    }
}

/// All subtrees of the agent, sorted by base OID.
///
/// Immutable once built. Reconfiguration builds a new table rather than
/// editing this one.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeTable {
    subtrees: Vec<Subtree>,
}

impl SubtreeTable {
    /// Build the table from static subtrees plus everything in the registry.
    ///
    /// Static subtrees are copied first, then one [`SubtreeKind::Relocated`]
    /// subtree per general-list entry, then one [`SubtreeKind::PassThrough`]
    /// subtree per `pass` registration. The result is sorted by base OID.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the table cannot be allocated. No partial
    /// table is returned.
    pub fn build(
        statics: &[Subtree],
        registry: &Registry,
        schemas: &ExtensibleSchemas,
    ) -> Result<Self> {
        let general = registry.entries(ListKind::General);
        let passes = registry.pass_entries();
        let requested = statics.len() + general.len() + passes.len();

        let mut subtrees = Vec::new();
        subtrees
            .try_reserve_exact(requested)
            .map_err(|_| Error::Allocation { requested }.boxed())?;

        subtrees.extend_from_slice(statics);
        subtrees.extend(general.iter().filter_map(|entry| {
            entry
                .oid()
                .map(|oid| Subtree::new(oid.clone(), schemas.general(), SubtreeKind::Relocated))
        }));
        subtrees.extend(
            passes
                .iter()
                .map(|pass| Subtree::new(pass.oid().clone(), schemas.pass(), SubtreeKind::PassThrough)),
        );

        Ok(Self::from_subtrees(subtrees))
    }

    /// Sort `subtrees` into a table.
    ///
    /// A duplicate base is a configuration error: it is logged and the
    /// first subtree registered at that base is kept. A subtree nested inside
    /// another is kept; dispatch gives it precedence within its region.
    pub fn from_subtrees(mut subtrees: Vec<Subtree>) -> Self {
        // stable: registration order decides which duplicate survives
        subtrees.sort_by(|a, b| a.base.cmp(&b.base));
        subtrees.dedup_by(|later, kept| {
            let duplicate = later.base == kept.base;
            if duplicate {
                tracing::warn!(target: "extsnmpd::mib", { snmp.oid = %later.base, kind = ?later.kind }, "duplicate subtree registration ignored");
            }
            duplicate
        });

        for pair in subtrees.windows(2) {
            if pair[1].base.starts_with(&pair[0].base) {
                tracing::debug!(target: "extsnmpd::mib", { snmp.oid = %pair[1].base, parent = %pair[0].base }, "subtree nested inside another; it answers for its own region");
            }
        }

        tracing::debug!(target: "extsnmpd::mib", { subtrees = subtrees.len() }, "subtree table built");
        Self { subtrees }
    }

    pub fn subtrees(&self) -> &[Subtree] {
        &self.subtrees
    }

    pub fn len(&self) -> usize {
        self.subtrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtrees.is_empty()
    }

    /// Same ordering and the same schema bound to every subtree.
    pub fn same_layout(&self, other: &SubtreeTable) -> bool {
        self.subtrees.len() == other.subtrees.len()
            && self.subtrees.iter().zip(&other.subtrees).all(|(a, b)| {
                a.base == b.base && a.kind == b.kind && Arc::ptr_eq(&a.variables, &b.variables)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mib::{Access, BoxFuture, Found, Lookup, Magic, ValueType, VariableHandler};
    use crate::oid;

    struct Silent;

    impl VariableHandler for Silent {
        fn access<'a>(&'a self, _lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
            Box::pin(async { None })
        }
    }

    fn schema() -> Arc<[Variable]> {
        let handler: Arc<dyn VariableHandler> = Arc::new(Silent);
        Arc::from(vec![Variable::new(
            Magic::PassThrough,
            ValueType::Any,
            Access::ReadOnly,
            Oid::empty(),
            handler,
        )])
    }

    #[test]
    fn sorted_after_build() {
        let vars = schema();
        let table = SubtreeTable::from_subtrees(vec![
            Subtree::new(oid!(1, 3, 6, 1, 4), vars.clone(), SubtreeKind::Static),
            Subtree::new(oid!(1, 3, 6, 1, 2, 1, 1), vars.clone(), SubtreeKind::Static),
            Subtree::new(oid!(1, 2), vars.clone(), SubtreeKind::Relocated),
        ]);

        let bases: Vec<_> = table.subtrees().iter().map(|s| s.base().to_string()).collect();
        assert_eq!(bases, ["1.2", "1.3.6.1.2.1.1", "1.3.6.1.4"]);
    }

    #[test]
    fn duplicate_keeps_first_registration() {
        let vars = schema();
        let table = SubtreeTable::from_subtrees(vec![
            Subtree::new(oid!(1, 5), vars.clone(), SubtreeKind::Static),
            Subtree::new(oid!(1, 4), vars.clone(), SubtreeKind::Relocated),
            Subtree::new(oid!(1, 5), vars.clone(), SubtreeKind::PassThrough),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.subtrees()[1].kind(), SubtreeKind::Static);
    }

    #[test]
    fn contains_is_prefix_match() {
        let sub = Subtree::new(oid!(1, 3, 6), schema(), SubtreeKind::Static);
        assert!(sub.contains(&oid!(1, 3, 6)));
        assert!(sub.contains(&oid!(1, 3, 6, 9)));
        assert!(!sub.contains(&oid!(1, 3, 7)));
        assert!(!sub.contains(&oid!(1, 3)));
    }
}
