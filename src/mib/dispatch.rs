//! Request dispatch over the subtree table.

use crate::oid::Oid;

use super::matcher::MatchMode;
use super::subtree::{Subtree, SubtreeTable};
use super::variable::{Found, Lookup, ValueType};

/// Outcome of resolving one OID.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Found),
    /// No variable claims the OID.
    NoSuchObject,
    /// A variable claims the OID but has no such instance.
    NoSuchInstance,
    /// GETNEXT walked past the last subtree.
    EndOfMibView,
}

impl Resolution {
    pub fn found(self) -> Option<Found> {
        match self {
            Resolution::Found(found) => Some(found),
            _ => None,
        }
    }
}

impl SubtreeTable {
    /// Resolve `request` with GET (`exact`) or GETNEXT semantics.
    pub async fn resolve(&self, request: &Oid, exact: bool) -> Resolution {
        if exact {
            self.get(request).await
        } else {
            self.get_next(request).await
        }
    }

    /// Find the variable instance named exactly by `request`.
    pub async fn get(&self, request: &Oid) -> Resolution {
        self.get_typed(request).await.0
    }

    /// Like [`get`](Self::get), also returning the declared type of the
    /// variable that answered. SET checks it before any writer runs.
    pub(crate) async fn get_typed(&self, request: &Oid) -> (Resolution, Option<ValueType>) {
        let mut claimed = false;

        // a nested subtree answers for its region ahead of the one around it
        let containing: Vec<&Subtree> = self
            .subtrees()
            .iter()
            .take_while(|subtree| subtree.base() <= request)
            .filter(|subtree| subtree.contains(request))
            .collect();

        for subtree in containing.into_iter().rev() {
            for variable in subtree.variables() {
                let name = subtree.base().join(variable.suffix());
                if !request.starts_with(&name) {
                    continue;
                }
                claimed = true;

                let lookup = Lookup {
                    name: &name,
                    variable,
                    request,
                    mode: MatchMode::Exact,
                };
                if let Some(found) = variable.handler().access(lookup).await {
                    return (Resolution::Found(found), Some(variable.value_type()));
                }
            }
        }

        tracing::trace!(target: "extsnmpd::mib", { snmp.oid = %request, claimed }, "get found nothing");
        if claimed {
            (Resolution::NoSuchInstance, None)
        } else {
            (Resolution::NoSuchObject, None)
        }
    }

    /// Find the first variable instance that sorts strictly after `request`.
    ///
    /// Subtrees may nest, so the scan keeps the smallest answer seen and
    /// stops only at a subtree whose base sorts after it.
    pub async fn get_next(&self, request: &Oid) -> Resolution {
        let mut best: Option<Found> = None;

        for subtree in self.subtrees() {
            if best.as_ref().is_some_and(|found| subtree.base() > &found.oid) {
                break;
            }
            if subtree.base() < request && !subtree.contains(request) {
                continue;
            }

            let Some(found) = next_in_subtree(subtree, request).await else {
                continue;
            };
            // on a tie the later, deeper subtree wins, as it does for GET
            if best.as_ref().is_none_or(|current| found.oid <= current.oid) {
                best = Some(found);
            }
        }

        best.map_or(Resolution::EndOfMibView, Resolution::Found)
    }
}

/// First instance in `subtree` strictly after `request`.
async fn next_in_subtree(subtree: &Subtree, request: &Oid) -> Option<Found> {
    for variable in subtree.variables() {
        let name = subtree.base().join(variable.suffix());
        if name < *request && !request.starts_with(&name) {
            continue;
        }

        let lookup = Lookup {
            name: &name,
            variable,
            request,
            mode: MatchMode::Next,
        };
        let Some(found) = variable.handler().access(lookup).await else {
            continue;
        };
        if found.oid > *request {
            return Some(found);
        }
        tracing::warn!(target: "extsnmpd::mib", { snmp.oid = %request, returned = %found.oid }, "handler answered GETNEXT without advancing");
    }
    None
}
