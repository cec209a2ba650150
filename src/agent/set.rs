//! SET with validate/commit/undo across all varbinds of a request.
//!
//! 1. Every varbind is resolved and checked against the variable's declared
//!    type, then every writer validates. Nothing has changed yet, so the
//!    first failure simply becomes the response.
//! 2. Writers commit in order. If one fails, those already committed are
//!    undone in reverse order.

use std::sync::Arc;

use crate::error::ErrorStatus;
use crate::mib::{Resolution, SetAction, WriteHandler, WriteResult};
use crate::pdu::Pdu;
use crate::varbind::VarBind;
use crate::version::Version;

use super::request::error_index;
use super::{Agent, MibView};

struct Target<'a> {
    varbind: &'a VarBind,
    writer: Arc<dyn WriteHandler>,
}

impl Agent {
    pub(super) async fn handle_set(&self, view: &MibView, pdu: &Pdu, version: Version) -> Pdu {
        let _serialized = self.inner.set_lock.lock().await;
        apply_set(view, pdu, version).await
    }
}

pub(super) async fn apply_set(view: &MibView, pdu: &Pdu, version: Version) -> Pdu {
    let fail = |status: ErrorStatus, index: usize| {
        tracing::debug!(target: "extsnmpd::agent", {
            snmp.request_id = pdu.request_id,
            snmp.oid = %pdu.varbinds[index].oid,
            status = %status
        }, "SET rejected");
        let status = match version {
            Version::V1 => status.to_v1(),
            Version::V2c => status,
        };
        pdu.to_error_response(status, error_index(index))
    };

    let mut targets = Vec::with_capacity(pdu.varbinds.len());
    for (index, varbind) in pdu.varbinds.iter().enumerate() {
        let (resolution, value_type) = view.table.get_typed(&varbind.oid).await;
        let writer = match resolution {
            Resolution::Found(found) => match found.writer {
                Some(writer) => writer,
                None if version == Version::V1 => return fail(ErrorStatus::ReadOnly, index),
                None => return fail(ErrorStatus::NotWritable, index),
            },
            Resolution::NoSuchInstance => return fail(ErrorStatus::NoCreation, index),
            Resolution::NoSuchObject | Resolution::EndOfMibView => {
                return fail(ErrorStatus::NotWritable, index);
            }
        };
        if !value_type.is_some_and(|t| t.accepts(&varbind.value)) {
            return fail(ErrorStatus::WrongType, index);
        }
        targets.push(Target { varbind, writer });
    }

    for (index, target) in targets.iter().enumerate() {
        let result = phase(target, SetAction::Validate).await;
        if !result.is_ok() {
            return fail(result.status(), index);
        }
    }

    for (index, target) in targets.iter().enumerate() {
        let result = phase(target, SetAction::Commit).await;
        if result.is_ok() {
            continue;
        }

        let mut undo_failed = false;
        for done in targets[..index].iter().rev() {
            if !phase(done, SetAction::Undo).await.is_ok() {
                tracing::warn!(target: "extsnmpd::agent", { snmp.oid = %done.varbind.oid }, "undo failed");
                undo_failed = true;
            }
        }

        let status = match result {
            _ if undo_failed => ErrorStatus::UndoFailed,
            WriteResult::Failed(ErrorStatus::NoError) => ErrorStatus::CommitFailed,
            failed => failed.status(),
        };
        return fail(status, index);
    }

    tracing::debug!(target: "extsnmpd::agent", { snmp.request_id = pdu.request_id, varbinds = targets.len() }, "SET committed");
    pdu.to_response(pdu.varbinds.clone())
}

async fn phase(target: &Target<'_>, action: SetAction) -> WriteResult {
    target
        .writer
        .apply(action, &target.varbind.value, &target.varbind.oid)
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AgentConfig;
    use crate::extensible::{CommandRunner, ProcessLauncher};
    use crate::mib::{
        Access, BoxFuture, Found, Lookup, Magic, MatchMode, Subtree, SubtreeKind, SubtreeTable,
        ValueType, Variable, VariableHandler,
    };
    use crate::oid;
    use crate::oid::Oid;
    use crate::value::Value;

    fn view() -> MibView {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessLauncher::new());
        MibView::build(&AgentConfig::from_text("sysname before\n"), &runner).unwrap()
    }

    /// Instance `.1` commits but cannot be undone; instance `.2` fails to commit.
    struct Brittle;

    impl VariableHandler for Brittle {
        fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
            Box::pin(async move {
                let instance = lookup.request.last()?;
                let exact = lookup.mode != MatchMode::Next
                    && lookup.request.len() == lookup.name.len() + 1
                    && lookup.request.starts_with(lookup.name)
                    && (1..=2).contains(&instance);
                exact.then(|| {
                    let writer = Arc::new(BrittleWriter(instance));
                    Found::writable(lookup.request.clone(), Value::Integer(0), writer)
                })
            })
        }
    }

    struct BrittleWriter(u32);

    impl WriteHandler for BrittleWriter {
        fn apply<'a>(
            &'a self,
            action: SetAction,
            _value: &'a Value,
            _target: &'a Oid,
        ) -> BoxFuture<'a, WriteResult> {
            Box::pin(async move {
                match (action, self.0) {
                    (SetAction::Validate, _) => WriteResult::Ok,
                    (SetAction::Commit, 1) => WriteResult::Ok,
                    (SetAction::Commit, _) => WriteResult::Failed(ErrorStatus::NoError),
                    (SetAction::Undo, _) => WriteResult::Failed(ErrorStatus::UndoFailed),
                }
            })
        }
    }

    fn brittle() -> Oid {
        oid!(1, 3, 6, 1, 4, 1, 9999)
    }

    /// The usual view plus a subtree of brittle instances.
    fn view_with_brittle() -> MibView {
        let base = view();
        let handler: Arc<dyn VariableHandler> = Arc::new(Brittle);
        let variables = vec![Variable::new(
            Magic::PassThrough,
            ValueType::Any,
            Access::ReadWrite,
            Oid::empty(),
            handler,
        )];
        let mut subtrees = base.table.subtrees().to_vec();
        subtrees.push(Subtree::new(brittle(), Arc::from(variables), SubtreeKind::PassThrough));
        MibView {
            table: SubtreeTable::from_subtrees(subtrees),
            registry: base.registry,
            system: base.system,
        }
    }

    async fn sys_name(view: &MibView) -> Value {
        view.table
            .get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0))
            .await
            .found()
            .unwrap()
            .value
    }

    #[tokio::test]
    async fn set_writes_and_echoes_varbinds() {
        let view = view();
        let pdu = Pdu::set_request(
            4,
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("after"))],
        );

        let response = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(response.error_status, 0);
        assert_eq!(response.varbinds, pdu.varbinds);
        assert_eq!(sys_name(&view).await, Value::from("after"));
    }

    #[tokio::test]
    async fn read_only_object() {
        let view = view();
        let pdu = Pdu::set_request(
            1,
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("x"))],
        );

        let v2 = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(v2.error_status(), ErrorStatus::NotWritable);
        assert_eq!(v2.error_index, 1);

        let v1 = apply_set(&view, &pdu, Version::V1).await;
        assert_eq!(v1.error_status(), ErrorStatus::ReadOnly);
    }

    #[tokio::test]
    async fn missing_objects() {
        let view = view();
        let no_instance = Pdu::set_request(
            1,
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 7), Value::from("x"))],
        );
        assert_eq!(
            apply_set(&view, &no_instance, Version::V2c).await.error_status(),
            ErrorStatus::NoCreation
        );

        let no_object = Pdu::set_request(1, vec![VarBind::new(oid!(1, 3, 6, 1, 6), Value::Integer(1))]);
        assert_eq!(
            apply_set(&view, &no_object, Version::V2c).await.error_status(),
            ErrorStatus::NotWritable
        );
        assert_eq!(
            apply_set(&view, &no_object, Version::V1).await.error_status(),
            ErrorStatus::NoSuchName
        );
    }

    #[tokio::test]
    async fn wrong_type_changes_nothing() {
        let view = view();
        let pdu = Pdu::set_request(
            1,
            vec![
                VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 6, 0), Value::from("moved")),
                VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::Integer(5)),
            ],
        );

        let v2 = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(v2.error_status(), ErrorStatus::WrongType);
        assert_eq!(v2.error_index, 2);
        assert_eq!(sys_name(&view).await, Value::from("before"));

        let v1 = apply_set(&view, &pdu, Version::V1).await;
        assert_eq!(v1.error_status(), ErrorStatus::BadValue);
    }

    #[tokio::test]
    async fn validation_failure_on_length() {
        let view = view();
        let pdu = Pdu::set_request(
            1,
            vec![VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
                Value::from("x".repeat(300)),
            )],
        );
        let response = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(response.error_status(), ErrorStatus::WrongLength);
        assert_eq!(sys_name(&view).await, Value::from("before"));
    }

    #[tokio::test]
    async fn failed_commit_undoes_earlier_writes() {
        let view = view_with_brittle();
        let pdu = Pdu::set_request(
            9,
            vec![
                VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("after")),
                VarBind::new(brittle().child(2), Value::Integer(1)),
            ],
        );

        let response = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(response.error_status(), ErrorStatus::CommitFailed);
        assert_eq!(response.error_index, 2);
        assert_eq!(sys_name(&view).await, Value::from("before"));
    }

    #[tokio::test]
    async fn failed_undo_is_reported() {
        let view = view_with_brittle();
        let pdu = Pdu::set_request(
            9,
            vec![
                VarBind::new(brittle().child(1), Value::Integer(1)),
                VarBind::new(brittle().child(2), Value::Integer(1)),
            ],
        );

        let v2 = apply_set(&view, &pdu, Version::V2c).await;
        assert_eq!(v2.error_status(), ErrorStatus::UndoFailed);
        assert_eq!(v2.error_index, 2);

        let v1 = apply_set(&view, &pdu, Version::V1).await;
        assert_eq!(v1.error_status(), ErrorStatus::GenErr);
    }
}
