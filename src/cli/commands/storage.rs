//! Actions that forward to the remote storage service.
//!
//! The operation name is the command path in dotted form (`volume ls` ->
//! `volume.ls`); explicit non-ambient flags become request parameters.

use serde_json::Value;

use crate::cli::output;
use crate::client::Operation;
use crate::config::KEY_CLIENT_SERVICE;
use crate::error::{ClientError, CliError};
use crate::invocation::Invocation;
use crate::signal::{Abort, Flow};

/// One operation; positional arguments are sent as `ids`.
pub fn call_once(inv: &mut Invocation, args: &[String]) -> Flow {
    let mut op = operation(inv);
    if !args.is_empty() {
        op = op.param("ids", args.to_vec());
    }
    match invoke(inv, op)? {
        Ok(value) => output::emit(inv, &value),
        Err(err) => Err(inv.report(&err)),
    }
}

/// One operation per positional id, honoring `--continueOnError`.
pub fn call_each(inv: &mut Invocation, args: &[String]) -> Flow {
    if args.is_empty() {
        let message = format!("`{}` requires at least one id", inv.command);
        return Err(inv.report(&message));
    }
    let keep_going = inv.flags.get_bool("continueOnError");
    let mut results = Vec::with_capacity(args.len());
    let mut failures = 0;

    for id in args {
        let op = operation(inv).param("id", id.as_str());
        match invoke(inv, op)? {
            Ok(Value::Null) => {}
            Ok(value) => results.push(value),
            Err(err) if keep_going => {
                tracing::error!(%id, %err, "operation failed; continuing");
                failures += 1;
            }
            Err(err) => return Err(inv.report(&err)),
        }
    }

    if !results.is_empty() {
        output::emit(inv, &Value::Array(results))?;
    }
    if failures > 0 {
        let message = format!("{failures} of {} operations failed", args.len());
        return Err(inv.report(&message));
    }
    Ok(())
}

fn operation(inv: &Invocation) -> Operation {
    Operation::new(inv.command.operation_name())
        .service(Some(inv.config.get_string(KEY_CLIENT_SERVICE)))
        .params(inv.flags.params())
}

/// Issue `op`, or describe it under `--dryRun`. The outer error aborts; the
/// inner one is the service's answer.
fn invoke(inv: &mut Invocation, op: Operation) -> Flow<Result<Value, ClientError>> {
    if inv.flags.get_bool("dryRun") {
        inv.print(&format!(
            "dry run: {} {}",
            op.name,
            Value::Object(op.params)
        ))?;
        return Ok(Ok(Value::Null));
    }
    let Some(client) = inv.client.as_ref() else {
        return Err(Abort::Fault(CliError::Defect(format!(
            "`{}` ran without a storage client",
            op.name
        ))));
    };
    tracing::debug!(operation = %op.name, "calling storage service");
    Ok(client.call(op))
}
