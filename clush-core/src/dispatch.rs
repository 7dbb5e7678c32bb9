//! Dispatch of input lines and tab completion.
//!
//! The first token is resolved against the current level's registry with the
//! fuzzy resolver. Levels are entered; commands are checked against the skill
//! level and their declared arguments, then run. A level followed by more
//! tokens runs the rest of the line inside that level and comes back out.

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::descriptor::{Descriptor, Handler, Target};
use crate::error::{Result, ShellError};
use crate::registry::Registry;

/// Run one tokenized input line. Returns whether the command reported
/// success. Errors are meant to be shown to the operator; none of them leave
/// the session unusable.
pub async fn dispatch(ctx: &mut Context, tokens: &[String]) -> Result<bool> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(true);
    };

    let registry = ctx.current_registry();
    let Some((used, descriptor)) = registry.resolve(first) else {
        debug!(name = %first, level = ctx.level_name(), "No match");
        return Err(ShellError::NotFound {
            name: first.clone(),
            level: ctx.level_name().to_string(),
        });
    };
    let used = used.to_string();
    let descriptor = Arc::clone(descriptor);

    match &descriptor.target {
        Target::Level { level, children } => {
            let depth = ctx.depth();
            ctx.enter_registered(*level, Arc::clone(children), &used)?;
            if rest.is_empty() {
                return Ok(true);
            }
            debug!(level = level.name, command = %rest[0], "Running command in transit");
            let outcome = Box::pin(dispatch(ctx, rest)).await;
            let returned = ctx.return_to(depth);
            let ok = outcome?;
            returned?;
            Ok(ok)
        }
        Target::Command { handler, .. } => run_command(ctx, &descriptor, handler, &used, rest).await,
    }
}

async fn run_command(
    ctx: &mut Context,
    descriptor: &Descriptor,
    handler: &Handler,
    used: &str,
    args: &[String],
) -> Result<bool> {
    if descriptor.skill_level > ctx.skill_level() {
        return Err(ShellError::CapabilityRefused {
            command: descriptor.name.clone(),
            required: descriptor.skill_level,
            current: ctx.skill_level(),
        });
    }
    if !descriptor.accepts(args.len()) {
        return Err(ShellError::Usage {
            command: descriptor.name.clone(),
            usage: descriptor.usage(),
        });
    }

    let must_wait = descriptor.wait || ctx.wait_all() || ctx.current_level().should_wait();
    debug!(command = %descriptor.name, used = %used, args = args.len(), "Running command");

    ctx.set_command_name(Some(used.to_string()));
    let result = (handler.as_ref())(ctx, args);
    ctx.set_command_name(None);
    let outcome = result?;

    if let Some(signal) = outcome.completion {
        if must_wait {
            debug!(command = %descriptor.name, "Waiting for completion");
            signal.wait().await.map_err(|source| ShellError::Command {
                command: descriptor.name.clone(),
                source,
            })?;
        } else {
            debug!(command = %descriptor.name, "Not waiting for completion");
        }
    }
    Ok(outcome.ok)
}

/// Completion candidates for the last token of `tokens`. An empty last token
/// asks for everything possible at that position.
pub fn complete(ctx: &Context, tokens: &[String]) -> Vec<String> {
    let registry = ctx.current_registry();
    complete_in(ctx, &registry, tokens)
}

fn complete_in(ctx: &Context, registry: &Registry, tokens: &[String]) -> Vec<String> {
    match tokens {
        [] => registry.completions().into_iter().map(String::from).collect(),
        [partial] => registry
            .completions()
            .into_iter()
            .filter(|name| name.starts_with(partial.as_str()))
            .map(String::from)
            .collect(),
        [first, rest @ ..] => {
            let Some(descriptor) = registry.get_child(first) else {
                return Vec::new();
            };
            match &descriptor.target {
                Target::Level { children, .. } => {
                    ctx.in_transit(Arc::clone(children), || complete_in(ctx, children, rest))
                }
                Target::Command { .. } => {
                    let partial = rest.last().map(String::as_str).unwrap_or("");
                    descriptor
                        .complete(ctx, rest)
                        .into_iter()
                        .filter(|candidate| candidate.starts_with(partial))
                        .collect()
                }
            }
        }
    }
}
