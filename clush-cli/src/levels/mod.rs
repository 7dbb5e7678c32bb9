//! The level tree of the `clush` binary.

pub mod configure;
pub mod node;
pub mod options;
pub mod ra;
pub mod resource;

use clush_core::{
    CommandError, Completer, Context, LevelType, Member, Outcome, Result, ShellError,
};

use crate::cluster::Cluster;

pub const ROOT: LevelType = LevelType::stateless("root", root_members);

fn root_members() -> Vec<Member> {
    vec![
        Member::level("do_resource", resource::RESOURCE),
        Member::level("do_configure", configure::CONFIGURE).alias("cib"),
        Member::level("do_node", node::NODE),
        Member::level("do_options", options::OPTIONS),
        Member::command("do_status", do_status).help("Show cluster status"),
    ]
}

fn do_status(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let report = {
        let state = cluster.lock();
        let mut lines = vec![format!(
            "Nodes: {}",
            state
                .nodes
                .iter()
                .map(|(name, node_state)| format!("{name} ({node_state})"))
                .collect::<Vec<_>>()
                .join(", ")
        )];
        lines.push("Resources:".into());
        lines.extend(state.resources.iter().map(|(name, rsc)| {
            resource::describe(name, rsc)
        }));
        lines.join("\n")
    };
    ctx.println(report)?;
    Ok(Outcome::success())
}

/// The cluster the session operates on.
pub(crate) fn cluster(ctx: &Context) -> Result<Cluster> {
    ctx.extension::<Cluster>()
        .cloned()
        .ok_or_else(|| ctx.fail("not connected to a cluster"))
}

pub(crate) fn invalid(ctx: &Context, value: &str, reason: &str) -> ShellError {
    ShellError::Command {
        command: ctx.command_name().unwrap_or_default().to_string(),
        source: CommandError::InvalidArgument {
            value: value.to_string(),
            reason: reason.to_string(),
        },
    }
}

/// Completes the first argument with the names `names` returns.
pub(crate) fn first_argument(names: fn(&Cluster) -> Vec<String>) -> Completer {
    Completer::contextual(move |args, ctx| {
        if args.len() != 2 {
            return Vec::new();
        }
        ctx.extension::<Cluster>().map(names).unwrap_or_default()
    })
}
