//! `resource` level: inspect and drive resources.

use clush_core::{Context, LevelType, Member, Outcome, Result};

use super::{cluster, first_argument, invalid};
use crate::cluster::{Cluster, Resource};

pub const RESOURCE: LevelType = LevelType::stateless("resource", members);

fn members() -> Vec<Member> {
    let names = || first_argument(Cluster::resource_names);
    vec![
        Member::command("do_status", do_status)
            .alias("show")
            .opt_arg("rsc")
            .completer(names()),
        Member::command("do_start", do_start)
            .arg("rsc")
            .wait()
            .completer(names()),
        Member::command("do_stop", do_stop)
            .arg("rsc")
            .wait()
            .completer(names()),
        Member::command("do_cleanup", do_cleanup)
            .arg("rsc")
            .completer(names()),
    ]
}

pub(crate) fn describe(name: &str, rsc: &Resource) -> String {
    let state = if rsc.running {
        format!("Started {}", rsc.node)
    } else {
        "Stopped".to_string()
    };
    format!("    {name:<16} {:<24} {state}", rsc.agent)
}

fn do_status(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let lines: Vec<String> = {
        let state = cluster.lock();
        match args.first() {
            Some(name) => match state.resources.get(name) {
                Some(rsc) => vec![describe(name, rsc)],
                None => return Err(invalid(ctx, name, "no such resource")),
            },
            None => state
                .resources
                .iter()
                .map(|(name, rsc)| describe(name, rsc))
                .collect(),
        }
    };
    for line in lines {
        ctx.println(line)?;
    }
    Ok(Outcome::success())
}

fn set_running(ctx: &mut Context, name: &str, running: bool) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    match cluster.set_running(name, running) {
        Some(signal) => Ok(Outcome::pending(signal)),
        None => Err(invalid(ctx, name, "no such resource")),
    }
}

fn do_start(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    set_running(ctx, &args[0], true)
}

fn do_stop(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    set_running(ctx, &args[0], false)
}

fn do_cleanup(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let node = cluster
        .lock()
        .resources
        .get(&args[0])
        .map(|rsc| rsc.node.clone());
    match node {
        Some(node) => {
            ctx.println(format!("Cleaned up {} on {node}", args[0]))?;
            Ok(Outcome::success())
        }
        None => Err(invalid(ctx, &args[0], "no such resource")),
    }
}
