//! `node` level.

use clush_core::{Context, LevelType, Member, Outcome, Result, SkillLevel};

use super::{cluster, first_argument, invalid};
use crate::cluster::{Cluster, NodeState};

pub const NODE: LevelType = LevelType::stateless("node", members);

fn members() -> Vec<Member> {
    let names = || first_argument(Cluster::node_names);
    vec![
        Member::command("do_show", do_show)
            .alias("status")
            .opt_arg("node")
            .completer(names()),
        Member::command("do_standby", do_standby)
            .arg("node")
            .skill_level(SkillLevel::Administrator)
            .completer(names()),
        Member::command("do_online", do_online)
            .arg("node")
            .skill_level(SkillLevel::Administrator)
            .completer(names()),
    ]
}

fn do_show(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let lines: Vec<String> = {
        let state = cluster.lock();
        match args.first() {
            Some(name) => match state.nodes.get(name) {
                Some(node_state) => vec![format!("{name}: {node_state}")],
                None => return Err(invalid(ctx, name, "no such node")),
            },
            None => state
                .nodes
                .iter()
                .map(|(name, node_state)| format!("{name}: {node_state}"))
                .collect(),
        }
    };
    for line in lines {
        ctx.println(line)?;
    }
    Ok(Outcome::success())
}

fn set_state(ctx: &mut Context, name: &str, new_state: NodeState) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    match cluster.lock().nodes.get_mut(name) {
        Some(node_state) => *node_state = new_state,
        None => return Err(invalid(ctx, name, "no such node")),
    }
    Ok(Outcome::success())
}

fn do_standby(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    set_state(ctx, &args[0], NodeState::Standby)
}

fn do_online(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    set_state(ctx, &args[0], NodeState::Online)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{line, shell};
    use super::*;
    use clush_core::dispatch;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_standby_blocks_resource_start() {
        let (mut ctx, out, cluster) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("node standby node2")).await.unwrap();
        assert_eq!(cluster.lock().nodes["node2"], NodeState::Standby);

        let err = dispatch(&mut ctx, &line("resource start db")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "start: operation did not complete: db: its node is in standby"
        );

        dispatch(&mut ctx, &line("node online node2")).await.unwrap();
        dispatch(&mut ctx, &line("node show")).await.unwrap();
        assert_eq!(out.contents(), "node1: online\nnode2: online\n");
    }

    #[tokio::test]
    async fn test_show_unknown_node() {
        let (mut ctx, _, _) = shell(SkillLevel::Operator);
        assert!(dispatch(&mut ctx, &line("node show node9")).await.is_err());
    }
}
