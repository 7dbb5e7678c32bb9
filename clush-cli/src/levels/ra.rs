//! `configure ra`: browse the resource agent catalogue.

use std::sync::Arc;

use clush_core::builtins::format_columns;
use clush_core::completion::CompleteFn;
use clush_core::{Context, LevelType, Member, Outcome, Result, choices, completers};

use super::invalid;

pub const RA: LevelType = LevelType::stateless("ra", members);

const CLASSES: &[&str] = &["lsb", "ocf", "service", "stonith", "systemd"];

/// (class, type, description)
const AGENTS: &[(&str, &str, &str)] = &[
    ("ocf", "IPaddr2", "Manages virtual IPv4 and IPv6 addresses"),
    ("ocf", "Filesystem", "Manages filesystem mounts"),
    ("ocf", "apache", "Manages an Apache Web server instance"),
    ("ocf", "pgsql", "Manages a PostgreSQL database instance"),
    ("stonith", "fence_ipmilan", "Fence agent for IPMI"),
    ("systemd", "sshd", "OpenSSH server daemon"),
];

fn members() -> Vec<Member> {
    vec![
        Member::command("do_classes", do_classes).help("List resource agent classes"),
        Member::command("do_list", do_list)
            .arg("class")
            .completer(completers(vec![choices(CLASSES)])),
        Member::command("do_info", do_info)
            .alias("meta")
            .arg("agent")
            .completer(completers(vec![Arc::new(agent_names) as CompleteFn])),
    ]
}

fn agent_names(_args: &[String]) -> Vec<String> {
    AGENTS
        .iter()
        .map(|(class, kind, _)| format!("{class}:{kind}"))
        .collect()
}

fn do_classes(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    for class in CLASSES {
        ctx.println(class)?;
    }
    Ok(Outcome::success())
}

fn do_list(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let class = args[0].as_str();
    if !CLASSES.contains(&class) {
        return Err(invalid(ctx, class, "unknown class"));
    }
    let agents: Vec<&str> = AGENTS
        .iter()
        .filter(|(c, _, _)| *c == class)
        .map(|(_, kind, _)| *kind)
        .collect();
    if !agents.is_empty() {
        let layout = ctx.layout();
        ctx.println(format_columns(&agents, layout.column_width, layout.columns))?;
    }
    Ok(Outcome::success())
}

/// Accepts `class:type` or a bare type.
fn find_agent(name: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    match name.split_once(':') {
        Some((class, kind)) => AGENTS.iter().find(|(c, k, _)| *c == class && *k == kind),
        None => AGENTS.iter().find(|(_, k, _)| *k == name),
    }
}

fn do_info(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let Some((class, kind, description)) = find_agent(&args[0]) else {
        return Err(invalid(ctx, &args[0], "no such agent"));
    };
    ctx.println(format!("{class}:{kind}\n\n{description}"))?;
    Ok(Outcome::success())
}
