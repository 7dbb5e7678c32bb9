//! Navigation commands every level has: `up`, `ls`, `cd`, `quit` and `help`.

use crate::completion::Completer;
use crate::context::Context;
use crate::descriptor::Outcome;
use crate::error::{Result, ShellError};
use crate::help::HelpEntry;
use crate::registry::Member;

/// Registered ahead of each level's own members.
pub fn members() -> Vec<Member> {
    vec![
        Member::command("do_up", do_up)
            .aliases(&["end", "back"])
            .help("Go back to previous level\nNavigates back in the user interface.\n"),
        Member::command("do_ls", do_ls).help(
            "List levels and commands\n\
             Lists the sub-levels and commands available at the current level.\n",
        ),
        Member::command("do_cd", do_cd)
            .opt_arg("path")
            .completer(Completer::contextual(complete_cd))
            .help(
                "Navigate the level structure\n\
                 Works like `cd` in a unix shell: `cd ..` returns to the previous\n\
                 level and `cd ../configure` moves from a sibling level straight\n\
                 into `configure`. Without an argument, goes back one level.\n\
                 \n\
                 Examples:\n\
                 \x20       cd ..\n\
                 \x20       cd configure\n\
                 \x20       cd configure/ra\n",
            ),
        Member::command("do_quit", do_quit)
            .aliases(&["bye", "exit"])
            .help(
                "Exit the interactive shell\n\
                 Some levels ask for confirmation first when they hold\n\
                 uncommitted changes.\n",
            ),
        Member::command("do_help", do_help)
            .aliases(&["?", "-h", "--help"])
            .opt_arg("subject")
            .opt_arg("subtopic")
            .completer(Completer::contextual(complete_help))
            .help(
                "Show help (help topics for list of topics)\n\
                 Without arguments, describes the current level and its commands.\n\
                 `help <command>` and `help <level> [command]` show the command\n\
                 reference; `help topics` lists concept guides.\n\
                 \n\
                 Examples:\n\
                 \x20       help Introduction\n\
                 \x20       help quit\n",
            ),
    ]
}

fn do_up(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    ctx.up()?;
    Ok(Outcome::success())
}

fn do_ls(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let registry = ctx.current_registry();
    let mut items: Vec<&str> = Vec::new();
    if ctx.previous_level().is_some() {
        items.push("..");
    }
    items.extend(registry.completions());
    let layout = ctx.layout();
    let listing = format_columns(&items, layout.column_width, layout.columns);
    ctx.println(listing)?;
    Ok(Outcome::success())
}

fn do_cd(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let path = args.first().map(String::as_str).unwrap_or("..");
    ctx.jump_path(path)?;
    Ok(Outcome::success())
}

fn do_quit(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    ctx.quit()?;
    Ok(Outcome::success())
}

fn do_help(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let subject = args.first().map(String::as_str);
    let subtopic = args.get(1).map(String::as_str);
    let text = match subject {
        None => level_overview(ctx),
        Some("topics") => topic_list(ctx),
        Some(subject) => find_help(ctx, subject, subtopic)
            .map(HelpEntry::render)
            .ok_or_else(|| ShellError::HelpNotFound {
                subject: match subtopic {
                    Some(subtopic) => format!("{subject} {subtopic}"),
                    None => subject.to_string(),
                },
            })?,
    };
    ctx.println(text)?;
    Ok(Outcome::success())
}

/// Render `items` in fixed-width cells, `columns` per row.
pub fn format_columns(items: &[&str], column_width: usize, columns: usize) -> String {
    items
        .chunks(columns.max(1))
        .map(|row| {
            row.iter()
                .map(|item| format!("{item:<column_width$}"))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn level_overview(ctx: &Context) -> String {
    let level = ctx.level_name();
    let help = ctx.help();
    let mut out = String::new();
    if let Some(entry) = help.level(level) {
        out.push_str(&entry.render());
        out.push_str("\n\n");
    }
    out.push_str("Commands:\n");
    let registry = ctx.current_registry();
    let lines: Vec<String> = registry
        .descriptors()
        .iter()
        .map(|desc| {
            let short = match desc.level_type() {
                Some(sub) => help.level(sub.name),
                None => help.command(level, &desc.name),
            }
            .map(|entry| entry.short.as_str())
            .or(desc.short_help.as_deref())
            .unwrap_or("");
            format!("    {:<16} {}", desc.name, short).trim_end().to_string()
        })
        .collect();
    out.push_str(&lines.join("\n"));
    out
}

fn topic_list(ctx: &Context) -> String {
    let help = ctx.help();
    let topics = help.list_topics();
    if topics.is_empty() {
        return "No help topics available.".into();
    }
    let mut out = String::from("Available topics:\n");
    let lines: Vec<String> = topics
        .iter()
        .map(|name| {
            let short = help.topic(name).map(|e| e.short.as_str()).unwrap_or("");
            format!("    {name:<16} {short}").trim_end().to_string()
        })
        .collect();
    out.push_str(&lines.join("\n"));
    out
}

/// Exact names first, then the subject resolved among the current level's
/// children the same way dispatch resolves it.
fn find_help<'a>(ctx: &'a Context, subject: &str, subtopic: Option<&str>) -> Option<&'a HelpEntry> {
    let help = ctx.help();
    let level = ctx.level_name();
    if let Some(entry) = help.lookup(level, Some(subject), subtopic) {
        return Some(entry);
    }
    let registry = ctx.current_registry();
    let Some(desc) = registry.get_child(subject) else {
        return help.topic(subject);
    };
    match (desc.level_type(), desc.children()) {
        (Some(sub), Some(children)) => match subtopic {
            None => help.level(sub.name),
            Some(command) => {
                let child = children.get_child(command)?;
                help.command(sub.name, &child.name)
            }
        },
        _ => help.command(level, &desc.name),
    }
}

fn complete_cd(args: &[String], ctx: &Context) -> Vec<String> {
    let partial = args.get(1).map(String::as_str).unwrap_or("");
    let (dir, _) = partial.rsplit_once('/').unwrap_or(("", partial));

    // Registries from the root to wherever `dir` leads.
    let mut trail = ctx.completion_trail();
    for segment in dir.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if trail.len() > 1 {
                    trail.pop();
                }
            }
            name => {
                let Some(children) = trail
                    .last()
                    .and_then(|registry| registry.get_child(name))
                    .and_then(|desc| desc.children().cloned())
                else {
                    return Vec::new();
                };
                trail.push(children);
            }
        }
    }

    let prefix = if partial.contains('/') {
        format!("{dir}/")
    } else {
        String::new()
    };
    let mut candidates = Vec::new();
    if trail.len() > 1 {
        candidates.push(format!("{prefix}.."));
    }
    if let Some(registry) = trail.last() {
        candidates.extend(
            registry
                .children()
                .iter()
                .filter(|(_, desc)| desc.is_level())
                .map(|(name, _)| format!("{prefix}{name}")),
        );
    }
    candidates
}

fn complete_help(_args: &[String], ctx: &Context) -> Vec<String> {
    let mut candidates: Vec<String> = ctx
        .help()
        .list_topics()
        .into_iter()
        .map(String::from)
        .collect();
    candidates.push("topics".into());
    candidates.extend(
        ctx.current_registry()
            .completions()
            .into_iter()
            .map(String::from),
    );
    candidates
}
