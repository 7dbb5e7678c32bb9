//! `options` level: session preferences.

use clush_core::{
    Context, LevelType, Member, Outcome, Result, SkillLevel, choices, completers,
};

use super::invalid;

pub const OPTIONS: LevelType = LevelType::stateless("options", members);

fn members() -> Vec<Member> {
    vec![
        Member::command("do_skill_level", do_skill_level)
            .name("skill-level")
            .opt_arg("level")
            .completer(completers(vec![choices(&[
                "operator",
                "administrator",
                "expert",
            ])])),
        Member::command("do_wait", do_wait)
            .opt_arg("value")
            .completer(completers(vec![choices(&["yes", "no"])])),
        Member::command("do_show", do_show),
    ]
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn do_skill_level(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    match args.first() {
        None => ctx.println(ctx.skill_level())?,
        Some(value) => match value.parse::<SkillLevel>() {
            Ok(level) => ctx.set_skill_level(level),
            Err(e) => return Err(invalid(ctx, value, &e.to_string())),
        },
    }
    Ok(Outcome::success())
}

fn do_wait(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    match args.first() {
        None => ctx.println(yes_no(ctx.wait_all()))?,
        Some(value) => match parse_flag(value) {
            Some(wait) => ctx.set_wait_all(wait),
            None => return Err(invalid(ctx, value, "expected yes or no")),
        },
    }
    Ok(Outcome::success())
}

fn do_show(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let text = format!(
        "skill-level: {}\nwait: {}",
        ctx.skill_level(),
        yes_no(ctx.wait_all())
    );
    ctx.println(text)?;
    Ok(Outcome::success())
}
