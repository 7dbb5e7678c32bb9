//! `configure` level: stage cluster property changes and commit them.
//!
//! Changes made here are kept on the level instance until `commit`. Leaving
//! the level with staged changes asks the operator before discarding them.

use clush_core::{Context, Level, LevelType, Member, Outcome, Result, SkillLevel};
use dialoguer::Confirm;
use tracing::warn;

use super::{cluster, invalid, ra};

pub const CONFIGURE: LevelType = LevelType::new("configure", members, create);

fn create() -> Box<dyn Level> {
    Box::new(ConfigureLevel::default())
}

fn members() -> Vec<Member> {
    vec![
        Member::level("do_ra", ra::RA),
        Member::command("do_show", do_show),
        Member::command("do_property", do_property)
            .arg("assignment")
            .skill_level(SkillLevel::Administrator),
        Member::command("do_commit", do_commit).skill_level(SkillLevel::Administrator),
        Member::command("do_erase", do_erase).skill_level(SkillLevel::Expert),
    ]
}

#[derive(Debug, Default)]
pub struct ConfigureLevel {
    pending: Vec<(String, String)>,
}

impl ConfigureLevel {
    pub fn pending(&self) -> &[(String, String)] {
        &self.pending
    }
}

impl Level for ConfigureLevel {
    fn should_wait(&self) -> bool {
        true
    }

    fn end_game(&mut self, no_questions_asked: bool) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        if no_questions_asked {
            warn!(changes = self.pending.len(), "Discarding uncommitted changes");
            return true;
        }
        Confirm::new()
            .with_prompt(format!(
                "There are {} uncommitted changes. Discard them?",
                self.pending.len()
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

fn level_state(ctx: &mut Context) -> Result<&mut ConfigureLevel> {
    let err = ctx.fail("not in the configure level");
    ctx.current_level_mut::<ConfigureLevel>().ok_or(err)
}

fn do_show(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let mut lines: Vec<String> = cluster
        .lock()
        .properties
        .iter()
        .map(|(key, value)| format!("property {key}={value}"))
        .collect();
    lines.extend(
        level_state(ctx)?
            .pending
            .iter()
            .map(|(key, value)| format!("property {key}={value} (uncommitted)")),
    );
    for line in lines {
        ctx.println(line)?;
    }
    Ok(Outcome::success())
}

fn do_property(ctx: &mut Context, args: &[String]) -> Result<Outcome> {
    let Some((key, value)) = args[0].split_once('=') else {
        return Err(invalid(ctx, &args[0], "expected name=value"));
    };
    if key.is_empty() {
        return Err(invalid(ctx, &args[0], "property name is empty"));
    }
    let (key, value) = (key.to_string(), value.to_string());
    let state = level_state(ctx)?;
    state.pending.retain(|(k, _)| *k != key);
    state.pending.push((key, value));
    Ok(Outcome::success())
}

fn do_commit(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    let changes = std::mem::take(&mut level_state(ctx)?.pending);
    if changes.is_empty() {
        ctx.println("Nothing to commit")?;
        return Ok(Outcome::success());
    }
    Ok(Outcome::pending(cluster.apply_properties(changes)))
}

fn do_erase(ctx: &mut Context, _args: &[String]) -> Result<Outcome> {
    let cluster = cluster(ctx)?;
    cluster.lock().properties.clear();
    level_state(ctx)?.pending.clear();
    Ok(Outcome::success())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{line, shell};
    use super::*;
    use clush_core::{NavigationError, ShellError, dispatch};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_commit_applies_staged_properties() {
        let (mut ctx, out, cluster) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        dispatch(&mut ctx, &line("property no-quorum-policy=stop"))
            .await
            .unwrap();
        dispatch(&mut ctx, &line("show")).await.unwrap();
        assert_eq!(
            out.contents(),
            "property stonith-enabled=true\nproperty no-quorum-policy=stop (uncommitted)\n"
        );

        // The level waits for every command, so the change has landed on return.
        dispatch(&mut ctx, &line("commit")).await.unwrap();
        assert_eq!(cluster.lock().properties["no-quorum-policy"], "stop");
        assert!(ctx.current_level_as::<ConfigureLevel>().unwrap().pending().is_empty());
    }

    #[tokio::test]
    async fn test_restaging_replaces_value() {
        let (mut ctx, _, _) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        dispatch(&mut ctx, &line("property a=1")).await.unwrap();
        dispatch(&mut ctx, &line("property a=2")).await.unwrap();
        let level = ctx.current_level_as::<ConfigureLevel>().unwrap();
        assert_eq!(level.pending(), &[("a".to_string(), "2".to_string())]);
    }

    #[tokio::test]
    async fn test_malformed_assignment() {
        let (mut ctx, _, _) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        let err = dispatch(&mut ctx, &line("property novalue")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "property: invalid argument 'novalue': expected name=value"
        );
    }

    #[tokio::test]
    async fn test_operator_cannot_stage_changes() {
        let (mut ctx, _, _) = shell(SkillLevel::Operator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        let err = dispatch(&mut ctx, &line("property a=1")).await.unwrap_err();
        assert!(matches!(err, ShellError::CapabilityRefused { .. }));
    }

    #[tokio::test]
    async fn test_quit_without_questions_discards_changes() {
        let (mut ctx, _, cluster) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        dispatch(&mut ctx, &line("property a=1")).await.unwrap();
        ctx.quit_with(true).unwrap();
        assert!(ctx.quit_requested());
        assert!(!cluster.lock().properties.contains_key("a"));
    }

    #[tokio::test]
    async fn test_property_from_root_returns_without_prompting() {
        let (mut ctx, _, cluster) = shell(SkillLevel::Administrator);
        assert!(dispatch(&mut ctx, &line("configure property a=1")).await.unwrap());
        assert_eq!(ctx.level_name(), "root");
        // The staged change went away with the level instance.
        assert!(!cluster.lock().properties.contains_key("a"));
    }

    #[tokio::test]
    async fn test_clean_level_leaves_without_asking() {
        let (mut ctx, _, _) = shell(SkillLevel::Administrator);
        dispatch(&mut ctx, &line("configure")).await.unwrap();
        dispatch(&mut ctx, &line("up")).await.unwrap();
        assert_eq!(ctx.level_name(), "root");
        assert!(matches!(
            ctx.up(),
            Err(ShellError::Navigation(NavigationError::AtRoot))
        ));
    }
}
