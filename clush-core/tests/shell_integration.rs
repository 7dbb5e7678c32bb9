//! End-to-end tests driving the shell through dispatch, the way the REPL does.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;

use clush_core::builtins;
use clush_core::{
    Context, FileStackStore, HelpEntry, Level, LevelRegistrar, LevelType, MemoryStackStore,
    Member, NavigationError, Outcome, OutputBuffer, Result, ShellError, SkillLevel,
    completion_channel, dispatch,
};

fn noop(_: &mut Context, _: &[String]) -> Result<Outcome> {
    Ok(Outcome::success())
}

fn line(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

// --- A small cluster tree ---

fn root_members() -> Vec<Member> {
    vec![
        Member::level("do_resource", RESOURCE),
        Member::level("do_configure", CONFIGURE),
        Member::command("do_status", noop),
    ]
}

fn resource_members() -> Vec<Member> {
    vec![
        Member::command("do_status", noop),
        Member::command("do_start", noop).arg("rsc"),
        Member::command("do_stop", noop).arg("rsc"),
    ]
}

fn configure_members() -> Vec<Member> {
    vec![
        Member::level("do_ra", RA),
        Member::command("do_op_defaults", noop),
        Member::command("do_property", noop),
        Member::command("do_erase", noop).skill_level(SkillLevel::Expert),
    ]
}

const ROOT: LevelType = LevelType::stateless("root", root_members);
const RESOURCE: LevelType = LevelType::stateless("resource", resource_members);
const CONFIGURE: LevelType = LevelType::stateless("configure", configure_members);
const RA: LevelType = LevelType::stateless("ra", Vec::new);

fn shell() -> (Context, OutputBuffer) {
    let out = OutputBuffer::new();
    let ctx = Context::builder(ROOT).output(out.clone()).build().unwrap();
    (ctx, out)
}

#[test]
fn scenario_a_ambiguous_prefix_resolves_to_nothing() {
    let mut registrar = LevelRegistrar::bare();
    let registry = registrar.build(RESOURCE).unwrap();

    assert!(registry.resolve("sta").is_none());
    let (key, start) = registry.resolve("star").unwrap();
    assert_eq!(key, "start");
    assert_eq!(start.name, "start");
    assert_eq!(registry.resolve("sto").unwrap().0, "stop");
}

#[tokio::test]
async fn scenario_b_relative_path_reaches_sibling() {
    let (mut ctx, _) = shell();
    dispatch(&mut ctx, &line("resource")).await.unwrap();
    dispatch(&mut ctx, &line("cd ../configure")).await.unwrap();
    assert_eq!(ctx.level_name(), "configure");
    assert_eq!(ctx.depth(), 2);
}

#[tokio::test]
async fn scenario_b_missing_sibling_stops_at_parent() {
    fn members() -> Vec<Member> {
        vec![Member::level("do_resource", RESOURCE)]
    }
    const SMALL_ROOT: LevelType = LevelType::stateless("small_root", members);

    let mut ctx = Context::builder(SMALL_ROOT)
        .output(OutputBuffer::new())
        .build()
        .unwrap();
    dispatch(&mut ctx, &line("resource")).await.unwrap();
    let err = dispatch(&mut ctx, &line("cd ../configure")).await.unwrap_err();
    assert!(matches!(
        err,
        ShellError::Navigation(NavigationError::NotFound { ref name, ref level })
            if name == "configure" && level == "small_root"
    ));
    assert_eq!(ctx.level_name(), "small_root");
}

#[tokio::test]
async fn scenario_c_ls_lists_parent_and_children_in_columns() {
    fn only_ls() -> Vec<Member> {
        builtins::members()
            .into_iter()
            .filter(|m| m.resolved_name() == "ls")
            .collect()
    }
    fn configure_only() -> Vec<Member> {
        vec![
            Member::level("do_ra", RA),
            Member::command("do_op_defaults", noop),
            Member::command("do_property", noop),
        ]
    }
    fn root_only() -> Vec<Member> {
        vec![Member::level("do_configure", CONFIGURE_ONLY)]
    }
    const CONFIGURE_ONLY: LevelType = LevelType::stateless("configure", configure_only);
    const ROOT_ONLY: LevelType = LevelType::stateless("root", root_only);

    let out = OutputBuffer::new();
    let mut ctx = Context::builder(ROOT_ONLY)
        .registrar(LevelRegistrar::with_builtins(only_ls))
        .output(out.clone())
        .build()
        .unwrap();
    dispatch(&mut ctx, &line("configure")).await.unwrap();
    dispatch(&mut ctx, &line("ls")).await.unwrap();

    let expected = format!(
        "{:<16} {:<16} op_defaults\n{:<16} ra\n",
        "..", "ls", "property"
    );
    assert_eq!(out.contents(), expected);
}

static JOB_DONE: AtomicBool = AtomicBool::new(false);
static DETACHED_DONE: AtomicBool = AtomicBool::new(false);

fn spawn_job(flag: &'static AtomicBool) -> Outcome {
    let (handle, signal) = completion_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        flag.store(true, Ordering::SeqCst);
        handle.complete();
    });
    Outcome::pending(signal)
}

fn start_and_wait(_: &mut Context, _: &[String]) -> Result<Outcome> {
    Ok(spawn_job(&JOB_DONE))
}

fn start_detached(_: &mut Context, _: &[String]) -> Result<Outcome> {
    Ok(spawn_job(&DETACHED_DONE))
}

fn job_members() -> Vec<Member> {
    vec![
        Member::command("do_migrate", start_and_wait).wait(),
        Member::command("do_cleanup", start_detached),
    ]
}

const JOBS: LevelType = LevelType::stateless("jobs", job_members);

#[tokio::test]
async fn scenario_d_synchronous_command_waits_for_completion() {
    let mut ctx = Context::builder(JOBS)
        .output(OutputBuffer::new())
        .build()
        .unwrap();

    assert!(dispatch(&mut ctx, &line("migrate")).await.unwrap());
    assert!(JOB_DONE.load(Ordering::SeqCst));

    assert!(dispatch(&mut ctx, &line("cleanup")).await.unwrap());
    assert!(!DETACHED_DONE.load(Ordering::SeqCst));
}

#[tokio::test]
async fn capability_refusal_keeps_session_alive() {
    let (mut ctx, _) = shell();
    dispatch(&mut ctx, &line("configure")).await.unwrap();
    let err = dispatch(&mut ctx, &line("erase")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "erase: requires skill level expert (current: operator)"
    );
    assert_eq!(ctx.level_name(), "configure");

    ctx.set_skill_level("EXPERT".parse().unwrap());
    assert!(dispatch(&mut ctx, &line("erase")).await.unwrap());
}

#[tokio::test]
async fn navigation_commands_and_aliases() {
    let (mut ctx, _) = shell();
    dispatch(&mut ctx, &line("cd configure/ra")).await.unwrap();
    assert_eq!(ctx.path(), vec!["configure", "ra"]);

    dispatch(&mut ctx, &line("back")).await.unwrap();
    assert_eq!(ctx.level_name(), "configure");
    dispatch(&mut ctx, &line("end")).await.unwrap();
    assert_eq!(ctx.level_name(), "root");

    let err = dispatch(&mut ctx, &line("up")).await.unwrap_err();
    assert_eq!(err.to_string(), "Already at the top level");
}

#[tokio::test]
async fn quit_consults_every_level_top_first() {
    static ORDER: std::sync::Mutex<Vec<&'static str>> = std::sync::Mutex::new(Vec::new());
    static VETO: AtomicBool = AtomicBool::new(true);

    struct Recording(&'static str);
    impl Level for Recording {
        fn end_game(&mut self, _no_questions_asked: bool) -> bool {
            ORDER.lock().unwrap().push(self.0);
            self.0 != "inner" || !VETO.load(Ordering::SeqCst)
        }
    }
    fn outer() -> Box<dyn Level> {
        Box::new(Recording("outer"))
    }
    fn inner() -> Box<dyn Level> {
        Box::new(Recording("inner"))
    }
    fn outer_members() -> Vec<Member> {
        vec![Member::level("do_inner", INNER)]
    }
    const OUTER: LevelType = LevelType::new("outer", outer_members, outer);
    const INNER: LevelType = LevelType::new("inner", Vec::new, inner);

    let mut ctx = Context::builder(OUTER)
        .output(OutputBuffer::new())
        .build()
        .unwrap();
    dispatch(&mut ctx, &line("inner")).await.unwrap();

    assert!(dispatch(&mut ctx, &line("quit")).await.is_err());
    assert!(!ctx.quit_requested());
    assert_eq!(*ORDER.lock().unwrap(), vec!["inner"]);

    VETO.store(false, Ordering::SeqCst);
    ORDER.lock().unwrap().clear();
    dispatch(&mut ctx, &line("exit")).await.unwrap();
    assert!(ctx.quit_requested());
    assert_eq!(*ORDER.lock().unwrap(), vec!["inner", "outer"]);
}

#[tokio::test]
async fn documented_help_overrides_generated() {
    let mut registrar = LevelRegistrar::new();
    registrar.help_mut().add_help(
        HelpEntry::from_doc("Start a resource\nStarts the resource on its preferred node."),
        "resource",
        Some("start"),
    );
    let out = OutputBuffer::new();
    let mut ctx = Context::builder(ROOT)
        .registrar(registrar)
        .output(out.clone())
        .build()
        .unwrap();

    dispatch(&mut ctx, &line("help resource start")).await.unwrap();
    assert_eq!(
        out.contents(),
        "Start a resource\n\nStarts the resource on its preferred node.\n"
    );

    out.clear();
    dispatch(&mut ctx, &line("help resource stop")).await.unwrap();
    assert_eq!(
        out.contents(),
        "Help for command stop\n\nNote: This command is not documented.\nUsage: stop rsc\n"
    );
}

#[test]
fn completion_covers_commands_arguments_and_paths() {
    let (mut ctx, _) = shell();
    assert_eq!(clush_core::complete(&ctx, &line("re")), vec!["resource"]);
    assert_eq!(
        clush_core::complete(&ctx, &["cd".to_string(), "conf".to_string()]),
        vec!["configure"]
    );
    assert_eq!(
        clush_core::complete(&ctx, &["cd".to_string(), "configure/".to_string()]),
        vec!["configure/..", "configure/ra"]
    );

    ctx.jump_path("resource").unwrap();
    assert_eq!(
        clush_core::complete(&ctx, &["cd".to_string(), String::new()]),
        vec![".."]
    );
}

#[tokio::test]
async fn stack_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = dir.path().join("stack.json");

    {
        let mut ctx = Context::builder(ROOT)
            .store(FileStackStore::new(&state))
            .output(OutputBuffer::new())
            .build()
            .unwrap();
        dispatch(&mut ctx, &line("cd configure/ra")).await.unwrap();
    }

    let mut ctx = Context::builder(ROOT)
        .store(FileStackStore::new(&state))
        .output(OutputBuffer::new())
        .build()
        .unwrap();
    assert_eq!(ctx.level_name(), "root");
    assert!(ctx.restore_stack());
    assert_eq!(ctx.level_name(), "ra");
    assert_eq!(ctx.previous_level().unwrap().name(), "configure");
}

#[test]
fn memory_store_records_every_transition() {
    let store = MemoryStackStore::new();
    let mut ctx = Context::builder(ROOT)
        .store(store.clone())
        .output(OutputBuffer::new())
        .build()
        .unwrap();
    ctx.jump_path("configure").unwrap();
    assert_eq!(store.saved(), Some(vec!["configure".to_string()]));
    ctx.up().unwrap();
    assert_eq!(store.saved(), Some(Vec::new()));

    let registry = ctx.current_registry();
    assert!(Arc::ptr_eq(&registry, &ctx.current_registry()));
}
