//! Tab completion callbacks and helpers for composing them.
//!
//! A completer receives the tokens typed so far with `args[0]` set to the
//! command name, and returns candidate strings for the last token. Filtering
//! candidates by what the operator already typed is done by the dispatch
//! engine, so completers may return every possibility.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// Completion callback that only looks at the tokens.
pub type CompleteFn = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// Completion callback that also inspects the shell context.
pub type ContextCompleteFn = Arc<dyn Fn(&[String], &Context) -> Vec<String> + Send + Sync>;

#[derive(Clone)]
pub enum Completer {
    Plain(CompleteFn),
    Contextual(ContextCompleteFn),
}

impl Completer {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Completer::Plain(Arc::new(f))
    }

    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&[String], &Context) -> Vec<String> + Send + Sync + 'static,
    {
        Completer::Contextual(Arc::new(f))
    }

    pub fn call(&self, args: &[String], ctx: &Context) -> Vec<String> {
        match self {
            Completer::Plain(f) => f(args),
            Completer::Contextual(f) => f(args, ctx),
        }
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completer::Plain(_) => f.write_str("Completer::Plain"),
            Completer::Contextual(_) => f.write_str("Completer::Contextual"),
        }
    }
}

/// Positional completers: argument `k` is completed by `fns[k - 1]`, and
/// arguments past the end of the list get nothing.
pub fn completers(fns: Vec<CompleteFn>) -> Completer {
    Completer::plain(move |args| positional(&fns, false, args))
}

/// Like [`completers`], but the last completer also handles every argument
/// past the end of the list.
pub fn completers_repeating(fns: Vec<CompleteFn>) -> Completer {
    Completer::plain(move |args| positional(&fns, true, args))
}

fn positional(fns: &[CompleteFn], repeat: bool, args: &[String]) -> Vec<String> {
    let nargs = args.len().saturating_sub(1);
    if nargs == 0 {
        return args.first().cloned().into_iter().collect();
    }
    if let Some(f) = fns.get(nargs - 1) {
        return f(args);
    }
    match fns.last() {
        Some(f) if repeat => f(args),
        _ => Vec::new(),
    }
}

/// A fixed list of candidates.
pub fn choices(values: &'static [&'static str]) -> CompleteFn {
    Arc::new(move |_| values.iter().map(|v| v.to_string()).collect())
}

/// Never offers anything; a placeholder for free-form positions.
pub fn nothing() -> CompleteFn {
    Arc::new(|_| Vec::new())
}
