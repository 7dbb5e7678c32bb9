//! Line handling for the `clush` binary: tokenizing, the interactive loop,
//! scripts and single commands.

use std::io::{self, BufRead};
use std::path::Path;

use clush_core::{Context, ShellConfig, ShellError, dispatch};
use tracing::{debug, warn};

use crate::repl_input::ReplInput;

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error(transparent)]
    Shell(#[from] ShellError),
}

struct Scan {
    tokens: Vec<String>,
    open_quote: Option<char>,
    /// The line ends in an unquoted separator, so a new token has started.
    trailing_space: bool,
}

fn scan(line: &str) -> Scan {
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => {
                let token = current.get_or_insert_with(String::new);
                match chars.next() {
                    Some(next @ ('"' | '\\')) => token.push(next),
                    Some(next) => {
                        token.push('\\');
                        token.push(next);
                    }
                    None => token.push('\\'),
                }
            }
            (Some(_), c) => current.get_or_insert_with(String::new).push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.get_or_insert_with(String::new);
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.get_or_insert_with(String::new).push(next);
                }
            }
            (None, '#') if current.is_none() => break,
            (None, c) if c.is_whitespace() => {
                if let Some(token) = current.take() {
                    tokens.push(token);
                }
            }
            (None, c) => current.get_or_insert_with(String::new).push(c),
        }
    }

    let trailing_space = quote.is_none()
        && current.is_none()
        && line.chars().last().is_some_and(char::is_whitespace);
    tokens.extend(current);
    Scan {
        tokens,
        open_quote: quote,
        trailing_space,
    }
}

/// Split a line into words. Single quotes are literal; inside double quotes
/// a backslash escapes `"` and `\`. An unquoted `#` starts a comment.
pub fn split_line(line: &str) -> Result<Vec<String>, LineError> {
    let scan = scan(line);
    match scan.open_quote {
        Some(q) => Err(LineError::UnterminatedQuote(q)),
        None => Ok(scan.tokens),
    }
}

/// Tokens for completion. An empty last token asks for every candidate at
/// the next position; an open quote is tolerated.
pub fn completion_tokens(line: &str) -> Vec<String> {
    let mut scan = scan(line);
    if scan.trailing_space || scan.tokens.is_empty() {
        scan.tokens.push(String::new());
    }
    scan.tokens
}

/// `clush# ` at the top, `clush configure/ra# ` below it.
pub fn prompt(ctx: &Context, name: &str) -> String {
    let path = ctx.path();
    if path.is_empty() {
        format!("{name}# ")
    } else {
        format!("{name} {}# ", path.join("/"))
    }
}

pub fn format_error(message: &str, color: bool) -> String {
    if color {
        format!("\x1b[31mERROR: {message}\x1b[0m")
    } else {
        format!("ERROR: {message}")
    }
}

/// Tokenize and dispatch one line.
pub async fn run_line(ctx: &mut Context, line: &str) -> Result<bool, LineError> {
    let tokens = split_line(line)?;
    debug!(tokens = tokens.len(), level = ctx.level_name(), "Dispatching line");
    Ok(dispatch(ctx, &tokens).await?)
}

/// Run one line, reporting errors on stderr. Returns whether it succeeded.
pub async fn execute_line(ctx: &mut Context, line: &str, color: bool) -> bool {
    match run_line(ctx, line).await {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), color));
            false
        }
    }
}

fn finish(ctx: &mut Context) {
    if let Err(e) = ctx.quit_with(true) {
        warn!(error = %e, "Level refused to end cleanly");
    }
}

/// Run the words given on the command line as one command.
pub async fn run_single(mut ctx: Context, tokens: &[String], color: bool) -> bool {
    let ok = match dispatch(&mut ctx, tokens).await {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string(), color));
            false
        }
    };
    finish(&mut ctx);
    ok
}

/// Run a script line by line, stopping at the first failing line.
pub async fn run_script(
    ctx: &mut Context,
    reader: impl BufRead,
    source: &str,
    color: bool,
) -> io::Result<bool> {
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match run_line(ctx, &line).await {
            Ok(true) => {}
            Ok(false) => {
                let message = format!("{source}:{}: command failed", index + 1);
                eprintln!("{}", format_error(&message, color));
                return Ok(false);
            }
            Err(e) => {
                let message = format!("{source}:{}: {e}", index + 1);
                eprintln!("{}", format_error(&message, color));
                return Ok(false);
            }
        }
        if ctx.quit_requested() {
            return Ok(true);
        }
    }
    finish(ctx);
    Ok(true)
}

/// The interactive loop. Ends on `quit` or end of input.
pub async fn run_interactive(
    mut ctx: Context,
    config: &ShellConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    let color = config.ui.color;
    let mut input = ReplInput::new(workspace, color);
    println!("clush {}: type help for help, quit to leave\n", env!("CARGO_PKG_VERSION"));

    loop {
        let prompt = prompt(&ctx, &config.ui.prompt);
        let Some(line) = input.read_line(&prompt, &ctx)? else {
            finish(&mut ctx);
            break;
        };
        execute_line(&mut ctx, &line, color).await;
        if ctx.quit_requested() {
            break;
        }
    }
    Ok(())
}
