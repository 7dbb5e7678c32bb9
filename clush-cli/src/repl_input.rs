//! Interactive line editor for the shell prompt.
//!
//! Provides:
//! - Up/Down arrow history navigation with draft preservation
//! - Tab completion of commands, levels, paths and arguments, with a
//!   dropdown when more than one candidate fits
//! - Ctrl-C to clear the line, Ctrl-D on an empty line for end of input
//! - Persistent history at `.clush/history` in the workspace

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clush_core::Context;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal,
};
use unicode_width::UnicodeWidthStr;

use crate::repl::completion_tokens;

/// Maximum number of completion items to show in the dropdown.
const MAX_VISIBLE_COMPLETIONS: usize = 8;

/// Persistent command history.
pub struct InputHistory {
    entries: Vec<String>,
    index: Option<usize>,
    draft: Option<String>,
    file_path: Option<PathBuf>,
    max_entries: usize,
}

impl InputHistory {
    /// Load history kept in the given workspace directory.
    pub fn new(workspace: &Path) -> Self {
        let file_path = workspace.join(".clush").join("history");
        let mut history = Self::in_memory();
        history.entries = Self::load_from_file(&file_path);
        history.file_path = Some(file_path);
        history
    }

    /// History that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            draft: None,
            file_path: None,
            max_entries: 500,
        }
    }

    fn load_from_file(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect()
    }

    fn save_to_file(&self) {
        let Some(path) = &self.file_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let content: String = self.entries.iter().map(|e| format!("{e}\n")).collect();
        if let Err(e) = std::fs::write(path, content) {
            tracing::debug!(path = %path.display(), error = %e, "Could not save history");
        }
    }

    /// Push a new entry, skipping repeats of the last one.
    pub fn push(&mut self, entry: &str) {
        let trimmed = entry.trim().to_string();
        if trimmed.is_empty() {
            return;
        }
        if self.entries.last().map(|s| s.as_str()) == Some(&trimmed) {
            self.reset_navigation();
            return;
        }
        self.entries.push(trimmed);
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        self.save_to_file();
        self.reset_navigation();
    }

    /// Navigate up (older entries).
    fn navigate_up(&mut self, current_buffer: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        match self.index {
            None => {
                self.draft = Some(current_buffer.to_string());
                self.index = Some(self.entries.len() - 1);
            }
            Some(0) => return Some(&self.entries[0]),
            Some(ref mut idx) => {
                *idx -= 1;
            }
        }
        self.index.map(|i| self.entries[i].as_str())
    }

    /// Navigate down (newer entries), restoring the draft past the newest.
    fn navigate_down(&mut self) -> Option<String> {
        let idx = self.index?;
        if idx + 1 >= self.entries.len() {
            self.index = None;
            self.draft.take()
        } else {
            self.index = Some(idx + 1);
            Some(self.entries[idx + 1].clone())
        }
    }

    fn reset_navigation(&mut self) {
        self.index = None;
        self.draft = None;
    }
}

/// Candidates offered for the word under the cursor.
struct CompletionState {
    candidates: Vec<String>,
    selected: usize,
    scroll: usize,
}

impl CompletionState {
    fn selected(&self) -> &str {
        &self.candidates[self.selected]
    }

    fn visible_range(&self) -> (usize, usize) {
        let total = self.candidates.len();
        let max_vis = MAX_VISIBLE_COMPLETIONS.min(total);
        let start = if self.selected < self.scroll {
            self.selected
        } else if self.selected >= self.scroll + max_vis {
            self.selected + 1 - max_vis
        } else {
            self.scroll
        };
        (start, (start + max_vis).min(total))
    }
}

/// Completion candidates for `buffer`, or `None` when there is nothing to
/// offer beyond what is already typed.
fn candidates_for(buffer: &str, ctx: &Context) -> Option<Vec<String>> {
    let tokens = completion_tokens(buffer);
    let last = tokens.last().map(String::as_str).unwrap_or("");
    let candidates = clush_core::complete(ctx, &tokens);
    if candidates.is_empty() || (candidates.len() == 1 && candidates[0] == last) {
        return None;
    }
    Some(candidates)
}

/// Replace the word being typed with `candidate`. Path candidates ending in
/// `/` leave the cursor on the word so the next segment can be completed.
fn accept_candidate(buffer: &str, candidate: &str) -> String {
    let start = buffer
        .rfind(char::is_whitespace)
        .map(|i| i + buffer[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let mut line = format!("{}{candidate}", &buffer[..start]);
    if !candidate.ends_with('/') {
        line.push(' ');
    }
    line
}

fn prev_boundary(buffer: &str, pos: usize) -> usize {
    buffer[..pos]
        .char_indices()
        .next_back()
        .map_or(0, |(i, _)| i)
}

fn next_boundary(buffer: &str, pos: usize) -> usize {
    buffer[pos..]
        .chars()
        .next()
        .map_or(pos, |c| pos + c.len_utf8())
}

/// Interactive line editor.
pub struct ReplInput {
    history: InputHistory,
    color: bool,
    prompt: String,
    /// Number of completion lines currently displayed below the input.
    rendered_lines: usize,
}

impl ReplInput {
    pub fn new(workspace: &Path, color: bool) -> Self {
        Self {
            history: InputHistory::new(workspace),
            color,
            prompt: String::new(),
            rendered_lines: 0,
        }
    }

    /// Read a line. Returns `None` on Ctrl-D at an empty line.
    ///
    /// Enables raw mode during input and restores it on return.
    pub fn read_line(&mut self, prompt: &str, ctx: &Context) -> io::Result<Option<String>> {
        self.prompt = prompt.to_string();
        self.redraw_input("", 0, None)?;

        terminal::enable_raw_mode()?;
        let result = self.read_line_raw(ctx);
        self.clear_completion_lines()?;
        terminal::disable_raw_mode()?;

        print!("\r\n");
        io::stdout().flush()?;

        result
    }

    fn read_line_raw(&mut self, ctx: &Context) -> io::Result<Option<String>> {
        let mut buffer = String::new();
        let mut cursor_pos: usize = 0;
        let mut completion: Option<CompletionState> = None;

        loop {
            if !event::poll(std::time::Duration::from_millis(100))? {
                continue;
            }

            let Event::Key(KeyEvent {
                code, modifiers, ..
            }) = event::read()?
            else {
                continue;
            };

            match (code, modifiers) {
                // Ctrl-C: abandon the line
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                    self.clear_completion_lines()?;
                    self.redraw_input("", 0, None)?;
                    return Ok(Some(String::new()));
                }
                (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                    if buffer.is_empty() {
                        return Ok(None);
                    }
                }
                // Tab: accept the selection, or look for candidates
                (KeyCode::Tab, _) => {
                    if let Some(comp) = completion.take() {
                        buffer = accept_candidate(&buffer, comp.selected());
                        cursor_pos = buffer.len();
                        self.clear_completion_lines()?;
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    } else if let Some(candidates) = candidates_for(&buffer, ctx) {
                        if candidates.len() == 1 {
                            buffer = accept_candidate(&buffer, &candidates[0]);
                            cursor_pos = buffer.len();
                            self.redraw_input(&buffer, cursor_pos, None)?;
                        } else {
                            completion = Some(CompletionState {
                                candidates,
                                selected: 0,
                                scroll: 0,
                            });
                            self.render_with_completion(&buffer, cursor_pos, &completion)?;
                        }
                    }
                }
                (KeyCode::Enter, _) => {
                    if let Some(comp) = completion.take() {
                        buffer = accept_candidate(&buffer, comp.selected());
                        cursor_pos = buffer.len();
                        self.clear_completion_lines()?;
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    } else {
                        let line = buffer.trim().to_string();
                        self.history.push(&line);
                        return Ok(Some(line));
                    }
                }
                (KeyCode::Esc, _) => {
                    if completion.take().is_some() {
                        self.clear_completion_lines()?;
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    }
                }
                (KeyCode::Up, _) => {
                    if let Some(ref mut comp) = completion {
                        if comp.selected > 0 {
                            comp.selected -= 1;
                            comp.scroll = comp.visible_range().0;
                        }
                        self.render_with_completion(&buffer, cursor_pos, &completion)?;
                    } else if let Some(entry) = self.history.navigate_up(&buffer) {
                        buffer = entry.to_string();
                        cursor_pos = buffer.len();
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    }
                }
                (KeyCode::Down, _) => {
                    if let Some(ref mut comp) = completion {
                        if comp.selected + 1 < comp.candidates.len() {
                            comp.selected += 1;
                            comp.scroll = comp.visible_range().0;
                        }
                        self.render_with_completion(&buffer, cursor_pos, &completion)?;
                    } else if let Some(entry) = self.history.navigate_down() {
                        buffer = entry;
                        cursor_pos = buffer.len();
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    }
                }
                (KeyCode::Right, _) => {
                    if cursor_pos < buffer.len() {
                        cursor_pos = next_boundary(&buffer, cursor_pos);
                        self.redraw_input(&buffer, cursor_pos, None)?;
                    }
                }
                (KeyCode::Left, _) => {
                    if completion.take().is_some() {
                        self.clear_completion_lines()?;
                    }
                    cursor_pos = prev_boundary(&buffer, cursor_pos);
                    self.redraw_input(&buffer, cursor_pos, None)?;
                }
                (KeyCode::Backspace, _) => {
                    if cursor_pos > 0 {
                        let prev = prev_boundary(&buffer, cursor_pos);
                        buffer.replace_range(prev..cursor_pos, "");
                        cursor_pos = prev;
                    }
                    if completion.is_some() {
                        completion = self.narrow(&buffer, ctx);
                    }
                    self.render_with_completion(&buffer, cursor_pos, &completion)?;
                }
                (KeyCode::Home, _) => {
                    cursor_pos = 0;
                    if completion.take().is_some() {
                        self.clear_completion_lines()?;
                    }
                    self.redraw_input(&buffer, cursor_pos, None)?;
                }
                (KeyCode::End, _) => {
                    cursor_pos = buffer.len();
                    self.redraw_input(&buffer, cursor_pos, None)?;
                }
                (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                    buffer.insert(cursor_pos, c);
                    cursor_pos += c.len_utf8();
                    self.history.reset_navigation();
                    if completion.is_some() {
                        completion = self.narrow(&buffer, ctx);
                    }
                    self.render_with_completion(&buffer, cursor_pos, &completion)?;
                }
                _ => {}
            }
        }
    }

    /// Recompute an open dropdown after the word under it changed.
    fn narrow(&self, buffer: &str, ctx: &Context) -> Option<CompletionState> {
        candidates_for(buffer, ctx).map(|candidates| CompletionState {
            candidates,
            selected: 0,
            scroll: 0,
        })
    }

    fn prompt_width(&self) -> usize {
        self.prompt.width()
    }

    /// Render the input line plus the completion dropdown (if any).
    fn render_with_completion(
        &mut self,
        buffer: &str,
        cursor_pos: usize,
        completion: &Option<CompletionState>,
    ) -> io::Result<()> {
        self.clear_completion_lines()?;

        let ghost = completion.as_ref().map(|c| c.selected());
        self.redraw_input(buffer, cursor_pos, ghost)?;

        if let Some(comp) = completion {
            self.render_dropdown(comp)?;
            if self.rendered_lines > 0 {
                let mut stdout = io::stdout();
                let col = self.prompt_width() + buffer[..cursor_pos].width();
                write!(stdout, "{}", cursor::MoveUp(self.rendered_lines as u16))?;
                write!(stdout, "\r")?;
                if col > 0 {
                    write!(stdout, "{}", cursor::MoveRight(col as u16))?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn render_dropdown(&mut self, comp: &CompletionState) -> io::Result<()> {
        let mut stdout = io::stdout();
        let (start, end) = comp.visible_range();
        let visible_count = end - start;

        for (i, candidate) in comp.candidates.iter().enumerate().take(end).skip(start) {
            write!(stdout, "\r\n\x1b[2K")?;
            if i == comp.selected {
                write!(stdout, "\x1b[7m  {candidate:<20}\x1b[0m")?;
            } else if self.color {
                write!(stdout, "  \x1b[36m{candidate}\x1b[0m")?;
            } else {
                write!(stdout, "  {candidate}")?;
            }
        }

        let total = comp.candidates.len();
        if total > visible_count {
            write!(stdout, "\r\n\x1b[2K  ({visible_count}/{total})")?;
            self.rendered_lines = visible_count + 1;
        } else {
            self.rendered_lines = visible_count;
        }

        stdout.flush()?;
        Ok(())
    }

    /// Clear previously rendered completion lines below the input.
    fn clear_completion_lines(&mut self) -> io::Result<()> {
        if self.rendered_lines > 0 {
            let mut stdout = io::stdout();
            for _ in 0..self.rendered_lines {
                write!(stdout, "\r\n\x1b[2K")?;
            }
            write!(stdout, "{}", cursor::MoveUp(self.rendered_lines as u16))?;
            stdout.flush()?;
            self.rendered_lines = 0;
        }
        Ok(())
    }

    /// Redraw the input line with optional ghost text for the selection.
    fn redraw_input(&self, buffer: &str, cursor_pos: usize, ghost: Option<&str>) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "\r\x1b[2K")?;
        if self.color {
            write!(stdout, "\x1b[1;34m{}\x1b[0m", self.prompt)?;
        } else {
            write!(stdout, "{}", self.prompt)?;
        }
        write!(stdout, "{buffer}")?;

        let word = completion_tokens(buffer).pop().unwrap_or_default();
        if let Some(hint) = ghost
            && cursor_pos == buffer.len()
            && hint.len() > word.len()
            && hint.starts_with(word.as_str())
        {
            let suffix = &hint[word.len()..];
            write!(stdout, "\x1b[90m{suffix}\x1b[0m")?;
            write!(stdout, "{}", cursor::MoveLeft(suffix.width() as u16))?;
        }

        let after_cursor = buffer[cursor_pos..].width();
        if after_cursor > 0 {
            write!(stdout, "{}", cursor::MoveLeft(after_cursor as u16))?;
        }
        stdout.flush()?;
        Ok(())
    }
}
