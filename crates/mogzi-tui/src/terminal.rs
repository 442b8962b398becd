// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Scrollback-aware terminal output.
//!
//! Three regions, top to bottom:
//! 1. the append-only static log (ordinary scrollback),
//! 2. at most one updatable block that can be rewritten in place,
//! 3. the dynamic bottom area redrawn on a fixed cadence.
//!
//! Every write repositions the cursor relative to the bottom of the screen,
//! so the static log scrolls away naturally while the live regions stay put.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crossterm::{
    cursor::{Hide, MoveToColumn, MoveUp, Show},
    queue,
    terminal::{Clear, ClearType},
};

/// Lines of pre-styled text; the abstract renderable of this front end.
pub type Renderable = Vec<String>;

pub struct ScrollbackTerminal<W: Write> {
    out: W,
    /// Height of the current updatable block (0 = none).
    updatable_lines: usize,
    /// Height of the last dynamic render.
    dynamic_lines: usize,
}

impl<W: Write> ScrollbackTerminal<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            updatable_lines: 0,
            dynamic_lines: 0,
        }
    }

    /// Clear the screen and hide the cursor.
    pub fn initialize(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            Clear(ClearType::All),
            crossterm::cursor::MoveTo(0, 0),
            Hide
        )?;
        self.out.flush()?;
        self.updatable_lines = 0;
        self.dynamic_lines = 0;
        Ok(())
    }

    /// Wipe the whole screen and start over (used by `/clear`).
    pub fn reset(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            Clear(ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        )?;
        self.updatable_lines = 0;
        self.dynamic_lines = 0;
        self.out.flush()?;
        Ok(())
    }

    /// Restore the cursor.  The static log is left in the scrollback.
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        self.clear_live_area()?;
        queue!(self.out, Show)?;
        self.out.flush()?;
        Ok(())
    }

    /// Append to the static log, or replace the updatable block.
    ///
    /// `updatable = true` replaces the current updatable block (there is at
    /// most one).  `updatable = false` first clears any updatable block,
    /// then appends permanently.
    pub fn write_static(&mut self, renderable: &Renderable, updatable: bool) -> anyhow::Result<()> {
        // Rewind over everything below the static log.
        self.move_to_live_start()?;

        if updatable {
            self.print_lines(renderable)?;
            self.updatable_lines = renderable.len();
        } else {
            self.print_lines(renderable)?;
            self.updatable_lines = 0;
        }
        // The dynamic area was wiped by the rewind; the next dynamic render
        // repaints it.
        self.dynamic_lines = 0;
        self.out.flush()?;
        Ok(())
    }

    /// Redraw the dynamic bottom area only.
    pub fn render_dynamic(&mut self, renderable: &Renderable) -> anyhow::Result<()> {
        if self.dynamic_lines > 0 {
            queue!(self.out, MoveUp(self.dynamic_lines as u16), MoveToColumn(0))?;
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        self.print_lines(renderable)?;
        self.dynamic_lines = renderable.len();
        self.out.flush()?;
        Ok(())
    }

    /// Move the cursor to the first line of the updatable block (or where it
    /// would start) and clear everything below.
    fn move_to_live_start(&mut self) -> anyhow::Result<()> {
        let live = self.updatable_lines + self.dynamic_lines;
        if live > 0 {
            queue!(self.out, MoveUp(live as u16))?;
        }
        queue!(self.out, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
        Ok(())
    }

    fn clear_live_area(&mut self) -> anyhow::Result<()> {
        self.move_to_live_start()?;
        self.updatable_lines = 0;
        self.dynamic_lines = 0;
        Ok(())
    }

    fn print_lines(&mut self, lines: &Renderable) -> anyhow::Result<()> {
        for line in lines {
            queue!(self.out, MoveToColumn(0))?;
            self.out.write_all(line.as_bytes())?;
            self.out.write_all(b"\r\n")?;
        }
        Ok(())
    }

    pub fn updatable_lines(&self) -> usize {
        self.updatable_lines
    }

    pub fn dynamic_lines(&self) -> usize {
        self.dynamic_lines
    }
}

/// Shared handle used by the event loop and the dynamic render task.
pub type SharedTerminal<W> = Arc<Mutex<ScrollbackTerminal<W>>>;

pub fn shared<W: Write>(terminal: ScrollbackTerminal<W>) -> SharedTerminal<W> {
    Arc::new(Mutex::new(terminal))
}

/// Repaint the dynamic area at a fixed cadence until `cancel` resolves.
///
/// `provider` must be side-effect-free: it is called once per frame and only
/// its returned lines are painted.
pub async fn start_dynamic_display<W, F>(
    terminal: SharedTerminal<W>,
    mut provider: F,
    mut cancel: tokio::sync::watch::Receiver<bool>,
    refresh_ms: u64,
) -> anyhow::Result<()>
where
    W: Write + Send + 'static,
    F: FnMut() -> Renderable + Send,
{
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(refresh_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = cancel.changed() => {
                // A dropped sender counts as cancellation.
                if changed.is_err() || *cancel.borrow() {
                    return Ok(());
                }
            }
            _ = interval.tick() => {
                // A panicking renderer must not take the loop down.
                let lines = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| provider()))
                    .unwrap_or_else(|_| vec!["Error rendering: dynamic view panicked".to_string()]);
                let mut term = terminal.lock().unwrap();
                term.render_dynamic(&lines)?;
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
