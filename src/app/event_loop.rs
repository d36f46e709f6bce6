use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, update};
use crate::flowfile::FlowStep;
use crate::watcher::StepWatcher;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization, step loading, or the
    /// event loop encounters an I/O or parsing failure.
    pub fn run(&self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // Load the step; a missing file starts a fresh one
        let read_scope = crate::perf::scope("app.read_step");
        let started_fresh = !self.file_path.exists();
        let step = if started_fresh {
            FlowStep::starter()
        } else {
            FlowStep::load(&self.file_path)
                .with_context(|| format!("Failed to load flow step {}", self.file_path.display()))?
        };
        drop(read_scope);

        // Initialize terminal
        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; chiclet requires an interactive terminal")?;
        execute!(stdout(), EnableMouseCapture)?;
        let size = terminal.size()?;
        drop(init_scope);

        // Create initial model
        let mut model = Model::new(self.file_path.clone(), step, (size.width, size.height));
        model.watch_enabled = self.watch_enabled;
        if started_fresh {
            model.show_toast(ToastLevel::Info, "New step; Ctrl+S creates the file");
        }

        // Main loop
        let result = self.event_loop(&mut terminal, &mut model);

        // Restore terminal
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn event_loop(&self, terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut step_watcher = if model.watch_enabled {
            match self.make_step_watcher() {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    model.watch_enabled = false;
                    model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                    crate::perf::log_event(
                        "watcher.error",
                        format!("failed path={} err={err}", model.file_path.display()),
                    );
                    None
                }
            }
        } else {
            None
        };
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            if model.watch_enabled
                && step_watcher
                    .as_mut()
                    .is_some_and(StepWatcher::take_change_ready)
            {
                *model = update(std::mem::take(model), Message::FileChanged);
                self.handle_message_side_effects(model, &Message::FileChanged);
                needs_render = true;
            }

            // Handle events
            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() {
                10
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so the debouncer uses accurate times.
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let msg = self.handle_event(event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    crate::perf::log_event(
                        "event.message",
                        format!("frame={frame_idx} msg={msg:?}"),
                    );
                    let side_msg = msg.clone();
                    *model = update(std::mem::take(model), msg);
                    self.handle_message_side_effects(model, &side_msg);
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let msg =
                        self.handle_event(event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        drained += 1;
                        let side_msg = msg.clone();
                        *model = update(std::mem::take(model), msg);
                        self.handle_message_side_effects(model, &side_msg);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| Self::view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }
}
