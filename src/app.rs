//! App: terminal init, main loop, drop timer and key handling.

use crate::GameConfig;
use crate::game::GameState;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// Render at ~60 FPS while waiting for input.
const FRAME_MS: u64 = 16;

pub struct App {
    config: GameConfig,
    state: GameState,
    paused: bool,
    last_drop: Instant,
    /// Rows cleared by the latest lock; non-empty while the flash runs.
    flash_rows: Vec<usize>,
    flash_effect: Option<Effect>,
    flash_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(theme, &config)?;
        Ok(Self {
            config,
            state,
            paused: false,
            last_drop: Instant::now(),
            flash_rows: Vec::new(),
            flash_effect: None,
            flash_process_time: None,
        })
    }

    /// Apply one action. Returns false when the app should exit.
    fn apply_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Quit => return Ok(false),
            Action::Pause => {
                if !self.state.status().is_terminal() {
                    self.paused = !self.paused;
                    debug!(paused = self.paused, "pause toggled");
                }
            }
            Action::Restart => {
                info!("restart");
                self.state.restart();
                self.paused = false;
                self.last_drop = Instant::now();
                self.stop_flash();
            }
            _ if self.paused => {}
            Action::MoveLeft => self.state.move_left(),
            Action::MoveRight => self.state.move_right(),
            Action::Rotate => self.state.rotate(),
            Action::SoftDrop => {
                self.state.soft_drop()?;
                self.last_drop = Instant::now();
            }
            Action::HardDrop => {
                self.state.hard_drop()?;
                self.last_drop = Instant::now();
            }
            Action::None => {}
        }
        Ok(true)
    }

    /// Pick up rows cleared by the last lock and restart the flash over them.
    fn collect_flash(&mut self) {
        let rows = self.state.take_flash_rows();
        if rows.is_empty() || self.config.no_animation {
            return;
        }
        self.flash_rows = rows;
        self.flash_effect = None;
        self.flash_process_time = None;
    }

    fn stop_flash(&mut self) {
        self.flash_rows.clear();
        self.flash_effect = None;
        self.flash_process_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let drop_interval = Duration::from_millis(self.config.drop_interval_ms);
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    self.paused,
                    f.area(),
                    &self.flash_rows,
                    &mut self.flash_effect,
                    &mut self.flash_process_time,
                    now,
                );
            })?;

            if self.flash_effect.as_ref().is_some_and(Effect::done) {
                self.stop_flash();
            }

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.apply_action(key_to_action(key))? {
                            return Ok(());
                        }
                        self.collect_flash();
                    }
                }
            }

            if !self.paused
                && !self.state.status().is_terminal()
                && self.last_drop.elapsed() >= drop_interval
            {
                self.last_drop = Instant::now();
                self.state.tick_gravity()?;
                self.collect_flash();
            }
        }
    }
}
