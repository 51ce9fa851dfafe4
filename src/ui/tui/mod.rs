//! Terminal application: render loop, keyboard handling and inspection panels.

use crate::session::dispatch::Dispatcher;
use crate::session::{ProgramInfo, Session};
use crate::ui::tui::keys::Action;
use crate::ui::tui::panels::PanelSet;
use crate::ui::tui::tick::Ticker;
use crate::ui::tui::utils::logger::LogBuffer;
use crate::ui::tui::view::{SideContent, SidePanel, Snapshot, ViewState};
use crossterm::cursor::Show;
use crossterm::event::KeyEvent;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

pub mod keys;
pub mod panels;
mod tick;
pub mod utils;
pub mod view;

/// Frame cadence of the render loop.
const TICK_RATE: Duration = Duration::from_millis(30);
/// Log records available to the logs view.
const LOG_VIEW_LINES: usize = 200;

pub enum Event<I> {
    Input(I),
    Resize,
    Tick,
}

pub struct TuiApplication {
    session: Session,
    dispatcher: Dispatcher,
    panels: PanelSet,
    logs: LogBuffer,
    view: ViewState,
}

impl TuiApplication {
    /// `panels` must be the set whose registry was given to `session`.
    pub fn new(session: Session, panels: PanelSet, logs: LogBuffer) -> Self {
        Self {
            dispatcher: Dispatcher::new(session.clone()),
            session,
            panels,
            logs,
            view: ViewState::default(),
        }
    }

    /// Run until the user exits. The terminal is restored on return.
    pub fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            _ = disable_raw_mode();
            _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, Show);
            original_hook(panic);
        }));

        let (tx, rx) = mpsc::channel();
        let ticker_handle = Ticker::new(TICK_RATE).run(tx);

        let result = self.event_loop(&mut terminal, rx);

        drop(ticker_handle);
        disable_raw_mode()?;
        crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!(target: "tui", "terminal restored");

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        rx: Receiver<Event<KeyEvent>>,
    ) -> anyhow::Result<()> {
        let mut redraw = true;
        loop {
            if self.session.lock().quit {
                return Ok(());
            }

            if self.session.take_changed() || redraw {
                self.draw(terminal)?;
                redraw = false;
            }

            match rx.recv()? {
                Event::Input(key) => {
                    if let Some(action) = keys::action(key) {
                        self.handle(action);
                        redraw = true;
                    }
                }
                Event::Resize => redraw = true,
                Event::Tick => {}
            }
        }
    }

    /// Copy everything a frame needs under one lock.
    fn snapshot(&mut self) -> Snapshot {
        let mut st = self.session.lock();
        let snapshot = Snapshot {
            prompt: st.prompt(),
            listing: st.listing.clone(),
            disassembly: st.disassembly.instructions.clone(),
            output: st.output.text(),
            output_cursor: st.output.cursor(),
            next_in_progress: st.next_in_progress,
            command_line: st.command_line.text(),
            cursor: st.command_line.cursor(),
            read_only: st.command_line.read_only,
        };
        if st.listing.recenter {
            st.listing.recenter = false;
            drop(st);
            self.view.recenter(&snapshot.listing);
        }
        snapshot
    }

    fn side_content(&self, snapshot: &Snapshot) -> SideContent {
        match self.view.side {
            SidePanel::Panel(kind) => match self.panels.lines(kind, &self.session) {
                Some(lines) => SideContent::Lines(lines),
                None => SideContent::Loading,
            },
            SidePanel::Functions => self.program_panel(snapshot, |p| &p.functions),
            SidePanel::Sources => self.program_panel(snapshot, |p| &p.sources),
            SidePanel::Types => self.program_panel(snapshot, |p| &p.types),
            SidePanel::Disassembly => {
                SideContent::Lines(view::disassembly_lines(&snapshot.disassembly))
            }
            SidePanel::Logs => SideContent::Logs(self.logs.tail(LOG_VIEW_LINES)),
        }
    }

    fn program_panel(
        &self,
        snapshot: &Snapshot,
        entries: fn(&ProgramInfo) -> &Vec<String>,
    ) -> SideContent {
        let filter = view::break_filter(&snapshot.command_line);
        let st = self.session.lock();
        SideContent::Lines(view::program_lines(entries(&st.program), filter))
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
        let snapshot = self.snapshot();
        let side = self.side_content(&snapshot);
        let view = &mut self.view;
        terminal.draw(|frame| view::draw(frame, &snapshot, &side, view))?;
        Ok(())
    }

    fn handle(&mut self, action: Action) {
        match action {
            Action::Submit => {
                self.dispatcher.submit_command_line();
            }
            Action::RecallPrevious => self.dispatcher.recall_previous(),
            Action::RecallNext => self.dispatcher.recall_next(),
            Action::Left => self.session.lock().command_line.left(),
            Action::Right => self.session.lock().command_line.right(),
            Action::Home => self.session.lock().command_line.home(),
            Action::End => self.session.lock().command_line.end(),
            Action::Backspace => self.session.lock().command_line.backspace(),
            Action::Delete => self.session.lock().command_line.delete(),
            Action::Insert(c) => self.session.lock().command_line.insert(c),
            Action::CyclePanel => {
                self.view.side = self.view.side.next();
                debug!(target: "tui", "side panel {}", self.view.side.title());
            }
            Action::ScrollUp => self.view.scroll_up(),
            Action::ScrollDown => {
                let total = self.session.lock().listing.lines.len();
                self.view.scroll_down(total);
            }
            Action::ScrollOutputUp => {
                let total = self.session.lock().output.text().lines().count();
                self.view.scroll_output_up(total);
            }
            Action::ScrollOutputDown => self.view.scroll_output_down(),
            Action::Command(cmd) => {
                self.dispatcher.submit(cmd);
            }
            Action::Interrupt => {
                self.dispatcher.interrupt();
            }
            Action::Exit => self.session.lock().quit = true,
        }
    }
}
