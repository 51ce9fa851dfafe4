//! Drawing of a session snapshot. Nothing here talks to the server.

use crate::client::AsmInstruction;
use crate::session::listing::{hexdigits, Listing};
use crate::session::panel::PanelKind;
use crate::ui::tui::utils::logger::TuiLogLine;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Frame;
use strum::IntoEnumIterator;
use unicode_width::UnicodeWidthStr;

/// Content of the right side of the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SidePanel {
    Panel(PanelKind),
    Functions,
    Sources,
    Types,
    Disassembly,
    Logs,
}

impl SidePanel {
    pub fn all() -> Vec<SidePanel> {
        PanelKind::iter()
            .map(SidePanel::Panel)
            .chain([
                SidePanel::Functions,
                SidePanel::Sources,
                SidePanel::Types,
                SidePanel::Disassembly,
                SidePanel::Logs,
            ])
            .collect()
    }

    pub fn title(&self) -> String {
        match self {
            SidePanel::Panel(kind) => kind.to_string(),
            SidePanel::Functions => "Functions".to_string(),
            SidePanel::Sources => "Sources".to_string(),
            SidePanel::Types => "Types".to_string(),
            SidePanel::Disassembly => "Disassembly".to_string(),
            SidePanel::Logs => "Logs".to_string(),
        }
    }

    /// Panel shown after this one.
    pub fn next(self) -> SidePanel {
        let all = Self::all();
        let idx = all.iter().position(|p| *p == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

/// Consistent copy of the session taken once per frame.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub prompt: String,
    pub listing: Listing,
    pub disassembly: Vec<AsmInstruction>,
    pub output: String,
    /// Start of the last complete scrollback line.
    pub output_cursor: usize,
    pub next_in_progress: bool,
    pub command_line: String,
    /// Char index of the command line cursor.
    pub cursor: usize,
    pub read_only: bool,
}

/// Content of the side panel for one frame.
pub enum SideContent {
    Lines(Vec<String>),
    Loading,
    Logs(Vec<TuiLogLine>),
}

/// View state that survives between frames.
#[derive(Debug)]
pub struct ViewState {
    pub side: SidePanel,
    pub listing_offset: usize,
    /// Height of the listing area in the last frame.
    pub listing_height: usize,
    /// Scrollback lines hidden below the bottom of the output area.
    pub output_scroll: usize,
    pub output_height: usize,
    output_cursor: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            side: SidePanel::Panel(PanelKind::Locals),
            listing_offset: 0,
            listing_height: 0,
            output_scroll: 0,
            output_height: 0,
            output_cursor: 0,
        }
    }
}

impl ViewState {
    /// Put the current line in the middle of the listing area.
    pub fn recenter(&mut self, listing: &Listing) {
        self.listing_offset = listing
            .current_line()
            .map(|line| line.saturating_sub(self.listing_height / 2))
            .unwrap_or(0);
    }

    pub fn scroll_up(&mut self) {
        self.listing_offset = self
            .listing_offset
            .saturating_sub(self.listing_height.max(1));
    }

    pub fn scroll_down(&mut self, total: usize) {
        let max = total.saturating_sub(1);
        self.listing_offset = (self.listing_offset + self.listing_height.max(1)).min(max);
    }

    /// Jump back to the newest scrollback line once the output cursor moves.
    pub fn follow_output(&mut self, cursor: usize) {
        if cursor != self.output_cursor {
            self.output_cursor = cursor;
            self.output_scroll = 0;
        }
    }

    pub fn scroll_output_up(&mut self, total: usize) {
        let max = total.saturating_sub(self.output_height);
        self.output_scroll = (self.output_scroll + self.output_height.max(1)).min(max);
    }

    pub fn scroll_output_down(&mut self) {
        self.output_scroll = self.output_scroll.saturating_sub(self.output_height.max(1));
    }
}

/// Argument of a `break` being typed, used to narrow the program panels.
pub fn break_filter(command_line: &str) -> &str {
    let line = command_line.trim_start();
    ["break ", "b "]
        .iter()
        .find_map(|cmd| line.strip_prefix(cmd))
        .map(str::trim)
        .unwrap_or("")
}

pub fn program_lines(entries: &[String], filter: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.contains(filter))
        .cloned()
        .collect()
}

fn listing_lines(listing: &Listing, offset: usize, height: usize) -> Vec<Line<'static>> {
    listing
        .lines
        .iter()
        .skip(offset)
        .take(height)
        .map(|line| {
            let arrow = if line.current { "=> " } else { "   " };
            let bp = if line.breakpoint.is_some() { "● " } else { "  " };
            let style = if line.current {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(arrow, Style::default().fg(Color::Yellow)),
                Span::styled(bp, Style::default().fg(Color::Red)),
                Span::styled(format!("{} ", line.idx), Style::default().fg(Color::DarkGray)),
                Span::styled(line.text.clone(), style),
            ])
        })
        .collect()
}

pub fn disassembly_lines(instructions: &[AsmInstruction]) -> Vec<String> {
    let width = instructions
        .iter()
        .map(|i| hexdigits(i.loc.pc))
        .max()
        .unwrap_or(1);
    instructions
        .iter()
        .map(|i| {
            let arrow = if i.at_pc { "=>" } else { "  " };
            let bp = if i.breakpoint { "●" } else { " " };
            format!("{arrow}{bp} {:0width$x} {}", i.loc.pc, i.text)
        })
        .collect()
}

/// Scrollback window ending `scroll` lines above the line at `cursor`.
fn scrollback_lines(
    text: &str,
    cursor: usize,
    height: usize,
    scroll: usize,
) -> Vec<Line<'static>> {
    let lines: Vec<&str> = text.lines().collect();
    let anchor = text.chars().take(cursor).filter(|&c| c == '\n').count();
    let last = (anchor + 1).min(lines.len());
    let end = last.saturating_sub(scroll).max(height.min(last));
    lines[end.saturating_sub(height)..end]
        .iter()
        .map(|l| Line::raw(l.to_string()))
        .collect()
}

fn output_title(next_in_progress: bool) -> &'static str {
    if next_in_progress {
        "Output [next in progress]"
    } else {
        "Output"
    }
}

fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

pub fn draw(frame: &mut Frame, snapshot: &Snapshot, side: &SideContent, view: &mut ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Min(4)])
        .split(frame.size());
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(rows[1]);

    // listing
    view.listing_height = inner_height(top[0]);
    let title = if snapshot.listing.file.is_empty() {
        "Source".to_string()
    } else {
        snapshot.listing.file.clone()
    };
    let listing = Paragraph::new(listing_lines(
        &snapshot.listing,
        view.listing_offset,
        view.listing_height,
    ))
    .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(listing, top[0]);

    // side panel
    let panels = SidePanel::all();
    let side_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(top[1]);
    let selected = panels.iter().position(|p| *p == view.side).unwrap_or(0);
    let tabs = Tabs::new(panels.iter().map(|p| p.title()).collect::<Vec<_>>())
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow));
    frame.render_widget(tabs, side_area[0]);

    let height = inner_height(side_area[1]);
    let content: Vec<Line> = match side {
        SideContent::Loading => vec![Line::raw("loading...")],
        SideContent::Lines(lines) => lines
            .iter()
            .take(height)
            .map(|l| Line::raw(l.clone()))
            .collect(),
        SideContent::Logs(lines) => lines[lines.len().saturating_sub(height)..]
            .iter()
            .map(TuiLogLine::to_line)
            .collect(),
    };
    let side_panel = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(view.side.title()));
    frame.render_widget(side_panel, side_area[1]);

    // scrollback
    view.output_height = inner_height(bottom[0]);
    view.follow_output(snapshot.output_cursor);
    let scrollback = Paragraph::new(scrollback_lines(
        &snapshot.output,
        snapshot.output_cursor,
        view.output_height,
        view.output_scroll,
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(output_title(snapshot.next_in_progress)),
    );
    frame.render_widget(scrollback, bottom[0]);

    // prompt line
    let prompt_style = if snapshot.read_only {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    };
    let line = Line::from(vec![
        Span::styled(format!("{} ", snapshot.prompt), prompt_style),
        Span::raw(snapshot.command_line.clone()),
    ]);
    frame.render_widget(Paragraph::new(line), bottom[1]);

    if !snapshot.read_only {
        let before_cursor: String = snapshot.command_line.chars().take(snapshot.cursor).collect();
        let x = bottom[1].x as usize + snapshot.prompt.width() + 1 + before_cursor.width();
        let x = x.min((bottom[1].x + bottom[1].width.saturating_sub(1)) as usize);
        frame.set_cursor(x as u16, bottom[1].y);
    }
}
