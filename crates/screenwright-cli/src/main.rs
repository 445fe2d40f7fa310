use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use screenwright_config::Config;
use screenwright_engine::{
    Autosave, BlockKind, Cmd, Document, Point, Selection, Session, Store, UndoOutcome, io,
};
use std::{env, io::stdout, path::PathBuf, process, time::Duration};

struct App {
    session: Session,
    autosave: Autosave,
    status: String,
}

enum Flow {
    Continue,
    Quit,
}

impl App {
    fn new(store: Store, debounce: Duration) -> Result<Self> {
        let outcome = store.load()?;
        let status = match &outcome.corruption {
            Some(why) => format!("Recovered from corrupt file: {why}"),
            None => format!("Editing {}", store.path().display()),
        };
        let autosave = Autosave::spawn(store, debounce);
        Ok(Self {
            session: Session::new(outcome.document),
            autosave,
            status,
        })
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('q') if ctrl => return Flow::Quit,
            KeyCode::Char('s') if ctrl => {
                self.autosave.schedule(self.session.document());
                self.autosave.flush();
                self.status = match self.autosave.take_error() {
                    Some(err) => format!("Save failed: {err}"),
                    None => "Saved".to_string(),
                };
            }
            KeyCode::Char('z') if ctrl => match self.session.undo() {
                UndoOutcome::Applied => self.after_edit("Undone"),
                _ => self.status = "Nothing to undo".to_string(),
            },
            KeyCode::Char('y') if ctrl => match self.session.redo() {
                UndoOutcome::Applied => self.after_edit("Redone"),
                _ => self.status = "Nothing to redo".to_string(),
            },
            KeyCode::Char('n') if ctrl => {
                let kind = self.caret_block_kind();
                self.commit(Cmd::InsertBlock { kind, at: None });
            }
            KeyCode::F(n @ 1..=4) => {
                let kind = match n {
                    1 => BlockKind::SceneHeading,
                    2 => BlockKind::Action,
                    3 => BlockKind::Character,
                    _ => BlockKind::Dialogue,
                };
                let index = self.session.selection().focus.block;
                self.commit(Cmd::SetBlockKind { index, kind });
            }
            KeyCode::Enter => self.commit(Cmd::SplitBlock {
                trailing_kind: None,
            }),
            KeyCode::Backspace => self.delete_adjacent(true),
            KeyCode::Delete => self.delete_adjacent(false),
            KeyCode::Left => self.move_caret(|doc, p| doc.point_before(p)),
            KeyCode::Right => self.move_caret(|doc, p| doc.point_after(p)),
            KeyCode::Up => self.move_to_block(-1),
            KeyCode::Down => self.move_to_block(1),
            KeyCode::Home => {
                let block = self.session.selection().focus.block;
                let _ = self.session.set_selection(Selection::caret(Point::new(block, 0, 0)));
            }
            KeyCode::End => {
                let block = self.session.selection().focus.block;
                let end = self.session.document().end_of_block(block);
                let _ = self.session.set_selection(Selection::caret(end));
            }
            KeyCode::Char(c) if !ctrl => self.commit(Cmd::InsertText {
                text: c.to_string(),
            }),
            _ => {}
        }
        Flow::Continue
    }

    fn caret_block_kind(&self) -> BlockKind {
        let block = self.session.selection().focus.block;
        self.session
            .document()
            .block(block)
            .map(|b| b.kind())
            .unwrap_or(BlockKind::Action)
    }

    fn commit(&mut self, cmd: Cmd) {
        match self.session.apply(cmd) {
            Ok(_) => self.after_edit(""),
            Err(err) => self.status = format!("Edit rejected: {err}"),
        }
    }

    fn after_edit(&mut self, note: &str) {
        self.autosave.schedule(self.session.document());
        self.status = match self.autosave.take_error() {
            Some(err) => format!("Autosave failed: {err}"),
            None => note.to_string(),
        };
    }

    /// Delete the character next to the caret; at a block edge this merges
    /// the neighbouring blocks.
    fn delete_adjacent(&mut self, before: bool) {
        let caret = self.session.selection().focus;
        let doc = self.session.document();
        let other = if before {
            doc.point_before(caret)
        } else {
            doc.point_after(caret)
        };
        if let Some(other) = other {
            self.commit(Cmd::DeleteRange {
                selection: Some(Selection::new(other, caret)),
            });
        }
    }

    fn move_caret(&mut self, step: impl Fn(&Document, Point) -> Option<Point>) {
        let caret = self.session.selection().focus;
        if let Some(next) = step(self.session.document(), caret) {
            let _ = self.session.set_selection(Selection::caret(next));
        }
    }

    fn move_to_block(&mut self, delta: isize) {
        let caret = self.session.selection().focus;
        let count = self.session.document().block_count() as isize;
        let target = caret.block as isize + delta;
        if (0..count).contains(&target) {
            let _ = self
                .session
                .set_selection(Selection::caret(Point::new(target as usize, 0, 0)));
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine the screenplay path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let screenplay_path;
    let mut debounce = io::DEFAULT_DEBOUNCE;

    if args.len() == 2 {
        screenplay_path = PathBuf::from(&args[1]);
    } else if args.len() == 1 {
        match Config::load() {
            Ok(Some(config)) => {
                screenplay_path = config.screenplay_path;
                debounce = Duration::from_millis(config.autosave_debounce_ms);
            }
            Ok(None) => {
                eprintln!("Error: No screenplay path provided and no config file found");
                eprintln!("Usage: {} <screenplay-file>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <screenplay-file>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [screenplay-file]", args[0]);
        process::exit(1);
    };

    tracing::info!(path = %screenplay_path.display(), "opening screenplay");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Store::new(screenplay_path), debounce)?;

    let res = run_app(&mut terminal, &mut app);

    // Ensure the last edit reaches disk before leaving
    app.autosave.flush();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if let Flow::Quit = app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let snapshot = app.session.snapshot();
    let caret = app.session.selection().focus;

    let mut lines: Vec<Line> = Vec::with_capacity(snapshot.blocks.len() * 2);
    for (index, block) in snapshot.blocks.iter().enumerate() {
        let caret_offset = (index == caret.block).then(|| caret_offset_in_block(app, caret));
        lines.push(render_block(block.kind, &block.text, caret_offset));
        lines.push(Line::default());
    }

    let editor = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Screenplay"))
        .wrap(Wrap { trim: false });
    f.render_widget(editor, chunks[0]);

    let help = Line::from(vec![
        Span::raw("^Q quit | ^S save | ^Z/^Y undo/redo | ^N new block | "),
        Span::raw("Enter split | F1 scene F2 action F3 character F4 dialogue"),
    ]);
    let status = Paragraph::new(vec![Line::from(app.status.as_str()), help]);
    f.render_widget(status, chunks[1]);
}

/// Byte offset of the caret within the block's joined text.
fn caret_offset_in_block(app: &App, caret: Point) -> usize {
    let Some(block) = app.session.document().block(caret.block) else {
        return 0;
    };
    let preceding: usize = block.runs()[..caret.run]
        .iter()
        .map(|run| run.text.len())
        .sum();
    preceding + caret.offset
}

/// One case per kind: adding a block kind forces a styling decision here.
fn render_block(kind: BlockKind, text: &str, caret: Option<usize>) -> Line<'static> {
    match kind {
        BlockKind::SceneHeading => styled_line(
            text.to_uppercase(),
            caret,
            Style::default().add_modifier(Modifier::BOLD),
            false,
        ),
        BlockKind::Action => styled_line(text.to_string(), caret, Style::default(), false),
        BlockKind::Character => styled_line(
            text.to_uppercase(),
            caret,
            Style::default().add_modifier(Modifier::BOLD),
            true,
        ),
        BlockKind::Dialogue => styled_line(text.to_string(), caret, Style::default(), true),
    }
}

fn styled_line(
    text: String,
    caret: Option<usize>,
    style: Style,
    centered: bool,
) -> Line<'static> {
    let spans = match caret {
        // Uppercasing can change byte lengths, so clamp to the nearest
        // boundary rather than trusting the model offset blindly
        Some(offset) => {
            let mut at = offset.min(text.len());
            while !text.is_char_boundary(at) {
                at -= 1;
            }
            vec![
                Span::styled(text[..at].to_string(), style),
                Span::styled("\u{2502}", Style::default().fg(Color::Yellow)),
                Span::styled(text[at..].to_string(), style),
            ]
        }
        None => vec![Span::styled(text, style)],
    };
    let line = Line::from(spans);
    if centered { line.centered() } else { line }
}
