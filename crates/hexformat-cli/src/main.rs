mod app;
mod view;

use anyhow::Result;
use app::{App, ChunkMode, Focus, Prompt};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hexformat_config::Config;
use hexformat_engine::Cmd;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

fn main() -> Result<()> {
    // The TUI owns the terminal, so stay quiet unless RUST_LOG asks otherwise
    let mut logger = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        logger.filter_level(log::LevelFilter::Error);
    }
    logger.init();

    let args: Vec<String> = env::args().collect();
    let (binary_path, layout_path) = match args.as_slice() {
        [_, binary] => (PathBuf::from(binary), None),
        [_, binary, layout] => (PathBuf::from(binary), Some(PathBuf::from(layout))),
        _ => {
            eprintln!("Usage: {} <binary-file> [layout.json]", args[0]);
            process::exit(1);
        }
    };

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            let config = Config::default();
            match config.save() {
                Ok(()) => log::info!("Created default config file at {}", Config::config_path().display()),
                Err(e) => log::warn!("Failed to create default config file: {e}"),
            }
            config
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let mut app = match App::new(binary_path.clone(), layout_path, &config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: Could not open '{}': {e}", binary_path.display());
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some((_, input)) = app.prompt.as_mut() {
            match key.code {
                KeyCode::Enter => app.submit_prompt(),
                KeyCode::Esc => app.cancel_prompt(),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
            continue;
        }

        let row = app.view.column_width as i64;
        match (app.focus, key.code) {
            (_, KeyCode::Char('q')) => return Ok(()),
            (_, KeyCode::Tab) => {
                app.focus = match app.focus {
                    Focus::Segments => Focus::Hex,
                    Focus::Hex => Focus::Segments,
                }
            }
            (Focus::Segments, KeyCode::Down | KeyCode::Char('j')) => app.next_segment(),
            (Focus::Segments, KeyCode::Up | KeyCode::Char('k')) => app.previous_segment(),
            (Focus::Segments, KeyCode::Enter | KeyCode::Char(' ')) => app.show_selected_segment(),
            (Focus::Hex, KeyCode::Right | KeyCode::Char('l')) => app.view.move_cursor(1),
            (Focus::Hex, KeyCode::Left | KeyCode::Char('h')) => app.view.move_cursor(-1),
            (Focus::Hex, KeyCode::Down | KeyCode::Char('j')) => app.view.move_cursor(row),
            (Focus::Hex, KeyCode::Up | KeyCode::Char('k')) => app.view.move_cursor(-row),
            (Focus::Hex, KeyCode::Char('v')) => app.view.toggle_anchor(),
            (_, KeyCode::Char('s')) => app.split_selection(),
            (_, KeyCode::Char('c')) => app.create_child_from_selection(),
            (_, KeyCode::Char('u')) => app.apply_to_selected(|target| Cmd::MergeUp { target }),
            (_, KeyCode::Char('d')) => app.apply_to_selected(|target| Cmd::MergeDown { target }),
            (_, KeyCode::Char('x')) => app.apply_to_selected(|target| Cmd::ClearFormat { target }),
            (_, KeyCode::Char('n')) => app.begin_define_struct(),
            (_, KeyCode::Char('r')) => app.open_prompt_for_selected(Prompt::Rename),
            (_, KeyCode::Char('a')) => app.open_prompt_for_selected(Prompt::ApplyStruct),
            (_, KeyCode::Char('t')) => app.open_prompt_for_selected(Prompt::DisplayFormat),
            (_, KeyCode::Char('f')) => app.open_prompt_for_selected(|target| Prompt::Chunk {
                target,
                mode: ChunkMode::Split,
            }),
            (_, KeyCode::Char('A')) => app.open_prompt_for_selected(|target| Prompt::Chunk {
                target,
                mode: ChunkMode::Array,
            }),
            (_, KeyCode::Char('p')) => app.open_prompt_for_selected(|target| Prompt::Chunk {
                target,
                mode: ChunkMode::Separate,
            }),
            (_, KeyCode::Char('w')) => app.write_layout(),
            _ => {}
        }
    }
}

fn focused_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(f.area());
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    // Segment forest
    let items: Vec<ListItem> = app
        .snapshot
        .segments
        .iter()
        .map(|segment| {
            let indent = "  ".repeat(segment.depth);
            let item = if segment.is_array_item { "• " } else { "" };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{indent}{item}{} ", segment.name)),
                Span::styled(
                    format!("{}-{} ", segment.range.start_hex(), segment.range.end_hex()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    segment.display_format.clone(),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();
    let segments = List::new(items)
        .block(focused_block("Segments", app.focus == Focus::Segments))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(segments, panes[0], &mut app.list_state);

    // Hex window; the inner area decides how many rows fit
    let hex_block = focused_block("Bytes", app.focus == Focus::Hex);
    let inner = hex_block.inner(panes[1]);
    app.view.resize(inner.width, inner.height);
    let hex = Paragraph::new(app.view.render_lines(&app.bytes)).block(hex_block);
    f.render_widget(hex, panes[1]);

    // Status or prompt
    let status = match &app.prompt {
        Some((prompt, input)) => {
            let mut spans = vec![
                Span::styled(format!("{}: ", prompt.title()), Style::default().fg(Color::Yellow)),
                Span::raw(input.clone()),
            ];
            if let Prompt::DisplayFormat(target) = prompt {
                spans.push(Span::styled(
                    format!("  ({})", app.format_choices(*target).join(", ")),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        }
        None => Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Red),
        )),
    };
    f.render_widget(Paragraph::new(status), rows[1]);

    let help = Line::from(vec![
        Span::raw("q: Quit | Tab: Focus | v: Select | "),
        Span::raw("s: Split | c: Child | u/d: Merge | x: Clear | "),
        Span::raw("n: Struct | a: Apply | r: Rename | t: Type | "),
        Span::raw("f/A/p: By format | w: Save"),
    ]);
    f.render_widget(Paragraph::new(help), rows[2]);
}
