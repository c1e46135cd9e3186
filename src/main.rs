use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use risk_atlas::advisor::{GeminiClient, TextGenerator};
use risk_atlas::app::App;
use risk_atlas::config::Args;
use risk_atlas::data::DataContext;
use risk_atlas::{logging, ui};
use std::time::Duration;
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::load();
    logging::init(&args.log_file)?;

    // Load failures end the process before the terminal is taken over
    let paths = args.data_paths();
    let data = DataContext::load(&paths)
        .with_context(|| format!("Failed to load datasets (risk table {})", paths.risk.display()))?;

    let gemini = args.gemini();
    if gemini.api_key.is_none() {
        warn!("no Gemini API key configured, recommendations will fail until one is set");
    }
    let client = GeminiClient::new(gemini).context("Failed to build HTTP client")?;
    info!(model = client.model(), "starting dashboard");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &data, &client);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Filters
        KeyCode::Char('y') => app.next_year(),
        KeyCode::Char('Y') => app.prev_year(),
        KeyCode::Char('c') => app.next_category(),
        KeyCode::Char('C') => app.prev_category(),

        // Selection
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Up if !shift => app.dropdown_prev(),
        KeyCode::Down if !shift => app.dropdown_next(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.clear_click(),
        KeyCode::Char('g') | KeyCode::Char('G') => app.request_recommendation(),

        // Pan with hjkl or shifted arrows
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('f') | KeyCode::Char('F') => app.map.toggle_fill(),
        KeyCode::Char('b') | KeyCode::Char('B') => app.map.toggle_borders(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.map.toggle_labels(),

        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        _ => {}
    }
}

/// Handle mouse events for selection, hover, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.mouse_moved(mouse.column, mouse.row),
        // Scroll wheel zooms towards the cursor
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, data: &DataContext, generator: &dyn TextGenerator) -> Result<()> {
    let mut app = App::new(data);

    loop {
        let size = terminal.size()?;
        app.set_map_area(ui::layout(Rect::new(0, 0, size.width, size.height)).map_inner);

        terminal.draw(|frame| ui::render(frame, &app))?;

        // The in-progress state is on screen; now block on the service
        if app.pending_request {
            app.run_request(generator);
            continue;
        }

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.status = None;
                    handle_key(&mut app, key);
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                // Resize needs nothing: layout is recomputed every pass
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
