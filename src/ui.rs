use crate::advisor::DISCLAIMER;
use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::map::{cluster_color, MapLayers, NO_DATA_COLOR, PALETTE};
use crate::session::Recommendation;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

/// Screen regions of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panes {
    pub filters: Rect,
    pub map: Rect,
    /// Map area inside its border, where the braille canvas goes
    pub map_inner: Rect,
    pub detail: Rect,
    pub causes: Rect,
    pub advice: Rect,
    pub status: Rect,
}

/// Split the terminal into panes
pub fn layout(area: Rect) -> Panes {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filters
            Constraint::Min(8),    // Map and side panels
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),  // Detail
            Constraint::Length(13), // Top causes: header + 10 rows + border
            Constraint::Min(5),     // Recommendation
        ])
        .split(body[1]);

    Panes {
        filters: rows[0],
        map: body[0],
        map_inner: panel("").inner(body[0]),
        detail: side[0],
        causes: side[1],
        advice: side[2],
        status: rows[2],
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let panes = layout(frame.area());

    render_filters(frame, app, panes.filters);
    render_map(frame, app, panes.map);
    render_detail(frame, app, panes.detail);
    render_causes(frame, app, panes.causes);
    render_advice(frame, app, panes.advice);
    render_status_bar(frame, app, panes.status);
}

fn render_filters(frame: &mut Frame, app: &App, area: Rect) {
    let filter = app.filter();
    let key = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut spans = vec![
        Span::styled(" Year: ", key),
        Span::styled(filter.year.to_string(), value),
        Span::styled(" [y/Y]", key),
    ];
    if app.has_categories() {
        spans.push(Span::styled("   Death category: ", key));
        spans.push(Span::styled(filter.category.unwrap_or_default(), value));
        spans.push(Span::styled(" [c/C]", key));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(panel(" Mortality Risk Map "));
    frame.render_widget(paragraph, area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Risk clusters ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if !app.map.has_data() {
        frame.render_widget(Paragraph::new("No boundary polygons to draw."), inner);
        return;
    }

    let selected = app.selection().map(|s| &s.key);
    let hovered = app.hovered.or(app.focused());
    let layers = app.map.render(
        inner.width as usize,
        inner.height as usize,
        &app.viewport,
        selected,
        hovered,
    );

    let tooltip = app.hovered.zip(app.mouse_pos).map(|(idx, (col, row))| {
        let risk = &app.map.regions()[idx].risk;
        let lines = vec![
            risk.display_name.clone(),
            format!("Risk: {}", risk.risk_label),
            format!("Deaths: {}", risk.total_deaths.round() as i64),
        ];
        (col.saturating_sub(inner.x), row.saturating_sub(inner.y), lines)
    });

    let mut legend: Vec<(Color, String)> = app
        .legend()
        .iter()
        .map(|(cluster, label)| (cluster_color(Some(*cluster)), format!("{cluster} {label}")))
        .collect();
    legend.push((NO_DATA_COLOR, "No data".into()));

    frame.render_widget(
        MapWidget {
            layers,
            tooltip,
            legend,
        },
        inner,
    );
}

/// Braille choropleth with legend and tooltip overlaid
struct MapWidget {
    layers: MapLayers,
    /// Cursor offset inside the map and the lines to show
    tooltip: Option<(u16, u16, Vec<String>)>,
    legend: Vec<(Color, String)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, style: Style, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.glyphs() {
            if col >= area.width || row >= area.height {
                continue;
            }
            buf[(area.x + col, area.y + row)].set_char(ch).set_style(style);
        }
    }

    fn put_str(text: &str, x: u16, y: u16, style: Style, area: Rect, buf: &mut Buffer) {
        if y >= area.y + area.height {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let px = x + i as u16;
            if px >= area.x + area.width {
                break;
            }
            buf[(px, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: no-data fill, cluster fills, borders, hover, selection
        Self::render_layer(&self.layers.no_data, Style::default().fg(NO_DATA_COLOR), area, buf);
        for (canvas, color) in self.layers.clusters.iter().zip(PALETTE) {
            Self::render_layer(canvas, Style::default().fg(color), area, buf);
        }
        Self::render_layer(&self.layers.borders, Style::default().fg(Color::DarkGray), area, buf);
        Self::render_layer(&self.layers.hovered, Style::default().fg(Color::White), area, buf);
        Self::render_layer(
            &self.layers.selected,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            area,
            buf,
        );

        let label_style = Style::default().fg(Color::White);
        for (col, row, text) in &self.layers.labels {
            if *row < area.height && *col < area.width {
                Self::put_str(text, area.x + col, area.y + row, label_style, area, buf);
            }
        }

        // Legend, bottom left
        let top = area.height.saturating_sub(self.legend.len() as u16);
        for (i, (color, label)) in self.legend.iter().enumerate() {
            let y = area.y + top + i as u16;
            Self::put_str("■ ", area.x, y, Style::default().fg(*color), area, buf);
            Self::put_str(label, area.x + 2, y, Style::default().fg(Color::Gray), area, buf);
        }

        if let Some((col, row, lines)) = &self.tooltip {
            let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 2;
            let x = if col + 2 + width <= area.width {
                col + 2
            } else {
                col.saturating_sub(width + 1)
            };
            let y = (*row + 1).min(area.height.saturating_sub(lines.len() as u16));
            let style = Style::default().fg(Color::Black).bg(Color::White);
            for (i, line) in lines.iter().enumerate() {
                let padded = format!(" {line:<w$} ", w = width as usize - 2);
                Self::put_str(&padded, area.x + x, area.y + y + i as u16, style, area, buf);
            }
        }
    }
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let key = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    match (app.selected_display(), app.summary()) {
        (Some(display), Some(summary)) => {
            lines.push(Line::from(vec![
                Span::styled("Region: ", key),
                Span::styled(display.to_string(), value),
            ]));
            if let Some(category) = app.filter().category {
                lines.push(Line::from(vec![
                    Span::styled("Category: ", key),
                    Span::styled(category, value),
                ]));
            }
            lines.push(Line::from(vec![
                Span::styled("Risk: ", key),
                Span::styled(
                    summary.risk_label.clone(),
                    Style::default().fg(cluster_color(Some(summary.cluster))),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Total deaths: ", key),
                Span::styled((summary.total_deaths.round() as i64).to_string(), value),
            ]));
        }
        _ => lines.push(Line::from("No data for the selected region.")),
    }

    lines.push(Line::default());
    if app.options().is_empty() {
        lines.push(Line::styled("No regions for this filter.", key));
    } else if app.dropdown_active() {
        let position = app.selection().map_or(0, |s| s.position);
        let name = app.selected_display().map(|d| d.to_string()).unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled("Pick a region [Up/Down]: ", key),
            Span::styled(format!("◀ {name} ▶"), Style::default().fg(Color::Yellow)),
            Span::styled(format!(" {}/{}", position + 1, app.options().len()), key),
        ]));
    } else {
        lines.push(Line::styled("Selected on the map [x to clear]", key));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel(" Region detail "))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_causes(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Top causes of death ");
    if app.causes().is_empty() {
        let paragraph = Paragraph::new("No cause-of-death data for this selection.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.causes().iter().map(|c| {
        Row::new(vec![c.cause.clone(), (c.total.round() as i64).to_string()])
    });
    let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(8)])
        .header(
            Row::new(vec!["Cause", "Deaths"])
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        )
        .block(block);
    frame.render_widget(table, area);
}

fn render_advice(frame: &mut Frame, app: &App, area: Rect) {
    let muted = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    if app.pending_request {
        lines.push(Line::styled(
            "Generating recommendation...",
            Style::default().fg(Color::Yellow),
        ));
    } else {
        match app.session.recommendation() {
            Recommendation::Visible(text) => {
                lines.extend(markdown_lines(text));
                lines.push(Line::default());
                lines.push(Line::styled(DISCLAIMER, muted.add_modifier(Modifier::ITALIC)));
            }
            Recommendation::Hidden if app.causes().is_empty() => {
                lines.push(Line::styled(
                    "Pick a region that has cause-of-death data to get recommendations.",
                    muted,
                ));
            }
            Recommendation::Hidden => {
                let region = app.selected_display().map(|d| d.to_string()).unwrap_or_default();
                lines.push(Line::from(vec![
                    Span::styled("Press ", muted),
                    Span::styled("g", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" for AI recommendations for {region}."), muted),
                ]));
            }
        }
    }

    if let Some(error) = &app.last_error {
        lines.push(Line::default());
        lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel(" Recommendations "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Minimal markdown: `#` headings, `-`/`*` bullets and `**bold**` spans
pub fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    text.lines()
        .map(|raw| {
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            let hashes = trimmed.chars().take_while(|&c| c == '#').count();
            if hashes > 0 && trimmed[hashes..].starts_with(' ') {
                let title = trimmed[hashes..].trim().replace("**", "");
                return Line::styled(
                    title,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                );
            }

            let (prefix, body) = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
                Some(rest) => {
                    let indent = line.len() - trimmed.len();
                    (format!("{}• ", " ".repeat(indent)), rest)
                }
                None => (String::new(), line),
            };

            let mut spans = Vec::new();
            if !prefix.is_empty() {
                spans.push(Span::raw(prefix));
            }
            spans.extend(inline_spans(body));
            Line::from(spans)
        })
        .collect()
}

/// Split on `**` markers, alternating plain and bold
fn inline_spans(text: &str) -> Vec<Span<'static>> {
    text.split("**")
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect()
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map.settings;
    let toggle = |on: bool, on_text: &'static str, off_text: &'static str| {
        Span::styled(
            if on { on_text } else { off_text },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        toggle(settings.show_fill, "[F]ill ", "[f]ill "),
        toggle(settings.show_borders, "[B]order ", "[b]order "),
        toggle(settings.show_labels, "[N]ames ", "[n]ames "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
    ];
    match &app.status {
        Some(message) => spans.push(Span::styled(message.clone(), Style::default().fg(Color::White))),
        None => spans.push(Span::styled(
            "click/Tab:select x:clear g:advise hjkl:pan +/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_map_inner_is_inside_map() {
        let panes = layout(Rect::new(0, 0, 120, 40));
        assert_eq!(panes.map_inner.x, panes.map.x + 1);
        assert_eq!(panes.map_inner.width, panes.map.width - 2);
        assert_eq!(panes.status.height, 1);
        assert_eq!(panes.causes.height, 13);
    }

    #[test]
    fn test_markdown_heading_and_bullets() {
        let lines = markdown_lines("## Strategic Response Steps\n- **Screen** early\nplain");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans[0].content, "Strategic Response Steps");
        assert!(lines[0].style.add_modifier.contains(Modifier::BOLD));

        let bullet = &lines[1].spans;
        assert_eq!(bullet[0].content, "• ");
        assert_eq!(bullet[1].content, "Screen");
        assert!(bullet[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(bullet[2].content, " early");

        assert_eq!(lines[2].spans[0].content, "plain");
    }

    #[test]
    fn test_markdown_hash_without_space_is_text() {
        let lines = markdown_lines("#hashtag");
        assert_eq!(lines[0].spans[0].content, "#hashtag");
    }
}
