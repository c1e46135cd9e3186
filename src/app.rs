use crate::advisor::{self, Outcome, Subject, TextGenerator};
use crate::data::{DataContext, RiskRecord};
use crate::join::{enrich, NO_DATA_LABEL};
use crate::map::{MapRenderer, Viewport};
use crate::query::{filter_risk, region_summary, top_causes, CauseCount, Filter};
use crate::region::{DisplayName, NormalizedKey};
use crate::selection::{resolve, MapClick, RegionOptions, Selection, SelectionSource};
use crate::session::{FilterSignature, SessionState};
use ratatui::layout::Rect;
use tracing::{debug, info};

/// Application state
pub struct App<'a> {
    data: &'a DataContext,
    years: Vec<i32>,
    year_idx: usize,
    categories: Vec<String>,
    category_idx: usize,
    /// Last map interaction, if any
    click: Option<MapClick>,
    /// Region last chosen in the dropdown; survives option rebuilds
    dropdown: Option<NormalizedKey>,
    options: RegionOptions,
    selection: Option<Selection>,
    summary: Option<&'a RiskRecord>,
    causes: Vec<CauseCount>,
    /// Clusters present under the current filter with their labels
    legend: Vec<(u8, String)>,
    /// Filter the map was last joined for
    joined_for: Option<Filter>,
    pub session: SessionState,
    pub map: MapRenderer,
    pub viewport: Viewport,
    /// Inner map rectangle in terminal cells, set by the UI layout
    pub map_area: Rect,
    fitted: bool,
    /// Region index under the mouse
    pub hovered: Option<usize>,
    /// Region index focused with Tab
    focus: Option<usize>,
    /// Current mouse position for the tooltip
    pub mouse_pos: Option<(u16, u16)>,
    /// Last mouse position for drag tracking
    last_mouse: Option<(u16, u16)>,
    dragged: bool,
    /// Transient status line message
    pub status: Option<String>,
    /// Last recommendation failure, cleared on a filter change
    pub last_error: Option<String>,
    /// A recommendation was requested and runs after the next draw
    pub pending_request: bool,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(data: &'a DataContext) -> Self {
        let (years, categories) = (data.years(), data.categories());
        let placeholder = Filter {
            year: years.first().copied().unwrap_or_default(),
            category: categories.first().cloned(),
        };
        let map = MapRenderer::new(&enrich(&data.boundaries, filter_risk(&data.risk, &placeholder)));
        let viewport = match map.bounds() {
            Some((w, s, e, n)) => Viewport::new((w + e) / 2.0, (s + n) / 2.0, 1.0, 0, 0),
            None => Viewport::new(0.0, 0.0, 1.0, 0, 0),
        };

        let mut app = Self {
            data,
            years,
            year_idx: 0,
            categories,
            category_idx: 0,
            click: None,
            dropdown: None,
            options: RegionOptions::default(),
            selection: None,
            summary: None,
            causes: Vec::new(),
            legend: Vec::new(),
            joined_for: Some(placeholder),
            session: SessionState::new(),
            map,
            viewport,
            map_area: Rect::default(),
            fitted: false,
            hovered: None,
            focus: None,
            mouse_pos: None,
            last_mouse: None,
            dragged: false,
            status: None,
            last_error: None,
            pending_request: false,
            should_quit: false,
        };
        app.refresh();
        app
    }

    /// Active year and category
    pub fn filter(&self) -> Filter {
        Filter {
            year: self.years.get(self.year_idx).copied().unwrap_or_default(),
            category: self.categories.get(self.category_idx).cloned(),
        }
    }

    /// Whether the category selector is offered
    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn name_property(&self) -> &str {
        &self.data.boundaries.name_property
    }

    pub fn options(&self) -> &RegionOptions {
        &self.options
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Dropdown is shown whenever the click did not decide the selection
    pub fn dropdown_active(&self) -> bool {
        !matches!(
            self.selection,
            Some(Selection {
                source: SelectionSource::Click,
                ..
            })
        )
    }

    pub fn selected_display(&self) -> Option<&DisplayName> {
        self.selection.as_ref().and_then(|s| self.options.display(&s.key))
    }

    pub fn summary(&self) -> Option<&RiskRecord> {
        self.summary
    }

    pub fn causes(&self) -> &[CauseCount] {
        &self.causes
    }

    pub fn legend(&self) -> &[(u8, String)] {
        &self.legend
    }

    /// Recompute everything derived from filters and selection.
    /// The map is re-joined only when the year or category changed.
    fn refresh(&mut self) {
        let data = self.data;
        let filter = self.filter();
        let filtered = filter_risk(&data.risk, &filter);

        if self.joined_for.as_ref() != Some(&filter) {
            let enriched = enrich(&data.boundaries, filtered.iter().copied());
            info!(
                year = filter.year,
                category = ?filter.category,
                matched = enriched.matched,
                features = enriched.collection.features.len(),
                "map re-joined"
            );
            self.map.rebuild(&enriched);
            self.hovered = None;
            self.focus = None;
            self.joined_for = Some(filter.clone());
        }

        let mut legend: Vec<(u8, String)> = Vec::new();
        for record in &filtered {
            if !legend.iter().any(|(c, _)| *c == record.cluster) {
                legend.push((record.cluster, record.risk_label.clone()));
            }
        }
        legend.sort_by_key(|(c, _)| *c);
        self.legend = legend;

        self.options = RegionOptions::from_records(filtered.iter().copied());
        let clicked = self
            .click
            .as_ref()
            .and_then(|c| c.display_name(self.name_property()));
        self.selection = resolve(clicked.as_deref(), &self.options, self.dropdown_position());

        match &self.selection {
            Some(selection) => {
                self.dropdown = Some(selection.key.clone());
                self.summary = region_summary(&filtered, &selection.key);
                self.causes = top_causes(&data.detail, &filter, &selection.key);
            }
            None => {
                self.summary = None;
                self.causes.clear();
            }
        }

        let signature = FilterSignature {
            filter,
            selected: self.selection.as_ref().map(|s| s.key.clone()),
        };
        if self.session.observe(signature) {
            self.last_error = None;
        }
        debug!(
            selected = ?self.selection.as_ref().map(|s| s.key.as_str()),
            causes = self.causes.len(),
            "render pass"
        );
    }

    pub fn next_year(&mut self) {
        if !self.years.is_empty() {
            self.year_idx = (self.year_idx + 1) % self.years.len();
            self.refresh();
        }
    }

    pub fn prev_year(&mut self) {
        if !self.years.is_empty() {
            self.year_idx = (self.year_idx + self.years.len() - 1) % self.years.len();
            self.refresh();
        }
    }

    pub fn next_category(&mut self) {
        if !self.categories.is_empty() {
            self.category_idx = (self.category_idx + 1) % self.categories.len();
            self.refresh();
        }
    }

    pub fn prev_category(&mut self) {
        if !self.categories.is_empty() {
            self.category_idx = (self.category_idx + self.categories.len() - 1) % self.categories.len();
            self.refresh();
        }
    }

    /// Dropdown choice as an index into the current options; the first
    /// entry when the chosen region is not offered under this filter
    fn dropdown_position(&self) -> usize {
        self.dropdown
            .as_ref()
            .and_then(|key| self.options.position(key))
            .unwrap_or(0)
    }

    fn move_dropdown(&mut self, position: usize) {
        self.click = None;
        self.dropdown = self.options.get(position).map(|(key, _)| key.clone());
        self.refresh();
    }

    /// Move the dropdown; this hands the selection back to the dropdown
    pub fn dropdown_next(&mut self) {
        let next = (self.dropdown_position() + 1).min(self.options.len().saturating_sub(1));
        self.move_dropdown(next);
    }

    pub fn dropdown_prev(&mut self) {
        let prev = self.dropdown_position().saturating_sub(1);
        self.move_dropdown(prev);
    }

    pub fn clear_click(&mut self) {
        self.click = None;
        self.focus = None;
        self.refresh();
    }

    /// Focus the next map region from the keyboard
    pub fn focus_next(&mut self) {
        let count = self.map.regions().len();
        if count > 0 {
            let next = self.focus.map_or(0, |i| (i + 1) % count);
            self.focus_region(next);
        }
    }

    pub fn focus_prev(&mut self) {
        let count = self.map.regions().len();
        if count > 0 {
            let prev = self.focus.map_or(count - 1, |i| (i + count - 1) % count);
            self.focus_region(prev);
        }
    }

    fn focus_region(&mut self, idx: usize) {
        self.focus = Some(idx);
        self.click = Some(MapClick::Focused(self.map.regions()[idx].display.clone()));
        self.refresh();
    }

    pub fn focused(&self) -> Option<usize> {
        self.focus
    }

    /// Set the map rectangle from the layout; fits the view on first use
    pub fn set_map_area(&mut self, area: Rect) {
        if area == self.map_area {
            return;
        }
        self.map_area = area;
        self.viewport.width = area.width as usize * 2;
        self.viewport.height = area.height as usize * 4;
        if !self.fitted && area.width > 0 && area.height > 0 {
            self.reset_view();
        }
    }

    /// Fit the view to the boundary extent
    pub fn reset_view(&mut self) {
        if let Some(bounds) = self.map.bounds() {
            self.viewport = Viewport::fit(bounds, self.viewport.width, self.viewport.height);
            self.fitted = true;
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Terminal cell to braille pixel inside the map, if the cell is on it
    fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        Some(((col - area.x) as i32 * 2, (row - area.y) as i32 * 4))
    }

    /// Region under a terminal cell (sampled at the cell center)
    pub fn region_at(&self, col: u16, row: u16) -> Option<usize> {
        let (px, py) = self.cell_to_pixel(col, row)?;
        let (lon, lat) = self.viewport.unproject_f(px as f64 + 1.0, py as f64 + 2.0);
        self.map.hit_test(lon, lat)
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Track the cursor for the tooltip
    pub fn mouse_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.hovered = self.region_at(col, row);
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan by the drag delta
    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
        self.mouse_pos = Some((col, row));
    }

    /// A release without movement is a click
    pub fn mouse_up(&mut self, col: u16, row: u16) {
        let was_press = self.last_mouse.take().is_some();
        if was_press && !self.dragged {
            self.click_at(col, row);
        }
        self.dragged = false;
    }

    /// Select the region under a cell; a background click clears the click
    pub fn click_at(&mut self, col: u16, row: u16) {
        if self.cell_to_pixel(col, row).is_none() {
            return;
        }
        self.focus = None;
        self.click = Some(match self.region_at(col, row) {
            Some(idx) => MapClick::Feature(self.map.regions()[idx].properties.clone()),
            None => MapClick::Background,
        });
        self.refresh();
    }

    pub fn can_request(&self) -> bool {
        advisor::can_request(&self.session, &self.causes)
    }

    /// Ask for a recommendation; the call runs after the next draw so the
    /// in-progress state is visible while it blocks
    pub fn request_recommendation(&mut self) {
        if self.causes.is_empty() {
            self.status = Some("Pick a region that has cause-of-death data.".into());
        } else if self.session.is_visible() {
            self.status = Some("Recommendation already shown for this selection.".into());
        } else {
            self.pending_request = true;
            self.status = Some("Generating recommendation...".into());
        }
    }

    /// Run a pending request against the generator
    pub fn run_request(&mut self, generator: &dyn TextGenerator) {
        if !self.pending_request {
            return;
        }
        self.pending_request = false;

        let region = self
            .selected_display()
            .map(|d| d.as_str().to_string())
            .unwrap_or_default();
        let risk_label = self.summary.map_or(NO_DATA_LABEL, |r| r.risk_label.as_str());
        let subject = Subject {
            region: &region,
            risk_label,
            causes: &self.causes,
        };

        match advisor::request(&mut self.session, generator, &subject) {
            Outcome::Generated => {
                self.last_error = None;
                self.status = Some("Recommendation ready.".into());
            }
            Outcome::AlreadyVisible => {
                self.status = None;
            }
            Outcome::NoData => {
                self.status = Some("Pick a region that has cause-of-death data.".into());
            }
            Outcome::Failed(e) => {
                let message = format!("Failed to generate recommendation: {e}");
                self.status = Some(message.clone());
                self.last_error = Some(message);
            }
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::GenerationError;
    use crate::data::{DetailRecord, Table};
    use crate::join::tests::{boundaries, risk};
    use crate::region::normalize;
    use crate::session::Recommendation;
    use std::cell::Cell;

    struct CountingGenerator {
        calls: Cell<usize>,
        fail: bool,
    }

    impl TextGenerator for CountingGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(GenerationError::Empty)
            } else {
                Ok("## Strategic Response Steps\n- act".into())
            }
        }
    }

    fn generator(fail: bool) -> CountingGenerator {
        CountingGenerator {
            calls: Cell::new(0),
            fail,
        }
    }

    fn detail(name: &str, year: i32, cause: &str, count: f64) -> DetailRecord {
        DetailRecord {
            region_name: name.into(),
            year,
            death_category: None,
            cause: cause.into(),
            death_count: Some(count),
        }
    }

    fn context() -> DataContext {
        let mut later = risk("Garut", 4, "High", 200.0);
        later.year = 2024;
        DataContext {
            risk: Table {
                records: vec![
                    risk("Kab. Bandung", 2, "Medium", 120.0),
                    risk("Kota Bandung", 3, "High", 310.0),
                    risk("Garut", 1, "Low", 40.0),
                    later,
                ],
                has_category: false,
            },
            detail: Table {
                records: vec![
                    detail("Kabupaten Bandung", 2023, "Stroke", 30.0),
                    detail("Kab. Bandung", 2023, "Diabetes", 12.0),
                    detail("Garut", 2024, "Stroke", 9.0),
                ],
                has_category: false,
            },
            boundaries: boundaries(),
        }
    }

    fn app(data: &DataContext) -> App<'_> {
        let mut app = App::new(data);
        app.set_map_area(Rect::new(0, 0, 60, 20));
        app
    }

    #[test]
    fn test_initial_selection_falls_back_to_dropdown() {
        let data = context();
        let app = app(&data);
        assert_eq!(app.filter().year, 2023);
        assert!(!app.has_categories());
        assert!(app.dropdown_active());
        // CITY BANDUNG sorts first
        assert_eq!(app.selected_display().unwrap().as_str(), "CITY BANDUNG");
        assert_eq!(app.summary().unwrap().total_deaths, 310.0);
        assert!(app.causes().is_empty());
    }

    #[test]
    fn test_dropdown_moves_selection() {
        let data = context();
        let mut app = app(&data);
        app.dropdown_next();
        assert_eq!(app.selection().unwrap().key, normalize("Bandung"));
        let causes: Vec<&str> = app.causes().iter().map(|c| c.cause.as_str()).collect();
        assert_eq!(causes, vec!["Stroke", "Diabetes"]);
        app.dropdown_next();
        app.dropdown_next();
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
    }

    #[test]
    fn test_click_selects_region_under_cursor() {
        let data = context();
        let mut app = app(&data);
        let garut = app.map.regions().iter().position(|r| r.key == normalize("Garut")).unwrap();
        let (lon, lat) = (108.6, -7.3);
        let (px, py) = app.viewport.project(lon, lat);
        let (col, row) = ((px / 2) as u16, (py / 4) as u16);
        assert_eq!(app.region_at(col, row), Some(garut));

        app.mouse_down(col, row);
        app.mouse_up(col, row);
        assert!(!app.dropdown_active());
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));

        app.clear_click();
        assert!(app.dropdown_active());
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
    }

    #[test]
    fn test_drag_does_not_click() {
        let data = context();
        let mut app = app(&data);
        let before = app.viewport.center_lon;
        app.mouse_down(30, 10);
        app.mouse_drag(25, 10);
        app.mouse_up(25, 10);
        assert!(app.viewport.center_lon > before);
        assert!(app.dropdown_active());
    }

    #[test]
    fn test_focus_cycles_regions() {
        let data = context();
        let mut app = app(&data);
        app.focus_next();
        assert_eq!(app.focused(), Some(0));
        assert_eq!(app.selection().unwrap().key, normalize("Bandung"));
        app.focus_prev();
        assert_eq!(app.focused(), Some(2));
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
        assert!(!app.dropdown_active());
        assert_eq!(app.selected_display().unwrap().as_str(), "REGENCY GARUT");
    }

    #[test]
    fn test_year_change_rejoins_map() {
        let data = context();
        let mut app = app(&data);
        assert!(app.map.regions().iter().all(|r| r.key != normalize("Garut") || r.risk.cluster == Some(1)));
        app.next_year();
        assert_eq!(app.filter().year, 2024);
        let garut = app.map.regions().iter().find(|r| r.key == normalize("Garut")).unwrap();
        assert_eq!(garut.risk.cluster, Some(4));
        let bandung = app.map.regions().iter().find(|r| r.key == normalize("Bandung")).unwrap();
        assert_eq!(bandung.risk.cluster, None);
        assert_eq!(app.legend(), &[(4, "High".to_string())]);
    }

    #[test]
    fn test_dropdown_choice_survives_year_change() {
        let mut data = context();
        let mut bandung = risk("Kab. Bandung", 2, "Medium", 90.0);
        bandung.year = 2024;
        data.risk.records.push(bandung);
        let mut app = app(&data);

        // 2023 offers CITY BANDUNG first; 2024 drops it, shifting positions
        app.dropdown_next();
        assert_eq!(app.selection().unwrap().key, normalize("Bandung"));
        app.next_year();
        assert_eq!(app.selection().unwrap().key, normalize("Bandung"));
        assert_eq!(app.selection().unwrap().position, 0);
        assert_eq!(app.summary().unwrap().total_deaths, 90.0);

        app.dropdown_next();
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
        app.prev_year();
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
    }

    #[test]
    fn test_dropdown_resets_when_region_leaves_options() {
        let data = context();
        let mut app = app(&data);
        app.dropdown_next();
        assert_eq!(app.selection().unwrap().key, normalize("Bandung"));
        // 2024 only has Garut
        app.next_year();
        assert_eq!(app.selection().unwrap().key, normalize("Garut"));
        assert_eq!(app.selection().unwrap().position, 0);
    }

    #[test]
    fn test_recommendation_is_one_shot_per_signature() {
        let data = context();
        let mut app = app(&data);
        app.dropdown_next();
        let gen = generator(false);

        app.request_recommendation();
        assert!(app.pending_request);
        app.run_request(&gen);
        assert_eq!(gen.calls.get(), 1);
        assert!(matches!(app.session.recommendation(), Recommendation::Visible(_)));
        assert!(!app.can_request());

        app.request_recommendation();
        app.run_request(&gen);
        assert_eq!(gen.calls.get(), 1);

        app.next_year();
        assert_eq!(app.session.recommendation(), &Recommendation::Hidden);
    }

    #[test]
    fn test_failed_request_reports_and_keeps_state() {
        let data = context();
        let mut app = app(&data);
        app.dropdown_next();
        let gen = generator(true);

        app.request_recommendation();
        app.run_request(&gen);
        assert_eq!(gen.calls.get(), 1);
        assert!(app.last_error.is_some());
        assert!(app.can_request());

        app.dropdown_next();
        assert!(app.last_error.is_none());
    }

    #[test]
    fn test_request_without_causes_is_not_sent() {
        let data = context();
        let mut app = app(&data);
        app.request_recommendation();
        assert!(!app.pending_request);
        assert!(app.status.is_some());
    }
}
