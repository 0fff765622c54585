use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

use urban_density::{Category, ClassifiedZip, Summary, STANDARD_RULES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    ZipTable,
    Summary,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::ZipTable => Page::Summary,
            Page::Summary => Page::ZipTable,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::ZipTable => "Zip Codes",
            Page::Summary => "Summary",
        }
    }
}

/// Map colours from the choropleth legend, approximated for the terminal
fn category_color(category: Category) -> Color {
    match category {
        Category::Urban => Color::Rgb(0xd7, 0x30, 0x1f),
        Category::SuburbanEarly => Color::Rgb(0xfc, 0x8d, 0x59),
        Category::SuburbanLate => Color::Rgb(0xfd, 0xcc, 0x8a),
        Category::Exurban => Color::Rgb(0xfe, 0xf0, 0xd9),
    }
}

pub struct App {
    pub records: Vec<ClassifiedZip>,
    pub filtered: Vec<usize>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: Option<Category>,
    pub summary: Summary,
}

impl App {
    pub fn new(records: Vec<ClassifiedZip>) -> Self {
        let mut state = TableState::default();
        if !records.is_empty() {
            state.select(Some(0));
        }

        let summary = Summary::from_records(&records);
        let filtered = (0..records.len()).collect();

        Self {
            records,
            filtered,
            state,
            current_page: Page::ZipTable,
            show_detail: false,
            filter: None,
            summary,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected(&self) -> Option<&ClassifiedZip> {
        self.state
            .selected()
            .and_then(|i| self.filtered.get(i))
            .map(|&idx| &self.records[idx])
    }

    pub fn apply_filter(&mut self, filter: Option<Category>) {
        self.filter = filter;
        self.filtered = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.map_or(true, |c| r.category == c))
            .map(|(i, _)| i)
            .collect();

        self.state
            .select(if self.filtered.is_empty() { None } else { Some(0) });
    }

    pub fn next(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.filtered.len() => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.filtered.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| (i + 20).min(self.filtered.len() - 1))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        if !self.filtered.is_empty() {
            self.state.select(Some(i));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab | KeyCode::BackTab => app.current_page = app.current_page.next(),
                KeyCode::Char('c') | KeyCode::Char('0') => app.apply_filter(None),
                KeyCode::Char(c @ '1'..='4') => {
                    let index = c as usize - '1' as usize;
                    app.apply_filter(Some(Category::ALL[index]));
                    app.current_page = Page::ZipTable;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),
                KeyCode::Home => {
                    if !app.filtered.is_empty() {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !app.filtered.is_empty() {
                        app.state.select(Some(app.filtered.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::ZipTable if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(chunks[1]);

            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::ZipTable => render_table(f, chunks[1], app),
        Page::Summary => render_summary(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::ZipTable, Page::Summary].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(page.title(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Total: {}", app.summary.total_records),
        Style::default().fg(Color::White),
    ));

    for stat in &app.summary.by_category {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} {}", stat.category.label(), stat.count),
            Style::default().fg(category_color(stat.category)),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn dash_or<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["GEOID", "Area (m²)", "Population", "Built", "People/km²", "Category"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|&idx| {
        let zip = &app.records[idx];
        let color = category_color(zip.category);

        Row::new(vec![
            Cell::from(zip.id.clone()),
            Cell::from(zip.area_sq_m.to_string()),
            Cell::from(dash_or(zip.population)),
            Cell::from(dash_or(zip.median_year_built)),
            Cell::from(dash_or(zip.density_per_sq_km.map(|d| format!("{:.1}", d)))),
            Cell::from(zip.category.label()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let title = match app.filter {
        Some(category) => format!(" Zip Codes - {} ", category.name()),
        None => " Zip Codes ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan);

    let lines = match app.selected() {
        Some(zip) => {
            let mut lines = vec![
                Line::from(vec![Span::styled("GEOID:      ", label), Span::raw(zip.id.clone())]),
                Line::from(vec![
                    Span::styled("Land area:  ", label),
                    Span::raw(format!("{:.2} km²", zip.area_sq_m as f64 / 1_000_000.0)),
                ]),
                Line::from(vec![Span::styled("Population: ", label), Span::raw(dash_or(zip.population))]),
                Line::from(vec![
                    Span::styled("Median year built: ", label),
                    Span::raw(dash_or(zip.median_year_built)),
                ]),
                Line::from(vec![
                    Span::styled("Density:    ", label),
                    Span::raw(
                        zip.density_per_sq_km
                            .map(|d| format!("{:.1} people/km²", d))
                            .unwrap_or_else(|| "undefined".to_string()),
                    ),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Category:   ", label),
                    Span::styled(
                        zip.category.name(),
                        Style::default()
                            .fg(category_color(zip.category))
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
            ];

            if zip.density_per_sq_km.is_none() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Density undefined: defaulted to EXURBAN",
                    Style::default().fg(Color::Yellow),
                )));
            }
            lines
        }
        None => vec![Line::from("No zip code selected")],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Detail "),
    );

    f.render_widget(panel, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let header = Row::new(["Category", "Zips", "Share", "Population"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray));

    let rows = app.summary.by_category.iter().enumerate().map(|(i, stat)| {
        Row::new(vec![
            Cell::from(format!("[{}] {}", i + 1, stat.category.name()))
                .style(Style::default().fg(category_color(stat.category))),
            Cell::from(stat.count.to_string()),
            Cell::from(format!("{:.1}%", stat.share * 100.0)),
            Cell::from(stat.population.to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Categories "));

    f.render_widget(table, chunks[0]);

    let mut lines = vec![Line::from(Span::styled(
        "Rules (first match wins)",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for rule in STANDARD_RULES.iter() {
        let density = match (rule.density.min, rule.density.max) {
            (Some(min), Some(max)) => format!("{} ≤ density < {}", min, max),
            (Some(min), None) => format!("density ≥ {}", min),
            _ => "any density".to_string(),
        };
        let year = match (rule.year_built.min, rule.year_built.max) {
            (Some(min), Some(max)) => format!(", {} ≤ built < {}", min, max),
            (Some(min), None) => format!(", built ≥ {}", min),
            _ => String::new(),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<16}", rule.category.label()),
                Style::default().fg(category_color(rule.category)),
            ),
            Span::raw(format!("{}{}", density, year)),
        ]));
    }

    lines.push(Line::from(""));
    if let Some(density) = &app.summary.density {
        lines.push(Line::from(format!(
            "Density (people/km²): min {:.1}  median {:.1}  mean {:.1}  max {:.1}",
            density.min, density.median, density.mean, density.max
        )));
    }
    lines.push(Line::from(format!(
        "Undefined density: {}   Missing population: {}   Missing year built: {}",
        app.summary.undefined_density, app.summary.missing_population, app.summary.missing_year_built
    )));

    let stats = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Statistics "));
    f.render_widget(stats, chunks[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.filtered.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(category) = app.filter {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("Filter: {}", category.label()),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw(" ("));
        spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" clear)"));
    }

    for (key, action) in [
        ("1-4", " Filter | "),
        ("Enter", " Details | "),
        ("Tab", " Page | "),
        ("↑/↓", " Nav | "),
        ("PgUp/PgDn", " Fast | "),
    ] {
        if key == "1-4" {
            spans.push(Span::raw(" | "));
        }
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(action));
    }
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
