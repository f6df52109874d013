use std::io::{self, Stdout, Write};

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use itertools::{Itertools, MinMaxResult};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Style, Stylize},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType, Widget},
    Terminal,
};

use crate::record::FaultLog;

const TIME_TITLE: &str = "Time in nsec";
const ADDRESS_TITLE: &str = "Virtual Address";

/// Scatter plot of fault addresses over time.
#[derive(Debug)]
pub(crate) struct ScatterPlot {
    title: String,
    points: Vec<(f64, f64)>,
    time_bounds: (u64, u64),
    address_bounds: (u64, u64),
}

fn bounds(values: impl Iterator<Item = u64>) -> Option<(u64, u64)> {
    match values.minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(value) => Some((value.saturating_sub(1), value.saturating_add(1))),
        MinMaxResult::MinMax(min, max) if min == max => Some((min.saturating_sub(1), max.saturating_add(1))),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

impl ScatterPlot {
    pub(crate) fn new(log: &FaultLog) -> Option<Self> {
        let time_bounds = bounds(log.timestamps())?;
        let address_bounds = bounds(log.addresses())?;
        let points = log
            .records()
            .iter()
            .map(|r| (r.timestamp as f64, r.address as f64))
            .collect();
        Some(ScatterPlot {
            title: format!("Page Fault Plot For Process {}", log.process_id()),
            points,
            time_bounds,
            address_bounds,
        })
    }

    fn chart(&self) -> Chart<'_> {
        let dataset = Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().cyan())
            .data(&self.points);
        let (time_min, time_max) = self.time_bounds;
        let (address_min, address_max) = self.address_bounds;
        Chart::new(vec![dataset])
            .block(Block::bordered().title(self.title.as_str()))
            .x_axis(
                Axis::default()
                    .title(TIME_TITLE)
                    .bounds([time_min as f64, time_max as f64])
                    .labels(vec![Span::raw(time_min.to_string()), Span::raw(time_max.to_string())]),
            )
            .y_axis(
                Axis::default()
                    .title(ADDRESS_TITLE)
                    .bounds([address_min as f64, address_max as f64])
                    .labels(vec![
                        Span::raw(format!("{:#x}", address_min)),
                        Span::raw(format!("{:#x}", address_max)),
                    ]),
            )
    }

    /// Renders the chart into plain text of the given size, styles are dropped.
    pub(crate) fn render_text(&self, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        self.chart().render(area, &mut buffer);
        buffer
            .content
            .chunks(area.width.max(1) as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>().trim_end().to_string())
            .join("\n")
    }

    /// Shows the chart on the alternate screen until any key is pressed.
    pub(crate) fn show(&self) -> Result<()> {
        enable_raw_mode()?;
        // terminal is restored on every return path from here on
        let mut restore = Restore { out: io::stdout() };
        execute!(restore.out, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        self.draw_until_key(&mut terminal)
    }

    fn draw_until_key(&self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| frame.render_widget(self.chart(), frame.area()))?;
            // resize and other events only trigger a redraw
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(());
                }
            }
        }
    }
}

// Restore leaves raw mode and the alternate screen when dropped.
struct Restore<W: Write> {
    out: W,
}

impl<W: Write> Drop for Restore<W> {
    fn drop(&mut self) {
        _ = disable_raw_mode();
        _ = execute!(self.out, LeaveAlternateScreen, Show);
    }
}
