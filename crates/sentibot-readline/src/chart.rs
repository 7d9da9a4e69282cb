//! Text line chart for score series.

const AXIS_LABEL_WIDTH: usize = 4;

/// Draws `scores` on a fixed `[-1, 1]` axis, one column per score.
///
/// Returns one string per row, top row first. The zero baseline is drawn
/// across the whole width. Fewer than three rows cannot show the baseline, so
/// `height` is raised to 3 when smaller.
pub fn render_line_chart(scores: &[f64], height: usize) -> Vec<String> {
    if scores.is_empty() {
        return Vec::new();
    }

    let height = height.max(3);
    let zero_row = row_for(0.0, height);
    let point_rows: Vec<usize> = scores.iter().map(|&s| row_for(s, height)).collect();

    (0..height)
        .map(|row| {
            let label = if row == 0 {
                "1.0"
            } else if row == zero_row {
                "0.0"
            } else if row == height - 1 {
                "-1.0"
            } else {
                ""
            };
            let axis = if label.is_empty() { '│' } else { '┤' };

            let mut line = format!("{:>width$} {}", label, axis, width = AXIS_LABEL_WIDTH);
            for &point_row in &point_rows {
                let filler = if row == zero_row { '─' } else { ' ' };
                line.push(if point_row == row { '●' } else { filler });
                line.push(filler);
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn row_for(score: f64, height: usize) -> usize {
    let clamped = if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 };
    ((1.0 - clamped) / 2.0 * (height - 1) as f64).round() as usize
}
