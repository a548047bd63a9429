use crate::types::OptimizationPlan;

const MAX_WIDTH: f64 = 96.0;
const HEIGHT: usize = 4;

/// Cross-section of the roll: `#` trim, boxed strips labelled with their
/// width, `.` waste.
///
/// Every strip spans the full height, so the picture is one row of column
/// contents plus the set of columns where a blade (or the roll edge) sits.
pub fn render_plan(plan: &OptimizationPlan) -> String {
    let roll_width = plan.selected_roll.width;
    if roll_width <= 0.0 {
        return String::new();
    }
    let scale = MAX_WIDTH / roll_width;
    let col = |mm: f64| (mm * scale).round() as usize;
    let grid_w = col(roll_width);

    let trim = roll_width - plan.usable_width;
    let left_trim_end = col(trim / 2.0);
    let right_trim_start = col(roll_width - trim / 2.0);
    let waste_start = plan
        .strips
        .last()
        .map(|s| col(s.end))
        .unwrap_or(left_trim_end);

    let mut body: Vec<char> = (0..=grid_w)
        .map(|x| {
            if x < left_trim_end || x >= right_trim_start {
                '#'
            } else if x >= waste_start {
                '.'
            } else {
                ' '
            }
        })
        .collect();
    let mut edges = vec![false; grid_w + 1];
    edges[0] = true;
    edges[grid_w] = true;

    let mut label_row = Vec::new();
    for strip in &plan.strips {
        let sx = col(strip.start).min(grid_w);
        let ex = col(strip.end).min(grid_w);
        if ex <= sx {
            continue;
        }
        edges[sx] = true;
        edges[ex] = true;
        body[sx..ex].fill(' ');

        let label: Vec<char> = strip.width().to_string().chars().collect();
        let span = ex - sx;
        if span > label.len() {
            let first = sx + (span - label.len()) / 2 + 1;
            label_row.extend(
                label
                    .into_iter()
                    .enumerate()
                    .map(|(i, ch)| (first + i, ch))
                    .filter(|&(x, _)| x < ex),
            );
        }
    }

    let line = |row: usize| -> String {
        let border = row == 0 || row == HEIGHT;
        let mut chars: Vec<char> = (0..=grid_w)
            .map(|x| match (border, edges[x]) {
                (true, true) => '+',
                (true, false) => '-',
                (false, true) => '|',
                (false, false) => body[x],
            })
            .collect();
        if row == HEIGHT / 2 {
            for &(x, ch) in &label_row {
                chars[x] = ch;
            }
        }
        chars.into_iter().collect::<String>().trim_end().to_string()
    };

    let mut result = String::new();
    for row in 0..=HEIGHT {
        result.push_str(&line(row));
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use crate::solver::Planner;
    use crate::types::Constraints;

    fn plan(orders: usize) -> OptimizationPlan {
        let inventory = seed::inventory();
        let orders: Vec<_> = seed::orders().into_iter().take(orders).collect();
        Planner::new(Constraints::default())
            .plan(&inventory[0], &orders)
            .unwrap()
    }

    #[test]
    fn test_render_labels_strips() {
        let output = render_plan(&plan(4));
        assert!(output.contains('+'));
        assert!(output.contains('|'));
        assert!(output.contains("310"));
        assert!(output.contains("150"));
        assert_eq!(output.lines().count(), HEIGHT + 1);
    }

    #[test]
    fn test_render_shows_trim_and_waste() {
        let output = render_plan(&plan(4));
        let middle = output.lines().nth(HEIGHT / 2).unwrap();
        assert!(middle.contains("...."));
        assert!(middle.ends_with("#|"));
    }

    #[test]
    fn test_render_single_strip() {
        let output = render_plan(&plan(1));
        assert!(output.contains("220"));
        let top = output.lines().next().unwrap();
        assert!(top.starts_with('+'));
        assert!(top.ends_with('+'));
        // roll edges plus both blades of the strip
        assert_eq!(top.matches('+').count(), 4);
    }
}
