use crate::models::AggregatedRecord;
use std::fmt::Write;
use std::time::Instant;
use tracing::info;

/// Logs start and elapsed wall-clock time of a command.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        info!("Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("Finished: {} (took {:.2?})", self.label, self.start.elapsed());
    }
}

/// Format a count with thousands separators.
pub fn fmt_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Aligned `nationality  age  count` table, largest groups first.
pub fn render_records(records: &[AggregatedRecord]) -> String {
    let mut sorted: Vec<&AggregatedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.cmp(b)));

    let nat_w = sorted.iter().map(|r| r.nationality.len()).max().unwrap_or(0).max(11);
    let age_w = sorted.iter().map(|r| r.age_bracket.len()).max().unwrap_or(0).max(3);

    let mut out = String::new();
    let _ = writeln!(out, "{:<nat_w$}  {:<age_w$}  {:>9}", "nationality", "age", "count");
    for r in sorted {
        let _ = writeln!(
            out,
            "{:<nat_w$}  {:<age_w$}  {:>9}",
            r.nationality,
            r.age_bracket,
            fmt_number(r.count)
        );
    }
    out
}
