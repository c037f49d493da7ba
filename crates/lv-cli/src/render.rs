//! Plain-text rendering of a view snapshot.

use std::fmt::Write;

use lv_runtime::ViewSnapshot;

const PREVIEW_CHARS: usize = 60;

pub fn view_text(view: &ViewSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== revision {} ==", view.revision);

    let _ = writeln!(out, "transactions ({})", view.transactions.len());
    for tx in &view.transactions {
        let _ = writeln!(
            out,
            "  {:<38} {:<10} {:>12.2} {:<10} user={}",
            tx.id, tx.status, tx.amount, tx.tx_type, tx.user_id
        );
    }

    let _ = writeln!(out, "summaries ({})", view.summaries.len());
    for s in &view.summaries {
        let detail = match (&s.result, &s.error) {
            (Some(result), _) => truncate(result, PREVIEW_CHARS),
            (None, Some(error)) => format!("error: {}", truncate(error, PREVIEW_CHARS)),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<38} {:<10} {:<10} {}",
            s.id, s.status, s.source, detail
        );
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == text.len() {
        return line.to_string();
    }
    let cut: String = line.chars().take(max).collect();
    format!("{cut}...")
}
