//! Table output for the listing commands.

use std::io::{self, Write};

use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::PostRecord;
use crate::post::Section;

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

const MAX_TITLE_WIDTH: usize = 60;

pub fn print_drafts(drafts: &[PostRecord]) {
    print_drafts_to(drafts, &mut io::stdout().lock());
}

/// Print drafts as an `id  updated  title` table.
pub fn print_drafts_to<W: Write>(drafts: &[PostRecord], writer: &mut W) {
    if drafts.is_empty() {
        let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), "No drafts found".green());
        return;
    }

    let rows: Vec<[String; 3]> = drafts
        .iter()
        .map(|draft| {
            [
                draft.id.to_string(),
                draft
                    .draft_updated_at
                    .as_deref()
                    .map(short_date)
                    .unwrap_or("-")
                    .to_string(),
                fit_width(draft.display_title(), MAX_TITLE_WIDTH),
            ]
        })
        .collect();
    print_table(&["ID", "UPDATED", "TITLE"], &rows, writer);

    let _ = writeln!(writer);
    let _ = writeln!(
        writer,
        "{} {}",
        SUCCESS_MARK.green(),
        format!("{} draft{}", drafts.len(), plural(drafts.len())).green()
    );
}

pub fn print_sections(sections: &[Section]) {
    print_sections_to(sections, &mut io::stdout().lock());
}

/// Print sections as an `id  name` table.
pub fn print_sections_to<W: Write>(sections: &[Section], writer: &mut W) {
    if sections.is_empty() {
        let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), "No sections found".green());
        return;
    }

    let rows: Vec<[String; 2]> = sections
        .iter()
        .map(|section| [section.id.to_string(), section.name.clone()])
        .collect();
    print_table(&["ID", "NAME"], &rows, writer);
}

fn print_table<W: Write, const N: usize>(headers: &[&str; N], rows: &[[String; N]], writer: &mut W) {
    let mut widths = headers.map(UnicodeWidthStr::width);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let header = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| pad(h, w))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(writer, "{}", header.trim_end().bold());

    for row in rows {
        let line = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = pad(cell, w);
                if i == 0 { padded.cyan().to_string() } else { padded }
            })
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(writer, "{}", line.trim_end());
    }
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{}{}", text, " ".repeat(fill))
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
fn fit_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// `2024-05-01T10:00:00.000Z` -> `2024-05-01`.
fn short_date(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
