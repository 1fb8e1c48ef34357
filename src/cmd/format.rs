/*!
format.rs

Human output for `iris` (JSON paths never go through here).

  - StyleOptions::detect()     NO_COLOR / NO_EMOJI / COLUMNS / tty
  - color / emoji              styled fragments
  - box_header                 boxed title + subtitle
  - table                      column table with greedy shrink
  - definition_list            aligned `key  value` lines
  - render_value               picks one of the above from the value's shape

Helpers return strings; printing is left to the command modules.
*/

use serde_json::Value;
use std::borrow::Cow;
use std::io::IsTerminal;

use crate::dispatch::output::{Shape, cell_text, unwrap_envelope};

/// Columns shown when rendering a record list.
const MAX_TABLE_COLUMNS: usize = 8;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }
}

/* ---- Color / Emoji ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "list" => "📜",
        "clock" => "⏱",
        "call" => "📡",
        _ => "",
    }
}

/* ---- Box Header ---- */

pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title_styled = color(Role::Primary, title.as_ref(), style);
    let inner = match subtitle {
        Some(s) => format!(
            "{title_styled}  {}",
            color(Role::Secondary, s.as_ref(), style)
        ),
        None => title_styled,
    };

    let max_inner = style.term_width.clamp(20, 200) - 4;
    let lines = wrap_text(&inner, max_inner);
    let width = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("┌{}┐", "─".repeat(width + 2)));
    for line in lines {
        let pad = width - display_width(&line);
        out.push(format!("│ {line}{} │", " ".repeat(pad)));
    }
    out.push(format!("└{}┘", "─".repeat(width + 2)));
    out.join("\n")
}

/* ---- Table ---- */

#[derive(Debug, Clone)]
pub struct TableOpts {
    /// 0 -> style.term_width
    pub max_width: usize,
    pub truncate: bool,
    pub header_sep: bool,
    pub min_col_width: usize,
}

impl Default for TableOpts {
    fn default() -> Self {
        Self {
            max_width: 0,
            truncate: true,
            header_sep: true,
            min_col_width: 2,
        }
    }
}

pub fn table<H: AsRef<str>>(
    headers: &[H],
    rows: &[Vec<String>],
    opts: TableOpts,
    style: &StyleOptions,
) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let col_count = headers.len();
    let width_limit = if opts.max_width == 0 {
        style.term_width
    } else {
        opts.max_width.min(style.term_width)
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h.as_ref())).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Shrink the widest columns first until the row fits.
    let total: usize = widths.iter().sum::<usize>() + (col_count - 1) * 2;
    if total > width_limit {
        let mut overflow = total - width_limit;
        let mut ordered: Vec<(usize, usize)> = widths.iter().copied().enumerate().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        for (idx, _) in ordered {
            if overflow == 0 {
                break;
            }
            if widths[idx] > opts.min_col_width {
                let shrink = (widths[idx] - opts.min_col_width).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 2);
    let header_cells: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| color(Role::Accent, pad_or_truncate(h.as_ref(), widths[i], opts.truncate), style))
        .collect();
    lines.push(header_cells.join("  "));

    if opts.header_sep {
        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(color(Role::Dim, sep.join("  "), style));
    }

    for row in rows {
        let cells: Vec<String> = (0..col_count)
            .map(|c| {
                let raw = row.get(c).map(String::as_str).unwrap_or("");
                pad_or_truncate(raw, widths[c], opts.truncate)
            })
            .collect();
        lines.push(cells.join("  ").trim_end().to_string());
    }
    lines.join("\n")
}

/// `key  value` lines with keys padded to the longest one.
pub fn definition_list(pairs: &[(String, String)], style: &StyleOptions) -> String {
    let key_width = pairs.iter().map(|(k, _)| display_width(k)).max().unwrap_or(0);
    let value_width = style.term_width.saturating_sub(key_width + 2).max(20);
    pairs
        .iter()
        .map(|(k, v)| {
            let key = color(Role::Accent, pad_or_truncate(k, key_width, false), style);
            let value = truncate_ellipsis(&v.replace('\n', " "), value_width);
            format!("{key}  {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a returned value according to its shape.
pub fn render_value(value: &Value, style: &StyleOptions) -> String {
    let value = unwrap_envelope(value);
    match Shape::of(value) {
        Shape::Empty => color(Role::Dim, "(no content)", style),
        Shape::Scalar => cell_text(value),
        Shape::Record => {
            let pairs: Vec<(String, String)> = value
                .as_object()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), cell_text(v))).collect())
                .unwrap_or_default();
            definition_list(&pairs, style)
        }
        Shape::Records => {
            let records: Vec<&serde_json::Map<String, Value>> =
                value.as_array().into_iter().flatten().filter_map(Value::as_object).collect();
            let mut columns: Vec<&str> = Vec::new();
            for record in &records {
                for key in record.keys() {
                    if columns.len() < MAX_TABLE_COLUMNS && !columns.contains(&key.as_str()) {
                        columns.push(key);
                    }
                }
            }
            let rows: Vec<Vec<String>> = records
                .iter()
                .map(|r| {
                    columns
                        .iter()
                        .map(|c| r.get(*c).map(cell_text).unwrap_or_default())
                        .collect()
                })
                .collect();
            table(&columns, &rows, TableOpts::default(), style)
        }
        Shape::List => value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|v| format!("- {}", cell_text(v)))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
    }
}

fn pad_or_truncate(s: &str, width: usize, truncate: bool) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    if !truncate {
        return s.to_string();
    }
    truncate_ellipsis(&strip_ansi(s), width)
}

/* ---- Text Helpers ---- */

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && display_width(&current) + display_width(word) + 1 > max_width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/* ---- ANSI / Width ---- */

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(ch);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}
