use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use crate::fmt::money;
use crate::grid::Severity;
use crate::models::TransactionType;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const SELECTED_CELL_STYLE: Style = Style::new()
    .bg(Color::Rgb(60, 60, 90))
    .add_modifier(Modifier::BOLD);

/// Format an amount as a colored Span: green for income, red for expense.
pub fn money_span(valor: &str, tipo: TransactionType) -> Span<'static> {
    let style = match tipo {
        TransactionType::Income => AMOUNT_POS_STYLE,
        TransactionType::Expense => AMOUNT_NEG_STYLE,
    };
    Span::styled(money(valor), style)
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_span_colors_by_type() {
        let income = money_span("100", TransactionType::Income);
        assert_eq!(income.content, "R$ 100,00");
        assert_eq!(income.style, AMOUNT_POS_STYLE);
        let expense = money_span("100", TransactionType::Expense);
        assert_eq!(expense.style, AMOUNT_NEG_STYLE);
    }

    #[test]
    fn test_wrap_text_counts_lines() {
        let (wrapped, lines) = wrap_text("uma descrição bastante longa para caber", 10);
        assert!(lines > 1);
        assert!(wrapped.lines().all(|l| l.chars().count() <= 10));
        let (_, one) = wrap_text("curta", 40);
        assert_eq!(one, 1);
    }
}
