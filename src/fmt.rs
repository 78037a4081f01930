use crate::columns::{ColumnDescriptor, ColumnType};
use crate::models::Transaction;

/// Format a numeric string as a pt-BR currency amount: R$ 1.234,56.
/// Unparseable input renders as zero; the cell editor keeps stored values
/// parseable, so this only happens for data arriving from outside the grid.
pub fn money(raw: &str) -> String {
    let val: f64 = raw.trim().parse().unwrap_or(0.0);
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}

/// ISO date (YYYY-MM-DD) to the localized short form DD/MM/YYYY.
/// Anything unparseable passes through unchanged.
pub fn short_date(iso: &str) -> String {
    match chrono::NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d") {
        Ok(d) => d.format("%d/%m/%Y").to_string(),
        Err(_) => iso.to_string(),
    }
}

const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Localized "month year" label used by the month filter, e.g. "janeiro de 2025".
pub fn month_label(iso: &str) -> Option<String> {
    let d = chrono::NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d").ok()?;
    let month = MONTH_NAMES[chrono::Datelike::month0(&d) as usize];
    Some(format!("{} de {}", month, chrono::Datelike::year(&d)))
}

pub fn bool_label(v: bool) -> &'static str {
    if v {
        "Sim"
    } else {
        "Não"
    }
}

fn opt_date(d: &Option<String>) -> String {
    d.as_deref().map(short_date).unwrap_or_default()
}

fn opt_int(n: &Option<i64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_default()
}

/// Displayed value of one cell, as rendered read-only in the grid. The filter
/// engine matches against exactly these strings, so display and filtering can
/// never disagree.
pub fn display_value(row: &Transaction, col: &ColumnDescriptor) -> String {
    match col.id {
        "descricao" => row.descricao.clone(),
        "valor" => money(&row.valor),
        "data" => opt_date(&row.data),
        "tipo" => row.tipo.label().to_string(),
        "conta_id" => select_label(col, &row.conta_id),
        "categoria_id" => select_label(col, &row.categoria_id),
        "observacoes" => row.observacoes.clone(),
        "data_vencimento" => opt_date(&row.data_vencimento),
        "entidade" => row.entidade.clone(),
        "data_pagamento_recebimento" => opt_date(&row.data_pagamento_recebimento),
        "parcelado" => bool_label(row.parcelado).to_string(),
        "numero_parcela" => opt_int(&row.numero_parcela),
        "total_parcelas" => opt_int(&row.total_parcelas),
        "id_transacao_pai" => opt_int(&row.id_transacao_pai),
        "status" => row.status.clone(),
        _ => String::new(),
    }
}

fn select_label(col: &ColumnDescriptor, id: &Option<i64>) -> String {
    debug_assert_eq!(col.kind, ColumnType::Select);
    id.and_then(|v| col.option_label(&v.to_string()))
        .unwrap_or("N/A")
        .to_string()
}
