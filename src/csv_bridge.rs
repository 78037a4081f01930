use std::collections::HashMap;
use std::io::{Read, Write};

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use crate::api::Backend;
use crate::error::Result;
use crate::models::{Account, Category, Transaction, TransactionPayload, TransactionType};

/// The fixed wire format: one header set shared by export, template and
/// import, so an exported file re-imports as-is.
pub const CSV_HEADERS: [&str; 15] = [
    "Descrição",
    "Valor",
    "Data (YYYY-MM-DD)",
    "Tipo (income/expense)",
    "Nome da Conta",
    "Nome da Categoria",
    "Observações",
    "Data de Vencimento (YYYY-MM-DD)",
    "Entidade",
    "Data de Pagamento/Recebimento (YYYY-MM-DD)",
    "Parcelado (TRUE/FALSE)",
    "Número da Parcela",
    "Total de Parcelas",
    "ID Transação Pai",
    "Status",
];

pub fn export_filename() -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("transacoes_exportadas_{stamp}.csv")
}

pub fn template_filename() -> String {
    let stamp = chrono::Local::now().format("%Y%m%d");
    format!("modelo_transacao_{stamp}.csv")
}

/// Serialize the whole row store (never the filtered subset). Amounts are
/// dot-decimal text with the currency symbol stripped, dates stay ISO,
/// booleans are literal TRUE/FALSE; ids resolve to names ("N/A" when
/// unresolved).
pub fn export<W: Write>(
    rows: &[Transaction],
    accounts: &[Account],
    categories: &[Category],
    out: W,
) -> Result<usize> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(out);
    wtr.write_record(CSV_HEADERS)?;

    for row in rows {
        let conta = row
            .conta_id
            .and_then(|id| accounts.iter().find(|a| a.id == id))
            .map(|a| a.nome.as_str())
            .unwrap_or("N/A");
        let categoria = row
            .categoria_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.nome.as_str())
            .unwrap_or("N/A");
        let valor: f64 = row.valor.trim().parse().unwrap_or(0.0);

        wtr.write_record([
            row.descricao.as_str(),
            &format!("{valor:.2}"),
            row.data.as_deref().unwrap_or(""),
            row.tipo.as_str(),
            conta,
            categoria,
            row.observacoes.as_str(),
            row.data_vencimento.as_deref().unwrap_or(""),
            row.entidade.as_str(),
            row.data_pagamento_recebimento.as_deref().unwrap_or(""),
            if row.parcelado { "TRUE" } else { "FALSE" },
            &opt_int(row.numero_parcela),
            &opt_int(row.total_parcelas),
            &opt_int(row.id_transacao_pai),
            row.status.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

/// Header row plus one blank data row, for offline fill-in.
pub fn template<W: Write>(out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(out);
    wtr.write_record(CSV_HEADERS)?;
    wtr.write_record(vec![""; CSV_HEADERS.len()])?;
    wtr.flush()?;
    Ok(())
}

fn opt_int(n: Option<i64>) -> String {
    n.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub resolution_errors: usize,
    pub backend_errors: usize,
    pub errors: Vec<String>,
}

/// Parse an uploaded CSV and create one transaction per resolvable row.
///
/// A structurally malformed file aborts with zero rows processed. Per-row
/// failures (unresolvable account/category name, backend rejection) skip
/// that row and are counted separately; the rest of the batch proceeds in
/// order.
pub fn import<R: Read>(
    input: R,
    accounts: &[Account],
    categories: &[Category],
    backend: &mut dyn Backend,
) -> Result<ImportReport> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(input);
    let headers = rdr.headers()?.clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    // Materialize every record up front so a malformed file fails before any
    // create call is issued.
    let records: Vec<csv::StringRecord> =
        rdr.records().collect::<std::result::Result<_, _>>()?;

    let field = |record: &csv::StringRecord, header: &str| -> String {
        index
            .get(header)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let mut report = ImportReport::default();
    for record in &records {
        let descricao = field(record, "Descrição");
        // Blank template rows carry no data at all; skip them silently.
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let valor_raw = field(record, "Valor");
        let valor = if valor_raw.is_empty() {
            "0".to_string()
        } else {
            valor_raw.replace(',', ".")
        };
        let data = non_empty(field(record, "Data (YYYY-MM-DD)"))
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        let tipo = TransactionType::parse(&field(record, "Tipo (income/expense)"))
            .unwrap_or(TransactionType::Expense);

        let account_name = field(record, "Nome da Conta");
        let Some(account) = accounts.iter().find(|a| a.nome == account_name) else {
            report.resolution_errors += 1;
            report.errors.push(format!(
                "Erro de importação: Conta \"{account_name}\" não encontrada para a transação \"{descricao}\"."
            ));
            continue;
        };
        let category_name = field(record, "Nome da Categoria");
        let Some(category) = categories.iter().find(|c| c.nome == category_name) else {
            report.resolution_errors += 1;
            report.errors.push(format!(
                "Erro de importação: Categoria \"{category_name}\" não encontrada para a transação \"{descricao}\"."
            ));
            continue;
        };

        let payload = TransactionPayload {
            descricao: descricao.clone(),
            valor,
            data: Some(data),
            tipo,
            conta_id: Some(account.id),
            categoria_id: Some(category.id),
            observacoes: field(record, "Observações"),
            data_vencimento: non_empty(field(record, "Data de Vencimento (YYYY-MM-DD)")),
            entidade: field(record, "Entidade"),
            data_pagamento_recebimento: non_empty(field(
                record,
                "Data de Pagamento/Recebimento (YYYY-MM-DD)",
            )),
            parcelado: field(record, "Parcelado (TRUE/FALSE)").eq_ignore_ascii_case("TRUE"),
            numero_parcela: field(record, "Número da Parcela").parse().ok(),
            total_parcelas: field(record, "Total de Parcelas").parse().ok(),
            id_transacao_pai: field(record, "ID Transação Pai").parse().ok(),
            status: field(record, "Status"),
        };

        match backend.create_transaction(&payload) {
            Ok(_) => report.imported += 1,
            Err(e) => {
                report.backend_errors += 1;
                report
                    .errors
                    .push(format!("Falha ao importar \"{descricao}\": {e}"));
            }
        }
    }
    Ok(report)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MemoryBackend;
    use crate::models::RowId;

    fn refs() -> (Vec<Account>, Vec<Category>) {
        let accounts = vec![Account {
            id: 1,
            nome: "Carteira".to_string(),
            tipo: "corrente".to_string(),
        }];
        let categories = vec![Category {
            id: 10,
            nome: "Alimentação".to_string(),
            tipo: "expense".to_string(),
        }];
        (accounts, categories)
    }

    fn row(desc: &str, valor: &str, conta: Option<i64>, cat: Option<i64>) -> Transaction {
        Transaction {
            id: RowId::Persisted(1),
            descricao: desc.to_string(),
            valor: valor.to_string(),
            data: Some("2025-01-15".to_string()),
            tipo: TransactionType::Expense,
            conta_id: conta,
            categoria_id: cat,
            observacoes: "obs".to_string(),
            data_vencimento: Some("2025-02-01".to_string()),
            entidade: "Mercadinho".to_string(),
            data_pagamento_recebimento: None,
            parcelado: true,
            numero_parcela: Some(1),
            total_parcelas: Some(3),
            id_transacao_pai: None,
            status: "pago".to_string(),
            is_new: false,
            is_modified: false,
        }
    }

    #[test]
    fn test_export_resolves_names_and_formats() {
        let (accounts, categories) = refs();
        let rows = vec![row("Mercado", "1234.5", Some(1), Some(10))];
        let mut buf = Vec::new();
        let n = export(&rows, &accounts, &categories, &mut buf).unwrap();
        assert_eq!(n, 1);
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("\"Descrição\",\"Valor\""));
        let data = lines.next().unwrap();
        assert!(data.contains("\"Mercado\""));
        assert!(data.contains("\"1234.50\""));
        assert!(data.contains("\"2025-01-15\""));
        assert!(data.contains("\"Carteira\""));
        assert!(data.contains("\"Alimentação\""));
        assert!(data.contains("\"TRUE\""));
    }

    #[test]
    fn test_export_unresolved_reference_is_na() {
        let (accounts, categories) = refs();
        let rows = vec![row("Orfã", "1", Some(99), None)];
        let mut buf = Vec::new();
        export(&rows, &accounts, &categories, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches("\"N/A\"").count(), 2);
    }

    #[test]
    fn test_template_has_header_and_blank_row() {
        let mut buf = Vec::new();
        template(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"Nome da Conta\""));
        assert_eq!(lines[1], "\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\",\"\"");
    }

    #[test]
    fn test_import_creates_rows_in_order() {
        let (accounts, categories) = refs();
        let csv = "\
\"Descrição\",\"Valor\",\"Data (YYYY-MM-DD)\",\"Tipo (income/expense)\",\"Nome da Conta\",\"Nome da Categoria\",\"Observações\",\"Data de Vencimento (YYYY-MM-DD)\",\"Entidade\",\"Data de Pagamento/Recebimento (YYYY-MM-DD)\",\"Parcelado (TRUE/FALSE)\",\"Número da Parcela\",\"Total de Parcelas\",\"ID Transação Pai\",\"Status\"
\"Mercado\",\"12,50\",\"2025-01-10\",\"expense\",\"Carteira\",\"Alimentação\",\"\",\"\",\"\",\"\",\"true\",\"\",\"\",\"\",\"\"
\"Padaria\",\"3.20\",\"2025-01-11\",\"expense\",\"Carteira\",\"Alimentação\",\"\",\"\",\"\",\"\",\"FALSE\",\"2\",\"5\",\"\",\"pendente\"
";
        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        let report = import(csv.as_bytes(), &accounts, &categories, &mut backend).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.resolution_errors, 0);
        assert_eq!(report.backend_errors, 0);

        assert_eq!(backend.rows[0].1.descricao, "Mercado");
        // Comma amount normalized, TRUE case-insensitive
        assert_eq!(backend.rows[0].1.valor, "12.50");
        assert!(backend.rows[0].1.parcelado);
        assert_eq!(backend.rows[1].1.numero_parcela, Some(2));
        assert_eq!(backend.rows[1].1.status, "pendente");
    }

    #[test]
    fn test_import_skips_unresolvable_rows() {
        let (accounts, categories) = refs();
        let csv = "\
\"Descrição\",\"Valor\",\"Data (YYYY-MM-DD)\",\"Tipo (income/expense)\",\"Nome da Conta\",\"Nome da Categoria\"
\"Boa\",\"1\",\"2025-01-01\",\"expense\",\"Carteira\",\"Alimentação\"
\"Conta ruim\",\"1\",\"2025-01-01\",\"expense\",\"Inexistente\",\"Alimentação\"
\"Categoria ruim\",\"1\",\"2025-01-01\",\"expense\",\"Carteira\",\"Inexistente\"
";
        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        let report = import(csv.as_bytes(), &accounts, &categories, &mut backend).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.resolution_errors, 2);
        assert_eq!(backend.rows.len(), 1);
        assert!(report.errors[0].contains("Conta \"Inexistente\""));
        assert!(report.errors[0].contains("Conta ruim"));
        assert!(report.errors[1].contains("Categoria \"Inexistente\""));
    }

    #[test]
    fn test_import_counts_backend_errors_separately() {
        let (accounts, categories) = refs();
        let csv = "\
\"Descrição\",\"Valor\",\"Data (YYYY-MM-DD)\",\"Tipo (income/expense)\",\"Nome da Conta\",\"Nome da Categoria\"
\"ok\",\"1\",\"2025-01-01\",\"expense\",\"Carteira\",\"Alimentação\"
\"rejeitada\",\"1\",\"2025-01-01\",\"expense\",\"Carteira\",\"Alimentação\"
";
        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        backend.fail_create_containing = Some("rejeitada".to_string());
        let report = import(csv.as_bytes(), &accounts, &categories, &mut backend).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.resolution_errors, 0);
        assert_eq!(report.backend_errors, 1);
    }

    #[test]
    fn test_malformed_csv_aborts_with_zero_rows() {
        let (accounts, categories) = refs();
        // Unclosed quote makes the file structurally invalid.
        let csv = "\
\"Descrição\",\"Valor\",\"Data (YYYY-MM-DD)\",\"Tipo (income/expense)\",\"Nome da Conta\",\"Nome da Categoria\"
\"ok\",\"1\",\"2025-01-01\",\"expense\",\"Carteira\",\"Alimentação\"
\"broken,\"1\"x,\"2025-01-01\",\"expense\",\"Carteira\",\"Alimentação\"
";
        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        let result = import(csv.as_bytes(), &accounts, &categories, &mut backend);
        assert!(result.is_err());
        assert!(backend.rows.is_empty());
    }

    #[test]
    fn test_round_trip_reproduces_rows() {
        let (accounts, categories) = refs();
        let rows = vec![
            row("Mercado", "120.00", Some(1), Some(10)),
            row("Sem conta", "5.00", None, Some(10)),
        ];
        let mut buf = Vec::new();
        export(&rows, &accounts, &categories, &mut buf).unwrap();

        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        let report = import(buf.as_slice(), &accounts, &categories, &mut backend).unwrap();

        // The resolvable row comes back equivalent; the "N/A" row is counted,
        // not silently dropped.
        assert_eq!(report.imported, 1);
        assert_eq!(report.resolution_errors, 1);
        let back = &backend.rows[0].1;
        assert_eq!(*back, rows[0].payload());
    }

    #[test]
    fn test_template_rows_are_skipped_silently() {
        let (accounts, categories) = refs();
        let mut buf = Vec::new();
        template(&mut buf).unwrap();
        let mut backend = MemoryBackend::new(accounts.clone(), categories.clone());
        let report = import(buf.as_slice(), &accounts, &categories, &mut backend).unwrap();
        assert_eq!(report, ImportReport::default());
    }
}
