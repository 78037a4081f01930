use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;

use crate::api::Backend;
use crate::cli::open_backend;
use crate::error::{PlanilhaError, Result};
use crate::models::{Account, Category, TransactionPayload, TransactionType};

const MAIN_ACCOUNT: &str = "Conta Corrente";
const MONTHS: u32 = 6;

/// Fixed monthly expenses loaded every month.
struct RecurringTxn {
    day: u32,
    descricao: &'static str,
    entidade: &'static str,
    categoria: &'static str,
    valor: f64,
}

const RECURRING: &[RecurringTxn] = &[
    RecurringTxn { day: 10, descricao: "Aluguel", entidade: "Imobiliária Central", categoria: "Moradia", valor: 1800.00 },
    RecurringTxn { day: 15, descricao: "Internet fibra", entidade: "Operadora Net", categoria: "Contas de Casa", valor: 99.90 },
    RecurringTxn { day: 8, descricao: "Academia", entidade: "Academia Forma", categoria: "Lazer", valor: 89.90 },
    RecurringTxn { day: 12, descricao: "Streaming", entidade: "Streaming Plus", categoria: "Assinaturas", valor: 39.90 },
];

/// Clamp a day to the last valid day of the given year/month.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    let last_day = NaiveDate::from_ymd_opt(year, month + 1, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap())
        .pred_opt()
        .unwrap()
        .day();
    day.min(last_day)
}

fn make_date(year: i32, month: u32, day: u32) -> String {
    let d = clamp_day(year, month, day);
    format!("{year:04}-{month:02}-{d:02}")
}

fn category_id(categories: &[Category], nome: &str) -> Result<i64> {
    categories
        .iter()
        .find(|c| c.nome == nome)
        .map(|c| c.id)
        .ok_or_else(|| PlanilhaError::UnknownCategory(nome.to_string()))
}

fn base_payload(account: &Account) -> TransactionPayload {
    TransactionPayload {
        descricao: String::new(),
        valor: "0.00".to_string(),
        data: None,
        tipo: TransactionType::Expense,
        conta_id: Some(account.id),
        categoria_id: None,
        observacoes: String::new(),
        data_vencimento: None,
        entidade: String::new(),
        data_pagamento_recebimento: None,
        parcelado: false,
        numero_parcela: None,
        total_parcelas: None,
        id_transacao_pai: None,
        status: String::new(),
    }
}

fn insert_demo_data(backend: &mut dyn Backend) -> Result<usize> {
    let account = backend
        .list_accounts()?
        .into_iter()
        .find(|a| a.nome == MAIN_ACCOUNT)
        .ok_or_else(|| PlanilhaError::UnknownAccount(MAIN_ACCOUNT.to_string()))?;
    let categories = backend.list_categories()?;
    let mut rng = rand::thread_rng();
    let mut count = 0usize;

    let today = Local::now().date_naive();
    let mut parcela_pai: Option<i64> = None;

    for i in 0..MONTHS {
        let months_ago = MONTHS - 1 - i;
        let target = today - chrono::Months::new(months_ago);
        let year = target.year();
        let month = target.month();
        let current = months_ago == 0;
        let status = if current { "pendente" } else { "pago" };

        // Salary on the 5th, slightly varied.
        let salario: f64 = 4500.0 + rng.gen_range(-150.0..150.0);
        let mut p = base_payload(&account);
        p.descricao = "Salário".to_string();
        p.valor = format!("{salario:.2}");
        p.data = Some(make_date(year, month, 5));
        p.tipo = TransactionType::Income;
        p.categoria_id = Some(category_id(&categories, "Salário")?);
        p.entidade = "Empresa Exemplo Ltda".to_string();
        p.status = status.to_string();
        if !current {
            p.data_pagamento_recebimento = p.data.clone();
        }
        backend.create_transaction(&p)?;
        count += 1;

        // Fixed monthly expenses.
        for r in RECURRING {
            let mut p = base_payload(&account);
            p.descricao = r.descricao.to_string();
            p.valor = format!("{:.2}", r.valor);
            p.data = Some(make_date(year, month, r.day));
            p.categoria_id = Some(category_id(&categories, r.categoria)?);
            p.entidade = r.entidade.to_string();
            p.data_vencimento = Some(make_date(year, month, r.day));
            p.status = status.to_string();
            if !current {
                p.data_pagamento_recebimento = p.data.clone();
            }
            backend.create_transaction(&p)?;
            count += 1;
        }

        // Groceries twice a month, varying amounts.
        for day in [7u32, 21] {
            let valor: f64 = rng.gen_range(180.0..450.0);
            let mut p = base_payload(&account);
            p.descricao = "Supermercado".to_string();
            p.valor = format!("{valor:.2}");
            p.data = Some(make_date(year, month, day));
            p.categoria_id = Some(category_id(&categories, "Alimentação")?);
            p.entidade = "Mercado Bom Preço".to_string();
            p.status = status.to_string();
            backend.create_transaction(&p)?;
            count += 1;
        }

        // A 3-installment purchase starting in the third month; later
        // installments point at the first one.
        if (2..5).contains(&i) {
            let parcela = i - 1; // 1..=3
            let mut p = base_payload(&account);
            p.descricao = "Notebook (parcelado)".to_string();
            p.valor = "833.33".to_string();
            p.data = Some(make_date(year, month, 18));
            p.categoria_id = Some(category_id(&categories, "Outras Despesas")?);
            p.entidade = "Loja de Eletrônicos".to_string();
            p.parcelado = true;
            p.numero_parcela = Some(parcela as i64);
            p.total_parcelas = Some(3);
            p.id_transacao_pai = parcela_pai;
            p.status = status.to_string();
            let saved = backend.create_transaction(&p)?;
            if parcela_pai.is_none() {
                parcela_pai = saved.id.persisted();
            }
            count += 1;
        }
    }

    Ok(count)
}

pub fn run() -> Result<()> {
    let mut backend = open_backend()?;

    // Idempotency guard
    let exists = backend
        .list_accounts()?
        .iter()
        .any(|a| a.nome == MAIN_ACCOUNT);
    if exists {
        println!("Dados de exemplo já carregados (conta '{MAIN_ACCOUNT}' existe).");
        return Ok(());
    }

    backend.add_account(MAIN_ACCOUNT, "corrente")?;
    backend.add_account("Carteira", "dinheiro")?;
    let count = insert_demo_data(&mut backend)?;

    println!("Dados de exemplo carregados!");
    println!("  Contas:     2");
    println!("  Transações: {count}");
    println!();
    println!("Experimente:");
    println!("  planilha sheet");
    println!("  planilha transactions --tipo expense");
    println!("  planilha export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBackend;

    fn test_backend() -> (tempfile::TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = SqliteBackend::open(&dir.path().join("test.db")).unwrap();
        backend.add_account(MAIN_ACCOUNT, "corrente").unwrap();
        (dir, backend)
    }

    #[test]
    fn test_demo_creates_expected_volume() {
        let (_dir, mut backend) = test_backend();
        let count = insert_demo_data(&mut backend).unwrap();
        // 7 per month (1 salário + 4 fixas + 2 mercado) + 3 parcelas
        assert_eq!(count, (MONTHS as usize) * 7 + 3);
        let rows = backend.list_transactions().unwrap();
        assert_eq!(rows.len(), count);
    }

    #[test]
    fn test_demo_amounts_parse() {
        let (_dir, mut backend) = test_backend();
        insert_demo_data(&mut backend).unwrap();
        for row in backend.list_transactions().unwrap() {
            let parsed: std::result::Result<f64, _> = row.valor.parse();
            assert!(parsed.is_ok(), "unparseable amount {:?}", row.valor);
        }
    }

    #[test]
    fn test_demo_installments_link_to_parent() {
        let (_dir, mut backend) = test_backend();
        insert_demo_data(&mut backend).unwrap();
        let rows = backend.list_transactions().unwrap();
        let parcelas: Vec<_> = rows.iter().filter(|r| r.parcelado).collect();
        assert_eq!(parcelas.len(), 3);
        let parent_id = parcelas[0].id.persisted().unwrap();
        assert_eq!(parcelas[0].id_transacao_pai, None);
        assert!(parcelas[1..]
            .iter()
            .all(|p| p.id_transacao_pai == Some(parent_id)));
        assert!(parcelas.iter().all(|p| p.total_parcelas == Some(3)));
    }

    #[test]
    fn test_demo_dates_are_valid() {
        let (_dir, mut backend) = test_backend();
        insert_demo_data(&mut backend).unwrap();
        for row in backend.list_transactions().unwrap() {
            let date = row.data.expect("demo rows carry a date");
            assert!(NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok(), "invalid date {date}");
        }
    }
}
