use std::path::Path;

use rusqlite::Connection;

use crate::api::Backend;
use crate::error::{PlanilhaError, Result};
use crate::models::{Account, Category, Transaction, TransactionPayload, TransactionType};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contas (
    id INTEGER PRIMARY KEY,
    nome TEXT NOT NULL,
    tipo TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categorias (
    id INTEGER PRIMARY KEY,
    nome TEXT NOT NULL,
    tipo TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transacoes (
    id INTEGER PRIMARY KEY,
    descricao TEXT NOT NULL,
    valor TEXT NOT NULL DEFAULT '0.00',
    data TEXT,
    tipo TEXT NOT NULL DEFAULT 'expense',
    conta_id INTEGER,
    categoria_id INTEGER,
    observacoes TEXT NOT NULL DEFAULT '',
    data_vencimento TEXT,
    entidade TEXT NOT NULL DEFAULT '',
    data_pagamento_recebimento TEXT,
    parcelado INTEGER NOT NULL DEFAULT 0,
    numero_parcela INTEGER,
    total_parcelas INTEGER,
    id_transacao_pai INTEGER,
    status TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (conta_id) REFERENCES contas(id),
    FOREIGN KEY (categoria_id) REFERENCES categorias(id),
    FOREIGN KEY (id_transacao_pai) REFERENCES transacoes(id)
);
";

// (nome, tipo)
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    // Receitas
    ("Salário", "income"),
    ("Freelance", "income"),
    ("Investimentos", "income"),
    ("Reembolsos", "income"),
    ("Outras Receitas", "income"),
    // Despesas
    ("Alimentação", "expense"),
    ("Transporte", "expense"),
    ("Moradia", "expense"),
    ("Contas de Casa", "expense"),
    ("Saúde", "expense"),
    ("Educação", "expense"),
    ("Lazer", "expense"),
    ("Vestuário", "expense"),
    ("Assinaturas", "expense"),
    ("Impostos e Taxas", "expense"),
    ("Outras Despesas", "expense"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categorias", [], |row| row.get(0))?;
    if count == 0 {
        for (nome, tipo) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categorias (nome, tipo) VALUES (?1, ?2)",
                rusqlite::params![nome, tipo],
            )?;
        }
    }
    Ok(())
}

/// Only wire fields may appear in a partial update; anything else is a caller
/// bug and is rejected rather than interpolated into SQL.
const UPDATABLE_FIELDS: &[&str] = &[
    "descricao",
    "valor",
    "data",
    "tipo",
    "conta_id",
    "categoria_id",
    "observacoes",
    "data_vencimento",
    "entidade",
    "data_pagamento_recebimento",
    "parcelado",
    "numero_parcela",
    "total_parcelas",
    "id_transacao_pai",
    "status",
];

/// The shipped [`Backend`]: transactions, accounts and categories in a local
/// SQLite file.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn new(conn: Connection) -> Self {
        SqliteBackend { conn }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(SqliteBackend { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn add_account(&mut self, nome: &str, tipo: &str) -> Result<Account> {
        self.conn.execute(
            "INSERT INTO contas (nome, tipo) VALUES (?1, ?2)",
            rusqlite::params![nome, tipo],
        )?;
        Ok(Account {
            id: self.conn.last_insert_rowid(),
            nome: nome.to_string(),
            tipo: tipo.to_string(),
        })
    }

    pub fn add_category(&mut self, nome: &str, tipo: &str) -> Result<Category> {
        self.conn.execute(
            "INSERT INTO categorias (nome, tipo) VALUES (?1, ?2)",
            rusqlite::params![nome, tipo],
        )?;
        Ok(Category {
            id: self.conn.last_insert_rowid(),
            nome: nome.to_string(),
            tipo: tipo.to_string(),
        })
    }

    fn row_to_payload(row: &rusqlite::Row) -> rusqlite::Result<(i64, TransactionPayload)> {
        let tipo: String = row.get("tipo")?;
        Ok((
            row.get("id")?,
            TransactionPayload {
                descricao: row.get("descricao")?,
                valor: row.get("valor")?,
                data: row.get("data")?,
                tipo: TransactionType::parse(&tipo).unwrap_or(TransactionType::Expense),
                conta_id: row.get("conta_id")?,
                categoria_id: row.get("categoria_id")?,
                observacoes: row.get("observacoes")?,
                data_vencimento: row.get("data_vencimento")?,
                entidade: row.get("entidade")?,
                data_pagamento_recebimento: row.get("data_pagamento_recebimento")?,
                parcelado: row.get::<_, i64>("parcelado")? != 0,
                numero_parcela: row.get("numero_parcela")?,
                total_parcelas: row.get("total_parcelas")?,
                id_transacao_pai: row.get("id_transacao_pai")?,
                status: row.get("status")?,
            },
        ))
    }
}

impl Backend for SqliteBackend {
    fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, descricao, valor, data, tipo, conta_id, categoria_id, observacoes,
                    data_vencimento, entidade, data_pagamento_recebimento, parcelado,
                    numero_parcela, total_parcelas, id_transacao_pai, status
             FROM transacoes ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_payload)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .map(|(id, p)| Transaction::from_saved(id, p))
            .collect())
    }

    fn create_transaction(&mut self, payload: &TransactionPayload) -> Result<Transaction> {
        self.conn.execute(
            "INSERT INTO transacoes (descricao, valor, data, tipo, conta_id, categoria_id,
                observacoes, data_vencimento, entidade, data_pagamento_recebimento,
                parcelado, numero_parcela, total_parcelas, id_transacao_pai, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                payload.descricao,
                payload.valor,
                payload.data,
                payload.tipo.as_str(),
                payload.conta_id,
                payload.categoria_id,
                payload.observacoes,
                payload.data_vencimento,
                payload.entidade,
                payload.data_pagamento_recebimento,
                payload.parcelado as i64,
                payload.numero_parcela,
                payload.total_parcelas,
                payload.id_transacao_pai,
                payload.status,
            ],
        )?;
        Ok(Transaction::from_saved(
            self.conn.last_insert_rowid(),
            payload.clone(),
        ))
    }

    fn update_transaction(&mut self, id: i64, payload: &TransactionPayload) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE transacoes SET descricao = ?1, valor = ?2, data = ?3, tipo = ?4,
                conta_id = ?5, categoria_id = ?6, observacoes = ?7, data_vencimento = ?8,
                entidade = ?9, data_pagamento_recebimento = ?10, parcelado = ?11,
                numero_parcela = ?12, total_parcelas = ?13, id_transacao_pai = ?14,
                status = ?15
             WHERE id = ?16",
            rusqlite::params![
                payload.descricao,
                payload.valor,
                payload.data,
                payload.tipo.as_str(),
                payload.conta_id,
                payload.categoria_id,
                payload.observacoes,
                payload.data_vencimento,
                payload.entidade,
                payload.data_pagamento_recebimento,
                payload.parcelado as i64,
                payload.numero_parcela,
                payload.total_parcelas,
                payload.id_transacao_pai,
                payload.status,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(PlanilhaError::NotFound(id));
        }
        Ok(())
    }

    fn update_fields(
        &mut self,
        id: i64,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut assignments = Vec::with_capacity(fields.len());
        let mut params: Vec<rusqlite::types::Value> = Vec::with_capacity(fields.len() + 1);
        for (i, (key, value)) in fields.iter().enumerate() {
            if !UPDATABLE_FIELDS.contains(&key.as_str()) {
                return Err(PlanilhaError::Other(format!(
                    "campo desconhecido em atualização parcial: {key}"
                )));
            }
            assignments.push(format!("{key} = ?{}", i + 1));
            params.push(json_to_sql(value)?);
        }
        params.push(rusqlite::types::Value::Integer(id));
        let sql = format!(
            "UPDATE transacoes SET {} WHERE id = ?{}",
            assignments.join(", "),
            fields.len() + 1
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params))?;
        if changed == 0 {
            return Err(PlanilhaError::NotFound(id));
        }
        Ok(())
    }

    fn delete_transaction(&mut self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM transacoes WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(PlanilhaError::NotFound(id));
        }
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, nome, tipo FROM contas ORDER BY id")?;
        let accounts = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    nome: row.get(1)?,
                    tipo: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, nome, tipo FROM categorias ORDER BY id")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    nome: row.get(1)?,
                    tipo: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }
}

fn json_to_sql(value: &serde_json::Value) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value as Sql;
    match value {
        serde_json::Value::Null => Ok(Sql::Null),
        serde_json::Value::Bool(b) => Ok(Sql::Integer(*b as i64)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Sql::Integer)
            .or_else(|| n.as_f64().map(Sql::Real))
            .ok_or_else(|| PlanilhaError::Other(format!("número não representável: {n}"))),
        serde_json::Value::String(s) => Ok(Sql::Text(s.clone())),
        other => Err(PlanilhaError::Other(format!(
            "valor não suportado em atualização parcial: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_backend() -> (tempfile::TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("test.db")).unwrap();
        (dir, backend)
    }

    fn payload(desc: &str) -> TransactionPayload {
        TransactionPayload {
            descricao: desc.to_string(),
            valor: "10.00".to_string(),
            data: Some("2025-01-05".to_string()),
            tipo: TransactionType::Expense,
            conta_id: None,
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

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, backend) = test_backend();
        let tables: Vec<String> = backend
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["contas", "categorias", "transacoes"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent_and_seeds_once() {
        let (_dir, backend) = test_backend();
        init_db(backend.conn()).unwrap();
        let count: i64 = backend
            .conn()
            .query_row("SELECT count(*) FROM categorias", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[test]
    fn test_seeded_categories_cover_both_types() {
        let (_dir, backend) = test_backend();
        let categories = backend.list_categories().unwrap();
        assert!(categories.iter().any(|c| c.tipo == "income"));
        assert!(categories.iter().any(|c| c.tipo == "expense"));
    }

    #[test]
    fn test_create_and_list_round_trip() {
        let (_dir, mut backend) = test_backend();
        let conta = backend.add_account("Carteira", "corrente").unwrap();
        let mut p = payload("Mercado");
        p.conta_id = Some(conta.id);
        p.parcelado = true;
        let created = backend.create_transaction(&p).unwrap();
        assert!(!created.is_new);

        let rows = backend.list_transactions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].descricao, "Mercado");
        assert_eq!(rows[0].conta_id, Some(conta.id));
        assert!(rows[0].parcelado);
    }

    #[test]
    fn test_update_fields_changes_only_named_columns() {
        let (_dir, mut backend) = test_backend();
        let created = backend.create_transaction(&payload("Original")).unwrap();
        let id = created.id.persisted().unwrap();

        let mut fields = serde_json::Map::new();
        fields.insert("descricao".to_string(), serde_json::json!("Alterada"));
        fields.insert("parcelado".to_string(), serde_json::json!(true));
        fields.insert("conta_id".to_string(), serde_json::Value::Null);
        backend.update_fields(id, &fields).unwrap();

        let rows = backend.list_transactions().unwrap();
        assert_eq!(rows[0].descricao, "Alterada");
        assert!(rows[0].parcelado);
        assert_eq!(rows[0].conta_id, None);
        // Untouched column kept its value
        assert_eq!(rows[0].valor, "10.00");
    }

    #[test]
    fn test_update_fields_rejects_unknown_field() {
        let (_dir, mut backend) = test_backend();
        let created = backend.create_transaction(&payload("x")).unwrap();
        let id = created.id.persisted().unwrap();
        let mut fields = serde_json::Map::new();
        fields.insert("id".to_string(), serde_json::json!(99));
        assert!(backend.update_fields(id, &fields).is_err());
    }

    #[test]
    fn test_delete_missing_row_is_not_found() {
        let (_dir, mut backend) = test_backend();
        let err = backend.delete_transaction(404).unwrap_err();
        assert!(matches!(err, PlanilhaError::NotFound(404)));
    }

    #[test]
    fn test_full_update_replaces_all_fields() {
        let (_dir, mut backend) = test_backend();
        let created = backend.create_transaction(&payload("antes")).unwrap();
        let id = created.id.persisted().unwrap();
        let mut p = payload("depois");
        p.valor = "99.90".to_string();
        p.tipo = TransactionType::Income;
        backend.update_transaction(id, &p).unwrap();
        let rows = backend.list_transactions().unwrap();
        assert_eq!(rows[0].descricao, "depois");
        assert_eq!(rows[0].valor, "99.90");
        assert_eq!(rows[0].tipo, TransactionType::Income);
    }
}
