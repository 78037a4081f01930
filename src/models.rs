use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Row identifier. Persisted rows carry the server-assigned integer id;
/// rows added locally and never saved carry a temporary draft id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowId {
    Persisted(i64),
    Draft(String),
}

static DRAFT_SEQ: AtomicU64 = AtomicU64::new(0);

impl RowId {
    /// Synthesize a fresh draft id, unique for the lifetime of the session.
    pub fn draft() -> Self {
        let seq = DRAFT_SEQ.fetch_add(1, Ordering::Relaxed);
        let ts = chrono::Local::now().timestamp_millis();
        RowId::Draft(format!("new_{ts}_{seq}"))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, RowId::Draft(_))
    }

    pub fn persisted(&self) -> Option<i64> {
        match self {
            RowId::Persisted(id) => Some(*id),
            RowId::Draft(_) => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Persisted(id) => write!(f, "{id}"),
            RowId::Draft(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }

    /// Display label, fixed pt-BR locale like the rest of the grid.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Income => "Receita",
            TransactionType::Expense => "Despesa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub nome: String,
    pub tipo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub nome: String,
    pub tipo: String,
}

/// One grid row. `valor` is kept as a numeric string (dot decimal) because
/// the cell editor normalizes keystrokes into it and the wire format sends
/// it as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: RowId,
    pub descricao: String,
    pub valor: String,
    pub data: Option<String>,
    pub tipo: TransactionType,
    pub conta_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub observacoes: String,
    pub data_vencimento: Option<String>,
    pub entidade: String,
    pub data_pagamento_recebimento: Option<String>,
    pub parcelado: bool,
    pub numero_parcela: Option<i64>,
    pub total_parcelas: Option<i64>,
    pub id_transacao_pai: Option<i64>,
    pub status: String,
    /// True until the first successful save.
    pub is_new: bool,
    /// True once any field has been edited since load or last save.
    pub is_modified: bool,
}

impl Transaction {
    /// Draft row appended by the Add action: today's date, expense, first
    /// available account and category.
    pub fn draft(first_account: i64, first_category: i64) -> Self {
        Transaction {
            id: RowId::draft(),
            descricao: String::new(),
            valor: "0.00".to_string(),
            data: Some(chrono::Local::now().format("%Y-%m-%d").to_string()),
            tipo: TransactionType::Expense,
            conta_id: Some(first_account),
            categoria_id: Some(first_category),
            observacoes: String::new(),
            data_vencimento: None,
            entidade: String::new(),
            data_pagamento_recebimento: None,
            parcelado: false,
            numero_parcela: None,
            total_parcelas: None,
            id_transacao_pai: None,
            status: String::new(),
            is_new: true,
            is_modified: true,
        }
    }

    pub fn payload(&self) -> TransactionPayload {
        TransactionPayload {
            descricao: self.descricao.clone(),
            valor: self.valor.clone(),
            data: self.data.clone(),
            tipo: self.tipo,
            conta_id: self.conta_id,
            categoria_id: self.categoria_id,
            observacoes: self.observacoes.clone(),
            data_vencimento: self.data_vencimento.clone(),
            entidade: self.entidade.clone(),
            data_pagamento_recebimento: self.data_pagamento_recebimento.clone(),
            parcelado: self.parcelado,
            numero_parcela: self.numero_parcela,
            total_parcelas: self.total_parcelas,
            id_transacao_pai: self.id_transacao_pai,
            status: self.status.clone(),
        }
    }

    /// Reconstruct a row as it arrives from the backend: persisted, clean flags.
    pub fn from_saved(id: i64, payload: TransactionPayload) -> Self {
        Transaction {
            id: RowId::Persisted(id),
            descricao: payload.descricao,
            valor: payload.valor,
            data: payload.data,
            tipo: payload.tipo,
            conta_id: payload.conta_id,
            categoria_id: payload.categoria_id,
            observacoes: payload.observacoes,
            data_vencimento: payload.data_vencimento,
            entidade: payload.entidade,
            data_pagamento_recebimento: payload.data_pagamento_recebimento,
            parcelado: payload.parcelado,
            numero_parcela: payload.numero_parcela,
            total_parcelas: payload.total_parcelas,
            id_transacao_pai: payload.id_transacao_pai,
            status: payload.status,
            is_new: false,
            is_modified: false,
        }
    }
}

/// Create/update body, keyed by the wire field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub descricao: String,
    pub valor: String,
    pub data: Option<String>,
    pub tipo: TransactionType,
    pub conta_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub observacoes: String,
    pub data_vencimento: Option<String>,
    pub entidade: String,
    pub data_pagamento_recebimento: Option<String>,
    pub parcelado: bool,
    pub numero_parcela: Option<i64>,
    pub total_parcelas: Option<i64>,
    pub id_transacao_pai: Option<i64>,
    pub status: String,
}
