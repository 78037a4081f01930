use crate::models::{Account, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Select,
    Boolean,
}

/// One choice of a select column. Values are kept as strings; identifier
/// columns (`is_ref`) parse them back to ids at commit time.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ColumnType,
    pub options: Vec<SelectOption>,
    /// Select column whose option values are foreign ids (conta/categoria).
    pub is_ref: bool,
}

impl ColumnDescriptor {
    fn plain(id: &'static str, name: &'static str, kind: ColumnType) -> Self {
        ColumnDescriptor {
            id,
            name,
            kind,
            options: Vec::new(),
            is_ref: false,
        }
    }

    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }
}

/// The static column set of the grid. Recomputed whenever the account or
/// category reference lists change so select columns always offer current
/// options.
pub fn build_columns(accounts: &[Account], categories: &[Category]) -> Vec<ColumnDescriptor> {
    let tipo_options = vec![
        SelectOption {
            value: "income".to_string(),
            label: "Receita".to_string(),
        },
        SelectOption {
            value: "expense".to_string(),
            label: "Despesa".to_string(),
        },
    ];
    let account_options: Vec<SelectOption> = accounts
        .iter()
        .map(|a| SelectOption {
            value: a.id.to_string(),
            label: a.nome.clone(),
        })
        .collect();
    let category_options: Vec<SelectOption> = categories
        .iter()
        .map(|c| SelectOption {
            value: c.id.to_string(),
            label: c.nome.clone(),
        })
        .collect();

    vec![
        ColumnDescriptor::plain("descricao", "Descrição", ColumnType::Text),
        ColumnDescriptor::plain("valor", "Valor", ColumnType::Number),
        ColumnDescriptor::plain("data", "Data", ColumnType::Date),
        ColumnDescriptor {
            id: "tipo",
            name: "Tipo",
            kind: ColumnType::Select,
            options: tipo_options,
            is_ref: false,
        },
        ColumnDescriptor {
            id: "conta_id",
            name: "Conta",
            kind: ColumnType::Select,
            options: account_options,
            is_ref: true,
        },
        ColumnDescriptor {
            id: "categoria_id",
            name: "Categoria",
            kind: ColumnType::Select,
            options: category_options,
            is_ref: true,
        },
        ColumnDescriptor::plain("observacoes", "Observações", ColumnType::Text),
        ColumnDescriptor::plain("data_vencimento", "Data Vencimento", ColumnType::Date),
        ColumnDescriptor::plain("entidade", "Entidade", ColumnType::Text),
        ColumnDescriptor::plain(
            "data_pagamento_recebimento",
            "Data Pagamento/Recebimento",
            ColumnType::Date,
        ),
        ColumnDescriptor::plain("parcelado", "Parcelado", ColumnType::Boolean),
        ColumnDescriptor::plain("numero_parcela", "Número Parcela", ColumnType::Number),
        ColumnDescriptor::plain("total_parcelas", "Total Parcelas", ColumnType::Number),
        ColumnDescriptor::plain("id_transacao_pai", "ID Transação Pai", ColumnType::Number),
        ColumnDescriptor::plain("status", "Status", ColumnType::Text),
    ]
}
