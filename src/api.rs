use crate::error::Result;
use crate::models::{Account, Category, Transaction, TransactionPayload};

/// The backing store the grid talks to. Mirrors the REST surface the grid was
/// written against (list/create/update/delete transactions, read-only account
/// and category lookups); injected into the orchestrator and the CSV bridge
/// so they never reach into ambient state.
pub trait Backend {
    fn list_transactions(&self) -> Result<Vec<Transaction>>;
    /// Create one transaction; returns the stored row with its assigned id.
    fn create_transaction(&mut self, payload: &TransactionPayload) -> Result<Transaction>;
    /// Replace all fields of a persisted transaction.
    fn update_transaction(&mut self, id: i64, payload: &TransactionPayload) -> Result<()>;
    /// Partial update: only the named wire fields change.
    fn update_fields(
        &mut self,
        id: i64,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()>;
    fn delete_transaction(&mut self, id: i64) -> Result<()>;
    fn list_accounts(&self) -> Result<Vec<Account>>;
    fn list_categories(&self) -> Result<Vec<Category>>;
}
