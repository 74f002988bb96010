//! `ConsistencyEngine`: the library-level API surface consumed by
//! presentation layers (general ledger report, stock adjustments page,
//! audit log page).
//!
//! All writes route through the mutation coordinator; reads are snapshot
//! queries against the underlying stores, taken under the tenant's commit
//! lock so a mid-commit triple is never visible. Permission checks (e.g.
//! `view_audit_log`) are the caller's responsibility.

use std::sync::{Arc, PoisonError};

use shopledger_accounting::{Account, AccountSpec, ChartOfAccounts, GeneralLedger, LedgerEntry, LedgerFilter};
use shopledger_audit::{AuditFilter, AuditRecord, AuditTrail, Operator};
use shopledger_core::{AccountId, BusinessId, EngineResult, ProductId};
use shopledger_inventory::{InventoryStore, Product, ProductSpec, StockEvent, StockLedger};

use crate::coordinator::{
    MutationCoordinator, SaleCommit, SaleIntent, StockAdjustment, StockCommit, StockReceipt,
};
use crate::registry::{Business, BusinessSpec, TenantRegistry};

/// The engine facade, wiring the in-memory stores into one surface.
pub struct ConsistencyEngine {
    chart: Arc<ChartOfAccounts>,
    ledger: Arc<GeneralLedger>,
    stock: Arc<InventoryStore>,
    audit: Arc<AuditTrail>,
    registry: Arc<TenantRegistry>,
    coordinator: MutationCoordinator<Arc<InventoryStore>>,
}

impl ConsistencyEngine {
    pub fn new() -> Self {
        let registry = Arc::new(TenantRegistry::new());
        let chart = Arc::new(ChartOfAccounts::new());
        let ledger = Arc::new(GeneralLedger::new());
        let stock = Arc::new(InventoryStore::new());
        let audit = Arc::new(AuditTrail::new());
        let coordinator = MutationCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&chart),
            Arc::clone(&ledger),
            Arc::clone(&stock),
            Arc::clone(&audit),
        );
        Self {
            chart,
            ledger,
            stock,
            audit,
            registry,
            coordinator,
        }
    }

    // --- tenant setup -----------------------------------------------------

    /// Register a business and seed its default chart of accounts.
    pub fn register_business(&self, spec: BusinessSpec, operator: &Operator) -> EngineResult<Business> {
        self.coordinator.register_business(spec, operator)
    }

    pub fn business(&self, business_id: BusinessId) -> Option<Business> {
        self.registry.get(business_id)
    }

    pub fn businesses(&self) -> Vec<Business> {
        self.registry.list()
    }

    pub fn create_account(
        &self,
        business_id: BusinessId,
        spec: AccountSpec,
        operator: &Operator,
    ) -> EngineResult<Account> {
        self.coordinator.create_account(business_id, spec, operator)
    }

    pub fn deactivate_account(
        &self,
        business_id: BusinessId,
        account_id: AccountId,
        operator: &Operator,
    ) -> EngineResult<()> {
        self.coordinator.deactivate_account(business_id, account_id, operator)
    }

    pub fn create_product(
        &self,
        business_id: BusinessId,
        spec: ProductSpec,
        operator: &Operator,
    ) -> EngineResult<Product> {
        self.coordinator.create_product(business_id, spec, operator)
    }

    // --- mutations --------------------------------------------------------

    pub fn adjust_stock(
        &self,
        business_id: BusinessId,
        intent: StockAdjustment,
    ) -> EngineResult<StockCommit> {
        self.coordinator.adjust_stock(business_id, intent)
    }

    pub fn receive_stock(
        &self,
        business_id: BusinessId,
        intent: StockReceipt,
    ) -> EngineResult<StockCommit> {
        self.coordinator.receive_stock(business_id, intent)
    }

    pub fn record_sale(&self, business_id: BusinessId, intent: SaleIntent) -> EngineResult<SaleCommit> {
        self.coordinator.record_sale(business_id, intent)
    }

    // --- reads (feed the report pages) ------------------------------------

    /// Run a read under the tenant's commit lock. A commit holds the same
    /// lock across its whole (ledger entry, stock event, audit record)
    /// triple, so reads here block for at most one commit step and never
    /// see a half-written triple.
    fn with_tenant_read<T>(&self, business_id: BusinessId, read: impl FnOnce() -> T) -> T {
        let lock = self.coordinator.tenant_lock(business_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        read()
    }

    /// Full general ledger in sequence order (General Ledger page).
    pub fn general_ledger(&self, business_id: BusinessId) -> Vec<LedgerEntry> {
        self.with_tenant_read(business_id, || {
            self.ledger.query(business_id, LedgerFilter::default())
        })
    }

    pub fn ledger_entries(&self, business_id: BusinessId, filter: LedgerFilter) -> Vec<LedgerEntry> {
        self.with_tenant_read(business_id, || self.ledger.query(business_id, filter))
    }

    pub fn chart_of_accounts(&self, business_id: BusinessId) -> Vec<Account> {
        self.with_tenant_read(business_id, || self.chart.accounts(business_id))
    }

    /// Signed balance for one account (debit-positive), folded in sequence
    /// order over the whole ledger.
    pub fn account_balance(&self, business_id: BusinessId, account_id: AccountId) -> i128 {
        self.with_tenant_read(business_id, || self.ledger.account_balance(business_id, account_id))
    }

    pub fn products(&self, business_id: BusinessId) -> Vec<Product> {
        self.with_tenant_read(business_id, || self.stock.products(business_id))
    }

    /// All stock events for the tenant (Stock Adjustments page).
    pub fn stock_adjustments(&self, business_id: BusinessId) -> Vec<StockEvent> {
        self.with_tenant_read(business_id, || self.stock.events(business_id))
    }

    /// Event history for one product (point-in-time stock audit).
    pub fn stock_history(&self, business_id: BusinessId, product_id: ProductId) -> Vec<StockEvent> {
        self.with_tenant_read(business_id, || self.stock.history(business_id, product_id))
    }

    pub fn quantity_on_hand(&self, business_id: BusinessId, product_id: ProductId) -> Option<i64> {
        self.with_tenant_read(business_id, || self.stock.quantity_on_hand(business_id, product_id))
    }

    /// Replay a product's history and repair its cached quantity.
    pub fn recompute_quantity(&self, business_id: BusinessId, product_id: ProductId) -> EngineResult<i64> {
        self.with_tenant_read(business_id, || self.stock.recompute(business_id, product_id))
    }

    /// Audit log, newest first. Gating behind `view_audit_log` is the
    /// caller's job.
    pub fn audit_log(&self, business_id: BusinessId, filter: AuditFilter) -> Vec<AuditRecord> {
        self.with_tenant_read(business_id, || self.audit.query(business_id, filter))
    }
}

impl Default for ConsistencyEngine {
    fn default() -> Self {
        Self::new()
    }
}
