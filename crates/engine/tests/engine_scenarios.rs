//! Black-box scenarios against the engine facade: the consistency
//! guarantees the report pages depend on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use shopledger_accounting::{EntrySource, LedgerFilter, Side};
use shopledger_audit::{AuditAction, AuditFilter, Operator};
use shopledger_core::{
    BusinessId, EmployeeId, EngineError, EngineResult, Money, ProductId, StockWarning,
};
use shopledger_engine::{
    BusinessSpec, ConsistencyEngine, MutationCoordinator, SaleIntent, SaleLine, StockAdjustment,
    StockReceipt, Tender, TenantRegistry,
};
use shopledger_inventory::{
    InventoryStore, Product, ProductSpec, RecordStockEvent, RecordedStockEvent, StockEvent,
    StockLedger,
};

fn operator() -> Operator {
    Operator::new(EmployeeId::new(), "Jo")
}

fn setup(initial_qty: i64) -> (ConsistencyEngine, BusinessId, ProductId) {
    shopledger_observability::init();
    let engine = ConsistencyEngine::new();
    let operator = operator();
    let business = engine
        .register_business(BusinessSpec::new("Corner Store", "USD"), &operator)
        .unwrap();
    let product = engine
        .create_product(
            business.id,
            ProductSpec::new("Beans 1kg", "BEAN-1", Money::from_minor(200), Money::from_minor(350)),
            &operator,
        )
        .unwrap();
    if initial_qty != 0 {
        engine
            .adjust_stock(
                business.id,
                StockAdjustment {
                    product_id: product.id,
                    delta_qty: initial_qty,
                    unit_cost: Money::ZERO,
                    reason: "initial count".to_string(),
                    quantity_only: true,
                    operator,
                },
            )
            .unwrap();
    }
    (engine, business.id, product.id)
}

fn account_id_by_code(engine: &ConsistencyEngine, business: BusinessId, code: &str) -> shopledger_core::AccountId {
    engine
        .chart_of_accounts(business)
        .into_iter()
        .find(|a| a.code == code)
        .unwrap_or_else(|| panic!("missing account {code}"))
        .id
}

#[test]
fn damaged_stock_adjustment_commits_a_consistent_triple() {
    let (engine, business, product_id) = setup(10);
    let operator = operator();

    let commit = engine
        .adjust_stock(
            business,
            StockAdjustment {
                product_id,
                delta_qty: -3,
                unit_cost: Money::from_minor(200),
                reason: "damaged".to_string(),
                quantity_only: false,
                operator,
            },
        )
        .unwrap();

    // Ledger: debit Shrinkage Expense $6.00, credit Inventory $6.00.
    let entry_id = commit.ledger_entry_id.unwrap();
    let entries = engine.general_ledger(business);
    let entry = entries.iter().find(|e| e.id == entry_id).unwrap();
    let shrinkage = account_id_by_code(&engine, business, "5100");
    let inventory = account_id_by_code(&engine, business, "1200");
    assert_eq!(entry.lines.len(), 2);
    assert!(entry.lines.iter().any(|l| l.account_id == shrinkage
        && l.side == Side::Debit
        && l.amount == Money::from_minor(600)));
    assert!(entry.lines.iter().any(|l| l.account_id == inventory
        && l.side == Side::Credit
        && l.amount == Money::from_minor(600)));

    // Stock: delta −3 linked to the entry, quantity 10 → 7.
    let history = engine.stock_history(business, product_id);
    let event = history.iter().find(|e| e.id == commit.stock_event_id).unwrap();
    assert_eq!(event.delta, -3);
    assert_eq!(event.ledger_entry_id, Some(entry_id));
    assert!(event.financial);
    assert_eq!(engine.quantity_on_hand(business, product_id), Some(7));
    assert_eq!(commit.quantity_on_hand, 7);
    assert!(commit.warning.is_none());

    // Audit: one record referencing both ids.
    let audit: Vec<_> = engine
        .audit_log(business, AuditFilter { action: Some(AuditAction::StockAdjusted), ..Default::default() })
        .into_iter()
        .filter(|r| r.related.ledger_entry_id == Some(entry_id))
        .collect();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].related.stock_event_id, Some(commit.stock_event_id));
}

#[test]
fn zero_value_adjustment_is_rejected_with_no_writes() {
    let (engine, business, product_id) = setup(10);

    let ledger_before = engine.general_ledger(business).len();
    let events_before = engine.stock_adjustments(business).len();
    let audit_before = engine.audit_log(business, AuditFilter::default()).len();

    let err = engine
        .adjust_stock(
            business,
            StockAdjustment {
                product_id,
                delta_qty: 0,
                unit_cost: Money::ZERO,
                reason: "typo".to_string(),
                quantity_only: false,
                operator: operator(),
            },
        )
        .unwrap_err();

    assert!(matches!(err, EngineError::ZeroValueAdjustment { .. }));
    assert_eq!(engine.general_ledger(business).len(), ledger_before);
    assert_eq!(engine.stock_adjustments(business).len(), events_before);
    assert_eq!(engine.audit_log(business, AuditFilter::default()).len(), audit_before);
}

#[test]
fn quantity_only_correction_bypasses_the_ledger_explicitly() {
    let (engine, business, product_id) = setup(0);

    let commit = engine
        .adjust_stock(
            business,
            StockAdjustment {
                product_id,
                delta_qty: 4,
                unit_cost: Money::ZERO,
                reason: "recount".to_string(),
                quantity_only: true,
                operator: operator(),
            },
        )
        .unwrap();

    assert_eq!(commit.ledger_entry_id, None);
    assert_eq!(commit.quantity_on_hand, 4);
    let history = engine.stock_history(business, product_id);
    assert_eq!(history.len(), 1);
    assert!(!history[0].financial);
    assert_eq!(history[0].ledger_entry_id, None);
    // No financial record was produced.
    assert!(engine.general_ledger(business).is_empty());
}

#[test]
fn oversell_commits_with_a_negative_stock_warning() {
    let (engine, business, product_id) = setup(2);

    let commit = engine
        .adjust_stock(
            business,
            StockAdjustment {
                product_id,
                delta_qty: -5,
                unit_cost: Money::from_minor(200),
                reason: "written off".to_string(),
                quantity_only: false,
                operator: operator(),
            },
        )
        .unwrap();

    assert_eq!(commit.quantity_on_hand, -3);
    assert_eq!(
        commit.warning,
        Some(StockWarning::NegativeStock { product_id, resulting_quantity: -3 })
    );
}

#[test]
fn cash_sale_posts_revenue_and_cogs_and_drains_stock() {
    let (engine, business, product_id) = setup(10);

    let commit = engine
        .record_sale(
            business,
            SaleIntent {
                lines: vec![SaleLine { product_id, quantity: 2, unit_price: None }],
                tender: Tender::Cash,
                note: None,
                operator: operator(),
            },
        )
        .unwrap();

    assert_eq!(commit.total, Money::from_minor(700));
    let entry = engine
        .general_ledger(business)
        .into_iter()
        .find(|e| e.id == commit.ledger_entry_id)
        .unwrap();
    assert!(matches!(entry.source, EntrySource::Sale(_)));

    let cash = account_id_by_code(&engine, business, "1000");
    let revenue = account_id_by_code(&engine, business, "4000");
    let cogs = account_id_by_code(&engine, business, "5000");
    let inventory = account_id_by_code(&engine, business, "1200");
    assert_eq!(entry.lines.len(), 4);
    assert!(entry.lines.iter().any(|l| l.account_id == cash && l.side == Side::Debit && l.amount == Money::from_minor(700)));
    assert!(entry.lines.iter().any(|l| l.account_id == revenue && l.side == Side::Credit && l.amount == Money::from_minor(700)));
    assert!(entry.lines.iter().any(|l| l.account_id == cogs && l.side == Side::Debit && l.amount == Money::from_minor(400)));
    assert!(entry.lines.iter().any(|l| l.account_id == inventory && l.side == Side::Credit && l.amount == Money::from_minor(400)));

    assert_eq!(engine.quantity_on_hand(business, product_id), Some(8));
    assert_eq!(commit.stock_event_ids.len(), 1);
    assert!(commit.warnings.is_empty());

    // Debit-positive balances reflect the sale.
    assert_eq!(engine.account_balance(business, cash), 700);
    assert_eq!(engine.account_balance(business, revenue), -700);
}

#[test]
fn credit_sale_debits_accounts_receivable() {
    let (engine, business, product_id) = setup(5);

    let commit = engine
        .record_sale(
            business,
            SaleIntent {
                lines: vec![SaleLine { product_id, quantity: 1, unit_price: Some(Money::from_minor(500)) }],
                tender: Tender::OnCredit,
                note: Some("invoice 42".to_string()),
                operator: operator(),
            },
        )
        .unwrap();

    let receivable = account_id_by_code(&engine, business, "1100");
    let entry = engine
        .general_ledger(business)
        .into_iter()
        .find(|e| e.id == commit.ledger_entry_id)
        .unwrap();
    assert!(entry.lines.iter().any(|l| l.account_id == receivable && l.side == Side::Debit && l.amount == Money::from_minor(500)));
}

#[test]
fn receipt_books_inventory_against_cash() {
    let (engine, business, product_id) = setup(0);

    let commit = engine
        .receive_stock(
            business,
            StockReceipt {
                product_id,
                quantity: 12,
                unit_cost: None,
                reference: "PO-7".to_string(),
                operator: operator(),
            },
        )
        .unwrap();

    assert_eq!(engine.quantity_on_hand(business, product_id), Some(12));
    let inventory = account_id_by_code(&engine, business, "1200");
    assert_eq!(engine.account_balance(business, inventory), 2400);
    assert!(commit.ledger_entry_id.is_some());
}

#[test]
fn every_financial_stock_event_resolves_to_a_ledger_entry() {
    let (engine, business, product_id) = setup(10);
    let operator = operator();

    engine
        .record_sale(
            business,
            SaleIntent {
                lines: vec![SaleLine { product_id, quantity: 3, unit_price: None }],
                tender: Tender::Cash,
                note: None,
                operator: operator.clone(),
            },
        )
        .unwrap();
    engine
        .adjust_stock(
            business,
            StockAdjustment {
                product_id,
                delta_qty: -1,
                unit_cost: Money::from_minor(200),
                reason: "damaged".to_string(),
                quantity_only: false,
                operator,
            },
        )
        .unwrap();

    let entries = engine.general_ledger(business);
    for event in engine.stock_adjustments(business) {
        if event.financial {
            let entry_id = event.ledger_entry_id.expect("financial event must be linked");
            assert!(entries.iter().any(|e| e.id == entry_id && e.business_id == business));
        }
    }

    // And the cache still equals the replayed history.
    let replayed = engine.recompute_quantity(business, product_id).unwrap();
    assert_eq!(engine.quantity_on_hand(business, product_id), Some(replayed));
    assert_eq!(replayed, 6);
}

#[test]
fn operations_against_another_tenants_ids_never_cross_over() {
    let (engine, business_a, product_a) = setup(10);
    let operator = operator();
    let business_b = engine
        .register_business(BusinessSpec::new("Other Shop", "EUR"), &operator)
        .unwrap()
        .id;

    // B cannot mutate A's product.
    let err = engine
        .adjust_stock(
            business_b,
            StockAdjustment {
                product_id: product_a,
                delta_qty: -1,
                unit_cost: Money::from_minor(100),
                reason: "theft".to_string(),
                quantity_only: false,
                operator,
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Referential { .. }));

    // B sees none of A's data.
    assert!(engine.general_ledger(business_b).is_empty());
    assert!(engine.products(business_b).is_empty());
    assert!(engine.stock_history(business_b, product_a).is_empty());

    // A is untouched.
    assert_eq!(engine.quantity_on_hand(business_a, product_a), Some(10));
}

#[test]
fn repeated_ledger_reads_of_a_fixed_range_are_identical() {
    let (engine, business, product_id) = setup(10);

    for _ in 0..3 {
        engine
            .record_sale(
                business,
                SaleIntent {
                    lines: vec![SaleLine { product_id, quantity: 1, unit_price: None }],
                    tender: Tender::Cash,
                    note: None,
                    operator: operator(),
                },
            )
            .unwrap();
    }

    let filter = LedgerFilter { sequence_from: Some(1), sequence_to: Some(2), ..Default::default() };
    let first = engine.ledger_entries(business, filter.clone());
    let second = engine.ledger_entries(business, filter);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn concurrent_readers_never_see_an_entry_without_its_stock_event() {
    let (engine, business, product_id) = setup(1_000);
    let engine = Arc::new(engine);
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for _ in 0..200 {
                engine
                    .adjust_stock(
                        business,
                        StockAdjustment {
                            product_id,
                            delta_qty: -1,
                            unit_cost: Money::from_minor(200),
                            reason: "damaged".to_string(),
                            quantity_only: false,
                            operator: operator(),
                        },
                    )
                    .unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    // Entries are snapshotted before events. A commit holds the tenant lock
    // across its whole triple, so any adjustment entry visible in the first
    // snapshot must have its linked event in the second.
    while !done.load(Ordering::SeqCst) {
        let entries = engine.general_ledger(business);
        let events = engine.stock_adjustments(business);
        for entry in &entries {
            if matches!(entry.source, EntrySource::StockAdjustment(_)) {
                assert!(
                    events.iter().any(|e| e.ledger_entry_id == Some(entry.id)),
                    "ledger entry {} visible without its stock event",
                    entry.id
                );
            }
        }
    }
    writer.join().unwrap();

    assert_eq!(engine.quantity_on_hand(business, product_id), Some(800));
}

/// Stock ledger wrapper that fails `record_event` while armed, for
/// exercising the compensation path.
struct FlakyStockLedger {
    inner: Arc<InventoryStore>,
    fail: AtomicBool,
}

impl StockLedger for FlakyStockLedger {
    fn create_product(&self, business_id: BusinessId, spec: ProductSpec) -> EngineResult<Product> {
        self.inner.create_product(business_id, spec)
    }

    fn product(&self, business_id: BusinessId, product_id: ProductId) -> Option<Product> {
        self.inner.product(business_id, product_id)
    }

    fn products(&self, business_id: BusinessId) -> Vec<Product> {
        self.inner.products(business_id)
    }

    fn record_event(
        &self,
        business_id: BusinessId,
        input: RecordStockEvent,
    ) -> EngineResult<RecordedStockEvent> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::CommitFailure {
                business_id,
                reason: "simulated storage failure".to_string(),
                reversal_entry_id: None,
            });
        }
        self.inner.record_event(business_id, input)
    }

    fn history(&self, business_id: BusinessId, product_id: ProductId) -> Vec<StockEvent> {
        self.inner.history(business_id, product_id)
    }

    fn events(&self, business_id: BusinessId) -> Vec<StockEvent> {
        self.inner.events(business_id)
    }

    fn quantity_on_hand(&self, business_id: BusinessId, product_id: ProductId) -> Option<i64> {
        self.inner.quantity_on_hand(business_id, product_id)
    }

    fn recompute(&self, business_id: BusinessId, product_id: ProductId) -> EngineResult<i64> {
        self.inner.recompute(business_id, product_id)
    }
}

#[test]
fn failed_stock_write_is_compensated_with_a_reversing_entry() {
    shopledger_observability::init();
    let registry = Arc::new(TenantRegistry::new());
    let chart = Arc::new(shopledger_accounting::ChartOfAccounts::new());
    let ledger = Arc::new(shopledger_accounting::GeneralLedger::new());
    let audit = Arc::new(shopledger_audit::AuditTrail::new());
    let stock = Arc::new(FlakyStockLedger {
        inner: Arc::new(InventoryStore::new()),
        fail: AtomicBool::new(false),
    });
    let coordinator = MutationCoordinator::new(
        Arc::clone(&registry),
        Arc::clone(&chart),
        Arc::clone(&ledger),
        Arc::clone(&stock),
        Arc::clone(&audit),
    );
    let operator = operator();

    let business = coordinator
        .register_business(BusinessSpec::new("Corner Store", "USD"), &operator)
        .unwrap()
        .id;
    let product = coordinator
        .create_product(
            business,
            ProductSpec::new("Beans 1kg", "BEAN-1", Money::from_minor(200), Money::from_minor(350)),
            &operator,
        )
        .unwrap();
    coordinator
        .adjust_stock(
            business,
            StockAdjustment {
                product_id: product.id,
                delta_qty: 10,
                unit_cost: Money::ZERO,
                reason: "initial count".to_string(),
                quantity_only: true,
                operator: operator.clone(),
            },
        )
        .unwrap();

    stock.fail.store(true, Ordering::SeqCst);
    let sequence_before = ledger.entry_count(business);
    let err = coordinator
        .adjust_stock(
            business,
            StockAdjustment {
                product_id: product.id,
                delta_qty: -3,
                unit_cost: Money::from_minor(200),
                reason: "damaged".to_string(),
                quantity_only: false,
                operator: operator.clone(),
            },
        )
        .unwrap_err();

    let EngineError::CommitFailure { reversal_entry_id, .. } = err else {
        panic!("expected CommitFailure, got {err:?}");
    };
    let reversal_id = reversal_entry_id.expect("compensation must surface the reversal id");

    // The original entry and its reversal are both retained; nothing was
    // deleted, and the two cancel out.
    assert_eq!(ledger.entry_count(business), sequence_before + 2);
    let reversal = ledger.get(business, reversal_id).unwrap();
    assert!(matches!(reversal.source, EntrySource::Reversal(_)));
    for account in chart.accounts(business) {
        assert_eq!(ledger.account_balance(business, account.id), 0);
    }

    // Stock was never touched.
    assert_eq!(stock.quantity_on_hand(business, product.id), Some(10));

    // Once storage recovers, the same intent commits cleanly.
    stock.fail.store(false, Ordering::SeqCst);
    let commit = coordinator
        .adjust_stock(
            business,
            StockAdjustment {
                product_id: product.id,
                delta_qty: -3,
                unit_cost: Money::from_minor(200),
                reason: "damaged".to_string(),
                quantity_only: false,
                operator,
            },
        )
        .unwrap();
    assert_eq!(commit.quantity_on_hand, 7);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

    /// Any sequence of committed adjustments leaves the ledger balanced,
    /// the inventory account equal to the signed value of the deltas, and
    /// the cached quantity equal to the replayed history.
    #[test]
    fn ledger_and_stock_stay_in_lockstep(deltas in prop::collection::vec((-20i64..20).prop_filter("nonzero", |d| *d != 0), 1..25)) {
        let (engine, business, product_id) = setup(0);
        let operator = operator();
        let unit_cost = Money::from_minor(150);

        let mut expected_qty = 0i64;
        let mut expected_inventory: i128 = 0;
        for delta in deltas {
            engine
                .adjust_stock(
                    business,
                    StockAdjustment {
                        product_id,
                        delta_qty: delta,
                        unit_cost,
                        reason: "prop".to_string(),
                        quantity_only: false,
                        operator: operator.clone(),
                    },
                )
                .unwrap();
            expected_qty += delta;
            // Positive deltas debit inventory, negative credit it.
            expected_inventory += delta as i128 * unit_cost.as_i128();
        }

        let inventory = account_id_by_code(&engine, business, "1200");
        prop_assert_eq!(engine.account_balance(business, inventory), expected_inventory);
        prop_assert_eq!(engine.quantity_on_hand(business, product_id), Some(expected_qty));
        prop_assert_eq!(engine.recompute_quantity(business, product_id).unwrap(), expected_qty);

        let mut net: i128 = 0;
        for entry in engine.general_ledger(business) {
            for line in &entry.lines {
                match line.side {
                    Side::Debit => net += line.amount.as_i128(),
                    Side::Credit => net -= line.amount.as_i128(),
                }
            }
        }
        prop_assert_eq!(net, 0);
    }
}
