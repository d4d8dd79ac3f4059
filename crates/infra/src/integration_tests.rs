//! End-to-end tests of the buffer engine over in-memory adapters.
//!
//! Catalog → ADU → demand adjustments → zone sizing → buffer adjustments →
//! buffer + history stores → event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::Value as JsonValue;

use flowplan_core::{BufferId, BufferProfileId, OrganizationId, ProductId, SupplierId, UserId};
use flowplan_ddmrp::{
    AduMethod, AlertLevel, BufferAdjustmentType, BufferAlertTriggered, BufferHistory,
    BufferProfile, BufferStatusChanged, DdmrpEvent, DemandAdjustmentChanges,
    DemandAdjustmentType, NewAduCalculation, NewBufferAdjustment, NewDemandAdjustment, Product,
    ProductSupplier, Zone, ZoneTarget,
};
use flowplan_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription, subjects};

use crate::catalog::{CatalogClient, InMemoryCatalog};
use crate::clock::FixedClock;
use crate::config::{EngineConfig, HistoryConfig, SchedulerConfig};
use crate::engine::{
    AduService, BufferAdjustmentService, BufferFilter, BufferQueries, BufferRecalculator,
    DemandAdjustmentService, EngineError, EnginePorts, NetFlowUpdate, NetFlowUpdater,
};
use crate::publisher::BusEventPublisher;
use crate::scheduler::{DailyRecalculationRunner, InMemoryReportSink};
use crate::store::{
    BufferHistoryStore, InMemoryAduStore, InMemoryBufferAdjustmentStore, InMemoryBufferHistoryStore,
    InMemoryBufferStore, InMemoryDemandAdjustmentStore, StoreError, StoreResult,
};

type Envelope = EventEnvelope<JsonValue>;

/// History store that can be switched to fail on write.
#[derive(Debug, Default)]
struct FlakyHistoryStore {
    inner: InMemoryBufferHistoryStore,
    fail: AtomicBool,
}

impl BufferHistoryStore for FlakyHistoryStore {
    fn record(&self, snapshot: BufferHistory) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("history table unavailable".into()));
        }
        self.inner.record(snapshot)
    }

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        limit: usize,
    ) -> StoreResult<Vec<BufferHistory>> {
        self.inner.list_by_buffer(organization_id, buffer_id, limit)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BufferHistory>> {
        self.inner.list_by_product(organization_id, product_id, from, to)
    }
}

struct Harness {
    org: OrganizationId,
    ports: EnginePorts,
    catalog: Arc<InMemoryCatalog>,
    history: Arc<FlakyHistoryStore>,
    clock: Arc<FixedClock>,
    events: Subscription<Envelope>,
}

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 15, 0, 0).unwrap()
}

fn test_today() -> NaiveDate {
    test_now().date_naive()
}

fn setup() -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    let history = Arc::new(FlakyHistoryStore::default());
    let clock = Arc::new(FixedClock::new(test_now()));
    let bus: Arc<InMemoryEventBus<Envelope>> = Arc::new(InMemoryEventBus::new());
    let events = bus.subscribe();

    let ports = EnginePorts {
        buffers: Arc::new(InMemoryBufferStore::new()),
        adu: Arc::new(InMemoryAduStore::new()),
        demand_adjustments: Arc::new(InMemoryDemandAdjustmentStore::new()),
        buffer_adjustments: Arc::new(InMemoryBufferAdjustmentStore::new()),
        history: history.clone(),
        catalog: catalog.clone(),
        publisher: Arc::new(BusEventPublisher::new(bus, "ddmrp-engine")),
        clock: clock.clone(),
    };

    Harness {
        org: OrganizationId::new(),
        ports,
        catalog,
        history,
        clock,
        events,
    }
}

impl Harness {
    /// Product with a 0.5/0.5 profile (order every 7 days) and a primary
    /// supplier with 30 days lead time and MOQ 500.
    fn seed_product(&self) -> ProductId {
        let profile = BufferProfile {
            id: BufferProfileId::new(),
            organization_id: self.org,
            name: "medium lead, medium variability".into(),
            lead_time_factor: 0.5,
            variability_factor: 0.5,
            order_frequency_days: 7,
        };
        let product = Product {
            id: ProductId::new(),
            organization_id: self.org,
            sku: "BRG-6204".into(),
            name: "Ball bearing".into(),
            buffer_profile_id: Some(profile.id),
        };
        self.catalog.upsert_profile(profile).unwrap();
        self.catalog.upsert_product(product.clone()).unwrap();
        self.catalog
            .upsert_supplier(ProductSupplier {
                product_id: product.id,
                supplier_id: SupplierId::new(),
                lead_time_days: 30,
                moq: 500,
                is_primary: true,
            })
            .unwrap();
        product.id
    }

    fn seed_adu(&self, product_id: ProductId, demand: Vec<f64>) {
        self.adu_service()
            .calculate(NewAduCalculation {
                product_id,
                organization_id: self.org,
                demand_data: demand,
                method: AduMethod::Average,
                period_days: None,
                alpha: None,
            })
            .unwrap();
    }

    fn seed_fad(&self, product_id: ProductId, factor: f64, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.demand_adjustments()
            .create(NewDemandAdjustment {
                product_id,
                organization_id: self.org,
                start_date: start,
                end_date: end,
                adjustment_type: DemandAdjustmentType::Promotion,
                factor,
                reason: "spring campaign".into(),
                created_by: UserId::new(),
            })
            .unwrap();
    }

    fn adu_service(&self) -> AduService {
        AduService::new(self.ports.clone(), Default::default())
    }

    fn demand_adjustments(&self) -> DemandAdjustmentService {
        DemandAdjustmentService::new(self.ports.clone())
    }

    fn buffer_adjustments(&self) -> BufferAdjustmentService {
        BufferAdjustmentService::new(self.ports.clone())
    }

    fn recalculator(&self) -> BufferRecalculator {
        BufferRecalculator::new(self.ports.clone())
    }

    fn flow(&self) -> NetFlowUpdater {
        NetFlowUpdater::new(self.ports.clone())
    }

    fn queries(&self) -> BufferQueries {
        BufferQueries::new(self.ports.clone(), HistoryConfig::default())
    }

    fn set_flow(&self, product_id: ProductId, on_hand: f64) -> flowplan_ddmrp::Buffer {
        self.flow()
            .update(NetFlowUpdate {
                organization_id: self.org,
                product_id,
                on_hand,
                on_order: 0.0,
                qualified_demand: 0.0,
            })
            .unwrap()
    }

    fn drain(&self) -> Vec<Envelope> {
        self.events.drain()
    }
}

fn event_types(envelopes: &[Envelope]) -> Vec<&str> {
    envelopes.iter().map(|e| e.event_type()).collect()
}

fn ready_product(h: &Harness) -> ProductId {
    let product_id = h.seed_product();
    h.seed_adu(product_id, vec![90.0, 100.0, 110.0]);
    h.drain();
    product_id
}

#[test]
fn first_recalculation_sizes_and_creates_buffer() {
    let h = setup();
    let product_id = ready_product(&h);

    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();

    let zones = buffer.zones();
    assert_eq!(buffer.cpd(), 100.0);
    assert_eq!(buffer.ltd_days(), 30);
    assert_eq!(zones.red_base, 1500.0);
    assert_eq!(zones.red_safety, 750.0);
    assert_eq!(zones.red_zone, 2250.0);
    assert_eq!(zones.yellow_zone, 3000.0);
    assert_eq!(zones.green_zone, 1500.0);
    assert_eq!(buffer.thresholds().top_of_green, 6750.0);
    assert_eq!(buffer.zone(), Zone::BelowRed);
    assert_eq!(buffer.alert_level(), AlertLevel::Critical);

    let events = h.drain();
    assert_eq!(
        event_types(&events),
        vec!["buffer.calculated", "buffer.status_changed", "buffer.alert_triggered"]
    );
    let changed: BufferStatusChanged = events[1].open().unwrap();
    assert_eq!(changed.previous_zone, None);
    assert_eq!(changed.zone, Zone::BelowRed);
    assert!(events.iter().all(|e| e.organization_id() == h.org));
    assert!(events.iter().all(|e| subjects::matches(subjects::ALL_DDMRP, e.subject())));

    let rows = h
        .queries()
        .history_by_buffer(h.org, buffer.id_typed(), None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].snapshot_date, test_today());
    assert_eq!(rows[0].moq, 500);
    assert_eq!(rows[0].order_frequency_days, 7);
    assert!(!rows[0].has_adjustments);
}

#[test]
fn active_demand_adjustments_compose_into_cpd() {
    let h = setup();
    let product_id = ready_product(&h);
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
    h.seed_fad(product_id, 1.5, start, end);
    h.seed_fad(product_id, 1.2, start, end);
    // Outside the window; ignored.
    h.seed_fad(
        product_id,
        3.0,
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 4, 30, 0, 0, 0).unwrap(),
    );

    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(buffer.cpd(), 180.0);

    let rows = h
        .queries()
        .history_by_product(h.org, product_id, test_today(), test_today())
        .unwrap();
    assert!(rows[0].has_adjustments);
}

#[test]
fn adjustment_ending_at_midnight_is_active_all_day() {
    let h = setup();
    let product_id = ready_product(&h);
    // Ends at 00:00 today while the clock reads 15:00.
    let end = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
    h.seed_fad(product_id, 2.0, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(), end);

    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(buffer.cpd(), 200.0);

    h.clock.advance(chrono::Duration::days(1));
    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(buffer.cpd(), 100.0);
}

#[test]
fn buffer_adjustments_scale_only_their_target_zone() {
    let h = setup();
    let product_id = ready_product(&h);
    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();

    h.buffer_adjustments()
        .create(NewBufferAdjustment {
            buffer_id: buffer.id_typed(),
            product_id,
            organization_id: h.org,
            adjustment_type: BufferAdjustmentType::SpikeManagement,
            target_zone: ZoneTarget::Green,
            factor: 2.0,
            start_date: Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap(),
            reason: "trade show".into(),
            created_by: UserId::new(),
        })
        .unwrap();

    let adjusted = h.recalculator().recalculate(h.org, product_id).unwrap();
    let zones = adjusted.zones();
    assert_eq!(zones.green_zone, 3000.0);
    assert_eq!(zones.red_zone, 2250.0);
    assert_eq!(zones.red_base, 1500.0);
    assert_eq!(adjusted.thresholds().top_of_green, 8250.0);

    // Same-day recalculation replaced the day's snapshot.
    let rows = h
        .queries()
        .history_by_buffer(h.org, adjusted.id_typed(), Some(10))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].has_adjustments);
}

#[test]
fn buffer_adjustment_must_match_buffer_product() {
    let h = setup();
    let product_id = ready_product(&h);
    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();

    let err = h
        .buffer_adjustments()
        .create(NewBufferAdjustment {
            buffer_id: buffer.id_typed(),
            product_id: ProductId::new(),
            organization_id: h.org,
            adjustment_type: BufferAdjustmentType::ZoneFactor,
            target_zone: ZoneTarget::All,
            factor: 1.1,
            start_date: test_now(),
            end_date: test_now(),
            reason: "mismatch".into(),
            created_by: UserId::new(),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn unchanged_zone_publishes_no_status_change() {
    let h = setup();
    let product_id = ready_product(&h);
    h.recalculator().recalculate(h.org, product_id).unwrap();
    h.drain();

    h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(
        event_types(&h.drain()),
        vec!["buffer.calculated", "buffer.alert_triggered"]
    );
}

#[test]
fn net_flow_update_reclassifies_without_resizing() {
    let h = setup();
    let product_id = ready_product(&h);
    let sized = h.recalculator().recalculate(h.org, product_id).unwrap();
    h.drain();

    let yellow = h.set_flow(product_id, 3000.0);
    assert_eq!(yellow.zone(), Zone::Yellow);
    assert_eq!(yellow.alert_level(), AlertLevel::Monitor);
    assert_eq!(yellow.zones(), sized.zones());
    assert_eq!(yellow.last_recalculated_at(), sized.last_recalculated_at());
    let events = h.drain();
    assert_eq!(event_types(&events), vec!["buffer.status_changed"]);
    let changed: BufferStatusChanged = events[0].open().unwrap();
    assert_eq!(changed.previous_zone, Some(Zone::BelowRed));

    let red = h.set_flow(product_id, 1000.0);
    assert_eq!(red.zone(), Zone::Red);
    let events = h.drain();
    assert_eq!(
        event_types(&events),
        vec!["buffer.status_changed", "buffer.alert_triggered"]
    );
    let alert: BufferAlertTriggered = events[1].open().unwrap();
    assert_eq!(alert.replenishment_qty, Some(5750.0));

    // Boundary: exactly top-of-yellow is green.
    let green = h.set_flow(product_id, 5250.0);
    assert_eq!(green.zone(), Zone::Green);
    assert_eq!(green.penetration(), Some(5250.0 / 6750.0 * 100.0));

    // A later full recalculation keeps the flow inputs.
    let recalculated = h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(recalculated.flow().on_hand, 5250.0);
    assert_eq!(recalculated.zone(), Zone::Green);
}

#[test]
fn net_flow_update_requires_a_sized_buffer() {
    let h = setup();
    let product_id = ready_product(&h);
    let err = h
        .flow()
        .update(NetFlowUpdate {
            organization_id: h.org,
            product_id,
            on_hand: 10.0,
            on_order: 0.0,
            qualified_demand: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = h
        .flow()
        .update(NetFlowUpdate {
            organization_id: h.org,
            product_id,
            on_hand: f64::NAN,
            on_order: 0.0,
            qualified_demand: 0.0,
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn missing_inputs_abort_without_side_effects() {
    let h = setup();

    // No ADU yet.
    let product_id = h.seed_product();
    let err = h.recalculator().recalculate(h.org, product_id).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // No profile assigned.
    let bare = Product {
        id: ProductId::new(),
        organization_id: h.org,
        sku: "RAW".into(),
        name: "Unprofiled".into(),
        buffer_profile_id: None,
    };
    h.catalog.upsert_product(bare.clone()).unwrap();
    let err = h.recalculator().recalculate(h.org, bare.id).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // No primary supplier.
    let orphan = Product {
        id: ProductId::new(),
        buffer_profile_id: h.catalog.get_product(h.org, product_id).unwrap().buffer_profile_id,
        ..bare
    };
    h.catalog.upsert_product(orphan.clone()).unwrap();
    h.seed_adu(orphan.id, vec![5.0]);
    h.drain();
    let err = h.recalculator().recalculate(h.org, orphan.id).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    assert!(h.queries().list(h.org, BufferFilter::All).unwrap().is_empty());
    assert!(h.drain().is_empty());
}

#[test]
fn other_organizations_cannot_recalculate_the_product() {
    let h = setup();
    let product_id = ready_product(&h);
    let err = h
        .recalculator()
        .recalculate(OrganizationId::new(), product_id)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = h.recalculator().recalculate(OrganizationId::nil(), product_id).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn history_failure_restores_the_buffer() {
    let h = setup();
    let product_id = ready_product(&h);

    h.history.fail.store(true, Ordering::SeqCst);
    let err = h.recalculator().recalculate(h.org, product_id).unwrap_err();
    assert!(matches!(&err, EngineError::Internal(msg) if msg.starts_with("failed to create buffer history")));
    assert!(matches!(
        h.queries().get_by_product(h.org, product_id),
        Err(EngineError::NotFound(_))
    ));
    assert!(h.drain().is_empty());

    h.history.fail.store(false, Ordering::SeqCst);
    let before = h.recalculator().recalculate(h.org, product_id).unwrap();
    h.seed_fad(product_id, 2.0, test_now(), test_now());
    h.drain();

    h.history.fail.store(true, Ordering::SeqCst);
    assert!(h.recalculator().recalculate(h.org, product_id).is_err());
    let after = h.queries().get_by_product(h.org, product_id).unwrap();
    assert_eq!(after, before);
    assert!(h.drain().is_empty());
}

#[test]
fn batch_recalculation_continues_past_failures() {
    let h = setup();
    let products: Vec<ProductId> = (0..3).map(|_| ready_product(&h)).collect();
    for p in &products {
        h.recalculator().recalculate(h.org, *p).unwrap();
    }
    h.catalog.remove_product(products[1]).unwrap();
    h.drain();

    let report = h.recalculator().recalculate_all(h.org).unwrap();
    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded(), 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, products[1]);
    assert!(matches!(failures[0].1, EngineError::NotFound(_)));

    let calculated = event_types(&h.drain())
        .into_iter()
        .filter(|t| *t == "buffer.calculated")
        .count();
    assert_eq!(calculated, 2);
}

#[test]
fn replenishment_signals_list_critical_first() {
    let h = setup();
    let red = ready_product(&h);
    let critical = ready_product(&h);
    let green = ready_product(&h);
    for p in [red, critical, green] {
        h.recalculator().recalculate(h.org, p).unwrap();
    }
    h.set_flow(red, 100.0);
    h.set_flow(green, 9000.0);

    let signals = h.queries().replenishment_signals(h.org).unwrap();
    let order: Vec<(ProductId, AlertLevel)> = signals
        .iter()
        .map(|b| (b.product_id(), b.alert_level()))
        .collect();
    assert_eq!(
        order,
        vec![(critical, AlertLevel::Critical), (red, AlertLevel::Replenish)]
    );

    let greens = h.queries().list(h.org, BufferFilter::Zone(Zone::Green)).unwrap();
    assert_eq!(greens.len(), 1);
    assert!(h.queries().replenishment_signals(OrganizationId::new()).unwrap().is_empty());
}

#[test]
fn adu_snapshots_are_one_per_day() {
    let h = setup();
    let product_id = h.seed_product();
    let service = h.adu_service();
    let input = NewAduCalculation {
        product_id,
        organization_id: h.org,
        demand_data: vec![10.0, 20.0, 30.0],
        method: AduMethod::Weighted,
        period_days: Some(3),
        alpha: None,
    };

    let calc = service.calculate(input.clone()).unwrap();
    assert_eq!(calc.adu_value, 23.33);
    let events = h.drain();
    assert_eq!(event_types(&events), vec!["adu.calculated"]);
    assert!(matches!(
        DdmrpEvent::from_envelope(&events[0]).unwrap(),
        DdmrpEvent::AduCalculated(_)
    ));

    assert!(matches!(service.calculate(input.clone()), Err(EngineError::Conflict(_))));

    h.clock.advance(chrono::Duration::days(1));
    service
        .calculate(NewAduCalculation {
            method: AduMethod::Exponential,
            alpha: Some(7.0),
            ..input
        })
        .unwrap();

    let latest = service.get_latest(h.org, product_id).unwrap();
    assert_eq!(latest.method, AduMethod::Exponential);
    assert_eq!(service.list_history(h.org, product_id, None).unwrap().len(), 2);
    assert_eq!(service.get_by_date(h.org, product_id, test_today()).unwrap(), calc);
    assert!(matches!(
        service.get_latest(h.org, ProductId::new()),
        Err(EngineError::NotFound(_))
    ));

    let empty = NewAduCalculation {
        product_id,
        organization_id: h.org,
        demand_data: vec![],
        method: AduMethod::Average,
        period_days: None,
        alpha: None,
    };
    assert!(matches!(service.calculate(empty), Err(EngineError::Validation(_))));
}

#[test]
fn fad_lifecycle_publishes_events() {
    let h = setup();
    let product_id = h.seed_product();
    let service = h.demand_adjustments();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();

    let fad = service
        .create(NewDemandAdjustment {
            product_id,
            organization_id: h.org,
            start_date: start,
            end_date: end,
            adjustment_type: DemandAdjustmentType::Seasonal,
            factor: 1.3,
            reason: "spring".into(),
            created_by: UserId::new(),
        })
        .unwrap();

    let err = service
        .update(
            h.org,
            fad.id,
            DemandAdjustmentChanges {
                end_date: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let updated = service
        .update(
            h.org,
            fad.id,
            DemandAdjustmentChanges {
                factor: Some(0.0),
                adjustment_type: Some(DemandAdjustmentType::Discontinue),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.factor, 0.0);
    assert_eq!(service.list_active_for_date(h.org, product_id, test_today()).unwrap().len(), 1);
    assert_eq!(service.list_by_organization(h.org).unwrap().len(), 1);

    service.delete(h.org, fad.id).unwrap();
    assert!(matches!(service.get(h.org, fad.id), Err(EngineError::NotFound(_))));
    assert!(matches!(service.delete(h.org, fad.id), Err(EngineError::NotFound(_))));
    assert!(service.list_by_product(h.org, product_id).unwrap().is_empty());

    assert_eq!(
        event_types(&h.drain()),
        vec!["fad.created", "fad.updated", "fad.deleted"]
    );
}

#[test]
fn daily_runner_sweeps_configured_organizations() {
    let h = setup();
    let product_id = ready_product(&h);
    h.recalculator().recalculate(h.org, product_id).unwrap();

    let runner = DailyRecalculationRunner::from_config(&SchedulerConfig {
        enabled: true,
        interval: Duration::from_secs(3600),
        organizations: vec![h.org],
    });
    let sink = Arc::new(InMemoryReportSink::new());
    let handle = runner.spawn(h.recalculator(), sink.clone());

    let deadline = Instant::now() + Duration::from_secs(5);
    while sink.all().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.trigger();
    handle.shutdown();

    let reports = sink.all();
    assert!(!reports.is_empty());
    assert_eq!(reports[0].organization_id, h.org);
    assert_eq!(reports[0].succeeded(), 1);
}

#[test]
fn disabled_runner_never_sweeps() {
    let h = setup();
    let product_id = ready_product(&h);
    h.recalculator().recalculate(h.org, product_id).unwrap();
    h.drain();

    let org = h.org.to_string();
    let config = EngineConfig::from_lookup(|name| match name {
        "FLOWPLAN_RECALC_ENABLED" => Some("false".to_string()),
        "FLOWPLAN_RECALC_ORGANIZATIONS" => Some(org.clone()),
        _ => None,
    })
    .unwrap();
    let runner = DailyRecalculationRunner::from_config(&config.scheduler);
    assert!(!runner.enabled);

    let sink = Arc::new(InMemoryReportSink::new());
    let handle = runner.spawn(h.recalculator(), sink.clone());
    handle.trigger();
    std::thread::sleep(Duration::from_millis(300));
    handle.shutdown();

    assert!(sink.all().is_empty());
    assert!(h.drain().is_empty());
}

#[test]
fn logging_runner_recalculates_buffers() {
    let h = setup();
    let product_id = ready_product(&h);
    h.recalculator().recalculate(h.org, product_id).unwrap();
    h.drain();

    let runner = DailyRecalculationRunner::from_config(&SchedulerConfig {
        enabled: true,
        interval: Duration::from_secs(3600),
        organizations: vec![h.org],
    });
    let handle = runner.spawn_logging(h.recalculator());

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut swept = false;
    while !swept && Instant::now() < deadline {
        if let Ok(envelope) = h.events.recv_timeout(Duration::from_millis(50)) {
            swept = envelope.event_type() == "buffer.calculated";
        }
    }
    handle.shutdown();
    assert!(swept);
}

#[test]
fn non_finite_profile_factor_is_rejected_before_sizing() {
    let h = setup();
    let profile = BufferProfile {
        id: BufferProfileId::new(),
        organization_id: h.org,
        name: "corrupted".into(),
        lead_time_factor: f64::NAN,
        variability_factor: 0.5,
        order_frequency_days: 7,
    };
    let product = Product {
        id: ProductId::new(),
        organization_id: h.org,
        sku: "NAN-1".into(),
        name: "Bad profile".into(),
        buffer_profile_id: Some(profile.id),
    };
    h.catalog.upsert_profile(profile).unwrap();
    h.catalog.upsert_product(product.clone()).unwrap();
    h.catalog
        .upsert_supplier(ProductSupplier {
            product_id: product.id,
            supplier_id: SupplierId::new(),
            lead_time_days: 30,
            moq: 500,
            is_primary: true,
        })
        .unwrap();
    h.seed_adu(product.id, vec![100.0]);
    h.drain();

    let err = h.recalculator().recalculate(h.org, product.id).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(matches!(
        h.queries().get_by_product(h.org, product.id),
        Err(EngineError::NotFound(_))
    ));
    assert!(h.drain().is_empty());
}

#[test]
fn recalculation_into_a_new_zone_reports_the_prior_zone() {
    let h = setup();
    let product_id = ready_product(&h);
    h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(h.set_flow(product_id, 3000.0).zone(), Zone::Yellow);

    // Doubling demand doubles the red zone to 4500, past the 3000 on hand.
    h.seed_fad(product_id, 2.0, test_now(), test_now());
    h.drain();

    let buffer = h.recalculator().recalculate(h.org, product_id).unwrap();
    assert_eq!(buffer.zone(), Zone::Red);

    let events = h.drain();
    let changes: Vec<BufferStatusChanged> = events
        .iter()
        .filter(|e| e.event_type() == "buffer.status_changed")
        .map(|e| e.open().unwrap())
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].previous_zone, Some(Zone::Yellow));
    assert_eq!(changes[0].zone, Zone::Red);
    assert_eq!(
        event_types(&events),
        vec!["buffer.calculated", "buffer.status_changed", "buffer.alert_triggered"]
    );
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, ..ProptestConfig::default() })]

    #[test]
    fn zone_is_a_function_of_flow_alone(on_hand in -1_000.0f64..10_000.0) {
        let h = setup();
        let product_id = ready_product(&h);
        h.recalculator().recalculate(h.org, product_id).unwrap();

        let updated = h.set_flow(product_id, on_hand);
        let recalculated = h.recalculator().recalculate(h.org, product_id).unwrap();
        prop_assert_eq!(updated.zone(), recalculated.zone());
        prop_assert_eq!(updated.alert_level(), recalculated.alert_level());
        prop_assert_eq!(updated.thresholds(), recalculated.thresholds());
    }
}
