//! End-to-end runs of the battery against the memory adapter
//!
//! Tests cover:
//! - A conforming adapter passing every check
//! - Fail-fast halting on assertion failures and adapter errors
//! - Refusal to touch storage without acknowledged risks
//! - Scratch database teardown on every exit path

mod common;

use common::{Fault, FaultyAdapter, FlakyProvisioner, acknowledged_config, init_logging, memory_provisioner};
use futures::FutureExt;
use pretty_assertions::assert_eq;
use qcert_core::{Aggregate, Value, field, record};
use qcert_harness::checks::battery;
use qcert_harness::{
    CheckStatus, ContextSet, HarnessConfig, HarnessError, RecordingReporter, ReporterEvent,
    ScratchDatabase, TableNames, certify_adapter, certify_adapter_with,
};
use qcert_memory::MemoryAdapter;
use rstest::rstest;
use std::panic::AssertUnwindSafe;

#[tokio::test]
async fn test_memory_adapter_passes_every_check() {
    init_logging();
    let provisioner = memory_provisioner();
    let config = acknowledged_config("qcert_full_run");
    let mut reporter = RecordingReporter::default();

    let report = certify_adapter_with(&MemoryAdapter::new(), &provisioner, &config, &mut reporter)
        .await
        .unwrap();

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.status != CheckStatus::Passed)
        .collect();
    assert_eq!(failures, Vec::<&qcert_harness::CheckOutcome>::new());
    assert_eq!(report.outcomes.len(), battery().len());
    assert!(report.is_success());
    assert_eq!(reporter.outcomes().count(), battery().len());
    assert!(!provisioner.engine().has_database("qcert_full_run"));
}

#[rstest]
#[case::seed_1(1)]
#[case::seed_2(2)]
#[case::seed_3(3)]
#[tokio::test]
async fn test_memory_adapter_passes_with_any_seed(#[case] seed: u64) {
    init_logging();
    let provisioner = memory_provisioner();
    let config = HarnessConfig {
        seed: Some(seed),
        fixture_count: 25,
        ..acknowledged_config("qcert_seeded")
    };

    let report = certify_adapter(&MemoryAdapter::new(), &provisioner, &config)
        .await
        .unwrap();
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_lifecycle_operations_in_order() {
    init_logging();
    let provisioner = memory_provisioner();
    let config = acknowledged_config("qcert_ops");
    certify_adapter(&MemoryAdapter::new(), &provisioner, &config)
        .await
        .unwrap();

    let operations = provisioner.operations();
    let names = TableNames::default();
    let mut expected = vec!["create_database qcert_ops".to_string()];
    expected.extend(names.names().iter().map(|t| format!("create_table {}", t)));
    expected.push("create_connection qcert_ops".to_string());
    expected.extend(names.names().iter().map(|t| format!("drop_table {}", t)));
    expected.push("drop_database qcert_ops".to_string());
    assert_eq!(operations, expected);
}

#[tokio::test]
async fn test_unacknowledged_risks_touch_nothing() {
    init_logging();
    let provisioner = memory_provisioner();
    let config = HarnessConfig {
        database: "qcert_refused".into(),
        ..HarnessConfig::default()
    };

    let result = certify_adapter(&MemoryAdapter::new(), &provisioner, &config).await;

    match result {
        Err(HarnessError::RisksNotAcknowledged { operations }) => {
            assert_eq!(operations.len(), 12);
            assert!(operations.iter().any(|op| op == "drop database 'qcert_refused'"));
        }
        other => panic!("expected RisksNotAcknowledged, got {:?}", other.map(|r| r.total)),
    }
    assert!(provisioner.operations().is_empty());
    assert!(provisioner.engine().database_names().is_empty());
}

#[rstest]
#[case::dropped_field(
    Fault::DropInsertedField { table: "Car".into(), field: "Model".into() },
    3,
    CheckStatus::Failed
)]
#[case::wrong_schema(
    Fault::WrongColumnType { table: "Owner".into(), field: "FirstName".into() },
    1,
    CheckStatus::Failed
)]
#[case::miscounted_update(Fault::MiscountScopedUpdates, 14, CheckStatus::Failed)]
#[case::broken_select(Fault::FailSelect { table: "Car".into() }, 2, CheckStatus::Errored)]
#[case::panicking_delete(Fault::PanicOnDelete, 31, CheckStatus::Errored)]
#[case::ignored_defaults(Fault::IgnoreDefaults, 9, CheckStatus::Errored)]
#[case::exclusive_between(Fault::ExclusiveBetween, 17, CheckStatus::Failed)]
#[case::unsorted(Fault::IgnoreSort, 20, CheckStatus::Failed)]
#[case::descending_ignored(Fault::DescendingAsAscending, 21, CheckStatus::Failed)]
#[case::extra_group_column(Fault::ExtraGroupColumn, 24, CheckStatus::Failed)]
#[case::skewed_average(Fault::SkewedAverage, 24, CheckStatus::Failed)]
#[case::skip_off_by_one(Fault::SkipOffByOne, 27, CheckStatus::Failed)]
#[tokio::test]
async fn test_faults_halt_the_run(
    #[case] fault: Fault,
    #[case] halted_at: u32,
    #[case] status: CheckStatus,
) {
    init_logging();
    let provisioner = memory_provisioner();
    let config = acknowledged_config("qcert_faulty");
    let mut reporter = RecordingReporter::default();

    let report = certify_adapter_with(&FaultyAdapter::new(fault), &provisioner, &config, &mut reporter)
        .await
        .unwrap();

    let halt = report.halted_at().cloned().unwrap();
    assert_eq!((halt.sequence, halt.status), (halted_at, status));
    assert_eq!(report.outcomes.len(), halted_at as usize);
    assert_eq!(report.skipped(), battery().len() - halted_at as usize);
    assert!(matches!(
        reporter.events().last(),
        Some(ReporterEvent::Finished { executed, .. }) if *executed == halted_at as usize
    ));
    assert!(!provisioner.engine().has_database("qcert_faulty"));

    let err = report.into_result().unwrap_err();
    match status {
        CheckStatus::Failed => assert!(matches!(err, HarnessError::CheckFailed { sequence, .. } if sequence == halted_at)),
        _ => assert!(matches!(err, HarnessError::CheckErrored { sequence, .. } if sequence == halted_at)),
    }
}

#[tokio::test]
async fn test_failed_message_names_the_field() {
    init_logging();
    let provisioner = memory_provisioner();
    let config = acknowledged_config("qcert_message");
    let fault = Fault::DropInsertedField { table: "Car".into(), field: "Model".into() };

    let report = certify_adapter(&FaultyAdapter::new(fault), &provisioner, &config)
        .await
        .unwrap();
    let message = report.halted_at().and_then(|o| o.message.clone()).unwrap();
    assert_eq!(message, "single insert: record 0: field 'Model' missing, expected \"Focus\"");
}

#[tokio::test]
async fn test_setup_failure_tears_down_what_was_created() {
    init_logging();
    let provisioner = FlakyProvisioner {
        inner: memory_provisioner(),
        fail_table: "Dealer".into(),
        fail_database: false,
    };
    let config = acknowledged_config("qcert_flaky");

    let result = certify_adapter(&MemoryAdapter::new(), &provisioner, &config).await;

    assert!(matches!(result, Err(HarnessError::Provisioning { .. })));
    assert_eq!(
        provisioner.inner.operations(),
        vec![
            "create_database qcert_flaky",
            "create_table Car",
            "create_table Owner",
            "drop_table Car",
            "drop_table Owner",
            "drop_database qcert_flaky",
        ]
    );
    assert!(provisioner.inner.engine().database_names().is_empty());
}

#[tokio::test]
async fn test_failed_database_create_is_still_dropped() {
    init_logging();
    let provisioner = FlakyProvisioner {
        inner: memory_provisioner(),
        fail_table: String::new(),
        fail_database: true,
    };
    let config = acknowledged_config("qcert_half_created");

    let result = certify_adapter(&MemoryAdapter::new(), &provisioner, &config).await;

    match result {
        Err(HarnessError::Provisioning { stage, .. }) => assert_eq!(stage, "create database"),
        other => panic!("expected a provisioning error, got {:?}", other.map(|r| r.total)),
    }
    assert_eq!(
        provisioner.inner.operations(),
        vec!["create_database qcert_half_created", "drop_database qcert_half_created"]
    );
    assert!(provisioner.inner.engine().database_names().is_empty());
}

#[tokio::test]
async fn test_adapter_sorting_nulls_last_passes() {
    init_logging();
    let provisioner = memory_provisioner();
    let config = acknowledged_config("qcert_nulls_last");
    let mut reporter = RecordingReporter::default();

    let report = certify_adapter_with(
        &FaultyAdapter::new(Fault::NullsLast),
        &provisioner,
        &config,
        &mut reporter,
    )
    .await
    .unwrap();

    assert_eq!(report.halted_at(), None);
    let placement = reporter
        .outcomes()
        .find(|o| o.description.starts_with("null values"))
        .and_then(|o| o.message.clone())
        .unwrap();
    assert!(placement.ends_with("nulls last"), "{}", placement);
}

#[tokio::test]
async fn test_scoped_teardown_runs_when_body_panics() {
    init_logging();
    let provisioner = memory_provisioner();
    let tables = TableNames::default().schemas();

    let explode = true;
    let outcome = AssertUnwindSafe(ScratchDatabase::scoped(
        &provisioner,
        "qcert_panic",
        &tables,
        |_connection| async move {
            if explode {
                panic!("body exploded");
            }
            Ok::<(), HarnessError>(())
        },
    ))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert!(!provisioner.engine().has_database("qcert_panic"));
    assert_eq!(
        provisioner.operations().last().map(String::as_str),
        Some("drop_database qcert_panic")
    );
}

#[tokio::test]
async fn test_scoped_body_error_is_returned_after_teardown() {
    init_logging();
    let provisioner = memory_provisioner();
    let tables = TableNames::default().schemas();

    let result: Result<(), _> = ScratchDatabase::scoped(&provisioner, "qcert_err", &tables, |_connection| async {
        Err(HarnessError::Config("body failed".into()))
    })
    .await;

    assert!(matches!(result, Err(HarnessError::Config(_))));
    assert!(provisioner.engine().database_names().is_empty());
}

#[tokio::test]
async fn test_make_scenario_filter_and_group() {
    init_logging();
    let provisioner = memory_provisioner();
    let names = TableNames::default();
    let tables = names.schemas();

    ScratchDatabase::scoped(&provisioner, "qcert_scenario", &tables, |connection| async move {
        let contexts = ContextSet::open(&MemoryAdapter::new(), &connection, &names).unwrap();
        let cars = contexts.cars;
        cars.insert(vec![
            record! { "Make" => "Ford", "Model" => "Focus", "Year" => 2008, "Mileage" => 74999 },
            record! { "Make" => "Toyota", "Model" => "Camry", "Year" => 2012, "Mileage" => 30000 },
            record! { "Make" => "Ford", "Model" => "Fiesta", "Year" => 2015, "Mileage" => 25001 },
            record! { "Make" => "Dodge", "Model" => "Viper", "Year" => 2010, "Mileage" => 12000 },
        ])
        .await
        .unwrap();

        let fords = cars.select().filter(field("Make").eq("Ford")).fetch().await.unwrap();
        assert_eq!(fords.len(), 2);
        assert!(fords.iter().all(|r| r.get("Make") == Some(&Value::from("Ford"))));

        let groups = cars
            .select()
            .group_by(["Make"], vec![Aggregate::avg("Mileage")])
            .fetch()
            .await
            .unwrap();
        assert_eq!(groups.len(), 3);
        for group in &groups {
            let fields: Vec<&str> = group.fields().collect();
            assert_eq!(fields, vec!["Make", "$avg_Mileage"]);
        }
        assert!(groups.contains(&record! { "Make" => "Ford", "$avg_Mileage" => 50000.0 }));
        Ok(())
    })
    .await
    .unwrap();

    assert!(!provisioner.engine().has_database("qcert_scenario"));
}
