//! End-to-end test cases driving a small reconciler through the harness.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use ctrlcheck::{
    Config, Error, GroupVersionResource, Object, ObjectMeta, Result,
    sim::{Reconciler, Request},
    store::Client,
    testing::{
        ControllerTestCase, ControllerTestEvent, assert_in_order, assertion, not_found, react_to,
        verify, verify_all,
    },
};

#[derive(Debug, Clone, Object)]
struct Widget {
    metadata: ObjectMeta,
    replicas: u32,
    ready: bool,
}

#[derive(Debug, Object)]
struct Secret {
    metadata: ObjectMeta,
}

fn widgets() -> GroupVersionResource {
    GroupVersionResource::new("example.com", "v1", "widgets")
}

fn secrets() -> GroupVersionResource {
    GroupVersionResource::core("v1", "secrets")
}

fn widget(name: &str, replicas: u32) -> Arc<Widget> {
    Arc::new(Widget {
        metadata: ObjectMeta::new("ns", name),
        replicas,
        ready: false,
    })
}

/// Reads the widget, makes sure a secret of the same name exists, marks
/// the widget ready.
struct WidgetReconciler {
    client: Client,
    errors: Arc<AtomicUsize>,
}

impl Reconciler for WidgetReconciler {
    async fn reconcile(&mut self, request: &Request) -> Result {
        let object = match self.client.get(&widgets(), &request.namespace, &request.name) {
            Err(e) if e.is_not_found() => return Ok(()),
            other => other?,
        };
        let Some(widget) = object.downcast_ref::<Widget>() else {
            return Err(Error::external("not a widget"));
        };
        if widget.ready {
            return Ok(());
        }
        match self.client.create(
            &secrets(),
            Arc::new(Secret {
                metadata: widget.metadata.clone(),
            }),
        ) {
            Err(e) if !e.is_already_exists() => return Err(e),
            _ => {}
        }
        self.client.update_status(
            &widgets(),
            Arc::new(Widget {
                ready: true,
                ..widget.clone()
            }),
        )?;
        Ok(())
    }

    fn on_error(&self, _request: &Request, _error: Error) -> Result {
        self.errors.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_case(name: &str, errors: Arc<AtomicUsize>) -> ControllerTestCase {
    ControllerTestCase::new(name)
        .with_config(Config::default().with_default_timeout(Duration::from_secs(5)))
        .with_controller(move |manager| {
            manager.add_controller("widgets", &[widgets()], move |client| WidgetReconciler {
                client,
                errors,
            })
        })
}

fn create_widget(name: &'static str) -> ControllerTestEvent {
    ControllerTestEvent::new(format!("create-{name}"), move |client| async move {
        client.create(&widgets(), widget(name, 1)).map(|_| ())
    })
}

#[tokio::test]
async fn test_widget_becomes_ready() {
    let report = test_case("ready", Arc::default())
        .with_event(
            create_widget("w1")
                .with_verifier(verify("update").on("widgets/status").named("w1").passes(|action| {
                    Ok(action
                        .object()
                        .and_then(|object| object.downcast_ref::<Widget>())
                        .is_some_and(|widget| widget.ready))
                }))
                .with_assertion(assertion("create").on("secrets").named("w1").seen_count_is(1))
                .with_assertion(assertion("delete").is_not_seen())
                .with_assertion(assert_in_order([
                    assertion("get").on("widgets").named("w1"),
                    assertion("create").on("secrets").named("w1"),
                    assertion("update").on("widgets/status").named("w1"),
                ])),
        )
        .run()
        .await;

    report.assert_passed();
}

#[tokio::test]
async fn test_seeded_objects_are_reconciled() {
    let report = test_case("seeded", Arc::default())
        .with_resource(widgets(), widget("w0", 1))
        .with_event(
            ControllerTestEvent::new("startup", |_| async { Ok(()) })
                .with_verifier(verify("update").on("widgets/status").named("w0").is_seen()),
        )
        .run()
        .await;

    report.assert_passed();
}

#[tokio::test]
async fn test_intercepted_read_is_observed_but_not_applied() {
    let errors = Arc::new(AtomicUsize::new(0));
    let report = test_case("intercepted", errors.clone())
        .with_event(
            create_widget("w1")
                .with_verifier(verify("get").on("widgets").named("w1").is_seen())
                .with_assertion(assertion("get").on("widgets").named("w1").is_seen())
                .with_reactor(react_to("get").on("widgets").with(not_found())),
        )
        .with_event(
            ControllerTestEvent::new("no-secret", |client| async move {
                match client.get(&secrets(), "ns", "w1") {
                    Err(e) if e.is_not_found() => Ok(()),
                    Err(e) => Err(e),
                    Ok(_) => Err(Error::external("secret was created")),
                }
            })
            .with_assertion(assertion("create").on("secrets").is_not_seen()),
        )
        .run()
        .await;

    report.assert_passed();
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unmet_expectations_are_all_reported() {
    let report = test_case("failing", Arc::default())
        .with_event(
            create_widget("w1")
                .with_verifier(verify("delete").on("widgets").named("w1").is_seen())
                .with_assertion(assertion("create").on("secrets").is_not_seen())
                .with_timeout(Duration::from_millis(200)),
        )
        .with_event(
            ControllerTestEvent::new("broken-trigger", |_| async {
                Err(Error::external("trigger failed"))
            }),
        )
        .run()
        .await;

    assert!(!report.passed());
    let failures = report.failures();
    assert_eq!(failures.len(), 3, "{report}");
    assert_eq!(failures[0].scope(), "failing/create-w1");
    assert_eq!(
        failures[0].message(),
        "timed out after 200ms waiting for delete on widgets named w1 in *"
    );
    assert!(failures[0].location().file().ends_with("controller.rs"));
    assert!(
        failures[1]
            .message()
            .starts_with("expected create on secrets named * in * not to be seen")
    );
    assert_eq!(failures[2].scope(), "failing/broken-trigger");
    assert!(failures[2].message().contains("trigger failed"));
}

#[tokio::test]
async fn test_verify_all_waits_for_every_step() {
    let report = test_case("all", Arc::default())
        .with_event(
            ControllerTestEvent::new("two-widgets", |client| async move {
                client.create(&widgets(), widget("a", 1))?;
                client.create(&widgets(), widget("b", 2))?;
                Ok(())
            })
            .with_verifier(verify_all([
                verify("update").on("widgets/status").named("b").is_seen(),
                verify("update").on("widgets/status").named("a").is_seen(),
            ]))
            .with_assertion(assertion("create").on("secrets").seen_count_is_at_least(2)),
        )
        .run()
        .await;

    report.assert_passed();
}

#[tokio::test]
async fn test_verification_errors_are_reported() {
    let report = test_case("check-error", Arc::default())
        .with_event(
            create_widget("w1").with_verifier(
                verify("create")
                    .on("secrets")
                    .passes(|_| Err("secret has no data".into())),
            ),
        )
        .run()
        .await;

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{report}");
    assert!(failures[0].message().contains("secret has no data"));
    assert!(failures[0].location().file().ends_with("controller.rs"));
}

#[tokio::test]
async fn test_duplicate_controller_is_reported() {
    let report = test_case("duplicate", Arc::default())
        .with_controller(|manager| {
            manager.add_controller("widgets", &[widgets()], |client| WidgetReconciler {
                client,
                errors: Arc::default(),
            })
        })
        .run()
        .await;

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message().contains("'widgets' already exists"));
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_report_to_json() {
    let report = test_case("json", Arc::default())
        .with_event(
            ControllerTestEvent::new("quiet", |_| async { Ok(()) })
                .with_verifier(verify("delete").is_seen())
                .with_timeout(Duration::from_millis(10)),
        )
        .run()
        .await;

    let json = report.to_json().unwrap();
    assert!(json.contains("\"passed\":false"));
    assert!(json.contains("\"scope\":\"json/quiet\""));
}
