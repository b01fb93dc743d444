//! A widget controller checked event by event.
//!
//! For every widget the controller keeps a `<name>-config` config map and
//! marks the widget ready through its status subresource; deleting a widget
//! removes its config map.
//!
//! Run with `cargo run --example widget-controller`.

use std::{sync::Arc, time::Duration};

use ctrlcheck::{
    Config, Error, GroupVersionResource, Object, ObjectMeta, Result,
    sim::{Reconciler, Request},
    store::Client,
    testing::{
        ControllerTestCase, ControllerTestEvent, assertion, client_fails, react_to, verify,
        verify_in_order,
    },
};

#[derive(Debug, Clone, Object)]
struct Widget {
    metadata: ObjectMeta,
    replicas: u32,
    ready: bool,
}

#[derive(Debug, Object)]
struct ConfigMap {
    metadata: ObjectMeta,
    replicas: u32,
}

fn widgets() -> GroupVersionResource {
    GroupVersionResource::new("example.com", "v1", "widgets")
}

fn configmaps() -> GroupVersionResource {
    GroupVersionResource::core("v1", "configmaps")
}

fn widget(name: &str, replicas: u32) -> Arc<Widget> {
    Arc::new(Widget {
        metadata: ObjectMeta::new("demo", name),
        replicas,
        ready: false,
    })
}

struct WidgetController {
    client: Client,
}

impl Reconciler for WidgetController {
    async fn reconcile(&mut self, request: &Request) -> Result {
        let config_name = format!("{}-config", request.name);
        let object = match self.client.get(&widgets(), &request.namespace, &request.name) {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                return match self.client.delete(&configmaps(), &request.namespace, &config_name) {
                    Err(e) if !e.is_not_found() => Err(e),
                    _ => Ok(()),
                };
            }
            Err(e) => return Err(e),
        };
        let widget = object
            .downcast_ref::<Widget>()
            .ok_or_else(|| Error::external(format!("{request} is not a widget")))?;
        if widget.ready {
            return Ok(());
        }

        let config = ConfigMap {
            metadata: ObjectMeta::new(request.namespace.clone(), config_name),
            replicas: widget.replicas,
        };
        match self.client.create(&configmaps(), Arc::new(config)) {
            Err(e) if !e.is_already_exists() => return Err(e),
            _ => {}
        }

        let ready = Widget {
            ready: true,
            ..widget.clone()
        };
        self.client.update_status(&widgets(), Arc::new(ready))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let report = ControllerTestCase::new("widget-controller")
        .with_config(Config::default().with_default_timeout(Duration::from_secs(2)))
        .with_resource(widgets(), widget("seeded", 1))
        .with_controller(|manager| {
            manager.add_controller("widgets", &[widgets()], |client| WidgetController { client })
        })
        .with_event(
            ControllerTestEvent::new("create-widget", |client| async move {
                client.create(&widgets(), widget("w1", 3)).map(|_| ())
            })
            .with_verifier(verify_in_order([
                verify("create").on("configmaps").named("w1-config").is_seen(),
                verify("update").on("widgets/status").named("w1").passes(|action| {
                    let widget = action
                        .object()
                        .and_then(|object| object.downcast_ref::<Widget>())
                        .ok_or("status update carries no widget")?;
                    Ok(widget.ready)
                }),
            ]))
            .with_assertion(
                assertion("create")
                    .on("configmaps")
                    .named("w1-config")
                    .seen_count_is(1),
            ),
        )
        .with_event(
            ControllerTestEvent::new("configmap-create-fails", |client| async move {
                client.create(&widgets(), widget("w2", 1)).map(|_| ())
            })
            .with_verifier(verify("create").on("configmaps").named("w2-config").is_seen())
            .with_assertion(assertion("update").on("widgets/status").named("w2").is_not_seen())
            .with_reactor(react_to("create").on("configmaps").with(client_fails())),
        )
        .with_event(
            ControllerTestEvent::new("delete-widget", |client| async move {
                client.delete(&widgets(), "demo", "w1")
            })
            .with_verifier(verify("delete").on("configmaps").named("w1-config").is_seen()),
        )
        .run()
        .await;

    println!("{report}");
    report.assert_passed();
    Ok(())
}
