use ferrous_ioc::{ContainerBuilder, DiError, DiObserver, Resolver, Service, TracingObserver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl DiObserver for Recorder {
    fn resolving(&self, service: &Service) {
        self.events.lock().unwrap().push(format!("resolving {}", service));
    }

    fn resolved(&self, service: &Service, _duration: Duration) {
        self.events.lock().unwrap().push(format!("resolved {}", service));
    }

    fn resolution_failed(&self, service: &Service, error: &DiError) {
        let kind = match error {
            DiError::NotRegistered { .. } => "not registered",
            _ => "other",
        };
        self.events.lock().unwrap().push(format!("failed {} ({})", service, kind));
    }

    fn scope_disposed(&self, tag: &str) {
        self.events.lock().unwrap().push(format!("disposed {}", tag));
    }
}

#[test]
fn test_observer_sees_top_level_requests() {
    struct Inner;
    struct Outer(Arc<Inner>);

    let recorder = Arc::new(Recorder::default());
    let mut builder = ContainerBuilder::new();
    builder.add_observer(recorder.clone());
    builder.add_observer(Arc::new(TracingObserver::new()));
    builder.register(|_| Ok(Inner));
    builder.register(|ctx| Ok(Outer(ctx.resolve::<Inner>()?)));
    builder.register::<u32, _>(|_| Err("boom".into()));

    let container = builder.build().unwrap();
    container.resolve::<Outer>().unwrap();
    assert!(container.resolve::<String>().is_err());
    assert!(container.resolve::<u32>().is_err());

    let outer = Service::of::<Outer>();
    let missing = Service::of::<String>();
    let broken = Service::of::<u32>();
    // Nested dependencies are part of the same request.
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            format!("resolving {}", outer),
            format!("resolved {}", outer),
            format!("resolving {}", missing),
            format!("failed {} (not registered)", missing),
            format!("resolving {}", broken),
            format!("failed {} (other)", broken),
        ]
    );
}

#[test]
fn test_observer_sees_scope_disposal() {
    let recorder = Arc::new(Recorder::default());
    let mut builder = ContainerBuilder::new();
    builder.add_observer(recorder.clone());

    let container = builder.build().unwrap();
    container.begin_tagged_lifetime_scope("request").dispose();
    assert_eq!(*recorder.events.lock().unwrap(), vec!["disposed request".to_string()]);
}
