use ferrous_ioc::{ContainerBuilder, DiError, Dispose, Resolver};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Named {
    name: &'static str,
    log: Log,
}

impl Dispose for Named {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name.to_string());
    }
}

struct First(Named);
struct Second(Named);
struct Third(Named);

#[test]
fn test_disposal_lifo_order() {
    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();

    let l = log.clone();
    builder
        .register(move |_| Ok(First(Named { name: "First", log: l.clone() })))
        .instance_per_lifetime_scope()
        .on_release(|f: &First| f.0.dispose());
    let l = log.clone();
    builder
        .register(move |_| Ok(Second(Named { name: "Second", log: l.clone() })))
        .instance_per_lifetime_scope()
        .on_release(|s: &Second| s.0.dispose());
    let l = log.clone();
    builder
        .register(move |_| Ok(Third(Named { name: "Third", log: l.clone() })))
        .instance_per_lifetime_scope()
        .on_release(|t: &Third| t.0.dispose());

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<First>().unwrap();
    scope.resolve::<Second>().unwrap();
    scope.resolve::<Third>().unwrap();
    assert_eq!(scope.tracked_disposals(), 3);

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["Third", "Second", "First"]);
}

#[test]
fn test_dependents_are_disposed_before_dependencies() {
    struct Connection(Named);
    struct Repository {
        _connection: Arc<Connection>,
        inner: Named,
    }

    let log: Log = Arc::default();
    let mut builder = ContainerBuilder::new();

    let l = log.clone();
    builder
        .register(move |_| Ok(Connection(Named { name: "connection", log: l.clone() })))
        .instance_per_lifetime_scope()
        .on_release(|c: &Connection| c.0.dispose());
    let l = log.clone();
    builder
        .register(move |ctx| {
            Ok(Repository {
                _connection: ctx.resolve::<Connection>()?,
                inner: Named { name: "repository", log: l.clone() },
            })
        })
        .instance_per_lifetime_scope()
        .on_release(|r: &Repository| r.inner.dispose());

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<Repository>().unwrap();
    scope.dispose();

    // The connection finished activating first, so it is released last.
    assert_eq!(*log.lock().unwrap(), vec!["repository", "connection"]);
}

#[test]
fn test_dispose_with_trait() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "named", log: l.clone() }))
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    // Transient, but still owned and released by the scope.
    scope.resolve::<Named>().unwrap();
    scope.resolve::<Named>().unwrap();
    assert!(log.lock().unwrap().is_empty());

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["named", "named"]);
}

#[test]
fn test_children_are_disposed_before_their_parent() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |ctx| {
            Ok(Named {
                name: if ctx.scope().parent().is_some_and(|p| p.parent().is_some()) {
                    "child"
                } else {
                    "parent"
                },
                log: l.clone(),
            })
        })
        .instance_per_lifetime_scope()
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    let parent = container.begin_lifetime_scope();
    let child = parent.begin_lifetime_scope();
    parent.resolve::<Named>().unwrap();
    child.resolve::<Named>().unwrap();

    parent.dispose();
    assert!(child.is_disposed());
    assert_eq!(*log.lock().unwrap(), vec!["child", "parent"]);
}

#[test]
fn test_externally_owned_instances_are_not_disposed() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "external", log: l.clone() }))
        .instance_per_lifetime_scope()
        .externally_owned()
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<Named>().unwrap();
    assert_eq!(scope.tracked_disposals(), 0);

    scope.dispose();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_dropping_the_last_handle_disposes() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "dropped", log: l.clone() }))
        .instance_per_lifetime_scope()
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    {
        let scope = container.begin_lifetime_scope();
        scope.resolve::<Named>().unwrap();
    }
    assert_eq!(*log.lock().unwrap(), vec!["dropped"]);
}

#[test]
fn test_singletons_are_disposed_with_the_container() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "singleton", log: l.clone() }))
        .single_instance()
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<Named>().unwrap();

    scope.dispose();
    assert!(log.lock().unwrap().is_empty());

    container.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["singleton"]);
}

#[test]
fn test_dispose_is_idempotent() {
    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "once", log: l.clone() }))
        .instance_per_lifetime_scope()
        .dispose_with::<Named>();

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<Named>().unwrap();

    scope.dispose();
    scope.dispose();
    drop(scope);
    assert_eq!(*log.lock().unwrap(), vec!["once"]);
}

#[test]
fn test_panicking_disposer_does_not_stop_the_others() {
    struct Bomb;

    let log: Log = Arc::default();
    let l = log.clone();

    let mut builder = ContainerBuilder::new();
    builder
        .register(move |_| Ok(Named { name: "survivor", log: l.clone() }))
        .instance_per_lifetime_scope()
        .dispose_with::<Named>();
    builder
        .register(|_| Ok(Bomb))
        .instance_per_lifetime_scope()
        .on_release(|_: &Bomb| panic!("disposer failed"));

    let container = builder.build().unwrap();
    let scope = container.begin_lifetime_scope();
    scope.resolve::<Named>().unwrap();
    scope.resolve::<Bomb>().unwrap();

    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
}

#[test]
fn test_provided_instance_is_released_once() {
    struct Conn;

    let released = Arc::new(Mutex::new(0));
    let counter = released.clone();

    let mut builder = ContainerBuilder::new();
    builder.register_instance(Conn).on_release::<Conn, _>(move |_| {
        *counter.lock().unwrap() += 1;
    });
    let container = builder.build().unwrap();

    let scope = container.begin_lifetime_scope();
    let a = scope.resolve::<Conn>().unwrap();
    let b = container.resolve::<Conn>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    scope.dispose();
    assert_eq!(*released.lock().unwrap(), 0);
    container.dispose();
    assert_eq!(*released.lock().unwrap(), 1);
}

#[test]
fn test_provided_instance_rejects_other_lifetimes() {
    struct Conn;

    let mut builder = ContainerBuilder::new();
    builder
        .register_instance(Conn)
        .instance_per_dependency()
        .on_release::<Conn, _>(|_| {});
    assert!(matches!(builder.build(), Err(DiError::Configuration(_))));

    let mut builder = ContainerBuilder::new();
    builder.register_instance(Conn).instance_per_lifetime_scope();
    assert!(matches!(builder.build(), Err(DiError::Configuration(_))));
}
