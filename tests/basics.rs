use ferrous_ioc::{ContainerBuilder, DiError, Parameter, Resolver, Service, TypeDesc};
use std::sync::{Arc, Mutex};

#[test]
fn test_instance_is_singleton() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(42usize);
    builder.register_instance("hello".to_string());

    let container = builder.build().unwrap();

    let num1 = container.resolve::<usize>().unwrap();
    let num2 = container.resolve::<usize>().unwrap();
    let str1 = container.resolve::<String>().unwrap();
    let str2 = container.resolve::<String>().unwrap();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
    assert!(Arc::ptr_eq(&str1, &str2));
}

#[test]
fn test_factory_with_dependencies() {
    struct Config {
        port: u16,
    }

    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut builder = ContainerBuilder::new();
    builder.register_instance(Config { port: 8080 });
    builder
        .register(|ctx| {
            Ok(Server {
                config: ctx.resolve::<Config>()?,
                name: "MyServer".to_string(),
            })
        })
        .single_instance();

    let container = builder.build().unwrap();
    let server = container.resolve::<Server>().unwrap();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(Mutex::new(0));
    let counter_clone = counter.clone();

    let mut builder = ContainerBuilder::new();
    builder.register(move |_| {
        let mut c = counter_clone.lock().unwrap();
        *c += 1;
        Ok(format!("instance-{}", *c))
    });

    let container = builder.build().unwrap();

    let a = container.resolve::<String>().unwrap();
    let b = container.resolve::<String>().unwrap();

    assert_eq!(*a, "instance-1");
    assert_eq!(*b, "instance-2");
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(*counter.lock().unwrap(), 2);
}

#[test]
fn test_not_registered_error_and_try_resolve() {
    let container = ContainerBuilder::new().build().unwrap();

    match container.resolve::<String>() {
        Err(DiError::NotRegistered { service }) => assert!(service.contains("String")),
        other => panic!("expected NotRegistered, got {:?}", other.map(|_| ())),
    }
    assert!(container.try_resolve::<String>().unwrap().is_none());
    assert!(!container.can_resolve::<String>());
}

#[test]
fn test_try_resolve_still_reports_activation_failures() {
    let mut builder = ContainerBuilder::new();
    builder.register::<u32, _>(|_| Err("boom".into()));
    let container = builder.build().unwrap();

    match container.try_resolve::<u32>() {
        Err(DiError::Activation { component, source }) => {
            assert!(component.contains("u32"));
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("expected an activation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_last_registration_wins() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance("first".to_string());
    builder.register_instance("second".to_string());

    let container = builder.build().unwrap();
    assert_eq!(*container.resolve::<String>().unwrap(), "second");

    let all: Vec<String> = container
        .resolve_all::<String>()
        .unwrap()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(all, vec!["first", "second"]);
}

#[test]
fn test_preserve_existing_defaults() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance("first".to_string());
    builder
        .register_instance("second".to_string())
        .preserve_existing_defaults();

    let container = builder.build().unwrap();
    assert_eq!(*container.resolve::<String>().unwrap(), "first");
    assert_eq!(container.resolve_all::<String>().unwrap().len(), 2);
}

#[test]
fn test_keyed_and_named_services() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance("primary-db".to_string()).named::<String>("primary");
    builder.register_instance("replica-db".to_string()).keyed::<String>("replica");
    builder.register_instance("by-number".to_string()).keyed::<String>(7i64);

    let container = builder.build().unwrap();

    assert_eq!(*container.resolve_named::<String>("primary").unwrap(), "primary-db");
    assert_eq!(*container.resolve_keyed::<String>("replica").unwrap(), "replica-db");
    assert_eq!(*container.resolve_keyed::<String>(7i64).unwrap(), "by-number");
    assert!(container.try_resolve::<String>().unwrap().is_none());
}

#[test]
fn test_keyed_plus_self() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(5u8).keyed::<u8>("five").as_self();

    let container = builder.build().unwrap();
    let by_key = container.resolve_keyed::<u8>("five").unwrap();
    let by_type = container.resolve::<u8>().unwrap();
    assert!(Arc::ptr_eq(&by_key, &by_type));
}

#[test]
fn test_resolve_all_empty_when_nothing_registered() {
    let container = ContainerBuilder::new().build().unwrap();
    assert!(container.resolve_all::<String>().unwrap().is_empty());
}

#[test]
fn test_call_site_parameters_reach_the_factory() {
    struct Greeting(String);

    let mut builder = ContainerBuilder::new();
    builder.register(|ctx| {
        let name = ctx
            .parameters()
            .iter()
            .find_map(|p| match p {
                Parameter::Named(n, v) if &**n == "name" => v.value().clone().downcast::<String>().ok(),
                _ => None,
            })
            .ok_or("no name supplied")?;
        Ok(Greeting(format!("hello {}", name)))
    });

    let container = builder.build().unwrap();
    let greeting = container
        .resolve_with_parameters::<Greeting>(&[Parameter::named("name", "world".to_string())])
        .unwrap();
    assert_eq!(greeting.0, "hello world");
    assert!(container.resolve::<Greeting>().is_err());
}

#[test]
fn test_type_mismatch_when_downcasting_to_wrong_type() {
    let mut builder = ContainerBuilder::new();
    builder.register_instance(1u32);
    let container = builder.build().unwrap();

    let result = container.resolve_as::<u64>(&Service::typed(TypeDesc::of::<u32>()));
    assert!(matches!(result, Err(DiError::TypeMismatch(_))));
}

#[test]
fn test_trait_objects() {
    trait Logger: Send + Sync {
        fn log(&self, msg: &str) -> String;
    }

    struct ConsoleLogger;
    impl Logger for ConsoleLogger {
        fn log(&self, msg: &str) -> String {
            format!("console: {}", msg)
        }
    }

    let mut builder = ContainerBuilder::new();
    builder
        .register(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
        .single_instance();

    let container = builder.build().unwrap();
    let logger = container.resolve::<Arc<dyn Logger>>().unwrap();
    assert_eq!(logger.log("hi"), "console: hi");
}

#[test]
fn test_end_to_end_constructor_component() {
    struct ServiceA;
    struct ServiceB;
    struct ConstructorComponent {
        a: Arc<ServiceA>,
        b: Arc<ServiceB>,
    }

    let mut builder = ContainerBuilder::new();
    builder.register(|_| Ok(ServiceA)).single_instance();
    builder.register(|_| Ok(ServiceB));
    builder.register(|ctx| {
        Ok(ConstructorComponent {
            a: ctx.resolve::<ServiceA>()?,
            b: ctx.resolve::<ServiceB>()?,
        })
    });

    let container = builder.build().unwrap();
    let first = container.resolve::<ConstructorComponent>().unwrap();
    let second = container.resolve::<ConstructorComponent>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.a, &second.a));
    assert!(!Arc::ptr_eq(&first.b, &second.b));
}
