use ferrous_ioc::{
    ConstructorDef, ContainerBuilder, ContainerOptions, DiError, Resolver, Service, TypeDef, TypeDesc,
    DEFAULT_MAX_RESOLVE_DEPTH,
};
use std::sync::Arc;

fn path_of(err: DiError) -> Vec<String> {
    match err {
        DiError::Circular(path) => path,
        other => panic!("expected a circular dependency error, got {:?}", other),
    }
}

#[test]
fn test_self_circular_dependency() {
    #[derive(Debug)]
    struct SelfReferencing;

    let mut builder = ContainerBuilder::new();
    builder.register(|ctx| {
        ctx.resolve::<SelfReferencing>()?;
        Ok(SelfReferencing)
    });

    let container = builder.build().unwrap();
    let path = path_of(container.resolve::<SelfReferencing>().unwrap_err());
    assert_eq!(path.len(), 2);
    assert!(path.iter().all(|p| p.contains("SelfReferencing")));
}

#[test]
fn test_two_component_cycle_lists_both() {
    #[derive(Debug)]
    struct A;
    #[derive(Debug)]
    struct B;

    let mut builder = ContainerBuilder::new();
    builder.register(|ctx| {
        ctx.resolve::<B>()?;
        Ok(A)
    });
    builder.register(|ctx| {
        ctx.resolve::<A>()?;
        Ok(B)
    });

    let container = builder.build().unwrap();
    let path = path_of(container.resolve::<A>().unwrap_err());
    assert_eq!(path.len(), 3);
    assert!(path[0].ends_with("A"));
    assert!(path[1].ends_with("B"));
    assert!(path[2].ends_with("A"));

    let message = DiError::Circular(path).to_string();
    assert!(message.contains(" -> "));
}

#[test]
fn test_cycle_through_catalog_constructors() {
    let mut builder = ContainerBuilder::new();
    builder.define_type(
        TypeDef::class("Left").constructor(ConstructorDef::new(|_| Ok(())).param("right", TypeDesc::named("Right"))),
    );
    builder.define_type(
        TypeDef::class("Right").constructor(ConstructorDef::new(|_| Ok(())).param("middle", TypeDesc::named("Middle"))),
    );
    builder.define_type(
        TypeDef::class("Middle").constructor(ConstructorDef::new(|_| Ok(())).param("left", TypeDesc::named("Left"))),
    );
    builder.register_type(TypeDesc::named("Left"));
    builder.register_type(TypeDesc::named("Right"));
    builder.register_type(TypeDesc::named("Middle"));

    let container = builder.build().unwrap();
    let err = container
        .resolve_service(&Service::typed(TypeDesc::named("Right")))
        .unwrap_err();
    assert_eq!(path_of(err), vec!["Right", "Middle", "Left", "Right"]);
}

#[test]
fn test_shared_components_are_still_checked() {
    struct Loop;

    let mut builder = ContainerBuilder::new();
    builder
        .register(|ctx| {
            ctx.resolve::<Loop>()?;
            Ok(Loop)
        })
        .single_instance();

    let container = builder.build().unwrap();
    assert!(matches!(container.resolve::<Loop>(), Err(DiError::Circular(_))));
    // A failed activation stores nothing; the next attempt fails the same way.
    assert!(matches!(container.resolve::<Loop>(), Err(DiError::Circular(_))));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Leaf;
    struct Left(Arc<Leaf>);
    struct Right(Arc<Leaf>);
    struct Top(Arc<Left>, Arc<Right>);

    let mut builder = ContainerBuilder::new();
    builder.register(|_| Ok(Leaf)).single_instance();
    builder.register(|ctx| Ok(Left(ctx.resolve::<Leaf>()?)));
    builder.register(|ctx| Ok(Right(ctx.resolve::<Leaf>()?)));
    builder.register(|ctx| Ok(Top(ctx.resolve::<Left>()?, ctx.resolve::<Right>()?)));

    let container = builder.build().unwrap();
    let top = container.resolve::<Top>().unwrap();
    assert!(Arc::ptr_eq(&top.0 .0, &top.1 .0));
}

#[test]
fn test_depth_limit() {
    struct Chain(u32);

    let mut builder = ContainerBuilder::new();
    builder.with_options(ContainerOptions {
        max_resolve_depth: 8,
        ..ContainerOptions::default()
    });
    // Each level asks for a fresh keyed registration, so no registration repeats.
    for level in 0..16i64 {
        builder
            .register(move |ctx| {
                if level < 15 {
                    ctx.resolve_keyed::<Chain>(level + 1)?;
                }
                Ok(Chain(level as u32))
            })
            .keyed::<Chain>(level);
    }

    let container = builder.build().unwrap();
    assert!(matches!(
        container.resolve_keyed::<Chain>(0i64),
        Err(DiError::DepthExceeded(8))
    ));
    assert_eq!(container.resolve_keyed::<Chain>(10i64).unwrap().0, 10);
}

#[test]
fn test_default_depth_limit_stops_unbounded_generic_nesting() {
    // Node<T> needs Node<Wrapper<T>>: every level closes a new registration,
    // so only the depth limit ends the recursion.
    struct Node;

    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let mut builder = ContainerBuilder::new();
            builder.define_type(
                TypeDef::class("Node").param("T").constructor(
                    ConstructorDef::new(|args| {
                        args.get::<Node>(0)?;
                        Ok(Node)
                    })
                    .param(
                        "next",
                        TypeDesc::generic("Node", [TypeDesc::generic("Wrapper", [TypeDesc::param("T")])]),
                    ),
                ),
            );
            builder.register_generic(TypeDesc::generic("Node", [TypeDesc::param("T")]));

            let container = builder.build().unwrap();
            let service = Service::typed(TypeDesc::generic("Node", [TypeDesc::of::<i32>()]));
            container.resolve_service(&service).map(|_| ())
        })
        .unwrap();

    match handle.join().unwrap() {
        Err(DiError::DepthExceeded(depth)) => assert_eq!(depth, DEFAULT_MAX_RESOLVE_DEPTH),
        other => panic!("expected the depth limit to stop resolution, got {:?}", other),
    }
}
