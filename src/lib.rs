//! # ferrous-ioc
//!
//! A component-registry dependency injection container for Rust, in the
//! tradition of Autofac.
//!
//! ## Features
//!
//! - **Lifetimes**: singleton, per lifetime scope, per matching tagged scope and per dependency
//! - **Nested lifetime scopes**: isolated sharing and LIFO disposal of owned instances
//! - **Autowiring**: catalog-described types are built through their most satisfiable constructor
//! - **Open generics**: `Repo<T>` registered once serves `IRepo<User>`, `IRepo<Order>`, ...
//! - **Decorators**: keyed decorator chains wrap every implementation of a service
//! - **Relationship types**: `Collection<T>`, `Lazy<T>` and `Meta<T>` out of the box
//! - **Circular dependency detection**: errors report the full resolution chain
//! - **Lifecycle hooks**: `Preparing`, `Activating`, `Activated` and release callbacks
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register_instance(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! builder.register(|ctx| Ok(UserService { db: ctx.resolve::<Database>()? }));
//!
//! let container = builder.build().unwrap();
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Catalog Types and Autowiring
//!
//! Types described in the builder's [`TypeCatalog`] are constructed by the
//! container: it picks the constructor whose parameters it can all supply
//! and resolves each one.
//!
//! ```rust
//! use ferrous_ioc::{ConstructorDef, ContainerBuilder, Resolver, Service, TypeDef, TypeDesc};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct Scheduler {
//!     clock: Arc<Clock>,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.define_type(TypeDef::class("Clock").constructor(ConstructorDef::new(|_| Ok(Clock))));
//! builder.define_type(
//!     TypeDef::class("Scheduler").constructor(
//!         ConstructorDef::new(|args| Ok(Scheduler { clock: args.get::<Clock>(0)? }))
//!             .param("clock", TypeDesc::named("Clock")),
//!     ),
//! );
//! builder.register_type(TypeDesc::named("Clock")).single_instance();
//! builder.register_type(TypeDesc::named("Scheduler"));
//!
//! let container = builder.build().unwrap();
//! let scheduler = container
//!     .resolve_as::<Scheduler>(&Service::typed(TypeDesc::named("Scheduler")))
//!     .unwrap();
//! let clock = container.resolve_as::<Clock>(&Service::typed(TypeDesc::named("Clock"))).unwrap();
//! assert!(Arc::ptr_eq(&scheduler.clock, &clock));
//! ```
//!
//! ## Lifetime Scopes
//!
//! ```rust
//! use ferrous_ioc::{ContainerBuilder, Resolver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct RequestId(usize);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let next = counter.clone();
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(move |_| Ok(RequestId(next.fetch_add(1, Ordering::SeqCst))))
//!     .instance_per_lifetime_scope();
//!
//! let container = builder.build().unwrap();
//! let scope1 = container.begin_lifetime_scope();
//! let scope2 = container.begin_lifetime_scope();
//!
//! let req1 = scope1.resolve::<RequestId>().unwrap();
//! let req2 = scope2.resolve::<RequestId>().unwrap();
//! assert_ne!(req1.0, req2.0);
//! ```

pub mod activators;
pub mod collection;
pub mod config;
pub mod error;
pub mod lifetime;
pub mod observer;
pub mod parameters;
pub mod provider;
pub mod registration;
pub mod registry;
pub mod service;
pub mod sources;
pub mod traits;
pub mod types;
pub mod wrappers;

// Internal modules
mod internal;

pub use activators::{Activator, DelegateActivator, ProvidedInstanceActivator, ReflectionActivator};
pub use collection::{ContainerBuilder, Module, RegistrationBuilder};
pub use config::{ContainerOptions, DEFAULT_MAX_RESOLVE_DEPTH, MAX_RESOLVE_DEPTH_LIMIT};
pub use error::{BoxError, DiError, DiResult};
pub use lifetime::{Lifetime, Ownership, ScopeTag, Sharing};
pub use observer::{DiObserver, TracingObserver};
pub use parameters::{Parameter, ParameterValue};
pub use provider::{Container, LifetimeScope, ResolveContext};
pub use registration::{
    ActivatedEvent, ActivatingEvent, ComponentRegistration, Instance, Metadata, PreparingEvent, RegistrationId,
};
pub use registry::ComponentRegistry;
pub use service::{Service, ServiceKey};
pub use sources::{RegistrationAccessor, RegistrationSource};
pub use traits::{Dispose, Resolver, ResolverCore};
pub use types::convert::convert;
pub use types::{
    ConstructorArgs, ConstructorDef, Constraint, GenericParam, ParamDef, PropertyDef, TypeBindings, TypeCatalog,
    TypeDef, TypeDesc, TypeKind, TypeOracle,
};
pub use wrappers::{Collection, Lazy, Meta};
