//! Benchmarks for the injector and the request pipeline

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ioc_runtime::{
    ApplicationContext, BoxError, ComponentDefinition, ComponentRegistry, Controller, DispatchError,
    ExitSignal, Injector, Method, Request, Response, async_trait,
};
use serde_json::{Value, json};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
#[derive(Default)]
struct Config {
    url: String,
}

#[allow(dead_code)]
struct Pool {
    config: Arc<Config>,
}

#[allow(dead_code)]
struct Repository {
    pool: Arc<Pool>,
}

#[allow(dead_code)]
struct Service {
    repository: Arc<Repository>,
    config: Arc<Config>,
}

trait Store: Send + Sync {
    fn id(&self) -> u32;
}

#[derive(Default)]
struct Primary;
impl Store for Primary {
    fn id(&self) -> u32 {
        1
    }
}

#[derive(Default)]
struct Replica;
impl Store for Replica {
    fn id(&self) -> u32 {
        2
    }
}

#[allow(dead_code)]
struct Scratch(u64);

fn chain() -> Vec<ComponentDefinition> {
    vec![
        ComponentDefinition::builder(|deps| {
            Ok::<_, BoxError>(Service {
                repository: deps.get::<Repository>()?,
                config: deps.get::<Config>()?,
            })
        })
        .depends_on::<Repository>()
        .depends_on::<Config>()
        .build(),
        ComponentDefinition::builder(|deps| {
            Ok::<_, BoxError>(Repository {
                pool: deps.get::<Pool>()?,
            })
        })
        .depends_on::<Pool>()
        .build(),
        ComponentDefinition::builder(|deps| {
            Ok::<_, BoxError>(Pool {
                config: deps.get::<Config>()?,
            })
        })
        .depends_on::<Config>()
        .build(),
        ComponentDefinition::of::<Config>().build(),
        ComponentDefinition::of::<Primary>()
            .bind::<dyn Store>(|s| s)
            .qualifier("primary")
            .qualifier("store")
            .build(),
        ComponentDefinition::of::<Replica>()
            .bind::<dyn Store>(|s| s)
            .qualifier("store")
            .build(),
        ComponentDefinition::builder(|_| Ok::<_, BoxError>(Scratch(7)))
            .prototype()
            .build(),
    ]
}

fn initialized() -> Injector {
    let injector = Injector::new();
    injector.initialize(chain(), &[]).unwrap();
    injector
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("register_7", |b| {
        b.iter(|| {
            let registry = ComponentRegistry::new();
            for definition in chain() {
                registry.register(definition).unwrap();
            }
            black_box(registry)
        })
    });

    group.bench_function("all_definitions_7", |b| {
        let registry = ComponentRegistry::new();
        for definition in chain() {
            registry.register(definition).unwrap();
        }
        b.iter(|| black_box(registry.all_definitions().count()))
    });

    group.finish();
}

fn bench_initialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialization");

    group.bench_function("initialize_chain", |b| {
        b.iter(|| {
            let injector = Injector::new();
            injector.initialize(chain(), &[]).unwrap();
            black_box(injector)
        })
    });

    group.bench_function("context_start_destroy", |b| {
        let context = ApplicationContext::builder()
            .discover(chain)
            .exit_signal(ExitSignal::new())
            .build();
        b.iter(|| {
            context.start().unwrap();
            black_box(context.destroy())
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let injector = initialized();

    group.bench_function("get_singleton", |b| {
        b.iter(|| black_box(injector.get::<Service>().unwrap()))
    });

    group.bench_function("get_trait_qualified", |b| {
        b.iter(|| black_box(injector.get_qualified::<dyn Store>(&"primary".into()).unwrap().id()))
    });

    group.bench_function("get_all_qualified", |b| {
        b.iter(|| black_box(injector.get_all::<dyn Store>(&"store".into()).unwrap().len()))
    });

    group.bench_function("get_prototype", |b| {
        b.iter(|| black_box(injector.get::<Scratch>().unwrap()))
    });

    group.bench_function("get_ambiguous", |b| {
        b.iter(|| black_box(injector.get::<dyn Store>().is_err()))
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let injector = Arc::new(initialized());

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let injector = Arc::clone(&injector);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = injector.get::<Service>().unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

#[derive(Default)]
struct Ping;

#[async_trait]
impl Controller for Ping {
    async fn handle(
        &self,
        _handler: &str,
        _request: &Request,
        _response: &mut Response,
    ) -> Result<Value, DispatchError> {
        Ok(json!("pong"))
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let context = ApplicationContext::builder()
        .component(
            ComponentDefinition::of::<Ping>()
                .route(Method::Get, "/ping", "ping")
                .build(),
        )
        .exit_signal(ExitSignal::new())
        .build();
    context.start().unwrap();
    let router = context.get_router().unwrap();

    group.bench_function("json_route", |b| {
        b.iter(|| black_box(runtime.block_on(router.dispatch(Request::get("/ping")))))
    });

    group.bench_function("not_found", |b| {
        b.iter(|| black_box(runtime.block_on(router.dispatch(Request::get("/missing")))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_initialization,
    bench_resolution,
    bench_concurrent,
    bench_dispatch,
);

criterion_main!(benches);
