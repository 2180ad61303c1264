use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fluent_grammar::{Fluent, Grammar, Transcript};

fn build_query() -> Fluent<Transcript> {
    let grammar = Grammar::new();
    grammar
        .rule("query")
        .unwrap()
        .sym_with("select", &["what"])
        .unwrap()
        .reference("filter")
        .unwrap()
        .repeat()
        .unwrap()
        .optional()
        .unwrap()
        .reference("build")
        .unwrap()
        .rule("filter")
        .unwrap()
        .sym_with("where", &["field"])
        .unwrap()
        .reference("expression")
        .unwrap()
        .rule("expression")
        .unwrap()
        .sym("is")
        .unwrap()
        .val()
        .unwrap()
        .or()
        .unwrap()
        .sym("isNot")
        .unwrap()
        .val()
        .unwrap()
        .or()
        .unwrap()
        .sym("not")
        .unwrap()
        .reference("expression")
        .unwrap()
        .rule("build")
        .unwrap()
        .sym("observe")
        .unwrap()
        .or()
        .unwrap()
        .sym("then")
        .unwrap()
        .end()
        .unwrap();
    grammar.compile().unwrap()
}

fn run_chain(fluent: &Fluent<Transcript>, filters: usize) -> Transcript {
    let mut chain = fluent.start().call("select", &["order".into()]).unwrap();
    for i in 0..filters {
        chain = chain
            .call("where", &[format!("f{i}").into()])
            .unwrap()
            .call("not", &[])
            .unwrap()
            .call("is", &[(i as i64).into()])
            .unwrap();
    }
    chain.call("then", &[]).unwrap().finish().unwrap()
}

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");
    let fluent = build_query();

    group.bench_function("start", |b| {
        b.iter(|| black_box(fluent.start()));
    });

    for &filters in &[1, 5, 20] {
        group.bench_function(&format!("{filters}_filters"), |b| {
            b.iter(|| run_chain(black_box(&fluent), filters));
        });
    }

    let expr = r#"select("order").where("address").is(1234).where("kind").not().isNot("x").then()"#;
    group.bench_function("run_expression", |b| {
        b.iter(|| {
            fluent
                .start()
                .run(black_box(expr))
                .unwrap()
                .finish()
                .unwrap()
        });
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let fluent = Arc::new(build_query());

        group.bench_function(&format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let f = Arc::clone(&fluent);
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = run_chain(&f, 3);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_invoke, bench_throughput);
criterion_main!(benches);
