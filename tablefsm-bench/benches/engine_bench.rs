//! Matcher, tokenizer and extractor benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tablefsm_core::{Events, Machine, Pattern, Token, TransitionTable};

/// Identifiers, integers and single spaces; anything else is an error run.
fn words_machine() -> Machine {
    let table = TransitionTable::builder()
        .on("A", Pattern::class("[a-z_]").unwrap(), "IDENT")
        .on("A", Pattern::class("[0-9]").unwrap(), "INT")
        .on("A", ' ', "SPACE")
        .on("A", Pattern::Any, "OTHER")
        .on("IDENT", Pattern::class("[a-z0-9_]").unwrap(), "IDENT")
        .on("INT", Pattern::class("[0-9]").unwrap(), "INT")
        .build();
    Machine::new("words", "A", table, ["IDENT", "INT", "SPACE"].into_iter().collect())
}

/// `IDENT = INT` assignments.
fn assignment_grammar() -> Machine {
    let table = TransitionTable::builder()
        .on("S", Pattern::literal("IDENT"), "N")
        .on("N", Pattern::literal("EQ"), "E")
        .on("E", Pattern::literal("INT"), "V")
        .on("S", Pattern::Any, "SKIP")
        .build();
    Machine::new("assign", "S", table, ["V"].into_iter().collect())
}

fn sample_text(words: usize) -> String {
    (0..words)
        .map(|i| if i % 3 == 0 { format!("{}", i) } else { format!("name_{}", i) })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_load_definition(c: &mut Criterion) {
    let mut group = c.benchmark_group("definition_load");

    let yaml = r#"
start: A
finals: [IDENT, INT, SPACE]
transitions:
  A:
    - ['[a-z_]', IDENT]
    - ['[0-9]', INT]
    - [' ', SPACE]
    - ['.', OTHER]
  IDENT:
    - ['[a-z0-9_]', IDENT]
  INT:
    - ['[0-9]', INT]
"#;

    group.bench_function("yaml", |b| {
        b.iter(|| black_box(Machine::from_yaml("words", yaml).unwrap()))
    });

    let json = words_machine().to_json().unwrap();
    group.bench_function("json", |b| {
        b.iter(|| black_box(Machine::from_json("words", &json).unwrap()))
    });

    group.finish();
}

fn bench_accepts(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher_accepts");
    let machine = words_machine();

    for len in [16, 256, 4096] {
        let input = "x".repeat(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("ident", len), &input, |b, input| {
            b.iter(|| black_box(machine.accepts(input)))
        });
    }

    group.bench_function("reject_first_symbol", |b| {
        b.iter(|| black_box(machine.accepts("!never matches")))
    });

    group.finish();
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer");
    let machine = words_machine();
    let events = Events::new().drop("SPACE");

    for words in [10, 100, 1000] {
        let text = sample_text(words);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("words", words), &text, |b, text| {
            b.iter(|| black_box(machine.tokenize(text, &events).unwrap()))
        });
    }

    // Every symbol restarts as an error run
    let noise = "!?#".repeat(300);
    group.bench_function("error_runs", |b| {
        b.iter(|| black_box(machine.tokenize(&noise, &events).unwrap()))
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extractor");
    let grammar = assignment_grammar();

    for statements in [10, 100, 1000] {
        let tokens: Vec<Token> = (0..statements)
            .flat_map(|i| {
                [
                    Token::new("IDENT", format!("v{}", i)),
                    Token::new("EQ", "="),
                    Token::new("INT", i.to_string()),
                    Token::new("SEMI", ";"),
                ]
            })
            .collect();
        group.throughput(Throughput::Elements(tokens.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("assignments", statements),
            &tokens,
            |b, tokens| b.iter(|| black_box(grammar.extract(tokens).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_load_definition,
    bench_accepts,
    bench_tokenize,
    bench_extract,
);

criterion_main!(benches);
