use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rugoc::codegen::builtin_names;
use rugoc::parser::{Parser, DEFAULT_MAX_DEPTH};
use rugoc::preprocess::Preprocessor;
use rugoc::{CompileOptions, Compiler};

const PROGRAM: &str = r#"
use "str"

struct Point
  x
  y
end

def distance2(a, b)
  dx = a.x - b.x
  dy = a.y - b.y
  dx * dx + dy * dy
end

def fib(n)
  if n < 2
    return n
  end
  fib(n - 1) + fib(n - 2)
end

points = []
for i in range(10)
  points = append(points, Point(i, i * 2))
end

total = 0
for p in points
  total += distance2(p, Point(0, 0))
end
puts "total: #{total}"

results = parallel
  fib(10)
  fib(12)
end
t = spawn str.upper("done")
puts t.value, results
"#;

fn preprocess_benchmark(c: &mut Criterion) {
    let preprocessor = Preprocessor::new().with_callables(builtin_names());
    c.bench_function("preprocess program", |b| {
        b.iter(|| preprocessor.process(black_box(PROGRAM)))
    });
}

fn parse_benchmark(c: &mut Criterion) {
    let pre = Preprocessor::new()
        .with_callables(builtin_names())
        .process(PROGRAM);
    let parser = Parser::rugo(DEFAULT_MAX_DEPTH).unwrap();
    c.bench_function("parse program", |b| {
        b.iter(|| {
            parser
                .parse("bench.rg", black_box(&pre.text), &pre.line_map, PROGRAM)
                .unwrap()
        })
    });
}

fn compile_benchmark(c: &mut Criterion) {
    let compiler = Compiler::new(CompileOptions::default());
    c.bench_function("compile program", |b| {
        b.iter(|| compiler.compile("bench.rg", black_box(PROGRAM)).unwrap())
    });
}

criterion_group!(benches, preprocess_benchmark, parse_benchmark, compile_benchmark);
criterion_main!(benches);
