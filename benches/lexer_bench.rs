use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use charme::{Interpreter, parse_program, tokenize};

// A reasonably complex input string for benchmarking
const BENCH_INPUT: &str = r#"
(define fib
  (lambda (n)
    (if (< n 2)
        n
        (+ (fib (- n 1))
           (fib (- n 2))))))

(define factorial
  (lambda (n)
    (if (= n 0)
        1
        (* n (factorial (- n 1))))))

(define make-adder (lambda (n) (lambda (x) (+ x n))))
(define add5 (make-adder 5))

(fib 10)
(factorial 5)
(add5 (- 10))
((lambda (a b c) (+ a (* b c))) 1 2 3)
"#;

fn bench_tokenizers(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reader");

    group.bench_with_input(
        BenchmarkId::new("tokenize", "complex_input"),
        &BENCH_INPUT,
        |b, input| b.iter(|| tokenize(black_box(input))),
    );

    group.bench_with_input(
        BenchmarkId::new("parse_program", "complex_input"),
        &BENCH_INPUT,
        |b, input| b.iter(|| parse_program(black_box(input))),
    );

    group.finish();
}

fn bench_fib(c: &mut Criterion) {
    let interpreter = Interpreter::new();
    // The definitions only need to happen once
    let _ = interpreter.eval_str(BENCH_INPUT);

    c.bench_function("eval (fib 15)", |b| {
        b.iter(|| interpreter.eval_str(black_box("(fib 15)")))
    });
}

// Register the benchmark group with Criterion
criterion_group!(benches, bench_tokenizers, bench_fib);
// Generate the main function necessary for the benchmark executable
criterion_main!(benches);
