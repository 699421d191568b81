use divan::{Bencher, black_box};
use treepattern::{PatternCompiler, tokenize};

fn main() {
    divan::main();
}

const PATTERNS: &[&str] = &[
    "NP < NN",
    "S < (NP=subj $++ (VP < ~subj)) [< PP | !< SBAR]",
    "/^VP/ <+(!@VP) (VB=verb <# /^V/) < (NP <2 __ <-1 DT) ?>> ROOT",
    "@S << /^(NN)(S?)$/#1=base#2=plural=noun [< (SBAR < (S < =noun)) | !<< -NONE-]",
];

/// Tokenizing only
#[divan::bench(args = PATTERNS)]
fn lex(bencher: Bencher, pattern: &str) {
    bencher.bench_local(|| black_box(tokenize(black_box(pattern))).is_ok());
}

/// Full compilation, reusing one compiler
#[divan::bench(args = PATTERNS)]
fn compile(bencher: Bencher, pattern: &str) {
    let compiler = PatternCompiler::new();
    bencher.bench_local(|| black_box(compiler.compile(black_box(pattern))).is_ok());
}
