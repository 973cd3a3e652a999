/// End-to-end scenarios driven straight through the lexer -> crossreferencer
/// -> simulator pipeline, matching the teacher's `run_script` helper shape
/// (build a small front door, assert on the observable result) rather than
/// shelling out to the built binary.
use staq::crossref::crossreference;
use staq::errors::StaqError;
use staq::lexer::lex_source;
use staq::sim;

fn run_script(src: &str) -> String {
    let ops = lex_source(src).expect("lexing should succeed");
    let program = crossreference(ops).expect("crossreferencing should succeed");
    let mut out = Vec::new();
    sim::run(&program, &mut out).expect("simulation should succeed");
    String::from_utf8(out).unwrap()
}

fn run_script_err(src: &str) -> StaqError {
    let ops = lex_source(src).expect("lexing should succeed");
    let program = crossreference(ops).expect("crossreferencing should succeed");
    let mut out = Vec::new();
    sim::run(&program, &mut out).expect_err("simulation should fail")
}

// ─── scenario coverage ──────────────────────────────────────────────────────

#[test]
fn arithmetic_and_dump() {
    assert_eq!(run_script("34 35 + ."), "69\n");
}

#[test]
fn subtraction_order_matches_stack_neutral_convention() {
    assert_eq!(run_script("10 3 - ."), "7\n");
}

#[test]
fn comparison_chains() {
    assert_eq!(run_script("3 3 = ."), "1\n");
    assert_eq!(run_script("3 4 < ."), "1\n");
    assert_eq!(run_script("4 3 > ."), "1\n");
}

#[test]
fn dup_duplicates_the_top_value() {
    assert_eq!(run_script("5 dup + ."), "10\n");
}

#[test]
fn if_taken_and_not_taken_branches() {
    assert_eq!(run_script("1 if 10 . end"), "10\n");
    assert_eq!(run_script("0 if 10 . end"), "");
}

#[test]
fn if_else_picks_the_right_branch() {
    assert_eq!(run_script("1 if 1 . else 2 . end"), "1\n");
    assert_eq!(run_script("0 if 1 . else 2 . end"), "2\n");
}

#[test]
fn while_loop_counts_up() {
    assert_eq!(
        run_script("0 while dup 3 < do dup . 1 + end"),
        "0\n1\n2\n"
    );
}

#[test]
fn comments_are_ignored() {
    assert_eq!(run_script("1 2 + . # this is a comment\n"), "3\n");
}

// ─── boundary cases (spec section 8) ───────────────────────────────────────

#[test]
fn pushing_exactly_1024_values_is_fine() {
    let src = "1 ".repeat(sim::MAX_STACK_DEPTH);
    let ops = lex_source(&src).unwrap();
    let program = crossreference(ops).unwrap();
    let mut out = Vec::new();
    assert!(sim::run(&program, &mut out).is_ok());
}

#[test]
fn pushing_a_1025th_value_overflows() {
    let src = "1 ".repeat(sim::MAX_STACK_DEPTH + 1);
    let ops = lex_source(&src).unwrap();
    let program = crossreference(ops).unwrap();
    let mut out = Vec::new();
    let err = sim::run(&program, &mut out).unwrap_err();
    assert!(matches!(err, StaqError::StackOverflow { .. }));
}

#[test]
fn dump_on_an_empty_stack_is_a_stack_underflow() {
    let err = run_script_err(".");
    assert!(matches!(err, StaqError::StackUnderflow { op: ".", .. }));
}

#[test]
fn a_bare_end_is_a_structural_error() {
    let ops = lex_source("end").unwrap();
    let err = crossreference(ops).unwrap_err();
    assert!(matches!(err, StaqError::UnmatchedEnd { .. }));
}

#[test]
fn an_unterminated_if_is_a_structural_error() {
    let ops = lex_source("1 if 2 .").unwrap();
    let err = crossreference(ops).unwrap_err();
    assert!(matches!(err, StaqError::UnclosedOpener { opener: "if", .. }));
}

// ─── parity: simulator and compiled binary must agree ──────────────────────
//
// Gated on `nasm`/`ld` being on PATH, since CI sandboxes may lack an
// assembler/linker entirely -- the simulator-only tests above already cover
// every op's semantics; this only checks codegen produces the same observed
// behavior for a representative stack-neutral program.

#[test]
#[ignore]
fn compiles_and_links_and_matches_simulator_output() {
    use std::process::Command;

    let src = "1 while dup 5 <= do dup . 1 + end";
    let sim_output = run_script(src);

    let ops = lex_source(src).unwrap();
    let program = crossreference(ops).unwrap();
    let asm = staq::codegen::generate(&program).unwrap();

    let dir = std::env::temp_dir().join(format!("staq-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let asm_path = dir.join("output.asm");
    let obj_path = dir.join("output.o");
    let bin_path = dir.join("a.out");
    std::fs::write(&asm_path, asm).unwrap();

    let nasm_ok = Command::new("nasm")
        .args(["-felf64", "-g", "-F", "dwarf", asm_path.to_str().unwrap(), "-o", obj_path.to_str().unwrap()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    assert!(nasm_ok, "nasm must be available on PATH for this test");

    let ld_ok = Command::new("ld")
        .args([obj_path.to_str().unwrap(), "-o", bin_path.to_str().unwrap()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    assert!(ld_ok, "ld must be available on PATH for this test");

    let output = Command::new(&bin_path).output().expect("compiled binary should run");
    let compiled_output = String::from_utf8(output.stdout).unwrap();

    assert_eq!(compiled_output, sim_output);

    std::fs::remove_dir_all(&dir).ok();
}
