use crate::context::CompileContext;
use crate::init_subscriber;
use crate::ir::ShaderProgram;
use crate::targ3t::Target;
use crate::DefaultCompiler;
use std::cmp::max;
use std::panic::Location;
use tracing::info;

pub struct Tester;

impl Tester {
    /// Initialize the subscriber for the tests.
    ///
    /// Cannot pass options, since the tests run concurrently.
    pub fn init_tracing() {
        let level = tracing::Level::INFO;
        match init_subscriber(level) {
            Ok(_) => (),
            Err(_e) => (),
        }
    }
    fn point_to_missing_line(expected: &str, index: usize) -> String {
        let mut result = String::new();
        result.push_str("A line is missing from the output:\n");
        result.push_str("```");
        for (i, line) in expected.lines().enumerate() {
            if i == index {
                result.push_str(&format!("\n{line}   <== missing"));
            } else {
                result.push_str(&format!("\n{line}"));
            }
        }
        result.push_str("\n```");
        result
    }
    /// Check that both texts have the same lines, ignoring surrounding
    /// whitespace of the whole text.
    pub fn check_lines_exact(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual: Vec<&str> = actual.trim().lines().collect();
        let expected: Vec<&str> = expected.trim().lines().collect();
        let n = max(actual.len(), expected.len());
        for i in 0..n {
            let Some(actual_line) = actual.get(i) else {
                panic!("Expected line {i} not found in output: called from {caller}");
            };
            let Some(expected_line) = expected.get(i) else {
                panic!("Unexpected line {i} in output: called from {caller}");
            };
            assert_eq!(actual_line, expected_line, "called from {caller}");
        }
    }
    /// Check whether the expected lines are present in the actual output, in
    /// order.
    ///
    /// The actual output may contain additional lines that are not in the
    /// expected output.
    pub fn check_lines_contain(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual: Vec<&str> = actual.trim().lines().collect();
        let mut actual_index = 0;
        'outer: for (i, expected_line) in expected.trim().lines().enumerate() {
            let expected_line = expected_line.trim();
            // An empty line would match anything.
            if expected_line.is_empty() {
                continue;
            }
            for (j, actual_line) in actual.iter().enumerate().skip(actual_index) {
                if actual_line.contains(expected_line) {
                    actual_index = j + 1;
                    continue 'outer;
                }
            }
            let msg = Self::point_to_missing_line(expected.trim(), i);
            panic!("{msg}\nwhen called from {caller}");
        }
    }
    fn print_heading(msg: &str, src: &str) {
        info!("{msg}:\n```\n{src}\n```\n");
    }
    /// Parse and transform `src` with the default front end.
    pub fn transform(src: &str) -> (ShaderProgram, CompileContext) {
        let src = src.trim();
        Self::print_heading("Before transform", src);
        let mut compiler = DefaultCompiler::new();
        let program = compiler.parse(src).unwrap();
        let shader = compiler.transform(&program);
        (shader, compiler.context().clone())
    }
    /// Compile `src` for `target` and return the code with the final
    /// context.
    pub fn compile(target: Target, src: &str) -> (String, CompileContext) {
        let src = src.trim();
        Self::print_heading(&format!("Before compile ({target})"), src);
        let mut compiler = DefaultCompiler::with_target(target);
        let actual = compiler.compile(src).unwrap();
        Self::print_heading(&format!("After compile ({target})"), &actual);
        (actual, compiler.context().clone())
    }
}
