//! E2E test harness: run a program through the real driver and dissect the
//! labelled transcript.

use metalisp_eval::driver;
use metalisp_language::EchoLines;

/// The full transcript of a driver run over `program`, without source echo.
pub fn transcript(program: &str) -> String {
    let mut out = Vec::new();
    let source = EchoLines::silent(program.as_bytes());
    driver::run(source, &mut out).expect("driver I/O failed");
    String::from_utf8(out).expect("transcript is ASCII")
}

/// All emissions under `label`, continuation lines unwrapped.
pub fn labelled(program: &str, label: &str) -> Vec<String> {
    let text = transcript(program);
    let prefix = format!("{:<12}", label);
    let mut result: Vec<String> = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(first) = line.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let mut value = first.to_string();
        while let Some(next) = lines.peek() {
            match next.strip_prefix("            ") {
                Some(cont) if !next.trim().is_empty() => {
                    value.push_str(cont);
                    lines.next();
                }
                _ => break,
            }
        }
        result.push(value);
    }
    result
}

/// The `value` emissions of the transcript.
pub fn values(program: &str) -> Vec<String> {
    labelled(program, "value")
}

/// Asserts that the program's final `value` emission is `expected`.
pub fn assert_value(program: &str, expected: &str) {
    let vals = values(program);
    assert_eq!(
        vals.last().map(String::as_str),
        Some(expected),
        "program: {:?}, values: {:?}",
        program,
        vals
    );
}
