use std::io::{self, BufRead, Write};

use crate::calc_engine;
use crate::history::HistoryLog;

/// One classified input line: a session command or a batch of expressions.
#[derive(Debug, PartialEq)]
pub enum Input {
    Exit,
    Show,
    Clear,
    Batch(Vec<String>),
}

/// Trims the line, matches commands case-insensitively, and otherwise splits
/// on commas into a batch. A line of only commas and whitespace becomes an
/// empty batch.
pub fn classify(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "exit" => Input::Exit,
        "show" => Input::Show,
        "clear" => Input::Clear,
        _ => Input::Batch(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect(),
        ),
    }
}

/// Evaluates a batch left to right. Every expression gets its own record,
/// appended before it is echoed; one expression failing never stops the
/// rest, and a sink failure is reported without aborting the batch.
pub fn run_batch(history: &HistoryLog, batch: &[String]) {
    for expression in batch {
        let result_text = match calc_engine::evaluate(expression) {
            Ok(value) => value.to_string(),
            Err(err) => err.to_string(),
        };
        let record = format!("{} = {}", expression, result_text);
        if let Err(err) = history.append(&record) {
            eprintln!("History error: {:#}", err);
        }
        println!("  {}", record);
    }
}

pub fn show(history: &HistoryLog) -> anyhow::Result<()> {
    let records = history.records()?;
    if records.is_empty() {
        println!("History is empty");
    } else {
        for record in &records {
            println!("  {}", record);
        }
    }
    Ok(())
}

/// The blocking REPL loop: banner once, then read a line, process it fully,
/// repeat until `exit` or end-of-input.
pub fn run_line(history: &HistoryLog) {
    println!("Rust Console Calculator");
    println!("Supports: +, -, *, /, %, // (floor division), ** (power) and parentheses");
    println!("Separate several expressions with commas");
    println!("Commands: 'show' to list history, 'clear' to reset it, 'exit' to quit\n");

    let stdin = io::stdin();

    loop {
        print!("Expression: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("Input error: {}", err);
                break;
            }
        }

        match classify(&line) {
            Input::Exit => {
                println!("Goodbye!");
                break;
            }
            Input::Show => {
                if let Err(err) = show(history) {
                    eprintln!("History error: {:#}", err);
                }
            }
            Input::Clear => match history.clear() {
                Ok(()) => println!("History cleared"),
                Err(err) => eprintln!("History error: {:#}", err),
            },
            Input::Batch(batch) => run_batch(history, &batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{classify, run_batch, Input};
    use crate::history::HistoryLog;

    fn temp_log(name: &str) -> HistoryLog {
        let mut path = std::env::temp_dir();
        path.push(format!("histcalc-session-{}-{}.log", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        HistoryLog::new(path)
    }

    #[rstest]
    #[case("exit", Input::Exit)]
    #[case(" EXIT ", Input::Exit)]
    #[case("Show", Input::Show)]
    #[case("CLEAR", Input::Clear)]
    fn commands_match_case_insensitively(#[case] line: &str, #[case] expected: Input) {
        assert_eq!(classify(line), expected);
    }

    #[rstest]
    #[case("1+1", vec!["1+1"])]
    #[case("1+1, 2*2", vec!["1+1", "2*2"])]
    #[case(" 3+4 ,  10/0 , 2**3 ", vec!["3+4", "10/0", "2**3"])]
    #[case(",,,", vec![])]
    #[case("", vec![])]
    #[case("  , ", vec![])]
    fn other_lines_split_into_batches(#[case] line: &str, #[case] expected: Vec<&str>) {
        assert_eq!(
            classify(line),
            Input::Batch(expected.into_iter().map(str::to_string).collect())
        );
    }

    #[test]
    fn batch_persists_every_record_in_order() {
        let log = temp_log("mixed-batch");
        let Input::Batch(batch) = classify("3+4, 10/0, 2**3") else {
            panic!("expected a batch");
        };
        run_batch(&log, &batch);
        assert_eq!(
            log.records().unwrap(),
            vec!["3+4 = 7", "10/0 = Division by zero", "2**3 = 8"]
        );
    }

    #[test]
    fn batch_results_match_individual_evaluation() {
        let joint = temp_log("joint");
        let solo = temp_log("solo");
        let Input::Batch(batch) = classify("6*7, 9-2") else {
            panic!("expected a batch");
        };
        run_batch(&joint, &batch);
        run_batch(&solo, &["6*7".to_string()]);
        run_batch(&solo, &["9-2".to_string()]);
        assert_eq!(joint.records().unwrap(), solo.records().unwrap());
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let log = temp_log("empty-batch");
        let Input::Batch(batch) = classify(" , ,, ") else {
            panic!("expected a batch");
        };
        run_batch(&log, &batch);
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn clear_then_records_is_always_empty() {
        let log = temp_log("idempotent-clear");
        run_batch(&log, &["1+1".to_string()]);
        log.clear().unwrap();
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
        log.clear().unwrap();
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn unsupported_input_is_recorded_not_executed() {
        let log = temp_log("unsupported");
        run_batch(&log, &["import os".to_string()]);
        assert_eq!(
            log.records().unwrap(),
            vec!["import os = Unsupported expression: 'import'"]
        );
    }
}
