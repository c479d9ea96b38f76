mod calc_engine;
mod history;
mod line_mode;

use history::HistoryLog;

const DEFAULT_HISTORY_FILE: &str = "history.txt";

fn main() {
    let path = std::env::var("CALC_HISTORY_FILE")
        .unwrap_or_else(|_| DEFAULT_HISTORY_FILE.to_string());
    let history = HistoryLog::new(path);
    line_mode::run_line(&history);
}
