//! Parser for the resource summary printed by GNU `time -v`.

const ELAPSED_KEY: &str = "Elapsed (wall clock) time (h:mm:ss or m:ss)";
const MAX_RSS_KEY: &str = "Maximum resident set size (kbytes)";
const EXIT_STATUS_KEY: &str = "Exit status";
const SIGNAL_PREFIX: &str = "Command terminated by signal";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeReport {
    pub elapsed_s: Option<f64>,
    pub max_rss_bytes: Option<u64>,
    /// `Exit status` is 0 for a signalled child, so this is tracked apart.
    pub exit_status: Option<i32>,
    pub terminated_by_signal: Option<i32>,
}

impl TimeReport {
    /// Whether the timed command ran to a zero exit.
    pub fn succeeded(&self) -> bool {
        self.terminated_by_signal.is_none() && self.exit_status.is_none_or(|c| c == 0)
    }
}

/// Scan `stderr` for the fields of interest. Unrelated lines, including the
/// workload's own stderr, are ignored.
pub fn parse(stderr: &str) -> TimeReport {
    let mut report = TimeReport::default();
    for line in stderr.lines() {
        let line = line.trim();
        if let Some(value) = value_of(line, ELAPSED_KEY) {
            report.elapsed_s = parse_clock(value);
        } else if let Some(value) = value_of(line, MAX_RSS_KEY) {
            report.max_rss_bytes = value.parse::<u64>().ok().map(|kb| kb * 1024);
        } else if let Some(value) = value_of(line, EXIT_STATUS_KEY) {
            report.exit_status = value.parse().ok();
        } else if let Some(value) = line.strip_prefix(SIGNAL_PREFIX) {
            report.terminated_by_signal = value.trim().parse().ok().or(Some(0));
        }
    }
    report
}

fn value_of<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

/// `h:mm:ss`, `m:ss` or plain seconds.
pub fn parse_clock(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [secs] => secs.parse().ok(),
        [m, secs] => Some(m.parse::<u64>().ok()? as f64 * 60.0 + secs.parse::<f64>().ok()?),
        [h, m, secs] => Some(
            h.parse::<u64>().ok()? as f64 * 3600.0
                + m.parse::<u64>().ok()? as f64 * 60.0
                + secs.parse::<f64>().ok()?,
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
workload warning: something
\tCommand being timed: \"python bench.py\"
\tUser time (seconds): 1.20
\tElapsed (wall clock) time (h:mm:ss or m:ss): 1:02.50
\tMaximum resident set size (kbytes): 204800
\tExit status: 0
";

    #[test]
    fn test_parse_sample() {
        let report = parse(SAMPLE);
        assert_eq!(report.elapsed_s, Some(62.5));
        assert_eq!(report.max_rss_bytes, Some(204800 * 1024));
        assert_eq!(report.exit_status, Some(0));
    }

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_clock("1:00:01"), Some(3601.0));
        assert_eq!(parse_clock("0:03.25"), Some(3.25));
        assert_eq!(parse_clock("4.5"), Some(4.5));
        assert_eq!(parse_clock("x:y"), None);
    }

    #[test]
    fn test_missing_fields() {
        let report = parse("no summary here\n");
        assert_eq!(report, TimeReport::default());
    }

    #[test]
    fn test_signal_overrides_zero_exit_status() {
        let report = parse(
            "\tCommand terminated by signal 9\n\tMaximum resident set size (kbytes): 1000\n\tExit status: 0\n",
        );
        assert_eq!(report.terminated_by_signal, Some(9));
        assert_eq!(report.exit_status, Some(0));
        assert!(!report.succeeded());
        assert!(parse(SAMPLE).succeeded());
    }
}
